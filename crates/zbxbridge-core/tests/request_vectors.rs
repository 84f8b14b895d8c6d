//! Sender request decoding tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use zbxbridge_core::protocol::item::{parse_request, RawValue};

use vector_loader::load_raw;

#[test]
fn parse_sender_request() {
    let s = load_raw("request_sender.json");
    let points = parse_request(s.as_bytes()).unwrap();
    assert_eq!(points.len(), 4);

    assert_eq!(points[0].host, "web-1");
    assert_eq!(points[0].key.base(), "cpu.load");
    assert!(points[0].key.args().is_empty());
    assert_eq!(points[0].value, RawValue::String("0.75".into()));

    assert_eq!(points[1].key.base(), "net.if.in");
    assert_eq!(points[1].key.args(), ["eth0", "bytes"]);
    assert_eq!(points[1].value, RawValue::Integer(123456));

    assert_eq!(points[2].host, "db-1");
    assert_eq!(points[2].key.args(), ["/", "pfree"]);
    assert_eq!(points[2].value.coerce().unwrap(), 41.5);

    // decodes fine, only fails once coerced
    assert_eq!(points[3].value, RawValue::Unsupported("bool"));
    assert_eq!(points[3].value.coerce().unwrap_err().kind().as_str(), "VALUE");
}

#[test]
fn structural_problems_fail_the_request() {
    for f in [
        "request_missing_data.json",
        "request_bad_item.json",
        "request_truncated.json",
    ] {
        let s = load_raw(f);
        let err = parse_request(s.as_bytes()).expect_err(f);
        assert_eq!(err.kind().as_str(), "DECODE", "vector={f}");
    }
}

#[test]
fn invalid_utf8_is_a_decode_error() {
    let payload = b"{\"data\":[{\"host\":\"\xff\",\"key\":\"k\",\"value\":1}]}";
    let err = parse_request(payload).unwrap_err();
    assert_eq!(err.kind().as_str(), "DECODE");
}

#[test]
fn missing_fields_default() {
    let points = parse_request(br#"{"data":[{"key":"cpu.load"}]}"#).unwrap();
    assert_eq!(points[0].host, "");
    assert_eq!(points[0].value, RawValue::Unsupported("null"));
}

#[test]
fn null_fields_read_as_empty() {
    let points = parse_request(br#"{"data":[{"host":null,"key":null,"value":1}]}"#).unwrap();
    assert_eq!(points[0].host, "");
    assert_eq!(points[0].key.base(), "");
    assert_eq!(points[0].value, RawValue::Integer(1));

    assert!(parse_request(br#"{"data":null}"#).unwrap().is_empty());
}

#[test]
fn non_string_host_is_a_decode_error() {
    let err = parse_request(br#"{"data":[{"host":7,"key":"k","value":1}]}"#).unwrap_err();
    assert_eq!(err.kind().as_str(), "DECODE");
}
