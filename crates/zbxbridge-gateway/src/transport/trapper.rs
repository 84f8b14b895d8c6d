//! Trapper listener: one request/response per TCP connection.
//!
//! Lifecycle of a connection:
//! `ReadingHeader -> ReadingBody -> Decoding -> Dispatching -> WritingResponse -> Closed`
//!
//! A framing or decode failure in the first three stages ends in `Aborted`:
//! nothing is written back and `requests_invalid` is incremented. Once the
//! items are dispatched a summary is always written and `requests_processed`
//! is incremented, however many items were skipped.

use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::Instrument;

use zbxbridge_core::error::{BridgeError, ErrorKind};
use zbxbridge_core::protocol::{frame, item};

use crate::app_state::AppState;
use crate::dispatch::DispatchSummary;
use crate::transport::codec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReadingHeader,
    ReadingBody,
    Decoding,
    Dispatching,
    WritingResponse,
    Closed,
    Aborted,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::ReadingHeader => "reading_header",
            Stage::ReadingBody => "reading_body",
            Stage::Decoding => "decoding",
            Stage::Dispatching => "dispatching",
            Stage::WritingResponse => "writing_response",
            Stage::Closed => "closed",
            Stage::Aborted => "aborted",
        }
    }
}

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnOutcome {
    /// A summary was produced (and written, unless the peer went away).
    Responded(DispatchSummary),
    /// Given up in `stage` without writing anything.
    Aborted { stage: Stage, kind: ErrorKind },
}

/// Accept connections until `shutdown` resolves.
///
/// Each admitted connection is handled on its own task; the loop itself never
/// waits on request processing.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("trapper listener stopping");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(v) => v,
                    Err(e) => {
                        // typically fd exhaustion; back off instead of spinning
                        tracing::warn!(error = %e, "accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                };

                if !state.allowlist().is_allowed(peer.ip()) {
                    state.metrics().connections_rejected.inc();
                    tracing::warn!(%peer, "connection refused by allowed_clients");
                    drop(stream);
                    continue;
                }

                let state = state.clone();
                let span = tracing::debug_span!("conn", %peer);
                tokio::spawn(
                    async move {
                        handle_connection(&state, stream, peer).await;
                    }
                    .instrument(span),
                );
            }
        }
    }
}

/// Run one request lifecycle on `stream`. The stream is dropped on return.
pub async fn handle_connection<S>(state: &AppState, mut stream: S, peer: SocketAddr) -> ConnOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let server = &state.cfg().server;
    let read_timeout = Duration::from_millis(server.read_timeout_ms);
    let max_payload = server.max_payload_bytes;

    let mut stage = Stage::ReadingHeader;
    let read = tokio::time::timeout(read_timeout, async {
        let header = codec::read_header(&mut stream).await?;
        stage = Stage::ReadingBody;
        codec::read_body(&mut stream, &header, max_payload).await
    })
    .await;

    let payload = match read {
        Ok(Ok(p)) => p,
        Ok(Err(e)) => return abort(state, peer, stage, e),
        Err(_) => {
            let e = BridgeError::Framing(format!("no complete request within {read_timeout:?}"));
            return abort(state, peer, stage, e);
        }
    };

    stage = Stage::Decoding;
    let started = Instant::now();
    let points = match item::parse_request(&payload) {
        Ok(p) => p,
        Err(e) => return abort(state, peer, stage, e),
    };

    stage = Stage::Dispatching;
    tracing::trace!(%peer, stage = stage.as_str(), items = points.len(), "decoded");
    let summary = state.dispatcher().dispatch(&points);
    state.metrics().requests_processed.inc();

    stage = Stage::WritingResponse;
    let elapsed = started.elapsed().as_secs_f64();
    let reply = frame::encode_response(summary.processed, summary.failed(), summary.total, elapsed);
    if let Err(e) = codec::write_frame(&mut stream, &reply).await {
        tracing::warn!(%peer, stage = stage.as_str(), error = %e, "response not delivered");
    }
    let _ = stream.shutdown().await;

    tracing::debug!(
        %peer,
        stage = Stage::Closed.as_str(),
        total = summary.total,
        processed = summary.processed,
        skipped = summary.skipped,
        seconds = elapsed,
        "request processed"
    );
    ConnOutcome::Responded(summary)
}

fn abort(state: &AppState, peer: SocketAddr, stage: Stage, e: BridgeError) -> ConnOutcome {
    state.metrics().requests_invalid.inc();
    tracing::warn!(
        %peer,
        stage = stage.as_str(),
        kind = e.kind().as_str(),
        error = %e,
        "invalid request, closing connection"
    );
    ConnOutcome::Aborted {
        stage,
        kind: e.kind(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use tokio::io::AsyncReadExt;

    use crate::catalog::MetricRegistry;
    use crate::config::BridgeConfig;

    fn state() -> AppState {
        let registry = MetricRegistry::load(
            br#"[{"zabbix_key":"cpu.load"},{"zabbix_key":"net.if.in","args":["iface","dir"]}]"#,
            "zabbix",
        )
        .unwrap();
        AppState::new(BridgeConfig::default(), registry).unwrap()
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn roundtrip(state: &AppState, input: Vec<u8>) -> (ConnOutcome, Vec<u8>) {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        client.write_all(&input).await.unwrap();
        let outcome = handle_connection(state, server, peer()).await;
        let mut reply = Vec::new();
        client.read_to_end(&mut reply).await.unwrap();
        (outcome, reply)
    }

    #[tokio::test]
    async fn valid_request_gets_summary() {
        let st = state();
        let body = br#"{"request":"sender data","data":[
            {"host":"web-1","key":"cpu.load","value":"0.5"},
            {"host":"web-1","key":"net.if.in[eth0]","value":1},
            {"host":"web-1","key":"unknown","value":1}
        ]}"#;
        let (outcome, reply) = roundtrip(&st, frame::encode_frame(body).to_vec()).await;

        assert_eq!(
            outcome,
            ConnOutcome::Responded(DispatchSummary { total: 3, processed: 1, skipped: 2 })
        );
        let payload = frame::decode_frame(reply.into()).unwrap();
        let text = std::str::from_utf8(&payload).unwrap();
        assert!(text.starts_with(r#"{"response": "success", "info": "processed: 1; failed: 2; total: 3; seconds spent: "#));
        assert_eq!(st.metrics().requests_processed.get(), 1);
        assert_eq!(st.metrics().requests_invalid.get(), 0);
        assert_eq!(st.registry().get("zabbix_cpu_load", &["web-1"]), Some(0.5));
    }

    #[tokio::test]
    async fn zero_applied_items_is_still_processed() {
        let st = state();
        let body = br#"{"data":[{"host":"h","key":"nope","value":1}]}"#;
        let (outcome, reply) = roundtrip(&st, frame::encode_frame(body).to_vec()).await;
        assert!(matches!(outcome, ConnOutcome::Responded(s) if s.processed == 0 && s.skipped == 1));
        assert!(!reply.is_empty());
        assert_eq!(st.metrics().requests_processed.get(), 1);
    }

    #[tokio::test]
    async fn bad_header_aborts_silently() {
        let st = state();
        let (outcome, reply) = roundtrip(&st, b"ZBXE\x01\x02\0\0\0\0\0\0\0{}".to_vec()).await;
        assert_eq!(
            outcome,
            ConnOutcome::Aborted { stage: Stage::ReadingHeader, kind: ErrorKind::Framing }
        );
        assert!(reply.is_empty());
        assert_eq!(st.metrics().requests_invalid.get(), 1);
        assert_eq!(st.metrics().requests_processed.get(), 0);
    }

    #[tokio::test]
    async fn malformed_json_aborts_in_decoding() {
        let st = state();
        let (outcome, reply) = roundtrip(&st, frame::encode_frame(b"{\"data\": [").to_vec()).await;
        assert_eq!(
            outcome,
            ConnOutcome::Aborted { stage: Stage::Decoding, kind: ErrorKind::Decode }
        );
        assert!(reply.is_empty());
        assert_eq!(st.metrics().requests_invalid.get(), 1);
    }

    #[tokio::test]
    async fn oversized_length_aborts_before_body() {
        let st = state();
        let mut raw = b"ZBXD\x01".to_vec();
        raw.extend_from_slice(&u64::MAX.to_le_bytes());
        let (outcome, reply) = roundtrip(&st, raw).await;
        assert_eq!(
            outcome,
            ConnOutcome::Aborted { stage: Stage::ReadingBody, kind: ErrorKind::Framing }
        );
        assert!(reply.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_client_times_out() {
        let st = state();
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(b"ZBXD\x01").await.unwrap();

        let outcome = handle_connection(&st, server, peer()).await;
        assert_eq!(
            outcome,
            ConnOutcome::Aborted { stage: Stage::ReadingHeader, kind: ErrorKind::Framing }
        );
        assert_eq!(st.metrics().requests_invalid.get(), 1);
    }
}
