//! Client address allow-list for the trapper listener.
//!
//! Entries are either a bare address (`10.1.2.3`, `::1`) or a CIDR block
//! (`10.0.0.0/8`). An empty list allows every client.

use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use zbxbridge_core::error::{BridgeError, Result};

/// Compiled allow-list.
#[derive(Debug, Clone, Default)]
pub struct ClientAllowlist {
    nets: Vec<IpNet>,
}

impl ClientAllowlist {
    pub fn compile(raw: &[String]) -> Result<Self> {
        let mut nets = Vec::with_capacity(raw.len());
        for s in raw {
            nets.push(parse_entry(s)?);
        }
        Ok(Self { nets })
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    pub fn is_allowed(&self, peer: IpAddr) -> bool {
        if self.nets.is_empty() {
            return true;
        }
        // dual-stack listeners report IPv4 peers as ::ffff:a.b.c.d
        let peer = peer.to_canonical();
        self.nets.iter().any(|net| net.contains(&peer))
    }
}

fn parse_entry(s: &str) -> Result<IpNet> {
    let s = s.trim();
    if let Ok(net) = IpNet::from_str(s) {
        return Ok(net.trunc());
    }
    IpAddr::from_str(s)
        .map(IpNet::from)
        .map_err(|_| BridgeError::Config(format!("invalid allowed client entry: {s} (expected IP or CIDR)")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn list(entries: &[&str]) -> ClientAllowlist {
        let raw: Vec<String> = entries.iter().map(|s| s.to_string()).collect();
        ClientAllowlist::compile(&raw).unwrap()
    }

    #[test]
    fn empty_allows_all() {
        assert!(list(&[]).is_allowed("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn cidr_and_single_address() {
        let l = list(&["10.0.0.0/8", "192.168.1.7", "::1"]);
        assert!(l.is_allowed("10.20.30.40".parse().unwrap()));
        assert!(l.is_allowed("192.168.1.7".parse().unwrap()));
        assert!(!l.is_allowed("192.168.1.8".parse().unwrap()));
        assert!(l.is_allowed("::1".parse().unwrap()));
    }

    #[test]
    fn mapped_ipv4_peer_matches_v4_rule() {
        let l = list(&["127.0.0.0/8"]);
        assert!(l.is_allowed("::ffff:127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn garbage_entry_is_config_error() {
        let err = ClientAllowlist::compile(&["10.0.0.0/33".to_string()]).unwrap_err();
        assert_eq!(err.kind().as_str(), "CONFIG");
    }
}
