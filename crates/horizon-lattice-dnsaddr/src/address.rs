//! Component kinds and multiaddress projections used by the resolver.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use multiaddr::{Multiaddr, PeerId, Protocol};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// The kind of a single multiaddress component, without its value.
///
/// Kinds display and parse as the multiaddr protocol tag, e.g. `"ip4"` or
/// `"quic-v1"`. Tags of other multiaddr protocols parse to
/// [`Other`](Self::Other).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum ComponentKind {
    /// `/dnsaddr/<domain>`
    Dnsaddr,
    /// `/dns/<domain>`
    Dns,
    /// `/dns4/<domain>`
    Dns4,
    /// `/dns6/<domain>`
    Dns6,
    /// `/ip4/<address>`
    Ip4,
    /// `/ip6/<address>`
    Ip6,
    /// `/tcp/<port>`
    Tcp,
    /// `/udp/<port>`
    Udp,
    /// `/quic`
    Quic,
    /// `/quic-v1`
    QuicV1,
    /// `/ws`
    Ws,
    /// `/wss`
    Wss,
    /// `/tls`
    Tls,
    /// `/p2p/<peer-id>`
    P2p,
    /// `/p2p-circuit`
    P2pCircuit,
    /// `/webtransport`
    WebTransport,
    /// Any other protocol, identified by its tag.
    Other(&'static str),
}

/// Tags of multiaddr protocols without a dedicated variant, as returned by
/// `Protocol::tag`.
const OTHER_TAGS: &[&str] = &[
    "certhash",
    "dccp",
    "garlic32",
    "garlic64",
    "http",
    "https",
    "ip6zone",
    "ipcidr",
    "memory",
    "noise",
    "onion",
    "onion3",
    "p2p-webrtc-direct",
    "p2p-webrtc-star",
    "p2p-websocket-star",
    "sctp",
    "sni",
    "udt",
    "unix",
    "utp",
    "webrtc",
    "webrtc-direct",
];

impl ComponentKind {
    /// The multiaddr protocol tag for this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Dnsaddr => "dnsaddr",
            Self::Dns => "dns",
            Self::Dns4 => "dns4",
            Self::Dns6 => "dns6",
            Self::Ip4 => "ip4",
            Self::Ip6 => "ip6",
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Quic => "quic",
            Self::QuicV1 => "quic-v1",
            Self::Ws => "ws",
            Self::Wss => "wss",
            Self::Tls => "tls",
            Self::P2p => "p2p",
            Self::P2pCircuit => "p2p-circuit",
            Self::WebTransport => "webtransport",
            Self::Other(tag) => tag,
        }
    }

    /// Whether this kind names a host through DNS.
    pub fn is_dns(&self) -> bool {
        matches!(self, Self::Dnsaddr | Self::Dns | Self::Dns4 | Self::Dns6)
    }
}

impl From<&Protocol<'_>> for ComponentKind {
    fn from(protocol: &Protocol<'_>) -> Self {
        match protocol {
            Protocol::Dnsaddr(_) => Self::Dnsaddr,
            Protocol::Dns(_) => Self::Dns,
            Protocol::Dns4(_) => Self::Dns4,
            Protocol::Dns6(_) => Self::Dns6,
            Protocol::Ip4(_) => Self::Ip4,
            Protocol::Ip6(_) => Self::Ip6,
            Protocol::Tcp(_) => Self::Tcp,
            Protocol::Udp(_) => Self::Udp,
            Protocol::Quic => Self::Quic,
            Protocol::QuicV1 => Self::QuicV1,
            Protocol::Ws(_) => Self::Ws,
            Protocol::Wss(_) => Self::Wss,
            Protocol::Tls => Self::Tls,
            Protocol::P2p(_) => Self::P2p,
            Protocol::P2pCircuit => Self::P2pCircuit,
            Protocol::WebTransport => Self::WebTransport,
            other => Self::Other(other.tag()),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ComponentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim_start_matches('/') {
            "dnsaddr" => Self::Dnsaddr,
            "dns" => Self::Dns,
            "dns4" => Self::Dns4,
            "dns6" => Self::Dns6,
            "ip4" => Self::Ip4,
            "ip6" => Self::Ip6,
            "tcp" => Self::Tcp,
            "udp" => Self::Udp,
            "quic" => Self::Quic,
            "quic-v1" => Self::QuicV1,
            "ws" => Self::Ws,
            "wss" => Self::Wss,
            "tls" => Self::Tls,
            "p2p" => Self::P2p,
            "p2p-circuit" => Self::P2pCircuit,
            "webtransport" => Self::WebTransport,
            other => match OTHER_TAGS.iter().find(|tag| **tag == other) {
                Some(tag) => Self::Other(*tag),
                None => {
                    return Err(Error::InvalidConfig(format!(
                        "unknown multiaddr protocol '{other}'"
                    )));
                }
            },
        };
        Ok(kind)
    }
}

impl<'de> Deserialize<'de> for ComponentKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

impl From<ComponentKind> for String {
    fn from(kind: ComponentKind) -> Self {
        kind.tag().to_string()
    }
}

/// Projections over a [`Multiaddr`] needed by DNSADDR resolution.
pub trait MultiaddrExt {
    /// Kind of the first component, if any.
    fn first_kind(&self) -> Option<ComponentKind>;

    /// Value of the first component rendered as text.
    ///
    /// Domains for `dnsaddr`/`dns*`, literal addresses for `ip4`/`ip6`,
    /// ports for `tcp`/`udp`. `None` for value-less components.
    fn first_value(&self) -> Option<String>;

    /// The peer id carried by the address.
    ///
    /// When several `p2p` components are present (relayed addresses) the
    /// last one names the destination peer.
    fn peer_id(&self) -> Option<PeerId>;

    /// The set of component kinds present in the address.
    fn component_kinds(&self) -> HashSet<ComponentKind>;

    /// Whether the first component is `dnsaddr`.
    fn is_dnsaddr(&self) -> bool {
        self.first_kind() == Some(ComponentKind::Dnsaddr)
    }
}

impl MultiaddrExt for Multiaddr {
    fn first_kind(&self) -> Option<ComponentKind> {
        self.iter().next().map(|protocol| ComponentKind::from(&protocol))
    }

    fn first_value(&self) -> Option<String> {
        match self.iter().next()? {
            Protocol::Dnsaddr(domain)
            | Protocol::Dns(domain)
            | Protocol::Dns4(domain)
            | Protocol::Dns6(domain) => Some(domain.into_owned()),
            Protocol::Ip4(addr) => Some(addr.to_string()),
            Protocol::Ip6(addr) => Some(addr.to_string()),
            Protocol::Tcp(port) | Protocol::Udp(port) => Some(port.to_string()),
            Protocol::P2p(peer) => Some(peer.to_string()),
            _ => None,
        }
    }

    fn peer_id(&self) -> Option<PeerId> {
        self.iter()
            .filter_map(|protocol| match protocol {
                Protocol::P2p(peer) => Some(peer),
                _ => None,
            })
            .last()
    }

    fn component_kinds(&self) -> HashSet<ComponentKind> {
        self.iter().map(|protocol| ComponentKind::from(&protocol)).collect()
    }
}
