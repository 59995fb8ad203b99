//! DNSADDR resolver configuration.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::address::ComponentKind;
use crate::error::{Error, Result};
use crate::select::DEFAULT_REQUIRED_PROTOCOLS;

/// Default deadline for a single TXT query.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for a [`DnsAddrResolver`](crate::DnsAddrResolver).
///
/// # Example
///
/// ```ignore
/// use horizon_lattice_dnsaddr::{ComponentKind, DnsAddrConfig, NameServerProtocol};
/// use std::time::Duration;
///
/// let config = DnsAddrConfig::cloudflare()
///     .protocol(NameServerProtocol::Tcp)
///     .timeout(Duration::from_secs(2))
///     .required_protocols([ComponentKind::Ip6, ComponentKind::Tcp]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsAddrConfig {
    /// Deadline for each TXT query. Each round gets its own deadline.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,

    /// Which DNS transport to open on start.
    pub transport: TransportConfig,

    /// Protocols an address must carry to be picked by
    /// [`resolve_preferred`](crate::DnsAddrResolver::resolve_preferred).
    pub required_protocols: Vec<ComponentKind>,
}

impl Default for DnsAddrConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            transport: TransportConfig::System,
            required_protocols: DEFAULT_REQUIRED_PROTOCOLS.to_vec(),
        }
    }
}

impl DnsAddrConfig {
    /// Use the host's DNS configuration.
    pub fn system() -> Self {
        Self::default()
    }

    /// Pin resolution to the given nameservers.
    pub fn with_nameservers(servers: Vec<SocketAddr>) -> Self {
        Self {
            transport: TransportConfig::Pinned {
                servers,
                protocol: NameServerProtocol::default(),
            },
            ..Default::default()
        }
    }

    /// Use Google's public DNS servers.
    pub fn google() -> Self {
        Self::with_nameservers(vec![
            SocketAddr::from(([8, 8, 8, 8], 53)),
            SocketAddr::from(([8, 8, 4, 4], 53)),
        ])
    }

    /// Use Cloudflare's public DNS servers.
    pub fn cloudflare() -> Self {
        Self::with_nameservers(vec![
            SocketAddr::from(([1, 1, 1, 1], 53)),
            SocketAddr::from(([1, 0, 0, 1], 53)),
        ])
    }

    /// Parse a configuration from TOML and validate it.
    ///
    /// ```toml
    /// timeout_ms = 2000
    /// required_protocols = ["ip4", "tcp"]
    ///
    /// [transport]
    /// kind = "pinned"
    /// servers = ["1.1.1.1:53"]
    /// protocol = "tcp"
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the per-query timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the transport.
    pub fn transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Set the protocol used to reach pinned nameservers.
    ///
    /// Has no effect on the system transport.
    pub fn protocol(mut self, protocol: NameServerProtocol) -> Self {
        if let TransportConfig::Pinned { protocol: p, .. } = &mut self.transport {
            *p = protocol;
        }
        self
    }

    /// Set the protocols required by `resolve_preferred`.
    pub fn required_protocols(mut self, kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        self.required_protocols = kinds.into_iter().collect();
        self
    }

    /// Check the configuration for values that can never work.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be greater than zero".into()));
        }
        if let TransportConfig::Pinned { servers, .. } = &self.transport {
            if servers.is_empty() {
                return Err(Error::InvalidConfig("no nameservers configured".into()));
            }
        }
        Ok(())
    }
}

/// DNS transport selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
    /// The host's resolver configuration (`/etc/resolv.conf` on Unix).
    #[default]
    System,
    /// Explicit nameservers, for hosts whose default resolver is unreliable.
    Pinned {
        /// Nameserver endpoints, e.g. `1.1.1.1:53`.
        servers: Vec<SocketAddr>,
        /// Protocol used to reach them.
        #[serde(default)]
        protocol: NameServerProtocol,
    },
}

/// Protocol used to reach a pinned nameserver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameServerProtocol {
    /// UDP only.
    Udp,
    /// TCP only.
    Tcp,
    /// UDP with TCP configured alongside.
    #[default]
    UdpAndTcp,
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
