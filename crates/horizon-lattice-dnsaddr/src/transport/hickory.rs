//! TXT queries over a hickory DNS client.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::future::BoxFuture;
use hickory_resolver::config::{NameServerConfig, ResolveHosts, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::Name;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{Resolver, TokioResolver};

use super::TxtTransport;
use crate::config::{DnsAddrConfig, NameServerProtocol, TransportConfig};
use crate::error::{Error, Result};
use crate::record::TxtEntry;

/// Slack added to hickory's own per-attempt timeout so that the deadline in
/// `lookup_txt` is always the one that fires.
const TRANSPORT_GRACE: Duration = Duration::from_millis(500);

/// A TXT transport backed by hickory-resolver.
///
/// The underlying resolver handle is cheap to clone and safe to share
/// between concurrent lookups; queries issued through it do not block one
/// another.
#[derive(Clone)]
pub struct HickoryTransport {
    resolver: TokioResolver,
    kind: &'static str,
}

impl HickoryTransport {
    /// Build the transport described by `config`.
    pub fn from_config(config: &DnsAddrConfig) -> Result<Self> {
        config.validate()?;
        match &config.transport {
            TransportConfig::System => Self::system(config.timeout),
            TransportConfig::Pinned { servers, protocol } => {
                Self::pinned(servers, *protocol, config.timeout)
            }
        }
    }

    /// Use the host's resolver configuration.
    ///
    /// On Unix this reads `/etc/resolv.conf`; on Windows, the system's
    /// configured DNS servers. Fails with [`Error::UnsupportedPlatform`] if
    /// the host configuration cannot be read.
    #[cfg(any(unix, windows))]
    pub fn system(timeout: Duration) -> Result<Self> {
        let (resolver_config, opts) =
            hickory_resolver::system_conf::read_system_conf().map_err(|e| {
                tracing::warn!(
                    target: "horizon_lattice_dnsaddr::transport",
                    error = %e,
                    "Unable to read the system DNS configuration"
                );
                Error::UnsupportedPlatform
            })?;

        Ok(Self::build(resolver_config, tune_opts(opts, timeout), "system"))
    }

    /// Use the host's resolver configuration.
    ///
    /// This target has no readable host DNS configuration.
    #[cfg(not(any(unix, windows)))]
    pub fn system(_timeout: Duration) -> Result<Self> {
        tracing::warn!(
            target: "horizon_lattice_dnsaddr::transport",
            "DNSADDR resolution is not supported on this platform"
        );
        Err(Error::UnsupportedPlatform)
    }

    /// Pin queries to explicit nameservers.
    pub fn pinned(
        servers: &[SocketAddr],
        protocol: NameServerProtocol,
        timeout: Duration,
    ) -> Result<Self> {
        if servers.is_empty() {
            return Err(Error::InvalidConfig("no nameservers configured".into()));
        }

        let mut resolver_config = ResolverConfig::new();
        for addr in servers {
            match protocol {
                NameServerProtocol::Udp => {
                    resolver_config.add_name_server(NameServerConfig::new(*addr, Protocol::Udp));
                }
                NameServerProtocol::Tcp => {
                    resolver_config.add_name_server(NameServerConfig::new(*addr, Protocol::Tcp));
                }
                NameServerProtocol::UdpAndTcp => {
                    resolver_config.add_name_server(NameServerConfig::new(*addr, Protocol::Udp));
                    resolver_config.add_name_server(NameServerConfig::new(*addr, Protocol::Tcp));
                }
            }
        }

        Ok(Self::build(
            resolver_config,
            tune_opts(ResolverOpts::default(), timeout),
            "pinned",
        ))
    }

    fn build(resolver_config: ResolverConfig, opts: ResolverOpts, kind: &'static str) -> Self {
        let resolver =
            Resolver::builder_with_config(resolver_config, TokioConnectionProvider::default())
                .with_options(opts)
                .build();
        Self { resolver, kind }
    }
}

/// Parse `name` as an absolute name so search domains are never appended.
fn absolute_name(name: &str) -> Result<Name> {
    let mut fqdn = Name::from_utf8(name).map_err(|e| Error::query_failed(name, e))?;
    fqdn.set_fqdn(true);
    Ok(fqdn)
}

/// Single attempt, no hosts file, deadline slightly behind ours.
fn tune_opts(mut opts: ResolverOpts, timeout: Duration) -> ResolverOpts {
    opts.attempts = 1;
    opts.timeout = timeout.saturating_add(TRANSPORT_GRACE);
    opts.use_hosts_file = ResolveHosts::Never;
    opts
}

impl TxtTransport for HickoryTransport {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn query<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<TxtEntry>>> {
        Box::pin(async move {
            match self.resolver.txt_lookup(absolute_name(name)?).await {
                Ok(lookup) => Ok(lookup
                    .iter()
                    .filter_map(|txt| {
                        let bytes: Vec<u8> = txt
                            .txt_data()
                            .iter()
                            .flat_map(|chunk| chunk.iter().copied())
                            .collect();
                        TxtEntry::from_bytes(&bytes)
                    })
                    .collect()),
                Err(e) if e.is_no_records_found() => {
                    tracing::debug!(
                        target: "horizon_lattice_dnsaddr::transport",
                        name,
                        "No TXT records found"
                    );
                    Ok(Vec::new())
                }
                Err(e) => Err(Error::query_failed(name, e)),
            }
        })
    }

    fn shutdown(&self) {
        tracing::trace!(
            target: "horizon_lattice_dnsaddr::transport",
            transport = self.kind,
            "Releasing DNS client"
        );
        self.resolver.clear_cache();
    }
}

impl fmt::Debug for HickoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HickoryTransport")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
