//! The DNSADDR resolver.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use multiaddr::{Multiaddr, PeerId};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::address::{ComponentKind, MultiaddrExt};
use crate::config::DnsAddrConfig;
use crate::decode::{DnsAddrRecord, decode, decode_records};
use crate::error::{Error, Result};
use crate::handle::ResolveHandle;
use crate::select::select_one;
use crate::transport::{HickoryTransport, ShutdownSignal, TxtQuery, TxtTransport, lookup_txt};

/// Identifier attached to a resolver's log output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResolverId(u64);

impl ResolverId {
    fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ResolverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:05}]", self.0)
    }
}

/// Transport and shutdown sender held while the resolver is running.
struct Active {
    transport: Arc<dyn TxtTransport>,
    shutdown: watch::Sender<bool>,
}

impl Active {
    fn release(self) {
        let _ = self.shutdown.send(true);
        self.transport.shutdown();
    }
}

struct Inner {
    id: ResolverId,
    config: DnsAddrConfig,
    injected: Option<Arc<dyn TxtTransport>>,
    active: Mutex<Option<Active>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.release();
        }
    }
}

/// Resolves `/dnsaddr/<domain>/p2p/<peer-id>` addresses through DNS TXT
/// records.
///
/// Resolution follows at most two levels of `dnsaddr` indirection and only
/// returns addresses that keep the original peer id. The resolver must be
/// started before use; starting opens the DNS transport, stopping cancels
/// every in-flight lookup and releases it. Clones share the same transport.
///
/// # Example
///
/// ```ignore
/// use horizon_lattice_dnsaddr::{ComponentKind, DnsAddrConfig, DnsAddrResolver};
///
/// let resolver = DnsAddrResolver::new(DnsAddrConfig::cloudflare());
/// resolver.start()?;
///
/// let addr = "/dnsaddr/bootstrap.libp2p.io/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN"
///     .parse()?;
///
/// // Every address the record chain leads to
/// let all = resolver.resolve(&addr).await?;
///
/// // Or a single dialable one
/// let tcp = resolver
///     .resolve_for(&addr, &[ComponentKind::Ip4, ComponentKind::Tcp])
///     .await?;
///
/// resolver.stop();
/// ```
#[derive(Clone)]
pub struct DnsAddrResolver {
    inner: Arc<Inner>,
}

impl DnsAddrResolver {
    /// Key used to identify this resolver to a host networking stack.
    pub const KEY: &'static str = "DNSADDR";

    /// Create a resolver that opens the transport described by `config`.
    pub fn new(config: DnsAddrConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a resolver that queries through `transport`.
    ///
    /// The transport section of `config` is ignored; its timeout and
    /// required protocols still apply.
    pub fn with_transport(config: DnsAddrConfig, transport: Arc<dyn TxtTransport>) -> Self {
        Self::build(config, Some(transport))
    }

    fn build(config: DnsAddrConfig, injected: Option<Arc<dyn TxtTransport>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: ResolverId::new(),
                config,
                injected,
                active: Mutex::new(None),
            }),
        }
    }

    /// The identifier used in this resolver's log output.
    pub fn id(&self) -> ResolverId {
        self.inner.id
    }

    /// The resolver configuration.
    pub fn config(&self) -> &DnsAddrConfig {
        &self.inner.config
    }

    /// Open the DNS transport. Calling this on a running resolver is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut active = self.inner.active.lock();
        if active.is_some() {
            return Ok(());
        }

        self.inner.config.validate()?;
        let transport: Arc<dyn TxtTransport> = match &self.inner.injected {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(HickoryTransport::from_config(&self.inner.config)?),
        };

        tracing::trace!(
            target: "horizon_lattice_dnsaddr::resolver",
            resolver = %self.inner.id,
            transport = transport.kind(),
            "{}::DNS client initializing",
            Self::KEY
        );

        let (shutdown, _) = watch::channel(false);
        *active = Some(Active {
            transport,
            shutdown,
        });
        Ok(())
    }

    /// Cancel outstanding lookups and release the transport.
    ///
    /// In-flight resolutions fail with [`Error::Cancelled`]. The resolver
    /// can be started again afterwards.
    pub fn stop(&self) {
        let Some(active) = self.inner.active.lock().take() else {
            return;
        };
        tracing::trace!(
            target: "horizon_lattice_dnsaddr::resolver",
            resolver = %self.inner.id,
            "{}::DNS client shutdown",
            Self::KEY
        );
        active.release();
    }

    /// Whether the resolver has been started and not stopped.
    pub fn is_running(&self) -> bool {
        self.inner.active.lock().is_some()
    }

    /// Whether `address` has the shape this resolver accepts: a `dnsaddr`
    /// first component and a peer id.
    pub fn can_resolve(address: &Multiaddr) -> bool {
        address.is_dnsaddr() && address.peer_id().is_some()
    }

    /// Resolve `address` to every address its TXT records lead to.
    pub async fn resolve(&self, address: &Multiaddr) -> Result<Vec<Multiaddr>> {
        let (domain, peer) = validate_input(address)?;
        let (transport, mut shutdown) = self.session()?;

        let resolution = Resolution {
            id: self.inner.id,
            transport: transport.as_ref(),
            timeout: self.inner.config.timeout,
            shutdown: &mut shutdown,
        };
        resolution.run(&domain, &peer).await
    }

    /// Parse `address` and resolve it.
    pub async fn resolve_str(&self, address: &str) -> Result<Vec<Multiaddr>> {
        let address: Multiaddr = address.parse()?;
        self.resolve(&address).await
    }

    /// Resolve `address` and pick the first result carrying every protocol
    /// in `required`.
    ///
    /// `Ok(None)` means resolution succeeded but nothing speaks the
    /// requested protocols.
    pub async fn resolve_for(
        &self,
        address: &Multiaddr,
        required: &[ComponentKind],
    ) -> Result<Option<Multiaddr>> {
        let addresses = self.resolve(address).await?;
        let selected = select_one(&addresses, required).cloned();
        if selected.is_none() {
            tracing::debug!(
                target: "horizon_lattice_dnsaddr::resolver",
                resolver = %self.inner.id,
                address = %address,
                resolved = addresses.len(),
                required = ?required,
                "No resolved address carries the required protocols"
            );
        }
        Ok(selected)
    }

    /// [`resolve_for`](Self::resolve_for) with the configured required
    /// protocols (`/ip4` + `/tcp` by default).
    pub async fn resolve_preferred(&self, address: &Multiaddr) -> Result<Option<Multiaddr>> {
        self.resolve_for(address, &self.inner.config.required_protocols)
            .await
    }

    /// Resolve `address` on the tokio runtime.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_resolve(&self, address: Multiaddr) -> ResolveHandle {
        let resolver = self.clone();
        ResolveHandle::spawn(async move { resolver.resolve(&address).await })
    }

    fn session(&self) -> Result<(Arc<dyn TxtTransport>, ShutdownSignal)> {
        let active = self.inner.active.lock();
        let active = active.as_ref().ok_or(Error::NotStarted)?;
        Ok((
            Arc::clone(&active.transport),
            ShutdownSignal::subscribe(&active.shutdown),
        ))
    }
}

impl fmt::Debug for DnsAddrResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsAddrResolver")
            .field("id", &self.inner.id)
            .field("config", &self.inner.config)
            .field("running", &self.is_running())
            .finish()
    }
}

/// One resolution request: at most two TXT rounds, strictly sequential.
struct Resolution<'a> {
    id: ResolverId,
    transport: &'a dyn TxtTransport,
    timeout: Duration,
    shutdown: &'a mut ShutdownSignal,
}

impl Resolution<'_> {
    async fn run(self, domain: &str, peer: &PeerId) -> Result<Vec<Multiaddr>> {
        let peer_text = peer.to_string();

        let query = TxtQuery::dnsaddr(domain, self.timeout);
        let answer = lookup_txt(self.transport, &query, self.shutdown).await?;
        let records = decode_records(&answer.entries);
        tracing::debug!(
            target: "horizon_lattice_dnsaddr::resolver",
            resolver = %self.id,
            name = %answer.name,
            entries = answer.entries.len(),
            candidates = records.len(),
            "First round answered"
        );

        let Some(host) = select_first_round(&records, &peer_text) else {
            tracing::debug!(
                target: "horizon_lattice_dnsaddr::resolver",
                resolver = %self.id,
                name = %answer.name,
                peer = %peer_text,
                "No first round record names the peer"
            );
            return Err(Error::no_matching_host(answer.name));
        };

        let Some(next) = nested_domain(&host.address, peer) else {
            tracing::debug!(
                target: "horizon_lattice_dnsaddr::resolver",
                resolver = %self.id,
                resolved = %host.address,
                "Resolved in one round"
            );
            return Ok(vec![host.address.clone()]);
        };

        let query = TxtQuery::dnsaddr(&next, self.timeout);
        let answer = lookup_txt(self.transport, &query, self.shutdown).await?;
        let resolved = filter_second_round(decode(&answer.entries), peer);
        tracing::debug!(
            target: "horizon_lattice_dnsaddr::resolver",
            resolver = %self.id,
            name = %answer.name,
            entries = answer.entries.len(),
            resolved = resolved.len(),
            "Second round answered"
        );

        if resolved.is_empty() {
            return Err(Error::no_matching_host(answer.name));
        }
        Ok(resolved)
    }
}

/// Check the input shape and pull out its domain and peer id.
fn validate_input(address: &Multiaddr) -> Result<(String, PeerId)> {
    if !address.is_dnsaddr() {
        return Err(Error::invalid_address(format!(
            "'{address}' does not start with /dnsaddr"
        )));
    }
    let domain = address
        .first_value()
        .ok_or_else(|| Error::invalid_address(format!("'{address}' has no dnsaddr domain")))?;
    let peer = address
        .peer_id()
        .ok_or_else(|| Error::invalid_address(format!("'{address}' has no /p2p peer id")))?;
    Ok((domain, peer))
}

/// First record, in arrival order, whose raw value mentions the peer id.
///
/// This is a substring match on the TXT text rather than a comparison of
/// parsed peer ids; the second round compares peer ids exactly.
fn select_first_round<'a>(records: &'a [DnsAddrRecord], peer: &str) -> Option<&'a DnsAddrRecord> {
    records.iter().find(|record| record.value.contains(peer))
}

/// The domain to query next, if `host` is a nested dnsaddr for the same peer.
fn nested_domain(host: &Multiaddr, peer: &PeerId) -> Option<String> {
    if host.is_dnsaddr() && host.peer_id().as_ref() == Some(peer) {
        host.first_value()
    } else {
        None
    }
}

fn filter_second_round(addresses: Vec<Multiaddr>, peer: &PeerId) -> Vec<Multiaddr> {
    addresses
        .into_iter()
        .filter(|address| address.peer_id().as_ref() == Some(peer))
        .collect()
}
