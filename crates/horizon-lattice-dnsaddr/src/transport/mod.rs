//! The TXT query primitive.
//!
//! A [`TxtTransport`] sends one TXT query for a fully-qualified name and
//! returns the decoded entries in arrival order. Transports make a single
//! attempt and never retry. Deadlines and cancellation are applied on top of
//! any transport by [`lookup_txt`], so the resolution algorithm stays
//! transport-agnostic.
//!
//! Two transports are provided:
//!
//! - [`HickoryTransport`]: a DNS client using either the host's resolver
//!   configuration or pinned nameservers over UDP/TCP.
//! - [`MemoryTransport`]: in-process records, for tests and offline
//!   bootstrap lists.

mod hickory;
mod memory;

use std::fmt;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::record::TxtEntry;

pub use hickory::HickoryTransport;
pub use memory::MemoryTransport;

/// A transport able to answer DNS TXT queries.
pub trait TxtTransport: Send + Sync + fmt::Debug {
    /// Short label used in log output.
    fn kind(&self) -> &'static str;

    /// Send one TXT query for `name`.
    ///
    /// A name with no TXT records yields an empty list, not an error.
    /// Dropping the returned future abandons the query and releases whatever
    /// it holds.
    fn query<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<TxtEntry>>>;

    /// Release transport resources. Called once when the owning resolver stops.
    fn shutdown(&self) {}
}

/// A single TXT lookup: the name to query and its deadline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxtQuery {
    /// Fully-qualified name, already carrying the `_dnsaddr.` label.
    pub name: String,
    /// Deadline for the answer.
    pub timeout: Duration,
}

impl TxtQuery {
    /// Create a query for `name`.
    pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            timeout,
        }
    }

    /// Create the DNSADDR query for `domain`, i.e. `_dnsaddr.<domain>`.
    pub fn dnsaddr(domain: &str, timeout: Duration) -> Self {
        Self::new(format!("{}{domain}", crate::DNSADDR_PREFIX), timeout)
    }
}

/// The entries returned for one TXT query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxtAnswer {
    /// The name that was queried.
    pub name: String,
    /// Entries in arrival order.
    pub entries: Vec<TxtEntry>,
}

impl fmt::Display for TxtAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query for: {}", self.name)?;
        write!(f, "\n\tRecord Count: {}", self.entries.len())?;
        for entry in &self.entries {
            write!(f, "\n\t{entry}")?;
        }
        Ok(())
    }
}

/// Resolves once the owning resolver has been stopped.
///
/// Every in-flight lookup holds one of these; stopping the resolver makes
/// all of them fire at once.
#[derive(Clone, Debug)]
pub struct ShutdownSignal(Option<watch::Receiver<bool>>);

impl ShutdownSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self(None)
    }

    /// A signal that fires once `true` is sent on `sender`.
    pub(crate) fn subscribe(sender: &watch::Sender<bool>) -> Self {
        Self(Some(sender.subscribe()))
    }

    /// Whether shutdown has already been requested.
    pub fn is_shutdown(&self) -> bool {
        self.0.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Wait until shutdown is requested.
    ///
    /// A dropped sender counts as shutdown: the resolver that owned it is gone.
    pub async fn cancelled(&mut self) {
        match &mut self.0 {
            Some(rx) => {
                let _ = rx.wait_for(|stopped| *stopped).await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Run `query` on `transport` under its deadline and the shutdown signal.
///
/// Exactly one outcome is produced. When the deadline elapses or shutdown is
/// requested the transport future is dropped, abandoning the query.
pub async fn lookup_txt(
    transport: &dyn TxtTransport,
    query: &TxtQuery,
    shutdown: &mut ShutdownSignal,
) -> Result<TxtAnswer> {
    tracing::trace!(
        target: "horizon_lattice_dnsaddr::transport",
        name = %query.name,
        transport = transport.kind(),
        timeout = ?query.timeout,
        "Sending TXT query"
    );

    tokio::select! {
        biased;

        _ = shutdown.cancelled() => {
            tracing::trace!(
                target: "horizon_lattice_dnsaddr::transport",
                name = %query.name,
                "TXT query cancelled by shutdown"
            );
            Err(Error::Cancelled)
        }
        result = tokio::time::timeout(query.timeout, transport.query(&query.name)) => match result {
            Ok(Ok(entries)) => Ok(TxtAnswer {
                name: query.name.clone(),
                entries,
            }),
            Ok(Err(e)) => {
                tracing::warn!(
                    target: "horizon_lattice_dnsaddr::transport",
                    name = %query.name,
                    transport = transport.kind(),
                    error = %e,
                    "TXT query failed"
                );
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    target: "horizon_lattice_dnsaddr::transport",
                    name = %query.name,
                    transport = transport.kind(),
                    timeout = ?query.timeout,
                    "TXT query timed out"
                );
                Err(Error::Timeout {
                    name: query.name.clone(),
                    timeout: query.timeout,
                })
            }
        },
    }
}
