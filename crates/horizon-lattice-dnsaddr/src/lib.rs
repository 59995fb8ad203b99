//! DNSADDR multiaddress resolution for Horizon Lattice.
//!
//! A DNSADDR address such as
//! `/dnsaddr/bootstrap.libp2p.io/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN`
//! names a peer by domain. Its concrete transport addresses are published as
//! TXT records under `_dnsaddr.<domain>`, each of the form
//! `dnsaddr=<multiaddr>`. This crate looks those records up and returns the
//! addresses they lead to.
//!
//! - **Bounded**: at most two TXT queries per resolution
//! - **Peer-checked**: every returned address carries the requested peer id
//! - **Selectable**: pick one address carrying a set of protocols
//! - **Cancellable**: stopping the resolver aborts in-flight lookups
//!
//! # Resolving
//!
//! ```ignore
//! use horizon_lattice_dnsaddr::{DnsAddrConfig, DnsAddrResolver};
//!
//! let resolver = DnsAddrResolver::new(DnsAddrConfig::system());
//! resolver.start()?;
//!
//! let addrs = resolver
//!     .resolve_str("/dnsaddr/bootstrap.libp2p.io/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN")
//!     .await?;
//! for addr in &addrs {
//!     println!("{addr}");
//! }
//! ```
//!
//! ## Choosing an address
//!
//! ```ignore
//! use horizon_lattice_dnsaddr::ComponentKind;
//!
//! // First result carrying both /ip4 and /tcp
//! let dialable = resolver
//!     .resolve_for(&addr, &[ComponentKind::Ip4, ComponentKind::Tcp])
//!     .await?;
//!
//! // Same, using the configured defaults
//! let dialable = resolver.resolve_preferred(&addr).await?;
//! ```
//!
//! ## Configuration
//!
//! ```ignore
//! let config = DnsAddrConfig::from_toml_str(r#"
//!     timeout_ms = 2000
//!
//!     [transport]
//!     kind = "pinned"
//!     servers = ["1.1.1.1:53", "1.0.0.1:53"]
//!     protocol = "tcp"
//! "#)?;
//! ```
//!
//! # Background Resolution
//!
//! ```ignore
//! let handle = resolver.spawn_resolve(addr);
//!
//! // Later, if the result is no longer wanted
//! handle.cancel();
//!
//! // Or wait for it
//! let addrs = handle.join().await?;
//! ```
//!
//! # Testing
//!
//! [`transport::MemoryTransport`] answers from records held in memory and can
//! be injected with [`DnsAddrResolver::with_transport`].

mod address;
mod config;
mod decode;
mod error;
mod handle;
mod record;
mod resolver;
mod select;
pub mod transport;

/// The TXT key marking a DNSADDR record.
pub const DNSADDR_KEY: &str = "dnsaddr";

/// Label prepended to a domain to form its DNSADDR query name.
pub const DNSADDR_PREFIX: &str = "_dnsaddr.";

pub use error::{Error, Result};

// Re-export commonly used types at the crate root
pub use address::{ComponentKind, MultiaddrExt};
pub use config::{DEFAULT_TIMEOUT, DnsAddrConfig, NameServerProtocol, TransportConfig};
pub use decode::{DnsAddrRecord, decode, decode_records};
pub use handle::{ResolveHandle, ResolveId};
pub use record::TxtEntry;
pub use resolver::{DnsAddrResolver, ResolverId};
pub use select::{DEFAULT_REQUIRED_PROTOCOLS, matches_protocols, select_one};

pub use multiaddr::{Multiaddr, PeerId};
