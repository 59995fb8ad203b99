//! Choosing a resolved address by the protocols it carries.

use multiaddr::Multiaddr;

use crate::address::{ComponentKind, MultiaddrExt};

/// Protocols required by [`DnsAddrResolver::resolve_preferred`] unless
/// configured otherwise.
///
/// [`DnsAddrResolver::resolve_preferred`]: crate::DnsAddrResolver::resolve_preferred
pub const DEFAULT_REQUIRED_PROTOCOLS: [ComponentKind; 2] = [ComponentKind::Ip4, ComponentKind::Tcp];

/// Whether `address` contains every kind in `required`.
pub fn matches_protocols(address: &Multiaddr, required: &[ComponentKind]) -> bool {
    let kinds = address.component_kinds();
    required.iter().all(|kind| kinds.contains(kind))
}

/// Return the first address whose component kinds are a superset of `required`.
///
/// `None` is a normal outcome: nothing in the set speaks the requested
/// protocols.
pub fn select_one<'a>(addresses: &'a [Multiaddr], required: &[ComponentKind]) -> Option<&'a Multiaddr> {
    addresses
        .iter()
        .find(|address| matches_protocols(address, required))
}
