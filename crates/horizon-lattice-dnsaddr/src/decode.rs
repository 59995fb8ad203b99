//! Turning TXT entries into candidate multiaddresses.

use multiaddr::Multiaddr;

use crate::record::TxtEntry;

/// A `dnsaddr` TXT value together with the address it parsed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsAddrRecord {
    /// The raw TXT value, exactly as received.
    pub value: String,
    /// The parsed multiaddress.
    pub address: Multiaddr,
}

/// Decode `dnsaddr` entries into records, keeping arrival order.
///
/// Entries with another key, or whose value is not a multiaddress, are
/// dropped.
pub fn decode_records(entries: &[TxtEntry]) -> Vec<DnsAddrRecord> {
    entries
        .iter()
        .filter(|entry| entry.is_dnsaddr())
        .filter_map(|entry| match entry.value.parse::<Multiaddr>() {
            Ok(address) => Some(DnsAddrRecord {
                value: entry.value.clone(),
                address,
            }),
            Err(e) => {
                tracing::trace!(
                    target: "horizon_lattice_dnsaddr::decode",
                    value = %entry.value,
                    error = %e,
                    "Dropping unparsable dnsaddr value"
                );
                None
            }
        })
        .collect()
}

/// Decode `dnsaddr` entries into multiaddresses, keeping arrival order.
///
/// Never fails; an empty result means there were no usable records.
pub fn decode(entries: &[TxtEntry]) -> Vec<Multiaddr> {
    decode_records(entries)
        .into_iter()
        .map(|record| record.address)
        .collect()
}
