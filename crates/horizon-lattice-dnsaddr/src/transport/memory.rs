//! In-process TXT records.

use std::collections::HashMap;

use futures_util::future::BoxFuture;
use parking_lot::{Mutex, RwLock};

use super::TxtTransport;
use crate::error::{Error, Result};
use crate::record::{TxtEntry, encode_rdata};

#[derive(Clone, Debug)]
enum Zone {
    Records(Vec<Vec<u8>>),
    Stall,
    Fail(String),
}

/// A transport that answers from records held in memory.
///
/// Records are stored as raw TXT RDATA and decoded on every query, exactly
/// as a wire answer would be. Names can also be set to never answer or to
/// fail, and every queried name is logged.
///
/// # Example
///
/// ```ignore
/// use horizon_lattice_dnsaddr::transport::MemoryTransport;
///
/// let transport = MemoryTransport::new().with_txt(
///     "_dnsaddr.bootstrap.example.com",
///     ["dnsaddr=/ip4/192.0.2.1/tcp/4001/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN"],
/// );
/// ```
#[derive(Debug, Default)]
pub struct MemoryTransport {
    zones: RwLock<HashMap<String, Zone>>,
    queries: Mutex<Vec<String>>,
}

impl MemoryTransport {
    /// Create an empty transport. Every name answers with no records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert_txt`](Self::insert_txt).
    pub fn with_txt<I, S>(self, name: &str, records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert_txt(name, records);
        self
    }

    /// Append TXT records (as text, e.g. `dnsaddr=/ip4/...`) under `name`.
    pub fn insert_txt<I, S>(&self, name: &str, records: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for record in records {
            self.insert_rdata(name, encode_rdata(record.as_ref()));
        }
    }

    /// Append one raw RDATA payload under `name`.
    pub fn insert_rdata(&self, name: &str, rdata: Vec<u8>) {
        let mut zones = self.zones.write();
        match zones.entry(normalize(name)).or_insert_with(|| Zone::Records(Vec::new())) {
            Zone::Records(records) => records.push(rdata),
            zone => *zone = Zone::Records(vec![rdata]),
        }
    }

    /// Make queries for `name` never answer.
    pub fn stall(&self, name: &str) {
        self.zones.write().insert(normalize(name), Zone::Stall);
    }

    /// Make queries for `name` fail with a transport error.
    pub fn fail(&self, name: &str, message: impl Into<String>) {
        self.zones
            .write()
            .insert(normalize(name), Zone::Fail(message.into()));
    }

    /// Remove everything stored under `name`.
    pub fn remove(&self, name: &str) {
        self.zones.write().remove(&normalize(name));
    }

    /// Names queried so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// Number of queries issued so far.
    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

impl TxtTransport for MemoryTransport {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn query<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<TxtEntry>>> {
        Box::pin(async move {
            let key = normalize(name);
            self.queries.lock().push(key.clone());

            // Clone out so no lock is held across the await below.
            let zone = self.zones.read().get(&key).cloned();
            match zone {
                None => Ok(Vec::new()),
                Some(Zone::Records(records)) => Ok(records
                    .iter()
                    .filter_map(|rdata| TxtEntry::from_rdata(rdata))
                    .collect()),
                Some(Zone::Stall) => std::future::pending().await,
                Some(Zone::Fail(message)) => Err(Error::query_failed(name, message)),
            }
        })
    }
}
