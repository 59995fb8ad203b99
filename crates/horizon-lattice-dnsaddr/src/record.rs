//! TXT record entries.
//!
//! A TXT answer carries one or more length-prefixed character-strings. For
//! DNSADDR each record holds a single `key=value` attribute, e.g.
//! `dnsaddr=/ip4/139.178.91.71/tcp/4001/p2p/Qm...`. Long values may be split
//! across several character-strings, which are concatenated before parsing.

use std::fmt;

/// Largest payload a single TXT character-string can carry.
const MAX_CHARACTER_STRING: usize = 255;

/// A `key=value` attribute decoded from one TXT record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxtEntry {
    /// Text before the first `=`.
    pub key: String,
    /// Everything after the first `=`, including further `=` characters.
    pub value: String,
}

impl TxtEntry {
    /// Create an entry from its parts.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Decode an entry from TXT text that has already been unwrapped.
    ///
    /// Returns `None` if the text is empty or has no `=` separator.
    pub fn from_text(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let (key, value) = text.split_once('=')?;
        Some(Self::new(key, value))
    }

    /// Decode an entry from concatenated character-string bytes.
    ///
    /// Returns `None` if the bytes are not valid UTF-8 or do not form a
    /// `key=value` pair.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::from_text(text),
            Err(_) => {
                tracing::trace!(
                    target: "horizon_lattice_dnsaddr::record",
                    "Dropping TXT record that is not valid UTF-8"
                );
                None
            }
        }
    }

    /// Decode an entry from raw TXT RDATA (`<len><bytes>` repeated).
    ///
    /// All character-strings are concatenated. Returns `None` if the payload
    /// is empty, a length prefix runs past the end of the payload, or the
    /// text does not decode as a `key=value` pair.
    pub fn from_rdata(rdata: &[u8]) -> Option<Self> {
        if rdata.is_empty() {
            return None;
        }

        let mut text = Vec::with_capacity(rdata.len());
        let mut rest = rdata;
        while let Some((&len, tail)) = rest.split_first() {
            let len = usize::from(len);
            if len > tail.len() {
                tracing::trace!(
                    target: "horizon_lattice_dnsaddr::record",
                    len,
                    remaining = tail.len(),
                    "Dropping TXT record with truncated character-string"
                );
                return None;
            }
            let (chunk, next) = tail.split_at(len);
            text.extend_from_slice(chunk);
            rest = next;
        }

        Self::from_bytes(&text)
    }

    /// Whether this entry carries a DNSADDR value.
    pub fn is_dnsaddr(&self) -> bool {
        self.key == crate::DNSADDR_KEY
    }
}

impl fmt::Display for TxtEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Encode TXT text as raw RDATA, splitting it into 255-byte character-strings.
pub fn encode_rdata(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut rdata = Vec::with_capacity(bytes.len() + bytes.len() / MAX_CHARACTER_STRING + 1);
    if bytes.is_empty() {
        rdata.push(0);
        return rdata;
    }
    for chunk in bytes.chunks(MAX_CHARACTER_STRING) {
        // chunks() never yields more than MAX_CHARACTER_STRING bytes
        rdata.push(chunk.len() as u8);
        rdata.extend_from_slice(chunk);
    }
    rdata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text() {
        let entry = TxtEntry::from_text("dnsaddr=/ip4/1.2.3.4/tcp/4001").unwrap();
        assert_eq!(entry.key, "dnsaddr");
        assert_eq!(entry.value, "/ip4/1.2.3.4/tcp/4001");
        assert!(entry.is_dnsaddr());
    }

    #[test]
    fn test_split_at_first_separator_only() {
        let entry = TxtEntry::from_text("dnsaddr=/dns4/x.example/tcp/443/wss/a=b=c").unwrap();
        assert_eq!(entry.key, "dnsaddr");
        assert_eq!(entry.value, "/dns4/x.example/tcp/443/wss/a=b=c");
    }

    #[test]
    fn test_rejects_malformed_text() {
        assert!(TxtEntry::from_text("").is_none());
        assert!(TxtEntry::from_text("not-a-valid-payload").is_none());
        assert!(TxtEntry::from_text("no separator").is_none());
    }

    #[test]
    fn test_empty_key_or_value_is_kept() {
        assert_eq!(TxtEntry::from_text("=x"), Some(TxtEntry::new("", "x")));
        assert_eq!(TxtEntry::from_text("k="), Some(TxtEntry::new("k", "")));
    }

    #[test]
    fn test_from_rdata_single_string() {
        let rdata = encode_rdata("dnsaddr=/ip4/1.2.3.4/tcp/4001");
        assert_eq!(rdata[0] as usize, rdata.len() - 1);
        let entry = TxtEntry::from_rdata(&rdata).unwrap();
        assert_eq!(entry.to_string(), "dnsaddr=/ip4/1.2.3.4/tcp/4001");
    }

    #[test]
    fn test_from_rdata_concatenates_strings() {
        let value = format!("/dnsaddr/{}.example.com", "a".repeat(300));
        let text = format!("dnsaddr={value}");
        let rdata = encode_rdata(&text);
        assert_eq!(rdata[0], 255);

        let entry = TxtEntry::from_rdata(&rdata).unwrap();
        assert_eq!(entry.value, value);
    }

    #[test]
    fn test_from_rdata_rejects_bad_payloads() {
        assert!(TxtEntry::from_rdata(&[]).is_none());
        assert!(TxtEntry::from_rdata(&[0]).is_none());
        // Length prefix overruns the payload.
        assert!(TxtEntry::from_rdata(&[10, b'a', b'=', b'b']).is_none());
        // Invalid UTF-8.
        assert!(TxtEntry::from_rdata(&[3, b'a', b'=', 0xff]).is_none());
        // No separator.
        assert!(TxtEntry::from_rdata(&encode_rdata("dnsaddr")).is_none());
    }
}
