//! Entry name decoding and the retained-names table.
//!
//! The format's name field is raw bytes with no guaranteed encoding. Names
//! are decoded UTF-8 first, then windows-1252. Because the legacy decode is
//! not reversible by re-encoding the text, the archive keeps a side table
//! mapping each decoded name back to the original bytes; lookups consult it
//! before falling back to UTF-8 re-encoding.

use encoding_rs::WINDOWS_1252;
use std::collections::HashMap;

/// Decode a raw entry name.
///
/// Strict UTF-8 when the bytes are valid UTF-8; windows-1252 otherwise,
/// which maps every byte and so never produces replacement characters.
pub fn decode_name(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(name) => name.to_string(),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1252.decode(raw);
            decoded.into_owned()
        }
    }
}

/// Archive-owned mapping from decoded name to original raw bytes.
#[derive(Debug, Default)]
pub(crate) struct RetainedNames {
    map: HashMap<String, Vec<u8>>,
}

impl RetainedNames {
    pub(crate) fn insert(&mut self, name: &str, raw: &[u8]) {
        self.map.insert(name.to_string(), raw.to_vec());
    }

    /// The original bytes for a decoded name, when it has been retained.
    pub(crate) fn lookup(&self, name: &str) -> Option<&[u8]> {
        self.map.get(name).map(Vec::as_slice)
    }

    /// Drop every retained mapping, ahead of a fresh full listing.
    pub(crate) fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_name_passes_through() {
        assert_eq!(decode_name("dir/caf\u{e9}.txt".as_bytes()), "dir/café.txt");
    }

    #[test]
    fn test_legacy_bytes_decode_as_windows_1252() {
        // 0xE9 is not valid UTF-8 on its own; windows-1252 maps it to é.
        assert_eq!(decode_name(b"caf\xE9.txt"), "café.txt");
    }

    #[test]
    fn test_legacy_decode_is_not_reversible_by_reencoding() {
        let raw = b"caf\xE9.txt";
        let decoded = decode_name(raw);
        assert_ne!(decoded.as_bytes(), &raw[..]);
    }

    #[test]
    fn test_retained_lookup_survives_lossy_decode() {
        let raw = b"caf\xE9.txt";
        let decoded = decode_name(raw);

        let mut retained = RetainedNames::default();
        retained.insert(&decoded, raw);
        assert_eq!(retained.lookup(&decoded), Some(&raw[..]));
        assert_eq!(retained.lookup("other"), None);

        retained.clear();
        assert_eq!(retained.lookup(&decoded), None);
    }
}
