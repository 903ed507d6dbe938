//! Field encodings shared by inbound and outbound messages
//!
//! - hex-pair text, the form used in logs and by hosts that hand SysEx around as strings
//! - 7-bit index splitting for bank positions above 127
//! - display names folded to ASCII and null-padded to a fixed field
//! - truncated SHA-1 digests used as parameter and device identifiers

use once_cell::sync::Lazy;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fmt;

use super::inbound::DecodeError;
use crate::midi::{convert, format_hex};

/// Width of every name field on the wire
pub const NAME_FIELD_LEN: usize = 13;

/// Visible characters for track and parameter labels
pub const LABEL_CHARS: usize = 12;

/// Visible characters for device names
pub const DEVICE_NAME_CHARS: usize = 13;

/// Digest length used for parameter identifiers
pub const PARAMETER_HASH_LEN: usize = 6;

/// Digest length used for device identifiers
pub const DEVICE_HASH_LEN: usize = 8;

static FOLD_TABLE: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    [
        ('ä', "a"),
        ('ü', "u"),
        ('ö', "o"),
        ('Ä', "A"),
        ('Ü', "U"),
        ('Ö', "O"),
        ('ß', "ss"),
        ('é', "e"),
        ('è', "e"),
        ('ê', "e"),
        ('â', "a"),
        ('á', "a"),
        ('à', "a"),
        ('û', "u"),
        ('ú', "u"),
        ('ù', "u"),
        ('ô', "o"),
        ('ó', "o"),
        ('ò', "o"),
    ]
    .into_iter()
    .collect()
});

/// Render bytes as uppercase, space separated hex pairs
pub fn to_hex_pairs(bytes: &[u8]) -> String {
    format_hex(bytes)
}

/// Parse hex text in either `F0 00 22` or `f00022` form
pub fn parse_hex_text(text: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|_| DecodeError::InvalidHex(text.to_string()))
}

/// Encode a bank index as (high, low) 7-bit bytes, clamped to 14 bits
pub fn encode_index(value: i32) -> [u8; 2] {
    let clamped = value.clamp(0, convert::MAX_14BIT as i32) as u16;
    let (high, low) = convert::split14(clamped);
    [high, low]
}

/// Decode a (high, low) index pair
pub fn decode_index(high: u8, low: u8) -> u16 {
    convert::join14(high, low)
}

/// Fold a name to ASCII, dropping non-ASCII characters with no substitute
///
/// ASCII passes through unchanged, control characters included.
pub fn fold_ascii(name: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(max_chars + 1);
    for c in name.chars() {
        if out.len() >= max_chars {
            break;
        }
        if c.is_ascii() {
            out.push(c);
        } else if let Some(substitute) = FOLD_TABLE.get(&c) {
            out.push_str(substitute);
        }
    }
    // Substitutes are ASCII, so byte truncation stays on a char boundary.
    out.truncate(max_chars);
    out
}

/// A fixed-width, null-padded name field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayName([u8; NAME_FIELD_LEN]);

impl DisplayName {
    /// Fold `name` and keep at most `max_chars` characters
    pub fn encode(name: &str, max_chars: usize) -> Self {
        let folded = fold_ascii(name, max_chars.min(NAME_FIELD_LEN));
        let mut field = [0u8; NAME_FIELD_LEN];
        field[..folded.len()].copy_from_slice(folded.as_bytes());
        Self(field)
    }

    /// Label form used for tracks and parameters
    pub fn label(name: &str) -> Self {
        Self::encode(name, LABEL_CHARS)
    }

    /// Full-width form used for device names and value readouts
    pub fn full(name: &str) -> Self {
        Self::encode(name, DEVICE_NAME_CHARS)
    }

    pub fn empty() -> Self {
        Self([0u8; NAME_FIELD_LEN])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Read a name field back, stopping at the first null byte
    pub fn decode(bytes: &[u8]) -> String {
        bytes
            .iter()
            .take(NAME_FIELD_LEN)
            .take_while(|&&b| b != 0)
            .map(|&b| (b & 0x7F) as char)
            .collect()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::decode(&self.0))
    }
}

/// Truncated, 7-bit masked SHA-1 digest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashDigest(Vec<u8>);

impl HashDigest {
    /// Digest of `path`, keeping the first `len` bytes
    pub fn of(path: &str, len: usize) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(path.as_bytes());
        let digest = hasher.finalize();
        Self(digest.iter().take(len).map(|b| b & 0x7F).collect())
    }

    /// Parameter identifier (6 bytes)
    pub fn parameter(path: &str) -> Self {
        Self::of(path, PARAMETER_HASH_LEN)
    }

    /// Device identifier (8 bytes)
    pub fn device(name: &str) -> Self {
        Self::of(name, DEVICE_HASH_LEN)
    }

    /// Wrap digest bytes received from the surface
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| b & 0x7F).collect())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Concatenated lowercase hex, used as a map key
    pub fn key(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
