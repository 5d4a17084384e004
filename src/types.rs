//! Shared identifier types and sizing constants.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Raw 32-byte BLAKE3 digest
pub type Hash = [u8; 32];

/// Default leaf chunk size (1 MiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 1 << 20;

/// Largest accepted leaf chunk size (1 GiB)
pub const MAX_CHUNK_SIZE: u64 = 1 << 30;

/// Default interim breakpoint (10 MiB)
pub const DEFAULT_BREAKPOINT: u64 = 10 << 20;

/// Default number of links a parent block carries before it is split
pub const DEFAULT_LINKS_PER_BLOCK: usize = 174;

/// Content identifier of a DAG node: the BLAKE3 digest of its encoded block.
///
/// Identical block bytes always produce the same identifier, which is what
/// gives the DAG its deduplication and tamper detection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(Hash);

impl ContentId {
    pub fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", &self.to_hex()[..16])
    }
}

/// Hex string in human-readable formats (JSON, TOML), raw bytes otherwise
impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            ContentId::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            Ok(Self(Hash::deserialize(deserializer)?))
        }
    }
}
