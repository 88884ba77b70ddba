//! Versioned binary snapshots.
//!
//! Wraps any serde payload in a [`SnapshotHeader`] and encodes it with
//! `bitcode`. Decoding validates the magic number and version before the
//! payload is handed back.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Magic number identifying a rigworks snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x5249_4701;

/// Bumped whenever a machine's serialized layout changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("could not encode snapshot: {0}")]
    Encode(String),
}

/// Why a snapshot was rejected.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("not a rigworks snapshot (magic 0x{0:08X})")]
    InvalidMagic(u32),
    #[error("snapshot version {0} is too old to load")]
    UnsupportedVersion(u32),
    #[error("snapshot version {0} is newer than {FORMAT_VERSION}")]
    FutureVersion(u32),
    #[error("could not decode snapshot: {0}")]
    Decode(String),
}

/// Leading fields of every snapshot; `tick` is the simulation tick it was
/// taken at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot<T> {
    header: SnapshotHeader,
    payload: T,
}

/// Encode `payload` behind a header stamped with `tick`.
pub fn encode<T: Serialize>(tick: u64, payload: &T) -> Result<Vec<u8>, SerializeError> {
    let snapshot = Snapshot {
        header: SnapshotHeader::new(tick),
        payload,
    };
    bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Decode and validate a snapshot produced by [`encode`].
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<(SnapshotHeader, T), DeserializeError> {
    let snapshot: Snapshot<T> =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    snapshot.header.validate()?;
    Ok((snapshot.header, snapshot.payload))
}
