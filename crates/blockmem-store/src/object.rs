use std::fmt;

use serde::{Deserialize, Serialize};

use crate::blob::Blob;
use crate::clock::Timestamp;

/// Caller-assigned object identifier.
///
/// The registry never generates ids; uniqueness is the caller's contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ObjectId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a write combines new content with what is already stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteMode {
    /// Extend the existing content at its tail.
    Append,
    /// Replace the existing content entirely.
    Overwrite,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => write!(f, "append"),
            Self::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// Usage timestamps of one object.
///
/// Updated on reads and writes, never by allocation alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub created_at: Timestamp,
    pub last_accessed_at: Timestamp,
    pub last_modified_at: Timestamp,
}

impl ObjectMetadata {
    /// Metadata for an object created at `now`.
    pub fn created(now: Timestamp) -> Self {
        Self {
            created_at: now,
            last_accessed_at: now,
            last_modified_at: now,
        }
    }
}

/// A registry entry: metadata plus the buffer holding the content.
#[derive(Debug)]
pub struct StoredObject {
    pub metadata: ObjectMetadata,
    pub blob: Blob,
}
