//! Block-backed object storage for the blockmem engine.
//!
//! Content lives in [`Blob`]s: ordered runs of fixed-size blocks drawn from a
//! [`Disk`](blockmem_disk::Disk). Appends fill the last block's headroom
//! before asking for more, and overwrites hand surplus blocks back, so the
//! bytes copied per write track the bytes that changed.
//!
//! # Components
//!
//! - [`Blob`] -- one object's bytes over a block space
//! - [`ByteReader`] -- lazy, single-pass cursor over a window of a blob
//! - [`ObjectStorage`] -- id-keyed registry of blobs and [`ObjectMetadata`]
//!
//! All registries implement the [`ObjectRegistry`] trait.
//!
//! # Design Rules
//!
//! 1. Ids are assigned by the caller; the registry never generates them.
//! 2. An unknown id reads as `None`; only invalid requests are errors.
//! 3. A failed write leaves the previous content and metadata intact.
//! 4. Blocks are zeroed before they reach a new owner.
//! 5. No internal locking. One external lock guards a registry and its disk.

pub mod blob;
pub mod clock;
pub mod error;
pub mod object;
pub mod reader;
pub mod storage;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use blob::Blob;
pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use error::{StoreError, StoreResult};
pub use object::{ObjectId, ObjectMetadata, StoredObject, WriteMode};
pub use reader::ByteReader;
pub use storage::ObjectStorage;
pub use traits::ObjectRegistry;
