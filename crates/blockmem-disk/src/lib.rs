//! Fixed-capacity block allocator for the blockmem storage engine.
//!
//! A [`Disk`] accounts for a fixed number of equally sized blocks and hands
//! them out as [`Space`]s: ordered runs of zero-filled [`Block`]s owned by
//! exactly one buffer at a time.
//!
//! # Design Rules
//!
//! 1. A block is zeroed before any new owner can see it.
//! 2. `allocate` either succeeds completely or changes nothing.
//! 3. `available() + used() == total_capacity()` at all times.
//! 4. No internal locking: mutation takes `&mut self`.
//! 5. Failures are returned as [`DiskError`], never logged.

pub mod block;
pub mod config;
pub mod disk;
pub mod error;

pub use block::{Block, Space};
pub use config::DiskConfig;
pub use disk::{Disk, DiskStats, MIN_BLOCK_SIZE};
pub use error::{DiskError, DiskResult};
