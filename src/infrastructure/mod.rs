//! Store adapters implementing [`KvStore`](crate::domain::ports::KvStore).

pub mod in_memory;
pub mod redis;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
