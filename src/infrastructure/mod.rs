//! Store implementations behind the domain ports, plus the demo seed data.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod seed;
pub mod session_file;
