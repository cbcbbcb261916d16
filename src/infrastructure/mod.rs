//! Adapters for the domain ports: transaction stores and the acquirer's
//! confirmation endpoint.

pub mod http_confirm;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
