//! The SurfStore block store (spec.md §4.1): an in-memory, content-addressed
//! map from block fingerprint to block bytes, served over gRPC.

pub mod block_map;
pub mod service;

pub use block_map::BlockMap;
pub use service::BlockStoreService;
