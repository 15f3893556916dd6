//! Compact registries backing path resolution.

pub mod list;
pub mod pools;

pub use list::AddressList;
pub use pools::{canonical_pair, PoolRegistry};
