//! Ephemeral store adapters.
//!
//! - [`MemoryEphemeralStore`] keeps entries in process and evicts lazily. It
//!   suits single-instance deployments and tests.
//! - [`RedisEphemeralStore`] shares entries across instances through Redis
//!   `SET ... EX`, letting the server expire them.

mod memory;
mod redis;

pub use memory::MemoryEphemeralStore;
pub use redis::{RedisEphemeralStore, RedisStoreError};
