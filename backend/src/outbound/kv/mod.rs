//! Key-value store adapters.
//!
//! The in-memory store backs tests and single-process runs; the Redis store
//! is used whenever a Redis URL is configured.

mod memory;
mod redis;

pub use memory::InMemoryKeyValueStore;
pub use redis::RedisKeyValueStore;
