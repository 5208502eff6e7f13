//! Storage implementations.

mod memory;

pub use memory::{FallbackEntry, MemoryStore};
