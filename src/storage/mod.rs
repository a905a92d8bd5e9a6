//! Storage implementations for query execution

pub mod in_memory;

pub use in_memory::InMemoryStore;
