// splitbook-memory — In-memory database adapter for splitbook.
//
// Uses a HashMap-based store for fast, ephemeral data storage.
// Ideal for testing, prototyping, and development.

pub mod adapter;

pub use adapter::MemoryAdapter;
