//! Similarity search implementations

mod in_memory;

pub use in_memory::InMemoryIncidentIndex;
