//! Infrastructure context resolvers

mod graph;
mod static_context;

pub use graph::{InfrastructureGraph, InfrastructureGraphResolver};
pub use static_context::StaticContextResolver;
