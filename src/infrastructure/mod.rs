//! Infrastructure layer - Collaborator implementations, workflow engine and services

pub mod incident;
pub mod infra_graph;
pub mod llm;
pub mod logging;
pub mod services;
pub mod triage;
