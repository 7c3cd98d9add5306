//! Prompt templates used by the LLM-backed workflow stages

mod template;

pub use template::{PromptTemplate, PromptValues, PromptVariable, TemplateError};
