//! Prompt template parsing and rendering
//!
//! Variable syntax: `${var:name}` (required) or `${var:name:default}`.
//! Rendering is single-pass: substituted values are never re-scanned, so
//! model output quoted back into a later prompt cannot inject variables.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{var:([a-zA-Z0-9][-a-zA-Z0-9]*)(?::([^}]*))?\}").unwrap()
});

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TemplateError {
    #[error("Missing required variable: {name}")]
    MissingVariable { name: String },

    #[error("Unknown variable: {name}")]
    UnknownVariable { name: String },
}

/// A variable referenced by a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptVariable {
    pub name: String,
    pub default: Option<String>,
}

impl PromptVariable {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Values bound to template variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptValues {
    values: BTreeMap<String, String>,
}

impl PromptValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// A parsed prompt template
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    content: String,
    variables: Vec<PromptVariable>,
}

impl PromptTemplate {
    /// Parse a template and collect its variables (first occurrence wins)
    pub fn parse(content: impl Into<String>) -> Self {
        let content = content.into();
        let mut seen = BTreeSet::new();
        let mut variables = Vec::new();

        for cap in VARIABLE_PATTERN.captures_iter(&content) {
            let name = cap[1].to_string();
            if !seen.insert(name.clone()) {
                continue;
            }

            variables.push(PromptVariable {
                name,
                default: cap.get(2).map(|m| m.as_str().to_string()),
            });
        }

        Self { content, variables }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn variables(&self) -> &[PromptVariable] {
        &self.variables
    }

    /// Render with the given values.
    ///
    /// Every required variable must be bound, and every bound value must be
    /// used by the template.
    pub fn render(&self, values: &PromptValues) -> Result<String, TemplateError> {
        if let Some(missing) = self
            .variables
            .iter()
            .find(|v| v.is_required() && values.get(&v.name).is_none())
        {
            return Err(TemplateError::MissingVariable {
                name: missing.name.clone(),
            });
        }

        if let Some(unknown) = values
            .names()
            .find(|name| !self.variables.iter().any(|v| v.name == *name))
        {
            return Err(TemplateError::UnknownVariable {
                name: unknown.to_string(),
            });
        }

        let rendered = VARIABLE_PATTERN.replace_all(&self.content, |cap: &Captures| {
            values
                .get(&cap[1])
                .or_else(|| cap.get(2).map(|m| m.as_str()))
                .unwrap_or_default()
                .to_string()
        });

        Ok(rendered.into_owned())
    }
}
