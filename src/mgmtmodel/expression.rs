//! # Expression Resolution
//!
//! Attributes that allow expressions may hold `${...}` placeholders instead of
//! literals. Writes resolve the placeholder, validate the resolved text, and
//! store the placeholder itself; runtime wiring resolves it again when it reads
//! the model.
//!
//! ## Syntax
//!
//! | Form | Meaning |
//! |------|---------|
//! | `${name}` | property `name`, error if undefined |
//! | `${name:fallback}` | property `name`, else `fallback` |
//! | `${a,b:fallback}` | first defined of `a`, `b`, else `fallback` |
//! | `${env.HOME}` | environment variable `HOME` (when enabled) |
//!
//! Placeholders may be embedded in literal text (`tcp://${host}:${port:4447}`).

use crate::error::{MgmtError, Result};
use std::collections::BTreeMap;

/// Resolves `${...}` placeholders to text.
pub trait ExpressionResolver {
    fn resolve(&self, expression: &str) -> Result<String>;
}

/// Resolver backed by a property table, optionally falling back to the environment.
#[derive(Debug, Clone, Default)]
pub struct PropertyResolver {
    properties: BTreeMap<String, String>,
    use_env: bool,
}

impl PropertyResolver {
    pub fn new(properties: BTreeMap<String, String>) -> Self {
        Self {
            properties,
            use_env: false,
        }
    }

    /// Enable `${env.NAME}` lookups.
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    fn lookup(&self, key: &str) -> Option<String> {
        if let Some(value) = self.properties.get(key) {
            return Some(value.clone());
        }
        if self.use_env {
            if let Some(var) = key.strip_prefix("env.") {
                return std::env::var(var).ok();
            }
        }
        None
    }

    fn resolve_placeholder(&self, expression: &str, body: &str) -> Result<String> {
        let (keys, fallback) = match body.split_once(':') {
            Some((keys, fallback)) => (keys, Some(fallback)),
            None => (body, None),
        };
        keys.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .find_map(|k| self.lookup(k))
            .or_else(|| fallback.map(str::to_string))
            .ok_or_else(|| MgmtError::Expression(expression.to_string()))
    }
}

impl ExpressionResolver for PropertyResolver {
    fn resolve(&self, expression: &str) -> Result<String> {
        let mut resolved = String::with_capacity(expression.len());
        let mut rest = expression;
        while let Some(start) = rest.find("${") {
            resolved.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| MgmtError::Expression(expression.to_string()))?;
            resolved.push_str(&self.resolve_placeholder(expression, &after[..end])?);
            rest = &after[end + 1..];
        }
        resolved.push_str(rest);
        Ok(resolved)
    }
}
