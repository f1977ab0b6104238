//! Attribute validation.
//!
//! Rules:
//! - List attributes validate every element on its own
//! - Allowed-value sets carry an explicit case policy; case-insensitive sets
//!   canonicalize accepted input to the declared member
//! - Joined-list elements must be non-empty and free of whitespace, since the
//!   XML encoding separates elements with a single space
//! - Boolean attributes accept `true`/`false` in any case and normalize to `Bool`

use super::spec::{AttributeKind, AttributeSpec, ElementStyle, ValueType};
use super::value::Value;
use std::fmt;

/// A constraint attached to an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    /// The value must be one of a fixed set.
    AllowedValues {
        values: &'static [&'static str],
        case_sensitive: bool,
    },

    /// The value's length in characters must fall within bounds.
    Length { min: usize, max: Option<usize> },
}

impl Validator {
    pub fn allowed(values: &'static [&'static str], case_sensitive: bool) -> Self {
        Validator::AllowedValues {
            values,
            case_sensitive,
        }
    }

    pub fn min_length(min: usize) -> Self {
        Validator::Length { min, max: None }
    }

    /// Check a single string, returning its canonical form or the violated constraint.
    fn check(&self, item: &str) -> Result<String, String> {
        match self {
            Validator::AllowedValues {
                values,
                case_sensitive: true,
            } => values
                .iter()
                .find(|v| **v == item)
                .map(|v| v.to_string())
                .ok_or_else(|| self.to_string()),
            Validator::AllowedValues {
                values,
                case_sensitive: false,
            } => values
                .iter()
                .find(|v| v.eq_ignore_ascii_case(item))
                .map(|v| v.to_string())
                .ok_or_else(|| self.to_string()),
            Validator::Length { min, max } => {
                let len = item.chars().count();
                if len < *min || max.is_some_and(|max| len > max) {
                    Err(self.to_string())
                } else {
                    Ok(item.to_string())
                }
            }
        }
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::AllowedValues {
                values,
                case_sensitive,
            } => {
                write!(f, "must be one of [{}]", values.join(", "))?;
                if !case_sensitive {
                    write!(f, " (case-insensitive)")?;
                }
                Ok(())
            }
            Validator::Length { min, max: None } => {
                write!(f, "length must be at least {}", min)
            }
            Validator::Length {
                min,
                max: Some(max),
            } => write!(f, "length must be between {} and {}", min, max),
        }
    }
}

/// A rejected attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub attribute: String,
    pub value: String,
    pub constraint: String,
}

impl ValidationError {
    pub fn new(
        attribute: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not a valid value for '{}': {}",
            self.value, self.attribute, self.constraint
        )
    }
}

impl std::error::Error for ValidationError {}

/// Validate a resolved candidate against its spec, returning the value to store.
///
/// Expressions must be resolved before calling this; an unresolved one is
/// rejected.
pub fn validate(spec: &AttributeSpec, candidate: &Value) -> Result<Value, ValidationError> {
    let reject = |value: &dyn fmt::Display, constraint: &str| {
        ValidationError::new(spec.name, value.to_string(), constraint)
    };

    match (spec.kind, candidate) {
        (_, Value::Expression(expr)) => Err(reject(expr, "expression must be resolved first")),
        (AttributeKind::StringList, Value::List(items)) => {
            let mut accepted = Vec::with_capacity(items.len());
            for item in items {
                if spec.style == ElementStyle::JoinedList
                    && (item.is_empty() || item.chars().any(char::is_whitespace))
                {
                    return Err(reject(
                        item,
                        "list elements must be non-empty and contain no whitespace",
                    ));
                }
                accepted.push(check_element(spec, item)?);
            }
            Ok(Value::List(accepted))
        }
        (AttributeKind::StringList, other) => Err(reject(other, "expected a list of strings")),
        (AttributeKind::Scalar, Value::List(_)) => {
            Err(reject(candidate, "expected a single value, not a list"))
        }
        (AttributeKind::Scalar, value) => match spec.value_type {
            ValueType::Boolean => coerce_bool(value)
                .map(Value::Bool)
                .ok_or_else(|| reject(value, "expected a boolean (true or false)")),
            ValueType::String => {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                check_element(spec, &text).map(Value::String)
            }
        },
    }
}

fn check_element(spec: &AttributeSpec, item: &str) -> Result<String, ValidationError> {
    match &spec.validator {
        Some(validator) => validator
            .check(item)
            .map_err(|constraint| ValidationError::new(spec.name, item, constraint)),
        None => Ok(item.to_string()),
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}
