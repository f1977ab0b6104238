//! Attribute value types.

use std::fmt;

/// Runtime representation of an attribute value.
///
/// Values stored in a resource model have already passed validation, with one
/// exception: an [`Value::Expression`] is kept unresolved, and only its
/// resolution at write time was validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),

    String(String),

    /// Ordered list of strings. Duplicates are allowed.
    List(Vec<String>),

    /// Unresolved `${...}` placeholder.
    Expression(String),
}

impl Value {
    /// Get the boolean if this is a Bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the text of a String or Expression.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Expression(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Value::Expression(_))
    }

    /// JSON rendering used by `read --json`.
    ///
    /// Expressions are wrapped as `{"EXPRESSION": "..."}` so they cannot be
    /// mistaken for literal strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|s| serde_json::Value::String(s.clone()))
                    .collect(),
            ),
            Value::Expression(e) => serde_json::json!({ "EXPRESSION": e }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) | Value::Expression(s) => write!(f, "{}", s),
            Value::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Whether text contains a `${...}` placeholder.
pub fn is_expression(text: &str) -> bool {
    match text.find("${") {
        Some(start) => text[start + 2..].contains('}'),
        None => false,
    }
}
