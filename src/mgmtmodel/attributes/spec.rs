//! Attribute specifications and the per-resource attribute registry.
//!
//! A spec is built once, when its resource definition is constructed, and is
//! immutable afterwards. The registry keeps specs in declaration order, which
//! drives both marshalling order and batch validation order.

use super::validator::Validator;
use super::value::{is_expression, Value};
use crate::error::{MgmtError, Result};

/// The shape of an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// A single value (e.g., `server-auth`)
    Scalar,

    /// An ordered list of strings (e.g., `qop`)
    StringList,
}

/// The type of a scalar value, or of each element of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Boolean,
    String,
}

/// How an attribute is written into the XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementStyle {
    /// An XML attribute on the owning resource element: `<connector socket-binding="x"/>`
    Attribute,

    /// A dedicated empty element: `<server-auth value="true"/>`
    WrappedScalar,

    /// A dedicated empty element holding the space-joined list: `<qop value="auth auth-int"/>`
    ///
    /// Emitted only when the list has at least one element.
    JoinedList,
}

/// Specification for a single configuration attribute.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    /// Attribute name, unique within its resource type (e.g., "qop")
    pub name: &'static str,

    pub kind: AttributeKind,

    pub value_type: ValueType,

    /// Value reported for reads with defaults and used by runtime resolution
    /// when the attribute is undefined.
    pub default: Option<Value>,

    /// Whether the attribute may be left undefined.
    pub nullable: bool,

    /// Whether `${...}` expressions are accepted in place of a literal.
    pub allow_expression: bool,

    pub validator: Option<Validator>,

    pub style: ElementStyle,

    /// One-line description shown by `describe`.
    pub description: &'static str,
}

impl AttributeSpec {
    /// Create a required scalar attribute written as an XML attribute.
    pub fn scalar(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            kind: AttributeKind::Scalar,
            value_type,
            default: None,
            nullable: false,
            allow_expression: false,
            validator: None,
            style: ElementStyle::Attribute,
            description: "",
        }
    }

    /// Create a required string-list attribute written as a joined list element.
    pub fn list(name: &'static str) -> Self {
        Self {
            name,
            kind: AttributeKind::StringList,
            value_type: ValueType::String,
            default: None,
            nullable: false,
            allow_expression: false,
            validator: None,
            style: ElementStyle::JoinedList,
            description: "",
        }
    }

    /// Set the default value. An attribute with a default never needs to be supplied.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Allow the attribute to be undefined.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Accept `${...}` expressions.
    pub fn expressions(mut self) -> Self {
        self.allow_expression = true;
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Marshal a scalar as `<name value="..."/>` instead of an XML attribute.
    pub fn wrapped(mut self) -> Self {
        self.style = ElementStyle::WrappedScalar;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Whether an add operation must supply this attribute.
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none()
    }

    /// Parse a raw command-line token into a value of this attribute's shape.
    ///
    /// Lists are comma separated; an empty token gives an empty list. Booleans
    /// are left as strings and coerced during validation.
    pub fn parse_input(&self, raw: &str) -> Value {
        if self.allow_expression && is_expression(raw) {
            return Value::Expression(raw.to_string());
        }
        match self.kind {
            AttributeKind::StringList if raw.is_empty() => Value::List(Vec::new()),
            AttributeKind::StringList => {
                Value::List(raw.split(',').map(|s| s.trim().to_string()).collect())
            }
            AttributeKind::Scalar => Value::String(raw.to_string()),
        }
    }
}

/// The ordered attribute set of one resource type.
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    specs: Vec<AttributeSpec>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from specs in declaration order.
    pub fn from_specs(specs: impl IntoIterator<Item = AttributeSpec>) -> Result<Self> {
        let mut registry = Self::new();
        for spec in specs {
            registry.define(spec)?;
        }
        Ok(registry)
    }

    pub fn define(&mut self, spec: AttributeSpec) -> Result<()> {
        if self.specs.iter().any(|s| s.name == spec.name) {
            return Err(MgmtError::DuplicateAttribute(spec.name.to_string()));
        }
        self.specs.push(spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&AttributeSpec> {
        self.specs
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| MgmtError::UnknownAttribute(name.to_string()))
    }

    /// Specs in declaration order.
    pub fn list(&self) -> &[AttributeSpec] {
        &self.specs
    }

    /// Declaration position of an attribute, used to order batch writes.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|s| s.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
