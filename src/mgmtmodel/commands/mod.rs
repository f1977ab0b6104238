use crate::attributes::{AttributeKind, AttributeSpec, ElementStyle, Value, ValueType};
use crate::config::MgmtConfig;
use crate::model::Address;
use crate::resources::ResourceKind;
use serde_json::json;

pub mod add;
pub mod config;
pub mod describe;
pub mod export;
pub mod helpers;
pub mod read;
pub mod remove;
pub mod validate;
pub mod write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub resources: Vec<ResourceView>,
    pub description: Option<ResourceDescription>,
    pub document: Option<String>,
    pub config: Option<MgmtConfig>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_resources(mut self, resources: Vec<ResourceView>) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_description(mut self, description: ResourceDescription) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_document(mut self, document: String) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_config(mut self, config: MgmtConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// One resource as returned by reads. Attributes are in declaration order;
/// `None` means undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceView {
    pub address: Address,
    pub kind: ResourceKind,
    pub attributes: Vec<(&'static str, Option<Value>)>,
    pub children: Vec<Address>,
}

impl ResourceView {
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn to_json(&self) -> serde_json::Value {
        let attributes: serde_json::Map<String, serde_json::Value> = self
            .attributes
            .iter()
            .map(|(name, value)| {
                let value = value
                    .as_ref()
                    .map(Value::to_json)
                    .unwrap_or(serde_json::Value::Null);
                (name.to_string(), value)
            })
            .collect();
        json!({
            "address": self.address.to_string(),
            "attributes": attributes,
            "children": self.children.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescription {
    pub name: &'static str,
    pub value_type: &'static str,
    pub required: bool,
    pub default: Option<Value>,
    pub expressions_allowed: bool,
    pub constraint: Option<String>,
    pub xml: &'static str,
    pub description: &'static str,
}

impl From<&AttributeSpec> for AttributeDescription {
    fn from(spec: &AttributeSpec) -> Self {
        let value_type = match (spec.kind, spec.value_type) {
            (AttributeKind::StringList, _) => "list of strings",
            (AttributeKind::Scalar, ValueType::Boolean) => "boolean",
            (AttributeKind::Scalar, ValueType::String) => "string",
        };
        let xml = match spec.style {
            ElementStyle::Attribute => "attribute",
            ElementStyle::WrappedScalar => "element",
            ElementStyle::JoinedList => "space-separated element",
        };
        Self {
            name: spec.name,
            value_type,
            required: spec.is_required(),
            default: spec.default.clone(),
            expressions_allowed: spec.allow_expression,
            constraint: spec.validator.as_ref().map(|v| v.to_string()),
            xml,
            description: spec.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescription {
    pub kind: ResourceKind,
    pub description: &'static str,
    pub requires_runtime: bool,
    pub attributes: Vec<AttributeDescription>,
    /// Path patterns of the child kinds, e.g. `security=sasl`.
    pub children: Vec<String>,
}
