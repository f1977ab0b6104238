//! JMX subsystem: exposed management models and the remoting connector.
//!
//! The remoting connector's service needs the domain names under which the
//! resolved and expression models are exposed. It reads them from its
//! `expose-model` siblings at add time; a model that is not exposed
//! contributes no domain.

use super::{PathPattern, ResourceDefinition, ResourceKind, RuntimeContext};
use crate::attributes::{AttributeRegistry, AttributeSpec, Validator, Value, ValueType};
use crate::error::Result;
use crate::model::{Address, ResourceModel};
use crate::services::{ServiceConfig, ServiceRequest};

pub const DOMAIN_NAME: &str = "domain-name";
pub const PROPER_PROPERTY_FORMAT: &str = "proper-property-format";
pub const USE_MANAGEMENT_ENDPOINT: &str = "use-management-endpoint";

pub const DEFAULT_RESOLVED_DOMAIN: &str = "jboss.as";
pub const DEFAULT_EXPRESSION_DOMAIN: &str = "jboss.as.expr";
pub const DEFAULT_USE_MANAGEMENT_ENDPOINT: bool = true;

pub const JMX_CONNECTOR_SERVICE: &str = "jmx-remoting-connector";

pub fn subsystem() -> ResourceDefinition {
    ResourceDefinition::new(
        ResourceKind::JmxSubsystem,
        PathPattern::fixed("subsystem", "jmx"),
        "subsystem",
        AttributeRegistry::new(),
    )
    .describe("JMX subsystem")
}

fn domain_name(default: &'static str) -> AttributeSpec {
    AttributeSpec::scalar(DOMAIN_NAME, ValueType::String)
        .default_value(Value::String(default.to_string()))
        .nullable()
        .expressions()
        .validator(Validator::min_length(1))
        .describe("Domain under which the model is exposed")
}

pub fn expose_resolved_model() -> Result<ResourceDefinition> {
    let attributes = AttributeRegistry::from_specs([
        domain_name(DEFAULT_RESOLVED_DOMAIN),
        AttributeSpec::scalar(PROPER_PROPERTY_FORMAT, ValueType::Boolean)
            .default_value(Value::Bool(true))
            .nullable()
            .expressions()
            .describe("Whether object names use proper property formatting"),
    ])?;

    Ok(ResourceDefinition::new(
        ResourceKind::ExposeResolvedModel,
        PathPattern::fixed("expose-model", "resolved"),
        "expose-model",
        attributes,
    )
    .child_of(ResourceKind::JmxSubsystem)
    .describe("Exposes the resolved management model over JMX"))
}

pub fn expose_expression_model() -> Result<ResourceDefinition> {
    let attributes = AttributeRegistry::from_specs([domain_name(DEFAULT_EXPRESSION_DOMAIN)])?;

    Ok(ResourceDefinition::new(
        ResourceKind::ExposeExpressionModel,
        PathPattern::fixed("expose-model", "expression"),
        "expose-model",
        attributes,
    )
    .child_of(ResourceKind::JmxSubsystem)
    .describe("Exposes the unresolved (expression) management model over JMX"))
}

pub fn remoting_connector() -> Result<ResourceDefinition> {
    let attributes = AttributeRegistry::from_specs([AttributeSpec::scalar(
        USE_MANAGEMENT_ENDPOINT,
        ValueType::Boolean,
    )
    .default_value(Value::Bool(DEFAULT_USE_MANAGEMENT_ENDPOINT))
    .nullable()
    .expressions()
    .describe("Use the management endpoint instead of the remoting subsystem endpoint")])?;

    Ok(ResourceDefinition::new(
        ResourceKind::JmxRemotingConnector,
        PathPattern::fixed("remoting-connector", "jmx"),
        "remoting-connector",
        attributes,
    )
    .child_of(ResourceKind::JmxSubsystem)
    .runtime(install_remoting_connector)
    .reads_siblings(&[
        ResourceKind::ExposeResolvedModel,
        ResourceKind::ExposeExpressionModel,
    ])
    .describe("JMX access over remoting"))
}

fn install_remoting_connector(
    ctx: &RuntimeContext<'_>,
    address: &Address,
    model: &ResourceModel,
) -> Result<Vec<ServiceRequest>> {
    let use_management_endpoint = ctx
        .resolve(
            ResourceKind::JmxRemotingConnector,
            model,
            USE_MANAGEMENT_ENDPOINT,
        )?
        .and_then(|v| v.as_bool())
        .unwrap_or(DEFAULT_USE_MANAGEMENT_ENDPOINT);

    let domain = |kind| -> Result<Option<String>> {
        Ok(ctx
            .read_sibling_attribute(address, kind, DOMAIN_NAME)?
            .and_then(|v| v.as_str().map(str::to_string)))
    };
    let resolved_domain = domain(ResourceKind::ExposeResolvedModel)?;
    let expression_domain = domain(ResourceKind::ExposeExpressionModel)?;

    Ok(vec![ServiceRequest::new(
        JMX_CONNECTOR_SERVICE,
        ServiceConfig::JmxRemotingConnector {
            use_management_endpoint,
            resolved_domain,
            expression_domain,
        },
    )])
}
