//! Remoting subsystem and its connectors.

use super::{PathPattern, ResourceDefinition, ResourceKind, RuntimeContext};
use crate::attributes::{AttributeRegistry, AttributeSpec, Validator, ValueType};
use crate::error::{MgmtError, Result};
use crate::model::{Address, ResourceModel};
use crate::services::{ServiceConfig, ServiceRequest};

pub const SOCKET_BINDING: &str = "socket-binding";
pub const AUTHENTICATION_PROVIDER: &str = "authentication-provider";

pub fn subsystem() -> ResourceDefinition {
    ResourceDefinition::new(
        ResourceKind::RemotingSubsystem,
        PathPattern::fixed("subsystem", "remoting"),
        "subsystem",
        AttributeRegistry::new(),
    )
    .describe("Remoting subsystem")
}

pub fn connector() -> Result<ResourceDefinition> {
    let attributes = AttributeRegistry::from_specs([
        AttributeSpec::scalar(SOCKET_BINDING, ValueType::String)
            .validator(Validator::min_length(1))
            .describe("Socket binding the connector listens on"),
        AttributeSpec::scalar(AUTHENTICATION_PROVIDER, ValueType::String)
            .nullable()
            .validator(Validator::min_length(1))
            .describe("Name of the authentication provider"),
    ])?;

    Ok(ResourceDefinition::new(
        ResourceKind::Connector,
        PathPattern::wildcard("connector"),
        "connector",
        attributes,
    )
    .child_of(ResourceKind::RemotingSubsystem)
    .runtime(install_connector)
    .describe("Remoting connector"))
}

fn install_connector(
    ctx: &RuntimeContext<'_>,
    address: &Address,
    model: &ResourceModel,
) -> Result<Vec<ServiceRequest>> {
    let connector = address
        .last()
        .map(|e| e.value.clone())
        .ok_or_else(|| MgmtError::UnknownAddress(address.clone()))?;
    let socket_binding = ctx
        .resolve(ResourceKind::Connector, model, SOCKET_BINDING)?
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| MgmtError::Api(format!("{} has no {}", address, SOCKET_BINDING)))?;
    let authentication_provider = ctx
        .resolve(ResourceKind::Connector, model, AUTHENTICATION_PROVIDER)?
        .and_then(|v| v.as_str().map(str::to_string));

    Ok(vec![ServiceRequest::new(
        format!("remoting-connector.{}", connector),
        ServiceConfig::RemotingConnector {
            connector,
            socket_binding,
            authentication_provider,
        },
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Value;
    use crate::expression::PropertyResolver;
    use crate::model::ConfigTree;
    use crate::resources::ResourceRegistry;

    #[test]
    fn plan_installs_named_connector_service() {
        let registry = ResourceRegistry::standard().unwrap();
        let resolver = PropertyResolver::default();
        let tree = ConfigTree::new();
        let ctx = RuntimeContext {
            tree: &tree,
            registry: &registry,
            resolver: &resolver,
        };
        let definition = connector().unwrap();
        let model = ResourceModel::populate(
            &definition.attributes,
            [(SOCKET_BINDING.to_string(), Value::String("remoting".into()))]
                .into_iter()
                .collect(),
            &resolver,
        )
        .unwrap();
        let address = Address::parse("/subsystem=remoting/connector=default").unwrap();

        let requests = install_connector(&ctx, &address, &model).unwrap();
        assert_eq!(
            requests,
            vec![ServiceRequest::new(
                "remoting-connector.default",
                ServiceConfig::RemotingConnector {
                    connector: "default".into(),
                    socket_binding: "remoting".into(),
                    authentication_provider: None,
                }
            )]
        );
    }

    #[test]
    fn socket_binding_must_be_non_empty() {
        let definition = connector().unwrap();
        let err = ResourceModel::populate(
            &definition.attributes,
            [(SOCKET_BINDING.to_string(), Value::String(String::new()))]
                .into_iter()
                .collect(),
            &PropertyResolver::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MgmtError::Validation(e) if e.attribute == SOCKET_BINDING));
    }
}
