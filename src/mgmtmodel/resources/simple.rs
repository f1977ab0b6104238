//! A minimal subsystem: no attributes, one service.

use super::{PathPattern, ResourceDefinition, ResourceKind, RuntimeContext};
use crate::attributes::AttributeRegistry;
use crate::error::Result;
use crate::model::{Address, ResourceModel};
use crate::services::{ServiceConfig, ServiceRequest};

pub const SIMPLE_SERVICE: &str = "simple";

pub fn subsystem() -> ResourceDefinition {
    ResourceDefinition::new(
        ResourceKind::SimpleSubsystem,
        PathPattern::fixed("subsystem", "simple"),
        "subsystem",
        AttributeRegistry::new(),
    )
    .runtime(install_simple)
    .describe("Simple subsystem")
}

fn install_simple(
    _ctx: &RuntimeContext<'_>,
    _address: &Address,
    _model: &ResourceModel,
) -> Result<Vec<ServiceRequest>> {
    Ok(vec![ServiceRequest::new(SIMPLE_SERVICE, ServiceConfig::Simple)])
}
