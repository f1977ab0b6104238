use crate::commands::{AttributeDescription, CmdResult, ResourceDescription};
use crate::error::Result;
use crate::model::Address;
use crate::resources::ResourceRegistry;

/// Describe the resource kind at `address`. Wildcard values such as
/// `connector=*` are accepted.
pub fn run(registry: &ResourceRegistry, address: &Address) -> Result<CmdResult> {
    let definition = registry.resolve(address)?;
    let description = ResourceDescription {
        kind: definition.kind,
        description: definition.description,
        requires_runtime: definition.requires_runtime(),
        attributes: definition
            .attributes
            .list()
            .iter()
            .map(AttributeDescription::from)
            .collect(),
        children: registry
            .children_of(Some(definition.kind))
            .map(|d| d.path.to_string())
            .collect(),
    };
    Ok(CmdResult::default().with_description(description))
}
