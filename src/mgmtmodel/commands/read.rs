use crate::commands::{CmdResult, ResourceView};
use crate::error::{MgmtError, Result};
use crate::model::{Address, ConfigTree};
use crate::resources::ResourceRegistry;

fn view(
    tree: &ConfigTree,
    registry: &ResourceRegistry,
    address: &Address,
    include_defaults: bool,
    only: Option<&str>,
) -> Result<ResourceView> {
    let definition = registry.resolve(address)?;
    let entry = tree
        .get(address)
        .ok_or_else(|| MgmtError::ResourceNotFound(address.clone()))?;
    if let Some(name) = only {
        definition.attributes.get(name)?;
    }

    let attributes = definition
        .attributes
        .list()
        .iter()
        .filter(|spec| only.map_or(true, |name| name == spec.name))
        .map(|spec| {
            let value = entry.model.get(spec.name).cloned().or_else(|| {
                if include_defaults {
                    spec.default.clone()
                } else {
                    None
                }
            });
            (spec.name, value)
        })
        .collect();

    Ok(ResourceView {
        address: address.clone(),
        kind: entry.kind,
        attributes,
        children: tree.children(address).map(|(a, _)| a.clone()).collect(),
    })
}

/// Read every attribute of one resource. The root address lists the
/// top-level resources instead.
pub fn resource(
    tree: &ConfigTree,
    registry: &ResourceRegistry,
    address: &Address,
    include_defaults: bool,
) -> Result<CmdResult> {
    if address.is_root() {
        let views = tree
            .children(address)
            .map(|(a, _)| view(tree, registry, a, include_defaults, None))
            .collect::<Result<Vec<_>>>()?;
        return Ok(CmdResult::default().with_resources(views));
    }
    Ok(CmdResult::default().with_resources(vec![view(
        tree,
        registry,
        address,
        include_defaults,
        None,
    )?]))
}

/// Read a single attribute. Values are reported as stored, so expressions
/// come back unresolved.
pub fn attribute(
    tree: &ConfigTree,
    registry: &ResourceRegistry,
    address: &Address,
    name: &str,
    include_defaults: bool,
) -> Result<CmdResult> {
    let view = view(tree, registry, address, include_defaults, Some(name))?;
    Ok(CmdResult::default().with_resources(vec![view]))
}
