use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::expression::ExpressionResolver;
use crate::marshal::read_document;
use crate::resources::ResourceRegistry;

/// Check a document without loading it into the current configuration.
pub fn run(
    xml: &str,
    registry: &ResourceRegistry,
    resolver: &dyn ExpressionResolver,
) -> Result<CmdResult> {
    let tree = read_document(xml, registry, resolver)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Document is valid ({} resources)",
        tree.len()
    )));
    Ok(result)
}
