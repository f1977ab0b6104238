use crate::commands::{CmdMessage, CmdResult};
use crate::error::{MgmtError, Result};
use crate::marshal::write_document;
use crate::model::ConfigTree;
use crate::resources::ResourceRegistry;
use std::fs;
use std::path::Path;

/// Render the current tree. With a target path the document is written
/// there; otherwise it is returned for printing.
pub fn run(tree: &ConfigTree, registry: &ResourceRegistry, target: Option<&Path>) -> Result<CmdResult> {
    let document = write_document(tree, registry)?;
    match target {
        Some(path) => {
            fs::write(path, &document).map_err(MgmtError::Io)?;
            let mut result = CmdResult::default();
            result.add_message(CmdMessage::success(format!(
                "Exported {} resources to {}",
                tree.len(),
                path.display()
            )));
            Ok(result)
        }
        None => Ok(CmdResult::default().with_document(document)),
    }
}
