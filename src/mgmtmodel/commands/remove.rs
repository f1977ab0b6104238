use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::lifecycle::{self, LifecycleContext};
use crate::model::{Address, ConfigTree};
use crate::store::DocumentStore;

use super::add::stale_warning;
use super::helpers::persist;

/// Remove one resource. The document is saved before any service is
/// touched, so a failed save leaves the session unchanged.
pub fn run<S: DocumentStore>(
    store: &mut S,
    tree: &mut ConfigTree,
    ctx: &mut LifecycleContext<'_>,
    address: &Address,
) -> Result<CmdResult> {
    lifecycle::check_remove(tree, address)?;
    let mut remaining = tree.clone();
    remaining.remove(address);
    persist(store, &remaining, ctx.registry)?;

    let outcome = lifecycle::remove(tree, ctx, address)?;
    let mut result = CmdResult::default();

    for handle in &outcome.uninstalled {
        result.add_message(CmdMessage::info(format!("Removed service {}", handle)));
    }
    for warning in &outcome.warnings {
        result.add_message(CmdMessage::warning(warning.clone()));
    }
    if outcome.reload_required {
        result.add_message(CmdMessage::warning(
            "Admin-only mode: services left running, reload required",
        ));
    }
    for dependent in &outcome.stale_dependents {
        result.add_message(stale_warning(dependent));
    }
    result.add_message(CmdMessage::success(format!("Removed {}", address)));
    Ok(result)
}
