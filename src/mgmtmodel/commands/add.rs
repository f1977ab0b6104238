use crate::attributes::Value;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{MgmtError, Result};
use crate::lifecycle::{self, LifecycleContext, RuntimeOutcome};
use crate::model::{Address, ConfigTree};
use crate::store::DocumentStore;
use std::collections::BTreeMap;
use tracing::warn;

use super::helpers::persist;

pub fn run<S: DocumentStore>(
    store: &mut S,
    tree: &mut ConfigTree,
    ctx: &mut LifecycleContext<'_>,
    address: &Address,
    values: BTreeMap<String, Value>,
    rollback_on_runtime_failure: bool,
) -> Result<CmdResult> {
    let outcome = lifecycle::add(tree, ctx, address, values)?;
    let mut result = CmdResult::default();

    for handle in &outcome.released {
        result.add_message(CmdMessage::info(format!("Removed orphaned service {}", handle)));
    }
    match &outcome.runtime {
        RuntimeOutcome::NotRequired => {}
        RuntimeOutcome::Skipped => result.add_message(CmdMessage::warning(
            "Admin-only mode: services not installed, reload required",
        )),
        RuntimeOutcome::Installed(handles) => {
            for handle in handles {
                result.add_message(CmdMessage::info(format!("Installed service {}", handle)));
            }
        }
        RuntimeOutcome::Failed(reason) if rollback_on_runtime_failure => {
            warn!(address = %address, "rolling back add");
            lifecycle::remove(tree, ctx, address)?;
            return Err(MgmtError::ServiceInstallation {
                address: address.clone(),
                reason: reason.clone(),
            });
        }
        RuntimeOutcome::Failed(reason) => result.add_message(CmdMessage::warning(format!(
            "Services for {} failed to install ({}); the resource was kept",
            address, reason
        ))),
    }

    if let Err(e) = persist(store, tree, ctx.registry) {
        warn!(address = %address, error = %e, "save failed, undoing add");
        lifecycle::remove(tree, ctx, address)?;
        return Err(e);
    }
    for dependent in &outcome.stale_dependents {
        result.add_message(stale_warning(dependent));
    }
    result.add_message(CmdMessage::success(format!("Added {}", address)));
    Ok(result)
}

pub(crate) fn stale_warning(dependent: &Address) -> CmdMessage {
    CmdMessage::warning(format!(
        "{} still runs with the previous configuration, reload required",
        dependent
    ))
}
