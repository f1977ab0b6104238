use crate::attributes::Value;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::lifecycle::{self, LifecycleContext};
use crate::model::{Address, ConfigTree};
use crate::store::DocumentStore;
use tracing::warn;

use super::helpers::persist;

/// Apply attribute writes to one resource. A `None` value undefines the
/// attribute. The batch is all-or-nothing.
pub fn run<S: DocumentStore>(
    store: &mut S,
    tree: &mut ConfigTree,
    ctx: &LifecycleContext<'_>,
    address: &Address,
    writes: Vec<(String, Option<Value>)>,
) -> Result<CmdResult> {
    let summary: Vec<String> = writes
        .iter()
        .map(|(name, value)| match value {
            Some(value) => format!("{}={}", name, value),
            None => format!("{} undefined", name),
        })
        .collect();

    let previous = tree.get(address).map(|entry| entry.model.clone());
    let outcome = lifecycle::write_attributes(tree, ctx, address, writes)?;
    if let Err(e) = persist(store, tree, ctx.registry) {
        warn!(address = %address, error = %e, "save failed, restoring previous values");
        if let (Some(entry), Some(model)) = (tree.get_mut(address), previous) {
            entry.model = model;
        }
        return Err(e);
    }

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Updated {}: {}",
        address,
        summary.join(", ")
    )));
    if outcome.reload_required {
        result.add_message(CmdMessage::warning(
            "Running services still use the previous values, reload required",
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::add;
    use crate::commands::helpers::fixtures::{CommandFixture, FailingStore};
    use crate::error::MgmtError;
    use crate::resources::{remoting, sasl};
    use std::collections::BTreeMap;

    fn setup(fx: &mut CommandFixture) -> Address {
        let (store, tree, mut ctx) = fx.parts();
        add::run(
            store,
            tree,
            &mut ctx,
            &Address::parse("/subsystem=remoting").unwrap(),
            BTreeMap::new(),
            true,
        )
        .unwrap();
        let connector = Address::parse("/subsystem=remoting/connector=default").unwrap();
        add::run(
            store,
            tree,
            &mut ctx,
            &connector,
            [(
                remoting::SOCKET_BINDING.to_string(),
                Value::String("remoting".into()),
            )]
            .into_iter()
            .collect(),
            true,
        )
        .unwrap();
        let security = connector.append("security", "sasl");
        add::run(store, tree, &mut ctx, &security, BTreeMap::new(), true).unwrap();
        security
    }

    #[test]
    fn write_saves_and_flags_reload() {
        let mut fx = CommandFixture::new();
        let security = setup(&mut fx);
        let (store, tree, ctx) = fx.parts();
        let result = run(
            store,
            tree,
            &ctx,
            &security,
            vec![(
                sasl::STRENGTH.into(),
                Some(Value::List(vec!["HIGH".into(), "low".into()])),
            )],
        )
        .unwrap();
        assert!(result
            .messages
            .iter()
            .any(|m| m.content.contains("reload required")));
        assert!(fx
            .store
            .document()
            .unwrap()
            .contains("<strength value=\"high low\"/>"));
    }

    #[test]
    fn undefine_removes_element() {
        let mut fx = CommandFixture::new();
        let security = setup(&mut fx);
        let (store, tree, ctx) = fx.parts();
        run(
            store,
            tree,
            &ctx,
            &security,
            vec![(sasl::REUSE_SESSION.into(), Some(Value::Bool(false)))],
        )
        .unwrap();
        assert!(store.document().unwrap().contains("<reuse-session value=\"false\"/>"));

        run(store, tree, &ctx, &security, vec![(sasl::REUSE_SESSION.into(), None)]).unwrap();
        assert!(!fx.store.document().unwrap().contains("reuse-session"));
    }

    #[test]
    fn failed_batch_changes_nothing() {
        let mut fx = CommandFixture::new();
        let security = setup(&mut fx);
        let saves = fx.store.saves();
        let (store, tree, ctx) = fx.parts();
        let err = run(
            store,
            tree,
            &ctx,
            &security,
            vec![
                (sasl::SERVER_AUTH.into(), Some(Value::Bool(true))),
                (sasl::QOP.into(), Some(Value::List(vec!["auth conf".into()]))),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, MgmtError::Validation(_)));
        assert_eq!(fx.store.saves(), saves);
        assert!(!fx.tree.get(&security).unwrap().model.is_defined(sasl::SERVER_AUTH));
    }

    #[test]
    fn failed_save_restores_previous_values() {
        let mut fx = CommandFixture::new();
        let security = setup(&mut fx);
        let before = fx.tree.get(&security).unwrap().model.clone();
        let mut store = FailingStore::default();
        let (_, tree, ctx) = fx.parts();
        let err = run(
            &mut store,
            tree,
            &ctx,
            &security,
            vec![(sasl::SERVER_AUTH.into(), Some(Value::Bool(true)))],
        )
        .unwrap_err();
        assert!(matches!(err, MgmtError::Io(_)));
        assert_eq!(fx.tree.get(&security).unwrap().model, before);
    }
}
