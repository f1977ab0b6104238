//! # Resource Lifecycle
//!
//! Add, remove and attribute writes against a [`ConfigTree`].
//!
//! ```text
//! Absent ──add──▶ Adding ──▶ Present ──remove──▶ Removing ──▶ Absent
//! ```
//!
//! An add runs in two stages. The model stage validates every value and puts
//! the new entry into the tree; nothing is stored if any value is rejected.
//! The runtime stage, for kinds that declare a runtime plan and only when the
//! context is not admin-only, builds the service requests from the stored
//! model and installs them through the [`ServiceTarget`].
//!
//! A runtime failure does not undo the model stage. Services installed before
//! the failure are uninstalled again and the outcome reports the failure;
//! whether the new resource is kept is the caller's decision.
//!
//! An admin-only remove leaves the resource's services running. Their handles
//! stay on the tree as orphans until a later non-admin add or remove at the
//! same address uninstalls them.
//!
//! Some runtime plans read sibling resources (the JMX connector reads the
//! exposed model domains). Adding, removing or writing such a sibling while
//! the reader's services run reports the reader as stale.

use crate::attributes::Value;
use crate::error::{MgmtError, Result};
use crate::expression::ExpressionResolver;
use crate::model::{Address, ConfigTree, ResourceEntry, ResourceModel};
use crate::resources::{ResourceKind, ResourceRegistry, RuntimeContext};
use crate::services::{ServiceHandle, ServiceRequest, ServiceTarget};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Absent,
    Adding,
    Present,
    Removing,
}

impl ResourceState {
    pub fn can_transition_to(self, next: ResourceState) -> bool {
        use ResourceState::*;
        matches!(
            (self, next),
            (Absent, Adding) | (Adding, Present) | (Present, Removing) | (Removing, Absent)
        )
    }
}

fn transition(address: &Address, entry: &mut ResourceEntry, to: ResourceState) -> Result<()> {
    if !entry.state.can_transition_to(to) {
        return Err(MgmtError::IllegalTransition {
            address: address.clone(),
            from: entry.state,
            to,
        });
    }
    debug!(address = %address, from = ?entry.state, to = ?to, "lifecycle transition");
    entry.state = to;
    Ok(())
}

/// Collaborators shared by every lifecycle step.
pub struct LifecycleContext<'a> {
    pub registry: &'a ResourceRegistry,
    pub resolver: &'a dyn ExpressionResolver,
    pub services: &'a mut dyn ServiceTarget,
    /// Apply model changes only; never touch runtime services.
    pub admin_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeOutcome {
    /// The kind has no runtime plan.
    NotRequired,
    /// Admin-only context; the plan was not run.
    Skipped,
    Installed(Vec<ServiceHandle>),
    /// The plan or an install failed. Nothing stays installed.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct AddOutcome {
    pub address: Address,
    pub kind: ResourceKind,
    pub runtime: RuntimeOutcome,
    /// Orphans of an earlier admin-only remove, uninstalled before the
    /// runtime stage.
    pub released: Vec<ServiceHandle>,
    /// Running siblings whose services were built without this resource.
    pub stale_dependents: Vec<Address>,
}

impl AddOutcome {
    /// The failure as an error, if the runtime stage failed.
    pub fn runtime_error(&self) -> Option<MgmtError> {
        match &self.runtime {
            RuntimeOutcome::Failed(reason) => Some(MgmtError::ServiceInstallation {
                address: self.address.clone(),
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RemoveOutcome {
    pub uninstalled: Vec<ServiceHandle>,
    /// Uninstall failures; the resource is removed regardless.
    pub warnings: Vec<String>,
    /// Services were left running because the context is admin-only.
    pub reload_required: bool,
    /// Running siblings whose services were built from the removed resource.
    pub stale_dependents: Vec<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Running services were built from the previous values.
    pub reload_required: bool,
}

pub fn add(
    tree: &mut ConfigTree,
    ctx: &mut LifecycleContext<'_>,
    address: &Address,
    values: BTreeMap<String, Value>,
) -> Result<AddOutcome> {
    let registry = ctx.registry;
    let definition = registry.resolve(address)?;
    if tree.contains(address) {
        return Err(MgmtError::DuplicateResource(address.clone()));
    }
    if let Some(parent) = address.parent().filter(|p| !p.is_root()) {
        match tree.get(&parent) {
            Some(entry) if entry.state == ResourceState::Present => {}
            _ => return Err(MgmtError::MissingParent(address.clone())),
        }
    }

    let model = ResourceModel::populate(&definition.attributes, values, ctx.resolver)?;
    let mut entry = ResourceEntry::new(definition.kind, ResourceState::Absent, model);
    transition(address, &mut entry, ResourceState::Adding)?;
    tree.insert(address.clone(), entry)?;

    let released = if definition.requires_runtime() && !ctx.admin_only {
        release_orphans(tree, ctx.services, address, &mut Vec::new())
    } else {
        Vec::new()
    };

    let runtime = match definition.runtime {
        None => RuntimeOutcome::NotRequired,
        Some(_) if ctx.admin_only => {
            debug!(address = %address, "admin-only, runtime stage skipped");
            RuntimeOutcome::Skipped
        }
        Some(plan) => {
            let requests = {
                let runtime_ctx = RuntimeContext {
                    tree: &*tree,
                    registry,
                    resolver: ctx.resolver,
                };
                let model = tree
                    .get(address)
                    .map(|e| &e.model)
                    .ok_or_else(|| MgmtError::ResourceNotFound(address.clone()))?;
                plan(&runtime_ctx, address, model)
            };
            match requests {
                Ok(requests) => install_all(ctx.services, address, requests),
                Err(e) => RuntimeOutcome::Failed(e.to_string()),
            }
        }
    };

    let entry = tree
        .get_mut(address)
        .ok_or_else(|| MgmtError::ResourceNotFound(address.clone()))?;
    if let RuntimeOutcome::Installed(handles) = &runtime {
        entry.services = handles.clone();
    }
    transition(address, entry, ResourceState::Present)?;

    if let RuntimeOutcome::Failed(reason) = &runtime {
        warn!(address = %address, reason = %reason, "runtime stage failed");
    }
    Ok(AddOutcome {
        address: address.clone(),
        kind: definition.kind,
        runtime,
        released,
        stale_dependents: running_dependents(tree, registry, address, definition.kind),
    })
}

/// Uninstall the orphans recorded at `address`. Failures are logged and
/// pushed onto `warnings`; the handle is dropped either way.
fn release_orphans(
    tree: &mut ConfigTree,
    services: &mut dyn ServiceTarget,
    address: &Address,
    warnings: &mut Vec<String>,
) -> Vec<ServiceHandle> {
    let mut released = Vec::new();
    for handle in tree.take_orphans(address) {
        match services.uninstall(&handle) {
            Ok(()) => {
                debug!(address = %address, service = %handle, "orphan released");
                released.push(handle);
            }
            Err(e) => {
                warn!(address = %address, service = %handle, error = %e, "orphan uninstall failed");
                warnings.push(e.to_string());
            }
        }
    }
    released
}

/// Siblings of `address` with installed services whose runtime plan reads
/// resources of `kind`.
fn running_dependents(
    tree: &ConfigTree,
    registry: &ResourceRegistry,
    address: &Address,
    kind: ResourceKind,
) -> Vec<Address> {
    let parent = match address.parent() {
        Some(parent) => parent,
        None => return Vec::new(),
    };
    tree.children(&parent)
        .filter(|(sibling, entry)| {
            *sibling != address
                && !entry.services.is_empty()
                && registry
                    .definition(entry.kind)
                    .map(|d| d.reads_siblings.contains(&kind))
                    .unwrap_or(false)
        })
        .map(|(sibling, _)| sibling.clone())
        .collect()
}

fn install_all(
    services: &mut dyn ServiceTarget,
    address: &Address,
    requests: Vec<ServiceRequest>,
) -> RuntimeOutcome {
    let mut installed = Vec::with_capacity(requests.len());
    for request in requests {
        match services.install(request) {
            Ok(handle) => installed.push(handle),
            Err(e) => {
                for handle in installed.iter().rev() {
                    if let Err(undo) = services.uninstall(handle) {
                        warn!(address = %address, service = %handle, error = %undo, "undo failed");
                    }
                }
                return RuntimeOutcome::Failed(e.to_string());
            }
        }
    }
    RuntimeOutcome::Installed(installed)
}

/// Check that `address` exists and has no children, without changing anything.
pub fn check_remove(tree: &ConfigTree, address: &Address) -> Result<()> {
    if !tree.contains(address) {
        return Err(MgmtError::ResourceNotFound(address.clone()));
    }
    if tree.children(address).next().is_some() {
        return Err(MgmtError::HasChildren(address.clone()));
    }
    Ok(())
}

pub fn remove(
    tree: &mut ConfigTree,
    ctx: &mut LifecycleContext<'_>,
    address: &Address,
) -> Result<RemoveOutcome> {
    check_remove(tree, address)?;
    let entry = tree
        .get_mut(address)
        .ok_or_else(|| MgmtError::ResourceNotFound(address.clone()))?;
    transition(address, entry, ResourceState::Removing)?;
    let kind = entry.kind;
    let handles = std::mem::take(&mut entry.services);

    let mut outcome = RemoveOutcome {
        stale_dependents: running_dependents(tree, ctx.registry, address, kind),
        ..RemoveOutcome::default()
    };
    if ctx.admin_only {
        outcome.reload_required = !handles.is_empty();
        tree.orphan_services(address, handles);
    } else {
        for handle in handles.into_iter().rev() {
            match ctx.services.uninstall(&handle) {
                Ok(()) => outcome.uninstalled.push(handle),
                Err(e) => {
                    warn!(address = %address, service = %handle, error = %e, "uninstall failed");
                    outcome.warnings.push(e.to_string());
                }
            }
        }
        let released = release_orphans(tree, ctx.services, address, &mut outcome.warnings);
        outcome.uninstalled.extend(released);
    }

    if let Some(mut entry) = tree.remove(address) {
        transition(address, &mut entry, ResourceState::Absent)?;
    }
    Ok(outcome)
}

/// Apply a batch of writes to an existing resource; `None` undefines.
pub fn write_attributes(
    tree: &mut ConfigTree,
    ctx: &LifecycleContext<'_>,
    address: &Address,
    writes: Vec<(String, Option<Value>)>,
) -> Result<WriteOutcome> {
    let definition = ctx.registry.resolve(address)?;
    let entry = tree
        .get_mut(address)
        .ok_or_else(|| MgmtError::ResourceNotFound(address.clone()))?;
    entry
        .model
        .apply(&definition.attributes, writes, ctx.resolver)?;

    let under_runtime = !ctx.admin_only
        && address.ancestry().any(|a| {
            ctx.registry
                .resolve(&a)
                .map(|d| d.requires_runtime())
                .unwrap_or(false)
        });
    let reload_required = under_runtime
        || !running_dependents(tree, ctx.registry, address, definition.kind).is_empty();
    Ok(WriteOutcome { reload_required })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::PropertyResolver;
    use crate::resources::{jmx, remoting, sasl};
    use crate::services::{ServiceConfig, ServiceError, ServiceRegistry};

    /// Records every install and can be told to fail one service name.
    #[derive(Default)]
    struct RecordingTarget {
        inner: ServiceRegistry,
        installs: Vec<ServiceRequest>,
        fail: Option<String>,
    }

    impl ServiceTarget for RecordingTarget {
        fn install(&mut self, request: ServiceRequest) -> std::result::Result<ServiceHandle, ServiceError> {
            self.installs.push(request.clone());
            if self.fail.as_deref() == Some(request.name.as_str()) {
                return Err(ServiceError::Failed {
                    name: request.name,
                    reason: "port in use".into(),
                });
            }
            self.inner.install(request)
        }

        fn uninstall(&mut self, handle: &ServiceHandle) -> std::result::Result<(), ServiceError> {
            self.inner.uninstall(handle)
        }
    }

    fn addr(text: &str) -> Address {
        Address::parse(text).unwrap()
    }

    fn values(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    struct Fixture {
        registry: ResourceRegistry,
        resolver: PropertyResolver,
        target: RecordingTarget,
        tree: ConfigTree,
        admin_only: bool,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: ResourceRegistry::standard().unwrap(),
                resolver: PropertyResolver::default(),
                target: RecordingTarget::default(),
                tree: ConfigTree::new(),
                admin_only: false,
            }
        }

        fn add(&mut self, address: &str, pairs: &[(&str, Value)]) -> Result<AddOutcome> {
            let mut ctx = LifecycleContext {
                registry: &self.registry,
                resolver: &self.resolver,
                services: &mut self.target,
                admin_only: self.admin_only,
            };
            add(&mut self.tree, &mut ctx, &addr(address), values(pairs))
        }

        fn remove(&mut self, address: &str) -> Result<RemoveOutcome> {
            let mut ctx = LifecycleContext {
                registry: &self.registry,
                resolver: &self.resolver,
                services: &mut self.target,
                admin_only: self.admin_only,
            };
            remove(&mut self.tree, &mut ctx, &addr(address))
        }

        fn write(&mut self, address: &str, name: &str, value: Option<Value>) -> Result<WriteOutcome> {
            let ctx = LifecycleContext {
                registry: &self.registry,
                resolver: &self.resolver,
                services: &mut self.target,
                admin_only: self.admin_only,
            };
            write_attributes(
                &mut self.tree,
                &ctx,
                &addr(address),
                vec![(name.to_string(), value)],
            )
        }

        fn with_connector(mut self) -> Self {
            self.add("/subsystem=remoting", &[]).unwrap();
            self.add(
                "/subsystem=remoting/connector=default",
                &[(remoting::SOCKET_BINDING, Value::String("remoting".into()))],
            )
            .unwrap();
            self
        }
    }

    #[test]
    fn legal_transitions() {
        use ResourceState::*;
        assert!(Absent.can_transition_to(Adding));
        assert!(Adding.can_transition_to(Present));
        assert!(Present.can_transition_to(Removing));
        assert!(Removing.can_transition_to(Absent));
        assert!(!Absent.can_transition_to(Present));
        assert!(!Present.can_transition_to(Adding));
        assert!(!Removing.can_transition_to(Present));
    }

    #[test]
    fn add_without_runtime_installs_nothing() {
        let mut fx = Fixture::new().with_connector();
        let outcome = fx
            .add(
                "/subsystem=remoting/connector=default/security=sasl",
                &[(sasl::QOP, Value::List(vec!["auth".into()]))],
            )
            .unwrap();
        assert_eq!(outcome.runtime, RuntimeOutcome::NotRequired);
        assert_eq!(fx.target.installs.len(), 1);
        let entry = fx
            .tree
            .get(&addr("/subsystem=remoting/connector=default/security=sasl"))
            .unwrap();
        assert_eq!(entry.state, ResourceState::Present);
    }

    #[test]
    fn connector_add_installs_and_records_service() {
        let fx = Fixture::new().with_connector();
        assert!(fx.target.inner.is_installed("remoting-connector.default"));
        let entry = fx
            .tree
            .get(&addr("/subsystem=remoting/connector=default"))
            .unwrap();
        assert_eq!(entry.services.len(), 1);
        assert_eq!(entry.services[0].name, "remoting-connector.default");
    }

    #[test]
    fn jmx_connector_install_hook_runs_once_with_resolved_values() {
        let mut fx = Fixture::new();
        fx.resolver = PropertyResolver::default().with_property("endpoint", "FALSE");
        fx.add("/subsystem=jmx", &[]).unwrap();
        fx.add("/subsystem=jmx/expose-model=resolved", &[]).unwrap();
        fx.add(
            "/subsystem=jmx/remoting-connector=jmx",
            &[(
                jmx::USE_MANAGEMENT_ENDPOINT,
                Value::Expression("${endpoint}".into()),
            )],
        )
        .unwrap();

        assert_eq!(
            fx.target.installs,
            vec![ServiceRequest::new(
                jmx::JMX_CONNECTOR_SERVICE,
                ServiceConfig::JmxRemotingConnector {
                    use_management_endpoint: false,
                    resolved_domain: Some("jboss.as".into()),
                    expression_domain: None,
                }
            )]
        );
    }

    #[test]
    fn rejected_values_leave_tree_untouched() {
        let mut fx = Fixture::new().with_connector();
        let err = fx
            .add(
                "/subsystem=remoting/connector=default/security=sasl",
                &[(sasl::QOP, Value::List(vec!["AUTH".into()]))],
            )
            .unwrap_err();
        assert!(matches!(err, MgmtError::Validation(_)));
        assert!(!fx
            .tree
            .contains(&addr("/subsystem=remoting/connector=default/security=sasl")));
    }

    #[test]
    fn add_requires_parent_and_unique_address() {
        let mut fx = Fixture::new();
        assert!(matches!(
            fx.add(
                "/subsystem=remoting/connector=x",
                &[(remoting::SOCKET_BINDING, Value::String("r".into()))]
            ),
            Err(MgmtError::MissingParent(_))
        ));
        fx.add("/subsystem=simple", &[]).unwrap();
        assert!(matches!(
            fx.add("/subsystem=simple", &[]),
            Err(MgmtError::DuplicateResource(_))
        ));
        assert!(matches!(
            fx.add("/subsystem=nope", &[]),
            Err(MgmtError::UnknownAddress(_))
        ));
    }

    #[test]
    fn install_failure_keeps_model_without_services() {
        let mut fx = Fixture::new();
        fx.target.fail = Some("simple".into());
        let outcome = fx.add("/subsystem=simple", &[]).unwrap();
        assert!(matches!(outcome.runtime, RuntimeOutcome::Failed(_)));
        assert!(matches!(
            outcome.runtime_error(),
            Some(MgmtError::ServiceInstallation { .. })
        ));
        assert!(fx.target.inner.is_empty());
        let entry = fx.tree.get(&addr("/subsystem=simple")).unwrap();
        assert!(entry.services.is_empty());

        // removing after a failed add has nothing to uninstall
        let removed = fx.remove("/subsystem=simple").unwrap();
        assert!(removed.uninstalled.is_empty());
        assert!(fx.tree.is_empty());
    }

    #[test]
    fn admin_only_skips_runtime() {
        let mut fx = Fixture::new();
        fx.admin_only = true;
        let outcome = fx.add("/subsystem=simple", &[]).unwrap();
        assert_eq!(outcome.runtime, RuntimeOutcome::Skipped);
        assert!(fx.target.installs.is_empty());
    }

    #[test]
    fn remove_uninstalls_recorded_services() {
        let mut fx = Fixture::new();
        fx.add("/subsystem=simple", &[]).unwrap();
        let outcome = fx.remove("/subsystem=simple").unwrap();
        assert_eq!(outcome.uninstalled.len(), 1);
        assert!(fx.target.inner.is_empty());
        assert!(matches!(
            fx.remove("/subsystem=simple"),
            Err(MgmtError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn remove_refuses_resources_with_children() {
        let mut fx = Fixture::new().with_connector();
        assert!(matches!(
            fx.remove("/subsystem=remoting"),
            Err(MgmtError::HasChildren(_))
        ));
        fx.remove("/subsystem=remoting/connector=default").unwrap();
        fx.remove("/subsystem=remoting").unwrap();
        assert!(fx.tree.is_empty());
    }

    #[test]
    fn writes_under_runtime_resources_require_reload() {
        let mut fx = Fixture::new().with_connector();
        fx.add("/subsystem=remoting/connector=default/security=sasl", &[])
            .unwrap();
        let outcome = fx
            .write(
                "/subsystem=remoting/connector=default/security=sasl",
                sasl::SERVER_AUTH,
                Some(Value::Bool(true)),
            )
            .unwrap();
        assert!(outcome.reload_required);

        fx.add("/subsystem=jmx", &[]).unwrap();
        fx.add("/subsystem=jmx/expose-model=resolved", &[]).unwrap();
        let outcome = fx
            .write(
                "/subsystem=jmx/expose-model=resolved",
                jmx::DOMAIN_NAME,
                Some(Value::String("custom".into())),
            )
            .unwrap();
        assert!(!outcome.reload_required);
    }

    #[test]
    fn running_jmx_connector_goes_stale_when_exposed_models_change() {
        let mut fx = Fixture::new();
        fx.add("/subsystem=jmx", &[]).unwrap();
        fx.add("/subsystem=jmx/expose-model=resolved", &[]).unwrap();
        let connector = fx.add("/subsystem=jmx/remoting-connector=jmx", &[]).unwrap();
        assert!(connector.stale_dependents.is_empty());

        let outcome = fx
            .write(
                "/subsystem=jmx/expose-model=resolved",
                jmx::DOMAIN_NAME,
                Some(Value::String("changed".into())),
            )
            .unwrap();
        assert!(outcome.reload_required);

        let added = fx.add("/subsystem=jmx/expose-model=expression", &[]).unwrap();
        assert_eq!(
            added.stale_dependents,
            vec![addr("/subsystem=jmx/remoting-connector=jmx")]
        );
        let removed = fx.remove("/subsystem=jmx/expose-model=resolved").unwrap();
        assert_eq!(
            removed.stale_dependents,
            vec![addr("/subsystem=jmx/remoting-connector=jmx")]
        );

        // Without installed services there is nothing to go stale
        fx.remove("/subsystem=jmx/remoting-connector=jmx").unwrap();
        let outcome = fx
            .write(
                "/subsystem=jmx/expose-model=expression",
                jmx::DOMAIN_NAME,
                Some(Value::String("other".into())),
            )
            .unwrap();
        assert!(!outcome.reload_required);
    }

    #[test]
    fn admin_only_remove_keeps_orphans_for_the_next_add() {
        let mut fx = Fixture::new();
        fx.add("/subsystem=simple", &[]).unwrap();

        fx.admin_only = true;
        let removed = fx.remove("/subsystem=simple").unwrap();
        assert!(removed.reload_required);
        assert!(fx.target.inner.is_installed("simple"));
        assert_eq!(fx.tree.orphans(&addr("/subsystem=simple")).len(), 1);

        fx.admin_only = false;
        let added = fx.add("/subsystem=simple", &[]).unwrap();
        assert_eq!(added.released.len(), 1);
        assert!(matches!(added.runtime, RuntimeOutcome::Installed(_)));
        assert_eq!(fx.target.inner.names().collect::<Vec<_>>(), vec!["simple"]);
        assert!(fx.tree.orphans(&addr("/subsystem=simple")).is_empty());
    }

    #[test]
    fn remove_also_uninstalls_orphans() {
        let mut fx = Fixture::new();
        fx.add("/subsystem=simple", &[]).unwrap();
        fx.admin_only = true;
        fx.remove("/subsystem=simple").unwrap();
        fx.add("/subsystem=simple", &[]).unwrap();

        fx.admin_only = false;
        let removed = fx.remove("/subsystem=simple").unwrap();
        assert_eq!(removed.uninstalled.len(), 1);
        assert!(fx.target.inner.is_empty());
    }

    #[test]
    fn rejected_write_keeps_previous_value() {
        let mut fx = Fixture::new().with_connector();
        let address = "/subsystem=remoting/connector=default";
        assert!(fx
            .write(address, remoting::SOCKET_BINDING, Some(Value::String(String::new())))
            .is_err());
        assert!(fx.write(address, remoting::SOCKET_BINDING, None).is_err());
        let entry = fx.tree.get(&addr(address)).unwrap();
        assert_eq!(
            entry.model.get(remoting::SOCKET_BINDING),
            Some(&Value::String("remoting".into()))
        );
    }
}
