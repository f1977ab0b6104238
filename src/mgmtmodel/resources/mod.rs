//! # Resource Definitions
//!
//! A resource definition ties together everything the management layer needs
//! to know about one kind of configuration node:
//!
//! - where it lives (`path`, under which `parent` kind)
//! - how it is named in the XML document (`element`)
//! - which attributes it declares
//! - whether adding it installs runtime services, and how (`runtime`)
//!
//! Definitions are plain data. Dispatch happens through [`ResourceRegistry`],
//! a lookup table keyed by [`ResourceKind`], built once at startup and shared
//! read-only afterwards.
//!
//! ## Built-in Kinds
//!
//! ```text
//! subsystem=remoting                    RemotingSubsystem
//! └── connector=*                       Connector            (runtime)
//!     └── security=sasl                 Sasl
//! subsystem=jmx                         JmxSubsystem
//! ├── expose-model=resolved             ExposeResolvedModel
//! ├── expose-model=expression           ExposeExpressionModel
//! └── remoting-connector=jmx            JmxRemotingConnector (runtime)
//! subsystem=simple                      SimpleSubsystem      (runtime)
//! ```

use crate::attributes::{AttributeRegistry, Value};
use crate::error::{MgmtError, Result};
use crate::expression::ExpressionResolver;
use crate::model::{resolve_attribute, Address, ConfigTree, PathElement, ResourceModel};
use crate::services::ServiceRequest;
use std::fmt;

pub mod jmx;
pub mod remoting;
pub mod sasl;
pub mod simple;

/// Every kind of resource the registry knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    RemotingSubsystem,
    Connector,
    Sasl,
    JmxSubsystem,
    ExposeResolvedModel,
    ExposeExpressionModel,
    JmxRemotingConnector,
    SimpleSubsystem,
}

/// The path element a definition accepts: a fixed `key=value`, or any value
/// under `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathPattern {
    pub key: &'static str,
    pub value: Option<&'static str>,
}

impl PathPattern {
    pub const fn fixed(key: &'static str, value: &'static str) -> Self {
        Self {
            key,
            value: Some(value),
        }
    }

    pub const fn wildcard(key: &'static str) -> Self {
        Self { key, value: None }
    }

    pub fn matches(&self, element: &PathElement) -> bool {
        self.key == element.key && self.value.map_or(true, |v| v == element.value)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value.unwrap_or("*"))
    }
}

/// Read-only view handed to runtime plans.
pub struct RuntimeContext<'a> {
    pub tree: &'a ConfigTree,
    pub registry: &'a ResourceRegistry,
    pub resolver: &'a dyn ExpressionResolver,
}

impl RuntimeContext<'_> {
    /// Resolve one of `kind`'s attributes from `model`, defaults applied.
    pub fn resolve(
        &self,
        kind: ResourceKind,
        model: &ResourceModel,
        name: &str,
    ) -> Result<Option<Value>> {
        let spec = self.registry.definition(kind)?.attributes.get(name)?;
        resolve_attribute(spec, model, self.resolver)
    }

    /// Resolve an attribute of the fixed-path sibling of kind `sibling`.
    /// `None` when that sibling has not been added.
    pub fn read_sibling_attribute(
        &self,
        address: &Address,
        sibling: ResourceKind,
        name: &str,
    ) -> Result<Option<Value>> {
        let definition = self.registry.definition(sibling)?;
        let value = definition.path.value.ok_or_else(|| {
            MgmtError::Api(format!(
                "{:?} has no fixed path and cannot be read as a sibling",
                sibling
            ))
        })?;
        self.tree.read_sibling_attribute(
            &definition.attributes,
            address,
            &PathElement::new(definition.path.key, value),
            name,
            self.resolver,
        )
    }
}

/// Builds the services a newly added resource needs, from its validated model.
pub type RuntimePlan =
    fn(&RuntimeContext<'_>, &Address, &ResourceModel) -> Result<Vec<ServiceRequest>>;

/// Everything the management layer knows about one resource kind.
#[derive(Clone)]
pub struct ResourceDefinition {
    pub kind: ResourceKind,

    /// `None` for top-level resources.
    pub parent: Option<ResourceKind>,

    pub path: PathPattern,

    /// XML element name. A `name` attribute is added whenever the path value
    /// differs from it.
    pub element: &'static str,

    pub attributes: AttributeRegistry,

    /// Present when adding this kind installs runtime services.
    pub runtime: Option<RuntimePlan>,

    /// Sibling kinds the runtime plan reads. Changing one of them leaves
    /// installed services stale.
    pub reads_siblings: &'static [ResourceKind],

    pub description: &'static str,
}

impl ResourceDefinition {
    pub fn new(
        kind: ResourceKind,
        path: PathPattern,
        element: &'static str,
        attributes: AttributeRegistry,
    ) -> Self {
        Self {
            kind,
            parent: None,
            path,
            element,
            attributes,
            runtime: None,
            reads_siblings: &[],
            description: "",
        }
    }

    pub fn child_of(mut self, parent: ResourceKind) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn runtime(mut self, plan: RuntimePlan) -> Self {
        self.runtime = Some(plan);
        self
    }

    pub fn reads_siblings(mut self, kinds: &'static [ResourceKind]) -> Self {
        self.reads_siblings = kinds;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Whether adding this kind has runtime side effects. Static per kind.
    pub fn requires_runtime(&self) -> bool {
        self.runtime.is_some()
    }
}

impl fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("path", &self.path)
            .field("element", &self.element)
            .field("attributes", &self.attributes)
            .field("runtime", &self.runtime.is_some())
            .field("reads_siblings", &self.reads_siblings)
            .finish()
    }
}

/// Lookup table of resource definitions, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    definitions: Vec<ResourceDefinition>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in resource kind.
    pub fn standard() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(remoting::subsystem())?;
        registry.register(remoting::connector()?)?;
        registry.register(sasl::definition()?)?;
        registry.register(jmx::subsystem())?;
        registry.register(jmx::expose_resolved_model()?)?;
        registry.register(jmx::expose_expression_model()?)?;
        registry.register(jmx::remoting_connector()?)?;
        registry.register(simple::subsystem())?;
        Ok(registry)
    }

    /// Register a definition. Its parent kind must already be registered.
    pub fn register(&mut self, definition: ResourceDefinition) -> Result<()> {
        if self.definitions.iter().any(|d| d.kind == definition.kind) {
            return Err(MgmtError::DuplicateDefinition(definition.kind));
        }
        if let Some(parent) = definition.parent {
            self.definition(parent)?;
        }
        self.definitions.push(definition);
        Ok(())
    }

    pub fn definition(&self, kind: ResourceKind) -> Result<&ResourceDefinition> {
        self.definitions
            .iter()
            .find(|d| d.kind == kind)
            .ok_or(MgmtError::UnregisteredKind(kind))
    }

    /// Definitions whose parent is `parent`, in registration order.
    pub fn children_of(
        &self,
        parent: Option<ResourceKind>,
    ) -> impl Iterator<Item = &ResourceDefinition> {
        self.definitions.iter().filter(move |d| d.parent == parent)
    }

    /// Find the definition for an address by walking it from the top.
    pub fn resolve(&self, address: &Address) -> Result<&ResourceDefinition> {
        let mut parent = None;
        let mut found = None;
        for element in address.elements() {
            let definition = self
                .children_of(parent)
                .find(|d| d.path.matches(element))
                .ok_or_else(|| MgmtError::UnknownAddress(address.clone()))?;
            parent = Some(definition.kind);
            found = Some(definition);
        }
        found.ok_or_else(|| MgmtError::UnknownAddress(address.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.definitions.iter()
    }
}
