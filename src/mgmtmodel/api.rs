//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single
//! entry point for management operations, whichever UI drives them.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Owns the session**: the loaded [`ConfigTree`], the document store, and
//!   the service target that runtime plans install into
//! - **Normalizes inputs**: parses address strings and raw `name=value`
//!   assignments into typed values using each attribute's shape
//! - **Dispatches** to the matching command function and returns its
//!   `Result<CmdResult>`
//!
//! It does no terminal I/O and holds no business rules; validation and
//! lifecycle logic live in the core modules.
//!
//! ## Generic Over Store and Service Target
//!
//! `ManagementApi<S: DocumentStore, T: ServiceTarget>`:
//! - Production: `ManagementApi<FileStore, ServiceRegistry>`
//! - Testing: `ManagementApi<InMemoryStore, _>` with any recording target
//!
//! The tree is loaded once, when the API is opened. Loading validates the
//! document but never installs services; only adds made through this API do.

use crate::attributes::Value;
use crate::commands;
use crate::error::{MgmtError, Result};
use crate::expression::PropertyResolver;
use crate::lifecycle::LifecycleContext;
use crate::model::{Address, ConfigTree};
use crate::resources::ResourceRegistry;
use crate::services::ServiceTarget;
use crate::store::DocumentStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use crate::commands::config::ConfigAction;
pub use crate::commands::{
    AttributeDescription, CmdMessage, CmdResult, MessageLevel, ResourceDescription, ResourceView,
};

/// Behaviour switches, usually taken from `config.json`.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub admin_only: bool,
    pub rollback_on_runtime_failure: bool,
    /// Directory holding `config.json`; required by [`ManagementApi::config`].
    pub config_dir: Option<PathBuf>,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            admin_only: false,
            rollback_on_runtime_failure: true,
            config_dir: None,
        }
    }
}

pub struct ManagementApi<S: DocumentStore, T: ServiceTarget> {
    store: S,
    services: T,
    registry: Arc<ResourceRegistry>,
    resolver: PropertyResolver,
    options: ApiOptions,
    tree: ConfigTree,
}

impl<S: DocumentStore, T: ServiceTarget> ManagementApi<S, T> {
    /// Load the stored document and open a session on it.
    pub fn open(
        store: S,
        services: T,
        registry: Arc<ResourceRegistry>,
        resolver: PropertyResolver,
        options: ApiOptions,
    ) -> Result<Self> {
        let tree = commands::helpers::load_tree(&store, &registry, &resolver)?;
        Ok(Self {
            store,
            services,
            registry,
            resolver,
            options,
            tree,
        })
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn services(&self) -> &T {
        &self.services
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add a resource from raw `name=value` assignments. List values are
    /// comma separated.
    pub fn add<I: AsRef<str>>(&mut self, address: &str, assignments: &[I]) -> Result<CmdResult> {
        let address = Address::parse(address)?;
        let values = self.parse_assignments(&address, assignments)?;
        self.add_values(&address, values)
    }

    /// Add a resource from typed values.
    pub fn add_values(
        &mut self,
        address: &Address,
        values: BTreeMap<String, Value>,
    ) -> Result<CmdResult> {
        let mut ctx = LifecycleContext {
            registry: &self.registry,
            resolver: &self.resolver,
            services: &mut self.services,
            admin_only: self.options.admin_only,
        };
        commands::add::run(
            &mut self.store,
            &mut self.tree,
            &mut ctx,
            address,
            values,
            self.options.rollback_on_runtime_failure,
        )
    }

    pub fn remove(&mut self, address: &str) -> Result<CmdResult> {
        let address = Address::parse(address)?;
        let mut ctx = LifecycleContext {
            registry: &self.registry,
            resolver: &self.resolver,
            services: &mut self.services,
            admin_only: self.options.admin_only,
        };
        commands::remove::run(&mut self.store, &mut self.tree, &mut ctx, &address)
    }

    /// Write one attribute from its raw command-line form.
    pub fn write(&mut self, address: &str, name: &str, raw: &str) -> Result<CmdResult> {
        let address = Address::parse(address)?;
        let value = self.registry.resolve(&address)?.attributes.get(name)?.parse_input(raw);
        self.write_values(&address, vec![(name.to_string(), Some(value))])
    }

    pub fn undefine(&mut self, address: &str, name: &str) -> Result<CmdResult> {
        let address = Address::parse(address)?;
        self.write_values(&address, vec![(name.to_string(), None)])
    }

    /// Apply a typed batch of writes; `None` undefines.
    pub fn write_values(
        &mut self,
        address: &Address,
        writes: Vec<(String, Option<Value>)>,
    ) -> Result<CmdResult> {
        let ctx = LifecycleContext {
            registry: &self.registry,
            resolver: &self.resolver,
            services: &mut self.services,
            admin_only: self.options.admin_only,
        };
        commands::write::run(&mut self.store, &mut self.tree, &ctx, address, writes)
    }

    pub fn read(&self, address: &str, include_defaults: bool) -> Result<CmdResult> {
        let address = Address::parse(address)?;
        commands::read::resource(&self.tree, &self.registry, &address, include_defaults)
    }

    pub fn read_attribute(
        &self,
        address: &str,
        name: &str,
        include_defaults: bool,
    ) -> Result<CmdResult> {
        let address = Address::parse(address)?;
        commands::read::attribute(&self.tree, &self.registry, &address, name, include_defaults)
    }

    pub fn describe(&self, address: &str) -> Result<CmdResult> {
        let address = Address::parse(address)?;
        commands::describe::run(&self.registry, &address)
    }

    pub fn export(&self, target: Option<&Path>) -> Result<CmdResult> {
        commands::export::run(&self.tree, &self.registry, target)
    }

    pub fn validate(&self, xml: &str) -> Result<CmdResult> {
        commands::validate::run(xml, &self.registry, &self.resolver)
    }

    pub fn config(&self, action: ConfigAction) -> Result<CmdResult> {
        let dir = self
            .options
            .config_dir
            .as_deref()
            .ok_or_else(|| MgmtError::Api("No config directory configured".to_string()))?;
        commands::config::run(dir, action)
    }

    fn parse_assignments<I: AsRef<str>>(
        &self,
        address: &Address,
        assignments: &[I],
    ) -> Result<BTreeMap<String, Value>> {
        let definition = self.registry.resolve(address)?;
        let mut values = BTreeMap::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (name, raw) = assignment.split_once('=').ok_or_else(|| {
                MgmtError::Api(format!("Expected name=value, got '{}'", assignment))
            })?;
            let spec = definition.attributes.get(name.trim())?;
            if values.insert(spec.name.to_string(), spec.parse_input(raw)).is_some() {
                return Err(MgmtError::Api(format!("'{}' given more than once", spec.name)));
            }
        }
        Ok(values)
    }
}
