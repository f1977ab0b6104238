//! Core data types: resource addresses, per-resource models, and the
//! configuration tree that holds them.

use crate::attributes::{
    is_expression, validate, AttributeKind, AttributeRegistry, AttributeSpec, ValidationError,
    Value,
};
use crate::error::{MgmtError, Result};
use crate::expression::ExpressionResolver;
use crate::lifecycle::ResourceState;
use crate::resources::ResourceKind;
use crate::services::ServiceHandle;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// One `key=value` step of an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathElement {
    pub key: String,
    pub value: String,
}

impl PathElement {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Location of a resource in the configuration tree, e.g.
/// `/subsystem=remoting/connector=default/security=sasl`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Vec<PathElement>);

impl Address {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse `key=value` elements separated by `/`. A leading `/` is optional
    /// and `/` alone is the root.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let mut elements = Vec::new();
        for part in trimmed.split('/') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| MgmtError::Api(format!("Invalid address '{}'", text)))?;
            if key.is_empty() || value.is_empty() || value.contains('=') {
                return Err(MgmtError::Api(format!("Invalid address '{}'", text)));
            }
            elements.push(PathElement::new(key, value));
        }
        Ok(Self(elements))
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    pub fn parent(&self) -> Option<Address> {
        if self.is_root() {
            None
        } else {
            Some(Address(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn append(&self, key: impl Into<String>, value: impl Into<String>) -> Address {
        let mut elements = self.0.clone();
        elements.push(PathElement::new(key, value));
        Address(elements)
    }

    /// Address of a sibling, sharing this address's parent.
    pub fn sibling(&self, key: &str, value: &str) -> Option<Address> {
        self.parent().map(|parent| parent.append(key, value))
    }

    /// This address and each of its ancestors, nearest first, root excluded.
    pub fn ancestry(&self) -> impl Iterator<Item = Address> + '_ {
        (1..=self.0.len()).rev().map(|n| Address(self.0[..n].to_vec()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for element in &self.0 {
            write!(f, "/{}", element)?;
        }
        Ok(())
    }
}

/// Validated attribute values of one resource instance.
///
/// Undefined attributes are absent. Every stored key belongs to the resource
/// type's attribute registry, and every stored value passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceModel {
    values: BTreeMap<String, Value>,
}

impl ResourceModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model for a new resource.
    ///
    /// Rejects unknown attributes and missing required ones; values are
    /// validated in declaration order.
    pub fn populate(
        attributes: &AttributeRegistry,
        values: BTreeMap<String, Value>,
        resolver: &dyn ExpressionResolver,
    ) -> Result<Self> {
        for spec in attributes.list() {
            if spec.is_required() && !values.contains_key(spec.name) {
                return Err(required(spec));
            }
        }
        let mut model = Self::new();
        model.apply(
            attributes,
            values.into_iter().map(|(k, v)| (k, Some(v))).collect(),
            resolver,
        )?;
        Ok(model)
    }

    /// Apply a batch of writes atomically; `None` undefines the attribute.
    ///
    /// Either every write is validated and applied, or the model is left
    /// untouched.
    pub fn apply(
        &mut self,
        attributes: &AttributeRegistry,
        mut writes: Vec<(String, Option<Value>)>,
        resolver: &dyn ExpressionResolver,
    ) -> Result<()> {
        for (name, _) in &writes {
            attributes.get(name)?;
        }
        writes.sort_by_key(|(name, _)| attributes.position(name));

        let mut staged = Vec::with_capacity(writes.len());
        for (name, value) in writes {
            let spec = attributes.get(&name)?;
            let accepted = match value {
                Some(value) => Some(check_write(spec, &value, resolver)?),
                None if spec.is_required() => return Err(required(spec)),
                None => None,
            };
            staged.push((name, accepted));
        }

        for (name, value) in staged {
            debug!(attribute = %name, value = ?value, "model write");
            match value {
                Some(value) => {
                    self.values.insert(name, value);
                }
                None => {
                    self.values.remove(&name);
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn required(spec: &AttributeSpec) -> MgmtError {
    ValidationError::new(spec.name, "undefined", "attribute is required").into()
}

/// Resolve-then-validate for a single write, returning the value to store.
///
/// Expressions are stored unresolved once their current resolution passes
/// validation. Plain strings that read as expressions are treated the same
/// way wherever expressions are allowed, matching how the document reloads them.
pub fn check_write(
    spec: &AttributeSpec,
    value: &Value,
    resolver: &dyn ExpressionResolver,
) -> Result<Value> {
    match value {
        Value::Expression(expr) => {
            if !spec.allow_expression || spec.kind == AttributeKind::StringList {
                return Err(
                    ValidationError::new(spec.name, expr.as_str(), "expressions are not allowed")
                        .into(),
                );
            }
            check_expression(spec, expr, resolver)
        }
        Value::String(text)
            if spec.allow_expression
                && spec.kind == AttributeKind::Scalar
                && is_expression(text) =>
        {
            check_expression(spec, text, resolver)
        }
        other => Ok(validate(spec, other)?),
    }
}

fn check_expression(
    spec: &AttributeSpec,
    expr: &str,
    resolver: &dyn ExpressionResolver,
) -> Result<Value> {
    let resolved = resolver.resolve(expr)?;
    validate(spec, &Value::String(resolved))?;
    Ok(Value::Expression(expr.to_string()))
}

/// Read an attribute the way runtime wiring sees it: defaults applied and
/// expressions resolved into validated, typed values.
pub fn resolve_attribute(
    spec: &AttributeSpec,
    model: &ResourceModel,
    resolver: &dyn ExpressionResolver,
) -> Result<Option<Value>> {
    let value = match model.get(spec.name).or(spec.default.as_ref()) {
        Some(value) => value,
        None => return Ok(None),
    };
    let resolved = match value {
        Value::Expression(expr) => validate(spec, &Value::String(resolver.resolve(expr)?))?,
        other => other.clone(),
    };
    Ok(Some(resolved))
}

/// A resource instance in the tree.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub kind: ResourceKind,
    pub state: ResourceState,
    pub model: ResourceModel,
    /// Services installed for this resource by its add step.
    pub services: Vec<ServiceHandle>,
}

impl ResourceEntry {
    pub fn new(kind: ResourceKind, state: ResourceState, model: ResourceModel) -> Self {
        Self {
            kind,
            state,
            model,
            services: Vec::new(),
        }
    }
}

/// Every resource model, keyed by address.
#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
    entries: BTreeMap<Address, ResourceEntry>,
    /// Services left running by admin-only removes, keyed by the address
    /// that installed them.
    orphans: BTreeMap<Address, Vec<ServiceHandle>>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Address) -> Option<&ResourceEntry> {
        self.entries.get(address)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut ResourceEntry> {
        self.entries.get_mut(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    pub fn insert(&mut self, address: Address, entry: ResourceEntry) -> Result<()> {
        if self.entries.contains_key(&address) {
            return Err(MgmtError::DuplicateResource(address));
        }
        self.entries.insert(address, entry);
        Ok(())
    }

    pub fn remove(&mut self, address: &Address) -> Option<ResourceEntry> {
        self.entries.remove(address)
    }

    /// Keep the handles of services that outlive their resource.
    pub fn orphan_services(&mut self, address: &Address, handles: Vec<ServiceHandle>) {
        if !handles.is_empty() {
            self.orphans
                .entry(address.clone())
                .or_default()
                .extend(handles);
        }
    }

    pub fn orphans(&self, address: &Address) -> &[ServiceHandle] {
        self.orphans.get(address).map_or(&[], Vec::as_slice)
    }

    pub fn take_orphans(&mut self, address: &Address) -> Vec<ServiceHandle> {
        self.orphans.remove(address).unwrap_or_default()
    }

    /// Direct children of an address, in address order.
    pub fn children<'a>(
        &'a self,
        address: &'a Address,
    ) -> impl Iterator<Item = (&'a Address, &'a ResourceEntry)> + 'a {
        self.entries
            .iter()
            .filter(move |(child, _)| child.parent().as_ref() == Some(address))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &ResourceEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read an attribute of a sibling resource, defaults applied and
    /// expressions resolved. `None` when the sibling does not exist.
    pub fn read_sibling_attribute(
        &self,
        attributes: &AttributeRegistry,
        address: &Address,
        sibling: &PathElement,
        name: &str,
        resolver: &dyn ExpressionResolver,
    ) -> Result<Option<Value>> {
        let sibling_address = match address.sibling(&sibling.key, &sibling.value) {
            Some(a) => a,
            None => return Ok(None),
        };
        match self.get(&sibling_address) {
            Some(entry) => resolve_attribute(attributes.get(name)?, &entry.model, resolver),
            None => Ok(None),
        }
    }
}
