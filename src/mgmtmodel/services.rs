//! # Runtime Services
//!
//! Adding some resources has a runtime side effect: a service is installed
//! from the resource's validated configuration. The container that actually
//! runs services lives outside this crate; it is reached through the
//! [`ServiceTarget`] trait.
//!
//! [`ServiceRegistry`] is the bundled target. It records what is installed,
//! refuses duplicate service names, and logs every change. The CLI uses it
//! directly; tests use it to assert exactly which services an add produced.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Resolved configuration handed to an installed service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceConfig {
    /// Remoting connector listening on a socket binding.
    RemotingConnector {
        connector: String,
        socket_binding: String,
        authentication_provider: Option<String>,
    },

    /// JMX access over remoting.
    JmxRemotingConnector {
        use_management_endpoint: bool,
        resolved_domain: Option<String>,
        expression_domain: Option<String>,
    },

    Simple,
}

/// A service to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    pub name: String,
    pub config: ServiceConfig,
}

impl ServiceRequest {
    pub fn new(name: impl Into<String>, config: ServiceConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// Handle to an installed service, kept by the resource that installed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
    pub name: String,
    pub id: u64,
}

impl fmt::Display for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service '{0}' is already installed")]
    Duplicate(String),

    #[error("service '{0}' is not installed")]
    NotInstalled(String),

    #[error("service '{name}' failed to start: {reason}")]
    Failed { name: String, reason: String },
}

/// Destination for runtime service installation.
pub trait ServiceTarget {
    fn install(&mut self, request: ServiceRequest) -> Result<ServiceHandle, ServiceError>;

    fn uninstall(&mut self, handle: &ServiceHandle) -> Result<(), ServiceError>;
}

/// In-process service target that records installed services.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    installed: BTreeMap<String, (u64, ServiceConfig)>,
    next_id: u64,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed.contains_key(name)
    }

    pub fn config(&self, name: &str) -> Option<&ServiceConfig> {
        self.installed.get(name).map(|(_, config)| config)
    }

    /// Installed service names in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.installed.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.installed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}

impl ServiceTarget for ServiceRegistry {
    fn install(&mut self, request: ServiceRequest) -> Result<ServiceHandle, ServiceError> {
        if self.installed.contains_key(&request.name) {
            return Err(ServiceError::Duplicate(request.name));
        }
        self.next_id += 1;
        let handle = ServiceHandle {
            name: request.name.clone(),
            id: self.next_id,
        };
        info!(service = %handle, config = ?request.config, "service installed");
        self.installed
            .insert(request.name, (handle.id, request.config));
        Ok(handle)
    }

    fn uninstall(&mut self, handle: &ServiceHandle) -> Result<(), ServiceError> {
        match self.installed.get(&handle.name) {
            Some((id, _)) if *id == handle.id => {
                self.installed.remove(&handle.name);
                info!(service = %handle, "service removed");
                Ok(())
            }
            _ => Err(ServiceError::NotInstalled(handle.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_records_service() {
        let mut registry = ServiceRegistry::new();
        let handle = registry
            .install(ServiceRequest::new("simple", ServiceConfig::Simple))
            .unwrap();
        assert_eq!(handle.name, "simple");
        assert!(registry.is_installed("simple"));
        assert_eq!(registry.config("simple"), Some(&ServiceConfig::Simple));
    }

    #[test]
    fn duplicate_install_fails() {
        let mut registry = ServiceRegistry::new();
        registry
            .install(ServiceRequest::new("simple", ServiceConfig::Simple))
            .unwrap();
        let err = registry
            .install(ServiceRequest::new("simple", ServiceConfig::Simple))
            .unwrap_err();
        assert_eq!(err, ServiceError::Duplicate("simple".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn uninstall_requires_matching_handle() {
        let mut registry = ServiceRegistry::new();
        let handle = registry
            .install(ServiceRequest::new("simple", ServiceConfig::Simple))
            .unwrap();
        let stale = ServiceHandle {
            name: "simple".into(),
            id: handle.id + 100,
        };
        assert!(registry.uninstall(&stale).is_err());
        registry.uninstall(&handle).unwrap();
        assert!(registry.is_empty());
        assert_eq!(
            registry.uninstall(&handle),
            Err(ServiceError::NotInstalled("simple".into()))
        );
    }

    #[test]
    fn reinstall_after_uninstall_gets_new_id() {
        let mut registry = ServiceRegistry::new();
        let first = registry
            .install(ServiceRequest::new("simple", ServiceConfig::Simple))
            .unwrap();
        registry.uninstall(&first).unwrap();
        let second = registry
            .install(ServiceRequest::new("simple", ServiceConfig::Simple))
            .unwrap();
        assert_ne!(first.id, second.id);
    }
}
