use crate::attributes::ValidationError;
use crate::lifecycle::ResourceState;
use crate::model::Address;
use crate::resources::ResourceKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MgmtError {
    #[error("Attribute '{0}' is already defined")]
    DuplicateAttribute(String),

    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Malformed document: {0}")]
    Marshal(String),

    #[error("Service installation failed for {address}: {reason}")]
    ServiceInstallation { address: Address, reason: String },

    #[error("Resource type {0:?} is already registered")]
    DuplicateDefinition(ResourceKind),

    #[error("Resource type {0:?} is not registered")]
    UnregisteredKind(ResourceKind),

    #[error("No resource definition matches {0}")]
    UnknownAddress(Address),

    #[error("Resource not found: {0}")]
    ResourceNotFound(Address),

    #[error("Resource already exists: {0}")]
    DuplicateResource(Address),

    #[error("Parent of {0} does not exist")]
    MissingParent(Address),

    #[error("Cannot remove {0}: it still has child resources")]
    HasChildren(Address),

    #[error("Illegal lifecycle transition for {address}: {from:?} -> {to:?}")]
    IllegalTransition {
        address: Address,
        from: ResourceState,
        to: ResourceState,
    },

    #[error("Cannot resolve expression '{0}'")]
    Expression(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Api Error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, MgmtError>;
