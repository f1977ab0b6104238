//! SASL security settings of a remoting connector.
//!
//! Pure configuration: adding it never installs anything. The connector that
//! owns it picks the settings up the next time it is (re)started.
//!
//! The two enumerations use different case policies. `qop` must be written
//! exactly as declared; `strength` accepts any case and is stored lower-case.

use super::{PathPattern, ResourceDefinition, ResourceKind};
use crate::attributes::{AttributeRegistry, AttributeSpec, Validator, Value, ValueType};
use crate::error::Result;

pub const INCLUDE_MECHANISMS: &str = "include-mechanisms";
pub const QOP: &str = "qop";
pub const STRENGTH: &str = "strength";
pub const SERVER_AUTH: &str = "server-auth";
pub const REUSE_SESSION: &str = "reuse-session";

pub const QOP_VALUES: &[&str] = &["auth", "auth-int", "auth-conf"];
pub const STRENGTH_VALUES: &[&str] = &["low", "medium", "high"];

pub fn definition() -> Result<ResourceDefinition> {
    let attributes = AttributeRegistry::from_specs([
        AttributeSpec::list(INCLUDE_MECHANISMS)
            .nullable()
            .describe("SASL mechanisms offered to clients, e.g. DIGEST-MD5 PLAIN"),
        AttributeSpec::list(QOP)
            .nullable()
            .validator(Validator::allowed(QOP_VALUES, true))
            .describe("Quality-of-protection values, in order of preference"),
        AttributeSpec::list(STRENGTH)
            .nullable()
            .validator(Validator::allowed(STRENGTH_VALUES, false))
            .describe("Cipher strength values, in order of preference"),
        AttributeSpec::scalar(SERVER_AUTH, ValueType::Boolean)
            .default_value(Value::Bool(false))
            .nullable()
            .expressions()
            .wrapped()
            .describe("Whether the server must authenticate to the client"),
        AttributeSpec::scalar(REUSE_SESSION, ValueType::Boolean)
            .default_value(Value::Bool(false))
            .nullable()
            .expressions()
            .wrapped()
            .describe("Whether cached SASL sessions may be reused"),
    ])?;

    Ok(ResourceDefinition::new(
        ResourceKind::Sasl,
        PathPattern::fixed("security", "sasl"),
        "sasl",
        attributes,
    )
    .child_of(ResourceKind::Connector)
    .describe("SASL settings of a remoting connector"))
}
