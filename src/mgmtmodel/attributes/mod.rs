//! # Attribute System
//!
//! Every management resource declares its configuration through a set of
//! [`AttributeSpec`]s. Instead of each resource validating and persisting its
//! fields ad-hoc, the attribute system provides:
//!
//! - **Definitions**: value shape, type, default, nullability, expression support
//! - **Registry**: the ordered, duplicate-free attribute set of one resource type
//! - **Validation**: allowed-value and length constraints, applied per list element
//! - **Marshalling style**: how the value appears in the XML document, as data
//!
//! ## Attribute Shapes
//!
//! | Kind | Value type | Example | Default style |
//! |------|------------|---------|---------------|
//! | `Scalar` | `Boolean` | `server-auth` | XML attribute |
//! | `Scalar` | `String` | `socket-binding` | XML attribute |
//! | `StringList` | `String` | `qop` | joined list element |
//!
//! ## Usage
//!
//! ```
//! use mgmtmodel::attributes::{AttributeRegistry, AttributeSpec, ValueType, Validator, Value};
//!
//! let mut attrs = AttributeRegistry::new();
//! attrs
//!     .define(AttributeSpec::list("qop").nullable().validator(Validator::allowed(&["auth"], true)))
//!     .unwrap();
//! attrs
//!     .define(AttributeSpec::scalar("reuse-session", ValueType::Boolean).default_value(Value::Bool(false)))
//!     .unwrap();
//!
//! let spec = attrs.get("qop").unwrap();
//! assert!(mgmtmodel::attributes::validate(spec, &Value::List(vec!["auth".into()])).is_ok());
//! ```

mod spec;
mod validator;
mod value;

pub use spec::{AttributeKind, AttributeRegistry, AttributeSpec, ElementStyle, ValueType};
pub use validator::{validate, ValidationError, Validator};
pub use value::{is_expression, Value};
