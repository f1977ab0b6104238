//! # mgmtmodel Architecture
//!
//! mgmtmodel is a **typed management model**: resources addressed by paths,
//! each carrying validated attributes, persisted as an XML document and
//! backed by runtime services that are installed and removed alongside the
//! model. The CLI is one client of the library, not the other way around.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (main.rs + args.rs)                              │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Normalizes inputs (address strings, name=value pairs)    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - One operation each, returns `Result<CmdResult>`          │
//! │  - Persists the document after successful changes           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Core                                                       │
//! │  - attributes/: specs, values, validators                   │
//! │  - resources/: definitions and the registry                 │
//! │  - lifecycle.rs: add / remove / write with runtime plans    │
//! │  - marshal.rs: XML read and write                           │
//! │  - store/: DocumentStore trait, FileStore, InMemoryStore    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! From `api.rs` inward nothing writes to stdout or stderr and nothing
//! exits the process. Diagnostics go through `tracing`; the binary decides
//! where they end up.
//!
//! ## Testing Strategy
//!
//! 1. **Core and commands**: unit tests next to the code, using
//!    `InMemoryStore` and recording service targets.
//! 2. **API**: dispatch and input parsing.
//! 3. **CLI**: `tests/cli_integration.rs` drives the binary against a
//!    temporary config directory.

pub mod api;
pub mod attributes;
pub mod commands;
pub mod config;
pub mod error;
pub mod expression;
pub mod lifecycle;
pub mod marshal;
pub mod model;
pub mod resources;
pub mod services;
pub mod store;
