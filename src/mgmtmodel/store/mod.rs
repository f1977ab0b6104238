//! # Storage Layer
//!
//! The configuration document is persisted through the [`DocumentStore`]
//! trait, so commands never touch the filesystem directly.
//!
//! ## Implementations
//!
//! - [`fs::FileStore`]: the XML document on disk
//!   - Written to a sibling temp file and renamed into place
//!   - A missing file is an empty configuration
//!
//! - [`memory::InMemoryStore`]: in-memory storage for testing
//!   - No persistence
//!   - Counts saves, so tests can assert that failed commands wrote nothing

use crate::error::Result;

pub mod fs;
pub mod memory;

/// Abstract interface for the configuration document.
pub trait DocumentStore {
    /// The stored document, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored document.
    fn save(&mut self, document: &str) -> Result<()>;
}
