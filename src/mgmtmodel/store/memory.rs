use super::DocumentStore;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    document: Option<String>,
    saves: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Some(document.into()),
            saves: 0,
        }
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl DocumentStore for InMemoryStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.document.clone())
    }

    fn save(&mut self, document: &str) -> Result<()> {
        self.document = Some(document.to_string());
        self.saves += 1;
        Ok(())
    }
}
