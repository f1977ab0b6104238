use super::DocumentStore;
use crate::error::{MgmtError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(MgmtError::Io)?;
            }
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DocumentStore for FileStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(MgmtError::Io)?;
        debug!(path = %self.path.display(), bytes = content.len(), "document loaded");
        Ok(Some(content))
    }

    fn save(&mut self, document: &str) -> Result<()> {
        self.ensure_parent()?;
        let tmp = self.temp_path();
        fs::write(&tmp, document).map_err(MgmtError::Io)?;
        fs::rename(&tmp, &self.path).map_err(MgmtError::Io)?;
        debug!(path = %self.path.display(), bytes = document.len(), "document saved");
        Ok(())
    }
}
