use crate::error::{MgmtError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_DOCUMENT: &str = "standalone.xml";

/// Configuration for mgmtmodel, stored in `<config dir>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct MgmtConfig {
    /// Path of the XML document, relative to the config directory unless absolute
    #[serde(default = "default_document")]
    pub document: String,

    /// Apply model changes without installing or removing services
    #[serde(default)]
    pub admin_only: bool,

    /// Remove a freshly added resource when its services fail to install
    #[serde(default = "default_true")]
    pub rollback_on_runtime_failure: bool,

    /// Values for `${...}` expressions
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_document() -> String {
    DEFAULT_DOCUMENT.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for MgmtConfig {
    fn default() -> Self {
        Self {
            document: default_document(),
            admin_only: false,
            rollback_on_runtime_failure: true,
            properties: BTreeMap::new(),
        }
    }
}

impl MgmtConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(MgmtError::Io)?;
        let config: MgmtConfig =
            serde_json::from_str(&content).map_err(MgmtError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(MgmtError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(MgmtError::Serialization)?;
        fs::write(config_path, content).map_err(MgmtError::Io)?;
        Ok(())
    }

    /// Read a key. Properties are addressed as `property.<name>`.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "document" => Some(self.document.clone()),
            "admin-only" => Some(self.admin_only.to_string()),
            "rollback-on-runtime-failure" => Some(self.rollback_on_runtime_failure.to_string()),
            _ => key
                .strip_prefix("property.")
                .and_then(|name| self.properties.get(name).cloned()),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "document" if value.is_empty() => Err("document must not be empty".to_string()),
            "document" => {
                self.document = value.to_string();
                Ok(())
            }
            "admin-only" => {
                self.admin_only = parse_flag(key, value)?;
                Ok(())
            }
            "rollback-on-runtime-failure" => {
                self.rollback_on_runtime_failure = parse_flag(key, value)?;
                Ok(())
            }
            _ => match key.strip_prefix("property.") {
                Some(name) if !name.is_empty() => {
                    self.properties.insert(name.to_string(), value.to_string());
                    Ok(())
                }
                _ => Err(format!("Unknown config key: {}", key)),
            },
        }
    }

    /// Every key with its current value, properties last.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![
            ("document".to_string(), self.document.clone()),
            ("admin-only".to_string(), self.admin_only.to_string()),
            (
                "rollback-on-runtime-failure".to_string(),
                self.rollback_on_runtime_failure.to_string(),
            ),
        ];
        entries.extend(
            self.properties
                .iter()
                .map(|(k, v)| (format!("property.{}", k), v.clone())),
        );
        entries
    }
}

fn parse_flag(key: &str, value: &str) -> std::result::Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => Err(format!("{} expects true or false, got '{}'", key, value)),
    }
}
