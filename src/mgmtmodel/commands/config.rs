use crate::commands::{CmdMessage, CmdResult};
use crate::config::MgmtConfig;
use crate::error::{MgmtError, Result};
use std::path::Path;

#[derive(Debug, Clone)]
pub enum ConfigAction {
    ShowAll,
    ShowKey(String),
    Set(String, String),
}

/// Show or change `config.json` in `dir`. Unknown keys and unparsable values
/// are errors, and nothing is saved for them.
pub fn run(dir: &Path, action: ConfigAction) -> Result<CmdResult> {
    let mut config = MgmtConfig::load(dir)?;
    let mut result = CmdResult::default();
    match action {
        ConfigAction::ShowAll => {}
        ConfigAction::ShowKey(key) => {
            let value = lookup(&config, &key)?;
            result.add_message(CmdMessage::info(value));
        }
        ConfigAction::Set(key, value) => {
            config.set(&key, &value).map_err(MgmtError::Api)?;
            config.save(dir)?;
            let stored = lookup(&config, &key)?;
            result.add_message(CmdMessage::success(format!("{} set to {}", key, stored)));
        }
    }
    Ok(result.with_config(config))
}

fn lookup(config: &MgmtConfig, key: &str) -> Result<String> {
    config
        .get(key)
        .ok_or_else(|| MgmtError::Api(format!("Unknown config key: {}", key)))
}
