//! Engine configuration at `<home>/.taskpanel/config.yaml`.
//!
//! Every key is optional; a missing file yields the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use taskpanel_core::store;

use crate::error::{io_err, SyncError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Refuse to apply while the document has parse warnings.
    pub block_on_warnings: bool,
    /// Append reconciliations to the per-record audit log.
    pub audit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            block_on_warnings: false,
            audit: true,
        }
    }
}

impl EngineConfig {
    pub fn load_at(home: &Path) -> Result<Self, SyncError> {
        let path = store::config_path_at(home);
        if !path.exists() {
            return Ok(EngineConfig::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        if contents.trim().is_empty() {
            return Ok(EngineConfig::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| SyncError::Config { path, source })
    }
}
