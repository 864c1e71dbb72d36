//! Session configuration, loaded from TOML.
//!
//! ```toml
//! [user]
//! bot = "builder"
//! operator = "Steve"
//!
//! [plot]
//! block = "iron_block"
//! data = 0
//! placement_delay_ms = 1
//!
//! [dispatch]
//! request_timeout_secs = 30
//! ```

use crate::error::{EngineError, EngineResult};
use crate::space::MaterialSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub user: UserConfig,
    pub plot: PlotConfig,
    pub dispatch: DispatchConfig,
}

/// Identities on the remote world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Name the engine issues commands as.
    pub bot: String,
    /// The only player whose chat is evaluated as script.
    pub operator: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            bot: "builder".to_string(),
            operator: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Initial value of the `block` script variable.
    pub block: String,
    /// Initial value of the `data` script variable.
    pub data: u8,
    /// Pause between consecutive `setblock` commands.
    pub placement_delay_ms: u64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            block: "iron_block".to_string(),
            data: 0,
            placement_delay_ms: 1,
        }
    }
}

impl PlotConfig {
    pub fn material(&self) -> MaterialSpec {
        MaterialSpec::new(self.block.clone(), self.data)
    }

    pub fn placement_delay(&self) -> Duration {
        Duration::from_millis(self.placement_delay_ms)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Unanswered commands older than this are purged. `None` keeps them forever.
    pub request_timeout_secs: Option<u64>,
}

impl DispatchConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl SessionConfig {
    pub fn from_toml_str(source: &str) -> EngineResult<Self> {
        toml::from_str(source).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }
}
