// Receiver configuration.
//
// `ReceiverConfig` can come from three layers: built-in defaults, an optional
// JSON file (`ReceiverConfig::load`), and command-line flags applied by
// `main.rs`. Missing file fields fall back to the defaults via
// `#[serde(default)]`.

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::engine::{Engine, LineEngine};
use crate::error::ConfigError;

/// Which game engine to attach.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// No engine: readiness is never reported and signals are dropped.
    #[default]
    None,
    /// JSON lines on stdout for a host game process to consume.
    Stdout,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub bind: String,
    /// 0 lets the OS pick a free port.
    pub port: u16,
    pub engine: EngineKind,
    /// Readiness reported by the stdout engine.
    pub engine_ready: bool,
    pub end_game_on_leave: bool,
    /// How long a write to one controller may block before that controller
    /// is disconnected.
    pub write_timeout_ms: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8008,
            engine: EngineKind::None,
            engine_ready: true,
            end_game_on_leave: false,
            write_timeout_ms: 2000,
        }
    }
}

impl ReceiverConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn build_engine(&self) -> Engine {
        match self.engine {
            EngineKind::None => Engine::Unavailable,
            EngineKind::Stdout => Engine::attached(LineEngine::stdout(self.engine_ready)),
        }
    }
}
