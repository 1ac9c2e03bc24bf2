use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub grid: GridConfig,
    pub agent: AgentConfig,
    pub training: TrainingConfig,
    pub display: DisplayConfig,
}

/// Board geometry. `width` and `height` count cells; `cell_size` is pixels per cell on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: i32,
    pub height: i32,
    pub cell_size: u32,
    pub initial_length: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { width: 20, height: 20, cell_size: 20, initial_length: 3 }
    }
}

/// Q-learning step parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub learning_rate: f32,
    pub discount_factor: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { learning_rate: 0.1, discount_factor: 0.9 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    pub epsilon_start: f32,
    /// Multiplier applied to epsilon every `decay_interval` episodes.
    pub epsilon_decay: f32,
    pub decay_interval: usize,
    pub report_interval: usize,
    /// Ends an episode after this many steps even if the snake is alive. Unlimited when unset.
    pub step_limit: Option<usize>,
    pub table_path: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 20_000,
            epsilon_start: 1.0,
            epsilon_decay: 0.1,
            decay_interval: 1000,
            report_interval: 100,
            step_limit: None,
            table_path: PathBuf::from("q_table.bin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub ticks_per_second: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { ticks_per_second: 10 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.grid;
        if grid.width < 4 || grid.height < 4 {
            return Err(ConfigError::Validation("grid must be at least 4x4".into()));
        }
        if grid.initial_length == 0 {
            return Err(ConfigError::Validation("grid.initial_length must be >= 1".into()));
        }
        // The tail is laid out to the left of the centered head.
        if grid.initial_length as i32 > grid.width / 2 + 1 {
            return Err(ConfigError::Validation(
                "grid.initial_length does not fit left of the center".into(),
            ));
        }
        if grid.cell_size == 0 {
            return Err(ConfigError::Validation("grid.cell_size must be > 0".into()));
        }

        let agent = &self.agent;
        if !(agent.learning_rate > 0.0 && agent.learning_rate <= 1.0) {
            return Err(ConfigError::Validation(
                "agent.learning_rate must be in (0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&agent.discount_factor) {
            return Err(ConfigError::Validation(
                "agent.discount_factor must be in [0, 1]".into(),
            ));
        }

        let training = &self.training;
        if training.episodes == 0 {
            return Err(ConfigError::Validation("training.episodes must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&training.epsilon_start) {
            return Err(ConfigError::Validation(
                "training.epsilon_start must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&training.epsilon_decay) {
            return Err(ConfigError::Validation(
                "training.epsilon_decay must be in [0, 1]".into(),
            ));
        }
        if training.decay_interval == 0 || training.report_interval == 0 {
            return Err(ConfigError::Validation(
                "training.decay_interval and training.report_interval must be > 0".into(),
            ));
        }

        if training.step_limit == Some(0) {
            return Err(ConfigError::Validation("training.step_limit must be > 0".into()));
        }

        if self.display.ticks_per_second == 0 {
            return Err(ConfigError::Validation(
                "display.ticks_per_second must be > 0".into(),
            ));
        }
        Ok(())
    }
}
