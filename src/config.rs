//! Configuration loading and management
//!
//! Handles parsing of `.tandem.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::{Assignee, Priority};

/// Name of the configuration file at the board root
pub const CONFIG_FILE: &str = ".tandem.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Actor configuration
    #[serde(default)]
    pub actor: ActorConfig,

    /// Board configuration
    #[serde(default)]
    pub board: BoardConfig,
}

/// Actor-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Default actor name when none specified
    #[serde(default = "default_actor")]
    pub default: String,
}

fn default_actor() -> String {
    "unknown".to_string()
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            default: default_actor(),
        }
    }
}

/// Board roster, tag vocabulary and display limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Users tasks can be assigned to; the first is the default assignee
    #[serde(default = "default_users")]
    pub users: Vec<String>,

    /// Allowed tag identifiers
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,

    /// Maximum activity entries returned per task
    #[serde(default = "default_activity_limit")]
    pub activity_limit: usize,

    /// Priority for quick-added tasks
    #[serde(default)]
    pub default_priority: Priority,
}

fn default_users() -> Vec<String> {
    vec!["alex".to_string(), "sam".to_string()]
}

fn default_tags() -> Vec<String> {
    ["bug", "feature", "chore", "home", "work", "urgent"]
        .iter()
        .map(|tag| tag.to_string())
        .collect()
}

fn default_activity_limit() -> usize {
    50
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            users: default_users(),
            tags: default_tags(),
            activity_limit: default_activity_limit(),
            default_priority: Priority::default(),
        }
    }
}

impl BoardConfig {
    pub fn has_user(&self, name: &str) -> bool {
        self.users.iter().any(|user| user == name)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|entry| entry == tag)
    }

    pub fn default_assignee(&self) -> Assignee {
        Assignee::new(self.users.first().cloned().unwrap_or_else(default_actor))
    }

    fn validate(&self) -> crate::error::Result<()> {
        validate_names(&self.users, "board.users")?;
        validate_names(&self.tags, "board.tags")?;
        if self.activity_limit == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "board.activity_limit must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_names(names: &[String], field: &str) -> crate::error::Result<()> {
    if names.is_empty() {
        return Err(crate::error::Error::InvalidConfig(format!(
            "{field} cannot be empty"
        )));
    }
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if name.trim().is_empty() || name.trim() != name {
            return Err(crate::error::Error::InvalidConfig(format!(
                "{field} entries must be non-empty without surrounding whitespace: '{name}'"
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "{field} has duplicate entry '{name}'"
            )));
        }
    }
    Ok(())
}

impl Config {
    /// Load configuration from a `.tandem.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the board root, or return defaults
    pub fn load_from_dir(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &PathBuf) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.board.validate()?;
        Ok(())
    }
}
