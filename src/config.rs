use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const STORE_FILE_NAME: &str = "studyflow.sqlite";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings read from `config.toml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the task list is stored. Defaults to the user data directory.
    pub store_path: Option<PathBuf>,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub ai: AiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_path: None,
            log_level: "info".to_string(),
            log_dir: None,
            ai: AiConfig::default(),
        }
    }
}

/// The generative AI endpoint used by `import`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    /// Load the configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}.", path.display()))?;
        Config::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}.", path.display()))
    }

    /// Load a configuration file the user asked for by name; it must exist.
    pub fn load_required(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Config file {} does not exist.", path.display());
        }
        Config::load(path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "gozque", "studyflow")
}

pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

pub fn default_store_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join(STORE_FILE_NAME))
}

pub fn default_log_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("logs"))
}
