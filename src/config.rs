use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::json_store::default_data_dir;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Accounts and cards in the local data directory.
    #[default]
    Local,
    /// Firebase Authentication plus Realtime Database.
    Firebase,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseConfig {
    #[serde(default)]
    pub api_key: String,
    /// e.g. `https://my-project-default-rtdb.firebaseio.com`
    #[serde(default)]
    pub database_url: String,
}

impl FirebaseConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.database_url.trim().is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_dark_mode")]
    pub dark_mode: bool,
    #[serde(default)]
    pub remembered_email: Option<String>,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub firebase: FirebaseConfig,
}

fn default_dark_mode() -> bool {
    false
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dark_mode: default_dark_mode(),
            remembered_email: None,
            backend: BackendKind::default(),
            data_dir: default_data_dir(),
            firebase: FirebaseConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flashy")
            .join("config.toml")
    }

    /// Blank remembered emails are treated as absent.
    pub fn remembered_email(&self) -> Option<&str> {
        self.remembered_email
            .as_deref()
            .filter(|email| !email.trim().is_empty())
    }
}
