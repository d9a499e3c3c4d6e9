use crate::prelude::*;
use clap::ValueEnum;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path, path::PathBuf};

pub const CONFIG_FILE_NAME: &str = "cloudmeta.config.json";
pub const DEFAULT_CONFIG: &str = include_str!("../res/cloudmeta.config.json");
pub const DEFAULT_TEMPLATE: &str = include_str!("../res/records.hbs");

/// Key format a records file is written in.
#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    #[default]
    External,
    Persistence,
}

impl KeyFormat {
    pub fn other(self) -> Self {
        match self {
            KeyFormat::External => KeyFormat::Persistence,
            KeyFormat::Persistence => KeyFormat::External,
        }
    }
}

fn default_pretty() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub format: KeyFormat,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
    #[serde(default)]
    pub template: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self { format: KeyFormat::default(), pretty: default_pretty(), template: None }
    }
}

impl Config {
    pub fn home_dir() -> Result<PathBuf> {
        let dirs = UserDirs::new().ok_or_else(|| eyre!("can't get user dirs"))?;
        Ok(dirs.home_dir().to_owned())
    }

    pub fn config_dir() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join(".config").join("cloudmeta"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn load() -> Result<Config> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            std::fs::create_dir_all(Self::config_dir()?)?;
            std::fs::write(&config_path, DEFAULT_CONFIG)?;
            tracing::info!(path = ?config_path, "wrote default config");
        }
        Self::load_from(&config_path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let file = File::open(path).wrap_err_with(|| f!("can't find config: {path:?}"))?;
        let mut config: Config =
            serde_json::from_reader(file).wrap_err("Error deserializing config")?;
        if config.template.is_none_or_empty() {
            config.template = None;
        }
        if let Some(template) = config.template.take() {
            config.template = Some(match template.strip_prefix('~') {
                Some(rest) => f!("{}{rest}", Self::home_dir()?.display()),
                None => template,
            });
        }
        tracing::debug!(?config, "config loaded");
        Ok(config)
    }
}
