use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub database: Database,
    #[serde(default)]
    pub limits: Limits,
    pub http: HttpConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.to_string_lossy()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    pub in_memory: bool,
    pub path: Option<PathBuf>,
}

impl Database {
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            path: None,
        }
    }

    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        Self {
            in_memory: false,
            path: Some(path.into()),
        }
    }
}

/// Maximum byte length of the text fields of a track
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    pub max_title_len: usize,
    pub max_artist_len: usize,
    pub max_license_type_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_title_len: 64,
            max_artist_len: 64,
            max_license_type_len: 32,
        }
    }
}
