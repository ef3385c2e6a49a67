// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the exchangerate-api.com key.
pub const API_KEY_ENV: &str = "EXCHANGERATE_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub api_key: Option<String>,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    pub request_timeout_secs: u64,
    pub popular_currencies: Vec<String>,
    pub localized_names: HashMap<String, String>,
    pub log_level: String,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "https://v6.exchangerate-api.com/v6".to_string(),
            api_key: None,
            cache_ttl_secs: 86_400,
            cache_capacity: 100,
            request_timeout_secs: 30,
            popular_currencies: ["USD", "GBP", "EUR", "RUB", "AED"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            localized_names: [
                ("USD", "Доллар"),
                ("GBP", "Фунт стерлинга"),
                ("EUR", "Евро"),
                ("RUB", "Рубль"),
                ("AED", "Дирхам"),
            ]
            .iter()
            .map(|(code, name)| (code.to_string(), name.to_string()))
            .collect(),
            log_level: "info".to_string(),
            log_file: PathBuf::from("currency-converter.log"),
        }
    }
}

impl Config {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity.max(1)
    }

    /// `None` means no timeout at all.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// The key from the environment wins over the one in the file.
    fn apply_env(&mut self, env_key: Option<String>) {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        if self.api_key.as_deref().map_or(false, |k| k.trim().is_empty()) {
            self.api_key = None;
        }
    }
}

fn get_config_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("config.toml");
    path
}

/// Load `config.toml` (or `path`), falling back to defaults when the file is absent.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    let mut config = if config_path.exists() {
        let config_str = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?
    } else if path.is_some() {
        anyhow::bail!("Config file not found: {}", config_path.display());
    } else {
        Config::default()
    };

    config.apply_env(std::env::var(API_KEY_ENV).ok());
    Ok(config)
}
