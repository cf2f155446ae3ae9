use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub api_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub output_dir: String,
    pub default_image_size: String,
    pub max_images: usize,
    pub max_videos: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            output_dir: "dist".to_string(),
            default_image_size: "100%".to_string(),
            max_images: 5,
            max_videos: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .context("Failed to read config file")?;
            let config: Config = serde_json::from_str(&content)
                .context("Failed to parse config file")?;
            config
        } else {
            // Create default config
            let config = Config::default();
            let content = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config")?;
            fs::write(path, content)
                .context("Failed to write default config")?;
            config
        };

        config.apply_env(|name| std::env::var(name).ok());

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            bail!("Config field 'model' must not be empty");
        }
        Ok(())
    }

    /// Replaces the key with the first non-blank credential variable, if any.
    /// Runs after the default file is written, so env keys never reach disk.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_key) = api_key_from_env(lookup) {
            self.api_key = Some(api_key);
        }
    }
}

fn api_key_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|name| lookup(*name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
