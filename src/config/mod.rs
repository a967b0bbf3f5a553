//! Bot settings loaded from a TOML file with `[telegram]`, `[model]`, `[paths]` tables.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub telegram: TelegramSettings,
    pub model: ModelSettings,
    pub paths: PathSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSettings {
    #[serde(default)]
    pub token: String,
    /// Empty means the bot answers every chat.
    #[serde(default)]
    pub allowed_chat_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    pub model_path: PathBuf,
    pub class_names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathSettings {
    pub temp_dir: PathBuf,
}

impl BotConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config = Self::parse(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.resolve_relative_to(path.parent().unwrap_or_else(|| Path::new(".")));
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut config: BotConfig = toml::from_str(raw).context("failed to parse TOML")?;
        config.model.class_names = config
            .model
            .class_names
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        config.validate()?;
        Ok(config)
    }

    /// Replace the token, e.g. from the environment.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.telegram.token = token;
        }
        self
    }

    pub fn allowed_chats(&self) -> HashSet<i64> {
        self.telegram.allowed_chat_ids.iter().copied().collect()
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.model.class_names.is_empty(),
            "[model] class_names must list at least one class"
        );
        ensure!(
            !self.paths.temp_dir.as_os_str().is_empty(),
            "[paths] temp_dir must not be empty"
        );
        Ok(())
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        if self.model.model_path.is_relative() {
            self.model.model_path = base.join(&self.model.model_path);
        }
        if self.paths.temp_dir.is_relative() {
            self.paths.temp_dir = base.join(&self.paths.temp_dir);
        }
    }
}
