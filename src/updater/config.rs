use super::errors::{Result, UpdateError};
use super::repo_config::{ApiCfg, RepoCfg};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

fn default_telegram_api() -> String { "https://api.telegram.org".to_string() }

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub telegram: Option<TelegramCfg>,
    /// Reload endpoint used by bots that do not declare their own
    pub api: Option<ApiCfg>,
    pub repositories: Vec<RepoCfg>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TelegramCfg {
    pub token: String,
    pub chat_id: ChatId,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

/// Telegram accepts both numeric ids and `@channel` names.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Name(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{id}"),
            ChatId::Name(name) => f.write_str(name),
        }
    }
}

impl Config {
    /// Reads the document at `path`. `.toml` files are parsed as TOML,
    /// everything else as JSON with `//` comment lines removed.
    pub fn load_config(path: &str) -> Result<Config> {
        let file_text = std::fs::read_to_string(path).map_err(|source| UpdateError::Config {
            path: path.to_string(),
            source,
        })?;

        let is_toml = Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Ok(toml::from_str(&file_text)?)
        } else {
            Self::from_commented_json(&file_text)
        }
    }

    pub fn from_commented_json(text: &str) -> Result<Config> {
        let stripped: String = text
            .lines()
            .filter(|line| !line.trim_start().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(serde_json::from_str(&stripped)?)
    }
}
