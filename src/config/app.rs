// src/config/app.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fmt, fs};

use crate::commands::DEFAULT_COMMAND_NAME;
use crate::notify::broadcast::DEFAULT_MAX_IN_FLIGHT;
use crate::notify::discord::DEFAULT_API_BASE;
use crate::notify::{DEFAULT_NEWS_FOOTER, DEFAULT_VIDEO_FOOTER};

pub const ENV_CONFIG_PATH: &str = "FEEDCAST_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/feedcast.toml";

// Permissions the bot needs to read commands and post embeds.
const INVITE_PERMISSIONS: u64 = 274_878_024_768;

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_poll_interval_secs() -> u64 {
    600
}
fn default_http_port() -> u16 {
    3000
}
fn default_http_timeout_secs() -> u64 {
    30
}
fn default_command_name() -> String {
    DEFAULT_COMMAND_NAME.to_string()
}
fn default_news_footer() -> String {
    DEFAULT_NEWS_FOOTER.to_string()
}
fn default_video_footer() -> String {
    DEFAULT_VIDEO_FOOTER.to_string()
}
fn default_delivery_concurrency() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub discord_token: String,
    #[serde(default)]
    pub discord_application_id: Option<String>,
    #[serde(default = "default_api_base")]
    pub discord_api_base: String,
    #[serde(default)]
    pub rss_url: Option<String>,
    #[serde(default)]
    pub youtube_channel_id: Option<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_command_name")]
    pub command_name: String,
    #[serde(default = "default_news_footer")]
    pub news_footer: String,
    #[serde(default = "default_video_footer")]
    pub video_footer: String,
    #[serde(default = "default_delivery_concurrency")]
    pub delivery_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            discord_application_id: None,
            discord_api_base: default_api_base(),
            rss_url: None,
            youtube_channel_id: None,
            data_dir: default_data_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            http_port: default_http_port(),
            http_timeout_secs: default_http_timeout_secs(),
            command_name: default_command_name(),
            news_footer: default_news_footer(),
            video_footer: default_video_footer(),
            delivery_concurrency: default_delivery_concurrency(),
        }
    }
}

// Never print the bot token.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("discord_token", &format!("<{} chars>", self.discord_token.len()))
            .field("discord_application_id", &self.discord_application_id)
            .field("discord_api_base", &self.discord_api_base)
            .field("rss_url", &self.rss_url)
            .field("youtube_channel_id", &self.youtube_channel_id)
            .field("data_dir", &self.data_dir)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("http_port", &self.http_port)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("command_name", &self.command_name)
            .field("delivery_concurrency", &self.delivery_concurrency)
            .finish()
    }
}

impl AppConfig {
    /// Full startup load:
    /// 1) `.env` (if present)
    /// 2) $FEEDCAST_CONFIG, else config/feedcast.toml when it exists
    /// 3) environment variable overrides
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };

        cfg.apply_env_from(|k| env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing config toml")
    }

    /// Overlay values from `get` (normally the process environment).
    /// Blank values count as unset.
    pub fn apply_env_from<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = var("DISCORD_TOKEN") {
            self.discord_token = v;
        }
        if let Some(v) = var("DISCORD_APPLICATION_ID") {
            self.discord_application_id = Some(v);
        }
        if let Some(v) = var("DISCORD_API_BASE") {
            self.discord_api_base = v;
        }
        if let Some(v) = var("RSS_URL") {
            self.rss_url = Some(v);
        }
        if let Some(v) = var("YOUTUBE_CHANNEL_ID") {
            self.youtube_channel_id = Some(v);
        }
        if let Some(v) = var("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("POLL_INTERVAL_SECS") {
            self.poll_interval_secs = v.parse().context("POLL_INTERVAL_SECS")?;
        }
        if let Some(v) = var("HTTP_PORT") {
            self.http_port = v.parse().context("HTTP_PORT")?;
        }
        if let Some(v) = var("HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = v.parse().context("HTTP_TIMEOUT_SECS")?;
        }
        if let Some(v) = var("COMMAND_NAME") {
            self.command_name = v;
        }
        if let Some(v) = var("NEWS_FOOTER") {
            self.news_footer = v;
        }
        if let Some(v) = var("VIDEO_FOOTER") {
            self.video_footer = v;
        }
        if let Some(v) = var("DELIVERY_CONCURRENCY") {
            self.delivery_concurrency = v.parse().context("DELIVERY_CONCURRENCY")?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            bail!("DISCORD_TOKEN is missing");
        }
        if self.poll_interval_secs == 0 {
            bail!("poll interval must be at least 1 second");
        }
        if self.rss_url.is_none() && self.youtube_channel_id.is_none() {
            tracing::warn!("neither RSS_URL nor YOUTUBE_CHANNEL_ID is set; nothing will be polled");
        }
        Ok(())
    }

    pub fn subscriptions_path(&self) -> PathBuf {
        self.data_dir.join("channels.json")
    }

    pub fn news_state_path(&self) -> PathBuf {
        self.data_dir.join("news_state.json")
    }

    pub fn youtube_state_path(&self) -> PathBuf {
        self.data_dir.join("youtube_state.json")
    }

    /// OAuth2 URL that adds the bot to a server, when the app id is known.
    pub fn invite_link(&self) -> Option<String> {
        self.discord_application_id.as_ref().map(|id| {
            format!(
                "https://discord.com/api/oauth2/authorize?client_id={id}&permissions={INVITE_PERMISSIONS}&scope=bot"
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_reference_setup() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.poll_interval_secs, 600);
        assert_eq!(cfg.http_port, 3000);
        assert_eq!(cfg.subscriptions_path(), PathBuf::from("data/channels.json"));
        assert_eq!(cfg.news_state_path(), PathBuf::from("data/news_state.json"));
        assert_eq!(cfg.youtube_state_path(), PathBuf::from("data/youtube_state.json"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = AppConfig::from_toml_str(
            r#"
discord_token = "from-file"
rss_url = "https://example.com/feed.xml"
poll_interval_secs = 120
"#,
        )
        .unwrap();
        let env = env_of(&[
            ("DISCORD_TOKEN", "from-env"),
            ("YOUTUBE_CHANNEL_ID", "UC123"),
            ("RSS_URL", "   "),
        ]);
        cfg.apply_env_from(|k| env.get(k).cloned()).unwrap();

        assert_eq!(cfg.discord_token, "from-env");
        assert_eq!(cfg.youtube_channel_id.as_deref(), Some("UC123"));
        assert_eq!(cfg.rss_url.as_deref(), Some("https://example.com/feed.xml"));
        assert_eq!(cfg.poll_interval_secs, 120);
        assert_eq!(cfg.command_name, DEFAULT_COMMAND_NAME);
    }

    #[test]
    fn bad_numbers_are_errors() {
        let mut cfg = AppConfig::default();
        let env = env_of(&[("HTTP_PORT", "not-a-port")]);
        assert!(cfg.apply_env_from(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn missing_token_fails_validation() {
        let cfg = AppConfig::default();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("DISCORD_TOKEN"));
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = AppConfig {
            discord_token: "super-secret".into(),
            ..AppConfig::default()
        };
        let out = format!("{cfg:?}");
        assert!(!out.contains("super-secret"));
        assert!(out.contains("<12 chars>"));
    }

    #[test]
    fn invite_link_needs_application_id() {
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.invite_link(), None);
        cfg.discord_application_id = Some("42".into());
        assert_eq!(
            cfg.invite_link().as_deref(),
            Some("https://discord.com/api/oauth2/authorize?client_id=42&permissions=274878024768&scope=bot")
        );
    }
}
