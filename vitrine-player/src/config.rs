use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server_url: String,
    pub screen_token: String,
    pub poll_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub wake_buffer_ms: u64,
    pub cache_path: String,
    pub viewport: Option<String>,
    pub display_type: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_template() -> &'static str {
        r#"server_url = "http://127.0.0.1:8080"
screen_token = "change-me"
# Coarse interval for the cheap refresh check.
poll_interval_secs = 60
heartbeat_interval_secs = 30
fetch_timeout_secs = 10
# The precise wake fires this long after a predicted transition to absorb
# clock skew against the server.
wake_buffer_ms = 1500
cache_path = "manifest-cache.json"
viewport = "1920x1080"
display_type = "landscape-tv"
"#
    }
}
