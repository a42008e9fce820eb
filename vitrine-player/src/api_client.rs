use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub id: i32,
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub screen_id: i32,
    pub refresh_version: i32,
    pub media: Option<MediaInfo>,
    pub next_check: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshCheck {
    pub should_refresh: bool,
    pub current_version: i32,
}

#[derive(Serialize)]
struct PingBody<'a> {
    token: &'a str,
    viewport: Option<&'a str>,
    display_type: Option<&'a str>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        // A hung request must not stall the scheduling loop.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            token: config.screen_token.clone(),
        })
    }

    pub async fn fetch_manifest(&self) -> Result<Manifest> {
        let url = format!("{}/api/manifest", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    pub async fn refresh_check(
        &self,
        known_version: i32,
        known_media_id: &str,
    ) -> Result<RefreshCheck> {
        let url = format!("{}/api/refresh", self.base_url);
        let known_version = known_version.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("token", self.token.as_str()),
                ("knownVersion", known_version.as_str()),
                ("knownMediaId", known_media_id),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    pub async fn ping(&self, viewport: Option<&str>, display_type: Option<&str>) -> Result<()> {
        let url = format!("{}/api/ping", self.base_url);
        self.http
            .post(&url)
            .json(&PingBody {
                token: &self.token,
                viewport,
                display_type,
            })
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
