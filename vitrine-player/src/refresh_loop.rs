use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

use crate::api_client::{ApiClient, Manifest};
use crate::cache::ManifestCache;
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    /// Startup, nothing known yet.
    Loading,
    /// A manifest is known but carries no media.
    Idle,
    /// Media is on screen.
    Playing,
    /// No manifest at all; the offline badge is up.
    Offline,
}

/// One task owns every timer: the coarse poll, the precise schedule wake,
/// and the heartbeat. Manifest fetches are serialized by construction, and
/// the wake deadline is recomputed from the current manifest on each turn,
/// so a fresh manifest implicitly cancels and re-arms the old timer.
pub struct RefreshLoop {
    config: Config,
    client: ApiClient,
    cache: ManifestCache,
    manifest: Option<Manifest>,
    phase: PlayerPhase,
}

impl RefreshLoop {
    pub fn new(config: Config, client: ApiClient, cache: ManifestCache) -> Self {
        Self {
            config,
            client,
            cache,
            manifest: None,
            phase: PlayerPhase::Loading,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        match self.client.fetch_manifest().await {
            Ok(manifest) => self.apply_manifest(manifest, true),
            Err(e) => {
                tracing::warn!("Initial manifest fetch failed: {}", e);
                match self.cache.load() {
                    Some(manifest) => {
                        tracing::info!("Falling back to cached manifest");
                        self.apply_manifest(manifest, false);
                    }
                    None => {
                        self.phase = PlayerPhase::Offline;
                        tracing::warn!("No cached manifest available; starting offline");
                    }
                }
            }
        }

        let mut poll = interval(Duration::from_secs(self.config.poll_interval_secs));
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut heartbeat = interval(Duration::from_secs(self.config.heartbeat_interval_secs));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Intervals fire immediately on their first tick; the startup fetch
        // already covered this instant.
        poll.tick().await;
        heartbeat.tick().await;

        loop {
            let wake_at = wake_instant(
                self.manifest.as_ref().and_then(|m| m.next_check),
                self.config.wake_buffer_ms,
                Utc::now(),
            );

            tokio::select! {
                _ = poll.tick() => self.coarse_poll().await,
                _ = sleep_until(to_instant(wake_at.unwrap_or_else(Utc::now))), if wake_at.is_some() => {
                    tracing::info!("Schedule transition expected; refreshing manifest");
                    self.refetch().await;
                }
                _ = heartbeat.tick() => self.send_heartbeat().await,
            }
        }
    }

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    async fn coarse_poll(&mut self) {
        let (known_version, known_media) = known_state(self.manifest.as_ref());

        match self.client.refresh_check(known_version, &known_media).await {
            Ok(check) if check.should_refresh => {
                tracing::info!(
                    "Server reports stale content (current version {})",
                    check.current_version
                );
                self.refetch().await;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Refresh check failed: {}", e),
        }
    }

    async fn refetch(&mut self) {
        match self.client.fetch_manifest().await {
            Ok(manifest) => self.apply_manifest(manifest, true),
            Err(e) if is_auth_error(&e) => {
                // The pairing token was rejected; keep displaying the last
                // good manifest but raise the offline badge.
                self.phase = PlayerPhase::Offline;
                tracing::error!("Server rejected our pairing token: {}", e);
            }
            Err(e) => {
                // Keep showing the last good manifest; the next tick retries.
                tracing::warn!("Manifest fetch failed, keeping last known state: {}", e);
            }
        }
    }

    fn apply_manifest(&mut self, manifest: Manifest, persist: bool) {
        let previous = self
            .manifest
            .as_ref()
            .and_then(|m| m.media.as_ref().map(|media| media.id));
        let current = manifest.media.as_ref().map(|media| media.id);

        if previous != current {
            match &manifest.media {
                Some(media) => {
                    tracing::info!("Now showing media {} ({})", media.id, media.media_type)
                }
                None => tracing::info!("No content assigned; clearing display"),
            }
        }

        self.phase = if manifest.media.is_some() {
            PlayerPhase::Playing
        } else {
            PlayerPhase::Idle
        };

        if persist {
            self.cache.store(&manifest);
        }
        self.manifest = Some(manifest);
    }

    async fn send_heartbeat(&self) {
        if let Err(e) = self
            .client
            .ping(
                self.config.viewport.as_deref(),
                self.config.display_type.as_deref(),
            )
            .await
        {
            tracing::warn!("Heartbeat failed: {}", e);
        }
    }
}

/// The precise-wake deadline for a manifest: slightly after the predicted
/// transition to absorb clock skew, and only while that instant is still
/// ahead; past predictions are left to the coarse poll.
fn wake_instant(
    next_check: Option<DateTime<Utc>>,
    buffer_ms: u64,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let target = next_check? + chrono::Duration::milliseconds(buffer_ms as i64);
    if target > now {
        Some(target)
    } else {
        None
    }
}

/// What the player believes it is showing, in the wire format the
/// refresh-check endpoint expects (absent media compares as "").
fn known_state(manifest: Option<&Manifest>) -> (i32, String) {
    match manifest {
        Some(m) => (
            m.refresh_version,
            m.media
                .as_ref()
                .map(|media| media.id.to_string())
                .unwrap_or_default(),
        ),
        None => (0, String::new()),
    }
}

fn is_auth_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<reqwest::Error>()
        .and_then(|e| e.status())
        .map(|code| {
            code == reqwest::StatusCode::UNAUTHORIZED || code == reqwest::StatusCode::BAD_REQUEST
        })
        .unwrap_or(false)
}

fn to_instant(at: DateTime<Utc>) -> Instant {
    let delta = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    Instant::now() + delta
}
