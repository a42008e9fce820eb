use std::fs;
use std::path::PathBuf;

use crate::api_client::Manifest;

/// Last-known-good manifest, kept on disk so a restart during a network
/// outage still has something to display.
pub struct ManifestCache {
    path: PathBuf,
}

impl ManifestCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Option<Manifest> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!(
                    "Discarding unreadable manifest cache {}: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    /// Best-effort write; a cache failure never interrupts playback.
    pub fn store(&self, manifest: &Manifest) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(
                        "Failed to create cache directory {}: {}",
                        parent.display(),
                        e
                    );
                    return;
                }
            }
        }

        match serde_json::to_string_pretty(manifest) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    tracing::warn!(
                        "Failed to write manifest cache {}: {}",
                        self.path.display(),
                        e
                    );
                }
            }
            Err(e) => tracing::warn!("Failed to serialize manifest cache: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::MediaInfo;
    use chrono::{TimeZone, Utc};

    fn manifest() -> Manifest {
        Manifest {
            screen_id: 5,
            refresh_version: 3,
            media: Some(MediaInfo {
                id: 42,
                url: "https://media.example.com/files/promo.mp4?expires=1&sig=abc".into(),
                media_type: "video/mp4".into(),
            }),
            next_check: None,
            fetched_at: Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn missing_cache_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ManifestCache::new(dir.path().join("manifest.json"));
        assert!(cache.load().is_none());
    }

    #[test]
    fn stored_manifest_survives_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ManifestCache::new(dir.path().join("nested/manifest.json"));
        cache.store(&manifest());

        let loaded = cache.load().unwrap();
        assert_eq!(loaded.refresh_version, 3);
        assert_eq!(loaded.media.unwrap().id, 42);
    }

    #[test]
    fn corrupt_cache_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(ManifestCache::new(path).load().is_none());
    }
}
