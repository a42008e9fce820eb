use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;
use thiserror::Error;

use crate::models::{MediaAsset, Screen};
use crate::services::{estimator, resolver};
use crate::storage::{SignError, UrlSigner};

/// Composition failures, kept apart so operators can tell storage trouble
/// from scheduling trouble (a missing asset or a signing failure is not
/// "no content assigned").
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("content lookup failed: {0}")]
    Lookup(anyhow::Error),
    #[error("media asset {media_id} is referenced but missing")]
    AssetMissing { media_id: i32 },
    #[error("failed to sign media URL: {0}")]
    Signing(#[from] SignError),
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaDescriptor {
    pub id: i32,
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestPayload {
    pub screen_id: i32,
    pub refresh_version: i32,
    pub media: Option<MediaDescriptor>,
    pub next_check: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

/// Everything a player needs for one display cycle: the resolved media with
/// a freshly signed URL, the version counter, and the next predicted
/// transition.
pub fn build_manifest(
    conn: &mut SqliteConnection,
    signer: &UrlSigner,
    screen: &Screen,
    now: DateTime<Utc>,
) -> Result<ManifestPayload, ManifestError> {
    use crate::schema::media_assets;

    let resolved = resolver::resolve(conn, screen.id, now).map_err(ManifestError::Lookup)?;

    let media = match resolved.media_id() {
        Some(media_id) => {
            let asset: Option<MediaAsset> = media_assets::table
                .find(media_id)
                .select(MediaAsset::as_select())
                .first(conn)
                .optional()
                .map_err(|e| ManifestError::Lookup(e.into()))?;
            let asset = asset.ok_or(ManifestError::AssetMissing { media_id })?;
            let url = signer.signed_media_url(&asset.storage_path, now)?;
            Some(MediaDescriptor {
                id: asset.id,
                url,
                media_type: asset.mime_type,
            })
        }
        None => None,
    };

    let next_check =
        estimator::next_change_after(conn, screen.id, now).map_err(ManifestError::Lookup)?;

    Ok(ManifestPayload {
        screen_id: screen.id,
        refresh_version: screen.refresh_version,
        media,
        next_check,
        fetched_at: now,
    })
}

/// Two-tier staleness check: the version counter catches manual
/// reassignments cheaply; comparing the re-resolved media identity catches
/// schedule boundaries nobody bumped a counter for. Null media ids compare
/// as the empty string on both sides.
pub fn should_refresh(
    current_version: i32,
    known_version: i32,
    resolved_media: Option<i32>,
    known_media_id: &str,
) -> bool {
    if current_version > known_version {
        return true;
    }
    let current = resolved_media
        .map(|id| id.to_string())
        .unwrap_or_default();
    current != known_media_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;
    use crate::services::{resolver, versioning};
    use url::Url;

    const ALL_DAYS: &str = "0,1,2,3,4,5,6";

    fn signer() -> UrlSigner {
        UrlSigner::new(
            Url::parse("https://media.example.com/").unwrap(),
            "test-secret",
            3600,
        )
    }

    fn current_screen(conn: &mut SqliteConnection, screen_id: i32) -> Screen {
        use crate::schema::screens;
        screens::table
            .find(screen_id)
            .select(Screen::as_select())
            .first(conn)
            .unwrap()
    }

    #[test]
    fn screen_without_content_yields_an_empty_manifest() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");

        let manifest =
            build_manifest(&mut conn, &signer(), &fx.screen, utc(2026, 3, 4, 12, 0, 0)).unwrap();
        assert!(manifest.media.is_none());
        assert_eq!(manifest.next_check, None);
        assert_eq!(manifest.refresh_version, 0);
    }

    #[test]
    fn dangling_media_reference_is_an_error_not_empty_content() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        set_default(&mut conn, fx.screen.id, 999, true, naive(2026, 3, 1, 8, 0, 0));

        let err =
            build_manifest(&mut conn, &signer(), &fx.screen, utc(2026, 3, 4, 12, 0, 0)).unwrap_err();
        assert!(matches!(err, ManifestError::AssetMissing { media_id: 999 }));
    }

    #[test]
    fn lunch_schedule_round_trip_needs_no_version_bump() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let media_a = add_media(&mut conn, fx.client_id, "welcome");
        let media_b = add_media(&mut conn, fx.client_id, "lunch-menu");
        set_default(&mut conn, fx.screen.id, media_a, true, naive(2026, 3, 1, 8, 0, 0));

        let lunch = add_schedule(&mut conn, fx.store_id, "Lunch", (12, 0), (14, 0), ALL_DAYS, 10);
        bind(&mut conn, lunch, fx.screen.id, media_b);

        // 11:59 - default A, with the lunch boundary sixty seconds out.
        let before = utc(2026, 3, 4, 11, 59, 0);
        let manifest = build_manifest(&mut conn, &signer(), &fx.screen, before).unwrap();
        assert_eq!(manifest.media.as_ref().unwrap().id, media_a);
        assert_eq!(manifest.next_check, Some(utc(2026, 3, 4, 12, 0, 0)));
        assert_eq!(manifest.refresh_version, 0);

        // 12:00:01 - schedule B took over, no admin action required.
        let during = utc(2026, 3, 4, 12, 0, 1);
        let manifest = build_manifest(&mut conn, &signer(), &fx.screen, during).unwrap();
        assert_eq!(manifest.media.as_ref().unwrap().id, media_b);
        assert_eq!(manifest.refresh_version, 0);

        // 14:00:01 - back to the default, still version 0.
        let after = utc(2026, 3, 4, 14, 0, 1);
        let manifest = build_manifest(&mut conn, &signer(), &fx.screen, after).unwrap();
        assert_eq!(manifest.media.as_ref().unwrap().id, media_a);
        assert_eq!(manifest.refresh_version, 0);
        assert_eq!(current_screen(&mut conn, fx.screen.id).refresh_version, 0);
    }

    #[test]
    fn manifest_media_url_is_signed() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let media = add_media(&mut conn, fx.client_id, "welcome");
        set_default(&mut conn, fx.screen.id, media, true, naive(2026, 3, 1, 8, 0, 0));

        let manifest =
            build_manifest(&mut conn, &signer(), &fx.screen, utc(2026, 3, 4, 12, 0, 0)).unwrap();
        let descriptor = manifest.media.unwrap();
        assert_eq!(descriptor.media_type, "video/mp4");
        assert!(descriptor.url.contains("expires="));
        assert!(descriptor.url.contains("sig="));
    }

    #[test]
    fn refresh_decision_matches_spec_ordering() {
        // In-sync player.
        assert!(!should_refresh(3, 3, Some(7), "7"));
        // Version bump alone forces a refresh even if content matches.
        assert!(should_refresh(4, 3, Some(7), "7"));
        // Silent schedule transition: same version, different media.
        assert!(should_refresh(3, 3, Some(9), "7"));
        // Null media ids compare as empty strings.
        assert!(!should_refresh(3, 3, None, ""));
        assert!(should_refresh(3, 3, None, "7"));
    }

    #[test]
    fn refresh_decision_tracks_live_resolution() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let media_a = add_media(&mut conn, fx.client_id, "welcome");
        let media_b = add_media(&mut conn, fx.client_id, "lunch-menu");
        set_default(&mut conn, fx.screen.id, media_a, true, naive(2026, 3, 1, 8, 0, 0));
        let lunch = add_schedule(&mut conn, fx.store_id, "Lunch", (12, 0), (14, 0), ALL_DAYS, 10);
        bind(&mut conn, lunch, fx.screen.id, media_b);

        let known = media_a.to_string();

        // Nothing changed at 11:30.
        let resolved = resolver::resolve(&mut conn, fx.screen.id, utc(2026, 3, 4, 11, 30, 0)).unwrap();
        assert!(!should_refresh(0, 0, resolved.media_id(), &known));

        // The lunch boundary passed with no version bump.
        let resolved = resolver::resolve(&mut conn, fx.screen.id, utc(2026, 3, 4, 12, 30, 0)).unwrap();
        assert!(should_refresh(0, 0, resolved.media_id(), &known));

        // An explicit bump flips the check even though content is unchanged.
        versioning::bump_screen(&mut conn, fx.screen.id).unwrap();
        let resolved = resolver::resolve(&mut conn, fx.screen.id, utc(2026, 3, 4, 11, 30, 0)).unwrap();
        let version = current_screen(&mut conn, fx.screen.id).refresh_version;
        assert!(should_refresh(version, 0, resolved.media_id(), &known));
    }
}
