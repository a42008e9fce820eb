use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use chrono_tz::Tz;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::{Schedule, ScheduledScreenContent, ScreenContent};

/// What a screen should be showing, tagged by where it came from so callers
/// can tell "no content" apart from "default content" in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedContent {
    Scheduled { media_id: i32, schedule_id: i32 },
    Default { media_id: i32 },
    None,
}

impl ResolvedContent {
    pub fn media_id(&self) -> Option<i32> {
        match self {
            ResolvedContent::Scheduled { media_id, .. }
            | ResolvedContent::Default { media_id } => Some(*media_id),
            ResolvedContent::None => Option::None,
        }
    }
}

/// Resolve the single media asset a screen should display at `now`.
///
/// Pure read. Absent schedules and absent defaults are valid outcomes, not
/// errors; only infrastructure failures propagate.
pub fn resolve(
    conn: &mut SqliteConnection,
    screen_id: i32,
    now: DateTime<Utc>,
) -> Result<ResolvedContent> {
    use crate::schema::{schedules, scheduled_screen_contents, screen_contents};

    let tz = store_timezone(conn, screen_id)?;
    let local = now.with_timezone(&tz);
    let weekday = local.weekday().num_days_from_monday();
    let time_of_day = local.time();

    let bindings: Vec<(ScheduledScreenContent, Schedule)> = scheduled_screen_contents::table
        .inner_join(schedules::table)
        .filter(scheduled_screen_contents::screen_id.eq(screen_id))
        .select((
            ScheduledScreenContent::as_select(),
            Schedule::as_select(),
        ))
        .load(conn)?;

    let mut active: Vec<(ScheduledScreenContent, Schedule)> = bindings
        .into_iter()
        .filter(|(_, schedule)| {
            window_contains(
                schedule.start_time,
                schedule.end_time,
                &schedule.weekdays(),
                weekday,
                time_of_day,
            )
        })
        .collect();

    // Highest priority wins; equal priorities go to the most recently
    // created schedule, then the highest id.
    active.sort_by(|a, b| {
        b.1.priority
            .cmp(&a.1.priority)
            .then_with(|| b.1.created_at.cmp(&a.1.created_at))
            .then_with(|| b.1.id.cmp(&a.1.id))
    });

    if let Some((binding, schedule)) = active.first() {
        if active.len() > 1 && active[1].1.priority == schedule.priority {
            tracing::warn!(
                "Screen {} has overlapping schedules at priority {}; picking '{}' (id {})",
                screen_id,
                schedule.priority,
                schedule.name,
                schedule.id
            );
        }
        return Ok(ResolvedContent::Scheduled {
            media_id: binding.media_id,
            schedule_id: schedule.id,
        });
    }

    // The default swap is transactional on the write side, but a reader must
    // still cope with zero or several active rows.
    let default_binding: Option<ScreenContent> = screen_contents::table
        .filter(screen_contents::screen_id.eq(screen_id))
        .filter(screen_contents::active.eq(true))
        .order((
            screen_contents::assigned_at.desc(),
            screen_contents::id.desc(),
        ))
        .first(conn)
        .optional()?;

    Ok(match default_binding {
        Some(binding) => ResolvedContent::Default {
            media_id: binding.media_id,
        },
        Option::None => ResolvedContent::None,
    })
}

/// The store's configured timezone; unknown names degrade to UTC.
pub(crate) fn store_timezone(conn: &mut SqliteConnection, screen_id: i32) -> Result<Tz> {
    use crate::schema::{screens, stores};

    let tz_name: String = screens::table
        .inner_join(stores::table)
        .filter(screens::id.eq(screen_id))
        .select(stores::timezone)
        .first(conn)?;

    Ok(tz_name.parse().unwrap_or_else(|_| {
        tracing::warn!(
            "Unrecognized timezone '{}' for screen {}, falling back to UTC",
            tz_name,
            screen_id
        );
        Tz::UTC
    }))
}

/// `[start, end)` containment with weekdays Monday = 0.
///
/// A window with `end < start` wraps midnight and is treated as two virtual
/// windows: `[start, 24:00)` on each listed day and `[00:00, end)` on the
/// following day. `start == end` is an empty window.
fn window_contains(
    start: NaiveTime,
    end: NaiveTime,
    days: &[u32],
    weekday: u32,
    time_of_day: NaiveTime,
) -> bool {
    if start == end {
        return false;
    }
    if start < end {
        return days.contains(&weekday) && time_of_day >= start && time_of_day < end;
    }
    let previous_day = (weekday + 6) % 7;
    (days.contains(&weekday) && time_of_day >= start)
        || (days.contains(&previous_day) && time_of_day < end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn window_contains_respects_bounds_and_weekday() {
        let days = vec![0, 1, 2];
        assert!(window_contains(hms(9, 0, 0), hms(17, 0, 0), &days, 1, hms(9, 0, 0)));
        assert!(window_contains(hms(9, 0, 0), hms(17, 0, 0), &days, 1, hms(16, 59, 59)));
        // End bound is exclusive.
        assert!(!window_contains(hms(9, 0, 0), hms(17, 0, 0), &days, 1, hms(17, 0, 0)));
        // Wrong weekday.
        assert!(!window_contains(hms(9, 0, 0), hms(17, 0, 0), &days, 4, hms(12, 0, 0)));
    }

    #[test]
    fn window_wrapping_midnight_spans_two_days() {
        // 22:00-02:00 on Wednesday (2) runs into Thursday morning.
        let days = vec![2];
        assert!(window_contains(hms(22, 0, 0), hms(2, 0, 0), &days, 2, hms(23, 30, 0)));
        assert!(window_contains(hms(22, 0, 0), hms(2, 0, 0), &days, 3, hms(1, 30, 0)));
        assert!(!window_contains(hms(22, 0, 0), hms(2, 0, 0), &days, 3, hms(3, 0, 0)));
        assert!(!window_contains(hms(22, 0, 0), hms(2, 0, 0), &days, 2, hms(21, 0, 0)));
    }

    #[test]
    fn zero_length_window_is_never_active() {
        assert!(!window_contains(hms(9, 0, 0), hms(9, 0, 0), &[0, 1, 2, 3, 4, 5, 6], 2, hms(9, 0, 0)));
    }

    #[test]
    fn bare_screen_resolves_to_nothing() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");

        let resolved = resolve(&mut conn, fx.screen.id, utc(2026, 3, 4, 12, 0, 0)).unwrap();
        assert_eq!(resolved, ResolvedContent::None);
    }

    #[test]
    fn default_content_applies_at_any_time() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let media = add_media(&mut conn, fx.client_id, "welcome");
        set_default(&mut conn, fx.screen.id, media, true, naive(2026, 3, 1, 8, 0, 0));

        for now in [utc(2026, 3, 4, 0, 30, 0), utc(2026, 3, 4, 12, 0, 0), utc(2026, 3, 7, 23, 0, 0)] {
            let resolved = resolve(&mut conn, fx.screen.id, now).unwrap();
            assert_eq!(resolved, ResolvedContent::Default { media_id: media });
        }
    }

    #[test]
    fn active_schedule_overrides_default() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let default_media = add_media(&mut conn, fx.client_id, "welcome");
        let lunch_media = add_media(&mut conn, fx.client_id, "lunch-menu");
        set_default(&mut conn, fx.screen.id, default_media, true, naive(2026, 3, 1, 8, 0, 0));

        let lunch = add_schedule(&mut conn, fx.store_id, "Lunch", (12, 0), (14, 0), "0,1,2,3,4,5,6", 10);
        bind(&mut conn, lunch, fx.screen.id, lunch_media);

        let inside = resolve(&mut conn, fx.screen.id, utc(2026, 3, 4, 12, 30, 0)).unwrap();
        assert_eq!(
            inside,
            ResolvedContent::Scheduled { media_id: lunch_media, schedule_id: lunch }
        );

        let outside = resolve(&mut conn, fx.screen.id, utc(2026, 3, 4, 15, 0, 0)).unwrap();
        assert_eq!(outside, ResolvedContent::Default { media_id: default_media });
    }

    #[test]
    fn schedule_without_binding_falls_back_to_default() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let default_media = add_media(&mut conn, fx.client_id, "welcome");
        set_default(&mut conn, fx.screen.id, default_media, true, naive(2026, 3, 1, 8, 0, 0));

        // Window is live but no content is bound for this screen.
        add_schedule(&mut conn, fx.store_id, "Lunch", (12, 0), (14, 0), "0,1,2,3,4,5,6", 10);

        let resolved = resolve(&mut conn, fx.screen.id, utc(2026, 3, 4, 12, 30, 0)).unwrap();
        assert_eq!(resolved, ResolvedContent::Default { media_id: default_media });
    }

    #[test]
    fn higher_priority_schedule_wins_overlap() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let low_media = add_media(&mut conn, fx.client_id, "all-day");
        let high_media = add_media(&mut conn, fx.client_id, "flash-sale");

        let low = add_schedule(&mut conn, fx.store_id, "All day", (8, 0), (20, 0), "0,1,2,3,4,5,6", 5);
        let high = add_schedule(&mut conn, fx.store_id, "Flash sale", (12, 0), (13, 0), "0,1,2,3,4,5,6", 10);
        bind(&mut conn, low, fx.screen.id, low_media);
        bind(&mut conn, high, fx.screen.id, high_media);

        let resolved = resolve(&mut conn, fx.screen.id, utc(2026, 3, 4, 12, 30, 0)).unwrap();
        assert_eq!(
            resolved,
            ResolvedContent::Scheduled { media_id: high_media, schedule_id: high }
        );
    }

    #[test]
    fn equal_priority_tie_goes_to_newest_schedule() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let older_media = add_media(&mut conn, fx.client_id, "older");
        let newer_media = add_media(&mut conn, fx.client_id, "newer");

        let older = add_schedule(&mut conn, fx.store_id, "Older", (9, 0), (17, 0), "0,1,2,3,4,5,6", 5);
        let newer = add_schedule(&mut conn, fx.store_id, "Newer", (9, 0), (17, 0), "0,1,2,3,4,5,6", 5);
        bind(&mut conn, older, fx.screen.id, older_media);
        bind(&mut conn, newer, fx.screen.id, newer_media);

        let resolved = resolve(&mut conn, fx.screen.id, utc(2026, 3, 4, 12, 0, 0)).unwrap();
        assert_eq!(
            resolved,
            ResolvedContent::Scheduled { media_id: newer_media, schedule_id: newer }
        );
    }

    #[test]
    fn duplicate_active_defaults_pick_latest_assignment() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let stale = add_media(&mut conn, fx.client_id, "stale");
        let fresh = add_media(&mut conn, fx.client_id, "fresh");

        // A torn swap can leave two active rows behind.
        set_default(&mut conn, fx.screen.id, stale, true, naive(2026, 3, 1, 8, 0, 0));
        set_default(&mut conn, fx.screen.id, fresh, true, naive(2026, 3, 2, 8, 0, 0));

        let resolved = resolve(&mut conn, fx.screen.id, utc(2026, 3, 4, 12, 0, 0)).unwrap();
        assert_eq!(resolved, ResolvedContent::Default { media_id: fresh });
    }

    #[test]
    fn deactivated_default_is_ignored() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let media = add_media(&mut conn, fx.client_id, "retired");
        set_default(&mut conn, fx.screen.id, media, false, naive(2026, 3, 1, 8, 0, 0));

        let resolved = resolve(&mut conn, fx.screen.id, utc(2026, 3, 4, 12, 0, 0)).unwrap();
        assert_eq!(resolved, ResolvedContent::None);
    }

    #[test]
    fn schedule_times_compare_in_store_local_time() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "America/New_York");
        let media = add_media(&mut conn, fx.client_id, "lunch-menu");
        let lunch = add_schedule(&mut conn, fx.store_id, "Lunch", (12, 0), (14, 0), "0,1,2,3,4,5,6", 10);
        bind(&mut conn, lunch, fx.screen.id, media);

        // 17:30 UTC on 2026-01-14 is 12:30 in New York (EST): inside.
        let inside = resolve(&mut conn, fx.screen.id, utc(2026, 1, 14, 17, 30, 0)).unwrap();
        assert_eq!(
            inside,
            ResolvedContent::Scheduled { media_id: media, schedule_id: lunch }
        );

        // 12:30 UTC is 07:30 local: outside, despite matching the naive UTC window.
        let outside = resolve(&mut conn, fx.screen.id, utc(2026, 1, 14, 12, 30, 0)).unwrap();
        assert_eq!(outside, ResolvedContent::None);
    }

    #[test]
    fn resolve_is_idempotent_without_writes() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let media = add_media(&mut conn, fx.client_id, "welcome");
        set_default(&mut conn, fx.screen.id, media, true, naive(2026, 3, 1, 8, 0, 0));

        let now = utc(2026, 3, 4, 12, 0, 0);
        let first = resolve(&mut conn, fx.screen.id, now).unwrap();
        let second = resolve(&mut conn, fx.screen.id, now).unwrap();
        assert_eq!(first, second);
    }
}
