use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::Schedule;
use crate::services::resolver;

/// Earliest future instant at which the resolver's output *could* change.
///
/// Walks the start/end boundaries of every schedule bound to the screen that
/// touches the current store-local day. Deliberately conservative: a boundary
/// of a losing schedule still counts, so players must re-verify after waking.
/// `None` means no known upcoming transition; players then rely on coarse
/// polling and explicit version bumps alone.
pub fn next_change_after(
    conn: &mut SqliteConnection,
    screen_id: i32,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    use crate::schema::{schedules, scheduled_screen_contents};

    let tz = resolver::store_timezone(conn, screen_id)?;
    let local = now.with_timezone(&tz);
    let weekday = local.weekday().num_days_from_monday();
    let previous_day = (weekday + 6) % 7;
    let now_secs = local.time().num_seconds_from_midnight() as i64;

    let bound: Vec<Schedule> = scheduled_screen_contents::table
        .inner_join(schedules::table)
        .filter(scheduled_screen_contents::screen_id.eq(screen_id))
        .select(Schedule::as_select())
        .load(conn)?;

    let mut soonest: Option<i64> = None;
    let mut consider = |delta: i64| {
        if delta > 0 && soonest.map_or(true, |best| delta < best) {
            soonest = Some(delta);
        }
    };

    for schedule in &bound {
        let days = schedule.weekdays();
        let start_secs = schedule.start_time.num_seconds_from_midnight() as i64;
        let end_secs = schedule.end_time.num_seconds_from_midnight() as i64;
        let wraps = end_secs <= start_secs;

        if days.contains(&weekday) {
            consider(start_secs - now_secs);
            if !wraps {
                consider(end_secs - now_secs);
            }
        }
        // The morning tail of a wrapped window ends today when the window
        // started yesterday.
        if wraps && days.contains(&previous_day) {
            consider(end_secs - now_secs);
        }
    }

    Ok(soonest.map(|secs| now + Duration::seconds(secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;

    const ALL_DAYS: &str = "0,1,2,3,4,5,6";

    #[test]
    fn no_bound_schedules_means_no_known_transition() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");

        let next = next_change_after(&mut conn, fx.screen.id, utc(2026, 3, 4, 12, 0, 0)).unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn upcoming_start_beats_upcoming_end() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let media = add_media(&mut conn, fx.client_id, "promo");
        // Starts in 120s, ends in 400s.
        let schedule = add_schedule(&mut conn, fx.store_id, "Promo", (12, 0), (12, 4), ALL_DAYS, 0);
        {
            use crate::schema::schedules::dsl::*;
            diesel::update(schedules.filter(id.eq(schedule)))
                .set(end_time.eq(chrono::NaiveTime::from_hms_opt(12, 4, 40).unwrap()))
                .execute(&mut conn)
                .unwrap();
        }
        bind(&mut conn, schedule, fx.screen.id, media);

        let now = utc(2026, 3, 4, 11, 58, 0);
        let next = next_change_after(&mut conn, fx.screen.id, now).unwrap();
        assert_eq!(next, Some(now + Duration::seconds(120)));
    }

    #[test]
    fn inside_a_window_the_end_is_next() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let media = add_media(&mut conn, fx.client_id, "lunch");
        let lunch = add_schedule(&mut conn, fx.store_id, "Lunch", (12, 0), (14, 0), ALL_DAYS, 10);
        bind(&mut conn, lunch, fx.screen.id, media);

        let now = utc(2026, 3, 4, 13, 0, 0);
        let next = next_change_after(&mut conn, fx.screen.id, now).unwrap();
        assert_eq!(next, Some(utc(2026, 3, 4, 14, 0, 0)));
    }

    #[test]
    fn boundaries_already_past_today_yield_nothing() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let media = add_media(&mut conn, fx.client_id, "morning");
        let morning = add_schedule(&mut conn, fx.store_id, "Morning", (8, 0), (10, 0), ALL_DAYS, 0);
        bind(&mut conn, morning, fx.screen.id, media);

        let next = next_change_after(&mut conn, fx.screen.id, utc(2026, 3, 4, 20, 0, 0)).unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn wrapped_window_from_yesterday_ends_today() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let media = add_media(&mut conn, fx.client_id, "late-night");
        // Wednesday 22:00 through Thursday 02:00.
        let night = add_schedule(&mut conn, fx.store_id, "Night", (22, 0), (2, 0), "2", 0);
        bind(&mut conn, night, fx.screen.id, media);

        // 2026-03-05 is a Thursday; at 01:00 the only upcoming boundary is 02:00.
        let now = utc(2026, 3, 5, 1, 0, 0);
        let next = next_change_after(&mut conn, fx.screen.id, now).unwrap();
        assert_eq!(next, Some(utc(2026, 3, 5, 2, 0, 0)));

        // Past the tail, Thursday holds no further boundaries for this schedule.
        let later = next_change_after(&mut conn, fx.screen.id, utc(2026, 3, 5, 3, 0, 0)).unwrap();
        assert_eq!(later, None);
    }

    #[test]
    fn weekday_filter_uses_store_local_day() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "America/New_York");
        let media = add_media(&mut conn, fx.client_id, "lunch");
        let lunch = add_schedule(&mut conn, fx.store_id, "Lunch", (12, 0), (14, 0), ALL_DAYS, 0);
        bind(&mut conn, lunch, fx.screen.id, media);

        // 16:30 UTC on 2026-01-14 is 11:30 local; lunch starts in 30 minutes.
        let now = utc(2026, 1, 14, 16, 30, 0);
        let next = next_change_after(&mut conn, fx.screen.id, now).unwrap();
        assert_eq!(next, Some(now + Duration::seconds(1800)));
    }
}
