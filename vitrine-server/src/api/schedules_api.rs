use crate::models::{
    encode_weekdays, NewSchedule, NewScheduledScreenContent, Schedule, ScheduledScreenContent,
};
use crate::services::versioning;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveTime;
use diesel::prelude::*;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    pub store_id: i32,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Weekdays the window applies to, Monday = 0 through Sunday = 6.
    pub days_of_week: Vec<u32>,
    pub priority: i32,
}

#[derive(Deserialize)]
pub struct AssignContentRequest {
    pub media_id: i32,
}

pub async fn list_schedules(
    State(state): State<AppState>,
) -> Result<Json<Vec<Schedule>>, StatusCode> {
    use crate::schema::schedules::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = schedules
        .select(Schedule::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<Json<Schedule>, StatusCode> {
    use crate::schema::schedules;

    if req.days_of_week.iter().any(|day| *day > 6) {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_schedule = NewSchedule {
        store_id: req.store_id,
        name: req.name,
        start_time: req.start_time,
        end_time: req.end_time,
        days_of_week: encode_weekdays(&req.days_of_week),
        priority: req.priority,
    };

    let schedule = diesel::insert_into(schedules::table)
        .values(&new_schedule)
        .returning(Schedule::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(schedule))
}

/// Dropping a schedule silently changes what its screens resolve to, so
/// every bound screen gets a version bump in the same transaction.
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(path_schedule_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::{scheduled_screen_contents, schedules};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let bound_screens: Vec<i32> = scheduled_screen_contents::table
            .filter(scheduled_screen_contents::schedule_id.eq(path_schedule_id))
            .select(scheduled_screen_contents::screen_id)
            .load(conn)?;

        diesel::delete(
            scheduled_screen_contents::table
                .filter(scheduled_screen_contents::schedule_id.eq(path_schedule_id)),
        )
        .execute(conn)?;

        diesel::delete(schedules::table.filter(schedules::id.eq(path_schedule_id)))
            .execute(conn)?;

        for bound_screen_id in bound_screens {
            versioning::bump_screen(conn, bound_screen_id)?;
        }

        Ok(())
    })
    .map_err(|e| {
        tracing::error!("Failed to delete schedule {}: {}", path_schedule_id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn bind_scheduled_content(
    State(state): State<AppState>,
    Path((path_screen_id, path_schedule_id)): Path<(i32, i32)>,
    Json(req): Json<AssignContentRequest>,
) -> Result<Json<ScheduledScreenContent>, StatusCode> {
    use crate::schema::scheduled_screen_contents;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let binding = conn
        .transaction::<_, diesel::result::Error, _>(|conn| {
            // At most one binding per (schedule, screen); replace in place.
            diesel::delete(
                scheduled_screen_contents::table
                    .filter(scheduled_screen_contents::schedule_id.eq(path_schedule_id))
                    .filter(scheduled_screen_contents::screen_id.eq(path_screen_id)),
            )
            .execute(conn)?;

            let binding = diesel::insert_into(scheduled_screen_contents::table)
                .values(&NewScheduledScreenContent {
                    schedule_id: path_schedule_id,
                    screen_id: path_screen_id,
                    media_id: req.media_id,
                })
                .returning(ScheduledScreenContent::as_select())
                .get_result(conn)?;

            versioning::bump_screen(conn, path_screen_id)?;

            Ok(binding)
        })
        .map_err(|e| match e {
            diesel::result::Error::NotFound => StatusCode::NOT_FOUND,
            _ => {
                tracing::error!(
                    "Failed to bind schedule {} content for screen {}: {}",
                    path_schedule_id,
                    path_screen_id,
                    e
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    Ok(Json(binding))
}

pub async fn unbind_scheduled_content(
    State(state): State<AppState>,
    Path((path_screen_id, path_schedule_id)): Path<(i32, i32)>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::scheduled_screen_contents;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let removed = diesel::delete(
            scheduled_screen_contents::table
                .filter(scheduled_screen_contents::schedule_id.eq(path_schedule_id))
                .filter(scheduled_screen_contents::screen_id.eq(path_screen_id)),
        )
        .execute(conn)?;

        if removed > 0 {
            versioning::bump_screen(conn, path_screen_id)?;
        }

        Ok(())
    })
    .map_err(|e| {
        tracing::error!(
            "Failed to unbind schedule {} content for screen {}: {}",
            path_schedule_id,
            path_screen_id,
            e
        );
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(StatusCode::NO_CONTENT)
}
