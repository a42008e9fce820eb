use crate::models::{NewScreen, NewScreenContent, Screen, ScreenContent};
use crate::services::versioning;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CreateScreenRequest {
    pub store_id: i32,
    pub name: String,
    pub orientation: Option<String>,
}

#[derive(Serialize)]
pub struct CreateScreenResponse {
    pub screen: Screen,
    pub pairing_token: String,
}

#[derive(Deserialize)]
pub struct AssignContentRequest {
    pub media_id: i32,
}

pub async fn list_screens(State(state): State<AppState>) -> Result<Json<Vec<Screen>>, StatusCode> {
    use crate::schema::screens::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = screens
        .select(Screen::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_screen(
    State(state): State<AppState>,
    Json(req): Json<CreateScreenRequest>,
) -> Result<Json<CreateScreenResponse>, StatusCode> {
    use crate::schema::screens;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // The pairing token is handed to the physical device once, at setup.
    let pairing_token = Uuid::new_v4().to_string();

    let new_screen = NewScreen {
        store_id: req.store_id,
        name: req.name,
        pairing_token: pairing_token.clone(),
        orientation: req.orientation.unwrap_or_else(|| "landscape".to_string()),
    };

    let screen = diesel::insert_into(screens::table)
        .values(&new_screen)
        .returning(Screen::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(CreateScreenResponse {
        screen,
        pairing_token,
    }))
}

/// Default-content swap: deactivate, insert, bump, in one transaction so
/// readers never observe a half-applied assignment.
pub async fn set_default_content(
    State(state): State<AppState>,
    Path(path_screen_id): Path<i32>,
    Json(req): Json<AssignContentRequest>,
) -> Result<Json<ScreenContent>, StatusCode> {
    use crate::schema::screen_contents::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let binding = conn
        .transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::update(
                screen_contents
                    .filter(screen_id.eq(path_screen_id))
                    .filter(active.eq(true)),
            )
            .set(active.eq(false))
            .execute(conn)?;

            let binding = diesel::insert_into(screen_contents)
                .values(&NewScreenContent {
                    screen_id: path_screen_id,
                    media_id: req.media_id,
                    active: true,
                    assigned_at: Utc::now().naive_utc(),
                })
                .returning(ScreenContent::as_select())
                .get_result(conn)?;

            versioning::bump_screen(conn, path_screen_id)?;

            Ok(binding)
        })
        .map_err(|e| match e {
            diesel::result::Error::NotFound => StatusCode::NOT_FOUND,
            _ => {
                tracing::error!(
                    "Failed to assign default content to screen {}: {}",
                    path_screen_id,
                    e
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    Ok(Json(binding))
}

pub async fn clear_default_content(
    State(state): State<AppState>,
    Path(path_screen_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::screen_contents::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::update(
            screen_contents
                .filter(screen_id.eq(path_screen_id))
                .filter(active.eq(true)),
        )
        .set(active.eq(false))
        .execute(conn)?;

        versioning::bump_screen(conn, path_screen_id)?;

        Ok(())
    })
    .map_err(|e| match e {
        diesel::result::Error::NotFound => StatusCode::NOT_FOUND,
        _ => {
            tracing::error!(
                "Failed to clear default content for screen {}: {}",
                path_screen_id,
                e
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
    })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn refresh_screen(
    State(state): State<AppState>,
    Path(path_screen_id): Path<i32>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let version = versioning::bump_screen(&mut conn, path_screen_id).map_err(|e| match e {
        diesel::result::Error::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    })?;

    Ok(Json(serde_json::json!({ "refresh_version": version })))
}

pub async fn refresh_store(
    State(state): State<AppState>,
    Path(path_store_id): Path<i32>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let touched = versioning::bump_store(&mut conn, path_store_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(serde_json::json!({ "screens_refreshed": touched })))
}
