use crate::db::DbConnection;
use crate::models::Screen;
use crate::services::manifest::{self, ManifestError, ManifestPayload};
use crate::services::resolver;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct ManifestQuery {
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct RefreshQuery {
    pub token: Option<String>,
    #[serde(rename = "knownVersion")]
    pub known_version: Option<i32>,
    #[serde(rename = "knownMediaId")]
    pub known_media_id: Option<String>,
}

#[derive(Serialize)]
pub struct RefreshCheckResponse {
    pub should_refresh: bool,
    pub current_version: i32,
}

#[derive(Deserialize)]
pub struct PingRequest {
    pub token: String,
    pub viewport: Option<String>,
    pub display_type: Option<String>,
}

// A missing token is a malformed request; an unknown one is an auth
// failure. Both are distinct from "no content assigned", which is a
// successful manifest with media = null.
fn screen_by_token(conn: &mut DbConnection, token: &str) -> Result<Screen, StatusCode> {
    use crate::schema::screens::dsl::*;

    screens
        .filter(pairing_token.eq(token))
        .select(Screen::as_select())
        .first(conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)
}

pub async fn get_manifest(
    State(state): State<AppState>,
    Query(query): Query<ManifestQuery>,
) -> Result<Json<ManifestPayload>, StatusCode> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or(StatusCode::BAD_REQUEST)?;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let screen = screen_by_token(&mut conn, &token)?;

    let payload = manifest::build_manifest(&mut conn, &state.signer, &screen, Utc::now())
        .map_err(|e| match e {
            ManifestError::Signing(_) => {
                tracing::error!("Signed URL minting failed for screen {}: {}", screen.id, e);
                StatusCode::BAD_GATEWAY
            }
            _ => {
                tracing::error!("Manifest build failed for screen {}: {}", screen.id, e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    Ok(Json(payload))
}

pub async fn refresh_check(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<RefreshCheckResponse>, StatusCode> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or(StatusCode::BAD_REQUEST)?;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let screen = screen_by_token(&mut conn, &token)?;

    let resolved = resolver::resolve(&mut conn, screen.id, Utc::now()).map_err(|e| {
        tracing::error!("Resolution failed for screen {}: {}", screen.id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let known_media = query.known_media_id.unwrap_or_default();
    let should_refresh = manifest::should_refresh(
        screen.refresh_version,
        query.known_version.unwrap_or(0),
        resolved.media_id(),
        &known_media,
    );

    Ok(Json(RefreshCheckResponse {
        should_refresh,
        current_version: screen.refresh_version,
    }))
}

pub async fn ping(
    State(state): State<AppState>,
    Json(req): Json<PingRequest>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::screens::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let updated = diesel::update(screens.filter(pairing_token.eq(&req.token)))
        .set((
            last_seen_at.eq(Some(Utc::now().naive_utc())),
            status.eq("online"),
            viewport.eq(req.viewport),
            display_type.eq(req.display_type),
        ))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if updated == 0 {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(StatusCode::NO_CONTENT)
}
