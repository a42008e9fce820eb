use crate::models::{MediaAsset, NewMediaAsset};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use diesel::prelude::*;

pub async fn list_media(
    State(state): State<AppState>,
) -> Result<Json<Vec<MediaAsset>>, StatusCode> {
    use crate::schema::media_assets::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = media_assets
        .select(MediaAsset::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

/// Registers an already-uploaded file. The upload itself goes straight to
/// the storage host; this side only records the reference and mime type.
pub async fn register_media(
    State(state): State<AppState>,
    Json(new_asset): Json<NewMediaAsset>,
) -> Result<Json<MediaAsset>, StatusCode> {
    use crate::schema::media_assets;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let asset = diesel::insert_into(media_assets::table)
        .values(&new_asset)
        .returning(MediaAsset::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(asset))
}
