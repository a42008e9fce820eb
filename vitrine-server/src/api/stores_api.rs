use crate::models::{Client, NewClient, NewStore, Store};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use diesel::prelude::*;
use serde::Deserialize;

pub async fn list_clients(State(state): State<AppState>) -> Result<Json<Vec<Client>>, StatusCode> {
    use crate::schema::clients::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = clients
        .select(Client::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(new_client): Json<NewClient>,
) -> Result<Json<Client>, StatusCode> {
    use crate::schema::clients;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let client = diesel::insert_into(clients::table)
        .values(&new_client)
        .returning(Client::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(client))
}

#[derive(Deserialize)]
pub struct CreateStoreRequest {
    pub client_id: i32,
    pub name: String,
    /// IANA timezone name; schedule windows are evaluated in this zone.
    pub timezone: Option<String>,
}

pub async fn list_stores(State(state): State<AppState>) -> Result<Json<Vec<Store>>, StatusCode> {
    use crate::schema::stores::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = stores
        .select(Store::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_store(
    State(state): State<AppState>,
    Json(req): Json<CreateStoreRequest>,
) -> Result<Json<Store>, StatusCode> {
    use crate::schema::stores;

    let timezone = req.timezone.unwrap_or_else(|| "UTC".to_string());
    if timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_store = NewStore {
        client_id: req.client_id,
        name: req.name,
        timezone,
    };

    let store = diesel::insert_into(stores::table)
        .values(&new_store)
        .returning(Store::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(store))
}
