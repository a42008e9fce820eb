pub mod media_api;
pub mod player_api;
pub mod schedules_api;
pub mod screens_api;
pub mod stores_api;

use crate::AppState;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

pub fn routes(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        // Tenancy
        .route(
            "/clients",
            get(stores_api::list_clients).post(stores_api::create_client),
        )
        .route(
            "/stores",
            get(stores_api::list_stores).post(stores_api::create_store),
        )
        .route("/stores/:id/refresh", post(screens_api::refresh_store))
        // Media
        .route(
            "/media",
            get(media_api::list_media).post(media_api::register_media),
        )
        // Screens and default content
        .route(
            "/screens",
            get(screens_api::list_screens).post(screens_api::create_screen),
        )
        .route(
            "/screens/:id/content",
            put(screens_api::set_default_content).delete(screens_api::clear_default_content),
        )
        .route("/screens/:id/refresh", post(screens_api::refresh_screen))
        // Schedules and scheduled content
        .route(
            "/schedules",
            get(schedules_api::list_schedules).post(schedules_api::create_schedule),
        )
        .route("/schedules/:id", delete(schedules_api::delete_schedule))
        .route(
            "/screens/:id/schedules/:schedule_id/content",
            put(schedules_api::bind_scheduled_content)
                .delete(schedules_api::unbind_scheduled_content),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::auth::require_admin,
        ));

    Router::new()
        // Player endpoints authenticate by pairing token, not admin token.
        .route("/manifest", get(player_api::get_manifest))
        .route("/refresh", get(player_api::refresh_check))
        .route("/ping", post(player_api::ping))
        .merge(admin_routes)
}
