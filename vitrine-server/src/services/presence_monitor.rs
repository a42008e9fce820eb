use crate::AppState;
use chrono::Utc;
use diesel::prelude::*;
use std::time::Duration;
use tokio::time::interval;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const OFFLINE_AFTER_SECS: i64 = 90;

pub async fn run(state: AppState) {
    let mut tick = interval(SWEEP_INTERVAL);

    loop {
        tick.tick().await;

        if let Err(e) = sweep(&state).await {
            tracing::error!("Presence monitor error: {}", e);
        }
    }
}

async fn sweep(state: &AppState) -> Result<(), String> {
    use crate::schema::screens::dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| "Database connection error".to_string())?;

    let threshold = Utc::now().naive_utc() - chrono::Duration::seconds(OFFLINE_AFTER_SECS);

    // Screens report in through /ping; anything quiet past the threshold is
    // shown as offline to operators.
    let offline_count = diesel::update(
        dsl::screens
            .filter(dsl::status.eq("online"))
            .filter(dsl::last_seen_at.lt(threshold)),
    )
    .set(dsl::status.eq("offline"))
    .execute(&mut conn)
    .map_err(|e| e.to_string())?;

    if offline_count > 0 {
        tracing::warn!("Marked {} unresponsive screens as offline", offline_count);
    }

    Ok(())
}
