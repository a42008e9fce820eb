use chrono::{NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// Client (tenant) models
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::clients)]
pub struct Client {
    pub id: i32,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::clients)]
pub struct NewClient {
    pub name: String,
}

// Store models
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::stores)]
pub struct Store {
    pub id: i32,
    pub client_id: i32,
    pub name: String,
    pub timezone: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::stores)]
pub struct NewStore {
    pub client_id: i32,
    pub name: String,
    pub timezone: String,
}

// Screen models
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::screens)]
pub struct Screen {
    pub id: i32,
    pub store_id: i32,
    pub name: String,
    #[serde(skip_serializing)]
    pub pairing_token: String,
    pub orientation: String,
    pub refresh_version: i32,
    pub status: String,
    pub last_seen_at: Option<NaiveDateTime>,
    pub viewport: Option<String>,
    pub display_type: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::screens)]
pub struct NewScreen {
    pub store_id: i32,
    pub name: String,
    pub pairing_token: String,
    pub orientation: String,
}

// Media asset models
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::media_assets)]
pub struct MediaAsset {
    pub id: i32,
    pub client_id: i32,
    pub store_id: Option<i32>,
    pub title: String,
    pub storage_path: String,
    pub mime_type: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::media_assets)]
pub struct NewMediaAsset {
    pub client_id: i32,
    pub store_id: Option<i32>,
    pub title: String,
    pub storage_path: String,
    pub mime_type: String,
}

// Default content binding models
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::screen_contents)]
pub struct ScreenContent {
    pub id: i32,
    pub screen_id: i32,
    pub media_id: i32,
    pub active: bool,
    pub assigned_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::screen_contents)]
pub struct NewScreenContent {
    pub screen_id: i32,
    pub media_id: i32,
    pub active: bool,
    pub assigned_at: NaiveDateTime,
}

// Schedule models
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::schedules)]
pub struct Schedule {
    pub id: i32,
    pub store_id: i32,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub days_of_week: String,
    pub priority: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::schedules)]
pub struct NewSchedule {
    pub store_id: i32,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub days_of_week: String,
    pub priority: i32,
}

// Scheduled content binding models
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::scheduled_screen_contents)]
pub struct ScheduledScreenContent {
    pub id: i32,
    pub schedule_id: i32,
    pub screen_id: i32,
    pub media_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::scheduled_screen_contents)]
pub struct NewScheduledScreenContent {
    pub schedule_id: i32,
    pub screen_id: i32,
    pub media_id: i32,
}

impl Schedule {
    /// Weekdays this schedule applies to, Monday = 0 through Sunday = 6.
    /// Unparseable or out-of-range entries are dropped.
    pub fn weekdays(&self) -> Vec<u32> {
        parse_weekdays(&self.days_of_week)
    }
}

pub fn parse_weekdays(raw: &str) -> Vec<u32> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .filter(|day| *day < 7)
        .collect()
}

pub fn encode_weekdays(days: &[u32]) -> String {
    let mut days: Vec<u32> = days.iter().copied().filter(|day| *day < 7).collect();
    days.sort_unstable();
    days.dedup();
    days.iter()
        .map(|day| day.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_sets_round_trip_through_text() {
        assert_eq!(parse_weekdays("0,2,4"), vec![0, 2, 4]);
        assert_eq!(encode_weekdays(&[4, 0, 2, 4]), "0,2,4");
    }

    #[test]
    fn weekday_parsing_drops_garbage() {
        assert_eq!(parse_weekdays("1, 7, x, 3"), vec![1, 3]);
        assert_eq!(parse_weekdays(""), Vec::<u32>::new());
    }
}
