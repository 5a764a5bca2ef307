//! Star schema row models.
//!
//! Dimension rows carry a surrogate key that is process-local while the rows travel
//! from the transformer to the loader, and database-assigned once they are read back.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::Serialize;

/// Surrogate key of a dimension row.
pub type SurrogateKey = i64;

/// Business key of a calendar date, `YYYYMMDD`.
pub type DateKey = i32;

/// Sentinel returned by key lookups that found no dimension row.
pub const UNRESOLVED_KEY: SurrogateKey = 0;

/// The nine optional audio measures shared by raw records and facts.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AudioFeatures {
    pub energy: Option<f64>,
    pub danceability: Option<f64>,
    pub valence: Option<f64>,
    pub loudness: Option<f64>,
    pub tempo: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub speechiness: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DimArtist {
    pub artist_key: SurrogateKey,
    pub artist_name: String,
    pub artist_popularity: Option<i32>,
    pub artist_followers: Option<i64>,
    pub artist_genres: Option<String>,
    pub created_date: NaiveDateTime,
    pub modified_date: NaiveDateTime,
    // Declared for slowly-changing-dimension tracking; full refresh never sets them.
    pub effective_from: Option<NaiveDateTime>,
    pub effective_to: Option<NaiveDateTime>,
    pub is_current: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DimAlbum {
    pub album_key: SurrogateKey,
    pub spotify_album_id: String,
    pub album_name: String,
    pub artist_key: SurrogateKey,
    pub album_type: Option<String>,
    pub album_total_tracks: Option<i32>,
    pub release_date_key: Option<DateKey>,
    pub created_date: NaiveDateTime,
    pub modified_date: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DimTrack {
    pub track_key: SurrogateKey,
    pub spotify_track_id: String,
    pub track_name: String,
    pub track_number: Option<i32>,
    pub track_duration_ms: Option<i64>,
    pub explicit: Option<bool>,
    pub created_date: NaiveDateTime,
    pub modified_date: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DimDate {
    pub date_key: DateKey,
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub quarter: u32,
    /// 1 = Sunday ... 7 = Saturday.
    pub day_of_week: u32,
    pub day_name: String,
    pub is_weekend: bool,
    pub created_date: NaiveDateTime,
}

impl DimDate {
    pub fn from_date(date: NaiveDate, created_date: NaiveDateTime) -> Self {
        let weekday = date.weekday();
        DimDate {
            date_key: date_key(date),
            date,
            year: date.year(),
            month: date.month(),
            month_name: date.format("%B").to_string(),
            quarter: (date.month() - 1) / 3 + 1,
            day_of_week: weekday.num_days_from_sunday() + 1,
            day_name: date.format("%A").to_string(),
            is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
            created_date,
        }
    }
}

/// `YYYYMMDD` business key of a calendar date.
pub fn date_key(date: NaiveDate) -> DateKey {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

#[derive(Clone, Debug, PartialEq)]
pub struct FactTrack {
    pub fact_track_key: SurrogateKey,
    pub track_key: SurrogateKey,
    pub artist_key: SurrogateKey,
    pub album_key: SurrogateKey,
    pub release_date_key: Option<DateKey>,
    pub track_popularity: Option<i32>,
    pub audio: AudioFeatures,
    pub load_date: NaiveDateTime,
}
