use crate::warehouse::AudioFeatures;

/// One source row, after dialect differences have been coerced away.
///
/// Identifier and name fields are kept as read (an absent column yields an empty
/// string); trimming and normalization happen in the transform stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRecord {
    pub track_id: String,
    pub track_name: String,
    pub track_number: Option<i32>,
    pub track_popularity: Option<i32>,
    pub track_duration_ms: Option<i64>,
    pub explicit: Option<bool>,

    pub artist_name: String,
    pub artist_popularity: Option<i32>,
    pub artist_followers: Option<i64>,
    pub artist_genres: Option<String>,

    pub album_id: String,
    pub album_name: String,
    pub album_release_date: Option<String>,
    pub album_total_tracks: Option<i32>,
    pub album_type: Option<String>,

    pub audio: AudioFeatures,
}
