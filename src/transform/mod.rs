//! Transform stage: raw records to conformed dimensions and facts.
//!
//! Steps run in dependency order: artists, dates, albums (which reference both),
//! tracks, then facts. Every step returns an immutable result that later steps borrow.

mod dimensions;
mod facts;
mod normalize;

pub use dimensions::{
    build_albums, build_artists, build_dates, build_tracks, group_first_seen, AlbumDimension,
    ArtistDimension, DateDimension, TrackDimension,
};
pub use facts::{build_facts, FactSet};
pub use normalize::{normalize_genres, normalize_name, parse_release_date};

use crate::extract::RawRecord;
use crate::warehouse::{DimAlbum, DimArtist, DimDate, DimTrack, FactTrack};
use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("No records to transform")]
    EmptyInput,
}

/// Everything the loader needs, keyed with process-local surrogate keys.
#[derive(Clone, Debug, Default)]
pub struct TransformResult {
    pub artists: Vec<DimArtist>,
    pub dates: Vec<DimDate>,
    pub albums: Vec<DimAlbum>,
    pub tracks: Vec<DimTrack>,
    pub facts: Vec<FactTrack>,
    pub dropped_facts: usize,
}

/// Builds the star schema from raw records.
///
/// `run_timestamp` stamps every created/modified/load date of this run.
pub fn transform(
    records: &[RawRecord],
    run_timestamp: NaiveDateTime,
) -> Result<TransformResult, TransformError> {
    if records.is_empty() {
        return Err(TransformError::EmptyInput);
    }

    let artists = build_artists(records, run_timestamp);
    info!("Built {} artists", artists.rows.len());

    let dates = build_dates(records, run_timestamp);
    info!("Built {} dates", dates.rows.len());

    let albums = build_albums(records, &artists, &dates, run_timestamp);
    info!("Built {} albums", albums.rows.len());

    let tracks = build_tracks(records, run_timestamp);
    info!("Built {} tracks", tracks.rows.len());

    let facts = build_facts(records, &artists, &albums, &tracks, &dates, run_timestamp);
    info!(
        "Built {} facts, dropped {} unresolved records",
        facts.rows.len(),
        facts.dropped
    );

    Ok(TransformResult {
        artists: artists.rows,
        dates: dates.rows,
        albums: albums.rows,
        tracks: tracks.rows,
        facts: facts.rows,
        dropped_facts: facts.dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(
            transform(&[], stamp()),
            Err(TransformError::EmptyInput)
        ));
    }

    #[test]
    fn test_transform_wires_every_step() {
        let records = vec![
            RawRecord {
                track_id: "t1".to_string(),
                track_name: "Get Lucky".to_string(),
                artist_name: "Daft Punk".to_string(),
                artist_popularity: Some(70),
                album_id: "a1".to_string(),
                album_name: "Random Access Memories".to_string(),
                album_release_date: Some("2013-05-17".to_string()),
                ..Default::default()
            },
            RawRecord {
                track_id: "t2".to_string(),
                track_name: "Lose Yourself To Dance".to_string(),
                artist_name: " daft punk ".to_string(),
                artist_popularity: Some(85),
                album_id: "a1".to_string(),
                album_name: "Random Access Memories".to_string(),
                album_release_date: Some("2013-05-17".to_string()),
                ..Default::default()
            },
            RawRecord {
                track_id: "t3".to_string(),
                track_name: "Orphan".to_string(),
                artist_name: "Nobody".to_string(),
                album_id: "".to_string(),
                ..Default::default()
            },
        ];

        let result = transform(&records, stamp()).unwrap();
        assert_eq!(result.artists.len(), 2);
        let daft_punk = result
            .artists
            .iter()
            .find(|a| a.artist_name == "Daft Punk")
            .unwrap();
        assert_eq!(daft_punk.artist_popularity, Some(85));
        assert_eq!(result.dates.len(), 1);
        assert_eq!(result.albums.len(), 1);
        assert_eq!(result.albums[0].artist_key, daft_punk.artist_key);
        assert_eq!(result.tracks.len(), 3);
        assert_eq!(result.facts.len(), 2);
        assert_eq!(result.dropped_facts, 1);
        assert!(result
            .facts
            .iter()
            .all(|f| f.artist_key == daft_punk.artist_key && f.release_date_key == Some(20130517)));
        assert!(result.artists.iter().all(|a| a.created_date == stamp()));
    }
}
