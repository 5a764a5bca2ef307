//! Load stage: writes a [`TransformResult`] into the warehouse in one transaction.
//!
//! Dimensions go in dependency order. The database assigns the real surrogate keys,
//! which are captured per table and used to rewrite the foreign keys of the rows that
//! follow. Date keys are business keys and are written as is.

use crate::transform::TransformResult;
use crate::warehouse::{clear_warehouse, SurrogateKey, TableCounts};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("No {dimension} row was loaded for process-local key {key}")]
    UnmappedKey {
        dimension: &'static str,
        key: SurrogateKey,
    },
}

/// What to do with a foreign key whose process-local key has no loaded row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyRemapPolicy {
    /// Keep the process-local key and let the database constraints decide.
    #[default]
    PassThrough,
    /// Fail the load.
    Strict,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    /// Delete all existing warehouse rows inside the same transaction before inserting.
    pub clear_existing: bool,
    pub key_remap: KeyRemapPolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            clear_existing: true,
            key_remap: KeyRemapPolicy::PassThrough,
        }
    }
}

/// Process-local key to database key, for one dimension.
struct KeyMap {
    dimension: &'static str,
    policy: KeyRemapPolicy,
    keys: HashMap<SurrogateKey, SurrogateKey>,
}

impl KeyMap {
    fn new(dimension: &'static str, policy: KeyRemapPolicy, capacity: usize) -> Self {
        KeyMap {
            dimension,
            policy,
            keys: HashMap::with_capacity(capacity),
        }
    }

    fn capture(&mut self, local_key: SurrogateKey, db_key: SurrogateKey) {
        self.keys.insert(local_key, db_key);
    }

    fn remap(&self, local_key: SurrogateKey) -> Result<SurrogateKey, LoadError> {
        if let Some(db_key) = self.keys.get(&local_key) {
            return Ok(*db_key);
        }
        match self.policy {
            KeyRemapPolicy::PassThrough => {
                warn!(
                    "No {} row for key {}, passing it through unchanged",
                    self.dimension, local_key
                );
                Ok(local_key)
            }
            KeyRemapPolicy::Strict => Err(LoadError::UnmappedKey {
                dimension: self.dimension,
                key: local_key,
            }),
        }
    }
}

/// Loads every dimension and fact row, all or nothing.
///
/// On any error the transaction is rolled back and the error is returned unchanged.
pub fn load_warehouse(
    conn: &Connection,
    data: &TransformResult,
    options: &LoadOptions,
) -> Result<TableCounts, LoadError> {
    conn.execute("BEGIN IMMEDIATE", [])?;

    let result = (|| -> Result<TableCounts, LoadError> {
        if options.clear_existing {
            clear_warehouse(conn)?;
            debug!("Cleared existing warehouse rows");
        }
        let artist_keys = insert_artists(conn, data, options.key_remap)?;
        let dates = insert_dates(conn, data)?;
        let album_keys = insert_albums(conn, data, &artist_keys, options.key_remap)?;
        let track_keys = insert_tracks(conn, data, options.key_remap)?;
        let facts = insert_facts(conn, data, &artist_keys, &album_keys, &track_keys)?;
        Ok(TableCounts {
            artists: artist_keys.keys.len(),
            dates,
            albums: album_keys.keys.len(),
            tracks: track_keys.keys.len(),
            facts,
        })
    })();

    match result {
        Ok(counts) => {
            if let Err(e) = conn.execute("COMMIT", []) {
                warn!("Commit failed, rolling back: {}", e);
                let _ = conn.execute("ROLLBACK", []);
                return Err(e.into());
            }
            info!(
                "Loaded {} artists, {} dates, {} albums, {} tracks, {} facts",
                counts.artists, counts.dates, counts.albums, counts.tracks, counts.facts
            );
            Ok(counts)
        }
        Err(e) => {
            warn!("Load failed, rolling back: {}", e);
            let _ = conn.execute("ROLLBACK", []);
            Err(e)
        }
    }
}

fn insert_artists(
    conn: &Connection,
    data: &TransformResult,
    policy: KeyRemapPolicy,
) -> Result<KeyMap, LoadError> {
    // EffectiveFrom, EffectiveTo and IsCurrent keep their column defaults.
    let mut stmt = conn.prepare(
        "INSERT INTO DimArtist (ArtistName, ArtistPopularity, ArtistFollowers, ArtistGenres,
                                CreatedDate, ModifiedDate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut keys = KeyMap::new("artist", policy, data.artists.len());
    for artist in &data.artists {
        let db_key = stmt.insert(params![
            artist.artist_name,
            artist.artist_popularity,
            artist.artist_followers,
            artist.artist_genres,
            artist.created_date,
            artist.modified_date,
        ])?;
        keys.capture(artist.artist_key, db_key);
    }
    debug!("Inserted {} artists", data.artists.len());
    Ok(keys)
}

fn insert_dates(conn: &Connection, data: &TransformResult) -> Result<usize, LoadError> {
    let mut stmt = conn.prepare(
        "INSERT INTO DimDate (DateKey, Date, Year, Month, MonthName, Quarter, DayOfWeek,
                              DayName, IsWeekend, CreatedDate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for date in &data.dates {
        stmt.execute(params![
            date.date_key,
            date.date,
            date.year,
            date.month,
            date.month_name,
            date.quarter,
            date.day_of_week,
            date.day_name,
            date.is_weekend,
            date.created_date,
        ])?;
    }
    debug!("Inserted {} dates", data.dates.len());
    Ok(data.dates.len())
}

fn insert_albums(
    conn: &Connection,
    data: &TransformResult,
    artist_keys: &KeyMap,
    policy: KeyRemapPolicy,
) -> Result<KeyMap, LoadError> {
    let mut stmt = conn.prepare(
        "INSERT INTO DimAlbum (SpotifyAlbumId, AlbumName, ArtistKey, AlbumType,
                               AlbumTotalTracks, ReleaseDateKey, CreatedDate, ModifiedDate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let mut keys = KeyMap::new("album", policy, data.albums.len());
    for album in &data.albums {
        let db_key = stmt.insert(params![
            album.spotify_album_id,
            album.album_name,
            artist_keys.remap(album.artist_key)?,
            album.album_type,
            album.album_total_tracks,
            album.release_date_key,
            album.created_date,
            album.modified_date,
        ])?;
        keys.capture(album.album_key, db_key);
    }
    debug!("Inserted {} albums", data.albums.len());
    Ok(keys)
}

fn insert_tracks(
    conn: &Connection,
    data: &TransformResult,
    policy: KeyRemapPolicy,
) -> Result<KeyMap, LoadError> {
    let mut stmt = conn.prepare(
        "INSERT INTO DimTrack (SpotifyTrackId, TrackName, TrackNumber, TrackDurationMs,
                               Explicit, CreatedDate, ModifiedDate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    let mut keys = KeyMap::new("track", policy, data.tracks.len());
    for track in &data.tracks {
        let db_key = stmt.insert(params![
            track.spotify_track_id,
            track.track_name,
            track.track_number,
            track.track_duration_ms,
            track.explicit,
            track.created_date,
            track.modified_date,
        ])?;
        keys.capture(track.track_key, db_key);
    }
    debug!("Inserted {} tracks", data.tracks.len());
    Ok(keys)
}

fn insert_facts(
    conn: &Connection,
    data: &TransformResult,
    artist_keys: &KeyMap,
    album_keys: &KeyMap,
    track_keys: &KeyMap,
) -> Result<usize, LoadError> {
    let mut stmt = conn.prepare(
        "INSERT INTO FactTrack (TrackKey, ArtistKey, AlbumKey, ReleaseDateKey, TrackPopularity,
                                Energy, Danceability, Valence, Loudness, Tempo, Acousticness,
                                Instrumentalness, Liveness, Speechiness, LoadDate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
    )?;
    for fact in &data.facts {
        let audio = &fact.audio;
        stmt.execute(params![
            track_keys.remap(fact.track_key)?,
            artist_keys.remap(fact.artist_key)?,
            album_keys.remap(fact.album_key)?,
            fact.release_date_key,
            fact.track_popularity,
            audio.energy,
            audio.danceability,
            audio.valence,
            audio.loudness,
            audio.tempo,
            audio.acousticness,
            audio.instrumentalness,
            audio.liveness,
            audio.speechiness,
            fact.load_date,
        ])?;
    }
    debug!("Inserted {} facts", data.facts.len());
    Ok(data.facts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{
        open_warehouse_in_memory, read_albums, read_artists, read_facts, table_counts,
        DimAlbum, DimArtist, DimTrack, FactTrack,
    };
    use chrono::{NaiveDate, NaiveDateTime};

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn artist(key: SurrogateKey, name: &str) -> DimArtist {
        DimArtist {
            artist_key: key,
            artist_name: name.to_string(),
            artist_popularity: None,
            artist_followers: None,
            artist_genres: None,
            created_date: stamp(),
            modified_date: stamp(),
            effective_from: None,
            effective_to: None,
            is_current: true,
        }
    }

    fn album(key: SurrogateKey, id: &str, artist_key: SurrogateKey) -> DimAlbum {
        DimAlbum {
            album_key: key,
            spotify_album_id: id.to_string(),
            album_name: format!("Album {}", id),
            artist_key,
            album_type: None,
            album_total_tracks: None,
            release_date_key: None,
            created_date: stamp(),
            modified_date: stamp(),
        }
    }

    fn track(key: SurrogateKey, id: &str) -> DimTrack {
        DimTrack {
            track_key: key,
            spotify_track_id: id.to_string(),
            track_name: format!("Track {}", id),
            track_number: None,
            track_duration_ms: None,
            explicit: None,
            created_date: stamp(),
            modified_date: stamp(),
        }
    }

    fn fact(
        key: SurrogateKey,
        track_key: SurrogateKey,
        artist_key: SurrogateKey,
        album_key: SurrogateKey,
    ) -> FactTrack {
        FactTrack {
            fact_track_key: key,
            track_key,
            artist_key,
            album_key,
            release_date_key: None,
            track_popularity: Some(50),
            audio: Default::default(),
            load_date: stamp(),
        }
    }

    /// Process-local keys deliberately out of step with the row order, so the database
    /// assigns different keys than the transformer did.
    fn scrambled_result() -> TransformResult {
        TransformResult {
            artists: vec![artist(2, "Abba"), artist(1, "Zedd")],
            dates: vec![],
            albums: vec![album(7, "b", 1), album(3, "a", 2)],
            tracks: vec![track(9, "x")],
            facts: vec![fact(1, 9, 1, 7), fact(2, 9, 2, 3)],
            dropped_facts: 0,
        }
    }

    #[test]
    fn test_foreign_keys_are_remapped_to_database_keys() {
        let conn = open_warehouse_in_memory().unwrap();
        let counts = load_warehouse(&conn, &scrambled_result(), &LoadOptions::default()).unwrap();
        assert_eq!(
            counts,
            TableCounts {
                artists: 2,
                dates: 0,
                albums: 2,
                tracks: 1,
                facts: 2
            }
        );

        let artists = read_artists(&conn).unwrap();
        let key_of = |name: &str| {
            artists
                .iter()
                .find(|a| a.artist_name == name)
                .unwrap()
                .artist_key
        };
        let albums = read_albums(&conn).unwrap();
        let album_b = albums.iter().find(|a| a.spotify_album_id == "b").unwrap();
        assert_eq!(album_b.artist_key, key_of("Zedd"));

        let facts = read_facts(&conn).unwrap();
        assert_eq!(facts[0].artist_key, key_of("Zedd"));
        assert_eq!(facts[0].album_key, album_b.album_key);
        assert_eq!(facts[1].artist_key, key_of("Abba"));
    }

    #[test]
    fn test_strict_policy_rejects_unmapped_key() {
        let conn = open_warehouse_in_memory().unwrap();
        let mut data = scrambled_result();
        data.facts.push(fact(3, 42, 1, 7));
        let options = LoadOptions {
            clear_existing: true,
            key_remap: KeyRemapPolicy::Strict,
        };

        match load_warehouse(&conn, &data, &options) {
            Err(LoadError::UnmappedKey { dimension, key }) => {
                assert_eq!(dimension, "track");
                assert_eq!(key, 42);
            }
            other => panic!("expected unmapped key error, got {:?}", other),
        }
        assert_eq!(table_counts(&conn).unwrap(), TableCounts::default());
    }

    #[test]
    fn test_pass_through_lets_constraints_decide() {
        let conn = open_warehouse_in_memory().unwrap();
        let mut data = scrambled_result();
        data.facts.push(fact(3, 42, 1, 7));

        let result = load_warehouse(&conn, &data, &LoadOptions::default());
        assert!(matches!(result, Err(LoadError::Database(_))));
        assert_eq!(table_counts(&conn).unwrap(), TableCounts::default());
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        let conn = open_warehouse_in_memory().unwrap();
        // A deferred constraint is only checked at COMMIT.
        conn.execute_batch(
            "CREATE TABLE ArtistAudit (Id INTEGER PRIMARY KEY);
             CREATE TABLE ArtistAuditLog (
                 AuditId INTEGER REFERENCES ArtistAudit(Id) DEFERRABLE INITIALLY DEFERRED
             );
             CREATE TRIGGER audit_artist AFTER INSERT ON DimArtist
             BEGIN INSERT INTO ArtistAuditLog VALUES (NEW.ArtistKey); END;",
        )
        .unwrap();

        let result = load_warehouse(&conn, &scrambled_result(), &LoadOptions::default());
        assert!(matches!(result, Err(LoadError::Database(_))));
        assert!(conn.is_autocommit());
        assert_eq!(table_counts(&conn).unwrap(), TableCounts::default());

        conn.execute_batch("DROP TRIGGER audit_artist").unwrap();
        let counts = load_warehouse(&conn, &scrambled_result(), &LoadOptions::default()).unwrap();
        assert_eq!(counts.facts, 2);
    }

    #[test]
    fn test_full_refresh_replaces_previous_load() {
        let conn = open_warehouse_in_memory().unwrap();
        load_warehouse(&conn, &scrambled_result(), &LoadOptions::default()).unwrap();
        load_warehouse(&conn, &scrambled_result(), &LoadOptions::default()).unwrap();
        assert_eq!(table_counts(&conn).unwrap().artists, 2);
        assert_eq!(table_counts(&conn).unwrap().facts, 2);
    }

    #[test]
    fn test_load_without_clearing_fails_on_duplicates() {
        let conn = open_warehouse_in_memory().unwrap();
        load_warehouse(&conn, &scrambled_result(), &LoadOptions::default()).unwrap();

        let append = LoadOptions {
            clear_existing: false,
            ..Default::default()
        };
        let result = load_warehouse(&conn, &scrambled_result(), &append);
        assert!(matches!(result, Err(LoadError::Database(_))));
        // The first load is still intact.
        assert_eq!(table_counts(&conn).unwrap().facts, 2);
    }
}
