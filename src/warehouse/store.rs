//! Opening the warehouse database and reading its tables back.

use super::models::*;
use super::schema::{
    DIM_ALBUM_TABLE, DIM_ARTIST_TABLE, DIM_DATE_TABLE, DIM_TRACK_TABLE, FACT_TRACK_TABLE,
    WAREHOUSE_TABLES_IN_LOAD_ORDER, WAREHOUSE_VERSIONED_SCHEMAS,
};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OpenFlags, Row};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Row count of every warehouse table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub artists: usize,
    pub dates: usize,
    pub albums: usize,
    pub tracks: usize,
    pub facts: usize,
}

impl TableCounts {
    pub fn total(&self) -> usize {
        self.artists + self.dates + self.albums + self.tracks + self.facts
    }
}

fn migrate_if_needed(conn: &Connection) -> Result<()> {
    let latest_version = WAREHOUSE_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &WAREHOUSE_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        info!("Creating warehouse schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if db_version < BASE_DB_VERSION as i64 {
        bail!(
            "Database has {} tables but was not created by this tool (user_version {})",
            table_count,
            db_version
        );
    }
    latest_schema
        .validate(conn)
        .context("Existing warehouse schema does not match")?;
    Ok(())
}

/// Opens (creating if needed) the warehouse database at `db_path`.
pub fn open_warehouse<P: AsRef<Path>>(db_path: P) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        db_path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open warehouse database {:?}", db_path.as_ref()))?;
    prepare_connection(conn)
}

/// Opens the warehouse database for the reporting layer, without creating it.
pub fn open_warehouse_read_only<P: AsRef<Path>>(db_path: P) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        db_path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open warehouse database {:?}", db_path.as_ref()))?;
    WAREHOUSE_VERSIONED_SCHEMAS[WAREHOUSE_VERSIONED_SCHEMAS.len() - 1]
        .validate(&conn)
        .context("Warehouse schema does not match, run the ETL first")?;
    Ok(conn)
}

pub fn open_warehouse_in_memory() -> Result<Connection> {
    prepare_connection(Connection::open_in_memory()?)
}

fn prepare_connection(conn: Connection) -> Result<Connection> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    migrate_if_needed(&conn)?;
    Ok(conn)
}

/// Deletes every warehouse row, dependents first.
pub fn clear_warehouse(conn: &Connection) -> rusqlite::Result<()> {
    for table in WAREHOUSE_TABLES_IN_LOAD_ORDER.iter().rev() {
        table.clear(conn)?;
    }
    Ok(())
}

pub fn table_counts(conn: &Connection) -> rusqlite::Result<TableCounts> {
    Ok(TableCounts {
        artists: DIM_ARTIST_TABLE.count(conn)?,
        dates: DIM_DATE_TABLE.count(conn)?,
        albums: DIM_ALBUM_TABLE.count(conn)?,
        tracks: DIM_TRACK_TABLE.count(conn)?,
        facts: FACT_TRACK_TABLE.count(conn)?,
    })
}

fn parse_artist_row(row: &Row) -> rusqlite::Result<DimArtist> {
    Ok(DimArtist {
        artist_key: row.get(0)?,
        artist_name: row.get(1)?,
        artist_popularity: row.get(2)?,
        artist_followers: row.get(3)?,
        artist_genres: row.get(4)?,
        created_date: row.get(5)?,
        modified_date: row.get(6)?,
        effective_from: row.get(7)?,
        effective_to: row.get(8)?,
        is_current: row.get(9)?,
    })
}

fn parse_date_row(row: &Row) -> rusqlite::Result<DimDate> {
    Ok(DimDate {
        date_key: row.get(0)?,
        date: row.get(1)?,
        year: row.get(2)?,
        month: row.get(3)?,
        month_name: row.get(4)?,
        quarter: row.get(5)?,
        day_of_week: row.get(6)?,
        day_name: row.get(7)?,
        is_weekend: row.get(8)?,
        created_date: row.get(9)?,
    })
}

fn parse_album_row(row: &Row) -> rusqlite::Result<DimAlbum> {
    Ok(DimAlbum {
        album_key: row.get(0)?,
        spotify_album_id: row.get(1)?,
        album_name: row.get(2)?,
        artist_key: row.get(3)?,
        album_type: row.get(4)?,
        album_total_tracks: row.get(5)?,
        release_date_key: row.get(6)?,
        created_date: row.get(7)?,
        modified_date: row.get(8)?,
    })
}

fn parse_track_row(row: &Row) -> rusqlite::Result<DimTrack> {
    Ok(DimTrack {
        track_key: row.get(0)?,
        spotify_track_id: row.get(1)?,
        track_name: row.get(2)?,
        track_number: row.get(3)?,
        track_duration_ms: row.get(4)?,
        explicit: row.get(5)?,
        created_date: row.get(6)?,
        modified_date: row.get(7)?,
    })
}

fn parse_fact_row(row: &Row) -> rusqlite::Result<FactTrack> {
    Ok(FactTrack {
        fact_track_key: row.get(0)?,
        track_key: row.get(1)?,
        artist_key: row.get(2)?,
        album_key: row.get(3)?,
        release_date_key: row.get(4)?,
        track_popularity: row.get(5)?,
        audio: AudioFeatures {
            energy: row.get(6)?,
            danceability: row.get(7)?,
            valence: row.get(8)?,
            loudness: row.get(9)?,
            tempo: row.get(10)?,
            acousticness: row.get(11)?,
            instrumentalness: row.get(12)?,
            liveness: row.get(13)?,
            speechiness: row.get(14)?,
        },
        load_date: row.get(15)?,
    })
}

fn read_all<T>(
    conn: &Connection,
    sql: &str,
    parse: fn(&Row) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], parse)?.collect();
    rows
}

pub fn read_artists(conn: &Connection) -> rusqlite::Result<Vec<DimArtist>> {
    read_all(
        conn,
        "SELECT ArtistKey, ArtistName, ArtistPopularity, ArtistFollowers, ArtistGenres,
                CreatedDate, ModifiedDate, EffectiveFrom, EffectiveTo, IsCurrent
         FROM DimArtist ORDER BY ArtistKey",
        parse_artist_row,
    )
}

pub fn read_dates(conn: &Connection) -> rusqlite::Result<Vec<DimDate>> {
    read_all(
        conn,
        "SELECT DateKey, Date, Year, Month, MonthName, Quarter, DayOfWeek, DayName,
                IsWeekend, CreatedDate
         FROM DimDate ORDER BY DateKey",
        parse_date_row,
    )
}

pub fn read_albums(conn: &Connection) -> rusqlite::Result<Vec<DimAlbum>> {
    read_all(
        conn,
        "SELECT AlbumKey, SpotifyAlbumId, AlbumName, ArtistKey, AlbumType, AlbumTotalTracks,
                ReleaseDateKey, CreatedDate, ModifiedDate
         FROM DimAlbum ORDER BY AlbumKey",
        parse_album_row,
    )
}

pub fn read_tracks(conn: &Connection) -> rusqlite::Result<Vec<DimTrack>> {
    read_all(
        conn,
        "SELECT TrackKey, SpotifyTrackId, TrackName, TrackNumber, TrackDurationMs, Explicit,
                CreatedDate, ModifiedDate
         FROM DimTrack ORDER BY TrackKey",
        parse_track_row,
    )
}

pub fn read_facts(conn: &Connection) -> rusqlite::Result<Vec<FactTrack>> {
    read_all(
        conn,
        "SELECT FactTrackKey, TrackKey, ArtistKey, AlbumKey, ReleaseDateKey, TrackPopularity,
                Energy, Danceability, Valence, Loudness, Tempo, Acousticness,
                Instrumentalness, Liveness, Speechiness, LoadDate
         FROM FactTrack ORDER BY FactTrackKey",
        parse_fact_row,
    )
}
