//! SQLite schema of the star-schema warehouse.
//!
//! Four conformed dimensions and one fact table. `DimDate` uses its `YYYYMMDD`
//! business key as primary key; every other dimension uses an integer rowid.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "DimArtist",
    foreign_column: "ArtistKey",
    on_delete: ForeignKeyOnChange::NoAction,
};

const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "DimAlbum",
    foreign_column: "AlbumKey",
    on_delete: ForeignKeyOnChange::NoAction,
};

const TRACK_FK: ForeignKey = ForeignKey {
    foreign_table: "DimTrack",
    foreign_column: "TrackKey",
    on_delete: ForeignKeyOnChange::NoAction,
};

const DATE_FK: ForeignKey = ForeignKey {
    foreign_table: "DimDate",
    foreign_column: "DateKey",
    on_delete: ForeignKeyOnChange::NoAction,
};

pub const DIM_ARTIST_TABLE: Table = Table {
    name: "DimArtist",
    columns: &[
        sqlite_column!("ArtistKey", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("ArtistName", &SqlType::Text, non_null = true),
        sqlite_column!("ArtistPopularity", &SqlType::Integer),
        sqlite_column!("ArtistFollowers", &SqlType::Integer),
        sqlite_column!("ArtistGenres", &SqlType::Text),
        sqlite_column!("CreatedDate", &SqlType::Text, non_null = true),
        sqlite_column!("ModifiedDate", &SqlType::Text, non_null = true),
        sqlite_column!("EffectiveFrom", &SqlType::Text),
        sqlite_column!("EffectiveTo", &SqlType::Text),
        sqlite_column!(
            "IsCurrent",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
    ],
    indices: &[("idx_dim_artist_name", "ArtistName")],
    unique_constraints: &[&["ArtistName"]],
};

pub const DIM_DATE_TABLE: Table = Table {
    name: "DimDate",
    columns: &[
        sqlite_column!("DateKey", &SqlType::Integer, is_primary_key = true), // YYYYMMDD
        sqlite_column!("Date", &SqlType::Text, non_null = true),
        sqlite_column!("Year", &SqlType::Integer, non_null = true),
        sqlite_column!("Month", &SqlType::Integer, non_null = true),
        sqlite_column!("MonthName", &SqlType::Text, non_null = true),
        sqlite_column!("Quarter", &SqlType::Integer, non_null = true),
        sqlite_column!("DayOfWeek", &SqlType::Integer, non_null = true), // 1=Sunday
        sqlite_column!("DayName", &SqlType::Text, non_null = true),
        sqlite_column!("IsWeekend", &SqlType::Integer, non_null = true),
        sqlite_column!("CreatedDate", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_dim_date_year", "Year")],
    unique_constraints: &[],
};

pub const DIM_ALBUM_TABLE: Table = Table {
    name: "DimAlbum",
    columns: &[
        sqlite_column!("AlbumKey", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("SpotifyAlbumId", &SqlType::Text, non_null = true),
        sqlite_column!("AlbumName", &SqlType::Text, non_null = true),
        sqlite_column!(
            "ArtistKey",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!("AlbumType", &SqlType::Text), // 'album', 'single', 'compilation'
        sqlite_column!("AlbumTotalTracks", &SqlType::Integer),
        sqlite_column!(
            "ReleaseDateKey",
            &SqlType::Integer,
            foreign_key = Some(&DATE_FK)
        ),
        sqlite_column!("CreatedDate", &SqlType::Text, non_null = true),
        sqlite_column!("ModifiedDate", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_dim_album_artist", "ArtistKey"),
        ("idx_dim_album_release_date", "ReleaseDateKey"),
    ],
    unique_constraints: &[&["SpotifyAlbumId"]],
};

pub const DIM_TRACK_TABLE: Table = Table {
    name: "DimTrack",
    columns: &[
        sqlite_column!("TrackKey", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("SpotifyTrackId", &SqlType::Text, non_null = true),
        sqlite_column!("TrackName", &SqlType::Text, non_null = true),
        sqlite_column!("TrackNumber", &SqlType::Integer),
        sqlite_column!("TrackDurationMs", &SqlType::Integer),
        sqlite_column!("Explicit", &SqlType::Integer),
        sqlite_column!("CreatedDate", &SqlType::Text, non_null = true),
        sqlite_column!("ModifiedDate", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_dim_track_spotify_id", "SpotifyTrackId")],
    unique_constraints: &[&["SpotifyTrackId", "TrackName"]],
};

pub const FACT_TRACK_TABLE: Table = Table {
    name: "FactTrack",
    columns: &[
        sqlite_column!("FactTrackKey", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "TrackKey",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sqlite_column!(
            "ArtistKey",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!(
            "AlbumKey",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
        sqlite_column!(
            "ReleaseDateKey",
            &SqlType::Integer,
            foreign_key = Some(&DATE_FK)
        ),
        sqlite_column!("TrackPopularity", &SqlType::Integer),
        sqlite_column!("Energy", &SqlType::Real),
        sqlite_column!("Danceability", &SqlType::Real),
        sqlite_column!("Valence", &SqlType::Real),
        sqlite_column!("Loudness", &SqlType::Real),
        sqlite_column!("Tempo", &SqlType::Real),
        sqlite_column!("Acousticness", &SqlType::Real),
        sqlite_column!("Instrumentalness", &SqlType::Real),
        sqlite_column!("Liveness", &SqlType::Real),
        sqlite_column!("Speechiness", &SqlType::Real),
        sqlite_column!("LoadDate", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_fact_track_track", "TrackKey"),
        ("idx_fact_track_artist", "ArtistKey"),
        ("idx_fact_track_album", "AlbumKey"),
        ("idx_fact_track_release_date", "ReleaseDateKey"),
    ],
    unique_constraints: &[],
};

/// Tables in insert order: every table only references tables listed before it.
pub const WAREHOUSE_TABLES_IN_LOAD_ORDER: &[&Table] = &[
    &DIM_ARTIST_TABLE,
    &DIM_DATE_TABLE,
    &DIM_ALBUM_TABLE,
    &DIM_TRACK_TABLE,
    &FACT_TRACK_TABLE,
];

pub const WAREHOUSE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        DIM_ARTIST_TABLE,
        DIM_DATE_TABLE,
        DIM_ALBUM_TABLE,
        DIM_TRACK_TABLE,
        FACT_TRACK_TABLE,
    ],
}];
