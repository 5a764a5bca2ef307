//! Ad-hoc report: one averaged measure grouped along one or two dimensions.

use rusqlite::types::ToSql;
use rusqlite::{Connection, Row};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Popularity,
    Energy,
    Danceability,
    Valence,
    Tempo,
}

impl Measure {
    fn column(&self) -> &'static str {
        match self {
            Measure::Popularity => "CAST(f.TrackPopularity AS REAL)",
            Measure::Energy => "f.Energy",
            Measure::Danceability => "f.Danceability",
            Measure::Valence => "f.Valence",
            Measure::Tempo => "f.Tempo",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    Artist,
    Year,
    Album,
    ArtistYear,
}

impl Grouping {
    fn joins_artist(&self) -> bool {
        matches!(self, Grouping::Artist | Grouping::ArtistYear)
    }

    fn joins_date(&self) -> bool {
        matches!(self, Grouping::Year | Grouping::ArtistYear)
    }

    fn joins_album(&self) -> bool {
        matches!(self, Grouping::Album)
    }

    fn group_columns(&self) -> &'static str {
        match self {
            Grouping::Artist => "a.ArtistName",
            Grouping::Year => "d.Year",
            Grouping::Album => "al.AlbumName",
            Grouping::ArtistYear => "a.ArtistName, d.Year",
        }
    }
}

/// Optional filters. The year bounds only apply to groupings that join the date
/// dimension and the artist fragment only to groupings that join the artist dimension.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomReportFilters {
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub min_popularity: Option<i32>,
    pub artist: Option<String>,
}

/// One result row; the variant matches the requested [`Grouping`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "grouping", rename_all = "snake_case")]
pub enum CustomReportRow {
    Artist {
        artist: String,
        avg_value: Option<f64>,
        track_count: i64,
    },
    Year {
        year: i32,
        avg_value: Option<f64>,
        track_count: i64,
    },
    Album {
        album: String,
        avg_value: Option<f64>,
        track_count: i64,
    },
    ArtistYear {
        artist: String,
        year: i32,
        avg_value: Option<f64>,
        track_count: i64,
    },
}

impl CustomReportRow {
    pub fn avg_value(&self) -> Option<f64> {
        match self {
            CustomReportRow::Artist { avg_value, .. }
            | CustomReportRow::Year { avg_value, .. }
            | CustomReportRow::Album { avg_value, .. }
            | CustomReportRow::ArtistYear { avg_value, .. } => *avg_value,
        }
    }

    pub fn track_count(&self) -> i64 {
        match self {
            CustomReportRow::Artist { track_count, .. }
            | CustomReportRow::Year { track_count, .. }
            | CustomReportRow::Album { track_count, .. }
            | CustomReportRow::ArtistYear { track_count, .. } => *track_count,
        }
    }

    /// Group value(s) as display text.
    pub fn label(&self) -> String {
        match self {
            CustomReportRow::Artist { artist, .. } => artist.clone(),
            CustomReportRow::Year { year, .. } => year.to_string(),
            CustomReportRow::Album { album, .. } => album.clone(),
            CustomReportRow::ArtistYear { artist, year, .. } => format!("{} ({})", artist, year),
        }
    }

    fn parse(grouping: Grouping, row: &Row) -> rusqlite::Result<Self> {
        Ok(match grouping {
            Grouping::Artist => CustomReportRow::Artist {
                artist: row.get(0)?,
                avg_value: row.get(1)?,
                track_count: row.get(2)?,
            },
            Grouping::Year => CustomReportRow::Year {
                year: row.get(0)?,
                avg_value: row.get(1)?,
                track_count: row.get(2)?,
            },
            Grouping::Album => CustomReportRow::Album {
                album: row.get(0)?,
                avg_value: row.get(1)?,
                track_count: row.get(2)?,
            },
            Grouping::ArtistYear => CustomReportRow::ArtistYear {
                artist: row.get(0)?,
                year: row.get(1)?,
                avg_value: row.get(2)?,
                track_count: row.get(3)?,
            },
        })
    }
}

fn build_query(measure: Measure, grouping: Grouping, filters: &CustomReportFilters) -> String {
    let mut sql = format!(
        "SELECT {}, AVG({}) AS AvgValue, COUNT(*) AS TrackCount\nFROM FactTrack f\n",
        grouping.group_columns(),
        measure.column()
    );
    if grouping.joins_artist() {
        sql.push_str("JOIN DimArtist a ON f.ArtistKey = a.ArtistKey\n");
    }
    if grouping.joins_album() {
        sql.push_str("JOIN DimAlbum al ON f.AlbumKey = al.AlbumKey\n");
    }
    if grouping.joins_date() {
        sql.push_str("JOIN DimDate d ON f.ReleaseDateKey = d.DateKey\n");
    }

    sql.push_str("WHERE 1 = 1\n");
    if grouping.joins_date() {
        if filters.min_year.is_some() {
            sql.push_str("  AND d.Year >= :min_year\n");
        }
        if filters.max_year.is_some() {
            sql.push_str("  AND d.Year <= :max_year\n");
        }
    }
    if filters.min_popularity.is_some() {
        sql.push_str("  AND f.TrackPopularity >= :min_popularity\n");
    }
    if grouping.joins_artist() && filters.artist.is_some() {
        sql.push_str("  AND instr(LOWER(a.ArtistName), LOWER(:artist)) > 0\n");
    }

    sql.push_str(&format!(
        "GROUP BY {0}\nORDER BY AvgValue DESC, {0}",
        grouping.group_columns()
    ));
    sql
}

/// Averages `measure` per group, highest average first.
pub fn run_custom_report(
    conn: &Connection,
    measure: Measure,
    grouping: Grouping,
    filters: &CustomReportFilters,
) -> rusqlite::Result<Vec<CustomReportRow>> {
    let sql = build_query(measure, grouping, filters);

    let mut params: Vec<(&str, &dyn ToSql)> = Vec::new();
    if grouping.joins_date() {
        if let Some(min_year) = &filters.min_year {
            params.push((":min_year", min_year as &dyn ToSql));
        }
        if let Some(max_year) = &filters.max_year {
            params.push((":max_year", max_year as &dyn ToSql));
        }
    }
    if let Some(min_popularity) = &filters.min_popularity {
        params.push((":min_popularity", min_popularity as &dyn ToSql));
    }
    if grouping.joins_artist() {
        if let Some(artist) = &filters.artist {
            params.push((":artist", artist as &dyn ToSql));
        }
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params.as_slice(), |row| CustomReportRow::parse(grouping, row))?
        .collect();
    rows
}
