//! Read-only analytical queries over a loaded warehouse.
//!
//! Every report joins `FactTrack` to the dimensions it needs. Facts without a release
//! date drop out of any report that joins `DimDate`. Artist arguments are
//! case-insensitive name fragments, ranked exact match first, then prefix, then any
//! other substring.

mod custom;

pub use custom::{run_custom_report, CustomReportFilters, CustomReportRow, Grouping, Measure};

use rusqlite::{named_params, Connection, Row};
use serde::Serialize;

const MATCH_RANK: &str = "CASE
        WHEN LOWER(a.ArtistName) = LOWER(:artist) THEN 1
        WHEN instr(LOWER(a.ArtistName), LOWER(:artist)) = 1 THEN 2
        ELSE 3
    END";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TopArtist {
    pub artist_name: String,
    pub avg_popularity: Option<f64>,
    pub track_count: i64,
}

/// Artists with the highest average track popularity among releases of `year`.
pub fn top_artists_by_year(
    conn: &Connection,
    year: i32,
    limit: usize,
) -> rusqlite::Result<Vec<TopArtist>> {
    let mut stmt = conn.prepare(
        "SELECT a.ArtistName, AVG(CAST(f.TrackPopularity AS REAL)) AS AvgPopularity, COUNT(*)
         FROM FactTrack f
         JOIN DimArtist a ON f.ArtistKey = a.ArtistKey
         JOIN DimDate d ON f.ReleaseDateKey = d.DateKey
         WHERE d.Year = :year AND a.IsCurrent = 1
         GROUP BY a.ArtistName
         ORDER BY AvgPopularity DESC, a.ArtistName
         LIMIT :limit",
    )?;
    let rows = stmt
        .query_map(
            named_params! { ":year": year, ":limit": limit as i64 },
            |row| {
                Ok(TopArtist {
                    artist_name: row.get(0)?,
                    avg_popularity: row.get(1)?,
                    track_count: row.get(2)?,
                })
            },
        )?
        .collect();
    rows
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct YearTrend {
    pub year: i32,
    pub avg_popularity: Option<f64>,
    pub track_count: i64,
}

pub fn popularity_trend_by_year(
    conn: &Connection,
    min_year: Option<i32>,
    max_year: Option<i32>,
) -> rusqlite::Result<Vec<YearTrend>> {
    let mut stmt = conn.prepare(
        "SELECT d.Year, AVG(CAST(f.TrackPopularity AS REAL)), COUNT(*)
         FROM FactTrack f
         JOIN DimDate d ON f.ReleaseDateKey = d.DateKey
         WHERE (:min_year IS NULL OR d.Year >= :min_year)
           AND (:max_year IS NULL OR d.Year <= :max_year)
         GROUP BY d.Year
         ORDER BY d.Year",
    )?;
    let rows = stmt
        .query_map(
            named_params! { ":min_year": min_year, ":max_year": max_year },
            |row| {
                Ok(YearTrend {
                    year: row.get(0)?,
                    avg_popularity: row.get(1)?,
                    track_count: row.get(2)?,
                })
            },
        )?
        .collect();
    rows
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AudioProfile {
    pub artist_name: String,
    pub avg_energy: Option<f64>,
    pub avg_danceability: Option<f64>,
    pub avg_valence: Option<f64>,
    pub avg_tempo: Option<f64>,
    pub avg_acousticness: Option<f64>,
    pub avg_instrumentalness: Option<f64>,
    pub avg_liveness: Option<f64>,
    pub avg_speechiness: Option<f64>,
    pub avg_loudness: Option<f64>,
    pub track_count: i64,
}

/// Average audio measures of every artist matching `artist`.
pub fn audio_profile(
    conn: &Connection,
    artist: &str,
    min_year: Option<i32>,
    max_year: Option<i32>,
) -> rusqlite::Result<Vec<AudioProfile>> {
    let sql = format!(
        "SELECT a.ArtistName,
                AVG(f.Energy), AVG(f.Danceability), AVG(f.Valence), AVG(f.Tempo),
                AVG(f.Acousticness), AVG(f.Instrumentalness), AVG(f.Liveness),
                AVG(f.Speechiness), AVG(f.Loudness),
                COUNT(*) AS TrackCount,
                {MATCH_RANK} AS MatchRank
         FROM FactTrack f
         JOIN DimArtist a ON f.ArtistKey = a.ArtistKey
         JOIN DimDate d ON f.ReleaseDateKey = d.DateKey
         WHERE instr(LOWER(a.ArtistName), LOWER(:artist)) > 0
           AND (:min_year IS NULL OR d.Year >= :min_year)
           AND (:max_year IS NULL OR d.Year <= :max_year)
         GROUP BY a.ArtistName
         ORDER BY MatchRank, TrackCount DESC, a.ArtistName"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            named_params! { ":artist": artist, ":min_year": min_year, ":max_year": max_year },
            |row| {
                Ok(AudioProfile {
                    artist_name: row.get(0)?,
                    avg_energy: row.get(1)?,
                    avg_danceability: row.get(2)?,
                    avg_valence: row.get(3)?,
                    avg_tempo: row.get(4)?,
                    avg_acousticness: row.get(5)?,
                    avg_instrumentalness: row.get(6)?,
                    avg_liveness: row.get(7)?,
                    avg_speechiness: row.get(8)?,
                    avg_loudness: row.get(9)?,
                    track_count: row.get(10)?,
                })
            },
        )?
        .collect();
    rows
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TopTrack {
    pub track_name: String,
    pub artist_name: String,
    pub year: i32,
    pub popularity: Option<i32>,
}

/// Most popular tracks of the artists matching `artist`, best name match first.
pub fn top_tracks_for_artist(
    conn: &Connection,
    artist: &str,
    limit: usize,
) -> rusqlite::Result<Vec<TopTrack>> {
    let sql = format!(
        "SELECT t.TrackName, a.ArtistName, d.Year, f.TrackPopularity,
                {MATCH_RANK} AS MatchRank
         FROM FactTrack f
         JOIN DimTrack t ON f.TrackKey = t.TrackKey
         JOIN DimArtist a ON f.ArtistKey = a.ArtistKey
         JOIN DimDate d ON f.ReleaseDateKey = d.DateKey
         WHERE instr(LOWER(a.ArtistName), LOWER(:artist)) > 0
         ORDER BY MatchRank, f.TrackPopularity DESC, a.ArtistName, t.TrackName
         LIMIT :limit"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            named_params! { ":artist": artist, ":limit": limit as i64 },
            |row| {
                Ok(TopTrack {
                    track_name: row.get(0)?,
                    artist_name: row.get(1)?,
                    year: row.get(2)?,
                    popularity: row.get(3)?,
                })
            },
        )?
        .collect();
    rows
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArtistStats {
    pub artist_name: String,
    pub avg_popularity: Option<f64>,
    pub avg_energy: Option<f64>,
    pub avg_danceability: Option<f64>,
    pub avg_valence: Option<f64>,
    pub track_count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArtistComparison {
    pub first: Option<ArtistStats>,
    pub second: Option<ArtistStats>,
    /// Every artist matching either fragment, by name.
    pub all_matches: Vec<ArtistStats>,
}

fn parse_artist_stats(row: &Row) -> rusqlite::Result<ArtistStats> {
    Ok(ArtistStats {
        artist_name: row.get(0)?,
        avg_popularity: row.get(1)?,
        avg_energy: row.get(2)?,
        avg_danceability: row.get(3)?,
        avg_valence: row.get(4)?,
        track_count: row.get(5)?,
    })
}

/// Side-by-side averages of the artists matching two name fragments.
///
/// Each side is the first match (by name) containing its fragment. When a fragment
/// matches nothing, the side falls back to the first, respectively second, overall match.
pub fn compare_two_artists(
    conn: &Connection,
    first: &str,
    second: &str,
    min_year: Option<i32>,
    max_year: Option<i32>,
) -> rusqlite::Result<ArtistComparison> {
    let mut stmt = conn.prepare(
        "SELECT a.ArtistName,
                AVG(CAST(f.TrackPopularity AS REAL)), AVG(f.Energy), AVG(f.Danceability),
                AVG(f.Valence), COUNT(*)
         FROM FactTrack f
         JOIN DimArtist a ON f.ArtistKey = a.ArtistKey
         JOIN DimDate d ON f.ReleaseDateKey = d.DateKey
         WHERE (instr(LOWER(a.ArtistName), LOWER(:first)) > 0
                OR instr(LOWER(a.ArtistName), LOWER(:second)) > 0)
           AND (:min_year IS NULL OR d.Year >= :min_year)
           AND (:max_year IS NULL OR d.Year <= :max_year)
         GROUP BY a.ArtistName
         ORDER BY a.ArtistName",
    )?;
    let all_matches = stmt
        .query_map(
            named_params! {
                ":first": first,
                ":second": second,
                ":min_year": min_year,
                ":max_year": max_year,
            },
            parse_artist_stats,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let containing = |fragment: &str| {
        let fragment = fragment.to_lowercase();
        all_matches
            .iter()
            .find(|s| s.artist_name.to_lowercase().contains(&fragment))
            .cloned()
    };
    let first = containing(first).or_else(|| all_matches.first().cloned());
    let second = containing(second).or_else(|| all_matches.get(1).cloned());

    Ok(ArtistComparison {
        first,
        second,
        all_matches,
    })
}

/// Headline numbers for the `status` command.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WarehouseSummary {
    pub avg_popularity: Option<f64>,
    pub most_tracks_artist: Option<String>,
    pub most_active_year: Option<i32>,
}

pub fn warehouse_summary(conn: &Connection) -> rusqlite::Result<WarehouseSummary> {
    conn.query_row(
        "SELECT
            (SELECT AVG(CAST(TrackPopularity AS REAL)) FROM FactTrack),
            (SELECT a.ArtistName FROM FactTrack f
             JOIN DimArtist a ON f.ArtistKey = a.ArtistKey
             GROUP BY a.ArtistName ORDER BY COUNT(*) DESC, a.ArtistName LIMIT 1),
            (SELECT d.Year FROM FactTrack f
             JOIN DimDate d ON f.ReleaseDateKey = d.DateKey
             GROUP BY d.Year ORDER BY COUNT(*) DESC, d.Year LIMIT 1)",
        [],
        |row| {
            Ok(WarehouseSummary {
                avg_popularity: row.get(0)?,
                most_tracks_artist: row.get(1)?,
                most_active_year: row.get(2)?,
            })
        },
    )
}


#[cfg(test)]
mod tests {
    use super::test_data::seeded_warehouse;
    use super::*;

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.unwrap();
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_top_artists_by_year() {
        let conn = seeded_warehouse();
        let rows = top_artists_by_year(&conn, 2009, 10).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.artist_name.as_str()).collect();
        assert_eq!(names, vec!["Muse", "Muse Tribute Band"]);
        approx(rows[0].avg_popularity, 70.0);
        assert_eq!(rows[0].track_count, 2);

        assert_eq!(top_artists_by_year(&conn, 2009, 1).unwrap().len(), 1);
        assert!(top_artists_by_year(&conn, 1980, 10).unwrap().is_empty());
    }

    #[test]
    fn test_top_artists_skips_non_current_rows() {
        let conn = seeded_warehouse();
        conn.execute("UPDATE DimArtist SET IsCurrent = 0 WHERE ArtistKey = 1", [])
            .unwrap();
        let rows = top_artists_by_year(&conn, 2009, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].artist_name, "Muse Tribute Band");
    }

    #[test]
    fn test_popularity_trend_by_year() {
        let conn = seeded_warehouse();
        let rows = popularity_trend_by_year(&conn, None, None).unwrap();
        let years: Vec<i32> = rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2001, 2009]);
        approx(rows[0].avg_popularity, 80.0);
        approx(rows[1].avg_popularity, 160.0 / 3.0);
        assert_eq!(rows[1].track_count, 3);

        let filtered = popularity_trend_by_year(&conn, Some(2005), None).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].year, 2009);
        assert!(popularity_trend_by_year(&conn, Some(2002), Some(2008))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_audio_profile_ranks_exact_match_first() {
        let conn = seeded_warehouse();
        let rows = audio_profile(&conn, "muse", None, None).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.artist_name.as_str()).collect();
        assert_eq!(names, vec!["Muse", "Muse Tribute Band"]);
        approx(rows[0].avg_energy, 0.8);
        approx(rows[0].avg_tempo, 120.0);
        // The undated fact drops out with the date join.
        assert_eq!(rows[0].track_count, 2);
        assert_eq!(rows[0].avg_loudness, None);

        let tribute = audio_profile(&conn, "tribute", None, None).unwrap();
        assert_eq!(tribute.len(), 1);
        assert!(audio_profile(&conn, "muse", Some(2010), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_top_tracks_for_artist() {
        let conn = seeded_warehouse();
        let rows = top_tracks_for_artist(&conn, "MUSE", 10).unwrap();
        let tracks: Vec<&str> = rows.iter().map(|r| r.track_name.as_str()).collect();
        assert_eq!(tracks, vec!["Uprising", "Resistance", "Uprising Cover"]);
        assert_eq!(rows[0].year, 2009);
        assert_eq!(rows[0].popularity, Some(80));

        assert_eq!(top_tracks_for_artist(&conn, "punk", 1).unwrap()[0].track_name, "One More Time");
    }

    #[test]
    fn test_compare_two_artists() {
        let conn = seeded_warehouse();
        let comparison = compare_two_artists(&conn, "daft", "tribute", None, None).unwrap();
        assert_eq!(comparison.first.unwrap().artist_name, "Daft Punk");
        let second = comparison.second.unwrap();
        assert_eq!(second.artist_name, "Muse Tribute Band");
        approx(second.avg_popularity, 20.0);
        assert_eq!(comparison.all_matches.len(), 2);
    }

    #[test]
    fn test_compare_falls_back_to_overall_matches() {
        let conn = seeded_warehouse();
        let comparison = compare_two_artists(&conn, "muse", "nobody", None, None).unwrap();
        assert_eq!(comparison.first.unwrap().artist_name, "Muse");
        // "nobody" matched nothing, so the second overall match fills in.
        assert_eq!(comparison.second.unwrap().artist_name, "Muse Tribute Band");

        let empty = compare_two_artists(&conn, "x", "y", None, None).unwrap();
        assert!(empty.first.is_none() && empty.second.is_none());
    }

    #[test]
    fn test_warehouse_summary() {
        let conn = seeded_warehouse();
        let summary = warehouse_summary(&conn).unwrap();
        approx(summary.avg_popularity, 55.0);
        assert_eq!(summary.most_tracks_artist.as_deref(), Some("Muse"));
        assert_eq!(summary.most_active_year, Some(2009));

        let empty = crate::warehouse::open_warehouse_in_memory().unwrap();
        assert_eq!(warehouse_summary(&empty).unwrap(), WarehouseSummary::default());
    }
}
