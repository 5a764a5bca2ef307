//! End-to-end report tests
//!
//! Loads the standard CSV fixture through the pipeline, reopens the warehouse
//! read-only and runs every report over it.

mod common;

use common::*;
use rusqlite::Connection;
use spotify_warehouse::pipeline::run_etl;
use spotify_warehouse::reports::{
    audio_profile, compare_two_artists, popularity_trend_by_year, run_custom_report,
    top_artists_by_year, top_tracks_for_artist, warehouse_summary, CustomReportFilters,
    CustomReportRow, Grouping, Measure,
};
use spotify_warehouse::warehouse::{open_warehouse, open_warehouse_read_only};
use spotify_warehouse::LoadOptions;

fn loaded_warehouse() -> (TestSources, Connection) {
    let fixture = TestSources::standard();
    {
        let conn = open_warehouse(&fixture.db_path).unwrap();
        run_etl(
            &conn,
            &fixture.sources,
            &LoadOptions::default(),
            fixed_timestamp(),
        )
        .unwrap();
    }
    let conn = open_warehouse_read_only(&fixture.db_path).unwrap();
    (fixture, conn)
}

fn approx(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("average should be present");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn test_top_artists_for_year_counts_both_sources() {
    let (_fixture, conn) = loaded_warehouse();

    let rows = top_artists_by_year(&conn, 2009, 10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].artist_name, "Muse");
    approx(rows[0].avg_popularity, 78.5);
    assert_eq!(rows[0].track_count, 2);

    let rows = top_artists_by_year(&conn, 2001, 10).unwrap();
    assert_eq!(rows[0].artist_name, "Daft Punk");
    approx(rows[0].avg_popularity, 77.5);

    // A date that only dropped facts pointed at.
    assert!(top_artists_by_year(&conn, 2010, 10).unwrap().is_empty());
}

#[test]
fn test_popularity_trend_skips_undated_facts() {
    let (_fixture, conn) = loaded_warehouse();

    let rows = popularity_trend_by_year(&conn, None, None).unwrap();
    let years: Vec<i32> = rows.iter().map(|r| r.year).collect();
    assert_eq!(years, vec![1993, 1997, 2001, 2009]);
    // h4 has no release date, so 1997 only sees Karma Police.
    approx(rows[1].avg_popularity, 84.0);
    assert_eq!(rows[1].track_count, 1);
    let total: i64 = rows.iter().map(|r| r.track_count).sum();
    assert_eq!(total, 6);

    let bounded = popularity_trend_by_year(&conn, Some(1995), Some(2005)).unwrap();
    let years: Vec<i32> = bounded.iter().map(|r| r.year).collect();
    assert_eq!(years, vec![1997, 2001]);
}

#[test]
fn test_audio_profile_ignores_missing_measures() {
    let (_fixture, conn) = loaded_warehouse();

    let rows = audio_profile(&conn, "MUSE", None, None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].artist_name, "Muse");
    assert_eq!(rows[0].track_count, 2);
    // The historic copy of Uprising carries no audio measures.
    approx(rows[0].avg_energy, 0.9);
    approx(rows[0].avg_tempo, 128.0);
    assert_eq!(rows[0].avg_loudness, None);

    let radiohead = audio_profile(&conn, "radio", None, None).unwrap();
    assert_eq!(radiohead[0].avg_energy, None);
}

#[test]
fn test_top_tracks_for_artist() {
    let (_fixture, conn) = loaded_warehouse();

    let rows = top_tracks_for_artist(&conn, "radiohead", 10).unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.track_name.as_str()).collect();
    assert_eq!(names, vec!["Karma Police", "Creep"]);
    assert_eq!(rows[0].year, 1997);
    assert_eq!(rows[0].popularity, Some(84));

    assert_eq!(top_tracks_for_artist(&conn, "radiohead", 1).unwrap().len(), 1);
    assert!(top_tracks_for_artist(&conn, "beatles", 10).unwrap().is_empty());
}

#[test]
fn test_compare_two_artists() {
    let (_fixture, conn) = loaded_warehouse();

    let comparison = compare_two_artists(&conn, "daft", "radio", None, None).unwrap();
    let first = comparison.first.unwrap();
    let second = comparison.second.unwrap();
    assert_eq!(first.artist_name, "Daft Punk");
    approx(first.avg_popularity, 77.5);
    assert_eq!(second.artist_name, "Radiohead");
    approx(second.avg_popularity, 83.0);
    assert_eq!(comparison.all_matches.len(), 2);

    let nobody = compare_two_artists(&conn, "abba", "queen", None, None).unwrap();
    assert!(nobody.first.is_none());
    assert!(nobody.second.is_none());
}

#[test]
fn test_warehouse_summary() {
    let (_fixture, conn) = loaded_warehouse();

    let summary = warehouse_summary(&conn).unwrap();
    approx(summary.avg_popularity, 551.0 / 8.0);
    // Muse and Radiohead tie on three facts; ties go to the first name.
    assert_eq!(summary.most_tracks_artist.as_deref(), Some("Muse"));
    // 2001 and 2009 tie on two dated facts; ties go to the earlier year.
    assert_eq!(summary.most_active_year, Some(2001));
}

#[test]
fn test_custom_report_energy_by_artist() {
    let (_fixture, conn) = loaded_warehouse();

    let rows = run_custom_report(
        &conn,
        Measure::Energy,
        Grouping::Artist,
        &CustomReportFilters::default(),
    )
    .unwrap();

    let labels: Vec<String> = rows.iter().map(|r| r.label()).collect();
    // Undated facts still count here, no date join is involved.
    assert_eq!(labels, vec!["Muse", "Daft Punk", "Radiohead"]);
    approx(rows[0].avg_value(), 0.875);
    assert_eq!(rows[0].track_count(), 3);
    approx(rows[1].avg_value(), 0.75);
    assert_eq!(rows[2].avg_value(), None);
}

#[test]
fn test_custom_report_popularity_by_year_with_bounds() {
    let (_fixture, conn) = loaded_warehouse();

    let filters = CustomReportFilters {
        min_year: Some(2000),
        ..CustomReportFilters::default()
    };
    let rows = run_custom_report(&conn, Measure::Popularity, Grouping::Year, &filters).unwrap();

    assert_eq!(rows.len(), 2);
    match &rows[0] {
        CustomReportRow::Year {
            year,
            avg_value,
            track_count,
        } => {
            assert_eq!(*year, 2009);
            approx(*avg_value, 78.5);
            assert_eq!(*track_count, 2);
        }
        other => panic!("unexpected row {:?}", other),
    }
    assert_eq!(rows[1].label(), "2001");
}

#[test]
fn test_custom_report_album_with_popularity_floor() {
    let (_fixture, conn) = loaded_warehouse();

    let filters = CustomReportFilters {
        min_popularity: Some(80),
        // Ignored: album grouping does not join the artist dimension.
        artist: Some("nobody".to_string()),
        ..CustomReportFilters::default()
    };
    let rows = run_custom_report(&conn, Measure::Popularity, Grouping::Album, &filters).unwrap();

    let labels: Vec<String> = rows.iter().map(|r| r.label()).collect();
    assert_eq!(labels, vec!["Ok Computer", "Pablo Honey", "Discovery"]);
}

#[test]
fn test_custom_report_rows_serialize_with_grouping_tag() {
    let (_fixture, conn) = loaded_warehouse();

    let filters = CustomReportFilters {
        artist: Some("muse".to_string()),
        ..CustomReportFilters::default()
    };
    let rows = run_custom_report(
        &conn,
        Measure::Popularity,
        Grouping::ArtistYear,
        &filters,
    )
    .unwrap();
    assert_eq!(rows.len(), 1);

    let json = serde_json::to_value(&rows[0]).unwrap();
    assert_eq!(json["grouping"], "artist_year");
    assert_eq!(json["artist"], "Muse");
    assert_eq!(json["year"], 2009);
    assert_eq!(json["track_count"], 2);
}
