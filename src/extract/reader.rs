//! CSV readers for the two source dialects.
//!
//! Both dialects share column names except for the track duration. The contemporary
//! export stores it as fractional minutes, the historic one as integer milliseconds.
//! Headers are never validated: a missing column reads as an absent field, and a
//! field that fails to coerce is absent too.

use super::raw::RawRecord;
use crate::warehouse::AudioFeatures;
use csv::{ByteRecord, ReaderBuilder};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsvDialect {
    /// `spotify_data_clean.csv`: duration in minutes.
    Contemporary,
    /// `track_data_final.csv`: duration in milliseconds.
    Historic,
}

impl fmt::Display for CsvDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvDialect::Contemporary => write!(f, "contemporary"),
            CsvDialect::Historic => write!(f, "historic"),
        }
    }
}

struct HeaderIndex(HashMap<String, usize>);

impl HeaderIndex {
    fn new(headers: &ByteRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let name = String::from_utf8_lossy(name);
                (name.trim_start_matches('\u{feff}').trim().to_lowercase(), i)
            })
            .collect();
        HeaderIndex(index)
    }

    fn row<'a>(&'a self, record: &'a ByteRecord) -> Row<'a> {
        Row {
            headers: self,
            record,
        }
    }
}

struct Row<'a> {
    headers: &'a HeaderIndex,
    record: &'a ByteRecord,
}

impl<'a> Row<'a> {
    fn text(&self, column: &str) -> Option<Cow<'a, str>> {
        let index = *self.headers.0.get(column)?;
        self.record.get(index).map(String::from_utf8_lossy)
    }

    fn string(&self, column: &str) -> String {
        self.text(column).map(Cow::into_owned).unwrap_or_default()
    }

    fn non_blank(&self, column: &str) -> Option<String> {
        self.text(column)
            .filter(|v| !v.trim().is_empty())
            .map(Cow::into_owned)
    }

    fn float(&self, column: &str) -> Option<f64> {
        parse_float(self.text(column).as_deref())
    }

    fn integer<T: TryFrom<i64>>(&self, column: &str) -> Option<T> {
        parse_integer(self.text(column).as_deref())
    }
}

/// Lenient float parse: surrounding whitespace is ignored, non-finite values are rejected.
pub fn parse_float(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses as floating point first and truncates, so `"42.0"` and `"42.9"` both give 42.
pub fn parse_integer<T: TryFrom<i64>>(value: Option<&str>) -> Option<T> {
    float_to_integer(parse_float(value)?.trunc())
}

fn float_to_integer<T: TryFrom<i64>>(value: f64) -> Option<T> {
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return None;
    }
    T::try_from(value as i64).ok()
}

/// `"true"` in any case is true, any other non-blank text is false, blank is absent.
pub fn parse_explicit(value: Option<&str>) -> Option<bool> {
    let value = value?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.eq_ignore_ascii_case("true"))
    }
}

/// Fractional minutes to whole milliseconds, truncated toward zero.
pub fn minutes_to_ms(minutes: f64) -> Option<i64> {
    float_to_integer((minutes * 60_000.0).trunc())
}

fn parse_record(row: &Row, dialect: CsvDialect) -> RawRecord {
    let track_duration_ms = match dialect {
        CsvDialect::Contemporary => row.float("track_duration_min").and_then(minutes_to_ms),
        CsvDialect::Historic => row.integer("track_duration_ms"),
    };

    RawRecord {
        track_id: row.string("track_id"),
        track_name: row.string("track_name"),
        track_number: row.integer("track_number"),
        track_popularity: row.integer("track_popularity"),
        track_duration_ms,
        explicit: parse_explicit(row.text("explicit").as_deref()),

        artist_name: row.string("artist_name"),
        artist_popularity: row.integer("artist_popularity"),
        artist_followers: row.integer("artist_followers"),
        artist_genres: row.non_blank("artist_genres"),

        album_id: row.string("album_id"),
        album_name: row.string("album_name"),
        album_release_date: row.non_blank("album_release_date"),
        album_total_tracks: row.integer("album_total_tracks"),
        album_type: row.non_blank("album_type"),

        audio: AudioFeatures {
            energy: row.float("energy"),
            danceability: row.float("danceability"),
            valence: row.float("valence"),
            loudness: row.float("loudness"),
            tempo: row.float("tempo"),
            acousticness: row.float("acousticness"),
            instrumentalness: row.float("instrumentalness"),
            liveness: row.float("liveness"),
            speechiness: row.float("speechiness"),
        },
    }
}

/// Reads every row of a CSV stream in the given dialect.
///
/// Rows the CSV parser rejects are skipped with a warning. Only I/O errors abort.
pub fn read_records_from<R: Read>(
    reader: R,
    dialect: CsvDialect,
) -> Result<Vec<RawRecord>, csv::Error> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = HeaderIndex::new(csv_reader.byte_headers()?);

    let mut records = Vec::new();
    let mut skipped = 0usize;
    let mut record = ByteRecord::new();
    loop {
        match csv_reader.read_byte_record(&mut record) {
            Ok(true) => records.push(parse_record(&headers.row(&record), dialect)),
            Ok(false) => break,
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                skipped += 1;
                warn!("Skipping malformed {} row: {}", dialect, e);
            }
        }
    }
    if skipped > 0 {
        warn!("Skipped {} malformed {} rows", skipped, dialect);
    }
    Ok(records)
}
