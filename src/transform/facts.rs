use super::dimensions::{
    artist_identity, track_identity, AlbumDimension, ArtistDimension, DateDimension,
    TrackDimension,
};
use crate::extract::RawRecord;
use crate::warehouse::{FactTrack, SurrogateKey, UNRESOLVED_KEY};
use chrono::NaiveDateTime;
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct FactSet {
    pub rows: Vec<FactTrack>,
    /// Records whose track, artist or album did not resolve.
    pub dropped: usize,
}

/// Builds one fact per raw record, dropping those missing a track, artist or album.
///
/// Surviving facts get consecutive keys starting at 1.
pub fn build_facts(
    records: &[RawRecord],
    artists: &ArtistDimension,
    albums: &AlbumDimension,
    tracks: &TrackDimension,
    dates: &DateDimension,
    load_date: NaiveDateTime,
) -> FactSet {
    let mut rows = Vec::with_capacity(records.len());
    let mut dropped = 0;
    for record in records {
        let track_key = tracks.key_of(&track_identity(record));
        let artist_key = artists.key_of(&artist_identity(record));
        let album_key = albums.key_of(&record.album_id);
        if [track_key, artist_key, album_key].contains(&UNRESOLVED_KEY) {
            debug!(
                "Dropping fact for track {:?}: track={} artist={} album={}",
                record.track_id, track_key, artist_key, album_key
            );
            dropped += 1;
            continue;
        }
        rows.push(FactTrack {
            fact_track_key: rows.len() as SurrogateKey + 1,
            track_key,
            artist_key,
            album_key,
            release_date_key: dates.key_of(record.album_release_date.as_deref()),
            track_popularity: record.track_popularity,
            audio: record.audio.clone(),
            load_date,
        });
    }
    FactSet { rows, dropped }
}

#[cfg(test)]
mod tests {
    use super::super::dimensions::{build_albums, build_artists, build_dates, build_tracks};
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn facts_for(records: &[RawRecord]) -> FactSet {
        let artists = build_artists(records, stamp());
        let dates = build_dates(records, stamp());
        let albums = build_albums(records, &artists, &dates, stamp());
        let tracks = build_tracks(records, stamp());
        build_facts(records, &artists, &albums, &tracks, &dates, stamp())
    }

    fn record(track_id: &str, album_id: &str, release_date: Option<&str>) -> RawRecord {
        RawRecord {
            track_id: track_id.to_string(),
            track_name: format!("Track {}", track_id),
            artist_name: "Muse".to_string(),
            album_id: album_id.to_string(),
            album_name: "Absolution".to_string(),
            album_release_date: release_date.map(str::to_string),
            track_popularity: Some(60),
            ..Default::default()
        }
    }

    #[test]
    fn test_blank_album_is_dropped_and_keys_stay_gapless() {
        let mut with_audio = record("t3", "a1", Some("2003-09-15"));
        with_audio.audio.energy = Some(0.9);
        with_audio.audio.tempo = Some(128.0);
        let records = vec![
            record("t1", "a1", Some("2003-09-15")),
            record("t2", "  ", Some("2003-09-15")),
            with_audio,
        ];

        let facts = facts_for(&records);
        assert_eq!(facts.dropped, 1);
        assert_eq!(facts.rows.len(), 2);
        let keys: Vec<SurrogateKey> = facts.rows.iter().map(|f| f.fact_track_key).collect();
        assert_eq!(keys, vec![1, 2]);
        assert_eq!(facts.rows[1].audio.energy, Some(0.9));
        assert_eq!(facts.rows[1].audio.tempo, Some(128.0));
        assert_eq!(facts.rows[1].track_popularity, Some(60));
        assert_eq!(facts.rows[1].load_date, stamp());
        assert!(facts.rows.iter().all(|f| f.release_date_key == Some(20030915)));
    }

    #[test]
    fn test_unparseable_date_keeps_fact_without_date() {
        let records = vec![
            record("t1", "a1", Some("sometime in 2003")),
            record("t2", "a1", None),
        ];
        let facts = facts_for(&records);
        assert_eq!(facts.dropped, 0);
        assert_eq!(facts.rows.len(), 2);
        assert!(facts.rows.iter().all(|f| f.release_date_key.is_none()));
    }

    #[test]
    fn test_duplicate_records_produce_one_fact_each() {
        let records = vec![record("t1", "a1", None), record("t1", "a1", None)];
        let facts = facts_for(&records);
        assert_eq!(facts.rows.len(), 2);
        assert_eq!(facts.rows[0].track_key, facts.rows[1].track_key);
    }
}
