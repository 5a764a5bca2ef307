//! Dimension builders.
//!
//! Each builder takes the raw records plus the results of the steps it depends on and
//! returns an immutable dimension: the rows, sorted for output, and the map from
//! business identity to the process-local surrogate key. Keys follow first-seen group
//! order, so key order and row order are independent.

use super::normalize::{non_blank, normalize_genres, normalize_name, parse_release_date};
use crate::extract::RawRecord;
use crate::warehouse::{
    DateKey, DimAlbum, DimArtist, DimDate, DimTrack, SurrogateKey, UNRESOLVED_KEY,
};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Groups records by `identity`, keeping groups and their members in first-seen order.
/// Records whose identity is `None` are left out.
pub fn group_first_seen<'a, K, F>(
    records: &'a [RawRecord],
    identity: F,
) -> Vec<(K, Vec<&'a RawRecord>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&RawRecord) -> Option<K>,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&RawRecord>)> = Vec::new();
    for record in records {
        let Some(key) = identity(record) else {
            continue;
        };
        match positions.get(&key) {
            Some(&position) => groups[position].1.push(record),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![record]));
            }
        }
    }
    groups
}

fn surrogate_key(group_index: usize) -> SurrogateKey {
    group_index as SurrogateKey + 1
}

pub fn artist_identity(record: &RawRecord) -> String {
    normalize_name(&record.artist_name)
}

pub fn album_identity(record: &RawRecord) -> Option<String> {
    non_blank(Some(&record.album_id)).map(str::to_string)
}

pub fn track_identity(record: &RawRecord) -> (String, String) {
    (
        record.track_id.trim().to_string(),
        normalize_name(&record.track_name),
    )
}

#[derive(Clone, Debug, Default)]
pub struct ArtistDimension {
    pub rows: Vec<DimArtist>,
    keys: HashMap<String, SurrogateKey>,
}

impl ArtistDimension {
    /// Key of the artist with this normalized name, or [`UNRESOLVED_KEY`].
    pub fn key_of(&self, normalized_name: &str) -> SurrogateKey {
        self.keys
            .get(normalized_name)
            .copied()
            .unwrap_or(UNRESOLVED_KEY)
    }
}

pub fn build_artists(records: &[RawRecord], stamp: NaiveDateTime) -> ArtistDimension {
    let groups = group_first_seen(records, |r| Some(artist_identity(r)));

    let mut keys = HashMap::with_capacity(groups.len());
    let mut rows = Vec::with_capacity(groups.len());
    for (index, (name, members)) in groups.into_iter().enumerate() {
        let artist_key = surrogate_key(index);
        keys.insert(name.clone(), artist_key);
        rows.push(DimArtist {
            artist_key,
            artist_name: name,
            artist_popularity: members.iter().filter_map(|r| r.artist_popularity).max(),
            artist_followers: members.iter().filter_map(|r| r.artist_followers).max(),
            artist_genres: members
                .iter()
                .find_map(|r| normalize_genres(r.artist_genres.as_deref())),
            created_date: stamp,
            modified_date: stamp,
            effective_from: None,
            effective_to: None,
            is_current: true,
        });
    }
    rows.sort_by(|a, b| a.artist_name.cmp(&b.artist_name));
    ArtistDimension { rows, keys }
}

#[derive(Clone, Debug, Default)]
pub struct DateDimension {
    pub rows: Vec<DimDate>,
    /// Trimmed release-date text to the date it parsed as.
    keys: HashMap<String, DateKey>,
}

impl DateDimension {
    pub fn key_of(&self, release_date: Option<&str>) -> Option<DateKey> {
        self.keys.get(non_blank(release_date)?).copied()
    }
}

pub fn build_dates(records: &[RawRecord], stamp: NaiveDateTime) -> DateDimension {
    let mut keys = HashMap::new();
    let mut by_key = BTreeMap::new();
    for record in records {
        let Some(text) = non_blank(record.album_release_date.as_deref()) else {
            continue;
        };
        if keys.contains_key(text) {
            continue;
        }
        if let Some(date) = parse_release_date(text) {
            let row = DimDate::from_date(date, stamp);
            keys.insert(text.to_string(), row.date_key);
            by_key.entry(row.date_key).or_insert(row);
        }
    }
    DateDimension {
        rows: by_key.into_values().collect(),
        keys,
    }
}

#[derive(Clone, Debug, Default)]
pub struct AlbumDimension {
    pub rows: Vec<DimAlbum>,
    keys: HashMap<String, SurrogateKey>,
}

impl AlbumDimension {
    /// Key of the album with this (untrimmed) id; blank or unknown ids are unresolved.
    pub fn key_of(&self, album_id: &str) -> SurrogateKey {
        non_blank(Some(album_id))
            .and_then(|id| self.keys.get(id).copied())
            .unwrap_or(UNRESOLVED_KEY)
    }
}

pub fn build_albums(
    records: &[RawRecord],
    artists: &ArtistDimension,
    dates: &DateDimension,
    stamp: NaiveDateTime,
) -> AlbumDimension {
    let groups = group_first_seen(records, album_identity);

    let mut keys = HashMap::with_capacity(groups.len());
    let mut rows = Vec::with_capacity(groups.len());
    for (index, (album_id, members)) in groups.into_iter().enumerate() {
        let album_key = surrogate_key(index);
        let first = members[0];
        keys.insert(album_id.clone(), album_key);
        rows.push(DimAlbum {
            album_key,
            spotify_album_id: album_id,
            album_name: normalize_name(&first.album_name),
            artist_key: artists.key_of(&artist_identity(first)),
            album_type: non_blank(first.album_type.as_deref()).map(str::to_string),
            album_total_tracks: first.album_total_tracks,
            release_date_key: dates.key_of(first.album_release_date.as_deref()),
            created_date: stamp,
            modified_date: stamp,
        });
    }
    rows.sort_by(|a, b| a.album_name.cmp(&b.album_name));
    AlbumDimension { rows, keys }
}

#[derive(Clone, Debug, Default)]
pub struct TrackDimension {
    pub rows: Vec<DimTrack>,
    keys: HashMap<(String, String), SurrogateKey>,
}

impl TrackDimension {
    pub fn key_of(&self, identity: &(String, String)) -> SurrogateKey {
        self.keys.get(identity).copied().unwrap_or(UNRESOLVED_KEY)
    }
}

pub fn build_tracks(records: &[RawRecord], stamp: NaiveDateTime) -> TrackDimension {
    let groups = group_first_seen(records, |r| Some(track_identity(r)));

    let mut keys = HashMap::with_capacity(groups.len());
    let mut rows = Vec::with_capacity(groups.len());
    for (index, (identity, members)) in groups.into_iter().enumerate() {
        let track_key = surrogate_key(index);
        let first = members[0];
        keys.insert(identity.clone(), track_key);
        let (spotify_track_id, track_name) = identity;
        rows.push(DimTrack {
            track_key,
            spotify_track_id,
            track_name,
            track_number: first.track_number,
            track_duration_ms: first.track_duration_ms,
            explicit: first.explicit,
            created_date: stamp,
            modified_date: stamp,
        });
    }
    rows.sort_by(|a, b| a.track_name.cmp(&b.track_name));
    TrackDimension { rows, keys }
}
