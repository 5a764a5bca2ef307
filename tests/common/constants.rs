//! Shared constants for end-to-end tests
//!
//! The standard fixture has nine source rows: five in the contemporary export and four
//! in the historic one. When the fixture rows change, update the expectations here.

pub const CONTEMPORARY_HEADER: &str = "track_id,track_name,track_number,track_popularity,\
track_duration_min,explicit,artist_name,artist_popularity,artist_followers,artist_genres,\
album_id,album_name,album_release_date,album_total_tracks,album_type,\
energy,danceability,valence,tempo";

pub const HISTORIC_HEADER: &str = "track_id,track_name,track_number,track_popularity,\
track_duration_ms,explicit,artist_name,artist_popularity,artist_followers,artist_genres,\
album_id,album_name,album_release_date,album_total_tracks,album_type";

pub const STANDARD_CONTEMPORARY_ROWS: &[&str] = &[
    "c1,One More Time,1,80,5.33,FALSE,Daft Punk,70,9000000,\"french house, electro\",alb-discovery,Discovery,2001-03-12,14,album,0.70,0.61,0.47,122.7",
    "c2,Aerodynamic,2,75,3.5,false, daft punk ,85,9100000,,alb-discovery,discovery,2001-03-12,14,album,0.80,0.55,0.30,123.0",
    "c3,Uprising,1,78,5.09,TRUE,Muse,77,8000000,\"rock, alternative rock\",alb-resistance,The Resistance,2009-09-14,11,album,0.90,0.50,0.40,128.0",
    "c4,Lost Song,1,10,2.0,,Nobody Known,,,N/A,,Orphan Album,2010-01-01,1,single,,,,",
    "c5,Weird Date,1,33,4.0,TRUE,Muse,60,7000000,,alb-live,Live At Rome,not-a-date,20,compilation,0.85,0.45,0.35,126.0",
];

pub const STANDARD_HISTORIC_ROWS: &[&str] = &[
    "h1,Creep,2,82,238640,False,Radiohead,79.0,8123456.0,\"['alternative rock', 'art rock']\",alb-pablo,Pablo Honey,1993-02-22,12,album",
    "h2,Karma Police,6,84,264066,False,RADIOHEAD,81.0,8200000.0,[],alb-okc,OK Computer,1997-05-21,12,album",
    "c3,uprising,1,79,304840,True,muse,80.0,8100000.0,\"['rock']\",alb-resistance,The Resistance,2009-09-14,11,album",
    "h4,Blank Date,3,40,200000,true,Radiohead,,,,alb-okc,OK Computer,,12,album",
];

pub const STANDARD_EXTRACTED: usize = 9;
pub const STANDARD_ARTISTS: usize = 4;
pub const STANDARD_ALBUMS: usize = 5;
pub const STANDARD_TRACKS: usize = 8;
pub const STANDARD_DATES: usize = 5;
pub const STANDARD_FACTS: usize = 8;
pub const STANDARD_DROPPED: usize = 1;
