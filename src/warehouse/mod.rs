mod models;
mod schema;
mod store;

pub use models::{
    date_key, AudioFeatures, DateKey, DimAlbum, DimArtist, DimDate, DimTrack, FactTrack,
    SurrogateKey, UNRESOLVED_KEY,
};
pub use schema::{
    DIM_ALBUM_TABLE, DIM_ARTIST_TABLE, DIM_DATE_TABLE, DIM_TRACK_TABLE, FACT_TRACK_TABLE,
    WAREHOUSE_TABLES_IN_LOAD_ORDER, WAREHOUSE_VERSIONED_SCHEMAS,
};
pub use store::{
    clear_warehouse, open_warehouse, open_warehouse_in_memory, open_warehouse_read_only,
    read_albums, read_artists, read_dates, read_facts, read_tracks, table_counts, TableCounts,
};
