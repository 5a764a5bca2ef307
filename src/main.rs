use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use spotify_warehouse::cli_style::{
    get_styles, print_empty_list, print_error, print_key_value, print_section_footer,
    print_section_header, print_success, print_warning, TableBuilder,
};
use spotify_warehouse::config::{AppConfig, CliConfig, FileConfig};
use spotify_warehouse::pipeline::{check_sources, run_etl, run_timestamp};
use spotify_warehouse::reports::{self, CustomReportFilters, Grouping, Measure};
use spotify_warehouse::warehouse::{open_warehouse, open_warehouse_read_only, table_counts};
use std::path::PathBuf;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(
    name = "warehouse-etl",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"),
    about = "Builds and queries a star-schema warehouse from Spotify CSV exports",
    styles = get_styles()
)]
struct CliArgs {
    /// TOML config file. Its values take precedence over command line flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite warehouse database.
    #[clap(long, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// Print results as JSON instead of a table.
    #[clap(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract both CSV files, rebuild the star schema and load it.
    Etl(EtlArgs),
    /// Show row counts and headline numbers of the warehouse.
    Status,
    /// Run a report against the loaded warehouse.
    #[command(subcommand)]
    Report(ReportCommand),
}

#[derive(Args, Debug)]
struct EtlArgs {
    /// Contemporary export (track duration in minutes).
    #[clap(long, value_parser = parse_path)]
    pub spotify_data: Option<PathBuf>,

    /// Historic export (track duration in milliseconds).
    #[clap(long, value_parser = parse_path)]
    pub track_data: Option<PathBuf>,

    /// Keep existing warehouse rows instead of replacing them.
    #[clap(long)]
    pub no_full_refresh: bool,

    /// Fail the load when a foreign key has no loaded dimension row.
    #[clap(long)]
    pub strict_keys: bool,
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Artists with the highest average track popularity in a release year.
    TopArtists {
        #[clap(long)]
        year: i32,
        #[clap(long, default_value_t = 10)]
        limit: usize,
    },
    /// Average track popularity per release year.
    PopularityTrend {
        #[clap(long)]
        min_year: Option<i32>,
        #[clap(long)]
        max_year: Option<i32>,
    },
    /// Average audio features of the artists matching a name fragment.
    AudioProfile {
        #[clap(long)]
        artist: String,
        #[clap(long)]
        min_year: Option<i32>,
        #[clap(long)]
        max_year: Option<i32>,
    },
    /// Most popular tracks of the artists matching a name fragment.
    TopTracks {
        #[clap(long)]
        artist: String,
        #[clap(long, default_value_t = 20)]
        limit: usize,
    },
    /// Compare two artists side by side.
    Compare {
        #[clap(long)]
        artist1: String,
        #[clap(long)]
        artist2: String,
        #[clap(long)]
        min_year: Option<i32>,
        #[clap(long)]
        max_year: Option<i32>,
    },
    /// Average one measure per group.
    Custom {
        #[clap(long, value_enum)]
        measure: Measure,
        #[clap(long, value_enum)]
        group_by: Grouping,
        #[clap(long)]
        min_year: Option<i32>,
        #[clap(long)]
        max_year: Option<i32>,
        #[clap(long)]
        min_popularity: Option<i32>,
        #[clap(long)]
        artist: Option<String>,
    },
}

fn fmt_avg(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

/// Prints `value` as JSON, or the table built from it.
fn emit<T: Serialize>(json: bool, value: &T, table: impl FnOnce() -> TableBuilder) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
        return Ok(());
    }
    let table = table();
    if table.is_empty() {
        print_empty_list("No rows");
    } else {
        table.print()?;
    }
    Ok(())
}

fn cmd_etl(config: &AppConfig, json: bool) -> Result<()> {
    if !json {
        print_section_header("ETL");
        print_key_value("Database", &config.db_path.display().to_string());
        print_key_value(
            "Contemporary source",
            &config.sources.contemporary.display().to_string(),
        );
        print_key_value("Historic source", &config.sources.historic.display().to_string());
        print_key_value("Full refresh", &config.load.clear_existing.to_string());
        print_section_footer();
    }

    for missing in config.sources.missing() {
        print_error(&format!("Source file not found: {}", missing.display()));
    }
    check_sources(&config.sources)?;

    let conn = open_warehouse(&config.db_path)?;
    let summary = run_etl(&conn, &config.sources, &config.load, run_timestamp())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    print_success(&format!(
        "Loaded {} rows from {} source records",
        summary.loaded.total(),
        summary.extracted
    ));
    if summary.dropped_facts > 0 {
        print_warning(&format!(
            "{} records had no resolvable track, artist or album and were skipped",
            summary.dropped_facts
        ));
    }
    let loaded = &summary.loaded;
    let mut table = TableBuilder::new(&["Table", "Rows"]).align_right(1);
    for (name, rows) in [
        ("DimArtist", loaded.artists),
        ("DimDate", loaded.dates),
        ("DimAlbum", loaded.albums),
        ("DimTrack", loaded.tracks),
        ("FactTrack", loaded.facts),
    ] {
        table.add_row(vec![name.to_string(), rows.to_string()]);
    }
    table.print()?;
    Ok(())
}

fn cmd_status(config: &AppConfig, json: bool) -> Result<()> {
    let conn = open_warehouse_read_only(&config.db_path)?;
    let counts = table_counts(&conn)?;
    let summary = reports::warehouse_summary(&conn)?;

    if json {
        let value = serde_json::json!({ "tables": counts, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    print_section_header("Warehouse");
    print_key_value("Database", &config.db_path.display().to_string());
    print_key_value("Artists", &counts.artists.to_string());
    print_key_value("Albums", &counts.albums.to_string());
    print_key_value("Tracks", &counts.tracks.to_string());
    print_key_value("Dates", &counts.dates.to_string());
    print_key_value("Facts", &counts.facts.to_string());
    print_key_value("Average popularity", &fmt_avg(summary.avg_popularity));
    print_key_value(
        "Artist with most tracks",
        summary.most_tracks_artist.as_deref().unwrap_or("-"),
    );
    print_key_value(
        "Most active year",
        &summary
            .most_active_year
            .map_or_else(|| "-".to_string(), |y| y.to_string()),
    );
    print_section_footer();
    Ok(())
}

fn cmd_report(config: &AppConfig, report: ReportCommand, json: bool) -> Result<()> {
    let conn = open_warehouse_read_only(&config.db_path)?;
    match report {
        ReportCommand::TopArtists { year, limit } => {
            let rows = reports::top_artists_by_year(&conn, year, limit)?;
            emit(json, &rows, || {
                let mut table = TableBuilder::new(&["Artist", "Avg popularity", "Tracks"])
                    .align_right(1)
                    .align_right(2);
                for r in &rows {
                    table.add_row(vec![
                        r.artist_name.clone(),
                        fmt_avg(r.avg_popularity),
                        r.track_count.to_string(),
                    ]);
                }
                table
            })
        }
        ReportCommand::PopularityTrend { min_year, max_year } => {
            let rows = reports::popularity_trend_by_year(&conn, min_year, max_year)?;
            emit(json, &rows, || {
                let mut table = TableBuilder::new(&["Year", "Avg popularity", "Tracks"])
                    .align_right(1)
                    .align_right(2);
                for r in &rows {
                    table.add_row(vec![
                        r.year.to_string(),
                        fmt_avg(r.avg_popularity),
                        r.track_count.to_string(),
                    ]);
                }
                table
            })
        }
        ReportCommand::AudioProfile {
            artist,
            min_year,
            max_year,
        } => {
            let rows = reports::audio_profile(&conn, &artist, min_year, max_year)?;
            emit(json, &rows, || {
                let mut table = TableBuilder::new(&[
                    "Artist", "Energy", "Dance", "Valence", "Tempo", "Acoustic", "Instr.",
                    "Live", "Speech", "Loudness", "Tracks",
                ]);
                for column in 1..=10 {
                    table = table.align_right(column);
                }
                for r in &rows {
                    table.add_row(vec![
                        r.artist_name.clone(),
                        fmt_avg(r.avg_energy),
                        fmt_avg(r.avg_danceability),
                        fmt_avg(r.avg_valence),
                        fmt_avg(r.avg_tempo),
                        fmt_avg(r.avg_acousticness),
                        fmt_avg(r.avg_instrumentalness),
                        fmt_avg(r.avg_liveness),
                        fmt_avg(r.avg_speechiness),
                        fmt_avg(r.avg_loudness),
                        r.track_count.to_string(),
                    ]);
                }
                table
            })
        }
        ReportCommand::TopTracks { artist, limit } => {
            let rows = reports::top_tracks_for_artist(&conn, &artist, limit)?;
            emit(json, &rows, || {
                let mut table = TableBuilder::new(&["Track", "Artist", "Year", "Popularity"])
                    .align_right(2)
                    .align_right(3);
                for r in &rows {
                    table.add_row(vec![
                        r.track_name.clone(),
                        r.artist_name.clone(),
                        r.year.to_string(),
                        r.popularity.map_or_else(|| "-".to_string(), |p| p.to_string()),
                    ]);
                }
                table
            })
        }
        ReportCommand::Compare {
            artist1,
            artist2,
            min_year,
            max_year,
        } => {
            let comparison =
                reports::compare_two_artists(&conn, &artist1, &artist2, min_year, max_year)?;
            emit(json, &comparison, || {
                let mut table = TableBuilder::new(&[
                    "Artist",
                    "Popularity",
                    "Energy",
                    "Dance",
                    "Valence",
                    "Tracks",
                ]);
                for column in 1..=5 {
                    table = table.align_right(column);
                }
                for stats in [&comparison.first, &comparison.second].into_iter().flatten() {
                    table.add_row(vec![
                        stats.artist_name.clone(),
                        fmt_avg(stats.avg_popularity),
                        fmt_avg(stats.avg_energy),
                        fmt_avg(stats.avg_danceability),
                        fmt_avg(stats.avg_valence),
                        stats.track_count.to_string(),
                    ]);
                }
                table
            })
        }
        ReportCommand::Custom {
            measure,
            group_by,
            min_year,
            max_year,
            min_popularity,
            artist,
        } => {
            let filters = CustomReportFilters {
                min_year,
                max_year,
                min_popularity,
                artist,
            };
            let rows = reports::run_custom_report(&conn, measure, group_by, &filters)?;
            emit(json, &rows, || {
                let mut table = TableBuilder::new(&["Group", "Average", "Tracks"])
                    .align_right(1)
                    .align_right(2);
                for r in &rows {
                    table.add_row(vec![
                        r.label(),
                        fmt_avg(r.avg_value()),
                        r.track_count().to_string(),
                    ]);
                }
                table
            })
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    // Logs go to stderr so `--json` output stays machine readable.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };

    let mut cli_config = CliConfig {
        db_path: cli_args.db.clone(),
        ..Default::default()
    };
    if let Command::Etl(etl) = &cli_args.command {
        cli_config.spotify_data_clean = etl.spotify_data.clone();
        cli_config.track_data_final = etl.track_data.clone();
        cli_config.no_full_refresh = etl.no_full_refresh;
        cli_config.strict_key_remap = etl.strict_keys;
    }
    let config = AppConfig::resolve(&cli_config, file_config);

    let result = match cli_args.command {
        Command::Etl(_) => cmd_etl(&config, cli_args.json),
        Command::Status => cmd_status(&config, cli_args.json),
        Command::Report(report) => cmd_report(&config, report, cli_args.json),
    };
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
