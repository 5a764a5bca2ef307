//! The whole ETL run: pre-flight, extract, transform, load.

use crate::extract::{extract_records, SourceFiles};
use crate::load::{load_warehouse, LoadOptions};
use crate::transform::transform;
use crate::warehouse::TableCounts;
use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDateTime, SubsecRound};
use rusqlite::Connection;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EtlSummary {
    pub extracted: usize,
    pub dropped_facts: usize,
    pub loaded: TableCounts,
}

/// Local time of this run, to whole seconds.
pub fn run_timestamp() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Fails, naming every missing file, unless both source files exist.
pub fn check_sources(sources: &SourceFiles) -> Result<()> {
    let missing = sources.missing();
    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(|p| format!("{:?}", p)).collect();
        bail!("Missing source file(s): {}", names.join(", "));
    }
    Ok(())
}

pub fn run_etl(
    conn: &Connection,
    sources: &SourceFiles,
    options: &LoadOptions,
    run_timestamp: NaiveDateTime,
) -> Result<EtlSummary> {
    check_sources(sources)?;
    let start = Instant::now();

    let records = extract_records(sources).context("Extract failed")?;
    info!("Extract finished in {:?}", start.elapsed());

    let data = transform(&records, run_timestamp).context("Transform failed")?;
    info!("Transform finished in {:?}", start.elapsed());

    let loaded = load_warehouse(conn, &data, options).context("Load failed")?;
    info!("Load finished in {:?}", start.elapsed());

    Ok(EtlSummary {
        extracted: records.len(),
        dropped_facts: data.dropped_facts,
        loaded,
    })
}
