use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::config::PipelineConfig;
use crate::match_record::MatchRecord;
use crate::staging;
use crate::store::MatchStore;

#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub staged: usize,
    pub inserted: usize,
    /// Rows in the ledger after the commit.
    pub stored_total: usize,
    pub watermark: Option<NaiveDate>,
    /// The database file did not exist before this run.
    pub bootstrapped: bool,
}

/// Keeps rows strictly newer than the watermark. A day is either loaded in full or skipped.
pub fn filter_new(records: Vec<MatchRecord>, watermark: Option<NaiveDate>) -> Vec<MatchRecord> {
    match watermark {
        Some(max) => records.into_iter().filter(|r| r.date > max).collect(),
        None => records,
    }
}

/// Appends unseen staged rows to the ledger, then deletes the staging file.
///
/// The staging file survives any failure before the commit.
pub fn run_load(config: &PipelineConfig) -> Result<LoadSummary> {
    info!("starting loading stage");
    let staging_path = config.staging_path();
    let records = staging::read_staging(&staging_path).context("read staging artifact")?;
    let staged = records.len();

    let mut store = MatchStore::open(&config.db_path()).context("open match store")?;
    let bootstrapped = !store.existed();
    let watermark = if bootstrapped {
        None
    } else {
        store.latest_date()?
    };
    info!(
        staged,
        watermark = %watermark.map(|d| d.to_string()).unwrap_or_else(|| "none".to_string()),
        bootstrapped,
        "resolved load watermark"
    );

    let fresh = filter_new(records, watermark);
    let inserted = store.append(&fresh).context("append new matches")?;
    let stored_total = store.count()?;

    staging::remove_staging(&staging_path)?;
    info!(inserted, stored_total, "finished loading stage");

    Ok(LoadSummary {
        staged,
        inserted,
        stored_total,
        watermark,
        bootstrapped,
    })
}
