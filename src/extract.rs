use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::http_client::PageFetcher;
use crate::match_record::MatchRecord;
use crate::page;
use crate::season;
use crate::staging;

#[derive(Debug, Clone)]
pub struct ExtractSummary {
    pub staging_path: PathBuf,
    pub seasons: Vec<i32>,
    pub rows: usize,
    pub preserved_staging: Option<PathBuf>,
}

pub struct ExtractProgress {
    pub current: usize,
    pub total: usize,
    pub season: i32,
    pub message: String,
}

/// Seasons listed on the landing page that fall inside the scrape window.
pub fn discover_seasons(
    config: &PipelineConfig,
    fetcher: &dyn PageFetcher,
    current_year: i32,
) -> Result<Vec<i32>> {
    let url = config.season_url(config.landing_season);
    let html = fetcher
        .fetch_page(&url)
        .context("fetch season selector page")?;
    Ok(season::select_seasons(&html, current_year))
}

pub fn scrape_season(
    config: &PipelineConfig,
    fetcher: &dyn PageFetcher,
    year: i32,
) -> Result<Vec<MatchRecord>> {
    let url = config.season_url(year);
    let html = fetcher
        .fetch_page(&url)
        .with_context(|| format!("fetch season {year}"))?;
    page::parse_season_page(&html).with_context(|| format!("parse season {year}"))
}

/// Scrapes every recent season and replaces the staging file with the result.
///
/// Seasons are concatenated in the order the landing page lists them.
pub fn run_extract(
    config: &PipelineConfig,
    fetcher: &dyn PageFetcher,
    current_year: i32,
    mut on_progress: impl FnMut(ExtractProgress),
) -> Result<ExtractSummary> {
    info!("starting data extraction");
    let seasons = discover_seasons(config, fetcher, current_year)?;
    if seasons.is_empty() {
        return Err(anyhow!(
            "no seasons between {} and {current_year} listed on the landing page",
            current_year - season::SEASON_WINDOW + 1
        ));
    }

    let total = seasons.len();
    let mut all = Vec::new();
    for (idx, year) in seasons.iter().copied().enumerate() {
        on_progress(ExtractProgress {
            current: idx,
            total,
            season: year,
            message: format!("Scraping season {year}"),
        });
        let rows = scrape_season(config, fetcher, year)?;
        if rows.is_empty() {
            warn!(season = year, "season page had no games");
        }
        info!(season = year, rows = rows.len(), "finished season");
        all.extend(rows);
        on_progress(ExtractProgress {
            current: idx + 1,
            total,
            season: year,
            message: format!("Finished season {year}"),
        });
    }

    let staging_path = config.staging_path();
    let preserved_staging =
        staging::write_staging(&staging_path, &all).context("write staging artifact")?;
    info!(
        rows = all.len(),
        path = %staging_path.display(),
        "finished data extraction"
    );

    Ok(ExtractSummary {
        staging_path,
        seasons,
        rows: all.len(),
        preserved_staging,
    })
}
