use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use tracing::info;
use tracing_subscriber::EnvFilter;

use soccer_results::config::{self, DirOverrides, PipelineConfig};
use soccer_results::extract::{self, ExtractSummary};
use soccer_results::http_client::HttpFetcher;
use soccer_results::load::{self, LoadSummary};
use soccer_results::pipeline::{Step, with_retry};

fn main() {
    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let setup = parse_step().and_then(|step| {
        let dirs = DirOverrides {
            staging_dir: parse_path_arg("--staging-dir"),
            db_dir: parse_path_arg("--db-dir"),
        };
        Ok((step, PipelineConfig::from_env_with(dirs)?))
    });
    let (step, cfg) = match setup {
        Ok(setup) => setup,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(step, &cfg) {
        eprintln!("error: {err:#}");
        if let Some(contact) = cfg.admin_email.as_deref() {
            eprintln!("operator contact: {contact}");
        }
        std::process::exit(1);
    }
}

fn parse_step() -> Result<Step> {
    match parse_step_arg() {
        Some(raw) => Step::parse(&raw),
        None => Ok(Step::Run),
    }
}

fn run(step: Step, cfg: &PipelineConfig) -> Result<()> {
    match step {
        Step::Extract => print_extract(&extract_step(cfg)?),
        Step::Load => print_load(&load::run_load(cfg)?),
        Step::Run => {
            let summary = with_retry("extract", cfg.retry_delay, || extract_step(cfg))?;
            print_extract(&summary);
            let summary = with_retry("load", cfg.retry_delay, || load::run_load(cfg))?;
            print_load(&summary);
        }
    }
    Ok(())
}

fn extract_step(cfg: &PipelineConfig) -> Result<ExtractSummary> {
    let fetcher = HttpFetcher::new()?;
    let current_year = Local::now().year();
    extract::run_extract(cfg, &fetcher, current_year, |p| {
        info!(season = p.season, "[{}/{}] {}", p.current, p.total, p.message);
    })
    .context("extraction stage failed")
}

fn print_extract(summary: &ExtractSummary) {
    println!("Extraction complete");
    println!("Staging: {}", summary.staging_path.display());
    println!("Seasons: {:?}", summary.seasons);
    println!("Rows staged: {}", summary.rows);
    if let Some(path) = summary.preserved_staging.as_ref() {
        println!("Unconsumed staging kept at: {}", path.display());
    }
}

fn print_load(summary: &LoadSummary) {
    println!("Load complete");
    println!("Rows staged: {}", summary.staged);
    println!("Rows inserted: {}", summary.inserted);
    println!("Rows in store: {}", summary.stored_total);
    match summary.watermark {
        Some(date) => println!("Previous watermark: {date}"),
        None if summary.bootstrapped => println!("Previous watermark: none (new store)"),
        None => println!("Previous watermark: none"),
    }
}

fn parse_step_arg() -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--staging-dir" || arg == "--db-dir" {
            skip_next = true;
            continue;
        }
        if !arg.starts_with("--") {
            return Some(arg.clone());
        }
    }
    None
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(prefix.as_str()) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
