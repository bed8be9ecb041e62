use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const STAGING_FILE: &str = "matches_results.csv";
pub const DB_FILE: &str = "match_results.db";
pub const DEFAULT_ORIGIN: &str =
    "https://www.cbf.com.br/futebol-brasileiro/competicoes/campeonato-brasileiro-serie-a/";
pub const DEFAULT_LANDING_SEASON: i32 = 2021;
const DEFAULT_RETRY_DELAY_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub staging_dir: PathBuf,
    pub db_dir: PathBuf,
    pub admin_email: Option<String>,
    pub origin: String,
    pub landing_season: i32,
    pub retry_delay: Duration,
}

impl PipelineConfig {
    pub fn new(staging_dir: impl Into<PathBuf>, db_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            db_dir: db_dir.into(),
            admin_email: None,
            origin: DEFAULT_ORIGIN.to_string(),
            landing_season: DEFAULT_LANDING_SEASON,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }

    /// Reads `STAGING_AREA_FOLDER` and `DB_FOLDER` (required) plus the optional overrides.
    /// Call `load_dotenv` first if `.env` files should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(non_empty_env, DirOverrides::default())
    }

    /// Like `from_env`, but directories given in `dirs` replace the env variables.
    /// A directory is only required from the env when no override is given.
    pub fn from_env_with(dirs: DirOverrides) -> Result<Self> {
        Self::from_lookup(non_empty_env, dirs)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, dirs: DirOverrides) -> Result<Self> {
        let staging_dir = match dirs.staging_dir {
            Some(dir) => dir,
            None => required_dir(&lookup, "STAGING_AREA_FOLDER")?,
        };
        let db_dir = match dirs.db_dir {
            Some(dir) => dir,
            None => required_dir(&lookup, "DB_FOLDER")?,
        };
        let mut cfg = Self::new(staging_dir, db_dir);

        cfg.admin_email = lookup("ADMIN_USER_EMAIL");
        if let Some(origin) = lookup("SOCCER_ORIGIN") {
            cfg.origin = origin;
        }
        if let Some(raw) = lookup("SOCCER_LANDING_SEASON") {
            cfg.landing_season = raw
                .parse::<i32>()
                .with_context(|| format!("invalid SOCCER_LANDING_SEASON {raw:?}"))?;
        }
        if let Some(raw) = lookup("SOCCER_RETRY_DELAY_SECS") {
            let secs = raw
                .parse::<u64>()
                .with_context(|| format!("invalid SOCCER_RETRY_DELAY_SECS {raw:?}"))?;
            cfg.retry_delay = Duration::from_secs(secs);
        }
        Ok(cfg)
    }

    pub fn staging_path(&self) -> PathBuf {
        self.staging_dir.join(STAGING_FILE)
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_dir.join(DB_FILE)
    }

    pub fn season_url(&self, year: i32) -> String {
        season_url(&self.origin, year)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DirOverrides {
    pub staging_dir: Option<PathBuf>,
    pub db_dir: Option<PathBuf>,
}

pub fn season_url(origin: &str, year: i32) -> String {
    if origin.ends_with('/') {
        format!("{origin}{year}")
    } else {
        format!("{origin}/{year}")
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

fn required_dir(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<PathBuf> {
    let raw = lookup(key).with_context(|| format!("{key} is not set"))?;
    Ok(PathBuf::from(raw))
}

fn non_empty_env(key: &str) -> Option<String> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}
