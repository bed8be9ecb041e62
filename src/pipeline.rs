use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{error, warn};

/// Total attempts per step: the first run plus one retry.
pub const STEP_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Extract,
    Load,
    Run,
}

impl Step {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "extract" => Ok(Step::Extract),
            "load" => Ok(Step::Load),
            "run" => Ok(Step::Run),
            other => Err(anyhow!("unknown step {other:?} (expected extract, load or run)")),
        }
    }
}

/// Runs `f`, retrying once after `delay` if it fails. The last error is returned.
pub fn with_retry<T>(name: &str, delay: Duration, mut f: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 1;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < STEP_ATTEMPTS => {
                warn!(
                    step = name,
                    attempt,
                    delay_secs = delay.as_secs(),
                    "step failed, retrying: {err:#}"
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(err) => {
                error!(step = name, attempt, "step failed: {err:#}");
                return Err(err);
            }
        }
    }
}
