use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use tracing::warn;

use crate::match_record::MatchRecord;

/// Set-aside staging files kept next to the staging path; older ones are deleted.
pub const MAX_UNCONSUMED: usize = 5;

pub fn read_staging(path: &Path) -> Result<Vec<MatchRecord>> {
    if !path.exists() {
        return Err(anyhow!("staging file {} not found", path.display()));
    }
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open staging file {}", path.display()))?;
    let mut out = Vec::new();
    for (idx, row) in reader.deserialize::<MatchRecord>().enumerate() {
        let record = row.with_context(|| format!("decode staging row {}", idx + 1))?;
        if !record.result_is_consistent() {
            return Err(anyhow!(
                "staging row {} has result {} for score {}-{}",
                idx + 1,
                record.result.as_str(),
                record.home_goals,
                record.away_goals
            ));
        }
        out.push(record);
    }
    Ok(out)
}

/// Writes the staging file through a temp file and a rename.
///
/// A staging file left behind by a run whose load never completed is moved to
/// `<stem>.<unix_secs>.unconsumed.csv` instead of being overwritten, and only
/// the newest `MAX_UNCONSUMED` of those are kept. Returns the path it was moved
/// to, if any.
pub fn write_staging(path: &Path, records: &[MatchRecord]) -> Result<Option<PathBuf>> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("create staging dir {}", dir.display()))?;
    }

    let preserved = if path.exists() {
        let mut secs = system_time_to_secs(SystemTime::now());
        while unconsumed_path(path, secs).exists() {
            secs += 1;
        }
        let aside = unconsumed_path(path, secs);
        fs::rename(path, &aside).with_context(|| {
            format!("move unconsumed staging file aside to {}", aside.display())
        })?;
        warn!(
            previous = %aside.display(),
            "staging file from an earlier run was never loaded; kept it aside"
        );
        prune_unconsumed(path, MAX_UNCONSUMED)?;
        Some(aside)
    } else {
        None
    };

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("create staging temp file {}", tmp.display()))?;
        for record in records {
            writer.serialize(record).context("write staging row")?;
        }
        if records.is_empty() {
            writer
                .write_record(["date", "home", "away", "home_goals", "away_goals", "result"])
                .context("write staging header")?;
        }
        writer.flush().context("flush staging file")?;
    }
    fs::rename(&tmp, path).context("swap staging file")?;
    Ok(preserved)
}

pub fn remove_staging(path: &Path) -> Result<()> {
    fs::remove_file(path).with_context(|| format!("remove staging file {}", path.display()))
}

/// Set-aside files for `path`, oldest first.
pub fn list_unconsumed(path: &Path) -> Result<Vec<PathBuf>> {
    let Some(dir) = path.parent() else {
        return Ok(Vec::new());
    };
    let stem = staging_stem(path);
    let prefix = format!("{stem}.");
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let entry = entry.context("read staging dir entry")?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(secs) = name
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_suffix(".unconsumed.csv"))
            .and_then(|secs| secs.parse::<u64>().ok())
        else {
            continue;
        };
        found.push((secs, entry.path()));
    }
    found.sort();
    Ok(found.into_iter().map(|(_, p)| p).collect())
}

fn prune_unconsumed(path: &Path, keep: usize) -> Result<()> {
    let found = list_unconsumed(path)?;
    let excess = found.len().saturating_sub(keep);
    for old in found.iter().take(excess) {
        fs::remove_file(old)
            .with_context(|| format!("remove old unconsumed staging {}", old.display()))?;
        warn!(removed = %old.display(), "dropped oldest unconsumed staging file");
    }
    Ok(())
}

fn staging_stem(path: &Path) -> &str {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("staging")
}

fn unconsumed_path(path: &Path, secs: u64) -> PathBuf {
    let stem = staging_stem(path);
    path.with_file_name(format!("{stem}.{secs}.unconsumed.csv"))
}

fn system_time_to_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Vec<MatchRecord> {
        let d = NaiveDate::from_ymd_opt(2023, 4, 15).unwrap();
        vec![
            MatchRecord::new(d, "Santos", "Grêmio", 3, 1),
            MatchRecord::new(d, "Vasco, RJ", "Bahia", 1, 1),
        ]
    }

    #[test]
    fn writes_header_and_iso_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches_results.csv");
        write_staging(&path, &sample()).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        assert_eq!(
            lines.next(),
            Some("date,home,away,home_goals,away_goals,result")
        );
        assert_eq!(lines.next(), Some("2023-04-15,Santos,Grêmio,3,1,H"));
        assert_eq!(lines.next(), Some("2023-04-15,\"Vasco, RJ\",Bahia,1,1,D"));

        assert_eq!(read_staging(&path).unwrap(), sample());
    }

    #[test]
    fn empty_run_still_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches_results.csv");
        write_staging(&path, &[]).unwrap();
        assert!(read_staging(&path).unwrap().is_empty());
    }

    #[test]
    fn unconsumed_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches_results.csv");
        assert!(write_staging(&path, &sample()).unwrap().is_none());

        let aside = write_staging(&path, &sample()[..1]).unwrap().unwrap();
        assert!(aside.exists());
        assert_eq!(read_staging(&aside).unwrap().len(), 2);
        assert_eq!(read_staging(&path).unwrap().len(), 1);
    }

    #[test]
    fn only_newest_unconsumed_files_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches_results.csv");
        for secs in [100u64, 300, 200, 400] {
            fs::write(unconsumed_path(&path, secs), "date,home,away,home_goals,away_goals,result\n")
                .unwrap();
        }
        fs::write(dir.path().join("other.100.unconsumed.csv"), "").unwrap();

        prune_unconsumed(&path, 2).unwrap();

        let left = list_unconsumed(&path).unwrap();
        assert_eq!(
            left,
            vec![unconsumed_path(&path, 300), unconsumed_path(&path, 400)]
        );
        assert!(dir.path().join("other.100.unconsumed.csv").exists());
    }

    #[test]
    fn write_staging_caps_unconsumed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches_results.csv");
        for secs in 1..=(MAX_UNCONSUMED as u64 + 2) {
            fs::write(unconsumed_path(&path, secs), "").unwrap();
        }
        write_staging(&path, &sample()).unwrap();
        write_staging(&path, &sample()).unwrap();

        let left = list_unconsumed(&path).unwrap();
        assert_eq!(left.len(), MAX_UNCONSUMED);
        assert!(!unconsumed_path(&path, 1).exists());
    }

    #[test]
    fn rejects_inconsistent_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(
            &path,
            "date,home,away,home_goals,away_goals,result\n2023-01-01,A,B,2,0,A\n",
        )
        .unwrap();
        assert!(read_staging(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_staging(&dir.path().join("nope.csv")).is_err());
    }
}
