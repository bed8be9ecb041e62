use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, params};

use crate::match_record::{MatchRecord, MatchResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The ledger schema. Applied on every open; creation is idempotent.
pub const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS "match" (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        home_team TEXT NOT NULL,
        away_team TEXT NOT NULL,
        home_goals INTEGER NOT NULL,
        away_goals INTEGER NOT NULL,
        result TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_match_date ON "match"(date);
"#;

pub struct MatchStore {
    conn: Connection,
    existed: bool,
}

impl MatchStore {
    pub fn open(path: &Path) -> Result<Self> {
        let existed = path.exists();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db dir {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite db {}", path.display()))?;
        let store = Self { conn, existed };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let store = Self {
            conn,
            existed: false,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA_SQL)
            .context("create sqlite schema")
    }

    /// Whether the database file was already on disk before this open.
    pub fn existed(&self) -> bool {
        self.existed
    }

    /// Latest stored match date, `None` for an empty ledger.
    pub fn latest_date(&self) -> Result<Option<NaiveDate>> {
        let raw = self
            .conn
            .query_row(r#"SELECT MAX(date) FROM "match""#, [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .context("query latest match date")?;
        raw.map(|s| parse_date(&s)).transpose()
    }

    /// Inserts all rows in one transaction and returns how many were written.
    pub fn append(&mut self, records: &[MatchRecord]) -> Result<usize> {
        let tx = self
            .conn
            .transaction()
            .context("begin append transaction")?;
        {
            let mut stmt = tx
                .prepare(
                    r#"INSERT INTO "match" (date, home_team, away_team, home_goals, away_goals, result)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                )
                .context("prepare match insert")?;
            for m in records {
                stmt.execute(params![
                    m.date.format(DATE_FORMAT).to_string(),
                    m.home_team,
                    m.away_team,
                    m.home_goals as i64,
                    m.away_goals as i64,
                    m.result.as_str(),
                ])
                .context("insert match")?;
            }
        }
        tx.commit().context("commit append transaction")?;
        Ok(records.len())
    }

    pub fn count(&self) -> Result<usize> {
        let n = self
            .conn
            .query_row(r#"SELECT COUNT(*) FROM "match""#, [], |row| {
                row.get::<_, i64>(0)
            })
            .context("count matches")?;
        Ok(n as usize)
    }

    pub fn load_all(&self) -> Result<Vec<MatchRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"SELECT date, home_team, away_team, home_goals, away_goals, result
                   FROM "match"
                   ORDER BY id ASC"#,
            )
            .context("prepare load matches query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .context("query load matches")?;

        let mut out = Vec::new();
        for row in rows {
            let (date, home_team, away_team, home_goals, away_goals, result) =
                row.context("decode match row")?;
            out.push(MatchRecord {
                date: parse_date(&date)?,
                home_team,
                away_team,
                home_goals,
                away_goals,
                result: MatchResult::parse(&result)?,
            });
        }
        Ok(out)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    // Older ledgers may carry a time part after the date.
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, DATE_FORMAT)
        .with_context(|| format!("invalid stored date {raw:?}"))
}
