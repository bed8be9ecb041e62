use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "A")]
    Away,
    #[serde(rename = "D")]
    Draw,
}

impl MatchResult {
    pub fn from_goals(home_goals: u32, away_goals: u32) -> Self {
        if home_goals > away_goals {
            MatchResult::Home
        } else if home_goals < away_goals {
            MatchResult::Away
        } else {
            MatchResult::Draw
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchResult::Home => "H",
            MatchResult::Away => "A",
            MatchResult::Draw => "D",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "H" => Ok(MatchResult::Home),
            "A" => Ok(MatchResult::Away),
            "D" => Ok(MatchResult::Draw),
            other => Err(anyhow!("unknown match result {other:?}")),
        }
    }
}

/// One finished game. Column names follow the staging file header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: NaiveDate,
    #[serde(rename = "home")]
    pub home_team: String,
    #[serde(rename = "away")]
    pub away_team: String,
    pub home_goals: u32,
    pub away_goals: u32,
    pub result: MatchResult,
}

impl MatchRecord {
    pub fn new(
        date: NaiveDate,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        home_goals: u32,
        away_goals: u32,
    ) -> Self {
        Self {
            date,
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_goals,
            away_goals,
            result: MatchResult::from_goals(home_goals, away_goals),
        }
    }

    pub fn result_is_consistent(&self) -> bool {
        self.result == MatchResult::from_goals(self.home_goals, self.away_goals)
    }
}
