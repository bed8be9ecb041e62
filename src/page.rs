use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::debug;

use crate::match_record::MatchRecord;

pub type TeamMap = HashMap<String, String>;

const SCHEDULE_TAG: &str = "chart-time";
const SCHEDULE_ATTR: &str = ":data";

static TEAM_IMG: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.col-xs-4.nopadding.p-t-5.p-b-5.bg-white img").unwrap());
static SCHEDULE: Lazy<Selector> = Lazy::new(|| Selector::parse(SCHEDULE_TAG).unwrap());

/// One entry of an embedded schedule block. Extra keys are ignored, missing ones are not.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGame {
    #[serde(rename = "data")]
    pub date: String,
    #[serde(rename = "time1")]
    pub home: RawSide,
    #[serde(rename = "time2")]
    pub away: RawSide,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSide {
    #[serde(rename = "escudo")]
    pub badge: String,
    #[serde(rename = "gols")]
    pub goals: u32,
}

/// Badge image url -> team name. The first `alt` seen for a `src` wins.
pub fn parse_team_map(document: &Html) -> TeamMap {
    let mut map = TeamMap::new();
    for img in document.select(&TEAM_IMG) {
        let (Some(src), Some(alt)) = (img.value().attr("src"), img.value().attr("alt")) else {
            continue;
        };
        map.entry(strip_escapes(src))
            .or_insert_with(|| alt.trim().to_string());
    }
    map
}

/// Every `<chart-time :data=...>` payload on the page.
pub fn parse_schedule_blocks(document: &Html) -> Result<Vec<Vec<RawGame>>> {
    let mut blocks = Vec::new();
    for (idx, element) in document.select(&SCHEDULE).enumerate() {
        let raw = element
            .value()
            .attr(SCHEDULE_ATTR)
            .ok_or_else(|| anyhow!("schedule block {idx} has no {SCHEDULE_ATTR} attribute"))?;
        let games = parse_schedule_json(raw)
            .with_context(|| format!("invalid schedule block {idx}"))?;
        debug!(block = idx, games = games.len(), "parsed schedule block");
        blocks.push(games);
    }
    Ok(blocks)
}

pub fn parse_schedule_json(raw: &str) -> Result<Vec<RawGame>> {
    serde_json::from_str::<Vec<RawGame>>(raw.trim()).context("schedule json does not match schema")
}

/// `05\/03\/2021` (day/month/year, separators possibly escaped) -> 2021-03-05.
pub fn normalize_date(raw: &str) -> Result<NaiveDate> {
    let cleaned = strip_escapes(raw);
    let parts = cleaned.trim().split('/').collect::<Vec<_>>();
    let [day, month, year] = parts.as_slice() else {
        return Err(anyhow!("unexpected date format {raw:?}"));
    };
    let iso = format!("{}-{}-{}", year.trim(), month.trim(), day.trim());
    NaiveDate::parse_from_str(&iso, "%Y-%m-%d").with_context(|| format!("invalid date {raw:?}"))
}

pub fn resolve_game(game: &RawGame, teams: &TeamMap) -> Result<MatchRecord> {
    let date = normalize_date(&game.date)?;
    let home = lookup_team(teams, &game.home.badge)?;
    let away = lookup_team(teams, &game.away.badge)?;
    Ok(MatchRecord::new(
        date,
        home,
        away,
        game.home.goals,
        game.away.goals,
    ))
}

/// Season page -> deduplicated records sorted by date.
///
/// The team map is built from the whole page before any game is resolved, so
/// badge order on the page does not matter.
pub fn parse_season_page(html: &str) -> Result<Vec<MatchRecord>> {
    let document = Html::parse_document(html);
    let teams = parse_team_map(&document);
    let blocks = parse_schedule_blocks(&document)?;

    let mut records = Vec::new();
    for game in blocks.iter().flatten() {
        records.push(resolve_game(game, &teams)?);
    }
    Ok(dedup_sorted(records))
}

pub fn dedup_sorted(records: Vec<MatchRecord>) -> Vec<MatchRecord> {
    let mut seen = HashSet::new();
    let mut out = records
        .into_iter()
        .filter(|r| seen.insert(r.clone()))
        .collect::<Vec<_>>();
    out.sort_by_key(|r| r.date);
    out
}

fn lookup_team<'a>(teams: &'a TeamMap, badge: &str) -> Result<&'a str> {
    let key = strip_escapes(badge);
    teams
        .get(&key)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("no team name for badge {key}"))
}

fn strip_escapes(raw: &str) -> String {
    raw.replace('\\', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_record::MatchResult;

    fn teams() -> TeamMap {
        let mut map = TeamMap::new();
        map.insert("a.png".to_string(), "Alpha".to_string());
        map.insert("b.png".to_string(), "Beta".to_string());
        map
    }

    #[test]
    fn normalize_date_reverses_escaped_slashes() {
        let d = normalize_date(r"05\/03\/2021").unwrap();
        assert_eq!(d.to_string(), "2021-03-05");
        assert_eq!(normalize_date("05/03/2021").unwrap(), d);
    }

    #[test]
    fn normalize_date_rejects_garbage() {
        assert!(normalize_date("2021-03-05").is_err());
        assert!(normalize_date("32/01/2021").is_err());
        assert!(normalize_date("").is_err());
    }

    #[test]
    fn schedule_json_rejects_wrong_shapes() {
        assert!(parse_schedule_json("{}").is_err());
        assert!(parse_schedule_json(r#"[{"data":"01/01/2021"}]"#).is_err());
        assert!(
            parse_schedule_json(
                r#"[{"data":"01/01/2021","time1":{"escudo":"a.png","gols":"x"},"time2":{"escudo":"b.png","gols":1}}]"#
            )
            .is_err()
        );
        assert!(
            parse_schedule_json(
                r#"[{"data":"01/01/2021","time1":{"escudo":"a.png","gols":-1},"time2":{"escudo":"b.png","gols":1}}]"#
            )
            .is_err()
        );
        assert!(parse_schedule_json("__import__('os')").is_err());
    }

    #[test]
    fn schedule_json_ignores_extra_keys() {
        let games = parse_schedule_json(
            r#"[{"data":"01\/02\/2021","rodada":3,"time1":{"escudo":"a.png","gols":2,"nome":"x"},"time2":{"escudo":"b.png","gols":2}}]"#,
        )
        .unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].home.goals, 2);
    }

    #[test]
    fn resolve_game_maps_badges_and_result() {
        let game = RawGame {
            date: r"10\/04\/2022".to_string(),
            home: RawSide {
                badge: r"a.png".to_string(),
                goals: 0,
            },
            away: RawSide {
                badge: r"b\.png".to_string(),
                goals: 1,
            },
        };
        let rec = resolve_game(&game, &teams()).unwrap();
        assert_eq!(rec.home_team, "Alpha");
        assert_eq!(rec.away_team, "Beta");
        assert_eq!(rec.result, MatchResult::Away);
    }

    #[test]
    fn resolve_game_fails_on_unknown_badge() {
        let game = RawGame {
            date: "10/04/2022".to_string(),
            home: RawSide {
                badge: "zzz.png".to_string(),
                goals: 0,
            },
            away: RawSide {
                badge: "b.png".to_string(),
                goals: 1,
            },
        };
        let err = resolve_game(&game, &teams()).unwrap_err();
        assert!(err.to_string().contains("zzz.png"));
    }

    #[test]
    fn dedup_collapses_identical_rows() {
        let d1 = NaiveDate::from_ymd_opt(2021, 6, 2).unwrap();
        let d0 = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let rows = vec![
            MatchRecord::new(d1, "Alpha", "Beta", 1, 0),
            MatchRecord::new(d0, "Beta", "Alpha", 2, 2),
            MatchRecord::new(d1, "Alpha", "Beta", 1, 0),
        ];
        let out = dedup_sorted(rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].date, d0);
        assert_eq!(out[1].date, d1);
    }

    #[test]
    fn team_map_first_alt_wins() {
        let html = r#"
            <div class="col-xs-4 nopadding p-t-5 p-b-5 bg-white"><img src="a.png" alt="Alpha"></div>
            <div class="col-xs-4 nopadding p-t-5 p-b-5 bg-white"><img src="a.png" alt="Alpha FC"></div>
            <div class="col-xs-4 nopadding p-t-5 p-b-5 bg-white"><img alt="No source"></div>
            <div class="other"><img src="c.png" alt="Ignored"></div>
        "#;
        let map = parse_team_map(&Html::parse_document(html));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a.png").map(String::as_str), Some("Alpha"));
    }
}
