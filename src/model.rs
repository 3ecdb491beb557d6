use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ranking::Metric;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamStatLine {
    pub rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    pub turnovers: u32,
    pub fouls: u32,
    pub two_pm: u32,
    pub two_pa: u32,
    pub three_pm: u32,
    pub three_pa: u32,
    pub ftm: u32,
    pub fta: u32,
    // Advanced splits are only reported by some feeds.
    pub fast_break_points: Option<u32>,
    pub paint_points: Option<u32>,
    pub bench_points: Option<u32>,
    pub points_off_turnovers: Option<u32>,
    pub second_chance_points: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStatLine {
    pub points: u32,
    pub rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    pub turnovers: u32,
    pub fouls: u32,
    pub two_pm: u32,
    pub two_pa: u32,
    pub three_pm: u32,
    pub three_pa: u32,
    pub ftm: u32,
    pub fta: u32,
    pub minutes: f64,
    pub plus_minus: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamBoxScore {
    pub name: String,
    #[serde(default)]
    pub is_home: bool,
    pub score: u32,
    /// Q1..Q4, followed by overtime periods when played.
    #[serde(default)]
    pub quarters: Vec<u32>,
    #[serde(default)]
    pub stats: Option<TeamStatLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBoxScore {
    pub player_id: u32,
    #[serde(default)]
    pub jersey: Option<String>,
    pub team: String,
    #[serde(default)]
    pub starter: Option<bool>,
    #[serde(default)]
    pub stats: PlayerStatLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub season: Option<String>,
    pub teams: Vec<TeamBoxScore>,
    #[serde(default)]
    pub players: Vec<PlayerBoxScore>,
}

impl GameRecord {
    pub fn team(&self, name: &str) -> Option<&TeamBoxScore> {
        self.teams.iter().find(|t| t.name == name)
    }

    pub fn opponent_of(&self, name: &str) -> Option<&TeamBoxScore> {
        if self.team(name).is_none() {
            return None;
        }
        self.teams.iter().find(|t| t.name != name)
    }

    pub fn features(&self, name: &str) -> bool {
        self.team(name).is_some()
    }

    pub fn involves_both(&self, a: &str, b: &str) -> bool {
        self.features(a) && self.features(b)
    }

    /// Own and opposing box score. A record missing either side is malformed.
    pub fn sides(&self, team: &str) -> Result<(&TeamBoxScore, &TeamBoxScore)> {
        let own = self
            .team(team)
            .ok_or_else(|| anyhow!("game {} has no box score for {team}", self.id))?;
        let opp = self
            .opponent_of(team)
            .ok_or_else(|| anyhow!("game {} has no opponent box score for {team}", self.id))?;
        Ok((own, opp))
    }

    /// Final margin from `team`'s point of view.
    pub fn margin_for(&self, team: &str) -> Result<i32> {
        let (own, opp) = self.sides(team)?;
        Ok(own.score as i32 - opp.score as i32)
    }

    pub fn players_for<'a>(&'a self, team: &'a str) -> impl Iterator<Item = &'a PlayerBoxScore> {
        self.players.iter().filter(move |p| p.team == team)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueStandingEntry {
    pub team: String,
    pub rank: usize,
    pub wins: u32,
    pub losses: u32,
    pub win_pct: f64,
    pub point_diff: i64,
    #[serde(default)]
    pub metric_ranks: BTreeMap<Metric, usize>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn team_box(name: &str, is_home: bool, score: u32) -> TeamBoxScore {
        TeamBoxScore {
            name: name.to_string(),
            is_home,
            score,
            quarters: Vec::new(),
            stats: None,
        }
    }

    pub fn game(id: &str, date: &str, home: (&str, u32), away: (&str, u32)) -> GameRecord {
        GameRecord {
            id: id.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid test date"),
            season: Some("2025".to_string()),
            teams: vec![team_box(home.0, true, home.1), team_box(away.0, false, away.1)],
            players: Vec::new(),
        }
    }

    pub fn player(id: u32, team: &str, points: u32, minutes: f64) -> PlayerBoxScore {
        PlayerBoxScore {
            player_id: id,
            jersey: Some(id.to_string()),
            team: team.to_string(),
            starter: Some(true),
            stats: PlayerStatLine {
                points,
                minutes,
                ..PlayerStatLine::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn margin_is_from_requested_side() {
        let g = game("g1", "2025-01-02", ("A", 90), ("B", 80));
        assert_eq!(g.margin_for("A").unwrap(), 10);
        assert_eq!(g.margin_for("B").unwrap(), -10);
    }

    #[test]
    fn single_sided_record_is_malformed() {
        let mut g = game("g1", "2025-01-02", ("A", 90), ("B", 80));
        g.teams.truncate(1);
        assert!(g.sides("A").is_err());
        assert!(g.opponent_of("A").is_none());
    }

    #[test]
    fn parses_minimal_json() {
        let raw = r#"{"id":"x","date":"2025-02-03","teams":[{"name":"A","score":70},{"name":"B","score":71,"is_home":true}]}"#;
        let g: GameRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(g.teams.len(), 2);
        assert!(g.players.is_empty());
        assert_eq!(g.margin_for("A").unwrap(), -1);
    }
}
