use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate_league, league_teams, standings_from_aggregates};
use crate::model::{GameRecord, LeagueStandingEntry};

/// Selects games from a corpus. Every field is optional; `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameFilter {
    pub season: Option<String>,
    pub team: Option<String>,
    /// With `team`, only meetings between the two.
    pub opponent: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Keep only the most recent N matches.
    pub last_n: Option<usize>,
}

impl GameFilter {
    pub fn season(season: &str) -> Self {
        Self {
            season: Some(season.to_string()),
            ..Self::default()
        }
    }

    pub fn head_to_head(team: &str, opponent: &str) -> Self {
        Self {
            team: Some(team.to_string()),
            opponent: Some(opponent.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, game: &GameRecord) -> bool {
        if let Some(season) = &self.season
            && game.season.as_deref() != Some(season.as_str())
        {
            return false;
        }
        if let Some(team) = &self.team
            && !game.features(team)
        {
            return false;
        }
        if let Some(opponent) = &self.opponent
            && !game.features(opponent)
        {
            return false;
        }
        self.from.is_none_or(|from| game.date >= from) && self.to.is_none_or(|to| game.date <= to)
    }
}

/// Read access to a league's box scores.
pub trait GameCorpus {
    /// Matching games, oldest first.
    fn list_games(&self, filter: &GameFilter) -> Result<Vec<GameRecord>>;

    fn list_teams(&self) -> Result<Vec<String>>;

    /// Standings for `season`, or for every game when `None`.
    fn list_standings(&self, season: Option<&str>) -> Result<Vec<LeagueStandingEntry>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CorpusFile {
    Games(Vec<GameRecord>),
    Full {
        games: Vec<GameRecord>,
        #[serde(default)]
        standings: Vec<LeagueStandingEntry>,
    },
}

/// Corpus held in memory, usually loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    games: Vec<GameRecord>,
    standings: Vec<LeagueStandingEntry>,
}

impl InMemoryCorpus {
    pub fn from_games(mut games: Vec<GameRecord>) -> Self {
        games.sort_by(|a, b| a.date.cmp(&b.date));
        Self {
            games,
            standings: Vec::new(),
        }
    }

    /// Published standings take precedence over ones derived from the games.
    pub fn with_standings(mut self, standings: Vec<LeagueStandingEntry>) -> Self {
        self.standings = standings;
        self
    }

    /// Accepts either a bare array of games or `{"games": [...], "standings": [...]}`.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: CorpusFile = serde_json::from_str(raw).context("parse game corpus json")?;
        Ok(match file {
            CorpusFile::Games(games) => Self::from_games(games),
            CorpusFile::Full { games, standings } => Self::from_games(games).with_standings(standings),
        })
    }

    pub fn load_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read game corpus {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("load game corpus {}", path.display()))
    }

    pub fn games(&self) -> &[GameRecord] {
        &self.games
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl GameCorpus for InMemoryCorpus {
    fn list_games(&self, filter: &GameFilter) -> Result<Vec<GameRecord>> {
        let mut out: Vec<GameRecord> = self
            .games
            .iter()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect();
        if let Some(n) = filter.last_n
            && out.len() > n
        {
            out.drain(..out.len() - n);
        }
        Ok(out)
    }

    fn list_teams(&self) -> Result<Vec<String>> {
        let mut teams = league_teams(&self.games);
        teams.sort();
        Ok(teams)
    }

    fn list_standings(&self, season: Option<&str>) -> Result<Vec<LeagueStandingEntry>> {
        if !self.standings.is_empty() {
            return Ok(self.standings.clone());
        }
        let filter = GameFilter {
            season: season.map(str::to_string),
            ..GameFilter::default()
        };
        let games = self.list_games(&filter)?;
        Ok(standings_from_aggregates(&aggregate_league(&games)))
    }
}
