#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use hoops_insights::model::{GameRecord, PlayerBoxScore, PlayerStatLine, TeamBoxScore, TeamStatLine};

pub fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date") + Duration::days(n)
}

pub fn side(name: &str, is_home: bool, score: u32) -> TeamBoxScore {
    TeamBoxScore {
        name: name.to_string(),
        is_home,
        score,
        quarters: Vec::new(),
        stats: None,
    }
}

pub fn game(id: &str, on: i64, home: (&str, u32), away: (&str, u32)) -> GameRecord {
    GameRecord {
        id: id.to_string(),
        date: day(on),
        season: Some("2025".to_string()),
        teams: vec![side(home.0, true, home.1), side(away.0, false, away.1)],
        players: Vec::new(),
    }
}

pub fn with_stats(mut game: GameRecord, home: TeamStatLine, away: TeamStatLine) -> GameRecord {
    game.teams[0].stats = Some(home);
    game.teams[1].stats = Some(away);
    game
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

/// `team` at home against `opp`, one game every two days, oldest first. Margins are
/// listed oldest first as well.
pub fn run_of(team: &str, opp: &str, margins: &[i32], start: i64) -> Vec<GameRecord> {
    margins
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let own = (90 + (*m).max(0)) as u32;
            let theirs = (90 - (*m).min(0)) as u32;
            game(&format!("{team}-{i}"), start + i as i64 * 2, (team, own), (opp, theirs))
        })
        .collect()
}
