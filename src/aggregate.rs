use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{GameRecord, LeagueStandingEntry, TeamBoxScore, TeamStatLine};
use crate::ranking::{Metric, rank_metric};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamTotals {
    pub points: u32,
    pub opp_points: u32,
    pub rebounds: u32,
    pub opp_rebounds: u32,
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
    pub opp_three_pm: u32,
    pub opp_three_pa: u32,
    pub fast_break_points: Option<u32>,
    pub paint_points: Option<u32>,
    pub bench_points: Option<u32>,
    pub points_off_turnovers: Option<u32>,
    pub second_chance_points: Option<u32>,
}

/// Season totals for one team. Per-game figures are derived on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAggregate {
    pub team: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub point_diff: i64,
    pub totals: TeamTotals,
}

impl TeamAggregate {
    pub fn empty(team: &str) -> Self {
        Self {
            team: team.to_string(),
            games_played: 0,
            wins: 0,
            losses: 0,
            point_diff: 0,
            totals: TeamTotals::default(),
        }
    }

    fn per_game(&self, total: u32) -> f64 {
        per_game(total as f64, self.games_played)
    }

    fn per_game_opt(&self, total: Option<u32>) -> Option<f64> {
        total.map(|t| self.per_game(t))
    }

    pub fn ppg(&self) -> f64 {
        self.per_game(self.totals.points)
    }

    pub fn opp_ppg(&self) -> f64 {
        self.per_game(self.totals.opp_points)
    }

    pub fn rpg(&self) -> f64 {
        self.per_game(self.totals.rebounds)
    }

    pub fn opp_rpg(&self) -> f64 {
        self.per_game(self.totals.opp_rebounds)
    }

    pub fn apg(&self) -> f64 {
        self.per_game(self.totals.assists)
    }

    pub fn spg(&self) -> f64 {
        self.per_game(self.totals.steals)
    }

    pub fn bpg(&self) -> f64 {
        self.per_game(self.totals.blocks)
    }

    pub fn topg(&self) -> f64 {
        self.per_game(self.totals.turnovers)
    }

    pub fn fpg(&self) -> f64 {
        self.per_game(self.totals.fouls)
    }

    pub fn fta_per_game(&self) -> f64 {
        self.per_game(self.totals.fta)
    }

    pub fn two_pt_ppg(&self) -> f64 {
        self.per_game(self.totals.two_pm * 2)
    }

    pub fn fg_pct(&self) -> f64 {
        pct(
            self.totals.two_pm + self.totals.three_pm,
            self.totals.two_pa + self.totals.three_pa,
        )
    }

    pub fn fg3_pct(&self) -> f64 {
        pct(self.totals.three_pm, self.totals.three_pa)
    }

    pub fn ft_pct(&self) -> f64 {
        pct(self.totals.ftm, self.totals.fta)
    }

    pub fn opp_fg3_pct(&self) -> f64 {
        pct(self.totals.opp_three_pm, self.totals.opp_three_pa)
    }

    /// Share of points that came from made threes.
    pub fn three_point_share(&self) -> f64 {
        pct(self.totals.three_pm * 3, self.totals.points)
    }

    /// Assists per made field goal.
    pub fn assist_ratio(&self) -> f64 {
        pct(self.totals.assists, self.totals.two_pm + self.totals.three_pm)
    }

    pub fn fast_break_ppg(&self) -> Option<f64> {
        self.per_game_opt(self.totals.fast_break_points)
    }

    pub fn paint_ppg(&self) -> Option<f64> {
        self.per_game_opt(self.totals.paint_points)
    }

    pub fn bench_ppg(&self) -> Option<f64> {
        self.per_game_opt(self.totals.bench_points)
    }

    pub fn points_off_turnovers_ppg(&self) -> Option<f64> {
        self.per_game_opt(self.totals.points_off_turnovers)
    }

    pub fn second_chance_ppg(&self) -> Option<f64> {
        self.per_game_opt(self.totals.second_chance_points)
    }

    pub fn paint_share(&self) -> Option<f64> {
        self.totals.paint_points.map(|p| pct(p, self.totals.points))
    }

    pub fn bench_share(&self) -> Option<f64> {
        self.totals.bench_points.map(|b| pct(b, self.totals.points))
    }

    pub fn win_pct(&self) -> f64 {
        pct(self.wins, self.games_played)
    }

    pub fn avg_margin(&self) -> f64 {
        per_game(self.point_diff as f64, self.games_played)
    }

    fn fga(&self) -> u32 {
        self.totals.two_pa + self.totals.three_pa
    }

    fn fgm(&self) -> u32 {
        self.totals.two_pm + self.totals.three_pm
    }

    /// Possessions per game, FGA + TOV + 0.44 * FTA. Offensive rebounds are not tracked.
    pub fn possessions(&self) -> f64 {
        self.per_game(self.fga() + self.totals.turnovers) + FTA_POSSESSION_WEIGHT * self.fta_per_game()
    }

    pub fn ts_pct(&self) -> f64 {
        let attempts = self.fga() as f64 + FTA_POSSESSION_WEIGHT * self.totals.fta as f64;
        if attempts == 0.0 {
            return 0.0;
        }
        self.totals.points as f64 / (2.0 * attempts) * 100.0
    }

    pub fn efg_pct(&self) -> f64 {
        if self.fga() == 0 {
            return 0.0;
        }
        (self.fgm() as f64 + 0.5 * self.totals.three_pm as f64) / self.fga() as f64 * 100.0
    }

    /// Share of field goal attempts taken from three.
    pub fn three_pa_rate(&self) -> f64 {
        if self.fga() == 0 {
            return 0.0;
        }
        self.totals.three_pa as f64 / self.fga() as f64 * 100.0
    }

    fn per_100(&self, per_game: f64) -> f64 {
        let poss = self.possessions();
        if poss > 0.0 { per_game / poss * 100.0 } else { 0.0 }
    }

    pub fn off_rtg(&self) -> f64 {
        self.per_100(self.ppg())
    }

    /// Points allowed per 100 of the team's own possessions.
    pub fn def_rtg(&self) -> f64 {
        self.per_100(self.opp_ppg())
    }

    pub fn net_rtg(&self) -> f64 {
        self.off_rtg() - self.def_rtg()
    }

    pub fn tov_rate(&self) -> f64 {
        self.per_100(self.topg())
    }

    pub fn advanced(&self) -> AdvancedMetrics {
        AdvancedMetrics {
            team: self.team.clone(),
            games_played: self.games_played,
            ts_pct: self.ts_pct(),
            efg_pct: self.efg_pct(),
            three_pa_rate: self.three_pa_rate(),
            off_rtg: self.off_rtg(),
            def_rtg: self.def_rtg(),
            net_rtg: self.net_rtg(),
            pace: self.possessions(),
            ast_rate: self.assist_ratio(),
            tov_rate: self.tov_rate(),
        }
    }
}

const FTA_POSSESSION_WEIGHT: f64 = 0.44;

/// Possession-based ratings for one team. Percentages are on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedMetrics {
    pub team: String,
    pub games_played: u32,
    pub ts_pct: f64,
    pub efg_pct: f64,
    pub three_pa_rate: f64,
    pub off_rtg: f64,
    pub def_rtg: f64,
    pub net_rtg: f64,
    pub pace: f64,
    pub ast_rate: f64,
    pub tov_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VenueSplit {
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub points: u32,
    pub opp_points: u32,
    /// Points scored in wins only.
    pub win_points: u32,
}

impl VenueSplit {
    pub fn ppg(&self) -> f64 {
        per_game(self.points as f64, self.games)
    }

    pub fn opp_ppg(&self) -> f64 {
        per_game(self.opp_points as f64, self.games)
    }

    pub fn win_pct(&self) -> f64 {
        pct(self.wins, self.games)
    }

    pub fn win_ppg(&self) -> f64 {
        per_game(self.win_points as f64, self.wins)
    }

    pub fn record(&self) -> String {
        format!("{}-{}", self.wins, self.losses)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeAwayRecord {
    pub team: String,
    pub home: VenueSplit,
    pub away: VenueSplit,
}

/// League-wide results by venue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueVenueSummary {
    pub games: u32,
    pub home_wins: u32,
    pub away_wins: u32,
    pub home_win_points: u32,
    pub away_win_points: u32,
}

impl LeagueVenueSummary {
    /// Home wins over every game, draws included.
    pub fn home_win_pct(&self) -> f64 {
        pct(self.home_wins, self.games)
    }

    pub fn home_win_ppg(&self) -> f64 {
        per_game(self.home_win_points as f64, self.home_wins)
    }

    pub fn away_win_ppg(&self) -> f64 {
        per_game(self.away_win_points as f64, self.away_wins)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerTotals {
    pub points: u32,
    pub rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    pub turnovers: u32,
    pub two_pm: u32,
    pub two_pa: u32,
    pub three_pm: u32,
    pub three_pa: u32,
    pub ftm: u32,
    pub fta: u32,
    pub minutes: f64,
    pub plus_minus: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAggregate {
    pub player_id: u32,
    pub team: String,
    pub jersey: Option<String>,
    pub games_played: u32,
    pub games_started: u32,
    pub bench_games: u32,
    pub bench_points: u32,
    pub totals: PlayerTotals,
}

impl PlayerAggregate {
    fn new(player_id: u32, team: &str, jersey: Option<String>) -> Self {
        Self {
            player_id,
            team: team.to_string(),
            jersey,
            games_played: 0,
            games_started: 0,
            bench_games: 0,
            bench_points: 0,
            totals: PlayerTotals::default(),
        }
    }

    pub fn ppg(&self) -> f64 {
        per_game(self.totals.points as f64, self.games_played)
    }

    pub fn rpg(&self) -> f64 {
        per_game(self.totals.rebounds as f64, self.games_played)
    }

    pub fn apg(&self) -> f64 {
        per_game(self.totals.assists as f64, self.games_played)
    }

    pub fn spg(&self) -> f64 {
        per_game(self.totals.steals as f64, self.games_played)
    }

    pub fn bpg(&self) -> f64 {
        per_game(self.totals.blocks as f64, self.games_played)
    }

    pub fn mpg(&self) -> f64 {
        per_game(self.totals.minutes, self.games_played)
    }

    pub fn fg_pct(&self) -> f64 {
        pct(
            self.totals.two_pm + self.totals.three_pm,
            self.totals.two_pa + self.totals.three_pa,
        )
    }

    pub fn bench_ppg(&self) -> f64 {
        per_game(self.bench_points as f64, self.bench_games)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerGame {
    pub game_id: String,
    pub date: NaiveDate,
    pub opponent: Option<String>,
    pub is_home: bool,
    pub starter: Option<bool>,
    pub points: u32,
    pub rebounds: u32,
    pub assists: u32,
    pub blocks: u32,
    pub minutes: f64,
}

/// One player's appearances, most recent first. Zero-minute games are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLog {
    pub player_id: u32,
    pub jersey: Option<String>,
    pub games: Vec<PlayerGame>,
}

impl PlayerLog {
    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn avg_points(&self) -> f64 {
        mean(self.games.iter().map(|g| g.points as f64))
    }

    pub fn avg_minutes(&self) -> f64 {
        mean(self.games.iter().map(|g| g.minutes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakKind {
    Win,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub kind: StreakKind,
    pub length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl Trend {
    pub fn label(self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        }
    }
}

/// Recent-form summary over the last `window` games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamForm {
    pub team: String,
    pub season_games: usize,
    pub season_ppg: f64,
    pub season_opp_ppg: f64,
    pub season_win_pct: f64,
    pub window: usize,
    pub last_ppg: f64,
    pub last_opp_ppg: f64,
    pub last_wins: usize,
    pub momentum: f64,
    pub trend: Trend,
    pub streak: Option<Streak>,
}

const TREND_SLOPE: f64 = 2.0;

pub fn pct(made: u32, attempted: u32) -> f64 {
    if attempted == 0 {
        return 0.0;
    }
    ((made as f64 / attempted as f64) * 1000.0).round() / 10.0
}

fn per_game(total: f64, games: u32) -> f64 {
    if games == 0 {
        return 0.0;
    }
    total / games as f64
}

pub fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

fn add_opt(slot: &mut Option<u32>, value: Option<u32>) {
    if let Some(v) = value {
        *slot = Some(slot.unwrap_or(0) + v);
    }
}

fn summed_player_line(game: &GameRecord, team: &str) -> TeamStatLine {
    let mut line = TeamStatLine::default();
    for p in game.players_for(team) {
        let s = &p.stats;
        line.rebounds += s.rebounds;
        line.assists += s.assists;
        line.steals += s.steals;
        line.blocks += s.blocks;
        line.turnovers += s.turnovers;
        line.fouls += s.fouls;
        line.two_pm += s.two_pm;
        line.two_pa += s.two_pa;
        line.three_pm += s.three_pm;
        line.three_pa += s.three_pa;
        line.ftm += s.ftm;
        line.fta += s.fta;
    }
    line
}

fn derived_bench_points(game: &GameRecord, team: &str) -> Option<u32> {
    let mut flagged = false;
    let mut bench = 0;
    for p in game.players_for(team) {
        match p.starter {
            Some(false) => {
                flagged = true;
                bench += p.stats.points;
            }
            Some(true) => flagged = true,
            None => {}
        }
    }
    flagged.then_some(bench)
}

/// Team stat line for one side of a game, from the team box when reported.
pub fn team_line(game: &GameRecord, side: &TeamBoxScore) -> TeamStatLine {
    let mut line = match &side.stats {
        Some(stats) => stats.clone(),
        None => summed_player_line(game, &side.name),
    };
    if line.bench_points.is_none() {
        line.bench_points = derived_bench_points(game, &side.name);
    }
    line
}

pub fn aggregate_team(games: &[GameRecord], team: &str) -> TeamAggregate {
    let mut out = TeamAggregate::empty(team);
    for game in games {
        let Some(own) = game.team(team) else {
            continue;
        };
        out.games_played += 1;
        let t = &mut out.totals;
        t.points += own.score;

        let line = team_line(game, own);
        t.rebounds += line.rebounds;
        t.assists += line.assists;
        t.steals += line.steals;
        t.blocks += line.blocks;
        t.turnovers += line.turnovers;
        t.fouls += line.fouls;
        t.two_pm += line.two_pm;
        t.two_pa += line.two_pa;
        t.three_pm += line.three_pm;
        t.three_pa += line.three_pa;
        t.ftm += line.ftm;
        t.fta += line.fta;
        add_opt(&mut t.fast_break_points, line.fast_break_points);
        add_opt(&mut t.paint_points, line.paint_points);
        add_opt(&mut t.bench_points, line.bench_points);
        add_opt(&mut t.points_off_turnovers, line.points_off_turnovers);
        add_opt(&mut t.second_chance_points, line.second_chance_points);

        let Some(opp) = game.opponent_of(team) else {
            debug!(game = %game.id, team, "no opponent box score; result not counted");
            continue;
        };
        t.opp_points += opp.score;
        let opp_line = team_line(game, opp);
        t.opp_rebounds += opp_line.rebounds;
        t.opp_three_pm += opp_line.three_pm;
        t.opp_three_pa += opp_line.three_pa;

        let margin = own.score as i64 - opp.score as i64;
        out.point_diff += margin;
        if margin > 0 {
            out.wins += 1;
        } else if margin < 0 {
            out.losses += 1;
        }
    }
    out
}

pub fn aggregate_players(games: &[GameRecord], team: &str) -> BTreeMap<u32, PlayerAggregate> {
    let mut out: BTreeMap<u32, PlayerAggregate> = BTreeMap::new();
    for game in games {
        for p in game.players_for(team) {
            if p.stats.minutes <= 0.0 {
                continue;
            }
            let agg = out
                .entry(p.player_id)
                .or_insert_with(|| PlayerAggregate::new(p.player_id, team, p.jersey.clone()));
            if agg.jersey.is_none() {
                agg.jersey = p.jersey.clone();
            }
            let s = &p.stats;
            agg.games_played += 1;
            match p.starter {
                Some(true) => agg.games_started += 1,
                Some(false) => {
                    agg.bench_games += 1;
                    agg.bench_points += s.points;
                }
                None => {}
            }
            let t = &mut agg.totals;
            t.points += s.points;
            t.rebounds += s.rebounds;
            t.assists += s.assists;
            t.steals += s.steals;
            t.blocks += s.blocks;
            t.turnovers += s.turnovers;
            t.two_pm += s.two_pm;
            t.two_pa += s.two_pa;
            t.three_pm += s.three_pm;
            t.three_pa += s.three_pa;
            t.ftm += s.ftm;
            t.fta += s.fta;
            t.minutes += s.minutes;
            t.plus_minus += s.plus_minus as i64;
        }
    }
    out
}

/// Results split by venue. Points count even when the opponent box is missing.
pub fn home_away_record(games: &[GameRecord], team: &str) -> HomeAwayRecord {
    let mut out = HomeAwayRecord {
        team: team.to_string(),
        home: VenueSplit::default(),
        away: VenueSplit::default(),
    };
    for game in games {
        let Some(own) = game.team(team) else {
            continue;
        };
        let split = if own.is_home { &mut out.home } else { &mut out.away };
        split.games += 1;
        split.points += own.score;
        let Some(opp) = game.opponent_of(team) else {
            continue;
        };
        split.opp_points += opp.score;
        if own.score > opp.score {
            split.wins += 1;
            split.win_points += own.score;
        } else if own.score < opp.score {
            split.losses += 1;
        }
    }
    out
}

pub fn league_venue_summary(games: &[GameRecord]) -> LeagueVenueSummary {
    let mut out = LeagueVenueSummary::default();
    for game in games {
        out.games += 1;
        let home = game.teams.iter().find(|t| t.is_home);
        let away = game.teams.iter().find(|t| !t.is_home);
        let (Some(home), Some(away)) = (home, away) else {
            debug!(game = %game.id, "venue not recorded for both sides");
            continue;
        };
        if home.score > away.score {
            out.home_wins += 1;
            out.home_win_points += home.score;
        } else if away.score > home.score {
            out.away_wins += 1;
            out.away_win_points += away.score;
        }
    }
    out
}

/// Every team in `games`, in order of first appearance.
pub fn league_teams(games: &[GameRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for game in games {
        for side in &game.teams {
            if !names.iter().any(|n| n == &side.name) {
                names.push(side.name.clone());
            }
        }
    }
    names
}

pub fn aggregate_league(games: &[GameRecord]) -> Vec<TeamAggregate> {
    league_teams(games)
        .par_iter()
        .map(|team| aggregate_team(games, team))
        .collect()
}

/// Player aggregates for the whole league, team by team in order of first appearance.
pub fn league_players(games: &[GameRecord]) -> Vec<PlayerAggregate> {
    league_teams(games)
        .par_iter()
        .flat_map_iter(|team| aggregate_players(games, team).into_values())
        .collect()
}

/// Games featuring `team`, most recent first. Equal dates keep input order.
pub fn team_games<'a>(games: &'a [GameRecord], team: &str) -> Vec<&'a GameRecord> {
    let mut out: Vec<&GameRecord> = games.iter().filter(|g| g.features(team)).collect();
    out.sort_by(|a, b| b.date.cmp(&a.date));
    out
}

pub fn player_logs(team_games: &[&GameRecord], team: &str) -> BTreeMap<u32, PlayerLog> {
    let mut out: BTreeMap<u32, PlayerLog> = BTreeMap::new();
    for game in team_games {
        let own = game.team(team);
        let opponent = game.opponent_of(team).map(|o| o.name.clone());
        for p in game.players_for(team) {
            if p.stats.minutes <= 0.0 {
                continue;
            }
            let log = out.entry(p.player_id).or_insert_with(|| PlayerLog {
                player_id: p.player_id,
                jersey: p.jersey.clone(),
                games: Vec::new(),
            });
            log.games.push(PlayerGame {
                game_id: game.id.clone(),
                date: game.date,
                opponent: opponent.clone(),
                is_home: own.is_some_and(|t| t.is_home),
                starter: p.starter,
                points: p.stats.points,
                rebounds: p.stats.rebounds,
                assists: p.stats.assists,
                blocks: p.stats.blocks,
                minutes: p.stats.minutes,
            });
        }
    }
    out
}

/// Margins for `team`, in the order given. Records without an opponent are skipped.
pub fn margins(games: &[&GameRecord], team: &str) -> Vec<i32> {
    games.iter().filter_map(|g| g.margin_for(team).ok()).collect()
}

/// Current run from a recent-first margin list. A drawn game ends the run.
pub fn current_streak(recent_margins: &[i32]) -> Option<Streak> {
    let first = *recent_margins.first()?;
    let kind = match first.signum() {
        1 => StreakKind::Win,
        -1 => StreakKind::Loss,
        _ => return None,
    };
    let length = recent_margins
        .iter()
        .take_while(|m| m.signum() == first.signum())
        .count();
    Some(Streak { kind, length })
}

/// Least-squares slope of `values` against their index.
pub fn slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / nf;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den == 0.0 { 0.0 } else { num / den }
}

pub fn team_form(games: &[GameRecord], team: &str, window: usize) -> Option<TeamForm> {
    let recent = team_games(games, team);
    let scored: Vec<(u32, u32)> = recent
        .iter()
        .filter_map(|g| g.sides(team).ok())
        .map(|(own, opp)| (own.score, opp.score))
        .collect();
    if scored.is_empty() {
        return None;
    }
    let window = window.max(1);
    let last = &scored[..scored.len().min(window)];
    let season_wins = scored.iter().filter(|(f, a)| f > a).count();

    // Slope runs oldest to newest.
    let chrono_margins: Vec<f64> = last
        .iter()
        .rev()
        .map(|(f, a)| *f as f64 - *a as f64)
        .collect();
    let momentum = slope(&chrono_margins);
    let trend = if momentum > TREND_SLOPE {
        Trend::Improving
    } else if momentum < -TREND_SLOPE {
        Trend::Declining
    } else {
        Trend::Stable
    };
    let recent_margins: Vec<i32> = scored.iter().map(|(f, a)| *f as i32 - *a as i32).collect();

    Some(TeamForm {
        team: team.to_string(),
        season_games: scored.len(),
        season_ppg: mean(scored.iter().map(|(f, _)| *f as f64)),
        season_opp_ppg: mean(scored.iter().map(|(_, a)| *a as f64)),
        season_win_pct: pct(season_wins as u32, scored.len() as u32),
        window: last.len(),
        last_ppg: mean(last.iter().map(|(f, _)| *f as f64)),
        last_opp_ppg: mean(last.iter().map(|(_, a)| *a as f64)),
        last_wins: last.iter().filter(|(f, a)| f > a).count(),
        momentum,
        trend,
        streak: current_streak(&recent_margins),
    })
}

/// Standings by win percentage, then point differential.
pub fn standings_from_aggregates(aggregates: &[TeamAggregate]) -> Vec<LeagueStandingEntry> {
    let mut order: Vec<&TeamAggregate> = aggregates.iter().collect();
    order.sort_by(|a, b| {
        b.win_pct()
            .partial_cmp(&a.win_pct())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.point_diff.cmp(&a.point_diff))
    });
    order
        .into_iter()
        .enumerate()
        .map(|(idx, agg)| LeagueStandingEntry {
            team: agg.team.clone(),
            rank: idx + 1,
            wins: agg.wins,
            losses: agg.losses,
            win_pct: agg.win_pct(),
            point_diff: agg.point_diff,
            metric_ranks: Metric::ALL
                .iter()
                .filter_map(|m| rank_metric(&agg.team, *m, aggregates).map(|r| (*m, r)))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::*;

    #[test]
    fn averages_follow_totals() {
        let games = vec![
            game("1", "2025-01-01", ("A", 80), ("B", 70)),
            game("2", "2025-01-08", ("C", 90), ("A", 85)),
            game("3", "2025-01-15", ("B", 60), ("C", 61)),
        ];
        let agg = aggregate_team(&games, "A");
        assert_eq!(agg.games_played, 2);
        assert_eq!(agg.wins, 1);
        assert_eq!(agg.losses, 1);
        assert!((agg.ppg() - 82.5).abs() < 1e-9);
        assert!((agg.opp_ppg() - 80.0).abs() < 1e-9);
        assert_eq!(agg.point_diff, 5);
    }

    #[test]
    fn team_stats_fall_back_to_player_sums() {
        let mut g = game("1", "2025-01-01", ("A", 80), ("B", 70));
        let mut p = player(1, "A", 20, 30.0);
        p.stats.rebounds = 7;
        let mut q = player(2, "A", 10, 20.0);
        q.stats.rebounds = 3;
        q.starter = Some(false);
        g.players = vec![p, q];
        let agg = aggregate_team(&[g], "A");
        assert_eq!(agg.totals.rebounds, 10);
        assert_eq!(agg.totals.bench_points, Some(10));
    }

    #[test]
    fn zero_minute_games_are_skipped() {
        let mut g1 = game("1", "2025-01-01", ("A", 80), ("B", 70));
        g1.players = vec![player(7, "A", 12, 25.0)];
        let mut g2 = game("2", "2025-01-02", ("A", 80), ("B", 70));
        g2.players = vec![player(7, "A", 0, 0.0)];
        let players = aggregate_players(&[g1, g2], "A");
        assert_eq!(players[&7].games_played, 1);
        assert!((players[&7].ppg() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn percentages_round_to_one_decimal() {
        assert_eq!(pct(1, 3), 33.3);
        assert_eq!(pct(2, 3), 66.7);
        assert_eq!(pct(5, 0), 0.0);
    }

    #[test]
    fn league_keeps_first_appearance_order() {
        let games = vec![
            game("1", "2025-01-01", ("B", 80), ("A", 70)),
            game("2", "2025-01-08", ("C", 90), ("A", 85)),
        ];
        let league = aggregate_league(&games);
        let names: Vec<&str> = league.iter().map(|a| a.team.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn streak_counts_contiguous_prefix() {
        let s = current_streak(&[5, 3, 1, -4, 8]).unwrap();
        assert_eq!(s.kind, StreakKind::Win);
        assert_eq!(s.length, 3);
        assert!(current_streak(&[]).is_none());
    }

    #[test]
    fn form_trend_uses_chronological_slope() {
        let games = vec![
            game("1", "2025-01-01", ("A", 70), ("B", 80)),
            game("2", "2025-01-02", ("A", 75), ("B", 78)),
            game("3", "2025-01-03", ("A", 80), ("B", 76)),
            game("4", "2025-01-04", ("A", 88), ("B", 75)),
        ];
        let form = team_form(&games, "A", 5).unwrap();
        assert_eq!(form.trend, Trend::Improving);
        assert_eq!(form.last_wins, 2);
        assert_eq!(form.streak.unwrap().length, 2);
    }

    #[test]
    fn standings_sort_by_win_pct_then_diff() {
        let games = vec![
            game("1", "2025-01-01", ("A", 80), ("B", 70)),
            game("2", "2025-01-02", ("C", 100), ("B", 70)),
        ];
        let league = aggregate_league(&games);
        let standings = standings_from_aggregates(&league);
        assert_eq!(standings[0].team, "C");
        assert_eq!(standings[1].team, "A");
        assert_eq!(standings[2].team, "B");
        assert_eq!(standings[0].metric_ranks[&Metric::Ppg], 1);
    }

    #[test]
    fn possession_ratings_from_totals() {
        let mut agg = TeamAggregate::empty("A");
        agg.games_played = 2;
        agg.totals = TeamTotals {
            points: 160,
            opp_points: 140,
            two_pm: 40,
            two_pa: 80,
            three_pm: 14,
            three_pa: 40,
            fta: 40,
            turnovers: 24,
            assists: 30,
            ..TeamTotals::default()
        };
        let adv = agg.advanced();
        assert!((adv.pace - 80.8).abs() < 1e-9);
        assert!((adv.ts_pct - 58.1395).abs() < 1e-3);
        assert!((adv.efg_pct - 50.8333).abs() < 1e-3);
        assert!((adv.three_pa_rate - 33.3333).abs() < 1e-3);
        assert!((adv.off_rtg - 99.0099).abs() < 1e-3);
        assert!((adv.def_rtg - 86.6337).abs() < 1e-3);
        assert!((adv.net_rtg - 12.3762).abs() < 1e-3);
        assert!((adv.tov_rate - 14.8515).abs() < 1e-3);
    }

    #[test]
    fn ratings_are_zero_without_attempts() {
        let adv = TeamAggregate::empty("A").advanced();
        assert_eq!(adv.pace, 0.0);
        assert_eq!(adv.ts_pct, 0.0);
        assert_eq!(adv.off_rtg, 0.0);
        assert_eq!(adv.tov_rate, 0.0);
    }

    #[test]
    fn venue_splits_and_league_home_edge() {
        let games = vec![
            game("1", "2025-01-01", ("A", 80), ("B", 70)),
            game("2", "2025-01-02", ("C", 90), ("A", 85)),
            game("3", "2025-01-03", ("A", 75), ("C", 75)),
            game("4", "2025-01-04", ("B", 80), ("A", 88)),
        ];
        let record = home_away_record(&games, "A");
        assert_eq!(record.home.games, 2);
        assert_eq!(record.home.record(), "1-0");
        assert!((record.home.win_ppg() - 80.0).abs() < 1e-9);
        assert_eq!(record.away.record(), "1-1");
        assert!((record.away.ppg() - 86.5).abs() < 1e-9);

        let league = league_venue_summary(&games);
        assert_eq!(league.home_wins, 2);
        assert_eq!(league.away_wins, 1);
        assert_eq!(league.home_win_pct(), 50.0);
        assert!((league.away_win_ppg() - 88.0).abs() < 1e-9);
    }

    #[test]
    fn league_players_follow_team_order() {
        let mut g = game("1", "2025-01-01", ("B", 80), ("A", 70));
        g.players = vec![player(9, "A", 10, 20.0), player(4, "B", 30, 30.0), player(2, "B", 8, 12.0)];
        let ids: Vec<u32> = league_players(&[g]).iter().map(|p| p.player_id).collect();
        assert_eq!(ids, vec![2, 4, 9]);
    }
}
