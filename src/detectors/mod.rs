//! Stateless pattern detectors and the ordered registry the composer runs.
//!
//! Every detector has the same shape: it reads a [`DetectorContext`] and either
//! abstains with `Ok(None)`, returns one [`Insight`], or fails with `Err` on a
//! malformed record. Thresholds live next to the detector that uses them.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::aggregate::{
    PlayerAggregate, PlayerLog, TeamAggregate, aggregate_players, aggregate_team, player_logs,
    team_games,
};
use crate::insight::{Insight, InsightType};
use crate::model::{GameRecord, LeagueStandingEntry};
use crate::names::{PlayerNameLookup, display_name};
use crate::ranking::{Metric, league_average, rank_metric};

pub mod defense;
pub mod h2h;
pub mod league;
pub mod momentum;
pub mod offense;
pub mod players;
pub mod quarters;
pub mod streaks;

/// Rate claims on team aggregates need at least this many games.
pub const MIN_RATE_GAMES: u32 = 5;

/// Everything known about one side of the matchup, built once per request.
#[derive(Debug, Clone)]
pub struct TeamContext<'a> {
    pub name: &'a str,
    /// Most recent first.
    pub games: Vec<&'a GameRecord>,
    pub aggregate: TeamAggregate,
    pub players: BTreeMap<u32, PlayerAggregate>,
    pub logs: BTreeMap<u32, PlayerLog>,
    pub standing: Option<usize>,
}

impl<'a> TeamContext<'a> {
    pub fn build(name: &'a str, games: &'a [GameRecord], standings: &[LeagueStandingEntry]) -> Self {
        let recent = team_games(games, name);
        let logs = player_logs(&recent, name);
        Self {
            name,
            aggregate: aggregate_team(games, name),
            players: aggregate_players(games, name),
            logs,
            standing: standings.iter().find(|s| s.team == name).map(|s| s.rank),
            games: recent,
        }
    }

    /// Recent-first margins. Fails on a record without an opponent box score.
    pub fn margins(&self) -> Result<Vec<i32>> {
        self.games.iter().map(|g| g.margin_for(self.name)).collect()
    }

    pub fn games_played(&self) -> u32 {
        self.aggregate.games_played
    }
}

pub struct DetectorContext<'a> {
    pub team: &'a TeamContext<'a>,
    pub opponent: &'a TeamContext<'a>,
    pub league: &'a [TeamAggregate],
    pub standings: &'a [LeagueStandingEntry],
    /// Meetings between the two teams, oldest first.
    pub h2h: &'a [&'a GameRecord],
    pub names: &'a dyn PlayerNameLookup,
}

impl<'a> DetectorContext<'a> {
    pub fn team_name(&self) -> &str {
        self.team.name
    }

    pub fn opponent_name(&self) -> &str {
        self.opponent.name
    }

    /// Team name with its standings position, e.g. "Hapoel (#3)".
    pub fn team_label(&self) -> String {
        match self.team.standing {
            Some(rank) => format!("{} (#{rank})", self.team.name),
            None => self.team.name.to_string(),
        }
    }

    pub fn player_name(&self, player_id: u32, jersey: Option<&str>) -> String {
        display_name(self.names, player_id, jersey)
    }

    pub fn rank(&self, metric: Metric) -> Option<usize> {
        rank_metric(self.team.name, metric, self.league)
    }

    pub fn league_avg(&self, metric: Metric) -> f64 {
        league_average(metric, self.league)
    }

    pub fn team_count(&self) -> usize {
        self.league.len()
    }

    /// Same context seen from the other side.
    pub fn flipped(&self) -> DetectorContext<'a> {
        DetectorContext {
            team: self.opponent,
            opponent: self.team,
            league: self.league,
            standings: self.standings,
            h2h: self.h2h,
            names: self.names,
        }
    }
}

pub type DetectFn = fn(&DetectorContext<'_>) -> Result<Option<Insight>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Runs once per team.
    Team,
    /// Priority chain; the first hit per team wins.
    PlayerSpotlight,
    /// Runs once per matchup.
    Matchup,
    /// Balancing candidates, tried in order.
    Fallback,
}

#[derive(Clone, Copy)]
pub struct DetectorSpec {
    pub kind: InsightType,
    pub stage: Stage,
    pub detect: DetectFn,
    /// Skip when the same team already has any of these.
    pub skip_if: &'static [InsightType],
}

impl DetectorSpec {
    pub const fn new(kind: InsightType, stage: Stage, detect: DetectFn) -> Self {
        Self {
            kind,
            stage,
            detect,
            skip_if: &[],
        }
    }

    pub const fn skip_if(mut self, kinds: &'static [InsightType]) -> Self {
        self.skip_if = kinds;
        self
    }
}

impl std::fmt::Debug for DetectorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorSpec")
            .field("kind", &self.kind)
            .field("stage", &self.stage)
            .field("skip_if", &self.skip_if)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DetectorRegistry {
    specs: Vec<DetectorSpec>,
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl DetectorRegistry {
    pub fn new(specs: Vec<DetectorSpec>) -> Self {
        Self { specs }
    }

    pub fn standard() -> Self {
        use InsightType as T;
        use Stage::*;

        const NO_LEADER: &[InsightType] = &[InsightType::LeagueLeader];

        let specs = vec![
            DetectorSpec::new(T::WinningStreak, Team, streaks::winning_streak),
            DetectorSpec::new(T::ClutchStreak, Team, streaks::clutch_streak),
            DetectorSpec::new(T::LosingStreak, Team, streaks::losing_streak),
            DetectorSpec::new(T::BlowoutWins, Team, streaks::blowout_wins),
            DetectorSpec::new(T::CloseLosses, Team, streaks::close_losses),
            DetectorSpec::new(T::SuperSub, Team, players::super_sub),
            DetectorSpec::new(T::ThreePointDependent, Team, offense::three_point_dependent),
            DetectorSpec::new(T::PaintDominators, Team, offense::paint_dominators),
            DetectorSpec::new(T::AssistHeavy, Team, offense::assist_heavy),
            DetectorSpec::new(T::FreeThrowFactory, Team, offense::free_throw_factory),
            DetectorSpec::new(T::HighScoring, Team, offense::high_scoring),
            DetectorSpec::new(T::FastBreakKings, Team, offense::fast_break_kings),
            DetectorSpec::new(T::PaintDominance, Team, offense::paint_dominance),
            DetectorSpec::new(T::BenchPower, Team, offense::bench_power),
            DetectorSpec::new(T::StartingVsBench, Team, offense::starting_vs_bench),
            DetectorSpec::new(T::SecondChanceMasters, Team, offense::second_chance_masters),
            DetectorSpec::new(T::StrongBench, Team, offense::strong_bench),
            DetectorSpec::new(T::LineupDependent, Team, offense::lineup_dependent),
            DetectorSpec::new(T::DefensiveWall, Team, defense::defensive_wall),
            DetectorSpec::new(T::ReboundDominance, Team, defense::rebound_dominance),
            DetectorSpec::new(T::TurnoverCreators, Team, defense::turnover_creators),
            DetectorSpec::new(T::BlockParty, Team, defense::block_party),
            // Emits THREE_POINT_DEFENSE_GOOD or THREE_POINT_DEFENSE_BAD.
            DetectorSpec::new(T::ThreePointDefenseGood, Team, defense::three_point_defense),
            DetectorSpec::new(T::TurnoverCapitalization, Team, defense::turnover_capitalization),
            DetectorSpec::new(T::PointDiffTrend, Team, momentum::point_diff_trend),
            DetectorSpec::new(T::ScheduleStrength, Team, momentum::schedule_strength),
            DetectorSpec::new(T::SeasonHalves, Team, momentum::season_halves),
            DetectorSpec::new(T::DayOfWeek, Team, momentum::day_of_week),
            DetectorSpec::new(T::SlowStarters, Team, quarters::slow_starters),
            DetectorSpec::new(T::ComebackKings, Team, quarters::comeback_kings),
            DetectorSpec::new(T::FourthQuarterCollapse, Team, quarters::fourth_quarter_collapse),
            DetectorSpec::new(T::BestQuarter, Team, quarters::best_quarter),
            DetectorSpec::new(T::QuarterDominance, Team, quarters::quarter_dominance),
            DetectorSpec::new(T::LeagueLeader, Team, league::league_leader),
            DetectorSpec::new(T::AboveAverage, Team, league::above_average).skip_if(NO_LEADER),
            DetectorSpec::new(T::BelowAverage, Team, league::below_average).skip_if(NO_LEADER),
            DetectorSpec::new(T::HotHand, PlayerSpotlight, players::hot_hand),
            DetectorSpec::new(T::ColdSpell, PlayerSpotlight, players::cold_spell),
            DetectorSpec::new(T::KillerVsTeam, PlayerSpotlight, players::killer_vs_team),
            DetectorSpec::new(T::TeamLeader, PlayerSpotlight, players::team_leader),
            DetectorSpec::new(T::DoubleDoubleMachine, PlayerSpotlight, players::double_double_machine),
            DetectorSpec::new(T::AssistMachine, PlayerSpotlight, players::assist_machine),
            DetectorSpec::new(T::ReboundMachine, PlayerSpotlight, players::rebound_machine),
            DetectorSpec::new(T::MrConsistent, PlayerSpotlight, players::mr_consistent),
            DetectorSpec::new(T::BoomOrBust, PlayerSpotlight, players::boom_or_bust),
            DetectorSpec::new(T::HomeCourtHero, PlayerSpotlight, players::home_court_hero),
            DetectorSpec::new(T::RisingStar, PlayerSpotlight, players::rising_star),
            DetectorSpec::new(T::H2hVenue, Matchup, h2h::venue_split),
            DetectorSpec::new(T::H2hMarginTrend, Matchup, h2h::margin_trend),
            DetectorSpec::new(T::H2hTopScorer, Matchup, h2h::top_scorer),
            DetectorSpec::new(T::H2hFlip, Matchup, h2h::dominance_flip),
            DetectorSpec::new(T::BestCategory, Fallback, league::best_category),
            DetectorSpec::new(T::WorstCategory, Fallback, league::worst_category),
            DetectorSpec::new(T::StartingVsBench, Fallback, offense::starting_vs_bench),
        ];
        Self { specs }
    }

    pub fn with(mut self, spec: DetectorSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn stage(&self, stage: Stage) -> impl Iterator<Item = &DetectorSpec> {
        self.specs.iter().filter(move |s| s.stage == stage)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

pub(crate) fn one_decimal(v: f64) -> String {
    format!("{v:.1}")
}

pub(crate) fn whole(v: f64) -> String {
    format!("{v:.0}")
}

pub(crate) fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// " (3rd in the league)" or empty when unranked.
pub(crate) fn rank_suffix(rank: Option<usize>) -> String {
    rank.map(|r| format!(" ({} in the league)", ordinal(r)))
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod testkit {
    use super::*;
    use crate::aggregate::{aggregate_league, standings_from_aggregates};
    use crate::names::NoPlayerNames;

    /// Owns the inputs a detector context borrows from.
    pub struct Fixture {
        pub games: Vec<GameRecord>,
        pub league: Vec<TeamAggregate>,
        pub standings: Vec<LeagueStandingEntry>,
    }

    impl Fixture {
        pub fn new(games: Vec<GameRecord>) -> Self {
            let league = aggregate_league(&games);
            let standings = standings_from_aggregates(&league);
            Self {
                games,
                league,
                standings,
            }
        }

        pub fn run(&self, team: &str, opponent: &str, detect: DetectFn) -> Result<Option<Insight>> {
            let a = TeamContext::build(team, &self.games, &self.standings);
            let b = TeamContext::build(opponent, &self.games, &self.standings);
            let mut h2h: Vec<&GameRecord> = self
                .games
                .iter()
                .filter(|g| g.involves_both(team, opponent))
                .collect();
            h2h.sort_by(|x, y| x.date.cmp(&y.date));
            let ctx = DetectorContext {
                team: &a,
                opponent: &b,
                league: &self.league,
                standings: &self.standings,
                h2h: &h2h,
                names: &NoPlayerNames,
            };
            detect(&ctx)
        }
    }

    pub fn date(day: u32) -> String {
        let d = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date")
            + chrono::Duration::days(day as i64);
        d.format("%Y-%m-%d").to_string()
    }
}
