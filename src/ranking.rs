use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::aggregate::{PlayerAggregate, TeamAggregate};

/// Team-level metric that can be ranked across the league.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Ppg,
    OppPpg,
    Rpg,
    Apg,
    Spg,
    Bpg,
    Topg,
    Fpg,
    FgPct,
    Fg3Pct,
    FtPct,
    TwoPtPpg,
    FastBreakPpg,
    PaintPpg,
    BenchPpg,
    SecondChancePpg,
    PointsOffTurnoversPpg,
    WinPct,
    PointDiff,
    TsPct,
    EfgPct,
    ThreePaRate,
    OffRtg,
    DefRtg,
    NetRtg,
    Pace,
    TovRate,
}

impl Metric {
    pub const ALL: [Metric; 27] = [
        Metric::Ppg,
        Metric::OppPpg,
        Metric::Rpg,
        Metric::Apg,
        Metric::Spg,
        Metric::Bpg,
        Metric::Topg,
        Metric::Fpg,
        Metric::FgPct,
        Metric::Fg3Pct,
        Metric::FtPct,
        Metric::TwoPtPpg,
        Metric::FastBreakPpg,
        Metric::PaintPpg,
        Metric::BenchPpg,
        Metric::SecondChancePpg,
        Metric::PointsOffTurnoversPpg,
        Metric::WinPct,
        Metric::PointDiff,
        Metric::TsPct,
        Metric::EfgPct,
        Metric::ThreePaRate,
        Metric::OffRtg,
        Metric::DefRtg,
        Metric::NetRtg,
        Metric::Pace,
        Metric::TovRate,
    ];

    /// Missing advanced splits count as 0.
    pub fn value(self, agg: &TeamAggregate) -> f64 {
        match self {
            Metric::Ppg => agg.ppg(),
            Metric::OppPpg => agg.opp_ppg(),
            Metric::Rpg => agg.rpg(),
            Metric::Apg => agg.apg(),
            Metric::Spg => agg.spg(),
            Metric::Bpg => agg.bpg(),
            Metric::Topg => agg.topg(),
            Metric::Fpg => agg.fpg(),
            Metric::FgPct => agg.fg_pct(),
            Metric::Fg3Pct => agg.fg3_pct(),
            Metric::FtPct => agg.ft_pct(),
            Metric::TwoPtPpg => agg.two_pt_ppg(),
            Metric::FastBreakPpg => agg.fast_break_ppg().unwrap_or(0.0),
            Metric::PaintPpg => agg.paint_ppg().unwrap_or(0.0),
            Metric::BenchPpg => agg.bench_ppg().unwrap_or(0.0),
            Metric::SecondChancePpg => agg.second_chance_ppg().unwrap_or(0.0),
            Metric::PointsOffTurnoversPpg => agg.points_off_turnovers_ppg().unwrap_or(0.0),
            Metric::WinPct => agg.win_pct(),
            Metric::PointDiff => agg.point_diff as f64,
            Metric::TsPct => agg.ts_pct(),
            Metric::EfgPct => agg.efg_pct(),
            Metric::ThreePaRate => agg.three_pa_rate(),
            Metric::OffRtg => agg.off_rtg(),
            Metric::DefRtg => agg.def_rtg(),
            Metric::NetRtg => agg.net_rtg(),
            Metric::Pace => agg.possessions(),
            Metric::TovRate => agg.tov_rate(),
        }
    }

    pub fn lower_is_better(self) -> bool {
        matches!(
            self,
            Metric::OppPpg | Metric::Topg | Metric::Fpg | Metric::DefRtg | Metric::TovRate
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Ppg => "points per game",
            Metric::OppPpg => "points allowed",
            Metric::Rpg => "rebounds per game",
            Metric::Apg => "assists per game",
            Metric::Spg => "steals per game",
            Metric::Bpg => "blocks per game",
            Metric::Topg => "turnovers per game",
            Metric::Fpg => "fouls per game",
            Metric::FgPct => "field goal percentage",
            Metric::Fg3Pct => "three-point percentage",
            Metric::FtPct => "free throw percentage",
            Metric::TwoPtPpg => "two-point scoring",
            Metric::FastBreakPpg => "fast-break points",
            Metric::PaintPpg => "paint points",
            Metric::BenchPpg => "bench points",
            Metric::SecondChancePpg => "second-chance points",
            Metric::PointsOffTurnoversPpg => "points off turnovers",
            Metric::WinPct => "win percentage",
            Metric::PointDiff => "point differential",
            Metric::TsPct => "true shooting percentage",
            Metric::EfgPct => "effective field goal percentage",
            Metric::ThreePaRate => "three-point attempt rate",
            Metric::OffRtg => "offensive rating",
            Metric::DefRtg => "defensive rating",
            Metric::NetRtg => "net rating",
            Metric::Pace => "pace",
            Metric::TovRate => "turnover rate",
        }
    }
}

/// 1-based league position of `team` by `metric`. Descending unless `ascending`.
/// Ties keep the input order. `None` when the team is not in `all`.
pub fn rank(team: &str, metric: Metric, all: &[TeamAggregate], ascending: bool) -> Option<usize> {
    rank_by(team, all, |agg| metric.value(agg), ascending)
}

/// Same as [`rank`] for a derived value that is not a named [`Metric`].
pub fn rank_by(
    team: &str,
    all: &[TeamAggregate],
    value: impl Fn(&TeamAggregate) -> f64,
    ascending: bool,
) -> Option<usize> {
    let mut sorted: Vec<(&str, f64)> = all
        .iter()
        .map(|agg| (agg.team.as_str(), value(agg)))
        .collect();
    sorted.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        if ascending { ord } else { ord.reverse() }
    });
    sorted.iter().position(|(name, _)| *name == team).map(|idx| idx + 1)
}

/// Rank using the metric's own direction convention.
pub fn rank_metric(team: &str, metric: Metric, all: &[TeamAggregate]) -> Option<usize> {
    rank(team, metric, all, metric.lower_is_better())
}

pub fn league_average(metric: Metric, all: &[TeamAggregate]) -> f64 {
    if all.is_empty() {
        return 0.0;
    }
    all.iter().map(|agg| metric.value(agg)).sum::<f64>() / all.len() as f64
}

/// Population standard deviation (denominator N).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

pub fn metric_std_dev(metric: Metric, all: &[TeamAggregate]) -> f64 {
    let values: Vec<f64> = all.iter().map(|agg| metric.value(agg)).collect();
    std_dev(&values)
}

/// Best `limit` teams by `metric`, in the metric's own direction. Ties keep input order.
pub fn top_teams(metric: Metric, all: &[TeamAggregate], limit: usize) -> Vec<(&TeamAggregate, f64)> {
    let mut sorted: Vec<(&TeamAggregate, f64)> = all.iter().map(|agg| (agg, metric.value(agg))).collect();
    sorted.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        if metric.lower_is_better() { ord } else { ord.reverse() }
    });
    sorted.truncate(limit);
    sorted
}

/// Per-game player figure used for leader boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerMetric {
    Ppg,
    Rpg,
    Apg,
    Spg,
    Bpg,
    Mpg,
    FgPct,
}

impl PlayerMetric {
    pub const ALL: [PlayerMetric; 7] = [
        PlayerMetric::Ppg,
        PlayerMetric::Rpg,
        PlayerMetric::Apg,
        PlayerMetric::Spg,
        PlayerMetric::Bpg,
        PlayerMetric::Mpg,
        PlayerMetric::FgPct,
    ];

    pub fn value(self, agg: &PlayerAggregate) -> f64 {
        match self {
            PlayerMetric::Ppg => agg.ppg(),
            PlayerMetric::Rpg => agg.rpg(),
            PlayerMetric::Apg => agg.apg(),
            PlayerMetric::Spg => agg.spg(),
            PlayerMetric::Bpg => agg.bpg(),
            PlayerMetric::Mpg => agg.mpg(),
            PlayerMetric::FgPct => agg.fg_pct(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlayerMetric::Ppg => "points",
            PlayerMetric::Rpg => "rebounds",
            PlayerMetric::Apg => "assists",
            PlayerMetric::Spg => "steals",
            PlayerMetric::Bpg => "blocks",
            PlayerMetric::Mpg => "minutes",
            PlayerMetric::FgPct => "field goal %",
        }
    }
}

/// Highest `limit` players by `metric`. Ties keep input order.
pub fn top_players<'a>(
    metric: PlayerMetric,
    players: impl IntoIterator<Item = &'a PlayerAggregate>,
    limit: usize,
) -> Vec<(&'a PlayerAggregate, f64)> {
    let mut sorted: Vec<(&PlayerAggregate, f64)> = players.into_iter().map(|p| (p, metric.value(p))).collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    sorted.truncate(limit);
    sorted
}

/// Ranks at or above this count as the top half of the league.
pub fn top_half_cutoff(team_count: usize) -> usize {
    team_count.div_ceil(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agg(team: &str, points: u32, games: u32) -> TeamAggregate {
        let mut a = TeamAggregate::empty(team);
        a.games_played = games;
        a.totals.points = points;
        a
    }

    #[test]
    fn rank_descending_and_ascending() {
        let all = vec![agg("A", 800, 10), agg("B", 900, 10), agg("C", 700, 10)];
        assert_eq!(rank("B", Metric::Ppg, &all, false), Some(1));
        assert_eq!(rank("C", Metric::Ppg, &all, false), Some(3));
        assert_eq!(rank("C", Metric::Ppg, &all, true), Some(1));
        assert_eq!(rank("Z", Metric::Ppg, &all, false), None);
    }

    #[test]
    fn ties_keep_input_order() {
        let all = vec![agg("A", 800, 10), agg("B", 800, 10)];
        assert_eq!(rank("A", Metric::Ppg, &all, false), Some(1));
        assert_eq!(rank("B", Metric::Ppg, &all, false), Some(2));
    }

    #[test]
    fn population_std_dev() {
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-9);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn top_half_rounds_up() {
        assert_eq!(top_half_cutoff(12), 6);
        assert_eq!(top_half_cutoff(7), 4);
        assert_eq!(top_half_cutoff(0), 0);
    }

    #[test]
    fn top_teams_respect_metric_direction() {
        let mut a = agg("A", 800, 10);
        a.totals.opp_points = 750;
        let mut b = agg("B", 900, 10);
        b.totals.opp_points = 700;
        let mut c = agg("C", 700, 10);
        c.totals.opp_points = 720;
        let all = vec![a, b, c];
        let scoring: Vec<&str> = top_teams(Metric::Ppg, &all, 2).iter().map(|(t, _)| t.team.as_str()).collect();
        assert_eq!(scoring, vec!["B", "A"]);
        let stingy = top_teams(Metric::OppPpg, &all, 5);
        assert_eq!(stingy.len(), 3);
        assert_eq!(stingy[0].0.team, "B");
        assert_eq!(stingy[2].1, 75.0);
    }

    #[test]
    fn player_leaders_by_per_game_value() {
        let player = |id: u32, points: u32, games: u32| {
            let mut p = PlayerAggregate {
                player_id: id,
                team: "A".to_string(),
                jersey: None,
                games_played: games,
                games_started: games,
                bench_games: 0,
                bench_points: 0,
                totals: Default::default(),
            };
            p.totals.points = points;
            p
        };
        let players = vec![player(1, 100, 10), player(2, 60, 4), player(3, 90, 10)];
        let leaders = top_players(PlayerMetric::Ppg, &players, 2);
        let ids: Vec<u32> = leaders.iter().map(|(p, _)| p.player_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(leaders[0].1, 15.0);
    }

    #[test]
    fn defensive_rating_ranks_ascending() {
        assert!(Metric::DefRtg.lower_is_better());
        assert!(Metric::TovRate.lower_is_better());
        assert!(!Metric::NetRtg.lower_is_better());
    }

    #[test]
    fn opponent_points_rank_ascending_by_default() {
        let mut a = agg("A", 800, 10);
        a.totals.opp_points = 700;
        let mut b = agg("B", 800, 10);
        b.totals.opp_points = 900;
        let all = vec![b, a];
        assert_eq!(rank_metric("A", Metric::OppPpg, &all), Some(1));
    }
}
