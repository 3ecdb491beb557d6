use anyhow::Result;

use super::{DetectorContext, MIN_RATE_GAMES, one_decimal, rank_suffix, whole};
use crate::insight::{Importance, Insight, InsightType};
use crate::ranking::{Metric, rank_by, top_half_cutoff};

const THREE_SHARE_MIN: f64 = 40.0;
const THREE_SHARE_HIGH: f64 = 50.0;
const PAINT_TWO_PT_MARGIN: f64 = 8.0;
const ASSIST_RATIO_MIN: f64 = 65.0;
// Above this the feed is almost certainly double counting assists.
const ASSIST_RATIO_SANE: f64 = 95.0;
const FTA_PER_GAME: f64 = 20.0;
const HIGH_SCORING_MARGIN: f64 = 10.0;
const FAST_BREAK_PPG: f64 = 15.0;
const PAINT_SHARE_MIN: f64 = 45.0;
const BENCH_POWER_PPG: f64 = 30.0;
const SECOND_CHANCE_PPG: f64 = 15.0;
const BENCH_SHARE_MIN: f64 = 25.0;
const BENCH_SHARE_STRONG: f64 = 35.0;
const STRONG_BENCH_SHARE: f64 = 30.0;
const STRONG_BENCH_PPG: f64 = 22.0;
const LINEUP_BENCH_SHARE_MAX: f64 = 25.0;

fn enough_games(ctx: &DetectorContext<'_>) -> bool {
    ctx.team.games_played() >= MIN_RATE_GAMES
}

/// League rank by `metric` when it sits in the top half, otherwise `None`.
pub(super) fn top_half_rank(ctx: &DetectorContext<'_>, metric: Metric) -> Option<usize> {
    ctx.rank(metric)
        .filter(|rank| *rank <= top_half_cutoff(ctx.team_count()))
}

pub(super) fn rank_importance(rank: usize) -> Importance {
    if rank == 1 {
        Importance::High
    } else {
        Importance::Medium
    }
}

pub fn three_point_dependent(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let agg = &ctx.team.aggregate;
    if !enough_games(ctx) || agg.totals.points == 0 {
        return Ok(None);
    }
    let share = agg.three_point_share();
    if share < THREE_SHARE_MIN {
        return Ok(None);
    }
    let rank = rank_by(ctx.team_name(), ctx.league, |a| a.three_point_share(), false);
    let importance = if share >= THREE_SHARE_HIGH {
        Importance::High
    } else {
        Importance::Medium
    };
    let team = ctx.team_name();
    let suffix = rank_suffix(rank);
    Ok(Some(
        Insight::new(InsightType::ThreePointDependent, importance)
            .for_team(team)
            .value(share)
            .var("share", whole(share))
            .var("rank_text", &suffix)
            .text(format!(
                "{}% of {team}'s points{suffix} come from beyond the arc",
                whole(share)
            ))
            .short(format!("{}% of points from three", whole(share))),
    ))
}

pub fn paint_dominators(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if !enough_games(ctx) {
        return Ok(None);
    }
    let two_ppg = ctx.team.aggregate.two_pt_ppg();
    let league = ctx.league_avg(Metric::TwoPtPpg);
    if two_ppg < league + PAINT_TWO_PT_MARGIN {
        return Ok(None);
    }
    let team = ctx.team_name();
    let diff = two_ppg - league;
    Ok(Some(
        Insight::new(InsightType::PaintDominators, Importance::Medium)
            .for_team(team)
            .value(two_ppg)
            .var("two_ppg", one_decimal(two_ppg))
            .var("diff", one_decimal(diff))
            .text(format!(
                "{team} lives inside: {} points a game on twos, {} above the league average",
                one_decimal(two_ppg),
                one_decimal(diff)
            ))
            .short(format!("{} points on twos", one_decimal(two_ppg))),
    ))
}

pub fn assist_heavy(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let agg = &ctx.team.aggregate;
    if !enough_games(ctx) || agg.totals.two_pm + agg.totals.three_pm == 0 {
        return Ok(None);
    }
    let ratio = agg.assist_ratio();
    if !(ASSIST_RATIO_MIN..=ASSIST_RATIO_SANE).contains(&ratio) {
        return Ok(None);
    }
    let rank = rank_by(ctx.team_name(), ctx.league, |a| a.assist_ratio(), false);
    let team = ctx.team_name();
    let suffix = rank_suffix(rank);
    Ok(Some(
        Insight::new(InsightType::AssistHeavy, Importance::Medium)
            .for_team(team)
            .value(ratio)
            .var("ratio", one_decimal(ratio))
            .var("rank_text", &suffix)
            .text(format!(
                "{}% of {team}'s baskets{suffix} are assisted, a true team offense",
                one_decimal(ratio)
            ))
            .short(format!("{}% assisted baskets", one_decimal(ratio))),
    ))
}

pub fn free_throw_factory(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if !enough_games(ctx) {
        return Ok(None);
    }
    let fta = ctx.team.aggregate.fta_per_game();
    if fta < FTA_PER_GAME {
        return Ok(None);
    }
    let team = ctx.team_name();
    Ok(Some(
        Insight::new(InsightType::FreeThrowFactory, Importance::Low)
            .for_team(team)
            .value(fta)
            .var("fta", one_decimal(fta))
            .text(format!(
                "{team} lives at the line with {} free throw attempts a game",
                one_decimal(fta)
            ))
            .short(format!("{} FTA per game", one_decimal(fta))),
    ))
}

pub fn high_scoring(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if !enough_games(ctx) {
        return Ok(None);
    }
    let ppg = ctx.team.aggregate.ppg();
    let league = ctx.league_avg(Metric::Ppg);
    if ppg < league + HIGH_SCORING_MARGIN {
        return Ok(None);
    }
    let team = ctx.team_name();
    let rank = ctx.rank(Metric::Ppg);
    let suffix = rank_suffix(rank);
    let diff = ppg - league;
    Ok(Some(
        Insight::new(InsightType::HighScoring, Importance::Medium)
            .for_team(team)
            .ranked(rank)
            .value(ppg)
            .var("ppg", one_decimal(ppg))
            .var("diff", one_decimal(diff))
            .var("rank_text", &suffix)
            .text(format!(
                "{team}{suffix} brings one of the league's most productive offenses: {} points a game, {} above average",
                one_decimal(ppg),
                one_decimal(diff)
            ))
            .short(format!("{} points per game", one_decimal(ppg))),
    ))
}

pub fn fast_break_kings(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let Some(ppg) = ctx.team.aggregate.fast_break_ppg() else {
        return Ok(None);
    };
    if !enough_games(ctx) || ppg < FAST_BREAK_PPG {
        return Ok(None);
    }
    let Some(rank) = top_half_rank(ctx, Metric::FastBreakPpg) else {
        return Ok(None);
    };
    let team = ctx.team_name();
    let suffix = rank_suffix(Some(rank));
    Ok(Some(
        Insight::new(InsightType::FastBreakKings, rank_importance(rank))
            .for_team(team)
            .value(ppg)
            .var("ppg", one_decimal(ppg))
            .var("rank", rank)
            .var("rank_text", &suffix)
            .text(format!(
                "{team}{suffix} loves to run: {} fast-break points a game",
                one_decimal(ppg)
            ))
            .short(format!("{} fast-break points", one_decimal(ppg))),
    ))
}

pub fn paint_dominance(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let agg = &ctx.team.aggregate;
    let (Some(share), Some(ppg)) = (agg.paint_share(), agg.paint_ppg()) else {
        return Ok(None);
    };
    if !enough_games(ctx) || share < PAINT_SHARE_MIN {
        return Ok(None);
    }
    let Some(rank) = top_half_rank(ctx, Metric::PaintPpg) else {
        return Ok(None);
    };
    let team = ctx.team_name();
    let suffix = rank_suffix(Some(rank));
    Ok(Some(
        Insight::new(InsightType::PaintDominance, rank_importance(rank))
            .for_team(team)
            .value(share)
            .var("share", whole(share))
            .var("ppg", one_decimal(ppg))
            .var("rank_text", &suffix)
            .text(format!(
                "{team}{suffix} owns the paint: {}% of its points come inside, {} a game",
                whole(share),
                one_decimal(ppg)
            ))
            .short(format!("{}% of points in the paint", whole(share))),
    ))
}

pub fn bench_power(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let agg = &ctx.team.aggregate;
    let Some(ppg) = agg.bench_ppg() else {
        return Ok(None);
    };
    if !enough_games(ctx) || ppg < BENCH_POWER_PPG {
        return Ok(None);
    }
    let Some(rank) = top_half_rank(ctx, Metric::BenchPpg) else {
        return Ok(None);
    };
    let share = agg.bench_share().unwrap_or(0.0);
    let label = match rank {
        1 => "the best bench in the league",
        2 => "an excellent bench",
        _ => "a strong bench",
    };
    let team = ctx.team_name();
    let suffix = rank_suffix(Some(rank));
    Ok(Some(
        Insight::new(InsightType::BenchPower, rank_importance(rank))
            .for_team(team)
            .value(ppg)
            .var("ppg", one_decimal(ppg))
            .var("share", whole(share))
            .var("rank_text", &suffix)
            .text(format!(
                "{team}{suffix} has {label}: {} points a game from reserves ({}% of the scoring)",
                one_decimal(ppg),
                whole(share)
            ))
            .short(format!("{} bench points", one_decimal(ppg))),
    ))
}

/// Starter/bench scoring split. Also a balancing fallback.
pub fn starting_vs_bench(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let agg = &ctx.team.aggregate;
    let (Some(bench_ppg), Some(bench_share)) = (agg.bench_ppg(), agg.bench_share()) else {
        return Ok(None);
    };
    if ctx.team.games_played() == 0 || bench_ppg <= 0.0 {
        return Ok(None);
    }
    let bench_share = bench_share.round();
    if bench_share < BENCH_SHARE_MIN {
        return Ok(None);
    }
    let starters_ppg = (agg.ppg() - bench_ppg).max(0.0);
    let starters_share = 100.0 - bench_share;
    let (importance, summary) = if bench_share >= BENCH_SHARE_STRONG {
        (
            Importance::Medium,
            format!(
                "a dominant bench, {}% of points from the starters and {}% from reserves",
                whole(starters_share),
                whole(bench_share)
            ),
        )
    } else {
        (
            Importance::Low,
            format!(
                "good balance between starters ({}%) and bench ({}%)",
                whole(starters_share),
                whole(bench_share)
            ),
        )
    };
    let team = ctx.team_name();
    Ok(Some(
        Insight::new(InsightType::StartingVsBench, importance)
            .for_team(team)
            .value(bench_share)
            .var("starters_ppg", one_decimal(starters_ppg))
            .var("bench_ppg", one_decimal(bench_ppg))
            .var("starters_share", whole(starters_share))
            .var("bench_share", whole(bench_share))
            .text(format!(
                "{team}: {summary}, {} vs {} points a game",
                one_decimal(starters_ppg),
                one_decimal(bench_ppg)
            ))
            .short(format!(
                "{}% starters, {}% bench",
                whole(starters_share),
                whole(bench_share)
            )),
    ))
}

pub fn second_chance_masters(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let Some(ppg) = ctx.team.aggregate.second_chance_ppg() else {
        return Ok(None);
    };
    if !enough_games(ctx) || ppg < SECOND_CHANCE_PPG {
        return Ok(None);
    }
    let Some(rank) = top_half_rank(ctx, Metric::SecondChancePpg) else {
        return Ok(None);
    };
    let team = ctx.team_name();
    let suffix = rank_suffix(Some(rank));
    Ok(Some(
        Insight::new(InsightType::SecondChanceMasters, rank_importance(rank))
            .for_team(team)
            .value(ppg)
            .var("ppg", one_decimal(ppg))
            .var("rank_text", &suffix)
            .text(format!(
                "{team}{suffix} punishes every miss with {} second-chance points a game",
                one_decimal(ppg)
            ))
            .short(format!("{} second-chance points", one_decimal(ppg))),
    ))
}

pub fn strong_bench(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let agg = &ctx.team.aggregate;
    let (Some(ppg), Some(share)) = (agg.bench_ppg(), agg.bench_share()) else {
        return Ok(None);
    };
    if !enough_games(ctx) || (share < STRONG_BENCH_SHARE && ppg < STRONG_BENCH_PPG) {
        return Ok(None);
    }
    let team = ctx.team_name();
    Ok(Some(
        Insight::new(InsightType::StrongBench, Importance::High)
            .for_team(team)
            .value(ppg)
            .var("ppg", one_decimal(ppg))
            .var("share", whole(share))
            .text(format!(
                "{team} gets real production from its reserves: {} points a game ({}% of the output)",
                one_decimal(ppg),
                whole(share)
            ))
            .short(format!("bench {} points", one_decimal(ppg))),
    ))
}

pub fn lineup_dependent(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let Some(share) = ctx.team.aggregate.bench_share() else {
        return Ok(None);
    };
    if !enough_games(ctx) || share > LINEUP_BENCH_SHARE_MAX {
        return Ok(None);
    }
    let team = ctx.team_name();
    Ok(Some(
        Insight::new(InsightType::LineupDependent, Importance::Medium)
            .for_team(team)
            .value(share)
            .var("share", whole(share))
            .text(format!(
                "{team} leans on its starting five: only {}% of the points come from the bench",
                whole(share)
            ))
            .short(format!("only {}% from the bench", whole(share))),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::testkit::{Fixture, date};
    use crate::model::fixtures::game;
    use crate::model::{GameRecord, TeamStatLine};

    fn season(team: &str, opp: &str, stats: TeamStatLine, score: u32, n: u32) -> Vec<GameRecord> {
        (0..n)
            .map(|i| {
                let mut g = game(&format!("{team}{i}"), &date(i), (team, score), (opp, 70));
                g.teams[0].stats = Some(stats.clone());
                g.teams[1].stats = Some(TeamStatLine::default());
                g
            })
            .collect()
    }

    #[test]
    fn three_point_share_over_forty_percent() {
        let stats = TeamStatLine {
            three_pm: 14,
            two_pm: 15,
            ..TeamStatLine::default()
        };
        let fx = Fixture::new(season("A", "B", stats, 84, 5));
        let insight = fx.run("A", "B", three_point_dependent).unwrap().unwrap();
        assert_eq!(insight.vars["share"], "50");
        assert_eq!(insight.importance, Importance::High);
    }

    #[test]
    fn rate_detectors_need_five_games() {
        let stats = TeamStatLine {
            fta: 30,
            ..TeamStatLine::default()
        };
        let fx = Fixture::new(season("A", "B", stats.clone(), 84, 4));
        assert!(fx.run("A", "B", free_throw_factory).unwrap().is_none());
        let fx = Fixture::new(season("A", "B", stats, 84, 5));
        assert!(fx.run("A", "B", free_throw_factory).unwrap().is_some());
    }

    #[test]
    fn assist_ratio_above_sanity_bound_is_ignored() {
        let stats = TeamStatLine {
            assists: 30,
            two_pm: 20,
            three_pm: 10,
            ..TeamStatLine::default()
        };
        let fx = Fixture::new(season("A", "B", stats, 70, 6));
        assert!(fx.run("A", "B", assist_heavy).unwrap().is_none());
    }

    #[test]
    fn advanced_splits_are_absent_without_data() {
        let fx = Fixture::new(season("A", "B", TeamStatLine::default(), 90, 6));
        assert!(fx.run("A", "B", fast_break_kings).unwrap().is_none());
        assert!(fx.run("A", "B", lineup_dependent).unwrap().is_none());
    }

    #[test]
    fn fast_break_kings_rank_first_is_high() {
        let stats = TeamStatLine {
            fast_break_points: Some(18),
            ..TeamStatLine::default()
        };
        let fx = Fixture::new(season("A", "B", stats, 90, 6));
        let insight = fx.run("A", "B", fast_break_kings).unwrap().unwrap();
        assert_eq!(insight.importance, Importance::High);
    }

    #[test]
    fn fast_break_kings_silent_below_top_half() {
        let fast_break = [("A", 30), ("B", 28), ("C", 25), ("D", 20), ("E", 10)];
        let line = |team: &str| TeamStatLine {
            fast_break_points: fast_break.iter().find(|(t, _)| *t == team).map(|(_, p)| *p),
            ..TeamStatLine::default()
        };
        let mut games = Vec::new();
        for round in 0..2 {
            for (i, (home, _)) in fast_break.iter().enumerate() {
                for (away, _) in &fast_break[i + 1..] {
                    let id = format!("{round}{home}{away}");
                    let mut g = game(&id, &date(games.len() as u32), (*home, 80), (*away, 75));
                    g.teams[0].stats = Some(line(*home));
                    g.teams[1].stats = Some(line(*away));
                    games.push(g);
                }
            }
        }
        let fx = Fixture::new(games);
        assert_eq!(fx.league.len(), 5);
        // D clears the per-game floor but ranks 4th of 5.
        assert!(fx.run("D", "A", fast_break_kings).unwrap().is_none());
        let third = fx.run("C", "A", fast_break_kings).unwrap().unwrap();
        assert_eq!(third.vars["rank"], "3");
        assert_eq!(third.importance, Importance::Medium);
    }

    #[test]
    fn bench_split_from_team_box() {
        let stats = TeamStatLine {
            bench_points: Some(36),
            ..TeamStatLine::default()
        };
        let fx = Fixture::new(season("A", "B", stats, 90, 6));
        let split = fx.run("A", "B", starting_vs_bench).unwrap().unwrap();
        assert_eq!(split.vars["bench_share"], "40");
        assert_eq!(split.importance, Importance::Medium);
        assert!(fx.run("A", "B", strong_bench).unwrap().is_some());
        assert!(fx.run("A", "B", lineup_dependent).unwrap().is_none());
    }
}
