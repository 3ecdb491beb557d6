use anyhow::Result;

use super::{DetectorContext, one_decimal, ordinal};
use crate::insight::{Importance, Insight, InsightType};
use crate::ranking::{Metric, metric_std_dev};

const LEADER_METRICS: [Metric; 6] = [
    Metric::Ppg,
    Metric::Rpg,
    Metric::Apg,
    Metric::Spg,
    Metric::Bpg,
    Metric::OppPpg,
];
const SPREAD_METRICS: [Metric; 4] = [Metric::Ppg, Metric::Rpg, Metric::Apg, Metric::Spg];
const BEST_METRICS: [Metric; 7] = [
    Metric::Ppg,
    Metric::Rpg,
    Metric::Apg,
    Metric::Spg,
    Metric::FgPct,
    Metric::Fg3Pct,
    Metric::OppPpg,
];
const WORST_METRICS: [Metric; 4] = [Metric::Ppg, Metric::Rpg, Metric::Apg, Metric::OppPpg];

const LEADER_RANK: usize = 2;
const MIN_LEADER_CATEGORIES: usize = 2;
const MIN_SPREAD_CATEGORIES: usize = 3;
const STRONG_RANK: usize = 3;
const SOLID_RANK: usize = 8;
const WORST_RANK: usize = 10;

pub fn league_leader(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if ctx.team.games_played() == 0 {
        return Ok(None);
    }
    let agg = &ctx.team.aggregate;
    let leads: Vec<(Metric, usize)> = LEADER_METRICS
        .iter()
        .filter_map(|m| ctx.rank(*m).map(|r| (*m, r)))
        .filter(|(_, r)| *r <= LEADER_RANK)
        .collect();
    if leads.len() < MIN_LEADER_CATEGORIES {
        return Ok(None);
    }
    let describe = |(m, r): (Metric, usize)| {
        format!("{} in {} ({})", ordinal(r), m.label(), one_decimal(m.value(agg)))
    };
    let (first, second) = (describe(leads[0]), describe(leads[1]));
    let headline = if leads.iter().any(|(_, r)| *r == 1) {
        "is among the league's leaders"
    } else {
        "sits near the top of the league"
    };
    let team = ctx.team_name();
    Ok(Some(
        Insight::new(InsightType::LeagueLeader, Importance::High)
            .for_team(team)
            .value(leads.len() as f64)
            .var("headline", headline)
            .var("first", &first)
            .var("second", &second)
            .var("count", leads.len())
            .text(format!("{team} {headline}: {first}, {second}"))
            .short(format!(
                "top 2 in {} and {}",
                leads[0].0.label(),
                leads[1].0.label()
            )),
    ))
}

/// Metrics where the team sits more than one standard deviation from the league
/// average, above (`sign` 1.0) or below (`sign` -1.0).
fn outliers(ctx: &DetectorContext<'_>, sign: f64) -> Vec<String> {
    let agg = &ctx.team.aggregate;
    SPREAD_METRICS
        .iter()
        .filter_map(|m| {
            let value = m.value(agg);
            let diff = (value - ctx.league_avg(*m)) * sign;
            (diff > metric_std_dev(*m, ctx.league))
                .then(|| format!("{} ({})", m.label(), one_decimal(value)))
        })
        .collect()
}

pub fn above_average(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if ctx.team.games_played() == 0 {
        return Ok(None);
    }
    let above = outliers(ctx, 1.0);
    if above.len() < MIN_SPREAD_CATEGORIES {
        return Ok(None);
    }
    let team = ctx.team_name();
    let list = above.join(", ");
    Ok(Some(
        Insight::new(InsightType::AboveAverage, Importance::Medium)
            .for_team(team)
            .value(above.len() as f64)
            .var("categories", &list)
            .var("count", above.len())
            .text(format!("{team} is well above the league average: {list}"))
            .short(format!("above average in {} categories", above.len())),
    ))
}

pub fn below_average(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if ctx.team.games_played() == 0 {
        return Ok(None);
    }
    let below = outliers(ctx, -1.0);
    if below.len() < MIN_SPREAD_CATEGORIES || outliers(ctx, 1.0).len() >= MIN_SPREAD_CATEGORIES {
        return Ok(None);
    }
    let team = ctx.team_name();
    let list = below.join(", ");
    Ok(Some(
        Insight::new(InsightType::BelowAverage, Importance::Low)
            .for_team(team)
            .value(below.len() as f64)
            .var("categories", &list)
            .var("count", below.len())
            .text(format!("{team} trails the league average: {list}"))
            .short(format!("below average in {} categories", below.len())),
    ))
}

/// Zero values mean the stat was never recorded and are not ranked.
fn ranked(ctx: &DetectorContext<'_>, metrics: &[Metric]) -> Vec<(Metric, usize, f64)> {
    let agg = &ctx.team.aggregate;
    metrics
        .iter()
        .filter_map(|m| {
            let value = m.value(agg);
            if value == 0.0 {
                return None;
            }
            ctx.rank(*m).map(|r| (*m, r, value))
        })
        .collect()
}

/// Balancing fallback: the team's strongest ranked category, however modest.
pub fn best_category(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if ctx.team.games_played() == 0 {
        return Ok(None);
    }
    let mut best: Option<(Metric, usize, f64)> = None;
    for entry in ranked(ctx, &BEST_METRICS) {
        if best.is_none_or(|(_, r, _)| entry.1 < r) {
            best = Some(entry);
        }
    }
    let Some((metric, rank, value)) = best else {
        return Ok(None);
    };
    let lead = if rank <= STRONG_RANK {
        "a real strength"
    } else if rank <= SOLID_RANK {
        "a relative strength"
    } else {
        "its best category"
    };
    let team = ctx.team_name();
    let place = ordinal(rank);
    Ok(Some(
        Insight::new(InsightType::BestCategory, Importance::Low)
            .for_team(team)
            .value(value)
            .var("metric", metric.label())
            .var("rank", &place)
            .var("stat", one_decimal(value))
            .var("lead", lead)
            .text(format!(
                "{team}, {lead}: {place} in {} ({})",
                metric.label(),
                one_decimal(value)
            ))
            .short(format!("{place} in {}", metric.label()))
            .fallback(),
    ))
}

/// Balancing fallback: the team's weakest category, only when it ranks 10th or worse.
pub fn worst_category(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if ctx.team.games_played() == 0 {
        return Ok(None);
    }
    let mut worst: Option<(Metric, usize, f64)> = None;
    for entry in ranked(ctx, &WORST_METRICS) {
        if worst.is_none_or(|(_, r, _)| entry.1 > r) {
            worst = Some(entry);
        }
    }
    let Some((metric, rank, value)) = worst.filter(|(_, r, _)| *r >= WORST_RANK) else {
        return Ok(None);
    };
    let team = ctx.team_name();
    let place = ordinal(rank);
    Ok(Some(
        Insight::new(InsightType::WorstCategory, Importance::Low)
            .for_team(team)
            .value(value)
            .var("metric", metric.label())
            .var("rank", &place)
            .var("stat", one_decimal(value))
            .text(format!(
                "{team}'s main challenge: {place} in {} ({})",
                metric.label(),
                one_decimal(value)
            ))
            .short(format!("challenge: {place} in {}", metric.label()))
            .fallback(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::testkit::{Fixture, date};
    use crate::model::fixtures::game;
    use crate::model::{GameRecord, TeamStatLine};

    /// Twelve teams that only play "Bye"; "T0" is best at everything, "T11" worst.
    fn ladder() -> Vec<GameRecord> {
        let mut games = Vec::new();
        for t in 0..12u32 {
            for n in 0..5u32 {
                let own = format!("T{t}");
                let mut g = game(
                    &format!("{t}-{n}"),
                    &date(n * 12 + t),
                    (own.as_str(), 100 - t * 3),
                    ("Bye", 70),
                );
                g.teams[0].stats = Some(TeamStatLine {
                    rebounds: 50 - t * 2,
                    assists: 25 - t,
                    steals: 12 - t / 2,
                    ..TeamStatLine::default()
                });
                // Keep the shared opponent near the middle of every table.
                g.teams[1].stats = Some(TeamStatLine {
                    rebounds: 39,
                    assists: 19,
                    steals: 9,
                    ..TeamStatLine::default()
                });
                games.push(g);
            }
        }
        games
    }

    #[test]
    fn leader_needs_two_top_two_ranks() {
        let fx = Fixture::new(ladder());
        let insight = fx.run("T0", "T1", league_leader).unwrap().unwrap();
        assert_eq!(insight.importance, Importance::High);
        assert!(fx.run("T6", "T1", league_leader).unwrap().is_none());
    }

    #[test]
    fn best_category_is_a_low_fallback() {
        let fx = Fixture::new(ladder());
        let insight = fx.run("T9", "T0", best_category).unwrap().unwrap();
        assert!(insight.is_fallback);
        assert_eq!(insight.importance, Importance::Low);
    }

    #[test]
    fn worst_category_only_for_bottom_ranks() {
        let fx = Fixture::new(ladder());
        assert!(fx.run("T11", "T0", worst_category).unwrap().is_some());
        assert!(fx.run("T2", "T0", worst_category).unwrap().is_none());
    }

    #[test]
    fn above_and_below_are_exclusive() {
        let fx = Fixture::new(ladder());
        assert!(fx.run("T0", "T1", above_average).unwrap().is_some());
        assert!(fx.run("T0", "T1", below_average).unwrap().is_none());
        assert!(fx.run("T11", "T1", below_average).unwrap().is_some());
    }
}
