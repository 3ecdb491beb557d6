use anyhow::Result;

use super::{DetectorContext, one_decimal, whole};
use crate::insight::{Importance, Insight, InsightType};

const QUARTER_WINDOW: usize = 10;
const MIN_QUARTER_GAMES: usize = 5;
const SLOW_START_RATE: f64 = 0.5;
const COMEBACK_DEFICIT: i32 = 10;
const MIN_COMEBACKS: usize = 2;
const QUARTER_RATE: f64 = 70.0;
const BEST_QUARTER_DIFF: f64 = 2.5;

const QUARTER_NAMES: [&str; 4] = ["first", "second", "third", "fourth"];

/// Regulation quarters of one game from the team's side, with the final margin.
struct QuarterLine {
    own: [i32; 4],
    opp: [i32; 4],
    margin: i32,
}

impl QuarterLine {
    fn diff(&self, q: usize) -> i32 {
        self.own[q] - self.opp[q]
    }
}

/// The team's last games that carry all four quarters for both sides, recent first.
fn quarter_lines(ctx: &DetectorContext<'_>) -> Result<Vec<QuarterLine>> {
    let mut out = Vec::new();
    for game in ctx.team.games.iter().take(QUARTER_WINDOW) {
        let (own, opp) = game.sides(ctx.team_name())?;
        if own.quarters.len() < 4 || opp.quarters.len() < 4 {
            continue;
        }
        let mut line = QuarterLine {
            own: [0; 4],
            opp: [0; 4],
            margin: own.score as i32 - opp.score as i32,
        };
        for q in 0..4 {
            line.own[q] = own.quarters[q] as i32;
            line.opp[q] = opp.quarters[q] as i32;
        }
        out.push(line);
    }
    Ok(out)
}

/// Trailing at halftime often, but winning at least half of those games anyway.
pub fn slow_starters(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let lines = quarter_lines(ctx)?;
    let trailing: Vec<&QuarterLine> = lines.iter().filter(|l| l.diff(0) + l.diff(1) < 0).collect();
    if trailing.len() < MIN_QUARTER_GAMES {
        return Ok(None);
    }
    let wins = trailing.iter().filter(|l| l.margin > 0).count();
    let rate = wins as f64 / trailing.len() as f64;
    if rate < SLOW_START_RATE {
        return Ok(None);
    }
    let team = ctx.team_name();
    let deficits = trailing.len();
    Ok(Some(
        Insight::new(InsightType::SlowStarters, Importance::High)
            .for_team(team)
            .value(rate * 100.0)
            .var("wins", wins)
            .var("deficits", deficits)
            .var("pct", whole(rate * 100.0))
            .text(format!(
                "{team} starts slow but finishes strong: {wins} wins in {deficits} games it trailed at halftime"
            ))
            .short(format!("{wins}/{deficits} halftime comebacks")),
    ))
}

pub fn comeback_kings(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let lines = quarter_lines(ctx)?;
    let comebacks = lines
        .iter()
        .filter(|l| {
            let mut running = 0;
            let mut worst = 0;
            for q in 0..3 {
                running += l.diff(q);
                worst = worst.min(running);
            }
            l.margin > 0 && -worst >= COMEBACK_DEFICIT
        })
        .count();
    if comebacks < MIN_COMEBACKS {
        return Ok(None);
    }
    let team = ctx.team_name();
    Ok(Some(
        Insight::new(InsightType::ComebackKings, Importance::High)
            .for_team(team)
            .value(comebacks as f64)
            .var("comebacks", comebacks)
            .var("deficit", COMEBACK_DEFICIT)
            .text(format!(
                "{team} never looks beaten: {comebacks} wins after trailing by {COMEBACK_DEFICIT} or more"
            ))
            .short(format!("{comebacks} big comebacks")),
    ))
}

pub fn fourth_quarter_collapse(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let lines = quarter_lines(ctx)?;
    if lines.len() < MIN_QUARTER_GAMES {
        return Ok(None);
    }
    let lost = lines.iter().filter(|l| l.diff(3) < 0).count();
    let rate = lost as f64 / lines.len() as f64 * 100.0;
    if rate < QUARTER_RATE {
        return Ok(None);
    }
    let team = ctx.team_name();
    let games = lines.len();
    Ok(Some(
        Insight::new(InsightType::FourthQuarterCollapse, Importance::High)
            .for_team(team)
            .value(rate)
            .var("lost", lost)
            .var("games", games)
            .text(format!(
                "{team} has a fourth-quarter problem: it lost {lost} of its last {games} fourth quarters"
            ))
            .short(format!("{lost}/{games} fourth quarters lost")),
    ))
}

/// Quarter with the best average differential. Earlier quarters win ties.
pub fn best_quarter(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let lines = quarter_lines(ctx)?;
    if lines.len() < MIN_QUARTER_GAMES {
        return Ok(None);
    }
    let mut best: Option<(usize, f64)> = None;
    for q in 0..4 {
        let avg = lines.iter().map(|l| l.diff(q) as f64).sum::<f64>() / lines.len() as f64;
        if avg >= BEST_QUARTER_DIFF && best.is_none_or(|(_, b)| avg > b) {
            best = Some((q, avg));
        }
    }
    let Some((q, avg)) = best else {
        return Ok(None);
    };
    let team = ctx.team_name();
    let name = QUARTER_NAMES[q];
    Ok(Some(
        Insight::new(InsightType::BestQuarter, Importance::Low)
            .for_team(team)
            .value(avg)
            .var("quarter", q + 1)
            .var("quarter_name", name)
            .var("diff", one_decimal(avg))
            .text(format!(
                "The {name} quarter is where {team} does its damage: +{} points on average",
                one_decimal(avg)
            ))
            .short(format!("Q{}: +{}", q + 1, one_decimal(avg))),
    ))
}

/// First quarter, in order, that the team wins at a high rate.
pub fn quarter_dominance(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let lines = quarter_lines(ctx)?;
    if lines.len() < MIN_QUARTER_GAMES {
        return Ok(None);
    }
    let games = lines.len();
    for q in 0..4 {
        let won = lines.iter().filter(|l| l.diff(q) > 0).count();
        let rate = won as f64 / games as f64 * 100.0;
        if rate < QUARTER_RATE {
            continue;
        }
        let team = ctx.team_name();
        let name = QUARTER_NAMES[q];
        return Ok(Some(
            Insight::new(InsightType::QuarterDominance, Importance::Medium)
                .for_team(team)
                .value(rate)
                .var("quarter", q + 1)
                .var("quarter_name", name)
                .var("won", won)
                .var("games", games)
                .var("pct", whole(rate))
                .text(format!(
                    "{team} owns the {name} quarter: won it {won} times in its last {games} games ({}%)",
                    whole(rate)
                ))
                .short(format!("dominates Q{}", q + 1)),
        ));
    }
    Ok(None)
}
