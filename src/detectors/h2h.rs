//! Head-to-head detectors. They run once per matchup from team A's side and read
//! only the meetings between the two teams, oldest first.

use std::collections::BTreeMap;

use anyhow::Result;

use super::{DetectorContext, one_decimal};
use crate::aggregate::mean;
use crate::insight::{Importance, Insight, InsightType};

const MIN_MEETINGS: usize = 4;
const VENUE_GAP: f64 = 40.0;
const MARGIN_SHIFT: f64 = 8.0;
const FLIP_MIN_MEETINGS: usize = 6;
const FLIP_SHARE: f64 = 0.7;
const SCORER_MIN_MEETINGS: usize = 3;
const SCORER_MIN_GAMES: u32 = 2;
const SCORER_MIN_PPG: f64 = 15.0;

fn signed(v: f64) -> String {
    if v > 0.0 {
        format!("+{v:.1}")
    } else {
        one_decimal(v)
    }
}

/// Team A's margins in each meeting, oldest first.
fn meeting_margins(ctx: &DetectorContext<'_>) -> Result<Vec<i32>> {
    ctx.h2h.iter().map(|g| g.margin_for(ctx.team_name())).collect()
}

pub fn venue_split(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if ctx.h2h.len() < MIN_MEETINGS {
        return Ok(None);
    }
    let (a, b) = (ctx.team_name(), ctx.opponent_name());
    let (mut home, mut home_wins, mut away, mut away_wins) = (0u32, 0u32, 0u32, 0u32);
    for game in ctx.h2h {
        let (own, opp) = game.sides(a)?;
        let won = own.score > opp.score;
        if own.is_home {
            home += 1;
            home_wins += won as u32;
        } else {
            away += 1;
            away_wins += won as u32;
        }
    }
    if home == 0 || away == 0 {
        return Ok(None);
    }
    let home_pct = home_wins as f64 / home as f64 * 100.0;
    let away_pct = away_wins as f64 / away as f64 * 100.0;
    if (home_pct - away_pct).abs() < VENUE_GAP {
        return Ok(None);
    }
    let home_record = format!("{home_wins}-{}", home - home_wins);
    let away_record = format!("{away_wins}-{}", away - away_wins);
    Ok(Some(
        Insight::new(InsightType::H2hVenue, Importance::High)
            .value(home_pct - away_pct)
            .var("team_a", a)
            .var("team_b", b)
            .var("home_record", &home_record)
            .var("away_record", &away_record)
            .text(format!(
                "Venue matters in this matchup: {a} is {home_record} at home and {away_record} on the road against {b}"
            ))
            .short(format!("home {home_record}, away {away_record}")),
    ))
}

pub fn margin_trend(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if ctx.h2h.len() < MIN_MEETINGS {
        return Ok(None);
    }
    let margins = meeting_margins(ctx)?;
    let mid = margins.len() / 2;
    let early = mean(margins[..mid].iter().map(|m| *m as f64));
    let late = mean(margins[mid..].iter().map(|m| *m as f64));
    let change = late - early;
    if change.abs() < MARGIN_SHIFT {
        return Ok(None);
    }
    let (a, b) = (ctx.team_name(), ctx.opponent_name());
    let improving = change > 0.0;
    let text = if improving {
        format!(
            "{a} is gaining ground on {b}: {} per meeting lately against {} in the earlier meetings",
            signed(late),
            signed(early)
        )
    } else {
        format!(
            "The gap between {a} and {b} is moving away from {a}: {} in the earlier meetings, {} lately",
            signed(early),
            signed(late)
        )
    };
    Ok(Some(
        Insight::new(InsightType::H2hMarginTrend, Importance::Medium)
            .value(change)
            .var("team_a", a)
            .var("team_b", b)
            .var("first_avg", signed(early))
            .var("second_avg", signed(late))
            .var("change", signed(change))
            .text(text)
            .short(if improving {
                "closing the gap in meetings"
            } else {
                "gap widening in meetings"
            }),
    ))
}

/// Best scorer across the meetings, from either team.
pub fn top_scorer(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if ctx.h2h.len() < SCORER_MIN_MEETINGS {
        return Ok(None);
    }
    // player_id -> (team, jersey, games, points)
    let mut totals: BTreeMap<u32, (&str, Option<&str>, u32, u32)> = BTreeMap::new();
    for game in ctx.h2h {
        for p in &game.players {
            if p.stats.minutes <= 0.0 {
                continue;
            }
            let entry = totals
                .entry(p.player_id)
                .or_insert((p.team.as_str(), p.jersey.as_deref(), 0, 0));
            entry.2 += 1;
            entry.3 += p.stats.points;
        }
    }

    let mut best: Option<(u32, &str, Option<&str>, u32, f64)> = None;
    for (id, (team, jersey, games, points)) in &totals {
        if *games < SCORER_MIN_GAMES {
            continue;
        }
        let ppg = *points as f64 / *games as f64;
        if ppg >= SCORER_MIN_PPG && best.is_none_or(|(.., b)| ppg > b) {
            best = Some((*id, *team, *jersey, *games, ppg));
        }
    }
    let Some((id, team, jersey, games, ppg)) = best else {
        return Ok(None);
    };
    let name = ctx.player_name(id, jersey);
    Ok(Some(
        Insight::new(InsightType::H2hTopScorer, Importance::High)
            .for_team(team)
            .player(id, &name)
            .value(ppg)
            .var("ppg", one_decimal(ppg))
            .var("games", games)
            .text(format!(
                "{name} of {team} owns this matchup: {} points a game across {games} meetings",
                one_decimal(ppg)
            ))
            .short(format!("{name}: {} in meetings", one_decimal(ppg))),
    ))
}

/// One side won most early meetings, the other most recent ones.
pub fn dominance_flip(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if ctx.h2h.len() < FLIP_MIN_MEETINGS {
        return Ok(None);
    }
    let margins = meeting_margins(ctx)?;
    let mid = margins.len() / 2;
    let (early, late) = margins.split_at(mid);
    let early_a = early.iter().filter(|m| **m > 0).count();
    let late_a = late.iter().filter(|m| **m > 0).count();
    let (early_b, late_b) = (early.len() - early_a, late.len() - late_a);
    let early_bar = early.len() as f64 * FLIP_SHARE;
    let late_bar = late.len() as f64 * FLIP_SHARE;

    let (a, b) = (ctx.team_name(), ctx.opponent_name());
    let (was, now, was_wins, now_wins) =
        if early_a as f64 >= early_bar && late_b as f64 >= late_bar {
            (a, b, early_a, late_b)
        } else if early_b as f64 >= early_bar && late_a as f64 >= late_bar {
            (b, a, early_b, late_a)
        } else {
            return Ok(None);
        };
    Ok(Some(
        Insight::new(InsightType::H2hFlip, Importance::High)
            .value(now_wins as f64)
            .var("team_a", a)
            .var("team_b", b)
            .var("former", was)
            .var("current", now)
            .var("former_wins", format!("{was_wins}/{}", early.len()))
            .var("current_wins", format!("{now_wins}/{}", late.len()))
            .text(format!(
                "The series has turned: {was} won {was_wins} of the first {} meetings, but {now} has taken {now_wins} of the last {}",
                early.len(),
                late.len()
            ))
            .short(format!("{now} flipped the series")),
    ))
}
