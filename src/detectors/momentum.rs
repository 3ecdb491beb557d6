use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Datelike;

use super::{DetectorContext, one_decimal, whole};
use crate::aggregate::{mean, pct};
use crate::insight::{Importance, Insight, InsightType};
use crate::ranking::top_half_cutoff;

const TREND_MIN_GAMES: usize = 8;
const TREND_WINDOW: usize = 5;
const TREND_CHANGE: f64 = 5.0;
const SCHEDULE_MIN_PER_HALF: u32 = 3;
const SCHEDULE_GAP: f64 = 40.0;
const HALVES_MIN_PER_HALF: usize = 5;
const HALVES_CHANGE: f64 = 25.0;
const WEEKDAY_MIN_GAMES: u32 = 3;
const WEEKDAY_WIN_PCT: f64 = 75.0;

fn signed(v: f64) -> String {
    if v > 0.0 {
        format!("+{v:.1}")
    } else {
        one_decimal(v)
    }
}

fn record(wins: u32, games: u32) -> String {
    format!("{wins}-{}", games - wins)
}

pub fn point_diff_trend(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let margins = ctx.team.margins()?;
    if margins.len() < TREND_MIN_GAMES {
        return Ok(None);
    }
    let season = mean(margins.iter().map(|m| *m as f64));
    let recent = mean(margins.iter().take(TREND_WINDOW).map(|m| *m as f64));
    let change = recent - season;
    if change.abs() < TREND_CHANGE {
        return Ok(None);
    }
    let improving = change > 0.0;
    let team = ctx.team_name();
    let direction = if improving { "trending up" } else { "trending down" };
    Ok(Some(
        Insight::new(InsightType::PointDiffTrend, Importance::High)
            .for_team(team)
            .value(change)
            .var("season_diff", signed(season))
            .var("recent_diff", signed(recent))
            .var("change", signed(change))
            .var("direction", direction)
            .text(format!(
                "{team} is {direction}: {} per game over the last {TREND_WINDOW} against {} for the season",
                signed(recent),
                signed(season)
            ))
            .short(format!("point differential {direction}")),
    ))
}

/// Record against the top and bottom halves of the standings.
pub fn schedule_strength(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if ctx.standings.is_empty() {
        return Ok(None);
    }
    let cutoff = top_half_cutoff(ctx.standings.len());
    // Providers may list standings in any order; the rank field decides.
    let top_half: Vec<&str> = ctx
        .standings
        .iter()
        .filter(|s| s.rank <= cutoff)
        .map(|s| s.team.as_str())
        .collect();

    let (mut top_wins, mut top_games, mut bottom_wins, mut bottom_games) = (0, 0, 0, 0);
    for game in &ctx.team.games {
        let (own, opp) = game.sides(ctx.team_name())?;
        let won = own.score > opp.score;
        if top_half.contains(&opp.name.as_str()) {
            top_games += 1;
            top_wins += won as u32;
        } else {
            bottom_games += 1;
            bottom_wins += won as u32;
        }
    }
    if top_games < SCHEDULE_MIN_PER_HALF || bottom_games < SCHEDULE_MIN_PER_HALF {
        return Ok(None);
    }
    let top_pct = top_wins as f64 / top_games as f64 * 100.0;
    let bottom_pct = bottom_wins as f64 / bottom_games as f64 * 100.0;
    if (top_pct - bottom_pct).abs() < SCHEDULE_GAP {
        return Ok(None);
    }

    let team = ctx.team_name();
    let top_record = record(top_wins, top_games);
    let bottom_record = record(bottom_wins, bottom_games);
    let text = if top_pct > bottom_pct {
        format!(
            "{team} rises to the occasion: {top_record} ({}%) against the top {cutoff} of the standings, {bottom_record} ({}%) against the rest",
            whole(top_pct),
            whole(bottom_pct)
        )
    } else {
        format!(
            "{team} beats the teams it should but struggles up the table: {bottom_record} ({}%) against the bottom half, only {top_record} ({}%) against the top {cutoff}",
            whole(bottom_pct),
            whole(top_pct)
        )
    };
    Ok(Some(
        Insight::new(InsightType::ScheduleStrength, Importance::High)
            .for_team(team)
            .value(top_pct - bottom_pct)
            .var("top_record", &top_record)
            .var("bottom_record", &bottom_record)
            .var("top_pct", whole(top_pct))
            .var("bottom_pct", whole(bottom_pct))
            .var("cutoff", cutoff)
            .text(text)
            .short(format!(
                "vs top half {top_record}, vs bottom half {bottom_record}"
            )),
    ))
}

/// Win rate of the older half of the season against the newer half. With an odd
/// count the oldest game is left out.
pub fn season_halves(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let margins = ctx.team.margins()?;
    if margins.len() < HALVES_MIN_PER_HALF * 2 {
        return Ok(None);
    }
    let mid = margins.len() / 2;
    let recent = &margins[..mid];
    let earlier = &margins[mid..mid * 2];
    let wins = |half: &[i32]| half.iter().filter(|m| **m > 0).count() as u32;
    let (early_wins, late_wins) = (wins(earlier), wins(recent));
    let early_pct = pct(early_wins, mid as u32);
    let late_pct = pct(late_wins, mid as u32);
    let change = late_pct - early_pct;
    if change.abs() < HALVES_CHANGE {
        return Ok(None);
    }
    let team = ctx.team_name();
    let direction = if change > 0.0 { "improving" } else { "fading" };
    Ok(Some(
        Insight::new(InsightType::SeasonHalves, Importance::Medium)
            .for_team(team)
            .value(change)
            .var("direction", direction)
            .var("first_pct", whole(early_pct))
            .var("second_pct", whole(late_pct))
            .var("first_record", format!("{early_wins}/{mid}"))
            .var("second_record", format!("{late_wins}/{mid}"))
            .text(format!(
                "{team} is {direction} as the season goes on: {}% ({early_wins}/{mid}) in the first half, {}% ({late_wins}/{mid}) since",
                whole(early_pct),
                whole(late_pct)
            ))
            .short(format!("{direction}: {}{}%", if change > 0.0 { "+" } else { "" }, whole(change))),
    ))
}

/// Best weekday by win rate. Earlier weekdays win ties.
pub fn day_of_week(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let margins = ctx.team.margins()?;
    let mut days: BTreeMap<u32, (String, u32, u32)> = BTreeMap::new();
    for (game, margin) in ctx.team.games.iter().zip(&margins) {
        let entry = days
            .entry(game.date.weekday().num_days_from_monday())
            .or_insert_with(|| (game.date.format("%A").to_string(), 0, 0));
        entry.1 += 1;
        entry.2 += (*margin > 0) as u32;
    }

    let mut best: Option<(&str, u32, u32, f64)> = None;
    for (day, games, wins) in days.values() {
        if *games < WEEKDAY_MIN_GAMES {
            continue;
        }
        let win_pct = *wins as f64 / *games as f64 * 100.0;
        if win_pct >= WEEKDAY_WIN_PCT && best.is_none_or(|(_, _, _, b)| win_pct > b) {
            best = Some((day, *games, *wins, win_pct));
        }
    }
    let Some((day, games, wins, win_pct)) = best else {
        return Ok(None);
    };
    let team = ctx.team_name();
    Ok(Some(
        Insight::new(InsightType::DayOfWeek, Importance::Low)
            .for_team(team)
            .value(win_pct)
            .var("day", day)
            .var("wins", wins)
            .var("games", games)
            .var("win_pct", whole(win_pct))
            .text(format!("{team} is strong on {day}s: {wins} wins in {games} games"))
            .short(format!("{day}: {}%", whole(win_pct))),
    ))
}
