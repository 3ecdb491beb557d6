use anyhow::Result;

use super::offense::{rank_importance, top_half_rank};
use super::{DetectorContext, MIN_RATE_GAMES, one_decimal, rank_suffix};
use crate::insight::{Importance, Insight, InsightType};
use crate::ranking::Metric;

const WALL_MARGIN: f64 = 5.0;
const REBOUND_EDGE: f64 = 5.0;
const STEALS_MARGIN: f64 = 2.0;
const BLOCKS_PER_GAME: f64 = 4.0;
const TOP_BLOCKER_GAMES: u32 = 3;
const TOP_BLOCKER_BPG: f64 = 1.5;
const THREE_DEFENSE_MARGIN: f64 = 5.0;
const POINTS_OFF_TURNOVERS_PPG: f64 = 18.0;

fn enough_games(ctx: &DetectorContext<'_>) -> bool {
    ctx.team.games_played() >= MIN_RATE_GAMES
}

pub fn defensive_wall(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if !enough_games(ctx) {
        return Ok(None);
    }
    let allowed = ctx.team.aggregate.opp_ppg();
    let league = ctx.league_avg(Metric::OppPpg);
    if allowed >= league - WALL_MARGIN {
        return Ok(None);
    }
    let team = ctx.team_name();
    let rank = ctx.rank(Metric::OppPpg);
    let suffix = rank_suffix(rank);
    let diff = league - allowed;
    Ok(Some(
        Insight::new(InsightType::DefensiveWall, Importance::High)
            .for_team(team)
            .ranked(rank)
            .value(allowed)
            .var("opp_ppg", one_decimal(allowed))
            .var("league_avg", one_decimal(league))
            .var("diff", one_decimal(diff))
            .var("rank_text", &suffix)
            .text(format!(
                "{team}{suffix} brings an elite defense: opponents score {} a game, {} below the league average",
                one_decimal(allowed),
                one_decimal(diff)
            ))
            .short(format!("allows {} per game", one_decimal(allowed))),
    ))
}

/// Season rebounding edge over this specific opponent.
pub fn rebound_dominance(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if !enough_games(ctx) || ctx.opponent.games_played() == 0 {
        return Ok(None);
    }
    let diff = ctx.team.aggregate.rpg() - ctx.opponent.aggregate.rpg();
    if diff < REBOUND_EDGE {
        return Ok(None);
    }
    let team = ctx.team_name();
    let opponent = ctx.opponent_name();
    Ok(Some(
        Insight::new(InsightType::ReboundDominance, Importance::Medium)
            .for_team(team)
            .value(diff)
            .var("opponent", opponent)
            .var("diff", one_decimal(diff))
            .text(format!(
                "{team} holds a clear rebounding edge over {opponent}: {} more boards a game",
                one_decimal(diff)
            ))
            .short(format!("+{} rebounds", one_decimal(diff))),
    ))
}

pub fn turnover_creators(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if !enough_games(ctx) {
        return Ok(None);
    }
    let spg = ctx.team.aggregate.spg();
    let league = ctx.league_avg(Metric::Spg);
    if spg < league + STEALS_MARGIN {
        return Ok(None);
    }
    let rank = ctx.rank(Metric::Spg);
    let (importance, label) = match rank {
        Some(1) => (Importance::High, "leads the league in takeaways"),
        Some(2) => (Importance::High, "is one of the best at forcing turnovers"),
        _ => (Importance::Medium, "gets its hands on the ball"),
    };
    let team = ctx.team_name();
    let suffix = rank_suffix(rank);
    Ok(Some(
        Insight::new(InsightType::TurnoverCreators, importance)
            .for_team(team)
            .value(spg)
            .var("spg", one_decimal(spg))
            .var("diff", one_decimal(spg - league))
            .var("rank_text", &suffix)
            .text(format!(
                "{team}{suffix} {label}: {} steals a game, {} above the league average",
                one_decimal(spg),
                one_decimal(spg - league)
            ))
            .short(format!("{} steals per game", one_decimal(spg))),
    ))
}

pub fn block_party(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    if !enough_games(ctx) {
        return Ok(None);
    }
    let bpg = ctx.team.aggregate.bpg();
    if bpg < BLOCKS_PER_GAME {
        return Ok(None);
    }
    let rank = ctx.rank(Metric::Bpg);
    let importance = if rank.is_some_and(|r| r <= 2) {
        Importance::Medium
    } else {
        Importance::Low
    };

    let mut top: Option<(u32, Option<&str>, f64)> = None;
    for p in ctx.team.players.values() {
        if p.games_played < TOP_BLOCKER_GAMES {
            continue;
        }
        let player_bpg = p.bpg();
        if top.is_none_or(|(_, _, best)| player_bpg > best) {
            top = Some((p.player_id, p.jersey.as_deref(), player_bpg));
        }
    }
    let detail = match top {
        Some((id, jersey, player_bpg)) if player_bpg >= TOP_BLOCKER_BPG => format!(
            ", led by {} with {} a game",
            ctx.player_name(id, jersey),
            one_decimal(player_bpg)
        ),
        _ => String::new(),
    };

    let team = ctx.team_name();
    let suffix = rank_suffix(rank);
    Ok(Some(
        Insight::new(InsightType::BlockParty, importance)
            .for_team(team)
            .value(bpg)
            .var("bpg", one_decimal(bpg))
            .var("blocker_detail", &detail)
            .var("rank_text", &suffix)
            .text(format!(
                "{team}{suffix} protects the rim with {} blocks a game{detail}",
                one_decimal(bpg)
            ))
            .short(format!("{} blocks per game", one_decimal(bpg))),
    ))
}

/// Opponents' three-point accuracy against the league's. Reports either direction.
pub fn three_point_defense(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let agg = &ctx.team.aggregate;
    if !enough_games(ctx) || agg.totals.opp_three_pa == 0 {
        return Ok(None);
    }
    let allowed = agg.opp_fg3_pct();
    let league = ctx.league_avg(Metric::Fg3Pct);
    let diff = allowed - league;
    let team = ctx.team_name();
    let (kind, text, short) = if diff < -THREE_DEFENSE_MARGIN {
        (
            InsightType::ThreePointDefenseGood,
            format!(
                "{team} runs shooters off the line: opponents hit {}% from three against a {}% league average",
                one_decimal(allowed),
                one_decimal(league)
            ),
            format!("opponents {}% from three", one_decimal(allowed)),
        )
    } else if diff > THREE_DEFENSE_MARGIN {
        (
            InsightType::ThreePointDefenseBad,
            format!(
                "{team} gives up too much from deep: opponents hit {}% from three against a {}% league average",
                one_decimal(allowed),
                one_decimal(league)
            ),
            format!("allows {}% from three", one_decimal(allowed)),
        )
    } else {
        return Ok(None);
    };
    Ok(Some(
        Insight::new(kind, Importance::Medium)
            .for_team(team)
            .value(allowed)
            .var("opp_pct", one_decimal(allowed))
            .var("league_pct", one_decimal(league))
            .text(text)
            .short(short),
    ))
}

pub fn turnover_capitalization(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let Some(ppg) = ctx.team.aggregate.points_off_turnovers_ppg() else {
        return Ok(None);
    };
    if !enough_games(ctx) || ppg < POINTS_OFF_TURNOVERS_PPG {
        return Ok(None);
    }
    let Some(rank) = top_half_rank(ctx, Metric::PointsOffTurnoversPpg) else {
        return Ok(None);
    };
    let team = ctx.team_name();
    let suffix = rank_suffix(Some(rank));
    Ok(Some(
        Insight::new(InsightType::TurnoverCapitalization, rank_importance(rank))
            .for_team(team)
            .value(ppg)
            .var("ppg", one_decimal(ppg))
            .var("rank_text", &suffix)
            .text(format!(
                "{team}{suffix} makes opponents pay for mistakes: {} points off turnovers a game",
                one_decimal(ppg)
            ))
            .short(format!("{} points off turnovers", one_decimal(ppg))),
    ))
}
