use std::collections::HashSet;

use anyhow::Result;

use super::{DetectorContext, one_decimal, whole};
use crate::aggregate::{PlayerAggregate, PlayerGame, PlayerLog, mean};
use crate::insight::{Importance, Insight, InsightType};
use crate::ranking::std_dev;

const MIN_PLAYER_GAMES: usize = 5;
const RECENT_WINDOW: usize = 3;
const HOT_RATIO: f64 = 1.5;
const HOT_MIN_AVG: f64 = 8.0;
const COLD_RATIO: f64 = 0.6;
const COLD_MIN_AVG: f64 = 10.0;
// Minutes context is only meaningful for regular rotation players.
const MIN_SEASON_MINUTES: f64 = 5.0;
const MORE_MINUTES: f64 = 1.25;
const FEWER_MINUTES: f64 = 0.75;
const USUAL_MINUTES_HIGH: f64 = 1.1;
const USUAL_MINUTES_LOW: f64 = 0.9;
const KILLER_MIN_MEETINGS: usize = 3;
const KILLER_RATIO: f64 = 1.3;
const LEADER_MIN_PPG: f64 = 15.0;
const DOUBLE_DOUBLE_SHARE: f64 = 0.5;
const ASSIST_MACHINE_APG: f64 = 5.0;
const REBOUND_MACHINE_RPG: f64 = 8.0;
const CV_WINDOW: usize = 10;
const CV_MIN_GAMES: usize = 7;
const CV_MIN_AVG: f64 = 10.0;
const CONSISTENT_MAX_CV: f64 = 25.0;
const VOLATILE_MIN_CV: f64 = 40.0;
const VENUE_MIN_GAMES: usize = 3;
const HOME_MIN_DIFF: f64 = 5.0;
const HOME_MIN_PPG: f64 = 12.0;
const RISING_MIN_GAMES: usize = 8;
const RISING_MIN_HALF: usize = 3;
const RISING_MIN_PCT: f64 = 40.0;
const RISING_MIN_RECENT: f64 = 12.0;
const SUPER_SUB_MIN_GAMES: u32 = 3;
const SUPER_SUB_MIN_PPG: f64 = 10.0;

fn log_name(ctx: &DetectorContext<'_>, log: &PlayerLog) -> String {
    ctx.player_name(log.player_id, log.jersey.as_deref())
}

fn avg_points<'a>(games: impl Iterator<Item = &'a PlayerGame>) -> f64 {
    mean(games.map(|g| g.points as f64))
}

fn avg_minutes<'a>(games: impl Iterator<Item = &'a PlayerGame>) -> f64 {
    mean(games.map(|g| g.minutes))
}

/// Coefficient of variation in percent.
fn cv(points: &[f64]) -> f64 {
    let m = points.iter().sum::<f64>() / points.len().max(1) as f64;
    if m == 0.0 {
        return 0.0;
    }
    std_dev(points) / m * 100.0
}

struct FormSwing {
    season: f64,
    recent: f64,
    season_minutes: f64,
    recent_minutes: f64,
}

impl FormSwing {
    fn of(log: &PlayerLog) -> Self {
        Self {
            season: log.avg_points(),
            recent: avg_points(log.games.iter().take(RECENT_WINDOW)),
            season_minutes: log.avg_minutes(),
            recent_minutes: avg_minutes(log.games.iter().take(RECENT_WINDOW)),
        }
    }

    fn minutes_ratio(&self) -> Option<f64> {
        (self.season_minutes > MIN_SEASON_MINUTES).then(|| self.recent_minutes / self.season_minutes)
    }
}

pub fn hot_hand(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    for log in ctx.team.logs.values() {
        if log.len() < MIN_PLAYER_GAMES {
            continue;
        }
        let swing = FormSwing::of(log);
        if swing.season < HOT_MIN_AVG || swing.recent < swing.season * HOT_RATIO {
            continue;
        }
        let name = log_name(ctx, log);
        let pct_above = (swing.recent / swing.season - 1.0) * 100.0;
        let note = match swing.minutes_ratio() {
            Some(r) if r > MORE_MINUTES => format!(
                " on {} minutes a night, up from {}",
                one_decimal(swing.recent_minutes),
                one_decimal(swing.season_minutes)
            ),
            Some(r) if r <= USUAL_MINUTES_HIGH => {
                format!(" on usual minutes ({})", one_decimal(swing.recent_minutes))
            }
            _ => String::new(),
        };
        let mut insight = Insight::new(InsightType::HotHand, Importance::High)
            .for_team(ctx.team_name())
            .player(log.player_id, &name)
            .value(swing.recent)
            .var("recent_avg", one_decimal(swing.recent))
            .var("season_avg", one_decimal(swing.season))
            .var("pct_above", whole(pct_above))
            .var("minutes_note", &note)
            .text(format!(
                "{name} is on fire: {} points over the last {RECENT_WINDOW} games against a {} season average (+{}%){note}",
                one_decimal(swing.recent),
                one_decimal(swing.season),
                whole(pct_above)
            ))
            .short(format!(
                "{name} hot ({} vs {})",
                one_decimal(swing.recent),
                one_decimal(swing.season)
            ));
        if let Some(r) = swing.minutes_ratio() {
            insight = insight.var("minutes_ratio", format!("{r:.2}"));
        }
        return Ok(Some(insight));
    }
    Ok(None)
}

pub fn cold_spell(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    for log in ctx.team.logs.values() {
        if log.len() < MIN_PLAYER_GAMES {
            continue;
        }
        let swing = FormSwing::of(log);
        if swing.season < COLD_MIN_AVG || swing.recent > swing.season * COLD_RATIO {
            continue;
        }
        let name = log_name(ctx, log);
        let pct_below = (1.0 - swing.recent / swing.season) * 100.0;
        let note = match swing.minutes_ratio() {
            Some(r) if r < FEWER_MINUTES => format!(
                " while playing only {} minutes against {} on the season",
                one_decimal(swing.recent_minutes),
                one_decimal(swing.season_minutes)
            ),
            Some(r) if r >= USUAL_MINUTES_LOW => format!(
                " despite usual minutes ({})",
                one_decimal(swing.recent_minutes)
            ),
            _ => String::new(),
        };
        let mut insight = Insight::new(InsightType::ColdSpell, Importance::Medium)
            .for_team(ctx.team_name())
            .player(log.player_id, &name)
            .value(swing.recent)
            .var("recent_avg", one_decimal(swing.recent))
            .var("season_avg", one_decimal(swing.season))
            .var("pct_below", whole(pct_below))
            .var("minutes_note", &note)
            .text(format!(
                "{name} has gone cold: {} points over the last {RECENT_WINDOW} games against a {} season average (-{}%){note}",
                one_decimal(swing.recent),
                one_decimal(swing.season),
                whole(pct_below)
            ))
            .short(format!(
                "{name} cold ({} vs {})",
                one_decimal(swing.recent),
                one_decimal(swing.season)
            ));
        if let Some(r) = swing.minutes_ratio() {
            insight = insight.var("minutes_ratio", format!("{r:.2}"));
        }
        return Ok(Some(insight));
    }
    Ok(None)
}

pub fn killer_vs_team(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let opponent = ctx.opponent_name();
    for log in ctx.team.logs.values() {
        let meetings: Vec<&PlayerGame> = log
            .games
            .iter()
            .filter(|g| g.opponent.as_deref() == Some(opponent))
            .collect();
        if meetings.len() < KILLER_MIN_MEETINGS {
            continue;
        }
        let season = log.avg_points();
        let h2h = avg_points(meetings.iter().copied());
        if season < HOT_MIN_AVG || h2h < season * KILLER_RATIO {
            continue;
        }
        let name = log_name(ctx, log);
        let pct_above = (h2h / season - 1.0) * 100.0;
        return Ok(Some(
            Insight::new(InsightType::KillerVsTeam, Importance::High)
                .for_team(ctx.team_name())
                .player(log.player_id, &name)
                .value(h2h)
                .var("opponent", opponent)
                .var("h2h_avg", one_decimal(h2h))
                .var("season_avg", one_decimal(season))
                .var("meetings", meetings.len())
                .var("pct_above", whole(pct_above))
                .text(format!(
                    "{name} feasts on {opponent}: {} points a game in {} meetings against a {} season average (+{}%)",
                    one_decimal(h2h),
                    meetings.len(),
                    one_decimal(season),
                    whole(pct_above)
                ))
                .short(format!("{name} torments {opponent}")),
        ));
    }
    Ok(None)
}

pub fn team_leader(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let mut best: Option<(&PlayerAggregate, f64)> = None;
    for agg in ctx.team.players.values() {
        if (agg.games_played as usize) < MIN_PLAYER_GAMES {
            continue;
        }
        let ppg = agg.ppg();
        if best.is_none_or(|(_, top)| ppg > top) {
            best = Some((agg, ppg));
        }
    }
    let Some((leader, ppg)) = best else {
        return Ok(None);
    };
    if ppg < LEADER_MIN_PPG {
        return Ok(None);
    }
    let name = ctx.player_name(leader.player_id, leader.jersey.as_deref());
    let team_ppg = ctx.team.aggregate.ppg();
    let share = if team_ppg > 0.0 { ppg / team_ppg * 100.0 } else { 0.0 };
    Ok(Some(
        Insight::new(InsightType::TeamLeader, Importance::High)
            .for_team(ctx.team_name())
            .player(leader.player_id, &name)
            .value(ppg)
            .var("ppg", one_decimal(ppg))
            .var("share", whole(share))
            .text(format!(
                "{name} leads {} with {} points per game, {}% of the team's scoring",
                ctx.team_name(),
                one_decimal(ppg),
                whole(share)
            ))
            .short(format!("{name}: leads with {}", one_decimal(ppg))),
    ))
}

fn is_double_double(g: &PlayerGame) -> bool {
    [g.points, g.rebounds, g.assists]
        .iter()
        .filter(|v| **v >= 10)
        .count()
        >= 2
}

pub fn double_double_machine(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    for log in ctx.team.logs.values() {
        if log.len() < MIN_PLAYER_GAMES {
            continue;
        }
        let doubles = log.games.iter().filter(|g| is_double_double(g)).count();
        let share = doubles as f64 / log.len() as f64;
        if share < DOUBLE_DOUBLE_SHARE {
            continue;
        }
        let name = log_name(ctx, log);
        return Ok(Some(
            Insight::new(InsightType::DoubleDoubleMachine, Importance::Medium)
                .for_team(ctx.team_name())
                .player(log.player_id, &name)
                .value(doubles as f64)
                .var("doubles", doubles)
                .var("games", log.len())
                .var("share", whole(share * 100.0))
                .text(format!(
                    "{name} is a double-double machine: {doubles} in {} games ({}%)",
                    log.len(),
                    whole(share * 100.0)
                ))
                .short(format!("{name}: {doubles}/{} double-doubles", log.len())),
        ));
    }
    Ok(None)
}

pub fn assist_machine(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let Some(agg) = ctx
        .team
        .players
        .values()
        .find(|p| p.games_played as usize >= MIN_PLAYER_GAMES && p.apg() >= ASSIST_MACHINE_APG)
    else {
        return Ok(None);
    };
    let name = ctx.player_name(agg.player_id, agg.jersey.as_deref());
    let apg = agg.apg();
    Ok(Some(
        Insight::new(InsightType::AssistMachine, Importance::Medium)
            .for_team(ctx.team_name())
            .player(agg.player_id, &name)
            .value(apg)
            .var("apg", one_decimal(apg))
            .text(format!(
                "{name} runs the offense for {} with {} assists per game",
                ctx.team_name(),
                one_decimal(apg)
            ))
            .short(format!("{name}: {} apg", one_decimal(apg))),
    ))
}

pub fn rebound_machine(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let Some(agg) = ctx
        .team
        .players
        .values()
        .find(|p| p.games_played as usize >= MIN_PLAYER_GAMES && p.rpg() >= REBOUND_MACHINE_RPG)
    else {
        return Ok(None);
    };
    let name = ctx.player_name(agg.player_id, agg.jersey.as_deref());
    let rpg = agg.rpg();
    Ok(Some(
        Insight::new(InsightType::ReboundMachine, Importance::Medium)
            .for_team(ctx.team_name())
            .player(agg.player_id, &name)
            .value(rpg)
            .var("rpg", one_decimal(rpg))
            .text(format!(
                "{name} owns the glass for {} with {} rebounds per game",
                ctx.team_name(),
                one_decimal(rpg)
            ))
            .short(format!("{name}: {} rpg", one_decimal(rpg))),
    ))
}

/// (log, mean, cv) for players with enough recent games at a meaningful scoring level.
fn recent_variability<'a>(ctx: &'a DetectorContext<'_>) -> Vec<(&'a PlayerLog, f64, f64)> {
    let window: HashSet<&str> = ctx
        .team
        .games
        .iter()
        .take(CV_WINDOW)
        .map(|g| g.id.as_str())
        .collect();
    ctx.team
        .logs
        .values()
        .filter_map(|log| {
            let points: Vec<f64> = log
                .games
                .iter()
                .filter(|g| window.contains(g.game_id.as_str()))
                .map(|g| g.points as f64)
                .collect();
            if points.len() < CV_MIN_GAMES {
                return None;
            }
            let m = points.iter().sum::<f64>() / points.len() as f64;
            (m >= CV_MIN_AVG).then(|| (log, m, cv(&points)))
        })
        .collect()
}

pub fn mr_consistent(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let mut best: Option<(&PlayerLog, f64, f64)> = None;
    for (log, m, c) in recent_variability(ctx) {
        if c < CONSISTENT_MAX_CV && best.is_none_or(|(_, _, top)| c < top) {
            best = Some((log, m, c));
        }
    }
    let Some((log, m, c)) = best else {
        return Ok(None);
    };
    let name = log_name(ctx, log);
    Ok(Some(
        Insight::new(InsightType::MrConsistent, Importance::Medium)
            .for_team(ctx.team_name())
            .player(log.player_id, &name)
            .value(c)
            .var("avg", one_decimal(m))
            .var("cv", whole(c))
            .text(format!(
                "{name} is as steady as they come: {} points a game with only {}% variation",
                one_decimal(m),
                whole(c)
            ))
            .short(format!("{name}: rock steady")),
    ))
}

pub fn boom_or_bust(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let mut best: Option<(&PlayerLog, f64, f64)> = None;
    for (log, m, c) in recent_variability(ctx) {
        if c > VOLATILE_MIN_CV && best.is_none_or(|(_, _, top)| c > top) {
            best = Some((log, m, c));
        }
    }
    let Some((log, m, c)) = best else {
        return Ok(None);
    };
    let name = log_name(ctx, log);
    Ok(Some(
        Insight::new(InsightType::BoomOrBust, Importance::Medium)
            .for_team(ctx.team_name())
            .player(log.player_id, &name)
            .value(c)
            .var("avg", one_decimal(m))
            .var("cv", whole(c))
            .text(format!(
                "{name} swings between big nights and quiet ones: {} points a game with {}% variation",
                one_decimal(m),
                whole(c)
            ))
            .short(format!("{name}: boom or bust")),
    ))
}

pub fn home_court_hero(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let mut best: Option<(&PlayerLog, f64, f64, f64)> = None;
    for log in ctx.team.logs.values() {
        let home = log.games.iter().filter(|g| g.is_home).count();
        let away = log.len() - home;
        if home < VENUE_MIN_GAMES || away < VENUE_MIN_GAMES {
            continue;
        }
        let home_ppg = avg_points(log.games.iter().filter(|g| g.is_home));
        let away_ppg = avg_points(log.games.iter().filter(|g| !g.is_home));
        let diff = home_ppg - away_ppg;
        if diff >= HOME_MIN_DIFF
            && home_ppg >= HOME_MIN_PPG
            && best.is_none_or(|(_, _, _, top)| diff > top)
        {
            best = Some((log, home_ppg, away_ppg, diff));
        }
    }
    let Some((log, home_ppg, away_ppg, diff)) = best else {
        return Ok(None);
    };
    let name = log_name(ctx, log);
    Ok(Some(
        Insight::new(InsightType::HomeCourtHero, Importance::Medium)
            .for_team(ctx.team_name())
            .player(log.player_id, &name)
            .value(diff)
            .var("home_ppg", one_decimal(home_ppg))
            .var("away_ppg", one_decimal(away_ppg))
            .var("diff", one_decimal(diff))
            .text(format!(
                "{name} thrives at home: {} points a game there against {} on the road",
                one_decimal(home_ppg),
                one_decimal(away_ppg)
            ))
            .short(format!("{name}: +{} at home", one_decimal(diff))),
    ))
}

pub fn rising_star(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let mut best: Option<(&PlayerLog, f64, f64, f64)> = None;
    for log in ctx.team.logs.values() {
        if log.len() < RISING_MIN_GAMES {
            continue;
        }
        let chrono: Vec<f64> = log.games.iter().rev().map(|g| g.points as f64).collect();
        let mid = chrono.len() / 2;
        let (first, second) = chrono.split_at(mid);
        if first.len() < RISING_MIN_HALF || second.len() < RISING_MIN_HALF {
            continue;
        }
        let first_avg = first.iter().sum::<f64>() / first.len() as f64;
        let second_avg = second.iter().sum::<f64>() / second.len() as f64;
        if first_avg == 0.0 {
            continue;
        }
        let rise = (second_avg - first_avg) / first_avg * 100.0;
        if rise >= RISING_MIN_PCT
            && second_avg >= RISING_MIN_RECENT
            && best.is_none_or(|(_, _, _, top)| rise > top)
        {
            best = Some((log, first_avg, second_avg, rise));
        }
    }
    let Some((log, first_avg, second_avg, rise)) = best else {
        return Ok(None);
    };
    let name = log_name(ctx, log);
    Ok(Some(
        Insight::new(InsightType::RisingStar, Importance::High)
            .for_team(ctx.team_name())
            .player(log.player_id, &name)
            .value(rise)
            .var("first_avg", one_decimal(first_avg))
            .var("second_avg", one_decimal(second_avg))
            .var("rise", whole(rise))
            .text(format!(
                "{name} is on the rise: from {} to {} points a game across the season (+{}%)",
                one_decimal(first_avg),
                one_decimal(second_avg),
                whole(rise)
            ))
            .short(format!("{name}: +{}% rise", whole(rise))),
    ))
}

pub fn super_sub(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let mut best: Option<(&PlayerAggregate, f64)> = None;
    for agg in ctx.team.players.values() {
        if agg.bench_games < SUPER_SUB_MIN_GAMES {
            continue;
        }
        let ppg = agg.bench_ppg();
        if ppg >= SUPER_SUB_MIN_PPG && best.is_none_or(|(_, top)| ppg > top) {
            best = Some((agg, ppg));
        }
    }
    let Some((agg, ppg)) = best else {
        return Ok(None);
    };
    let name = ctx.player_name(agg.player_id, agg.jersey.as_deref());
    Ok(Some(
        Insight::new(InsightType::SuperSub, Importance::High)
            .for_team(ctx.team_name())
            .player(agg.player_id, &name)
            .value(ppg)
            .var("ppg", one_decimal(ppg))
            .text(format!(
                "{name} comes off the {} bench for {} points a game",
                ctx.team_name(),
                one_decimal(ppg)
            ))
            .short(format!("{name}: {} off the bench", one_decimal(ppg))),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::testkit::{Fixture, date};
    use crate::model::GameRecord;
    use crate::model::fixtures::{game, player};

    /// One player (#9) for "A", points given oldest first.
    fn scoring_run(points: &[u32]) -> Vec<GameRecord> {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut g = game(&format!("g{i}"), &date(i as u32), ("A", 80), ("B", 70));
                g.players = vec![player(9, "A", *p, 30.0)];
                g
            })
            .collect()
    }

    #[test]
    fn hot_hand_fires_on_a_real_surge() {
        // 10 ppg over 8 games, last three 16, 18, 20.
        let fx = Fixture::new(scoring_run(&[6, 5, 5, 5, 5, 16, 18, 20]));
        let insight = fx.run("A", "B", hot_hand).unwrap().unwrap();
        assert_eq!(insight.player_id, Some(9));
        assert_eq!(insight.vars["recent_avg"], "18.0");
        assert_eq!(insight.vars["season_avg"], "10.0");
    }

    #[test]
    fn hot_hand_ignores_small_bumps() {
        let fx = Fixture::new(scoring_run(&[10, 9, 9, 10, 9, 10, 11, 12]));
        assert!(fx.run("A", "B", hot_hand).unwrap().is_none());
    }

    #[test]
    fn cold_spell_notes_usual_minutes() {
        let fx = Fixture::new(scoring_run(&[20, 22, 18, 20, 20, 6, 5, 4]));
        let insight = fx.run("A", "B", cold_spell).unwrap().unwrap();
        assert!(insight.vars["minutes_note"].contains("despite usual minutes"));
    }

    #[test]
    fn mr_consistent_prefers_lowest_variation() {
        let fx = Fixture::new(scoring_run(&[14, 15, 16, 15, 14, 16, 15, 15]));
        let insight = fx.run("A", "B", mr_consistent).unwrap().unwrap();
        assert_eq!(insight.player_id, Some(9));
        assert!(fx.run("A", "B", boom_or_bust).unwrap().is_none());
    }

    #[test]
    fn rising_star_compares_chronological_halves() {
        let fx = Fixture::new(scoring_run(&[8, 9, 8, 9, 15, 16, 17, 18]));
        let insight = fx.run("A", "B", rising_star).unwrap().unwrap();
        assert_eq!(insight.vars["first_avg"], "8.5");
        assert_eq!(insight.vars["second_avg"], "16.5");
    }

    #[test]
    fn super_sub_counts_bench_appearances_only() {
        let mut games = scoring_run(&[12, 12, 12, 12]);
        for g in &mut games {
            g.players[0].starter = Some(false);
        }
        let fx = Fixture::new(games);
        let insight = fx.run("A", "B", super_sub).unwrap().unwrap();
        assert_eq!(insight.vars["ppg"], "12.0");
    }
}
