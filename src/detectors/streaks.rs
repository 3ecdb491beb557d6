use anyhow::Result;

use super::DetectorContext;
use crate::insight::{Importance, Insight, InsightType};

const MIN_WIN_STREAK: usize = 3;
const HIGH_WIN_STREAK: usize = 5;
const MIN_LOSS_STREAK: usize = 3;
const CLUTCH_MARGIN: i32 = 5;
const MIN_CLUTCH_STREAK: usize = 2;
const HIGH_CLUTCH_STREAK: usize = 4;
const BLOWOUT_MARGIN: i32 = 15;
const BLOWOUT_WINDOW: usize = 5;
const MIN_BLOWOUTS: usize = 2;
const MIN_CLOSE_LOSSES: usize = 3;

fn leading(margins: &[i32], pred: impl Fn(i32) -> bool) -> usize {
    margins.iter().take_while(|m| pred(**m)).count()
}

pub fn winning_streak(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let wins = leading(&ctx.team.margins()?, |m| m > 0);
    if wins < MIN_WIN_STREAK {
        return Ok(None);
    }
    let importance = if wins >= HIGH_WIN_STREAK {
        Importance::High
    } else {
        Importance::Medium
    };
    let label = ctx.team_label();
    Ok(Some(
        Insight::new(InsightType::WinningStreak, importance)
            .for_team(ctx.team_name())
            .value(wins as f64)
            .var("team_label", &label)
            .var("count", wins)
            .text(format!("{label} arrives on a {wins}-game winning streak"))
            .short(format!("{wins} straight wins")),
    ))
}

pub fn clutch_streak(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let wins = leading(&ctx.team.margins()?, |m| m > 0 && m <= CLUTCH_MARGIN);
    if wins < MIN_CLUTCH_STREAK {
        return Ok(None);
    }
    let importance = if wins >= HIGH_CLUTCH_STREAK {
        Importance::High
    } else {
        Importance::Medium
    };
    let label = ctx.team_label();
    Ok(Some(
        Insight::new(InsightType::ClutchStreak, importance)
            .for_team(ctx.team_name())
            .value(wins as f64)
            .var("team_label", &label)
            .var("count", wins)
            .text(format!(
                "{label} has won {wins} straight games by {CLUTCH_MARGIN} points or fewer"
            ))
            .short(format!("{wins} straight close wins")),
    ))
}

pub fn losing_streak(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let losses = leading(&ctx.team.margins()?, |m| m < 0);
    if losses < MIN_LOSS_STREAK {
        return Ok(None);
    }
    let label = ctx.team_label();
    Ok(Some(
        Insight::new(InsightType::LosingStreak, Importance::High)
            .for_team(ctx.team_name())
            .value(losses as f64)
            .var("team_label", &label)
            .var("count", losses)
            .text(format!("{label} has dropped {losses} in a row"))
            .short(format!("{losses} straight losses")),
    ))
}

pub fn blowout_wins(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let margins = ctx.team.margins()?;
    let blowouts = margins
        .iter()
        .take(BLOWOUT_WINDOW)
        .filter(|m| **m >= BLOWOUT_MARGIN)
        .count();
    if blowouts < MIN_BLOWOUTS {
        return Ok(None);
    }
    let label = ctx.team_label();
    Ok(Some(
        Insight::new(InsightType::BlowoutWins, Importance::Medium)
            .for_team(ctx.team_name())
            .value(blowouts as f64)
            .var("team_label", &label)
            .var("count", blowouts)
            .text(format!(
                "{label} has {blowouts} wins by {BLOWOUT_MARGIN}+ in its last {BLOWOUT_WINDOW} games"
            ))
            .short(format!("{blowouts} blowouts in last {BLOWOUT_WINDOW}")),
    ))
}

/// Abstains while a losing streak is active.
pub fn close_losses(ctx: &DetectorContext<'_>) -> Result<Option<Insight>> {
    let margins = ctx.team.margins()?;
    if leading(&margins, |m| m < 0) >= MIN_LOSS_STREAK {
        return Ok(None);
    }
    let close = margins
        .iter()
        .filter(|m| **m < 0 && **m >= -CLUTCH_MARGIN)
        .count();
    if close < MIN_CLOSE_LOSSES {
        return Ok(None);
    }
    let team = ctx.team_name();
    Ok(Some(
        Insight::new(InsightType::CloseLosses, Importance::Medium)
            .for_team(team)
            .value(close as f64)
            .var("count", close)
            .text(format!(
                "{team} has lost {close} games by {CLUTCH_MARGIN} or fewer this season, close to turning the corner"
            ))
            .short(format!("{close} close losses this season")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::testkit::{Fixture, date};
    use crate::model::GameRecord;
    use crate::model::fixtures::game;

    /// Games for "A" against "B", oldest first, from A's margins.
    fn series(margins: &[i32]) -> Vec<GameRecord> {
        margins
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let a = (80 + (*m).max(0)) as u32;
                let b = (80 - (*m).min(0)) as u32;
                game(&format!("g{i}"), &date(i as u32), ("A", a), ("B", b))
            })
            .collect()
    }

    #[test]
    fn winning_streak_counts_only_the_current_run() {
        // Recent-first W, W, W, L, W.
        let fx = Fixture::new(series(&[4, -3, 6, 2, 9]));
        let insight = fx.run("A", "B", winning_streak).unwrap().unwrap();
        assert_eq!(insight.value, Some(3.0));
        assert_eq!(insight.importance, Importance::Medium);
    }

    #[test]
    fn short_streak_abstains() {
        let fx = Fixture::new(series(&[4, -3, 6]));
        assert!(fx.run("A", "B", winning_streak).unwrap().is_none());
    }

    #[test]
    fn clutch_streak_needs_tight_margins() {
        let fx = Fixture::new(series(&[20, 3, 2, 5]));
        let insight = fx.run("A", "B", clutch_streak).unwrap().unwrap();
        assert_eq!(insight.value, Some(3.0));
    }

    #[test]
    fn close_losses_suppressed_by_losing_streak() {
        let fx = Fixture::new(series(&[-2, 10, -4, -1, -3]));
        assert!(fx.run("A", "B", close_losses).unwrap().is_none());
        let fx = Fixture::new(series(&[-2, -4, -1, 10]));
        assert_eq!(
            fx.run("A", "B", close_losses).unwrap().unwrap().value,
            Some(3.0)
        );
    }

    #[test]
    fn malformed_record_is_an_error() {
        let mut games = series(&[5, 5, 5]);
        games[1].teams.truncate(1);
        let fx = Fixture::new(games);
        assert!(fx.run("A", "B", winning_streak).is_err());
    }
}
