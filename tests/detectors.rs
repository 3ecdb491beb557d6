mod common;

use anyhow::Result;
use common::{game, player, run_of};
use hoops_insights::aggregate::{aggregate_league, standings_from_aggregates};
use hoops_insights::detectors::{DetectFn, DetectorContext, TeamContext, players, streaks};
use hoops_insights::insight::{Importance, Insight, InsightType};
use hoops_insights::model::GameRecord;
use hoops_insights::names::{MapPlayerNames, NoPlayerNames, PlayerNameLookup};

fn run(
    games: &[GameRecord],
    team: &str,
    opponent: &str,
    names: &dyn PlayerNameLookup,
    detect: DetectFn,
) -> Result<Option<Insight>> {
    let league = aggregate_league(games);
    let standings = standings_from_aggregates(&league);
    let a = TeamContext::build(team, games, &standings);
    let b = TeamContext::build(opponent, games, &standings);
    let h2h: Vec<&GameRecord> = games.iter().filter(|g| g.involves_both(team, opponent)).collect();
    let ctx = DetectorContext {
        team: &a,
        opponent: &b,
        league: &league,
        standings: &standings,
        h2h: &h2h,
        names,
    };
    detect(&ctx)
}

/// Eight games for one player, oldest first.
fn scorer(points: [u32; 8]) -> Vec<GameRecord> {
    points
        .iter()
        .enumerate()
        .map(|(i, pts)| {
            let mut g = game(&format!("h{i}"), i as i64 * 2, ("H", 90), ("O", 80));
            g.players.push(player(23, "H", *pts, 30.0));
            g
        })
        .collect()
}

#[test]
fn winning_streak_counts_only_the_current_run() {
    // Oldest first: W, L, W, W, W  ->  recent first: W, W, W, L, W.
    let games = run_of("X", "Y", &[6, -4, 8, 3, 12], 0);
    let insight = run(&games, "X", "Y", &NoPlayerNames, streaks::winning_streak)
        .unwrap()
        .unwrap();
    assert_eq!(insight.value, Some(3.0));
    assert_eq!(insight.importance, Importance::Medium);
}

#[test]
fn hot_hand_needs_half_again_the_season_average() {
    let hot = scorer([6, 5, 5, 5, 5, 16, 18, 20]);
    let insight = run(&hot, "H", "O", &NoPlayerNames, players::hot_hand)
        .unwrap()
        .unwrap();
    assert_eq!(insight.kind, InsightType::HotHand);
    assert_eq!(insight.player_id, Some(23));
    assert_eq!(insight.vars["recent_avg"], "18.0");
    assert_eq!(insight.vars["season_avg"], "10.0");

    let warm = scorer([10, 10, 9, 9, 9, 10, 11, 12]);
    assert!(run(&warm, "H", "O", &NoPlayerNames, players::hot_hand).unwrap().is_none());
}

#[test]
fn injected_names_replace_jerseys() {
    let hot = scorer([6, 5, 5, 5, 5, 16, 18, 20]);
    let names = MapPlayerNames::new([(23, "Ada Cole".to_string())].into());
    let named = run(&hot, "H", "O", &names, players::hot_hand).unwrap().unwrap();
    assert_eq!(named.vars["player"], "Ada Cole");
    let plain = run(&hot, "H", "O", &NoPlayerNames, players::hot_hand).unwrap().unwrap();
    assert_eq!(plain.vars["player"], "#23");
}

#[test]
fn malformed_record_is_an_error() {
    let mut games = run_of("X", "Y", &[6, 8, 3], 0);
    games[1].teams.truncate(1);
    assert!(run(&games, "X", "Y", &NoPlayerNames, streaks::winning_streak).is_err());
}
