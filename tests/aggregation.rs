mod common;

use common::{game, player, run_of, with_stats};
use hoops_insights::aggregate::{
    StreakKind, aggregate_league, aggregate_players, aggregate_team, current_streak,
    home_away_record, league_players,
};
use hoops_insights::model::TeamStatLine;
use hoops_insights::ranking::{Metric, PlayerMetric, rank, rank_metric, top_players, top_teams};
use hoops_insights::synthetic::SyntheticLeague;

#[test]
fn averages_are_sums_over_games_played() {
    let games = vec![
        with_stats(
            game("1", 0, ("A", 100), ("B", 90)),
            TeamStatLine { rebounds: 40, assists: 20, ..TeamStatLine::default() },
            TeamStatLine { rebounds: 30, ..TeamStatLine::default() },
        ),
        with_stats(
            game("2", 2, ("C", 80), ("A", 85)),
            TeamStatLine::default(),
            TeamStatLine { rebounds: 50, assists: 25, ..TeamStatLine::default() },
        ),
        game("3", 4, ("B", 70), ("C", 60)),
    ];
    let agg = aggregate_team(&games, "A");
    assert_eq!(agg.games_played, 2);
    assert_eq!(agg.wins, 2);
    assert_eq!(agg.totals.points, 185);
    assert!((agg.ppg() - 92.5).abs() < 1e-9);
    assert!((agg.rpg() - 45.0).abs() < 1e-9);
    assert!((agg.apg() - 22.5).abs() < 1e-9);
    assert!((agg.opp_ppg() - 85.0).abs() < 1e-9);
}

#[test]
fn team_box_wins_over_player_sums() {
    let mut g = with_stats(
        game("1", 0, ("A", 10), ("B", 8)),
        TeamStatLine { rebounds: 12, ..TeamStatLine::default() },
        TeamStatLine::default(),
    );
    let mut p = player(1, "A", 10, 30.0);
    p.stats.rebounds = 9;
    g.players.push(p);
    assert_eq!(aggregate_team(&[g.clone()], "A").totals.rebounds, 12);

    g.teams[0].stats = None;
    assert_eq!(aggregate_team(&[g], "A").totals.rebounds, 9);
}

#[test]
fn zero_minute_games_do_not_count_for_players() {
    let mut g1 = game("1", 0, ("A", 20), ("B", 10));
    g1.players.push(player(7, "A", 20, 30.0));
    let mut g2 = game("2", 2, ("A", 20), ("B", 10));
    g2.players.push(player(7, "A", 0, 0.0));
    let players = aggregate_players(&[g1, g2], "A");
    assert_eq!(players[&7].games_played, 1);
    assert!((players[&7].ppg() - 20.0).abs() < 1e-9);
}

#[test]
fn rank_follows_metric_value() {
    let mut games = run_of("A", "Z", &[10, 10], 0);
    games.extend(run_of("B", "Z", &[5, 5], 10));
    games.extend(run_of("C", "Z", &[1, 1], 20));
    let league = aggregate_league(&games);
    let ppg = |t: &str| rank(t, Metric::Ppg, &league, false).unwrap();
    assert!(ppg("A") < ppg("B"));
    assert!(ppg("B") < ppg("C"));
    // Allowed points: lower is better, and "Z" concedes the most.
    assert_eq!(rank_metric("Z", Metric::OppPpg, &league), Some(4));
    assert_eq!(rank("nobody", Metric::Ppg, &league, false), None);
}

#[test]
fn streak_stops_at_first_loss() {
    let streak = current_streak(&[4, 9, 2, -3, 11]).unwrap();
    assert_eq!(streak.kind, StreakKind::Win);
    assert_eq!(streak.length, 3);
}

#[test]
fn synthetic_league_leaders_agree_with_ranks() {
    let games = SyntheticLeague::default().generate();
    let league = aggregate_league(&games);
    for metric in [Metric::NetRtg, Metric::DefRtg, Metric::Pace, Metric::TsPct] {
        let (leader, _) = top_teams(metric, &league, 1)[0];
        assert_eq!(rank_metric(&leader.team, metric, &league), Some(1), "{metric:?}");
    }
    for agg in &league {
        let adv = agg.advanced();
        assert!(adv.pace > 0.0 && adv.ts_pct > 0.0, "{}", agg.team);
        let venue = home_away_record(&games, &agg.team);
        assert_eq!(venue.home.games + venue.away.games, agg.games_played);
        assert_eq!(venue.home.wins + venue.away.wins, agg.wins);
    }
    let players = league_players(&games);
    let best = top_players(PlayerMetric::Ppg, &players, 5);
    assert_eq!(best.len(), 5);
    assert!(best.windows(2).all(|w| w[0].1 >= w[1].1));
}
