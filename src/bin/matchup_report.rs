use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use hoops_insights::aggregate::{
    TeamForm, aggregate_league, home_away_record, league_players, league_venue_summary,
};
use hoops_insights::composer::InsightComposer;
use hoops_insights::config::InsightConfig;
use hoops_insights::corpus::{GameCorpus, GameFilter, InMemoryCorpus};
use hoops_insights::insight::{Importance, Insight, MatchupReport};
use hoops_insights::model::GameRecord;
use hoops_insights::names::{MapPlayerNames, PlayerNameLookup, display_name};
use hoops_insights::ranking::{Metric, PlayerMetric, top_players, top_teams};
use hoops_insights::synthetic::SyntheticLeague;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = match parse_path_arg("--config") {
        Some(path) => InsightConfig::load(&path)?,
        None => InsightConfig::from_env(),
    };
    if let Some(seed) = parse_u64_arg("--seed") {
        config.seed = Some(seed);
    }
    if let Some(top) = parse_usize_arg("--top") {
        config.top_insights = top.max(1);
    }

    let corpus = match parse_path_arg("--corpus") {
        Some(path) => InMemoryCorpus::load_json_file(&path)?,
        None => {
            let league = SyntheticLeague::with_seed(parse_u64_arg("--synthetic").unwrap_or(7));
            info!(seed = league.seed, teams = league.teams, rounds = league.rounds, "generating synthetic league");
            InMemoryCorpus::from_games(league.generate())
        }
    };
    let teams = corpus.list_teams().context("list corpus teams")?;
    let team_a = match parse_string_arg("--team-a") {
        Some(team) => team,
        None => teams.first().cloned().context("corpus has no teams")?,
    };
    let team_b = match parse_string_arg("--team-b") {
        Some(team) => team,
        None => teams
            .iter()
            .find(|t| **t != team_a)
            .cloned()
            .context("corpus needs at least two teams")?,
    };
    for team in [&team_a, &team_b] {
        if !teams.contains(team) {
            bail!("team {team} not found in corpus");
        }
    }

    let top = config.top_insights;
    let max_per_category = config.max_per_category;
    let mut composer = InsightComposer::from_config(config);
    let names = match parse_path_arg("--names") {
        Some(path) => MapPlayerNames::load(&path)?,
        None => MapPlayerNames::default(),
    };
    composer = composer.with_names(names.clone());

    let season = parse_string_arg("--season");
    let report = composer.compose_from_corpus(&corpus, season.as_deref(), &team_a, &team_b)?;
    info!(
        games = corpus.len(),
        insights = report.len(),
        team_a = %team_a,
        team_b = %team_b,
        "matchup report composed"
    );

    if has_flag("--json") {
        let json = serde_json::to_string_pretty(&report).context("serialize report")?;
        println!("{json}");
        return Ok(());
    }
    print_report(&report, max_per_category, top);

    let filter = GameFilter {
        season: season.clone(),
        ..GameFilter::default()
    };
    let games = corpus.list_games(&filter).context("load games for tale of the tape")?;
    print_tape(&games, &report, &names);
    Ok(())
}

fn print_report(report: &MatchupReport, max_per_category: usize, top: usize) {
    println!("{} vs {}", report.team_a, report.team_b);
    println!();
    for form in [&report.form_a, &report.form_b].into_iter().flatten() {
        print_form(form);
    }
    println!();
    println!("Top {top}");
    for insight in report.top_insights(top) {
        println!("  {}", line(&insight));
    }
    println!();
    println!("Headlines");
    for insight in report.top_by_score(HEADLINES) {
        println!("  {:>3} {}", insight.score(), insight.text);
    }
    for (category, list) in report.filter_and_sort(max_per_category) {
        println!();
        println!("[{}]", category.key());
        for insight in &list {
            println!("  {}", line(insight));
        }
    }
}

const LEADER_LIMIT: usize = 3;
const HEADLINES: usize = 3;

fn print_tape(games: &[GameRecord], report: &MatchupReport, names: &dyn PlayerNameLookup) {
    let league = aggregate_league(games);
    println!();
    println!("[tale of the tape]");
    println!(
        "  {:<18} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
        "", "ORtg", "DRtg", "Net", "Pace", "TS%", "eFG%", "3PAr", "TOV%"
    );
    for team in [&report.team_a, &report.team_b] {
        let Some(agg) = league.iter().find(|a| &a.team == team) else {
            continue;
        };
        let adv = agg.advanced();
        println!(
            "  {:<18} {:>6.1} {:>6.1} {:>+6.1} {:>6.1} {:>6.1} {:>6.1} {:>6.1} {:>6.1}",
            adv.team,
            adv.off_rtg,
            adv.def_rtg,
            adv.net_rtg,
            adv.pace,
            adv.ts_pct,
            adv.efg_pct,
            adv.three_pa_rate,
            adv.tov_rate
        );
    }
    for team in [&report.team_a, &report.team_b] {
        let venue = home_away_record(games, team);
        println!(
            "  {:<18} home {} ({:.1}-{:.1})  away {} ({:.1}-{:.1})",
            venue.team,
            venue.home.record(),
            venue.home.ppg(),
            venue.home.opp_ppg(),
            venue.away.record(),
            venue.away.ppg(),
            venue.away.opp_ppg()
        );
    }
    let venues = league_venue_summary(games);
    println!("  league home wins {:.1}% of {} games", venues.home_win_pct(), venues.games);

    println!();
    println!("[league leaders]");
    for metric in [Metric::Ppg, Metric::OppPpg, Metric::NetRtg, Metric::TsPct] {
        let leaders: Vec<String> = top_teams(metric, &league, LEADER_LIMIT)
            .into_iter()
            .map(|(agg, value)| format!("{} {value:.1}", agg.team))
            .collect();
        println!("  {:<24} {}", metric.label(), leaders.join(", "));
    }
    let players = league_players(games);
    for metric in [PlayerMetric::Ppg, PlayerMetric::Rpg, PlayerMetric::Apg] {
        let leaders: Vec<String> = top_players(metric, &players, LEADER_LIMIT)
            .into_iter()
            .map(|(p, value)| {
                let name = display_name(names, p.player_id, p.jersey.as_deref());
                format!("{name} ({}) {value:.1}", p.team)
            })
            .collect();
        println!("  {:<24} {}", metric.label(), leaders.join(", "));
    }

    let conflicts = report.conflicts();
    if !conflicts.is_empty() {
        println!();
        println!("[storylines]");
        for conflict in conflicts {
            println!("  {}", conflict.text);
        }
    }
}

fn print_form(form: &TeamForm) {
    let streak = match form.streak {
        Some(streak) => format!("{:?} {}", streak.kind, streak.length),
        None => "-".to_string(),
    };
    println!(
        "{:<18} {:>2} gp  {:>5.1}-{:<5.1}  last {}: {}-{}  {:+.1}  {}  streak {}",
        form.team,
        form.season_games,
        form.season_ppg,
        form.season_opp_ppg,
        form.window,
        form.last_wins,
        form.window.min(form.season_games).saturating_sub(form.last_wins),
        form.momentum,
        form.trend.label(),
        streak
    );
}

fn line(insight: &Insight) -> String {
    let marker = match insight.importance {
        Importance::High => "!!",
        Importance::Medium => "! ",
        Importance::Low => "  ",
    };
    let fallback = if insight.is_fallback { " (fallback)" } else { "" };
    format!("{marker} {}{fallback}", insight.text)
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_string_arg(name).map(PathBuf::from)
}

fn parse_u64_arg(name: &str) -> Option<u64> {
    parse_string_arg(name).and_then(|raw| raw.parse::<u64>().ok())
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    parse_string_arg(name).and_then(|raw| raw.parse::<usize>().ok())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
