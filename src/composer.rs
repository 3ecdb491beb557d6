use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::aggregate::{aggregate_league, standings_from_aggregates, team_form};
use crate::config::InsightConfig;
use crate::corpus::{GameCorpus, GameFilter};
use crate::detectors::{DetectorContext, DetectorRegistry, DetectorSpec, Stage, TeamContext};
use crate::insight::{Importance, Insight, InsightType, MatchupReport};
use crate::model::{GameRecord, LeagueStandingEntry};
use crate::names::{NoPlayerNames, PlayerNameLookup};
use crate::templates::{TemplateRenderer, TemplateSet};

/// Runs the detector registry over one matchup and assembles the report.
pub struct InsightComposer {
    registry: DetectorRegistry,
    templates: Arc<TemplateSet>,
    names: Box<dyn PlayerNameLookup>,
    config: InsightConfig,
}

impl Default for InsightComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightComposer {
    pub fn new() -> Self {
        Self::from_config(InsightConfig::default())
    }

    pub fn from_config(config: InsightConfig) -> Self {
        Self {
            registry: DetectorRegistry::standard(),
            templates: TemplateSet::builtin(),
            names: Box::new(NoPlayerNames),
            config,
        }
    }

    pub fn with_names(mut self, names: impl PlayerNameLookup + 'static) -> Self {
        self.names = Box::new(names);
        self
    }

    pub fn with_templates(mut self, templates: Arc<TemplateSet>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_registry(mut self, registry: DetectorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Fixes template selection so repeated calls render identical text.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Full report for `team_a` hosting `team_b`. An empty `standings` slice is
    /// replaced by standings derived from `games`.
    pub fn compose_matchup(
        &self,
        team_a: &str,
        team_b: &str,
        games: &[GameRecord],
        standings: &[LeagueStandingEntry],
    ) -> MatchupReport {
        let league = aggregate_league(games);
        let derived;
        let standings = if standings.is_empty() {
            derived = standings_from_aggregates(&league);
            derived.as_slice()
        } else {
            standings
        };

        let ctx_a = TeamContext::build(team_a, games, standings);
        let ctx_b = TeamContext::build(team_b, games, standings);
        let mut h2h: Vec<&GameRecord> = games
            .iter()
            .filter(|g| g.involves_both(team_a, team_b))
            .collect();
        h2h.sort_by(|x, y| x.date.cmp(&y.date));

        let for_a = DetectorContext {
            team: &ctx_a,
            opponent: &ctx_b,
            league: &league,
            standings,
            h2h: &h2h,
            names: self.names.as_ref(),
        };
        let for_b = for_a.flipped();

        let mut report = MatchupReport::new(team_a, team_b);
        for spec in self.registry.stage(Stage::Team) {
            for ctx in [&for_a, &for_b] {
                if spec.skip_if.iter().any(|k| report.has(ctx.team_name(), *k)) {
                    continue;
                }
                if let Some(insight) = run_detector(spec, ctx) {
                    report.push(insight);
                }
            }
        }
        self.spotlight(&mut report, &for_a, &for_b);
        for spec in self.registry.stage(Stage::Matchup) {
            if let Some(insight) = run_detector(spec, &for_a) {
                report.push(insight);
            }
        }

        self.balance(&mut report, &for_a, &for_b);
        self.render(&mut report);

        report.form_a = team_form(games, team_a, self.config.form_window);
        report.form_b = team_form(games, team_b, self.config.form_window);
        report
    }

    /// Pulls the season's games and standings from `corpus`, then composes.
    pub fn compose_from_corpus(
        &self,
        corpus: &dyn GameCorpus,
        season: Option<&str>,
        team_a: &str,
        team_b: &str,
    ) -> Result<MatchupReport> {
        let filter = GameFilter {
            season: season.map(str::to_string),
            ..GameFilter::default()
        };
        let games = corpus.list_games(&filter).context("load games for matchup")?;
        let standings = corpus
            .list_standings(season)
            .context("load standings for matchup")?;
        Ok(self.compose_matchup(team_a, team_b, &games, &standings))
    }

    /// One player insight per team. B skips the type A already showed.
    fn spotlight(
        &self,
        report: &mut MatchupReport,
        for_a: &DetectorContext<'_>,
        for_b: &DetectorContext<'_>,
    ) {
        let pick_a = self.first_spotlight(for_a, None);
        let taken = pick_a.as_ref().map(|i| i.kind);
        let pick_b = self.first_spotlight(for_b, taken);
        for insight in [pick_a, pick_b].into_iter().flatten() {
            report.push(insight);
        }
    }

    fn first_spotlight(
        &self,
        ctx: &DetectorContext<'_>,
        exclude: Option<InsightType>,
    ) -> Option<Insight> {
        self.registry
            .stage(Stage::PlayerSpotlight)
            .filter(|spec| Some(spec.kind) != exclude)
            .find_map(|spec| run_detector(spec, ctx))
    }

    /// Tops up the thinner side with fallback insights when the split is lopsided
    /// or either team is under the floor. B is topped up first.
    fn balance(
        &self,
        report: &mut MatchupReport,
        for_a: &DetectorContext<'_>,
        for_b: &DetectorContext<'_>,
    ) {
        let count_a = report.count_for_team(for_a.team_name());
        let count_b = report.count_for_team(for_b.team_name());
        let (most, least) = (count_a.max(count_b), count_a.min(count_b));
        let floor = self.config.min_insights_per_team;
        let ratio = most as f64 / least.max(1) as f64;
        if ratio <= self.config.max_team_ratio && least >= floor {
            return;
        }
        let target = floor.max((most as f64 / self.config.max_team_ratio).ceil() as usize);
        debug!(count_a, count_b, target, ratio, "balancing insight counts");

        for ctx in [for_b, for_a] {
            let team = ctx.team_name();
            let mut count = report.count_for_team(team);
            for spec in self.registry.stage(Stage::Fallback) {
                if count >= target {
                    break;
                }
                if report.has(team, spec.kind) {
                    continue;
                }
                let Some(mut insight) = run_detector(spec, ctx) else {
                    continue;
                };
                insight.is_fallback = true;
                insight.importance = Importance::Low;
                debug!(team, kind = %insight.kind, "added fallback insight");
                report.push(insight);
                count += 1;
            }
        }
    }

    fn render(&self, report: &mut MatchupReport) {
        let mut renderer = match self.config.seed {
            Some(seed) => TemplateRenderer::seeded(Arc::clone(&self.templates), seed),
            None => TemplateRenderer::new(Arc::clone(&self.templates)),
        };
        for insight in report.iter_mut() {
            if let Some(text) = renderer.render(insight.category, insight.kind, &insight.vars) {
                insight.text = text;
            }
        }
    }
}

/// Runs one detector. Errors and panics are logged and count as abstention.
fn run_detector(spec: &DetectorSpec, ctx: &DetectorContext<'_>) -> Option<Insight> {
    match panic::catch_unwind(AssertUnwindSafe(|| (spec.detect)(ctx))) {
        Ok(Ok(found)) => found,
        Ok(Err(err)) => {
            warn!(detector = %spec.kind, team = ctx.team_name(), error = %err, "detector failed; skipped");
            None
        }
        Err(_) => {
            warn!(detector = %spec.kind, team = ctx.team_name(), "detector panicked; skipped");
            None
        }
    }
}
