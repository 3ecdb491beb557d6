use std::collections::BTreeMap;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use hoops_insights::aggregate::aggregate_league;
use hoops_insights::composer::InsightComposer;
use hoops_insights::corpus::InMemoryCorpus;
use hoops_insights::insight::{Category, InsightType};
use hoops_insights::synthetic::SyntheticLeague;
use hoops_insights::templates::{TemplateRenderer, TemplateSet};

fn bench_league_aggregate(c: &mut Criterion) {
    let games = SyntheticLeague::default().generate();
    c.bench_function("league_aggregate", |b| {
        b.iter(|| {
            let league = aggregate_league(black_box(&games));
            black_box(league.len());
        })
    });
}

fn bench_compose_matchup(c: &mut Criterion) {
    let league = SyntheticLeague::default();
    let games = league.generate();
    let teams = league.team_names();
    let composer = InsightComposer::new().with_seed(1);
    c.bench_function("compose_matchup", |b| {
        b.iter(|| {
            let report = composer.compose_matchup(&teams[0], &teams[1], black_box(&games), &[]);
            black_box(report.len());
        })
    });
}

fn bench_corpus_parse(c: &mut Criterion) {
    let raw = serde_json::to_string(&SyntheticLeague::default().generate()).unwrap();
    c.bench_function("corpus_parse", |b| {
        b.iter(|| {
            let corpus = InMemoryCorpus::from_json_str(black_box(&raw)).unwrap();
            black_box(corpus.len());
        })
    });
}

fn bench_template_render(c: &mut Criterion) {
    let mut renderer = TemplateRenderer::seeded(TemplateSet::builtin(), 3);
    let vars: BTreeMap<String, String> = [
        ("team_label", "Harbor Herons (#2)"),
        ("count", "6"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    c.bench_function("template_render", |b| {
        b.iter(|| {
            let text = renderer.render(Category::Streaks, InsightType::WinningStreak, black_box(&vars));
            black_box(text);
        })
    });
}

criterion_group!(
    perf,
    bench_league_aggregate,
    bench_compose_matchup,
    bench_corpus_parse,
    bench_template_render
);
criterion_main!(perf);
