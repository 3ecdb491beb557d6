use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::insight::{Category, InsightType};

const BUILTIN_JSON: &str = include_str!("../templates/en.json");

static BUILTIN: Lazy<Arc<TemplateSet>> = Lazy::new(|| match TemplateSet::from_json_str(BUILTIN_JSON) {
    Ok(set) => Arc::new(set),
    Err(err) => {
        warn!(error = %err, "builtin templates failed to parse; default sentences only");
        Arc::new(TemplateSet::default())
    }
});

/// Phrasing pools keyed by category key, then insight type name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateSet {
    pools: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl TemplateSet {
    pub fn builtin() -> Arc<TemplateSet> {
        Arc::clone(&BUILTIN)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let set: TemplateSet = serde_json::from_str(raw).context("parse template json")?;
        for (category, kinds) in &set.pools {
            for (kind, pool) in kinds {
                if pool.is_empty() {
                    bail!("template pool {category}/{kind} is empty");
                }
            }
        }
        Ok(set)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read templates {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn pool(&self, category: Category, kind: InsightType) -> Option<&[String]> {
        self.pools
            .get(category.key())
            .and_then(|kinds| kinds.get(kind.as_str()))
            .map(Vec::as_slice)
    }

    pub fn insert(&mut self, category: Category, kind: InsightType, pool: Vec<String>) {
        self.pools
            .entry(category.key().to_string())
            .or_default()
            .insert(kind.as_str().to_string(), pool);
    }

    /// (category key, type name, pool) in key order.
    pub fn pools(&self) -> impl Iterator<Item = (&str, &str, &[String])> {
        self.pools.iter().flat_map(|(category, kinds)| {
            kinds
                .iter()
                .map(move |(kind, pool)| (category.as_str(), kind.as_str(), pool.as_slice()))
        })
    }

    pub fn len(&self) -> usize {
        self.pools.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Replaces each `{name}` with its value in one left-to-right pass. Substituted
/// values are never rescanned. Unknown placeholders stay as written.
pub fn fill(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail[1..].find(['{', '}']).map(|i| i + 1) else {
            out.push_str(tail);
            return out;
        };
        if tail.as_bytes()[close] == b'{' {
            // Stray brace; resume at the next opening one.
            out.push_str(&tail[..close]);
            rest = &tail[close..];
            continue;
        }
        match vars.get(&tail[1..close]) {
            Some(value) => out.push_str(value),
            None => out.push_str(&tail[..=close]),
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

pub struct TemplateRenderer<R = StdRng> {
    set: Arc<TemplateSet>,
    rng: R,
}

impl TemplateRenderer<StdRng> {
    pub fn new(set: Arc<TemplateSet>) -> Self {
        Self::with_rng(set, StdRng::from_entropy())
    }

    pub fn seeded(set: Arc<TemplateSet>, seed: u64) -> Self {
        Self::with_rng(set, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> TemplateRenderer<R> {
    pub fn with_rng(set: Arc<TemplateSet>, rng: R) -> Self {
        Self { set, rng }
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.set
    }

    /// Uniform pick from the pool, then placeholder substitution. `None` when no pool exists.
    pub fn render(
        &mut self,
        category: Category,
        kind: InsightType,
        vars: &BTreeMap<String, String>,
    ) -> Option<String> {
        let pool = self.set.pool(category, kind).filter(|p| !p.is_empty())?;
        let idx = self.rng.gen_range(0..pool.len());
        Some(fill(&pool[idx], vars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn fill_leaves_unknown_placeholders() {
        let out = fill("{team} won {count} ({missing})", &vars(&[("team", "A"), ("count", "4")]));
        assert_eq!(out, "A won 4 ({missing})");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let out = fill(
            "{player} vs {team}",
            &vars(&[("player", "{team} fan"), ("team", "B")]),
        );
        assert_eq!(out, "{team} fan vs B");
        assert_eq!(fill("a { b {team}", &vars(&[("team", "C")])), "a { b C");
        assert_eq!(fill("open {team", &vars(&[("team", "C")])), "open {team");
    }

    #[test]
    fn missing_pool_renders_none() {
        let mut r = TemplateRenderer::seeded(Arc::new(TemplateSet::default()), 1);
        assert!(r.render(Category::Streaks, InsightType::WinningStreak, &vars(&[])).is_none());
    }

    #[test]
    fn seeded_renderers_agree() {
        let set = TemplateSet::builtin();
        let v = vars(&[("team", "A"), ("count", "4")]);
        let mut a = TemplateRenderer::seeded(Arc::clone(&set), 9);
        let mut b = TemplateRenderer::seeded(set, 9);
        for _ in 0..10 {
            assert_eq!(
                a.render(Category::Streaks, InsightType::WinningStreak, &v),
                b.render(Category::Streaks, InsightType::WinningStreak, &v)
            );
        }
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(TemplateSet::from_json_str(r#"{"streaks":{"WINNING_STREAK":[]}}"#).is_err());
    }

    #[test]
    fn builtin_pools_use_known_categories() {
        let set = TemplateSet::builtin();
        assert!(!set.is_empty());
        for (category, kind, pool) in set.pools() {
            let cat = Category::from_key(category).expect("known category");
            let ty = InsightType::ALL
                .iter()
                .find(|t| t.as_str() == kind)
                .expect("known insight type");
            assert_eq!(ty.category(), cat);
            assert!(!pool.is_empty());
        }
    }
}
