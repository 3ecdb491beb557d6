use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Composer tuning. Detector thresholds are fixed in their detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub min_insights_per_team: usize,
    pub max_team_ratio: f64,
    pub max_per_category: usize,
    pub top_insights: usize,
    pub form_window: usize,
    pub seed: Option<u64>,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            min_insights_per_team: 5,
            max_team_ratio: 2.0,
            max_per_category: 3,
            top_insights: 8,
            form_window: 5,
            seed: None,
        }
    }
}

impl InsightConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies `INSIGHTS_*` overrides read through `lookup` on top of the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            min_insights_per_team: lookup("INSIGHTS_MIN_PER_TEAM")
                .and_then(|val| val.trim().parse::<usize>().ok())
                .unwrap_or(d.min_insights_per_team)
                .clamp(1, 20),
            max_team_ratio: lookup("INSIGHTS_MAX_RATIO")
                .and_then(|val| val.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(d.max_team_ratio)
                .max(1.0),
            max_per_category: lookup("INSIGHTS_MAX_PER_CATEGORY")
                .and_then(|val| val.trim().parse::<usize>().ok())
                .unwrap_or(d.max_per_category)
                .max(1),
            top_insights: lookup("INSIGHTS_TOP_N")
                .and_then(|val| val.trim().parse::<usize>().ok())
                .unwrap_or(d.top_insights)
                .max(1),
            form_window: lookup("INSIGHTS_FORM_WINDOW")
                .and_then(|val| val.trim().parse::<usize>().ok())
                .unwrap_or(d.form_window)
                .clamp(1, 20),
            seed: lookup("INSIGHTS_SEED").and_then(|val| val.trim().parse::<u64>().ok()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read insight config {}", path.display()))?;
        serde_json::from_str(&raw).context("parse insight config")
    }
}
