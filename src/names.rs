use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Optional player-name enrichment. Resolved once when the composer is built.
pub trait PlayerNameLookup: Send + Sync {
    fn name_for(&self, player_id: u32) -> Option<String>;
}

/// No enrichment: players are shown by jersey.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlayerNames;

impl PlayerNameLookup for NoPlayerNames {
    fn name_for(&self, _player_id: u32) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapPlayerNames {
    names: HashMap<u32, String>,
}

impl MapPlayerNames {
    pub fn new(names: HashMap<u32, String>) -> Self {
        Self { names }
    }

    /// Reads `{"<player_id>": "<name>"}`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read player names {}", path.display()))?;
        let parsed: HashMap<String, String> =
            serde_json::from_str(&raw).context("parse player names json")?;
        let names = parsed
            .into_iter()
            .filter_map(|(id, name)| id.trim().parse::<u32>().ok().map(|id| (id, name)))
            .collect();
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl PlayerNameLookup for MapPlayerNames {
    fn name_for(&self, player_id: u32) -> Option<String> {
        self.names.get(&player_id).cloned()
    }
}

pub fn display_name(lookup: &dyn PlayerNameLookup, player_id: u32, jersey: Option<&str>) -> String {
    if let Some(name) = lookup.name_for(player_id) {
        return name;
    }
    match jersey {
        Some(j) if !j.trim().is_empty() => format!("#{}", j.trim()),
        _ => format!("#{player_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_jersey() {
        assert_eq!(display_name(&NoPlayerNames, 12, Some("7")), "#7");
        assert_eq!(display_name(&NoPlayerNames, 12, None), "#12");
    }

    #[test]
    fn map_lookup_wins_over_jersey() {
        let names = MapPlayerNames::new(HashMap::from([(12, "Ada Stone".to_string())]));
        assert_eq!(display_name(&names, 12, Some("7")), "Ada Stone");
    }
}
