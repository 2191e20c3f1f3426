//! The set of tile keys known to exist in the static cache.

use quadscope_core::TileKey;
use std::collections::HashSet;

/// Manifest of statically cached tiles for one dataset.
///
/// Grows monotonically: successful live renders are admitted so later
/// visits route through the cheap static lane.
#[derive(Clone, Debug, Default)]
pub struct TileManifest {
    keys: HashSet<String>,
}

impl TileManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `tiles.json` entry list (`"level/x/y"` strings).
    pub fn from_entries(entries: Vec<String>) -> Self {
        Self {
            keys: entries.into_iter().collect(),
        }
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.keys.contains(&key.manifest_key())
    }

    /// Admit a tile rendered live into the cached set.
    pub fn insert(&mut self, key: &TileKey) {
        self.keys.insert(key.manifest_key());
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
