//! Dataset catalog adapters.
//!
//! Thin wrappers over the JSON documents a tile server publishes:
//! the dataset index, per-dataset config (optionally with an embedded
//! camera path), standalone path files, and the tile manifest.

use crate::error::StreamResult;
use crate::fetch::Fetch;
use crate::manifest::TileManifest;
use quadscope_core::path::{PathFile, PathSpec};
use quadscope_core::TileKey;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetIndex {
    pub datasets: Vec<DatasetSummary>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub id: String,
    pub name: String,
    pub tile_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_config: Option<RenderConfig>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathSpec>,
}

impl DatasetConfig {
    /// Deepest level this dataset expects, for precision sizing.
    pub fn max_level(&self) -> Option<f64> {
        self.render_config.as_ref().and_then(|rc| rc.max_level)
    }

    /// Path embedded in the config, if any.
    pub fn embedded_path(&self) -> Option<&PathSpec> {
        self.render_config.as_ref().and_then(|rc| rc.path.as_ref())
    }
}

pub fn index_url(base: &str) -> String {
    format!("{}/datasets/index.json", base.trim_end_matches('/'))
}

pub fn config_url(base: &str, dataset: &str) -> String {
    format!("{}/datasets/{}/config.json", base.trim_end_matches('/'), dataset)
}

pub fn paths_url(base: &str, dataset: &str) -> String {
    format!("{}/datasets/{}/paths.json", base.trim_end_matches('/'), dataset)
}

pub fn manifest_url(base: &str, dataset: &str) -> String {
    format!("{}/datasets/{}/tiles.json", base.trim_end_matches('/'), dataset)
}

pub fn static_tile_url(base: &str, dataset: &str, key: &TileKey) -> String {
    format!(
        "{}/datasets/{}/{}/{}/{}.webp",
        base.trim_end_matches('/'),
        dataset,
        key.level,
        key.x,
        key.y
    )
}

fn get_json<T: serde::de::DeserializeOwned>(fetch: &dyn Fetch, url: &str) -> StreamResult<T> {
    let response = fetch.get(url)?;
    if !response.is_success() {
        return Err(crate::error::StreamError::Status {
            url: url.to_string(),
            status: response.status,
        });
    }
    Ok(serde_json::from_slice(&response.body)?)
}

pub fn load_index(fetch: &dyn Fetch, base: &str) -> StreamResult<DatasetIndex> {
    get_json(fetch, &index_url(base))
}

pub fn load_config(fetch: &dyn Fetch, base: &str, dataset: &str) -> StreamResult<DatasetConfig> {
    get_json(fetch, &config_url(base, dataset))
}

/// Load a standalone path file. Missing files are not an error; most
/// datasets embed their path in the config instead.
pub fn load_paths(fetch: &dyn Fetch, base: &str, dataset: &str) -> Option<PathSpec> {
    match get_json::<PathFile>(fetch, &paths_url(base, dataset)) {
        Ok(file) => Some(file.path),
        Err(e) => {
            log::debug!("no standalone path for {}: {}", dataset, e);
            None
        }
    }
}

/// Load the tile manifest. `None` means the dataset publishes no
/// manifest and lookups fall back to always-request behavior.
pub fn load_manifest(fetch: &dyn Fetch, base: &str, dataset: &str) -> Option<TileManifest> {
    match get_json::<Vec<String>>(fetch, &manifest_url(base, dataset)) {
        Ok(entries) => Some(TileManifest::from_entries(entries)),
        Err(e) => {
            log::warn!("dataset {} manifest unavailable: {}", dataset, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchResponse;
    use pretty_assertions::assert_eq;
    use quadscope_core::tile_index::TileIndex;
    use std::collections::HashMap;

    struct FakeFetch {
        responses: HashMap<String, FetchResponse>,
    }

    impl Fetch for FakeFetch {
        fn get(&self, url: &str) -> StreamResult<FetchResponse> {
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| crate::error::StreamError::Fetch {
                    url: url.to_string(),
                    reason: "no route".to_string(),
                })
        }
    }

    fn ok(body: &str) -> FetchResponse {
        FetchResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn loads_index_and_config() {
        let mut responses = HashMap::new();
        responses.insert(
            index_url("http://tiles.test"),
            ok(r#"{"datasets": [{"id": "mandel", "name": "Mandelbrot"}]}"#),
        );
        responses.insert(
            config_url("http://tiles.test", "mandel"),
            ok(r#"{"id": "mandel", "name": "Mandelbrot", "tile_size": 512,
                   "render_config": {"max_level": 120}}"#),
        );
        let fetch = FakeFetch { responses };

        let index = load_index(&fetch, "http://tiles.test").unwrap();
        assert_eq!(index.datasets.len(), 1);
        assert_eq!(index.datasets[0].id, "mandel");

        let config = load_config(&fetch, "http://tiles.test", "mandel").unwrap();
        assert_eq!(config.tile_size, 512);
        assert_eq!(config.max_level(), Some(120.0));
        assert!(config.embedded_path().is_none());
    }

    #[test]
    fn config_with_embedded_path() {
        let mut responses = HashMap::new();
        responses.insert(
            config_url("http://tiles.test", "grid"),
            ok(r#"{"id": "grid", "name": "Grid", "tile_size": 256,
                   "render_config": {"path": {"keyframes": [
                       {"camera": {"globalLevel": 0, "x": 0.5, "y": 0.5}},
                       {"camera": {"globalLevel": 8, "x": 0.52, "y": 0.5}}
                   ]}}}"#),
        );
        let fetch = FakeFetch { responses };
        let config = load_config(&fetch, "http://tiles.test", "grid").unwrap();
        assert_eq!(config.embedded_path().unwrap().keyframes.len(), 2);
    }

    #[test]
    fn missing_manifest_is_none() {
        let fetch = FakeFetch {
            responses: HashMap::new(),
        };
        assert!(load_manifest(&fetch, "http://tiles.test", "mandel").is_none());
    }

    #[test]
    fn manifest_entries_become_a_set() {
        let mut responses = HashMap::new();
        responses.insert(
            manifest_url("http://tiles.test", "mandel"),
            ok(r#"["0/0/0", "1/0/0", "1/1/1"]"#),
        );
        let fetch = FakeFetch { responses };
        let manifest = load_manifest(&fetch, "http://tiles.test", "mandel").unwrap();
        assert_eq!(manifest.len(), 3);
        let key = TileKey::new(1, TileIndex::from_u64(1), TileIndex::from_u64(1));
        assert!(manifest.contains(&key));
    }

    #[test]
    fn static_tile_urls_follow_the_layout() {
        let key = TileKey::new(12, TileIndex::from_u64(4095), TileIndex::from_u64(17));
        assert_eq!(
            static_tile_url("http://tiles.test/", "mandel", &key),
            "http://tiles.test/datasets/mandel/12/4095/17.webp"
        );
    }
}
