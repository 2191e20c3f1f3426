//! Prioritized two-lane tile request scheduling.
//!
//! Tiles arrive from the orchestrator as the camera moves; the
//! scheduler routes each one to the cheap static lane (cached tile,
//! decode in a worker) or the expensive live lane (backend render,
//! at-most-one in flight), keeps the queue sorted by on-screen value,
//! prunes entries the camera has left behind, and retries transient
//! backend failures at the front of the queue.

use crate::manifest::TileManifest;
use quadscope_core::{display_scale, visible_tiles_for_level, Camera, TileKey};
use std::collections::{HashMap, HashSet};

/// Request lane with lane-specific payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lane {
    Static,
    Live,
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Concurrent static decodes.
    pub static_limit: usize,
    /// Concurrent live renders. The backend renders one tile at a time;
    /// queueing more just ties up its scheduler.
    pub live_limit: usize,
    /// Delay before a busy live tile is retried.
    pub retry_delay_ms: f64,
    /// Levels around the camera's base level that survive pruning.
    pub prune_level_margin: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            static_limit: 6,
            live_limit: 1,
            retry_delay_ms: 200.0,
            prune_level_margin: 2,
        }
    }
}

/// Where the tile sits relative to the camera, in target-level tile
/// units. Carried with the request so priority can be recomputed from
/// the latest viewport without another selector pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TilePlacement {
    pub rel_x: f64,
    pub rel_y: f64,
}

/// Outcome of a `request` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    QueuedStatic,
    QueuedLive,
    /// Placement merged into an existing queued entry.
    Merged,
    /// Already dispatched; completion will arrive on its own.
    AlreadyActive,
    /// Not in the manifest and live rendering is off.
    Skipped,
}

/// Work the caller must hand to the worker pool.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatch {
    pub key: TileKey,
    pub lane: Lane,
    pub url: String,
}

/// Completion reported back by a lane worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Bytes decoded and handed to the tile view.
    Success,
    /// Permanent failure; the tile shows a blank placeholder.
    Failure,
    /// Backend busy (503 or transport error); retry shortly.
    Busy,
}

/// Camera and viewport snapshot used for prioritization and pruning.
#[derive(Clone, Debug)]
pub struct ViewState {
    pub camera: Camera,
    pub view_w: f64,
    pub view_h: f64,
    pub tile_size: f64,
}

/// URL layout for the two lanes of one dataset.
#[derive(Clone, Debug)]
pub struct UrlScheme {
    pub static_base: String,
    pub live_base: Option<String>,
    pub dataset: String,
}

impl UrlScheme {
    fn static_url(&self, key: &TileKey) -> String {
        crate::catalog::static_tile_url(&self.static_base, &self.dataset, key)
    }

    fn live_url(&self, key: &TileKey) -> Option<String> {
        self.live_base
            .as_ref()
            .map(|base| crate::live::live_tile_url(base, &self.dataset, key))
    }
}

#[derive(Clone, Debug)]
struct QueuedRequest {
    key: TileKey,
    lane: Lane,
    url: String,
    placement: TilePlacement,
    attempts: u32,
}

#[derive(Clone, Debug)]
struct DelayedRetry {
    entry: QueuedRequest,
    due_at_ms: f64,
}

#[derive(Clone, Debug)]
struct ActiveRequest {
    lane: Lane,
    url: String,
    placement: TilePlacement,
    attempts: u32,
}

/// Main-loop-owned request scheduler. No locks: every method runs on
/// the frame loop, workers only see `Dispatch` values.
pub struct TileScheduler {
    config: SchedulerConfig,
    urls: UrlScheme,
    manifest: Option<TileManifest>,
    live_enabled: bool,
    queue: Vec<QueuedRequest>,
    delayed: Vec<DelayedRetry>,
    active: HashMap<TileKey, ActiveRequest>,
    view: Option<ViewState>,
}

impl TileScheduler {
    pub fn new(config: SchedulerConfig, urls: UrlScheme, manifest: Option<TileManifest>) -> Self {
        if manifest.is_none() {
            log::warn!(
                "dataset {} has no manifest; every tile will be requested",
                urls.dataset
            );
        }
        Self {
            config,
            urls,
            manifest,
            live_enabled: false,
            queue: Vec::new(),
            delayed: Vec::new(),
            active: HashMap::new(),
            view: None,
        }
    }

    pub fn set_live_enabled(&mut self, enabled: bool) {
        self.live_enabled = enabled;
    }

    pub fn live_enabled(&self) -> bool {
        self.live_enabled
    }

    pub fn manifest(&self) -> Option<&TileManifest> {
        self.manifest.as_ref()
    }

    /// True if the tile would be served by the static cache.
    pub fn is_cached(&self, key: &TileKey) -> bool {
        match &self.manifest {
            Some(manifest) => manifest.contains(key),
            // No manifest: assume the cache has everything.
            None => true,
        }
    }

    /// Record the viewport the next `process`/`prune` calls work from.
    pub fn record_view(&mut self, view: ViewState) {
        self.view = Some(view);
    }

    /// Enqueue a tile, routing it by manifest membership. Duplicate
    /// requests merge into the existing entry.
    pub fn request(&mut self, key: TileKey, placement: TilePlacement) -> RequestOutcome {
        if self.active.contains_key(&key) {
            return RequestOutcome::AlreadyActive;
        }
        if let Some(entry) = self.find_queued_mut(&key) {
            entry.placement = placement;
            return RequestOutcome::Merged;
        }

        let (lane, url) = if self.is_cached(&key) {
            (Lane::Static, self.urls.static_url(&key))
        } else if self.live_enabled {
            match self.urls.live_url(&key) {
                Some(url) => (Lane::Live, url),
                None => return RequestOutcome::Skipped,
            }
        } else {
            return RequestOutcome::Skipped;
        };

        let outcome = match lane {
            Lane::Static => RequestOutcome::QueuedStatic,
            Lane::Live => RequestOutcome::QueuedLive,
        };
        self.queue.push(QueuedRequest {
            key,
            lane,
            url,
            placement,
            attempts: 0,
        });
        outcome
    }

    fn find_queued_mut(&mut self, key: &TileKey) -> Option<&mut QueuedRequest> {
        if let Some(entry) = self.queue.iter_mut().find(|e| &e.key == key) {
            return Some(entry);
        }
        self.delayed
            .iter_mut()
            .map(|d| &mut d.entry)
            .find(|e| &e.key == key)
    }

    /// Drop queued entries no longer visible around the recorded
    /// camera. Returns the evicted keys so their badges can be cleared.
    pub fn prune(&mut self) -> Vec<TileKey> {
        let Some(view) = self.view.clone() else {
            return Vec::new();
        };
        let base_level = view.camera.base_level();
        let margin = self.config.prune_level_margin;

        // One selector pass per level present in the queue.
        let mut levels: HashSet<u32> = self.queue.iter().map(|e| e.key.level).collect();
        levels.extend(self.delayed.iter().map(|d| d.entry.key.level));

        let mut valid: HashMap<u32, HashSet<TileKey>> = HashMap::new();
        for level in levels {
            if (level as i64 - base_level).abs() > margin {
                continue;
            }
            let set = visible_tiles_for_level(
                &view.camera,
                level as i64,
                view.view_w,
                view.view_h,
                view.tile_size,
            );
            valid.insert(level, set.tiles.into_iter().map(|t| t.key).collect());
        }

        let keep = |entry: &QueuedRequest| {
            valid
                .get(&entry.key.level)
                .is_some_and(|keys| keys.contains(&entry.key))
        };

        let mut evicted = Vec::new();
        self.queue.retain(|entry| {
            let stays = keep(entry);
            if !stays {
                evicted.push(entry.key.clone());
            }
            stays
        });
        self.delayed.retain(|delayed| {
            let stays = keep(&delayed.entry);
            if !stays {
                evicted.push(delayed.entry.key.clone());
            }
            stays
        });

        if !evicted.is_empty() {
            log::debug!("pruned {} queued tiles", evicted.len());
        }
        evicted
    }

    /// Sort by priority, promote due retries to the front, and dispatch
    /// up to each lane's concurrency limit.
    pub fn process(&mut self, now_ms: f64) -> Vec<Dispatch> {
        self.sort_queue();

        // Due retries jump the whole queue, preserving their options.
        let mut index = 0;
        while index < self.delayed.len() {
            if self.delayed[index].due_at_ms <= now_ms {
                let retry = self.delayed.remove(index);
                self.queue.insert(0, retry.entry);
            } else {
                index += 1;
            }
        }

        let mut dispatches = Vec::new();
        let pending = std::mem::take(&mut self.queue);
        let mut remaining = Vec::with_capacity(pending.len());
        for entry in pending {
            let capacity = match entry.lane {
                Lane::Static => self.active_count(Lane::Static) < self.config.static_limit,
                Lane::Live => self.active_count(Lane::Live) < self.config.live_limit,
            };
            if capacity {
                dispatches.push(Dispatch {
                    key: entry.key.clone(),
                    lane: entry.lane,
                    url: entry.url.clone(),
                });
                self.active.insert(
                    entry.key,
                    ActiveRequest {
                        lane: entry.lane,
                        url: entry.url,
                        placement: entry.placement,
                        attempts: entry.attempts,
                    },
                );
            } else {
                remaining.push(entry);
            }
        }
        self.queue = remaining;

        debug_assert!(self.active_count(Lane::Static) <= self.config.static_limit);
        debug_assert!(self.active_count(Lane::Live) <= self.config.live_limit);
        dispatches
    }

    /// Free the lane slot for a finished request. `Busy` re-enqueues at
    /// the front of the queue after the retry delay; `Success` on the
    /// live lane admits the tile into the manifest.
    pub fn complete(&mut self, key: &TileKey, completion: Completion, now_ms: f64) {
        let Some(active) = self.active.remove(key) else {
            log::debug!("completion for unknown tile {}", key);
            return;
        };

        match completion {
            Completion::Busy => {
                // Re-enqueue with the original options intact.
                let entry = QueuedRequest {
                    key: key.clone(),
                    lane: active.lane,
                    url: active.url,
                    placement: active.placement,
                    attempts: active.attempts + 1,
                };
                self.delayed.push(DelayedRetry {
                    entry,
                    due_at_ms: now_ms + self.config.retry_delay_ms,
                });
            }
            Completion::Success => {
                if active.lane == Lane::Live {
                    if let Some(manifest) = &mut self.manifest {
                        manifest.insert(key);
                    }
                }
            }
            Completion::Failure => {}
        }
    }

    /// Badge labels for queued live tiles, in priority order.
    pub fn live_badges(&self) -> Vec<(TileKey, String)> {
        self.queue
            .iter()
            .filter(|entry| entry.lane == Lane::Live)
            .enumerate()
            .map(|(i, entry)| (entry.key.clone(), badge_label(i + 1)))
            .collect()
    }

    /// Live tiles currently being rendered by the backend.
    pub fn rendering_keys(&self) -> Vec<TileKey> {
        self.active
            .iter()
            .filter(|(_, active)| active.lane == Lane::Live)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn active_count(&self, lane: Lane) -> usize {
        self.active.values().filter(|a| a.lane == lane).count()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len() + self.delayed.len()
    }

    pub fn is_pending(&self, key: &TileKey) -> bool {
        self.active.contains_key(key)
            || self.queue.iter().any(|e| &e.key == key)
            || self.delayed.iter().any(|d| &d.entry.key == key)
    }

    /// Larger on-screen area first; nearer the view center breaks ties.
    fn sort_queue(&mut self) {
        let Some(view) = self.view.clone() else {
            return;
        };
        let mut keyed: Vec<(f64, f64, QueuedRequest)> = self
            .queue
            .drain(..)
            .map(|entry| {
                let (area, dist_sq) = screen_value(&view, &entry);
                (area, dist_sq, entry)
            })
            .collect();
        keyed.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        });
        self.queue = keyed.into_iter().map(|(_, _, entry)| entry).collect();
    }
}

/// (visible on-screen area, squared distance from view center) for a
/// queued tile under the given viewport.
fn screen_value(view: &ViewState, entry: &QueuedRequest) -> (f64, f64) {
    let scale = display_scale(view.camera.global_level, entry.key.level as i64);
    let size = view.tile_size * scale;
    let left = view.view_w / 2.0 + entry.placement.rel_x * size;
    let top = view.view_h / 2.0 + entry.placement.rel_y * size;

    let visible_w = (left + size).min(view.view_w) - left.max(0.0);
    let visible_h = (top + size).min(view.view_h) - top.max(0.0);
    let area = visible_w.max(0.0) * visible_h.max(0.0);

    let center_dx = left + size / 2.0 - view.view_w / 2.0;
    let center_dy = top + size / 2.0 - view.view_h / 2.0;
    (area, center_dx * center_dx + center_dy * center_dy)
}

fn badge_label(position: usize) -> String {
    if position > 10 {
        "#10+".to_string()
    } else {
        format!("#{}", position)
    }
}
