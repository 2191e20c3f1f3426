//! Per-frame render orchestration.
//!
//! Each frame: drain worker completions, prune the scheduler, advance
//! playback, compute the three-layer target tile set (stable parent,
//! base, fading child), reconcile it against the active tile views, and
//! emit the minimal `SceneOp` list plus the dispatches the worker pool
//! should start. The whole loop is main-thread-owned; workers only ever
//! see `Dispatch` values and answer with `WorkResult`s.

use crate::playback::Playback;
use crate::tile_view::{SceneOp, TileStyle, TileView};
use quadscope_core::{display_scale, visible_tiles_for_level, Camera, CoreResult, TileKey};
use quadscope_stream::{
    Completion, Dispatch, TilePlacement, TileScheduler, ViewState, WorkResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Child layers fainter than this are skipped entirely.
    pub child_opacity_epsilon: f64,
    /// Slight overscale closing sub-pixel seams between neighbors.
    pub seam_overscale: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            child_opacity_epsilon: 0.001,
            seam_overscale: 1.001,
        }
    }
}

/// State handed to the external per-frame hook.
#[derive(Clone, Debug)]
pub struct FrameSnapshot {
    pub camera: Camera,
    pub active_tiles: usize,
    pub queued_requests: usize,
    pub playing: bool,
}

pub type FrameHook = Box<dyn FnMut(&FrameSnapshot, f64)>;

/// Result of one frame: host mutations plus work to submit.
#[derive(Debug, Default)]
pub struct FrameOutput {
    pub ops: Vec<SceneOp>,
    pub dispatches: Vec<Dispatch>,
}

struct TargetTile {
    key: TileKey,
    style: TileStyle,
    opacity: f64,
    z: i32,
    placement: TilePlacement,
}

pub struct Orchestrator {
    config: EngineConfig,
    camera: Camera,
    tile_size: f64,
    scheduler: TileScheduler,
    playback: Playback,
    active: HashMap<TileKey, TileView>,
    hook: Option<FrameHook>,
    view_w: f64,
    view_h: f64,
    applied_rotation: Option<f64>,
}

impl Orchestrator {
    pub fn new(
        config: EngineConfig,
        camera: Camera,
        tile_size: f64,
        scheduler: TileScheduler,
    ) -> Self {
        Self {
            config,
            camera,
            tile_size,
            scheduler,
            playback: Playback::new(),
            active: HashMap::new(),
            hook: None,
            view_w: 0.0,
            view_h: 0.0,
            applied_rotation: None,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn pan(&mut self, dx_pixels: f64, dy_pixels: f64) -> CoreResult<()> {
        self.camera.pan(dx_pixels, dy_pixels, self.tile_size)
    }

    pub fn zoom(&mut self, delta: f64) -> CoreResult<()> {
        self.camera.zoom(delta)
    }

    pub fn set_rotation(&mut self, rotation: f64) -> CoreResult<()> {
        self.camera.set_rotation(rotation)
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut Playback {
        &mut self.playback
    }

    pub fn scheduler(&self) -> &TileScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TileScheduler {
        &mut self.scheduler
    }

    /// Read-only view of the live tile set, keyed by tile identity.
    pub fn active_views(&self) -> &HashMap<TileKey, TileView> {
        &self.active
    }

    /// Install the external per-frame hook.
    pub fn set_frame_hook(&mut self, hook: FrameHook) {
        self.hook = Some(hook);
    }

    /// True once every active tile finished loading.
    pub fn tiles_settled(&self) -> bool {
        !self.active.is_empty() && self.active.values().all(|view| view.loaded)
    }

    /// Run one frame.
    pub fn advance_frame(
        &mut self,
        now_ms: f64,
        view_w: f64,
        view_h: f64,
        completions: Vec<WorkResult>,
    ) -> FrameOutput {
        self.view_w = view_w;
        self.view_h = view_h;
        let mut ops = Vec::new();

        self.apply_completions(completions, now_ms, &mut ops);

        self.scheduler.record_view(ViewState {
            camera: self.camera.clone(),
            view_w,
            view_h,
            tile_size: self.tile_size,
        });
        for evicted in self.scheduler.prune() {
            if let Some(view) = self.active.get_mut(&evicted) {
                if view.badge.take().is_some() {
                    ops.push(SceneOp::SetBadge {
                        key: evicted,
                        label: None,
                    });
                }
            }
        }

        self.run_hook(now_ms);
        self.advance_playback(now_ms);

        // The layer container rotates opposite the camera so the
        // camera's local frame stays axis-aligned.
        let container_rotation = -self.camera.rotation;
        if self.applied_rotation != Some(container_rotation) {
            self.applied_rotation = Some(container_rotation);
            ops.push(SceneOp::SetRotation(container_rotation));
        }

        let targets = self.target_tiles();
        self.reconcile(targets, &mut ops);

        let dispatches = self.scheduler.process(now_ms);
        self.refresh_live_marks(&mut ops);

        FrameOutput { ops, dispatches }
    }

    fn apply_completions(
        &mut self,
        completions: Vec<WorkResult>,
        now_ms: f64,
        ops: &mut Vec<SceneOp>,
    ) {
        for result in completions {
            self.scheduler.complete(&result.key, result.completion, now_ms);

            let Some(view) = self.active.get_mut(&result.key) else {
                // The camera moved on; the slot is freed and the
                // decoded bytes are dropped.
                continue;
            };
            match result.completion {
                Completion::Success => {
                    view.loaded = true;
                    view.rendering = false;
                    view.image = result.image.map(Arc::new);
                    ops.push(SceneOp::PresentImage(result.key));
                }
                Completion::Failure => {
                    // Counted as loaded so readiness checks don't stall
                    // on a tile that will never arrive.
                    view.loaded = true;
                    view.failed = true;
                    view.rendering = false;
                }
                Completion::Busy => {
                    view.rendering = false;
                }
            }
        }
    }

    fn run_hook(&mut self, now_ms: f64) {
        let Some(hook) = self.hook.as_mut() else {
            return;
        };
        let snapshot = FrameSnapshot {
            camera: self.camera.clone(),
            active_tiles: self.active.len(),
            queued_requests: self.scheduler.queued_len(),
            playing: self.playback.is_playing(),
        };
        hook(&snapshot, now_ms);
    }

    fn advance_playback(&mut self, now_ms: f64) {
        if self.playback.is_armed() && self.tiles_settled() {
            log::info!("tiles settled, starting queued playback");
            self.playback.play();
        }
        if let Some(camera) = self.playback.advance(now_ms) {
            self.camera = camera;
        }
    }

    /// Visible tiles for the parent/base/child layer stack.
    fn target_tiles(&self) -> Vec<TargetTile> {
        let base = self.camera.base_level();
        let child_opacity = self.camera.child_opacity();

        let mut layers = Vec::with_capacity(3);
        if base > 0 {
            // Stable fallback covering gaps while the base loads.
            layers.push((base - 1, 1.0));
        }
        layers.push((base, 1.0));
        if child_opacity > self.config.child_opacity_epsilon {
            layers.push((base + 1, child_opacity));
        }

        let live = self.scheduler.live_enabled();
        let mut targets = Vec::new();
        for (level, opacity) in layers {
            let set = visible_tiles_for_level(
                &self.camera,
                level,
                self.view_w,
                self.view_h,
                self.tile_size,
            );
            let scale = display_scale(self.camera.global_level, level);
            let size_on_screen = self.tile_size * scale;
            for tile in set.tiles {
                // Without live rendering, tiles the cache cannot serve
                // are not even requested.
                if !live && !self.scheduler.is_cached(&tile.key) {
                    continue;
                }
                targets.push(TargetTile {
                    style: TileStyle {
                        translate_x: self.view_w / 2.0 + tile.rel_x * size_on_screen,
                        translate_y: self.view_h / 2.0 + tile.rel_y * size_on_screen,
                        scale: scale * self.config.seam_overscale,
                    },
                    opacity,
                    z: level as i32,
                    placement: TilePlacement {
                        rel_x: tile.rel_x,
                        rel_y: tile.rel_y,
                    },
                    key: tile.key,
                });
            }
        }
        targets
    }

    fn reconcile(&mut self, targets: Vec<TargetTile>, ops: &mut Vec<SceneOp>) {
        let wanted: HashSet<TileKey> = targets.iter().map(|t| t.key.clone()).collect();

        let stale: Vec<TileKey> = self
            .active
            .keys()
            .filter(|key| !wanted.contains(*key))
            .cloned()
            .collect();
        for key in stale {
            self.active.remove(&key);
            ops.push(SceneOp::RemoveTile(key));
        }

        let mut inserted = Vec::new();
        let mut style_ops = Vec::new();
        for target in targets {
            if !self.active.contains_key(&target.key) {
                self.active
                    .insert(target.key.clone(), TileView::new(target.key.clone()));
                self.scheduler.request(target.key.clone(), target.placement);
                inserted.push(target.key.clone());
            }
            let view = self
                .active
                .get_mut(&target.key)
                .expect("just inserted above");

            if view.cached_style != Some(target.style) {
                view.cached_style = Some(target.style);
                style_ops.push(SceneOp::SetStyle {
                    key: target.key.clone(),
                    style: target.style,
                });
            }
            if view.cached_opacity != Some(target.opacity) {
                view.cached_opacity = Some(target.opacity);
                style_ops.push(SceneOp::SetOpacity {
                    key: target.key.clone(),
                    opacity: target.opacity,
                });
            }
            if view.cached_z != Some(target.z) {
                view.cached_z = Some(target.z);
                style_ops.push(SceneOp::SetZIndex {
                    key: target.key,
                    z: target.z,
                });
            }
        }

        if !inserted.is_empty() {
            ops.push(SceneOp::InsertTiles(inserted));
        }
        ops.extend(style_ops);
    }

    /// Reapply queue badges and in-flight marks after the queue moved.
    fn refresh_live_marks(&mut self, ops: &mut Vec<SceneOp>) {
        let badges: HashMap<TileKey, String> =
            self.scheduler.live_badges().into_iter().collect();
        let rendering: HashSet<TileKey> =
            self.scheduler.rendering_keys().into_iter().collect();

        for (key, view) in self.active.iter_mut() {
            let wanted_badge = badges.get(key).cloned();
            if view.badge != wanted_badge {
                view.badge = wanted_badge.clone();
                ops.push(SceneOp::SetBadge {
                    key: key.clone(),
                    label: wanted_badge,
                });
            }
            let wanted_rendering = rendering.contains(key);
            if view.rendering != wanted_rendering {
                view.rendering = wanted_rendering;
                ops.push(SceneOp::SetRendering {
                    key: key.clone(),
                    on: wanted_rendering,
                });
            }
        }
    }
}
