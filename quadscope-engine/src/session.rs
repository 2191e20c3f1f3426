//! Embedder-facing session.
//!
//! A session loads one dataset's catalog documents, sizes the precision
//! context, wires the scheduler/orchestrator/worker pool together, and
//! exposes the handful of calls a shell needs: one per display frame,
//! the camera mutators, playback controls, and path editing.

use crate::orchestrator::{EngineConfig, FrameHook, Orchestrator};
use crate::path_editor::PathEditor;
use crate::playback::Playback;
use crate::tile_view::{SceneOp, TileView};
use quadscope_core::path::PathSpec;
use quadscope_core::{Camera, PrecisionContext, TileKey};
use quadscope_stream::{
    catalog, BackendStatus, DatasetConfig, Fetch, HttpFetch, SchedulerConfig, StatusPoller,
    StreamError, StreamResult, TileScheduler, UrlScheme, WorkerPool,
};
use std::collections::HashMap;
use std::sync::Arc;

/// How a session is opened. Mirrors the shell's URL parameters
/// (`dataset=<id>`, `autoplay=true`) plus deployment knobs.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Base URL of the static tile store.
    pub base_url: String,
    /// Live-render backend, if deployed.
    pub backend_url: Option<String>,
    /// Preselected dataset id; defaults to the first in the index.
    pub dataset: Option<String>,
    /// Begin path playback once the initial tiles are ready.
    pub autoplay: bool,
    /// Allow routing missing tiles to the live backend.
    pub live_rendering: bool,
    /// Fetch/decode worker threads.
    pub worker_count: usize,
}

impl SessionOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            backend_url: None,
            dataset: None,
            autoplay: false,
            live_rendering: false,
            worker_count: 4,
        }
    }
}

pub struct Session {
    fetch: Arc<dyn Fetch>,
    pool: WorkerPool,
    poller: Option<StatusPoller>,
    orchestrator: Orchestrator,
    editor: PathEditor,
    ctx: PrecisionContext,
    config: DatasetConfig,
    options: SessionOptions,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open over plain HTTP.
    pub fn connect(options: SessionOptions) -> StreamResult<Self> {
        let fetch: Arc<dyn Fetch> = Arc::new(HttpFetch::new()?);
        Self::open(options, fetch)
    }

    /// Open against any fetcher (tests use in-memory fakes).
    pub fn open(options: SessionOptions, fetch: Arc<dyn Fetch>) -> StreamResult<Self> {
        let index = catalog::load_index(fetch.as_ref(), &options.base_url)?;
        let summary = match &options.dataset {
            Some(id) => index
                .datasets
                .iter()
                .find(|d| &d.id == id)
                .cloned()
                .ok_or_else(|| StreamError::Catalog(format!("unknown dataset {:?}", id)))?,
            None => index
                .datasets
                .first()
                .cloned()
                .ok_or_else(|| StreamError::Catalog("empty dataset index".to_string()))?,
        };
        log::info!("opening dataset {} ({})", summary.id, summary.name);

        let config = catalog::load_config(fetch.as_ref(), &options.base_url, &summary.id)?;
        let path_spec = config
            .embedded_path()
            .cloned()
            .or_else(|| catalog::load_paths(fetch.as_ref(), &options.base_url, &summary.id));

        // Precision covers the dataset's deepest level and every
        // keyframe the path wants to visit.
        let mut ctx = PrecisionContext::new();
        if let Some(max_level) = config.max_level() {
            ctx.raise_for_level(max_level);
        }
        if let Some(spec) = &path_spec {
            for level in spec_levels(spec) {
                ctx.raise_for_level(level);
            }
        }

        let editor = match &path_spec {
            Some(spec) => PathEditor::from_spec(spec, &ctx)?,
            None => PathEditor::new(),
        };

        let manifest = catalog::load_manifest(fetch.as_ref(), &options.base_url, &summary.id);
        let mut scheduler = TileScheduler::new(
            SchedulerConfig::default(),
            UrlScheme {
                static_base: options.base_url.clone(),
                live_base: options.backend_url.clone(),
                dataset: summary.id.clone(),
            },
            manifest,
        );
        let live = options.live_rendering && options.backend_url.is_some();
        scheduler.set_live_enabled(live);

        let camera = editor
            .keyframes()
            .first()
            .cloned()
            .unwrap_or_else(|| Camera::home(&ctx));
        let mut orchestrator = Orchestrator::new(
            EngineConfig::default(),
            camera,
            config.tile_size as f64,
            scheduler,
        );

        match editor.rebuild() {
            Some(Ok(sampler)) => orchestrator.playback_mut().set_sampler(Some(sampler)),
            Some(Err(e)) => log::warn!("dataset path unusable: {}", e),
            None => {}
        }
        if options.autoplay {
            orchestrator.playback_mut().arm();
        }

        let pool = WorkerPool::spawn(options.worker_count.max(1), Arc::clone(&fetch));
        let poller = match (&options.backend_url, live) {
            (Some(backend), true) => {
                Some(StatusPoller::spawn(Arc::clone(&fetch), backend.clone()))
            }
            _ => None,
        };

        Ok(Self {
            fetch,
            pool,
            poller,
            orchestrator,
            editor,
            ctx,
            config,
            options,
        })
    }

    /// Run one display frame: drain completions, advance the
    /// orchestrator, hand new work to the pool, return the host ops.
    pub fn frame(&mut self, now_ms: f64, view_w: f64, view_h: f64) -> Vec<SceneOp> {
        let completions = self.pool.drain_completions();
        let output = self
            .orchestrator
            .advance_frame(now_ms, view_w, view_h, completions);
        for dispatch in output.dispatches {
            self.pool.submit(dispatch);
        }
        output.ops
    }

    pub fn camera(&self) -> &Camera {
        self.orchestrator.camera()
    }

    pub fn pan(&mut self, dx_pixels: f64, dy_pixels: f64) -> quadscope_core::CoreResult<()> {
        self.orchestrator.pan(dx_pixels, dy_pixels)
    }

    pub fn zoom(&mut self, delta: f64) -> quadscope_core::CoreResult<()> {
        self.orchestrator.zoom(delta)
    }

    pub fn set_rotation(&mut self, rotation: f64) -> quadscope_core::CoreResult<()> {
        self.orchestrator.set_rotation(rotation)
    }

    pub fn playback(&self) -> &Playback {
        self.orchestrator.playback()
    }

    pub fn playback_mut(&mut self) -> &mut Playback {
        self.orchestrator.playback_mut()
    }

    /// Read-only live tile map for external scripting.
    pub fn active_tiles(&self) -> &HashMap<TileKey, TileView> {
        self.orchestrator.active_views()
    }

    pub fn set_frame_hook(&mut self, hook: FrameHook) {
        self.orchestrator.set_frame_hook(hook);
    }

    pub fn dataset_config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn precision(&self) -> &PrecisionContext {
        &self.ctx
    }

    // ------------------------------------------------------------------
    // Path editing
    // ------------------------------------------------------------------

    pub fn keyframes(&self) -> &[Camera] {
        self.editor.keyframes()
    }

    pub fn active_keyframe(&self) -> usize {
        self.editor.active_index()
    }

    /// Jump straight to a keyframe: exact camera, timeline synced to
    /// the keyframe's arc distance.
    pub fn jump_to_keyframe(&mut self, index: usize) -> bool {
        let Some(camera) = self.editor.jump_to(index).cloned() else {
            return false;
        };
        self.orchestrator.set_camera(camera);
        let stop = self
            .orchestrator
            .playback()
            .sampler()
            .and_then(|s| s.stops().get(index).copied());
        if let Some(distance) = stop {
            self.orchestrator.playback_mut().seek_distance(distance);
        }
        true
    }

    /// Snapshot the current camera after the active keyframe.
    pub fn insert_keyframe_here(&mut self) {
        let camera = self.orchestrator.camera().clone();
        self.editor.insert_after_active(&camera);
        self.rebuild_path();
    }

    pub fn delete_keyframe(&mut self, index: usize) -> bool {
        let removed = self.editor.delete(index);
        if removed {
            self.rebuild_path();
        }
        removed
    }

    /// The active path as pretty JSON, positions as decimal strings.
    pub fn path_json(&self) -> String {
        self.editor.to_json()
    }

    fn rebuild_path(&mut self) {
        let sampler = match self.editor.rebuild() {
            Some(Ok(sampler)) => Some(sampler),
            Some(Err(e)) => {
                log::warn!("path rebuild failed: {}", e);
                None
            }
            None => None,
        };
        self.orchestrator.playback_mut().set_sampler(sampler);
    }

    // ------------------------------------------------------------------
    // Live rendering
    // ------------------------------------------------------------------

    pub fn live_rendering(&self) -> bool {
        self.orchestrator.scheduler().live_enabled()
    }

    pub fn set_live_rendering(&mut self, enabled: bool) {
        let possible = enabled && self.options.backend_url.is_some();
        self.orchestrator.scheduler_mut().set_live_enabled(possible);
        match (possible, self.poller.is_some()) {
            (true, false) => {
                let backend = self.options.backend_url.clone().expect("checked above");
                self.poller = Some(StatusPoller::spawn(Arc::clone(&self.fetch), backend));
            }
            (false, true) => {
                if let Some(mut poller) = self.poller.take() {
                    poller.stop();
                }
            }
            _ => {}
        }
    }

    /// Latest backend status; `None` reads as "backend unavailable".
    pub fn backend_status(&mut self) -> Option<BackendStatus> {
        self.poller.as_mut().and_then(|p| p.latest().cloned())
    }

    /// Stop workers and pollers. Dropping without this just detaches
    /// the threads.
    pub fn shutdown(mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        self.pool.shutdown();
    }
}

/// Zoom levels named by a wire path, before resolution.
fn spec_levels(spec: &PathSpec) -> Vec<f64> {
    spec.keyframes
        .iter()
        .filter_map(|kf| {
            kf.camera
                .global_level
                .or_else(|| kf.camera.level.map(|l| l + kf.camera.zoom_offset.unwrap_or(0.0)))
        })
        .collect()
}
