//! Live tile render state and the scene operations that drive a host.
//!
//! The orchestrator owns every `TileView` and never touches a real
//! surface; it emits `SceneOp`s, and the embedding shell (DOM, canvas,
//! whatever) applies them. Cached style fields elide redundant ops so
//! an idle frame is free.

use quadscope_core::TileKey;
use quadscope_stream::TileImage;
use std::sync::Arc;

/// Placement of a tile on screen: translation in pixels plus uniform
/// scale applied to the nominal tile size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileStyle {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
}

/// One active tile.
#[derive(Clone, Debug)]
pub struct TileView {
    pub key: TileKey,
    /// Decoded pixels once the request completes.
    pub image: Option<Arc<TileImage>>,
    /// True once the request finished, successfully or not. Failed
    /// tiles count as loaded so readiness checks cannot stall.
    pub loaded: bool,
    pub failed: bool,
    /// Queue badge shown on live tiles awaiting their turn.
    pub badge: Option<String>,
    /// Set while a live render for this tile is in flight.
    pub rendering: bool,
    pub(crate) cached_style: Option<TileStyle>,
    pub(crate) cached_opacity: Option<f64>,
    pub(crate) cached_z: Option<i32>,
}

impl TileView {
    pub fn new(key: TileKey) -> Self {
        Self {
            key,
            image: None,
            loaded: false,
            failed: false,
            badge: None,
            rendering: false,
            cached_style: None,
            cached_opacity: None,
            cached_z: None,
        }
    }
}

/// Host-facing mutation, applied in order within a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneOp {
    /// New tiles this frame, batched into one host append.
    InsertTiles(Vec<TileKey>),
    RemoveTile(TileKey),
    /// Rotation of the whole layer container, in radians.
    SetRotation(f64),
    SetStyle { key: TileKey, style: TileStyle },
    SetOpacity { key: TileKey, opacity: f64 },
    SetZIndex { key: TileKey, z: i32 },
    SetBadge { key: TileKey, label: Option<String> },
    SetRendering { key: TileKey, on: bool },
    /// Decoded pixels are available on the view; present them.
    PresentImage(TileKey),
}
