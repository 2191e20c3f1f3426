//! Visible-tile selection.
//!
//! Given a camera and viewport, computes the integer-indexed tiles of a
//! target level that intersect a rotation-invariant bounding circle
//! around the viewport, together with each tile's position relative to
//! the camera in target-level tile units.
//!
//! High-precision arithmetic happens exactly once per call: the camera
//! position is scaled into tile units and split into a big integer and
//! an f64 fraction. The sweep around that anchor is native integer and
//! float math.

use crate::camera::Camera;
use crate::tile_index::{TileIndex, TileKey};
use dashu::integer::IBig;

/// Hard cap on the sweep radius in tiles. A viewport diagonal is a
/// handful of tiles at the levels the engine asks about; anything
/// larger means the caller passed a target level far below the camera.
const MAX_SEARCH_RADIUS: i64 = 64;

/// Extra acceptance radius in tiles so corner-overlapping tiles are
/// kept even when their center sits outside the view circle.
const CORNER_COVERAGE: f64 = 0.75;

/// One tile intersecting the view circle.
#[derive(Clone, Debug, PartialEq)]
pub struct VisibleTile {
    pub key: TileKey,
    /// Tile top-left relative to the camera, in target-level tile units.
    pub rel_x: f64,
    pub rel_y: f64,
}

/// Selection result with the covered index bounds.
#[derive(Clone, Debug, Default)]
pub struct VisibleSet {
    pub tiles: Vec<VisibleTile>,
    pub min_x: TileIndex,
    pub max_x: TileIndex,
    pub min_y: TileIndex,
    pub max_y: TileIndex,
}

impl VisibleSet {
    fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Scale of one target-level tile on screen, in multiples of the
/// nominal tile size.
pub fn display_scale(camera_level: f64, target_level: i64) -> f64 {
    libm::exp2(camera_level - target_level as f64)
}

/// Compute the tiles of `target_level` visible around `camera`.
pub fn visible_tiles_for_level(
    camera: &Camera,
    target_level: i64,
    view_w: f64,
    view_h: f64,
    tile_size: f64,
) -> VisibleSet {
    if target_level < 0 {
        return VisibleSet::empty();
    }
    let level = target_level as u32;

    // Radius to the farthest viewport corner covers any rotation.
    let view_radius_px = ((view_w / 2.0).powi(2) + (view_h / 2.0).powi(2)).sqrt();
    let tile_size_on_screen = tile_size * display_scale(camera.global_level, target_level);
    if !(tile_size_on_screen > 0.0) || !tile_size_on_screen.is_finite() {
        return VisibleSet::empty();
    }

    let radius_in_tiles = view_radius_px / tile_size_on_screen;
    let mut search_radius = radius_in_tiles.ceil() as i64;
    if search_radius > MAX_SEARCH_RADIUS {
        log::warn!(
            "capping tile sweep radius {} at {} (target level {} far below camera {})",
            search_radius,
            MAX_SEARCH_RADIUS,
            target_level,
            camera.global_level
        );
        search_radius = MAX_SEARCH_RADIUS;
    }

    // The single high-precision step: camera position in tile units.
    let (cx_int, cx_frac) = camera.x.mul_pow2(target_level).floor_split();
    let (cy_int, cy_frac) = camera.y.mul_pow2(target_level).floor_split();

    let max_index = TileIndex::max_for_level(level);
    let accept_sq = (radius_in_tiles + CORNER_COVERAGE).powi(2);

    let mut tiles = Vec::new();
    let mut bounds_x: Option<(IBig, IBig)> = None;
    let mut bounds_y: Option<(IBig, IBig)> = None;

    for dy in -search_radius..=search_radius {
        let offset_y = dy as f64 + 0.5 - cy_frac;
        for dx in -search_radius..=search_radius {
            let offset_x = dx as f64 + 0.5 - cx_frac;
            if offset_x * offset_x + offset_y * offset_y >= accept_sq {
                continue;
            }

            let tile_x = &cx_int + IBig::from(dx);
            let tile_y = &cy_int + IBig::from(dy);
            // Tiles past the world edge do not exist; the world does
            // not wrap, so they are skipped rather than clamped.
            if tile_x < IBig::ZERO
                || tile_y < IBig::ZERO
                || tile_x > max_index
                || tile_y > max_index
            {
                continue;
            }

            track_bounds(&mut bounds_x, &tile_x);
            track_bounds(&mut bounds_y, &tile_y);

            let (Some(x), Some(y)) = (
                TileIndex::from_ibig(tile_x),
                TileIndex::from_ibig(tile_y),
            ) else {
                continue;
            };
            tiles.push(VisibleTile {
                key: TileKey::new(level, x, y),
                rel_x: dx as f64 - cx_frac,
                rel_y: dy as f64 - cy_frac,
            });
        }
    }

    let (min_x, max_x) = into_indices(bounds_x);
    let (min_y, max_y) = into_indices(bounds_y);
    VisibleSet {
        tiles,
        min_x,
        max_x,
        min_y,
        max_y,
    }
}

fn track_bounds(bounds: &mut Option<(IBig, IBig)>, value: &IBig) {
    match bounds {
        None => *bounds = Some((value.clone(), value.clone())),
        Some((min, max)) => {
            if value < min {
                *min = value.clone();
            }
            if value > max {
                *max = value.clone();
            }
        }
    }
}

fn into_indices(bounds: Option<(IBig, IBig)>) -> (TileIndex, TileIndex) {
    match bounds {
        Some((min, max)) => (
            TileIndex::from_ibig(min).unwrap_or_else(TileIndex::zero),
            TileIndex::from_ibig(max).unwrap_or_else(TileIndex::zero),
        ),
        None => (TileIndex::zero(), TileIndex::zero()),
    }
}
