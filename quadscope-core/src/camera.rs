//! Canonical navigation state.
//!
//! A camera is `{global_level, x, y, rotation}`: a continuous zoom
//! scalar, a position in the unit square held at arbitrary precision,
//! and a clockwise screen rotation in radians. The integer part of
//! `global_level` selects the base level of detail; the fractional part
//! is the cross-fade opacity of the next finer level.

use crate::bigdec::BigDec;
use crate::error::{CoreError, CoreResult};
use crate::precision::PrecisionContext;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub global_level: f64,
    pub x: BigDec,
    pub y: BigDec,
    pub rotation: f64,
}

impl Camera {
    /// Camera at the world center, fully zoomed out.
    pub fn home(ctx: &PrecisionContext) -> Self {
        Self {
            global_level: 0.0,
            x: BigDec::from_f64(0.5, ctx.digits()),
            y: BigDec::from_f64(0.5, ctx.digits()),
            rotation: 0.0,
        }
    }

    /// Build from parts, validating level and rotation and clamping the
    /// position into the unit square.
    pub fn from_parts(global_level: f64, x: BigDec, y: BigDec, rotation: f64) -> CoreResult<Self> {
        if !global_level.is_finite() {
            return Err(CoreError::BadCameraUpdate(format!(
                "non-finite global level {}",
                global_level
            )));
        }
        if !rotation.is_finite() {
            return Err(CoreError::BadCameraUpdate(format!(
                "non-finite rotation {}",
                rotation
            )));
        }
        Ok(Self {
            global_level: global_level.max(0.0),
            x: x.clamp_unit(),
            y: y.clamp_unit(),
            rotation,
        })
    }

    /// Build from decimal coordinate strings, preserving their digits.
    pub fn from_strings(
        global_level: f64,
        x: &str,
        y: &str,
        rotation: f64,
        ctx: &PrecisionContext,
    ) -> CoreResult<Self> {
        Self::from_parts(
            global_level,
            BigDec::from_str(x, ctx.digits())?,
            BigDec::from_str(y, ctx.digits())?,
            rotation,
        )
    }

    /// Base level of detail (integer part of the global level).
    pub fn base_level(&self) -> i64 {
        self.global_level.floor() as i64
    }

    /// Cross-fade opacity of the child layer (fractional part).
    pub fn child_opacity(&self) -> f64 {
        self.global_level - self.global_level.floor()
    }

    /// Drag the world by a pixel delta.
    ///
    /// The screen delta is rotated into the camera's local frame by
    /// `+rotation` (the layer container is displayed rotated by
    /// `-rotation`, so screen→world undoes that), scaled by world units
    /// per pixel, and subtracted so content follows the cursor.
    pub fn pan(&mut self, dx_pixels: f64, dy_pixels: f64, tile_size: f64) -> CoreResult<()> {
        if !dx_pixels.is_finite() || !dy_pixels.is_finite() {
            return Err(CoreError::BadCameraUpdate(format!(
                "non-finite pan delta ({}, {})",
                dx_pixels, dy_pixels
            )));
        }
        if tile_size <= 0.0 || !tile_size.is_finite() {
            return Err(CoreError::BadCameraUpdate(format!(
                "bad tile size {}",
                tile_size
            )));
        }

        let (sin, cos) = self.rotation.sin_cos();
        let local_dx = dx_pixels * cos - dy_pixels * sin;
        let local_dy = dx_pixels * sin + dy_pixels * cos;

        let digits = self.x.digits();
        let world_per_pixel =
            BigDec::pow2(-self.global_level, digits).mul_f64(1.0 / tile_size);

        self.x = self
            .x
            .sub(&world_per_pixel.mul_f64(local_dx))
            .clamp_unit();
        self.y = self
            .y
            .sub(&world_per_pixel.mul_f64(local_dy))
            .clamp_unit();
        Ok(())
    }

    /// Change the zoom depth; position and rotation are unchanged.
    pub fn zoom(&mut self, delta: f64) -> CoreResult<()> {
        if !delta.is_finite() {
            return Err(CoreError::BadCameraUpdate(format!(
                "non-finite zoom delta {}",
                delta
            )));
        }
        self.global_level = (self.global_level + delta).max(0.0);
        Ok(())
    }

    /// Set the screen rotation in radians. No wrap-around normalization.
    pub fn set_rotation(&mut self, rotation: f64) -> CoreResult<()> {
        if !rotation.is_finite() {
            return Err(CoreError::BadCameraUpdate(format!(
                "non-finite rotation {}",
                rotation
            )));
        }
        self.rotation = rotation;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PrecisionContext {
        PrecisionContext::for_level(100.0)
    }

    #[test]
    fn home_is_centered() {
        let cam = Camera::home(&ctx());
        assert_eq!(cam.global_level, 0.0);
        assert!((cam.x.to_f64() - 0.5).abs() < 1e-12);
        assert!((cam.y.to_f64() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn pan_moves_opposite_to_drag() {
        // Dragging content right means looking left: x decreases.
        let mut cam = Camera::home(&ctx());
        cam.pan(100.0, 0.0, 512.0).unwrap();
        assert!(cam.x.to_f64() < 0.5);
        assert!((cam.y.to_f64() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn pan_scale_matches_level() {
        // At level 0 one tile spans the world: 512 px of drag crosses
        // a full world unit, so 51.2 px is 0.1 world units.
        let mut cam = Camera::home(&ctx());
        cam.pan(-51.2, 0.0, 512.0).unwrap();
        assert!((cam.x.to_f64() - 0.6).abs() < 1e-9);

        // One level deeper the same drag moves half as far.
        let mut cam = Camera::home(&ctx());
        cam.zoom(1.0).unwrap();
        cam.pan(-51.2, 0.0, 512.0).unwrap();
        assert!((cam.x.to_f64() - 0.55).abs() < 1e-9);
    }

    #[test]
    fn pan_respects_rotation() {
        // With the view rotated a quarter turn, a horizontal drag moves
        // the camera along the world y axis.
        let mut cam = Camera::home(&ctx());
        cam.set_rotation(std::f64::consts::FRAC_PI_2).unwrap();
        cam.pan(51.2, 0.0, 512.0).unwrap();
        assert!((cam.x.to_f64() - 0.5).abs() < 1e-9);
        assert!((cam.y.to_f64() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn pan_clamps_to_unit_square() {
        let mut cam = Camera::home(&ctx());
        cam.pan(10_000.0, 10_000.0, 512.0).unwrap();
        assert_eq!(cam.x.to_f64(), 0.0);
        assert_eq!(cam.y.to_f64(), 0.0);
    }

    #[test]
    fn pan_at_depth_preserves_precision() {
        // At level 120 a 1 px pan is ~2^-129 world units, invisible to
        // f64 next to 0.5 but required to survive in the big path.
        let mut cam = Camera::home(&PrecisionContext::for_level(150.0));
        cam.zoom(120.0).unwrap();
        let before = cam.x.clone();
        cam.pan(512.0, 0.0, 512.0).unwrap();
        assert!(cam.x < before, "a deep pan must not be absorbed");
    }

    #[test]
    fn zoom_clamps_at_surface() {
        let mut cam = Camera::home(&ctx());
        cam.zoom(-3.0).unwrap();
        assert_eq!(cam.global_level, 0.0);
        cam.zoom(4.5).unwrap();
        assert_eq!(cam.global_level, 4.5);
        assert_eq!(cam.base_level(), 4);
        assert!((cam.child_opacity() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn non_finite_updates_are_rejected_and_state_kept() {
        let mut cam = Camera::home(&ctx());
        assert!(cam.zoom(f64::NAN).is_err());
        assert!(cam.set_rotation(f64::INFINITY).is_err());
        assert!(cam.pan(f64::NAN, 0.0, 512.0).is_err());
        assert_eq!(cam, Camera::home(&ctx()));
    }
}
