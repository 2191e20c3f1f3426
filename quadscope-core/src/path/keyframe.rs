//! Keyframe wire forms and resolution to canonical cameras.
//!
//! Path JSON accepts several camera shapes: explicit global coordinates
//! (numeric or string for precision), a `level` + `zoomOffset` pair in
//! place of `globalLevel`, and macro forms that map domain coordinates
//! into the unit square. Everything is resolved to a canonical `Camera`
//! before any geometry is built.

use crate::bigdec::BigDec;
use crate::camera::Camera;
use crate::error::{CoreError, CoreResult};
use crate::precision::PrecisionContext;
use serde::{Deserialize, Serialize};

/// Fractal-plane framing used by the `mandelbrot`/`mb` macro: the unit
/// square maps onto the square centered at -0.75+0i spanning 3.0 units,
/// with the imaginary axis pointing up (screen y points down).
const FRACTAL_CENTER_RE: f64 = -0.75;
const FRACTAL_CENTER_IM: f64 = 0.0;
const FRACTAL_SPAN: f64 = 3.0;

/// A standalone path document: `{ "path": { "keyframes": [...] } }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathFile {
    pub path: PathSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PathSpec {
    pub keyframes: Vec<KeyframeSpec>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyframeSpec {
    pub camera: CameraSpec,
}

/// A coordinate that is numeric in casual hand-written paths and a
/// decimal string when full precision matters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    pub fn to_bigdec(&self, digits: usize) -> CoreResult<BigDec> {
        match self {
            Coordinate::Number(v) => {
                if !v.is_finite() {
                    return Err(CoreError::BadCoordinate {
                        input: v.to_string(),
                        reason: "not finite".to_string(),
                    });
                }
                Ok(BigDec::from_f64(*v, digits))
            }
            Coordinate::Text(s) => BigDec::from_str(s, digits),
        }
    }
}

/// Camera as written in path JSON. All fields optional; `resolve`
/// applies the precedence rules.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSpec {
    #[serde(rename = "globalLevel", skip_serializing_if = "Option::is_none")]
    pub global_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    #[serde(rename = "zoomOffset", skip_serializing_if = "Option::is_none")]
    pub zoom_offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Coordinate>,
    #[serde(rename = "globalX", skip_serializing_if = "Option::is_none")]
    pub global_x: Option<Coordinate>,
    #[serde(rename = "globalY", skip_serializing_if = "Option::is_none")]
    pub global_y: Option<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(rename = "macro", skip_serializing_if = "Option::is_none")]
    pub macro_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re: Option<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub im: Option<Coordinate>,
}

impl CameraSpec {
    /// Snapshot a canonical camera as a precision-preserving spec
    /// (positions serialized as decimal strings).
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            global_level: Some(camera.global_level),
            x: Some(Coordinate::Text(camera.x.to_string())),
            y: Some(Coordinate::Text(camera.y.to_string())),
            rotation: Some(camera.rotation),
            ..Self::default()
        }
    }

    /// Resolve to a canonical camera.
    pub fn resolve(&self, ctx: &PrecisionContext) -> CoreResult<Camera> {
        let level = match (self.global_level, self.level) {
            (Some(global), _) => global,
            (None, Some(level)) => level + self.zoom_offset.unwrap_or(0.0),
            (None, None) => 0.0,
        };
        let rotation = self.rotation.unwrap_or(0.0);
        let digits = ctx.digits();

        let (x, y) = match self.macro_kind.as_deref() {
            Some("mandelbrot") | Some("mb") => {
                let re = self.coord(&self.re, "re", digits)?;
                let im = self.coord(&self.im, "im", digits)?;
                mandelbrot_to_global(&re, &im, digits)
            }
            Some("global") => (
                self.coord(&self.global_x, "globalX", digits)?,
                self.coord(&self.global_y, "globalY", digits)?,
            ),
            Some(other) => {
                return Err(CoreError::BadCamera(format!(
                    "unknown keyframe macro {:?}",
                    other
                )))
            }
            None => {
                let x = self.x.as_ref().or(self.global_x.as_ref());
                let y = self.y.as_ref().or(self.global_y.as_ref());
                match (x, y) {
                    (Some(x), Some(y)) => (x.to_bigdec(digits)?, y.to_bigdec(digits)?),
                    // A keyframe with no position pins the world center.
                    (None, None) => (
                        BigDec::from_f64(0.5, digits),
                        BigDec::from_f64(0.5, digits),
                    ),
                    _ => {
                        return Err(CoreError::BadCamera(
                            "keyframe supplies only one of x/y".to_string(),
                        ))
                    }
                }
            }
        };

        Camera::from_parts(level, x, y, rotation)
    }

    fn coord(
        &self,
        field: &Option<Coordinate>,
        name: &str,
        digits: usize,
    ) -> CoreResult<BigDec> {
        field
            .as_ref()
            .ok_or_else(|| {
                CoreError::BadCamera(format!(
                    "macro {:?} requires field {}",
                    self.macro_kind.as_deref().unwrap_or(""),
                    name
                ))
            })?
            .to_bigdec(digits)
    }
}

/// Map fractal-plane coordinates into the unit square, inverting y.
fn mandelbrot_to_global(re: &BigDec, im: &BigDec, digits: usize) -> (BigDec, BigDec) {
    let span = BigDec::from_f64(FRACTAL_SPAN, digits);
    let left = BigDec::from_f64(FRACTAL_CENTER_RE - FRACTAL_SPAN / 2.0, digits);
    let top_im = BigDec::from_f64(FRACTAL_CENTER_IM + FRACTAL_SPAN / 2.0, digits);
    let x = re.sub(&left).div(&span);
    let y = top_im.sub(im).div(&span);
    (x, y)
}

/// Resolve a whole keyframe list to canonical cameras.
pub fn resolve_keyframes(
    specs: &[KeyframeSpec],
    ctx: &PrecisionContext,
) -> CoreResult<Vec<Camera>> {
    specs
        .iter()
        .map(|spec| spec.camera.resolve(ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PrecisionContext {
        PrecisionContext::for_level(100.0)
    }

    #[test]
    fn explicit_global_level_and_position() {
        let spec: CameraSpec = serde_json::from_str(
            r#"{"globalLevel": 12.5, "x": 0.25, "y": "0.75", "rotation": 0.1}"#,
        )
        .unwrap();
        let cam = spec.resolve(&ctx()).unwrap();
        assert_eq!(cam.global_level, 12.5);
        assert!((cam.x.to_f64() - 0.25).abs() < 1e-12);
        assert!((cam.y.to_f64() - 0.75).abs() < 1e-12);
        assert_eq!(cam.rotation, 0.1);
    }

    #[test]
    fn level_plus_zoom_offset() {
        let spec: CameraSpec =
            serde_json::from_str(r#"{"level": 10, "zoomOffset": 0.25, "x": 0.5, "y": 0.5}"#)
                .unwrap();
        let cam = spec.resolve(&ctx()).unwrap();
        assert_eq!(cam.global_level, 10.25);
    }

    #[test]
    fn global_macro_uses_global_fields() {
        let spec: CameraSpec = serde_json::from_str(
            r#"{"macro": "global", "globalLevel": 3, "globalX": "0.1", "globalY": "0.9"}"#,
        )
        .unwrap();
        let cam = spec.resolve(&ctx()).unwrap();
        assert!((cam.x.to_f64() - 0.1).abs() < 1e-12);
        assert!((cam.y.to_f64() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn mandelbrot_macro_maps_the_fractal_frame() {
        // The frame center -0.75+0i lands at the middle of the square.
        let spec: CameraSpec = serde_json::from_str(
            r#"{"macro": "mandelbrot", "globalLevel": 0, "re": -0.75, "im": 0}"#,
        )
        .unwrap();
        let cam = spec.resolve(&ctx()).unwrap();
        assert!((cam.x.to_f64() - 0.5).abs() < 1e-12);
        assert!((cam.y.to_f64() - 0.5).abs() < 1e-12);

        // +i is up in the fractal plane, which is toward smaller y.
        let spec: CameraSpec =
            serde_json::from_str(r#"{"macro": "mb", "re": -0.75, "im": 1.5}"#).unwrap();
        let cam = spec.resolve(&ctx()).unwrap();
        assert!((cam.y.to_f64() - 0.0).abs() < 1e-12);
    }

    #[test]
    fn mandelbrot_macro_preserves_string_precision() {
        let spec: CameraSpec = serde_json::from_str(
            r#"{"macro": "mb", "globalLevel": 200,
                "re": "-0.743643887037158704752191506114774",
                "im": "0.131825904205311970493132056385139"}"#,
        )
        .unwrap();
        let cam = spec.resolve(&PrecisionContext::for_level(200.0)).unwrap();
        // (re + 2.25) / 3 carries the full tail of the input.
        let back = cam
            .x
            .mul(&BigDec::from_f64(3.0, 90))
            .sub(&BigDec::from_f64(2.25, 90));
        let re = BigDec::from_str("-0.743643887037158704752191506114774", 90).unwrap();
        let err = back.sub(&re).to_f64().abs();
        assert!(err < 1e-40, "round-trip error {} too large", err);
    }

    #[test]
    fn unknown_macro_is_rejected() {
        let spec: CameraSpec = serde_json::from_str(r#"{"macro": "julia"}"#).unwrap();
        assert!(matches!(
            spec.resolve(&ctx()),
            Err(CoreError::BadCamera(_))
        ));
    }

    #[test]
    fn missing_macro_fields_are_rejected() {
        let spec: CameraSpec = serde_json::from_str(r#"{"macro": "mb", "re": 0.5}"#).unwrap();
        assert!(spec.resolve(&ctx()).is_err());
    }

    #[test]
    fn camera_snapshot_roundtrips_through_text() {
        let ctx = PrecisionContext::for_level(200.0);
        let cam = Camera::from_strings(
            200.0,
            "0.50000000000000000000000000000000000000000000000001",
            "0.5",
            0.0,
            &ctx,
        )
        .unwrap();
        let spec = CameraSpec::from_camera(&cam);
        let restored = spec.resolve(&ctx).unwrap();
        assert_eq!(restored.x, cam.x);
        assert_eq!(restored.global_level, cam.global_level);
    }
}
