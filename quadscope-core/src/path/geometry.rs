//! Path geometry primitives.
//!
//! A path is a chain of filleted line segments: straight runs between
//! fillet points, joined by quadratic Bézier corners that cut each
//! keyframe's sharp angle, giving a velocity-continuous curve.

use crate::bigdec::BigDec;
use crate::camera::Camera;

/// Below this level delta a segment is treated as pan-only and position
/// interpolation degrades to plain linear blending.
const LEVEL_EPS: f64 = 1e-9;

/// Level-delta magnitude beyond which the zoom-out blend is computed in
/// closed form to avoid exp2 overflow.
const BLEND_OVERFLOW_GUARD: f64 = 700.0;

/// Visual distance between two cameras.
///
/// Position deltas are weighted by the screen scale at the *coarser*
/// endpoint's level. Using the minimum level keeps a deep-zoom segment
/// from astronomically overestimating lateral motion and makes panning
/// cost comparable at any depth.
pub fn visual_distance(a: &Camera, b: &Camera) -> f64 {
    let level_ref = a.global_level.min(b.global_level);
    let dx = scaled_delta(&b.x, &a.x, level_ref);
    let dy = scaled_delta(&b.y, &a.y, level_ref);
    let dl = b.global_level - a.global_level;
    let dr = b.rotation - a.rotation;
    (dx * dx + dy * dy + dl * dl + dr * dr).sqrt()
}

/// (b − a) · 2^level, reduced to f64 only after scaling so deep-zoom
/// deltas far below f64 range survive.
fn scaled_delta(b: &BigDec, a: &BigDec, level: f64) -> f64 {
    let int_part = level.floor();
    let scaled = b.sub(a).mul_pow2(int_part as i64).to_f64();
    scaled * libm::exp2(level - int_part)
}

/// Position blend factor for a line segment at parameter `t`.
///
/// With w = 2^-level the factor is (w(t) − w1) / (w2 − w1) under linear
/// level interpolation, which keeps apparent lateral motion
/// proportional to screen space during a zoom. Expressed through the
/// level delta D = L2 − L1 this is (2^-tD − 1) / (2^-D − 1), which is
/// scale-free and immune to 2^-L underflow at depth.
pub fn swoop_blend(t: f64, level_delta: f64) -> f64 {
    if level_delta.abs() < LEVEL_EPS {
        return t;
    }
    if level_delta < -BLEND_OVERFLOW_GUARD {
        // Extreme zoom-out: numerator and denominator both overflow;
        // their ratio is 2^((t-1)·|D|).
        return libm::exp2((t - 1.0) * -level_delta);
    }
    (libm::exp2(-t * level_delta) - 1.0) / (libm::exp2(-level_delta) - 1.0)
}

/// Straight run between two cameras with swoop position blending.
#[derive(Clone, Debug)]
pub struct LineSeg {
    pub a: Camera,
    pub b: Camera,
}

impl LineSeg {
    pub fn new(a: Camera, b: Camera) -> Self {
        Self { a, b }
    }

    pub fn eval(&self, t: f64) -> Camera {
        let level_delta = self.b.global_level - self.a.global_level;
        let level = self.a.global_level + t * level_delta;
        let s = swoop_blend(t, level_delta);
        Camera {
            global_level: level,
            x: blend(&self.a.x, &self.b.x, s),
            y: blend(&self.a.y, &self.b.y, s),
            rotation: self.a.rotation + t * (self.b.rotation - self.a.rotation),
        }
    }
}

/// Quadratic Bézier through entry → apex → exit, smoothing a keyframe
/// corner between two line runs.
#[derive(Clone, Debug)]
pub struct CornerSeg {
    pub entry: Camera,
    pub apex: Camera,
    pub exit: Camera,
}

impl CornerSeg {
    pub fn new(entry: Camera, apex: Camera, exit: Camera) -> Self {
        Self { entry, apex, exit }
    }

    pub fn eval(&self, t: f64) -> Camera {
        let u = 1.0 - t;
        let c0 = u * u;
        let c1 = 2.0 * u * t;
        let c2 = t * t;
        Camera {
            global_level: c0 * self.entry.global_level
                + c1 * self.apex.global_level
                + c2 * self.exit.global_level,
            x: bezier(&self.entry.x, &self.apex.x, &self.exit.x, c0, c1, c2),
            y: bezier(&self.entry.y, &self.apex.y, &self.exit.y, c0, c1, c2),
            rotation: c0 * self.entry.rotation
                + c1 * self.apex.rotation
                + c2 * self.exit.rotation,
        }
    }
}

/// One piece of a built path.
#[derive(Clone, Debug)]
pub enum Primitive {
    Line(LineSeg),
    Corner(CornerSeg),
}

impl Primitive {
    pub fn eval(&self, t: f64) -> Camera {
        match self {
            Primitive::Line(seg) => seg.eval(t),
            Primitive::Corner(seg) => seg.eval(t),
        }
    }
}

fn blend(a: &BigDec, b: &BigDec, s: f64) -> BigDec {
    a.add(&b.sub(a).mul_f64(s))
}

fn bezier(p0: &BigDec, p1: &BigDec, p2: &BigDec, c0: f64, c1: f64, c2: f64) -> BigDec {
    p0.mul_f64(c0).add(&p1.mul_f64(c1)).add(&p2.mul_f64(c2))
}
