//! Constant-visual-speed path sampling.
//!
//! A keyframe list becomes a chain of primitives (lines between fillet
//! points, Bézier corners at interior keyframes) plus an arc-length
//! lookup table built by dense sampling. Evaluation maps normalized
//! progress to an arc distance, binary-searches the table and evaluates
//! the bracketing primitive, so equal progress steps cover equal visual
//! distance regardless of how unevenly the primitives are parametrized.

use crate::camera::Camera;
use crate::error::{CoreError, CoreResult};
use crate::path::geometry::{visual_distance, CornerSeg, LineSeg, Primitive};

/// Dense-sampling resolution per primitive for the arc-length table.
pub const SAMPLES_PER_PRIMITIVE: usize = 2000;

/// Fillet radius cap in visual units. Without the cap, long segments
/// meeting at a deep keyframe produce huge radii and the path orbits
/// wide around the corner.
const MAX_FILLET_RADIUS: f64 = 4.0;

#[derive(Clone, Copy, Debug)]
struct LutEntry {
    global_t: f64,
    dist: f64,
}

/// Immutable sampler derived from a keyframe list.
pub struct PathSampler {
    primitives: Vec<Primitive>,
    lut: Vec<LutEntry>,
    total_length: f64,
    stops: Vec<f64>,
}

impl PathSampler {
    /// Build from canonical keyframe cameras.
    ///
    /// One keyframe yields a constant sampler; an empty list is an
    /// error the caller maps to "no playback".
    pub fn build(keyframes: &[Camera]) -> CoreResult<Self> {
        match keyframes.len() {
            0 => Err(CoreError::PathInvalid {
                required: 1,
                actual: 0,
            }),
            1 => {
                let hold = keyframes[0].clone();
                Ok(Self {
                    primitives: vec![Primitive::Line(LineSeg::new(hold.clone(), hold))],
                    lut: vec![
                        LutEntry {
                            global_t: 0.0,
                            dist: 0.0,
                        },
                        LutEntry {
                            global_t: 1.0,
                            dist: 0.0,
                        },
                    ],
                    total_length: 0.0,
                    stops: vec![0.0],
                })
            }
            _ => Ok(Self::build_multi(keyframes)),
        }
    }

    fn build_multi(keyframes: &[Camera]) -> Self {
        let primitives = build_primitives(keyframes);
        let keyframe_ts = keyframe_positions(keyframes.len(), primitives.len());

        let mut lut = Vec::with_capacity(primitives.len() * SAMPLES_PER_PRIMITIVE + 1);
        lut.push(LutEntry {
            global_t: 0.0,
            dist: 0.0,
        });
        let mut dist = 0.0;
        let mut prev = primitives[0].eval(0.0);
        for (index, primitive) in primitives.iter().enumerate() {
            for step in 1..=SAMPLES_PER_PRIMITIVE {
                let t = step as f64 / SAMPLES_PER_PRIMITIVE as f64;
                let here = primitive.eval(t);
                dist += visual_distance(&prev, &here);
                lut.push(LutEntry {
                    global_t: index as f64 + t,
                    dist,
                });
                prev = here;
            }
        }

        let stops = keyframe_ts
            .iter()
            .map(|&gt| dist_at_global_t(&lut, gt))
            .collect();

        Self {
            primitives,
            lut,
            total_length: dist,
            stops,
        }
    }

    /// Total arc length in visual units.
    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Arc distance at which each keyframe occurs.
    pub fn stops(&self) -> &[f64] {
        &self.stops
    }

    /// Camera at normalized progress in [0, 1].
    pub fn camera_at_progress(&self, progress: f64) -> Camera {
        let progress = progress.clamp(0.0, 1.0);
        if self.total_length <= 0.0 {
            return self.primitives[0].eval(0.0);
        }
        self.camera_at_distance(progress * self.total_length)
    }

    /// Camera at an absolute arc distance, clamped to the path.
    pub fn camera_at_distance(&self, distance: f64) -> Camera {
        if self.total_length <= 0.0 {
            return self.primitives[0].eval(0.0);
        }
        let distance = distance.clamp(0.0, self.total_length);

        // Last entry at or below the target distance.
        let upper = self.lut.partition_point(|entry| entry.dist < distance);
        let hi = upper.min(self.lut.len() - 1).max(1);
        let lo = hi - 1;

        let span = self.lut[hi].dist - self.lut[lo].dist;
        let global_t = if span > 0.0 {
            let frac = (distance - self.lut[lo].dist) / span;
            self.lut[lo].global_t + frac * (self.lut[hi].global_t - self.lut[lo].global_t)
        } else {
            self.lut[lo].global_t
        };

        self.eval_global_t(global_t)
    }

    fn eval_global_t(&self, global_t: f64) -> Camera {
        let last = self.primitives.len() - 1;
        let index = (global_t.floor() as usize).min(last);
        let local = (global_t - index as f64).clamp(0.0, 1.0);
        self.primitives[index].eval(local)
    }
}

/// Primitive chain: line to the first fillet, then corner + line pairs,
/// ending on the final keyframe.
fn build_primitives(keyframes: &[Camera]) -> Vec<Primitive> {
    let n = keyframes.len();
    let segment_lengths: Vec<f64> = keyframes
        .windows(2)
        .map(|pair| visual_distance(&pair[0], &pair[1]))
        .collect();

    // Fillet entry/exit points per interior keyframe.
    let mut entries = Vec::with_capacity(n);
    let mut exits = Vec::with_capacity(n);
    for i in 1..n - 1 {
        let len_prev = segment_lengths[i - 1];
        let len_next = segment_lengths[i];
        let radius = (len_prev.min(len_next) * 0.5).min(MAX_FILLET_RADIUS);

        let t_in = if len_prev > 0.0 {
            1.0 - radius / len_prev
        } else {
            1.0
        };
        let t_out = if len_next > 0.0 { radius / len_next } else { 0.0 };

        entries.push(LineSeg::new(keyframes[i - 1].clone(), keyframes[i].clone()).eval(t_in));
        exits.push(LineSeg::new(keyframes[i].clone(), keyframes[i + 1].clone()).eval(t_out));
    }

    let mut primitives = Vec::with_capacity(2 * n - 3);
    let mut cursor = keyframes[0].clone();
    for i in 1..n - 1 {
        let entry = entries[i - 1].clone();
        let exit = exits[i - 1].clone();
        primitives.push(Primitive::Line(LineSeg::new(cursor, entry.clone())));
        primitives.push(Primitive::Corner(CornerSeg::new(
            entry,
            keyframes[i].clone(),
            exit.clone(),
        )));
        cursor = exit;
    }
    primitives.push(Primitive::Line(LineSeg::new(
        cursor,
        keyframes[n - 1].clone(),
    )));
    primitives
}

/// Global-t position of each keyframe on the primitive chain: the path
/// start, each corner apex, the path end.
fn keyframe_positions(keyframe_count: usize, primitive_count: usize) -> Vec<f64> {
    let mut positions = Vec::with_capacity(keyframe_count);
    positions.push(0.0);
    for i in 1..keyframe_count - 1 {
        // Corner primitives sit at odd chain indices: 1, 3, 5, ...
        positions.push((2 * i - 1) as f64 + 0.5);
    }
    positions.push(primitive_count as f64);
    positions
}

/// Arc distance at a global-t position, interpolated from the table.
fn dist_at_global_t(lut: &[LutEntry], global_t: f64) -> f64 {
    let upper = lut.partition_point(|entry| entry.global_t < global_t);
    if upper == 0 {
        return lut[0].dist;
    }
    if upper >= lut.len() {
        return lut[lut.len() - 1].dist;
    }
    let lo = &lut[upper - 1];
    let hi = &lut[upper];
    let span = hi.global_t - lo.global_t;
    if span <= 0.0 {
        return lo.dist;
    }
    let frac = (global_t - lo.global_t) / span;
    lo.dist + frac * (hi.dist - lo.dist)
}
