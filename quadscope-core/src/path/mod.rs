//! Camera paths: keyframe wire forms, fillet geometry, and the
//! constant-visual-speed sampler.

pub mod geometry;
pub mod keyframe;
pub mod sampler;

pub use geometry::{swoop_blend, visual_distance, CornerSeg, LineSeg, Primitive};
pub use keyframe::{resolve_keyframes, CameraSpec, Coordinate, KeyframeSpec, PathFile, PathSpec};
pub use sampler::{PathSampler, SAMPLES_PER_PRIMITIVE};
