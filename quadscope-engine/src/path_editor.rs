//! In-memory editing of the active camera path.
//!
//! Every mutation leaves the keyframe list canonical (cameras, not wire
//! specs) and the caller rebuilds the sampler afterwards; stale
//! samplers are never left behind a mutation.

use quadscope_core::path::{CameraSpec, KeyframeSpec, PathFile, PathSampler, PathSpec};
use quadscope_core::{Camera, CoreResult, PrecisionContext};

pub struct PathEditor {
    keyframes: Vec<Camera>,
    active_index: usize,
}

impl PathEditor {
    pub fn new() -> Self {
        Self {
            keyframes: Vec::new(),
            active_index: 0,
        }
    }

    /// Resolve a wire path into an editor.
    pub fn from_spec(spec: &PathSpec, ctx: &PrecisionContext) -> CoreResult<Self> {
        let keyframes = quadscope_core::path::resolve_keyframes(&spec.keyframes, ctx)?;
        Ok(Self {
            keyframes,
            active_index: 0,
        })
    }

    pub fn keyframes(&self) -> &[Camera] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// Select a keyframe and return its exact camera (bypassing the
    /// sampler, so no fillet rounding touches the jump target).
    pub fn jump_to(&mut self, index: usize) -> Option<&Camera> {
        if index >= self.keyframes.len() {
            return None;
        }
        self.active_index = index;
        Some(&self.keyframes[index])
    }

    /// Snapshot the camera after the active keyframe and select it.
    pub fn insert_after_active(&mut self, camera: &Camera) {
        let insert_at = if self.keyframes.is_empty() {
            0
        } else {
            (self.active_index + 1).min(self.keyframes.len())
        };
        self.keyframes.insert(insert_at, camera.clone());
        self.active_index = insert_at;
    }

    /// Remove a keyframe, keeping the active selection sensible.
    pub fn delete(&mut self, index: usize) -> bool {
        if index >= self.keyframes.len() {
            return false;
        }
        self.keyframes.remove(index);
        if self.keyframes.is_empty() {
            self.active_index = 0;
        } else if index < self.active_index || self.active_index >= self.keyframes.len() {
            self.active_index = self.active_index.saturating_sub(1);
        }
        true
    }

    /// Build a fresh sampler from the current keyframes. `None` when
    /// the list is empty (nothing to sample).
    pub fn rebuild(&self) -> Option<CoreResult<PathSampler>> {
        if self.keyframes.is_empty() {
            return None;
        }
        Some(PathSampler::build(&self.keyframes))
    }

    /// Wire form with positions as decimal strings, for copy-to-JSON.
    pub fn to_spec(&self) -> PathSpec {
        PathSpec {
            keyframes: self
                .keyframes
                .iter()
                .map(|camera| KeyframeSpec {
                    camera: CameraSpec::from_camera(camera),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> String {
        let file = PathFile {
            path: self.to_spec(),
        };
        serde_json::to_string_pretty(&file).unwrap_or_else(|e| {
            log::error!("path serialization failed: {}", e);
            String::new()
        })
    }
}

impl Default for PathEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadscope_core::BigDec;

    fn ctx() -> PrecisionContext {
        PrecisionContext::for_level(100.0)
    }

    fn cam(level: f64, x: f64) -> Camera {
        Camera::from_parts(
            level,
            BigDec::from_f64(x, ctx().digits()),
            BigDec::from_f64(0.5, ctx().digits()),
            0.0,
        )
        .unwrap()
    }

    fn editor_with(n: usize) -> PathEditor {
        let mut editor = PathEditor::new();
        for i in 0..n {
            editor.insert_after_active(&cam(i as f64, 0.1 * i as f64 + 0.1));
        }
        editor
    }

    #[test]
    fn insert_advances_the_active_index() {
        let mut editor = PathEditor::new();
        editor.insert_after_active(&cam(0.0, 0.1));
        assert_eq!(editor.active_index(), 0);
        editor.insert_after_active(&cam(1.0, 0.2));
        assert_eq!(editor.active_index(), 1);
        assert_eq!(editor.len(), 2);

        // Inserting mid-list lands right after the selection.
        editor.jump_to(0);
        editor.insert_after_active(&cam(0.5, 0.15));
        assert_eq!(editor.len(), 3);
        assert_eq!(editor.active_index(), 1);
        assert_eq!(editor.keyframes()[1].global_level, 0.5);
    }

    #[test]
    fn jump_returns_the_exact_keyframe() {
        let mut editor = editor_with(3);
        let cam1 = editor.keyframes()[1].clone();
        let jumped = editor.jump_to(1).unwrap().clone();
        assert_eq!(jumped, cam1);
        assert_eq!(editor.active_index(), 1);
        assert!(editor.jump_to(9).is_none());
    }

    #[test]
    fn delete_adjusts_the_selection() {
        let mut editor = editor_with(4);
        editor.jump_to(2);

        // Deleting before the selection shifts it down.
        editor.delete(0);
        assert_eq!(editor.active_index(), 1);

        // Deleting the tail clamps the selection.
        editor.jump_to(2);
        editor.delete(2);
        assert_eq!(editor.active_index(), 1);

        editor.delete(1);
        editor.delete(0);
        assert!(editor.is_empty());
        assert!(!editor.delete(0));
    }

    #[test]
    fn rebuild_tracks_keyframe_count() {
        let mut editor = PathEditor::new();
        assert!(editor.rebuild().is_none());

        editor.insert_after_active(&cam(0.0, 0.2));
        let single = editor.rebuild().unwrap().unwrap();
        assert_eq!(single.total_length(), 0.0);

        editor.insert_after_active(&cam(0.0, 0.8));
        let sampler = editor.rebuild().unwrap().unwrap();
        assert!(sampler.total_length() > 0.0);
        assert_eq!(sampler.stops().len(), 2);
    }

    #[test]
    fn copy_to_json_preserves_position_strings() {
        let ctx = PrecisionContext::for_level(200.0);
        let mut editor = PathEditor::new();
        let deep = Camera::from_strings(
            200.0,
            "0.50000000000000000000000000000000000000000000000001",
            "0.5",
            0.0,
            &ctx,
        )
        .unwrap();
        editor.insert_after_active(&deep);

        let json = editor.to_json();
        let file: PathFile = serde_json::from_str(&json).unwrap();
        let restored = file.path.keyframes[0].camera.resolve(&ctx).unwrap();
        assert_eq!(restored.x, deep.x, "precision must survive the round-trip");
    }
}
