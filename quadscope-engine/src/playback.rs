//! Path playback clock.
//!
//! Playback advances elapsed wall time and converts it to an arc
//! distance along the sampled path, so the camera moves at constant
//! visual speed no matter how the keyframes are spaced.

use quadscope_core::path::PathSampler;
use quadscope_core::Camera;

/// Visual units per second of playback.
pub const PATH_SPEED: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// Autoplay requested; starts once every visible tile has loaded.
    Armed,
    Playing,
    Paused,
}

pub struct Playback {
    sampler: Option<PathSampler>,
    state: PlaybackState,
    elapsed_s: f64,
    last_tick_ms: Option<f64>,
}

impl Playback {
    pub fn new() -> Self {
        Self {
            sampler: None,
            state: PlaybackState::Idle,
            elapsed_s: 0.0,
            last_tick_ms: None,
        }
    }

    /// Install a rebuilt sampler. Resets the clock; a path edit
    /// invalidates any in-flight playback position.
    pub fn set_sampler(&mut self, sampler: Option<PathSampler>) {
        self.sampler = sampler;
        self.elapsed_s = 0.0;
        self.last_tick_ms = None;
        if !self.can_play() {
            self.state = PlaybackState::Idle;
        }
    }

    pub fn sampler(&self) -> Option<&PathSampler> {
        self.sampler.as_ref()
    }

    /// Playback needs at least two keyframes worth of path.
    pub fn can_play(&self) -> bool {
        self.sampler
            .as_ref()
            .is_some_and(|s| s.stops().len() >= 2 && s.total_length() > 0.0)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_armed(&self) -> bool {
        self.state == PlaybackState::Armed
    }

    /// Request autoplay; the orchestrator starts it once tiles settle.
    pub fn arm(&mut self) {
        if self.can_play() {
            self.state = PlaybackState::Armed;
        }
    }

    pub fn play(&mut self) {
        if self.can_play() {
            self.state = PlaybackState::Playing;
            self.last_tick_ms = None;
        }
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            self.last_tick_ms = None;
        }
    }

    pub fn stop(&mut self) {
        self.state = PlaybackState::Idle;
        self.elapsed_s = 0.0;
        self.last_tick_ms = None;
    }

    /// Jump the clock to an absolute arc distance (timeline scrub,
    /// keyframe jump).
    pub fn seek_distance(&mut self, distance: f64) {
        self.elapsed_s = (distance / PATH_SPEED).max(0.0);
        self.last_tick_ms = None;
    }

    /// Normalized progress for the timeline scrubber.
    pub fn progress(&self) -> f64 {
        let Some(sampler) = &self.sampler else {
            return 0.0;
        };
        let total = sampler.total_length();
        if total <= 0.0 {
            return 0.0;
        }
        (self.elapsed_s * PATH_SPEED / total).clamp(0.0, 1.0)
    }

    /// Advance the clock and sample the camera. Returns `None` unless
    /// playing. Playback stops at the end of the path.
    pub fn advance(&mut self, now_ms: f64) -> Option<Camera> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        let sampler = self.sampler.as_ref()?;

        if let Some(last) = self.last_tick_ms {
            self.elapsed_s += ((now_ms - last) / 1000.0).max(0.0);
        }
        self.last_tick_ms = Some(now_ms);

        let distance = self.elapsed_s * PATH_SPEED;
        let camera = sampler.camera_at_distance(distance);
        if distance >= sampler.total_length() {
            self.state = PlaybackState::Paused;
        }
        Some(camera)
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadscope_core::{BigDec, Camera, PrecisionContext};

    fn cam(level: f64, x: f64) -> Camera {
        let ctx = PrecisionContext::new();
        Camera::from_parts(
            level,
            BigDec::from_f64(x, ctx.digits()),
            BigDec::from_f64(0.5, ctx.digits()),
            0.0,
        )
        .unwrap()
    }

    fn pan_sampler() -> PathSampler {
        PathSampler::build(&[cam(0.0, 0.2), cam(0.0, 0.8)]).unwrap()
    }

    #[test]
    fn single_keyframe_cannot_play() {
        let mut playback = Playback::new();
        playback.set_sampler(Some(PathSampler::build(&[cam(0.0, 0.5)]).unwrap()));
        assert!(!playback.can_play());
        playback.play();
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn advance_moves_at_path_speed() {
        let mut playback = Playback::new();
        playback.set_sampler(Some(pan_sampler()));
        playback.play();

        // First tick establishes the clock.
        let start = playback.advance(1000.0).unwrap();
        assert!((start.x.to_f64() - 0.2).abs() < 1e-9);

        // 0.6 visual units of path at 3 units/s finishes in 0.2 s; at
        // 0.1 s we are halfway.
        let mid = playback.advance(1100.0).unwrap();
        assert!((mid.x.to_f64() - 0.5).abs() < 1e-3, "got {}", mid.x.to_f64());

        let end = playback.advance(1300.0).unwrap();
        assert!((end.x.to_f64() - 0.8).abs() < 1e-9);
        assert_eq!(playback.state(), PlaybackState::Paused);
    }

    #[test]
    fn pause_freezes_the_clock() {
        let mut playback = Playback::new();
        playback.set_sampler(Some(pan_sampler()));
        playback.play();
        playback.advance(0.0);
        playback.advance(50.0);
        playback.pause();
        assert!(playback.advance(5000.0).is_none());

        let progress_paused = playback.progress();
        playback.play();
        playback.advance(10_000.0);
        // Resuming does not jump by the paused wall time.
        assert!((playback.progress() - progress_paused).abs() < 1e-9);
    }

    #[test]
    fn seek_positions_the_scrubber() {
        let mut playback = Playback::new();
        let sampler = pan_sampler();
        let total = sampler.total_length();
        playback.set_sampler(Some(sampler));
        playback.seek_distance(total / 2.0);
        assert!((playback.progress() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rebuilding_resets_the_clock() {
        let mut playback = Playback::new();
        playback.set_sampler(Some(pan_sampler()));
        playback.play();
        playback.advance(0.0);
        playback.advance(100.0);
        playback.set_sampler(Some(pan_sampler()));
        assert_eq!(playback.progress(), 0.0);
    }
}
