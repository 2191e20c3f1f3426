pub mod orchestrator;
pub mod path_editor;
pub mod playback;
pub mod session;
pub mod tile_view;

pub use orchestrator::{EngineConfig, FrameHook, FrameOutput, FrameSnapshot, Orchestrator};
pub use path_editor::PathEditor;
pub use playback::{Playback, PlaybackState, PATH_SPEED};
pub use session::{Session, SessionOptions};
pub use tile_view::{SceneOp, TileStyle, TileView};
