pub mod bigdec;
pub mod camera;
pub mod error;
pub mod path;
pub mod precision;
pub mod selector;
pub mod tile_index;

pub use bigdec::BigDec;
pub use camera::Camera;
pub use error::{CoreError, CoreResult};
pub use path::{PathSampler, PathSpec};
pub use precision::{digits_for_level, PrecisionContext};
pub use selector::{display_scale, visible_tiles_for_level, VisibleSet, VisibleTile};
pub use tile_index::{TileIndex, TileKey};
