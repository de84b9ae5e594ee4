pub mod selector;
pub mod types;

pub use selector::RegionSelector;
pub use types::{PixelMask, Point, Polygon, Rect, Region, RegionGeometry};
