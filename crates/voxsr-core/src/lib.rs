pub mod error;
pub mod geometry;
pub mod volume;

pub use error::{PatchError, Result};
pub use geometry::PatchGeometry;
pub use volume::{normalize, VolumePair, INTENSITY_MAX};
