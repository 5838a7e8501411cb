pub mod depatcher;
pub mod index;
pub mod loader;
pub mod patcher;

pub use depatcher::Depatcher;
pub use index::PatchIndex;
pub use loader::PatchLoader;
pub use patcher::{Patcher, TrainingOptions, DEFAULT_LOADER_BATCH};

pub use voxsr_core::{PatchError, PatchGeometry, Result, VolumePair};
