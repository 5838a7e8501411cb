//! Splitting volume pairs into streams of fixed-size cube pairs.
//!
//! Two modes share the extraction machinery:
//!
//! * **Training**: non-overlapping tiling (stride = cube size, no padding)
//!   followed by a uniform random sample of the patch indices. Volume
//!   dimensions must divide exactly by the cube size.
//! * **Sliding window**: deterministic overlapped tiling of the zero-padded
//!   volumes (stride = cube size minus twice the margin), producing every
//!   patch in raster order (subject-major, then depth, then height, then
//!   width), which is exactly the order the depatcher expects back.

use std::collections::HashSet;

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use voxsr_core::error::{PatchError, Result};
use voxsr_core::geometry::PatchGeometry;
use voxsr_core::volume::VolumePair;

use crate::index::PatchIndex;
use crate::loader::PatchLoader;

/// Default number of patch pairs per yielded mini-batch.
pub const DEFAULT_LOADER_BATCH: usize = 2;

/// Sampling controls for training-mode extraction.
#[derive(Debug, Clone)]
pub struct TrainingOptions {
    /// Fraction in (0, 1] of the available patches to sample.
    pub usage: f64,
    /// Patch indices to omit before sampling, sourced from auxiliary
    /// metadata. Out-of-range entries are ignored.
    pub exclusions: Vec<usize>,
    /// Optional random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            usage: 1.0,
            exclusions: Vec::new(),
            seed: None,
        }
    }
}

impl TrainingOptions {
    /// Create options with the default full usage and no exclusions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sampled fraction of available patches.
    pub fn with_usage(mut self, usage: f64) -> Self {
        self.usage = usage;
        self
    }

    /// Set the excluded patch indices.
    pub fn with_exclusions(mut self, exclusions: Vec<usize>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Fix the shuffle seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Tiles co-registered volume pairs into normalized patch-pair streams.
///
/// # Examples
/// ```rust
/// use burn::tensor::{Int, Tensor};
/// use burn_ndarray::NdArray;
/// use voxsr_core::{PatchGeometry, VolumePair};
/// use voxsr_patch::{Patcher, TrainingOptions};
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let lr = Tensor::<Backend, 4, Int>::zeros([1, 8, 8, 8], &device);
/// let hr = Tensor::<Backend, 4, Int>::zeros([1, 8, 8, 8], &device);
/// let volumes = VolumePair::new(lr, hr).unwrap();
///
/// let geometry = PatchGeometry::new(4, 1, [8, 8, 8]).unwrap();
/// let patcher = Patcher::new(geometry);
/// let loader = patcher
///     .training_loader(&volumes, &TrainingOptions::new().with_seed(7))
///     .unwrap();
/// assert_eq!(loader.num_patches(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct Patcher {
    geometry: PatchGeometry,
    loader_batch: usize,
}

impl Patcher {
    /// Create a patcher over the given geometry with the default
    /// mini-batch size.
    pub fn new(geometry: PatchGeometry) -> Self {
        Self {
            geometry,
            loader_batch: DEFAULT_LOADER_BATCH,
        }
    }

    /// Set the number of patch pairs per yielded mini-batch.
    ///
    /// Unrelated to the cube geometry; validated when a loader is built.
    pub fn with_loader_batch(mut self, loader_batch: usize) -> Self {
        self.loader_batch = loader_batch;
        self
    }

    /// The geometry this patcher tiles with.
    pub fn geometry(&self) -> &PatchGeometry {
        &self.geometry
    }

    /// Tile for training: non-overlapping cubes, a shuffled subset of
    /// which is streamed in sampled order.
    ///
    /// # Arguments
    /// * `volumes` - The co-registered volume pair to tile
    /// * `options` - Usage fraction, exclusion set and shuffle seed
    ///
    /// # Errors
    /// `InvalidConfiguration` if `usage` is outside (0, 1];
    /// `DimensionMismatch` if a spatial dimension is not an exact multiple
    /// of the cube size.
    pub fn training_loader<B: Backend>(
        &self,
        volumes: &VolumePair<B>,
        options: &TrainingOptions,
    ) -> Result<PatchLoader<B>> {
        if !(options.usage > 0.0 && options.usage <= 1.0) {
            return Err(PatchError::invalid_configuration(format!(
                "usage must be in (0, 1], got {}",
                options.usage
            )));
        }
        let cube = self.geometry.cube_size();
        self.geometry.training_grid(volumes.spatial_size())?;

        let low_res = tile(volumes.low_res(), cube, cube);
        let high_res = tile(volumes.high_res(), cube, cube);
        let index = PatchIndex::new(low_res, high_res)?;
        let num_patches = index.len();

        let excluded: HashSet<usize> = options.exclusions.iter().copied().collect();
        let mut indices: Vec<usize> =
            (0..num_patches).filter(|i| !excluded.contains(i)).collect();
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        indices.shuffle(&mut rng);

        // The sampled count is a fraction of the full tiling; exclusions
        // can only shrink it further.
        let take = (options.usage * num_patches as f64).floor() as usize;
        indices.truncate(take);

        tracing::debug!(
            "training tiling: sampled {} of {} patches ({} excluded)",
            indices.len(),
            num_patches,
            excluded.iter().filter(|&&i| i < num_patches).count()
        );
        PatchLoader::new(index, indices, self.loader_batch)
    }

    /// Tile for evaluation: every cube of the zero-padded volumes, in
    /// deterministic raster order.
    ///
    /// # Errors
    /// `DimensionMismatch` if the volume extent differs from the
    /// geometry's configured image size.
    pub fn sliding_window_loader<B: Backend>(
        &self,
        volumes: &VolumePair<B>,
    ) -> Result<PatchLoader<B>> {
        let spatial = volumes.spatial_size();
        let expected = self.geometry.image_size();
        if spatial != expected {
            return Err(PatchError::dimension_mismatch(format!(
                "sliding-window tiling is configured for volumes of {:?}, got {:?}",
                expected, spatial
            )));
        }

        let cube = self.geometry.cube_size();
        let stride = self.geometry.stride();
        let padding = self.geometry.padding();
        let low_res = tile(&pad(volumes.low_res(), padding), cube, stride);
        let high_res = tile(&pad(volumes.high_res(), padding), cube, stride);
        let index = PatchIndex::new(low_res, high_res)?;

        tracing::debug!(
            "sliding-window tiling: {} subjects, {} patches each",
            volumes.batch_size(),
            self.geometry.patches_per_volume()
        );
        let order: Vec<usize> = (0..index.len()).collect();
        PatchLoader::new(index, order, self.loader_batch)
    }
}

/// Extract every window of edge `cube` at the given stride, flattened in
/// raster order (subject-major, then depth, height, width).
///
/// Callers guarantee `(extent - cube)` divides by `stride` on every axis,
/// so the windows cover the volume with no leftover region.
fn tile<B: Backend>(volume: &Tensor<B, 4, Int>, cube: usize, stride: usize) -> Tensor<B, 4, Int> {
    let [batch, depth, height, width] = volume.dims();
    let starts = |extent: usize| (0..=extent - cube).step_by(stride);

    let mut cubes = Vec::new();
    for b in 0..batch {
        for z in starts(depth) {
            for y in starts(height) {
                for x in starts(width) {
                    cubes.push(volume.clone().slice([
                        b..b + 1,
                        z..z + cube,
                        y..y + cube,
                        x..x + cube,
                    ]));
                }
            }
        }
    }
    Tensor::cat(cubes, 0)
}

/// Zero-pad a volume symmetrically per spatial axis, copying the original
/// data into the centered interior.
fn pad<B: Backend>(volume: &Tensor<B, 4, Int>, padding: [usize; 3]) -> Tensor<B, 4, Int> {
    let [batch, depth, height, width] = volume.dims();
    let [pd, ph, pw] = padding;
    let padded = Tensor::zeros(
        [batch, depth + 2 * pd, height + 2 * ph, width + 2 * pw],
        &volume.device(),
    );
    padded.slice_assign(
        [0..batch, pd..pd + depth, ph..ph + height, pw..pw + width],
        volume.clone(),
    )
}
