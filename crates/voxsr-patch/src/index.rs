//! Random-access pairing of low-res and high-res patch stacks.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use voxsr_core::error::{PatchError, Result};
use voxsr_core::volume::normalize;

/// A paired low-res/high-res patch dataset with lazy normalization.
///
/// Both stacks are integer tensors shaped `(n, cube, cube, cube)` in the
/// same raster order, so index `i` always refers to spatially
/// corresponding cubes. Cube data stays in integer form; the int→float
/// conversion happens at the moment a patch is produced.
///
/// # Examples
/// ```rust
/// use burn::tensor::{Int, Tensor};
/// use burn_ndarray::NdArray;
/// use voxsr_patch::PatchIndex;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let lr = Tensor::<Backend, 4, Int>::zeros([5, 8, 8, 8], &device);
/// let hr = Tensor::<Backend, 4, Int>::zeros([5, 8, 8, 8], &device);
/// let index = PatchIndex::new(lr, hr).unwrap();
/// assert_eq!(index.len(), 5);
/// let (lr_cube, hr_cube) = index.get(0).unwrap();
/// assert_eq!(lr_cube.dims(), [1, 8, 8, 8]);
/// assert_eq!(hr_cube.dims(), [1, 8, 8, 8]);
/// ```
#[derive(Debug, Clone)]
pub struct PatchIndex<B: Backend> {
    low_res: Tensor<B, 4, Int>,
    high_res: Tensor<B, 4, Int>,
}

impl<B: Backend> PatchIndex<B> {
    /// Pair two patch stacks, validating that their shapes are identical.
    pub fn new(low_res: Tensor<B, 4, Int>, high_res: Tensor<B, 4, Int>) -> Result<Self> {
        if low_res.dims() != high_res.dims() {
            return Err(PatchError::ShapeMismatch {
                expected: low_res.dims().to_vec(),
                actual: high_res.dims().to_vec(),
            });
        }
        Ok(Self { low_res, high_res })
    }

    /// Number of patch pairs.
    pub fn len(&self) -> usize {
        self.low_res.dims()[0]
    }

    /// Whether the index holds no patches.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The normalized patch pair at `i`, each shaped
    /// `(1, cube, cube, cube)` with a leading singleton channel axis.
    ///
    /// Pure and side-effect free; safe to call concurrently for distinct
    /// indices.
    pub fn get(&self, i: usize) -> Result<(Tensor<B, 4>, Tensor<B, 4>)> {
        let len = self.len();
        if i >= len {
            return Err(PatchError::IndexOutOfBounds { index: i, len });
        }
        Ok(self.fetch(i))
    }

    /// Unchecked variant of [`get`](Self::get) for callers that validated
    /// their indices up front.
    pub(crate) fn fetch(&self, i: usize) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let [_, depth, height, width] = self.low_res.dims();
        let ranges = [i..i + 1, 0..depth, 0..height, 0..width];
        let lr = normalize(self.low_res.clone().slice(ranges.clone()));
        let hr = normalize(self.high_res.clone().slice(ranges));
        (lr, hr)
    }
}
