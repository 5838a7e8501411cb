//! Co-registered volume pairs and intensity normalization.
//!
//! Volumes are 4D integer tensors shaped (batch, depth, height, width)
//! holding 12-bit sensor samples in a 16-bit container. A low-resolution
//! and a high-resolution volume always travel together and must agree in
//! shape so that a voxel offset means the same location in both.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use crate::error::{PatchError, Result};

/// Largest representable sample value (12-bit data).
pub const INTENSITY_MAX: f32 = 4095.0;

/// Convert integer sample data to floats in `[0.0, 1.0]`.
///
/// This is the single place the intensity scale is applied; cube data
/// stays in compact integer form until the moment a patch is produced.
pub fn normalize<B: Backend, const D: usize>(data: Tensor<B, D, Int>) -> Tensor<B, D> {
    data.float().div_scalar(INTENSITY_MAX)
}

/// A co-registered low-resolution / high-resolution volume pair.
///
/// # Examples
/// ```rust
/// use burn::tensor::{Int, Tensor};
/// use burn_ndarray::NdArray;
/// use voxsr_core::volume::VolumePair;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let lr = Tensor::<Backend, 4, Int>::zeros([1, 8, 8, 8], &device);
/// let hr = Tensor::<Backend, 4, Int>::zeros([1, 8, 8, 8], &device);
/// let pair = VolumePair::new(lr, hr).unwrap();
/// assert_eq!(pair.spatial_size(), [8, 8, 8]);
/// ```
#[derive(Debug, Clone)]
pub struct VolumePair<B: Backend> {
    low_res: Tensor<B, 4, Int>,
    high_res: Tensor<B, 4, Int>,
}

impl<B: Backend> VolumePair<B> {
    /// Pair two volumes, validating that their shapes are identical.
    pub fn new(low_res: Tensor<B, 4, Int>, high_res: Tensor<B, 4, Int>) -> Result<Self> {
        if low_res.dims() != high_res.dims() {
            return Err(PatchError::ShapeMismatch {
                expected: low_res.dims().to_vec(),
                actual: high_res.dims().to_vec(),
            });
        }
        Ok(Self { low_res, high_res })
    }

    /// The low-resolution volume.
    pub fn low_res(&self) -> &Tensor<B, 4, Int> {
        &self.low_res
    }

    /// The high-resolution volume.
    pub fn high_res(&self) -> &Tensor<B, 4, Int> {
        &self.high_res
    }

    /// Number of subjects in the batch.
    pub fn batch_size(&self) -> usize {
        self.low_res.dims()[0]
    }

    /// Spatial extent (depth, height, width).
    pub fn spatial_size(&self) -> [usize; 3] {
        let [_, depth, height, width] = self.low_res.dims();
        [depth, height, width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_pair_shape_mismatch() {
        let device = Default::default();
        let lr = Tensor::<B, 4, Int>::zeros([1, 8, 8, 8], &device);
        let hr = Tensor::<B, 4, Int>::zeros([1, 8, 8, 4], &device);
        assert!(matches!(
            VolumePair::new(lr, hr),
            Err(PatchError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_pair_accessors() {
        let device = Default::default();
        let lr = Tensor::<B, 4, Int>::zeros([2, 8, 16, 16], &device);
        let hr = Tensor::<B, 4, Int>::zeros([2, 8, 16, 16], &device);
        let pair = VolumePair::new(lr, hr).unwrap();
        assert_eq!(pair.batch_size(), 2);
        assert_eq!(pair.spatial_size(), [8, 16, 16]);
    }

    #[test]
    fn test_normalize_range() {
        let device = Default::default();
        let data = TensorData::new(vec![0i64, 1, 2048, 4095], Shape::new([4]));
        let samples = Tensor::<B, 1, Int>::from_data(data, &device);
        let normalized = normalize(samples).into_data();
        let values = normalized.as_slice::<f32>().unwrap();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[3], 1.0);
        assert!(values.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!((values[2] - 2048.0 / 4095.0).abs() < 1e-7);
    }
}
