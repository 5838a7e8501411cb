//! Reassembling sliding-window patches into full volumes.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use voxsr_core::error::{PatchError, Result};
use voxsr_core::geometry::PatchGeometry;

/// Inverts sliding-window tiling: trims the margin off every patch,
/// re-tiles the trimmed cubes into the merged volume, then crops the
/// remaining padding to recover the original extent.
///
/// The input must carry the patches in the exact raster order the
/// sliding-window patcher produced them; the depatcher knows nothing else
/// about their provenance. Because the margin removal discards the window
/// overlap, every trimmed cube lands in a disjoint block of the merged
/// volume; there is no averaging or blending at seams.
#[derive(Debug, Clone)]
pub struct Depatcher {
    geometry: PatchGeometry,
}

impl Depatcher {
    /// Create a depatcher over the given geometry.
    pub fn new(geometry: PatchGeometry) -> Self {
        Self { geometry }
    }

    /// The geometry this depatcher reassembles with.
    pub fn geometry(&self) -> &PatchGeometry {
        &self.geometry
    }

    /// Reassemble `batch_size` volumes from a flat patch sequence.
    ///
    /// # Arguments
    /// * `patches` - Float tensor shaped `(total, 1, cube, cube, cube)` in
    ///   sliding-window raster order
    /// * `batch_size` - Number of subjects represented
    ///
    /// # Returns
    /// A `(batch_size, depth, height, width)` float volume of the
    /// original (pre-padding) extent. Values are passed through untouched;
    /// undoing intensity normalization is the caller's concern.
    ///
    /// # Errors
    /// `ShapeMismatch` when the patch count, cube extent or channel axis
    /// disagree with the geometry; `InvalidConfiguration` for an empty
    /// batch.
    pub fn reassemble<B: Backend>(
        &self,
        patches: Tensor<B, 5>,
        batch_size: usize,
    ) -> Result<Tensor<B, 4>> {
        if batch_size == 0 {
            return Err(PatchError::invalid_configuration(
                "batch_size must be positive",
            ));
        }
        let cube = self.geometry.cube_size();
        let per_volume = self.geometry.patches_per_volume();
        let dims = patches.dims();
        let expected = [batch_size * per_volume, 1, cube, cube, cube];
        if dims != expected {
            return Err(PatchError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: dims.to_vec(),
            });
        }

        let total = dims[0];
        let margin = self.geometry.margin();
        let trimmed_cube = self.geometry.trimmed_cube();
        let trimmed = patches
            .slice([
                0..total,
                0..1,
                margin..cube - margin,
                margin..cube - margin,
                margin..cube - margin,
            ])
            .reshape([total, trimmed_cube, trimmed_cube, trimmed_cube]);

        let [nz, nx, ny] = self.geometry.grid();
        let merged_size = self.geometry.merged_size();
        tracing::debug!(
            "reassembling {} subjects from a {}x{}x{} grid of {}-voxel cubes",
            batch_size,
            nz,
            nx,
            ny,
            trimmed_cube
        );

        let device = trimmed.device();
        let mut merged = Tensor::<B, 4>::zeros(
            [batch_size, merged_size[0], merged_size[1], merged_size[2]],
            &device,
        );
        for b in 0..batch_size {
            for i in 0..nz {
                for j in 0..nx {
                    for k in 0..ny {
                        let flat = ((b * nz + i) * nx + j) * ny + k;
                        let cell = trimmed.clone().slice([
                            flat..flat + 1,
                            0..trimmed_cube,
                            0..trimmed_cube,
                            0..trimmed_cube,
                        ]);
                        merged = merged.slice_assign(
                            [
                                b..b + 1,
                                i * trimmed_cube..(i + 1) * trimmed_cube,
                                j * trimmed_cube..(j + 1) * trimmed_cube,
                                k * trimmed_cube..(k + 1) * trimmed_cube,
                            ],
                            cell,
                        );
                    }
                }
            }
        }

        // The merged volume still carries (padding - margin) of the
        // zero border per face; crop it to the original extent.
        let padding = self.geometry.padding();
        let crop = [padding[0] - margin, padding[1] - margin, padding[2] - margin];
        Ok(merged.slice([
            0..batch_size,
            crop[0]..merged_size[0] - crop[0],
            crop[1]..merged_size[1] - crop[1],
            crop[2]..merged_size[2] - crop[2],
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_rejects_wrong_patch_count() {
        let geometry = PatchGeometry::new(8, 1, [12, 18, 18]).unwrap();
        let depatcher = Depatcher::new(geometry);
        let device = Default::default();
        // 18 patches per subject; 17 cannot be a whole number of subjects.
        let patches = Tensor::<B, 5>::zeros([17, 1, 8, 8, 8], &device);
        assert!(matches!(
            depatcher.reassemble(patches, 1),
            Err(PatchError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_multi_channel_patches() {
        let geometry = PatchGeometry::new(8, 1, [12, 18, 18]).unwrap();
        let depatcher = Depatcher::new(geometry);
        let device = Default::default();
        let patches = Tensor::<B, 5>::zeros([18, 2, 8, 8, 8], &device);
        assert!(matches!(
            depatcher.reassemble(patches, 1),
            Err(PatchError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_batch() {
        let geometry = PatchGeometry::new(8, 1, [12, 18, 18]).unwrap();
        let depatcher = Depatcher::new(geometry);
        let device = Default::default();
        let patches = Tensor::<B, 5>::zeros([18, 1, 8, 8, 8], &device);
        assert!(matches!(
            depatcher.reassemble(patches, 0),
            Err(PatchError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_output_extent() {
        let geometry = PatchGeometry::new(8, 1, [12, 18, 18]).unwrap();
        let depatcher = Depatcher::new(geometry);
        let device = Default::default();
        let patches = Tensor::<B, 5>::zeros([2 * 18, 1, 8, 8, 8], &device);
        let volume = depatcher.reassemble(patches, 2).unwrap();
        assert_eq!(volume.dims(), [2, 12, 18, 18]);
    }
}
