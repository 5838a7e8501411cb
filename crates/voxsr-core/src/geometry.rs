//! Patch geometry configuration.
//!
//! This module provides the PatchGeometry struct which captures the tiling
//! arithmetic shared by the patcher and the depatcher: cube size, margin,
//! the expected volume extent and the symmetric zero-padding per axis.
//!
//! The padding is not free-form. For the sliding window to cover the padded
//! volume with no leftover region, and for the margin-trimmed patches to
//! re-tile the merged volume exactly, every axis must satisfy
//! `image + 2*padding = stride * n + cube` for some positive `n`
//! (equivalently: the merged extent is an exact multiple of the trimmed
//! cube edge). Construction either derives the minimal padding satisfying
//! this, or validates a caller-supplied override against it.

use crate::error::{PatchError, Result};

/// Default cube edge length in voxels.
pub const DEFAULT_CUBE_SIZE: usize = 64;

/// Default margin trimmed from each patch face before reassembly.
pub const DEFAULT_MARGIN: usize = 3;

/// Default volume extent (depth, height, width).
pub const DEFAULT_IMAGE_SIZE: [usize; 3] = [192, 320, 320];

/// Tiling geometry shared by patch extraction and reassembly.
///
/// # Examples
/// ```rust
/// use voxsr_core::geometry::PatchGeometry;
///
/// let geometry = PatchGeometry::default();
/// assert_eq!(geometry.stride(), 58);
/// assert_eq!(geometry.padding(), [23, 17, 17]);
/// assert_eq!(geometry.patches_per_volume(), 144);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchGeometry {
    /// Edge length of an extracted cube.
    cube_size: usize,
    /// Border thickness trimmed from each cube face at reassembly.
    margin: usize,
    /// Spatial extent (depth, height, width) of the volumes this geometry
    /// tiles in sliding-window mode.
    image_size: [usize; 3],
    /// Symmetric zero-padding per axis applied before sliding-window tiling.
    padding: [usize; 3],
}

impl Default for PatchGeometry {
    fn default() -> Self {
        Self::new(DEFAULT_CUBE_SIZE, DEFAULT_MARGIN, DEFAULT_IMAGE_SIZE)
            .expect("default geometry satisfies its own invariants")
    }
}

impl PatchGeometry {
    /// Create a geometry for the given cube size, margin and volume extent,
    /// deriving the minimal symmetric padding that closes every axis.
    ///
    /// # Arguments
    /// * `cube_size` - Edge length of extracted cubes; must exceed `2 * margin`
    /// * `margin` - Border trimmed from each cube face at reassembly
    /// * `image_size` - Volume extent (depth, height, width)
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for degenerate sizes and
    /// `DimensionMismatch` when an axis cannot be closed by any symmetric
    /// integer padding (parity mismatch between extent and stride).
    pub fn new(cube_size: usize, margin: usize, image_size: [usize; 3]) -> Result<Self> {
        if cube_size == 0 {
            return Err(PatchError::invalid_configuration("cube_size must be positive"));
        }
        if cube_size <= 2 * margin {
            return Err(PatchError::invalid_configuration(format!(
                "cube_size ({}) must exceed twice the margin ({})",
                cube_size, margin
            )));
        }
        if image_size.iter().any(|&extent| extent == 0) {
            return Err(PatchError::invalid_configuration(format!(
                "image_size must be positive on every axis, got {:?}",
                image_size
            )));
        }

        let stride = cube_size - 2 * margin;
        let mut padding = [0usize; 3];
        for axis in 0..3 {
            padding[axis] = derive_padding(image_size[axis], cube_size, stride, margin)?;
        }

        let geometry = Self {
            cube_size,
            margin,
            image_size,
            padding,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Replace the derived padding with an explicit per-axis override.
    ///
    /// The override is validated against the closure invariant; a
    /// combination that does not tile exactly is rejected rather than
    /// silently adjusted.
    pub fn with_padding(mut self, padding: [usize; 3]) -> Result<Self> {
        self.padding = padding;
        self.validate()?;
        Ok(self)
    }

    /// Cube edge length in voxels.
    pub fn cube_size(&self) -> usize {
        self.cube_size
    }

    /// Margin trimmed from each cube face at reassembly.
    pub fn margin(&self) -> usize {
        self.margin
    }

    /// Volume extent (depth, height, width) this geometry tiles.
    pub fn image_size(&self) -> [usize; 3] {
        self.image_size
    }

    /// Symmetric zero-padding per axis.
    pub fn padding(&self) -> [usize; 3] {
        self.padding
    }

    /// Sliding-window step between consecutive cube offsets.
    pub fn stride(&self) -> usize {
        self.cube_size - 2 * self.margin
    }

    /// Edge length of a cube after trimming `margin` from every face.
    pub fn trimmed_cube(&self) -> usize {
        self.cube_size - 2 * self.margin
    }

    /// Extent of the zero-padded volume per axis.
    pub fn padded_size(&self) -> [usize; 3] {
        let mut size = self.image_size;
        for axis in 0..3 {
            size[axis] += 2 * self.padding[axis];
        }
        size
    }

    /// Extent of the merged (padded minus margin) volume per axis.
    ///
    /// This is the accumulator shape the trimmed cubes re-tile exactly.
    pub fn merged_size(&self) -> [usize; 3] {
        let mut size = self.image_size;
        for axis in 0..3 {
            size[axis] += 2 * (self.padding[axis] - self.margin);
        }
        size
    }

    /// Sliding-window cube counts per axis (depth, height, width).
    pub fn grid(&self) -> [usize; 3] {
        let trimmed = self.trimmed_cube();
        let merged = self.merged_size();
        [
            merged[0] / trimmed,
            merged[1] / trimmed,
            merged[2] / trimmed,
        ]
    }

    /// Total sliding-window cubes per subject.
    pub fn patches_per_volume(&self) -> usize {
        let grid = self.grid();
        grid[0] * grid[1] * grid[2]
    }

    /// Non-overlapping cube counts per axis for training-mode tiling.
    ///
    /// Training mode uses stride = cube size and no padding, so every
    /// spatial dimension must be an exact multiple of the cube size.
    pub fn training_grid(&self, dims: [usize; 3]) -> Result<[usize; 3]> {
        let mut grid = [0usize; 3];
        for axis in 0..3 {
            if dims[axis] == 0 || dims[axis] % self.cube_size != 0 {
                return Err(PatchError::dimension_mismatch(format!(
                    "volume extent {} on axis {} is not an exact multiple of cube_size {}",
                    dims[axis], axis, self.cube_size
                )));
            }
            grid[axis] = dims[axis] / self.cube_size;
        }
        Ok(grid)
    }

    fn validate(&self) -> Result<()> {
        let stride = self.stride();
        for axis in 0..3 {
            if self.padding[axis] < self.margin {
                return Err(PatchError::invalid_configuration(format!(
                    "padding {} on axis {} is smaller than the margin {}",
                    self.padding[axis], axis, self.margin
                )));
            }
            let padded = self.image_size[axis] + 2 * self.padding[axis];
            if padded < self.cube_size || (padded - self.cube_size) % stride != 0 {
                return Err(PatchError::dimension_mismatch(format!(
                    "axis {}: padded extent {} does not tile exactly with cube_size {} and stride {}",
                    axis, padded, self.cube_size, stride
                )));
            }
        }
        Ok(())
    }
}

/// Smallest padding `p >= margin` such that `extent + 2p` holds a whole
/// number of stride steps plus one cube.
fn derive_padding(extent: usize, cube_size: usize, stride: usize, margin: usize) -> Result<usize> {
    let floor_pad = if cube_size > extent {
        (cube_size - extent + 1) / 2
    } else {
        0
    };
    let start = margin.max(floor_pad);
    for pad in start..=start + stride {
        let padded = extent + 2 * pad;
        if padded >= cube_size && (padded - cube_size) % stride == 0 {
            return Ok(pad);
        }
    }
    Err(PatchError::dimension_mismatch(format!(
        "axis extent {} cannot be tiled by cubes of {} at stride {} under symmetric padding",
        extent, cube_size, stride
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let geometry = PatchGeometry::default();
        assert_eq!(geometry.cube_size(), 64);
        assert_eq!(geometry.margin(), 3);
        assert_eq!(geometry.stride(), 58);
        assert_eq!(geometry.trimmed_cube(), 58);
        assert_eq!(geometry.padding(), [23, 17, 17]);
        assert_eq!(geometry.padded_size(), [238, 354, 354]);
        assert_eq!(geometry.merged_size(), [232, 348, 348]);
        assert_eq!(geometry.grid(), [4, 6, 6]);
        assert_eq!(geometry.patches_per_volume(), 144);
    }

    #[test]
    fn test_derived_padding_for_deep_volume() {
        // 256-deep volumes close with padding 20 on the depth axis.
        let geometry = PatchGeometry::new(64, 3, [256, 320, 320]).unwrap();
        assert_eq!(geometry.padding(), [20, 17, 17]);
        assert_eq!(geometry.grid(), [5, 6, 6]);
    }

    #[test]
    fn test_padding_override_validated() {
        let geometry = PatchGeometry::new(16, 2, [32, 44, 44]).unwrap();
        assert_eq!(geometry.padding(), [4, 4, 4]);
        assert_eq!(geometry.grid(), [3, 4, 4]);

        // A larger padding that still closes every axis is accepted.
        let widened = geometry.clone().with_padding([10, 10, 10]).unwrap();
        assert_eq!(widened.grid(), [4, 5, 5]);

        // One that does not close is rejected, not silently adjusted.
        assert!(geometry.with_padding([5, 4, 4]).is_err());
    }

    #[test]
    fn test_stale_padding_rejected() {
        // Padding 20 was pre-computed for 256-deep volumes; for 192-deep
        // volumes the depth axis no longer closes and must be rejected.
        let geometry = PatchGeometry::default();
        assert!(geometry.with_padding([20, 17, 17]).is_err());
    }

    #[test]
    fn test_padding_below_margin_rejected() {
        let geometry = PatchGeometry::new(16, 2, [32, 44, 44]).unwrap();
        assert!(matches!(
            geometry.with_padding([1, 4, 4]),
            Err(PatchError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_parity_mismatch() {
        // Odd extent with an even stride can never close symmetrically.
        assert!(PatchGeometry::new(16, 2, [33, 44, 44]).is_err());
    }

    #[test]
    fn test_degenerate_configurations() {
        assert!(PatchGeometry::new(0, 0, [32, 32, 32]).is_err());
        assert!(PatchGeometry::new(8, 4, [32, 32, 32]).is_err());
        assert!(PatchGeometry::new(8, 5, [32, 32, 32]).is_err());
        assert!(PatchGeometry::new(16, 2, [0, 44, 44]).is_err());
    }

    #[test]
    fn test_training_grid() {
        let geometry = PatchGeometry::default();
        assert_eq!(geometry.training_grid([192, 320, 320]).unwrap(), [3, 5, 5]);
        assert!(geometry.training_grid([192, 320, 300]).is_err());
        assert!(geometry.training_grid([0, 320, 320]).is_err());
    }

    #[test]
    fn test_small_extent_padded_up_to_cube() {
        // Extent below the cube size forces enough padding for one window.
        let geometry = PatchGeometry::new(16, 2, [10, 44, 44]).unwrap();
        assert!(geometry.padded_size()[0] >= 16);
        let trimmed = geometry.trimmed_cube();
        assert_eq!(geometry.merged_size()[0] % trimmed, 0);
    }
}
