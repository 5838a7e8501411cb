//! Mini-batch grouping over a patch index.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use voxsr_core::error::{PatchError, Result};

use crate::index::PatchIndex;

/// A finite, single-pass stream of normalized patch-pair mini-batches.
///
/// Yields `(low_res, high_res)` float tensors shaped
/// `(k, 1, cube, cube, cube)` where `k` is the configured batch size,
/// except for a possibly smaller final remainder batch. The traversal
/// order is fixed at construction; restart by recreating the loader.
pub struct PatchLoader<B: Backend> {
    index: PatchIndex<B>,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<B: Backend> PatchLoader<B> {
    /// Build a loader over `order`, validating the batch size and that
    /// every listed index is in range.
    pub fn new(index: PatchIndex<B>, order: Vec<usize>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(PatchError::invalid_configuration(
                "loader batch size must be positive",
            ));
        }
        let len = index.len();
        if let Some(&out) = order.iter().find(|&&i| i >= len) {
            return Err(PatchError::IndexOutOfBounds { index: out, len });
        }
        Ok(Self {
            index,
            order,
            batch_size,
            cursor: 0,
        })
    }

    /// Total number of patch pairs the loader will yield.
    pub fn num_patches(&self) -> usize {
        self.order.len()
    }

    /// Number of mini-batches, counting the final remainder.
    pub fn num_batches(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }

    /// The traversal order over the underlying patch index.
    pub fn order(&self) -> &[usize] {
        &self.order
    }
}

impl<B: Backend> Iterator for PatchLoader<B> {
    type Item = (Tensor<B, 5>, Tensor<B, 5>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let mut low_res = Vec::with_capacity(end - self.cursor);
        let mut high_res = Vec::with_capacity(end - self.cursor);
        for &i in &self.order[self.cursor..end] {
            let (lr, hr) = self.index.fetch(i);
            low_res.push(lr.unsqueeze::<5>());
            high_res.push(hr.unsqueeze::<5>());
        }
        self.cursor = end;
        Some((Tensor::cat(low_res, 0), Tensor::cat(high_res, 0)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.order.len() - self.cursor).div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl<B: Backend> ExactSizeIterator for PatchLoader<B> {}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Int, Shape, TensorData};
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    fn index_of(n: usize, cube: usize) -> PatchIndex<B> {
        let device = Default::default();
        let total = n * cube * cube * cube;
        let values: Vec<i64> = (0..total as i64).map(|v| v % 4096).collect();
        let data = TensorData::new(values, Shape::new([n, cube, cube, cube]));
        let stack = Tensor::<B, 4, Int>::from_data(data, &device);
        PatchIndex::new(stack.clone(), stack).unwrap()
    }

    #[test]
    fn test_batching_with_remainder() {
        let loader = PatchLoader::new(index_of(5, 4), vec![0, 1, 2, 3, 4], 2).unwrap();
        assert_eq!(loader.num_patches(), 5);
        assert_eq!(loader.num_batches(), 3);
        assert_eq!(loader.len(), 3);

        let shapes: Vec<[usize; 5]> = loader.map(|(lr, _)| lr.dims()).collect();
        assert_eq!(
            shapes,
            vec![[2, 1, 4, 4, 4], [2, 1, 4, 4, 4], [1, 1, 4, 4, 4]]
        );
    }

    #[test]
    fn test_order_respected() {
        let mut loader = PatchLoader::new(index_of(3, 4), vec![2, 0], 2).unwrap();
        let (lr, _) = loader.next().unwrap();
        let values = lr.into_data();
        let values = values.as_slice::<f32>().unwrap();
        // First entry is patch 2 (ramp offset 128), second is patch 0.
        assert!((values[0] - 128.0 / 4095.0).abs() < 1e-7);
        assert_eq!(values[64], 0.0);
        assert!(loader.next().is_none());
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            PatchLoader::new(index_of(3, 4), vec![0], 0),
            Err(PatchError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            PatchLoader::new(index_of(3, 4), vec![0, 3], 2),
            Err(PatchError::IndexOutOfBounds { index: 3, len: 3 })
        ));
    }
}
