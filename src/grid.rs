//! The adaptive grid learned by the VEGAS training phase.

use crate::core::Region;
use num_traits::{Float, FromPrimitive};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Advances the bin index vector `indices` to the next combination in
/// little-endian mixed-radix order: the least significant component is
/// incremented modulo `limit`, and a wrap carries into the next component.
///
/// Starting from the zero vector, `limit.pow(indices.len())` calls visit every
/// combination exactly once and end back on the zero vector.
pub fn advance(indices: &mut [usize], limit: usize) {
    for index in indices.iter_mut() {
        *index += 1;

        if *index < limit {
            return;
        }

        *index = 0;
    }
}

/// The per-dimension bin edges and bin weights of a (possibly trained) grid.
///
/// Each dimension of the unit hypercube is partitioned into `bins` contiguous
/// sub-intervals. The edge table stores `bins + 1` values per dimension with
/// an explicit leading zero and a final edge of one, so the lower edge of bin
/// $i$ is always `edges[d][i]` and its upper edge `edges[d][i + 1]`. Each
/// weight column is non-negative and sums to one; it is the relative width
/// currently assigned to each bin along that axis.
///
/// The tables are stored dimension-major so that every reduction performed
/// during a resize runs along the bin axis of a single dimension.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Grid<T> {
    bins: usize,
    edges: Vec<Vec<T>>,
    weights: Vec<Vec<T>>,
}

impl<T: AddAssign + Float + FromPrimitive> Grid<T> {
    /// Creates a uniform grid with `bins` equal-width bins in each of `dim` dimensions.
    pub fn uniform(bins: usize, dim: usize) -> Self {
        debug_assert!(bins > 0 && dim > 0);

        let width = T::from_usize(bins).unwrap().recip();
        let edges = (0..=bins)
            .map(|i| T::from_usize(i).unwrap() * width)
            .collect::<Vec<_>>();

        Self {
            bins,
            edges: vec![edges; dim],
            weights: vec![vec![width; bins]; dim],
        }
    }

    /// Returns the number of bins per dimension.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Returns the number of dimensions of the grid.
    pub fn dim(&self) -> usize {
        self.edges.len()
    }

    /// Returns the total number of cells, `bins` to the power of `dim`.
    pub fn total_cells(&self) -> usize {
        self.bins.pow(self.dim() as u32)
    }

    /// Returns the edge sequence of the given dimension, starting with the
    /// explicit leading zero and ending on one.
    pub fn edges(&self, dim: usize) -> &[T] {
        &self.edges[dim]
    }

    /// Returns whether the edge and weight tables have the shape promised by
    /// `bins` and agree on the number of dimensions.
    ///
    /// A grid produced by training is always well-formed; one deserialized
    /// from external data may not be, so [`crate::integrators::vegas::integrate`]
    /// rejects malformed grids before sampling.
    pub fn is_well_formed(&self) -> bool {
        self.bins > 0
            && !self.edges.is_empty()
            && self.edges.len() == self.weights.len()
            && self.edges.iter().all(|edges| edges.len() == self.bins + 1)
            && self.weights.iter().all(|weights| weights.len() == self.bins)
    }

    /// Returns the widths of the bins along the given dimension. Useful for
    /// inspecting or plotting what the training phase has learned.
    pub fn bin_widths(&self, dim: usize) -> Vec<T> {
        self.edges[dim]
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }

    /// Maps the bin index vector `indices` to the cell of `region` it selects,
    /// writing the per-dimension bounds into `lower` and `upper`.
    ///
    /// As `indices` ranges over all combinations, the returned cells tile the
    /// region exactly, with no gaps or overlaps.
    pub fn subregion(&self, region: &Region<T>, indices: &[usize], lower: &mut [T], upper: &mut [T]) {
        debug_assert_eq!(indices.len(), self.dim());

        for d in 0..self.dim() {
            let range = region.upper()[d] - region.lower()[d];

            lower[d] = region.lower()[d] + self.edges[d][indices[d]] * range;
            upper[d] = region.lower()[d] + self.edges[d][indices[d] + 1] * range;
        }
    }

    /// Replaces the bin edges and weights with ones adapted to the importance
    /// `distribution` accumulated over one training epoch.
    ///
    /// Each dimension is treated independently. A column whose mean is exactly
    /// zero has its mean replaced by one to keep the reweighting well-defined;
    /// near-zero but non-zero columns are deliberately not guarded and can
    /// still produce ill-conditioned weights.
    pub(crate) fn resize(&mut self, distribution: &[Vec<T>], alpha: T) {
        for (d, column) in distribution.iter().enumerate() {
            let mut mean = column.iter().fold(T::zero(), |sum, &x| sum + x)
                / T::from_usize(self.bins).unwrap();

            if mean == T::zero() {
                mean = T::one();
            }

            let mut combined = column
                .iter()
                .map(|&x| (alpha * mean + x).recip())
                .collect::<Vec<_>>();
            normalize(&mut combined);

            for (weight, &old) in combined.iter_mut().zip(self.weights[d].iter()) {
                *weight = *weight * old;
            }
            normalize(&mut combined);

            let mut edge = T::zero();
            for (i, &weight) in combined.iter().enumerate() {
                edge += weight;
                self.edges[d][i + 1] = edge;
            }

            self.weights[d] = combined;
        }
    }
}

/// Rescales `column` in place so that it sums to one.
fn normalize<T: Float>(column: &mut [T]) {
    let sum = column.iter().fold(T::zero(), |sum, &x| sum + x);

    for x in column.iter_mut() {
        *x = *x / sum;
    }
}
