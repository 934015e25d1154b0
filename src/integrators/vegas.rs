//! The VEGAS integrator: adaptive grid training and stratified evaluation.
//!
//! Integration happens in two phases. [`train`] runs a configurable number of
//! epochs in which every cell of the grid is sampled, the absolute importance
//! of each bin is accumulated, and the bin edges are moved so that important
//! bins become narrower. The trained [`Grid`] is returned as a value and is
//! the explicit input of [`integrate`], which repeats the same cell
//! enumeration on the frozen grid to produce an estimate and its standard
//! error.

use crate::callbacks::Callback;
use crate::core::estimators::{BasicEstimators, Estimators};
use crate::core::{Error, Integrand, Region, Result};
use crate::grid::{advance, Grid};

use num_traits::{Float, FromPrimitive};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::AddAssign;

/// Parameters steering the grid training phase.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TrainingParameters<T> {
    bins: usize,
    epochs: usize,
    calls_per_epoch: usize,
    alpha: T,
}

impl<T> TrainingParameters<T> {
    /// Creates training parameters with `bins` bins per dimension, `epochs` training epochs,
    /// `calls_per_epoch` integrand evaluations per epoch, and the regularization strength
    /// `alpha`.
    pub const fn new(bins: usize, epochs: usize, calls_per_epoch: usize, alpha: T) -> Self {
        Self {
            bins,
            epochs,
            calls_per_epoch,
            alpha,
        }
    }
}

impl<T: Float> Default for TrainingParameters<T> {
    fn default() -> Self {
        Self::new(50, 100, 2500, T::one())
    }
}

/// Parameters steering the integration phase.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IntegrationParameters {
    times: usize,
    calls: usize,
}

impl IntegrationParameters {
    /// Creates integration parameters performing `times` independent evaluations of the
    /// integral with `calls` integrand evaluations each.
    pub const fn new(times: usize, calls: usize) -> Self {
        Self { times, calls }
    }
}

impl Default for IntegrationParameters {
    fn default() -> Self {
        Self::new(20, 10_000)
    }
}

/// Summary of one finished training epoch, handed to the callback.
#[derive(Clone, Debug)]
pub struct EpochReport<T> {
    epoch: usize,
    calls: usize,
    importance: T,
    non_finite_calls: usize,
}

impl<T: Copy> EpochReport<T> {
    /// Returns the zero-based index of the epoch.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Returns the number of integrand evaluations made during the epoch.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Returns the total importance accumulated over all cells of the epoch.
    pub fn importance(&self) -> T {
        self.importance
    }

    /// Returns how many integrand evaluations returned a non-finite value.
    pub fn non_finite_calls(&self) -> usize {
        self.non_finite_calls
    }
}

impl<T: Copy + Display> Display for EpochReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epoch {} finished. N={} importance={}",
            self.epoch, self.calls, self.importance
        )
    }
}

/// Estimators for an integration performed by [`integrate`].
///
/// The mean and the variance are those of the `times` independent evaluations
/// of the integral; the variance carries no Bessel correction, so
/// [`BasicEstimators::std`] is the dispersion-based standard error of the
/// estimate.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VegasEstimators<T> {
    sum: T,
    sumsq: T,
    times: usize,
    calls: usize,
    non_finite_calls: usize,
    non_zero_calls: usize,
}

impl<T: Float> Default for VegasEstimators<T> {
    fn default() -> Self {
        Self {
            sum: T::zero(),
            sumsq: T::zero(),
            times: 0,
            calls: 0,
            non_finite_calls: 0,
            non_zero_calls: 0,
        }
    }
}

impl<T: Float> VegasEstimators<T> {
    /// Returns the number of independent evaluations of the integral.
    pub fn times(&self) -> usize {
        self.times
    }
}

impl<T> BasicEstimators<T> for VegasEstimators<T>
where
    T: Float + FromPrimitive,
{
    fn mean(&self) -> T {
        self.sum / T::from_usize(self.times).unwrap()
    }

    fn var(&self) -> T {
        let times = T::from_usize(self.times).unwrap();
        (self.sumsq - self.sum * self.sum / times) / times
    }

    fn std(&self) -> T {
        let var = self.var();

        // cancellation in `var` can leave a tiny negative residue
        if var > T::zero() {
            var.sqrt()
        } else {
            T::zero()
        }
    }
}

impl<T> Estimators<T> for VegasEstimators<T>
where
    T: Float + FromPrimitive,
{
    fn calls(&self) -> usize {
        self.calls
    }

    fn non_finite_calls(&self) -> usize {
        self.non_finite_calls
    }

    fn non_zero_calls(&self) -> usize {
        self.non_zero_calls
    }
}

/// During training the per-cell sample count is capped at two, no matter how
/// large `calls_per_epoch` is.
fn training_calls_per_cell(calls_per_epoch: usize, total_cells: usize) -> usize {
    (calls_per_epoch / total_cells).min(2)
}

/// During integration the per-cell sample count is floored at two. The
/// asymmetry with [`training_calls_per_cell`] is deliberate.
fn integration_calls_per_cell(calls: usize, total_cells: usize) -> usize {
    (calls / total_cells).max(2)
}

/// Samples a point uniformly inside the cell spanned by `lower` and `upper`.
fn sample_point<T, R>(rng: &mut R, lower: &[T], upper: &[T], x: &mut [T])
where
    T: Float,
    R: Rng,
    Standard: Distribution<T>,
{
    for (value, (&l, &u)) in x.iter_mut().zip(lower.iter().zip(upper.iter())) {
        *value = l + rng.gen::<T>() * (u - l);
    }
}

/// Returns the volume of the cell spanned by `lower` and `upper`.
fn cell_volume<T: Float>(lower: &[T], upper: &[T]) -> T {
    lower
        .iter()
        .zip(upper.iter())
        .fold(T::one(), |volume, (&l, &u)| volume * (u - l))
}

/// Trains a grid adapted to the integrand over the given region.
///
/// Runs `params.epochs` training epochs. In each epoch every cell of the grid
/// is visited in enumeration order, `training_calls_per_cell` points are
/// sampled uniformly inside it, and the cell's mean absolute importance is
/// projected onto the selected bin of every dimension. The epoch ends with a
/// resize of the bin edges towards the accumulated importance. After each
/// epoch `callback` is invoked with the reports of all finished epochs.
///
/// The returned grid is the explicit input of [`integrate`]; with zero epochs
/// it is simply the uniform grid.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `params.alpha` is not strictly
/// greater than the machine epsilon of `T` or if `params.bins` is zero, and
/// [`Error::DimensionMismatch`] if the integrand and the region disagree on
/// the number of dimensions. Validation happens before any sampling, so a
/// rejected call consumes no random numbers.
pub fn train<T, R, I>(
    integrand: &I,
    region: &Region<T>,
    rng: &mut R,
    callback: &impl Callback<EpochReport<T>>,
    params: &TrainingParameters<T>,
) -> Result<Grid<T>>
where
    I: Integrand<T>,
    T: AddAssign + Float + FromPrimitive,
    R: Rng,
    Standard: Distribution<T>,
{
    if params.alpha <= T::epsilon() {
        return Err(Error::InvalidParameter {
            what: "alpha must be strictly greater than machine epsilon",
        });
    }

    if params.bins == 0 {
        return Err(Error::InvalidParameter {
            what: "at least one bin per dimension is required",
        });
    }

    if integrand.dim() != region.dim() {
        return Err(Error::DimensionMismatch {
            expected: region.dim(),
            found: integrand.dim(),
        });
    }

    let dim = region.dim();
    let mut grid = Grid::uniform(params.bins, dim);
    let total_cells = grid.total_cells();
    let calls_per_cell = training_calls_per_cell(params.calls_per_epoch, total_cells);
    let calls_per_cell_t = T::from_usize(calls_per_cell).unwrap();

    // buffers reused across all cells so that no allocations happen per call
    let mut distribution = vec![vec![T::zero(); params.bins]; dim];
    let mut indices = vec![0; dim];
    let mut lower = vec![T::zero(); dim];
    let mut upper = vec![T::zero(); dim];
    let mut x = vec![T::zero(); dim];
    let mut reports = Vec::with_capacity(params.epochs);

    for epoch in 0..params.epochs {
        for column in &mut distribution {
            for value in column.iter_mut() {
                *value = T::zero();
            }
        }
        for index in indices.iter_mut() {
            *index = 0;
        }

        let mut epoch_importance = T::zero();
        let mut non_finite_calls = 0;

        for _ in 0..total_cells {
            grid.subregion(region, &indices, &mut lower, &mut upper);
            let volume = cell_volume(&lower, &upper);

            let mut mean_importance = T::zero();

            for _ in 0..calls_per_cell {
                sample_point(rng, &lower, &upper, &mut x);
                let value = integrand.call(&x);

                if value.is_finite() {
                    mean_importance += volume * value.abs() / calls_per_cell_t;
                } else {
                    non_finite_calls += 1;
                }
            }

            // the same scalar is projected onto the selected bin of every axis
            for d in 0..dim {
                distribution[d][indices[d]] += mean_importance;
            }

            epoch_importance += mean_importance;
            advance(&mut indices, params.bins);
        }

        grid.resize(&distribution, params.alpha);

        reports.push(EpochReport {
            epoch,
            calls: total_cells * calls_per_cell,
            importance: epoch_importance,
            non_finite_calls,
        });
        callback.print(&reports);
    }

    Ok(grid)
}

/// Integrates the integrand over the region using a trained (frozen) grid.
///
/// Performs `params.times` independent evaluations of the integral. Each
/// evaluation visits every cell of the grid in enumeration order, samples
/// `integration_calls_per_cell` points inside it, and accumulates the
/// volume-weighted signed integrand values. The result holds the mean of the
/// evaluations and their population variance; its standard deviation is the
/// standard error of the estimate.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `params.times` or `params.calls` is
/// zero or if the grid is not [well-formed](Grid::is_well_formed), and
/// [`Error::DimensionMismatch`] if the grid, the region, and the integrand
/// disagree on the number of dimensions. Validation happens before any
/// sampling, so a rejected call consumes no random numbers.
pub fn integrate<T, R, I>(
    integrand: &I,
    region: &Region<T>,
    grid: &Grid<T>,
    rng: &mut R,
    params: &IntegrationParameters,
) -> Result<VegasEstimators<T>>
where
    I: Integrand<T>,
    T: AddAssign + Float + FromPrimitive,
    R: Rng,
    Standard: Distribution<T>,
{
    if params.times == 0 {
        return Err(Error::InvalidParameter {
            what: "the number of evaluations of the integral must be positive",
        });
    }

    if params.calls == 0 {
        return Err(Error::InvalidParameter {
            what: "the number of integrand calls must be positive",
        });
    }

    // a grid loaded from external data can have inconsistent tables
    if !grid.is_well_formed() {
        return Err(Error::InvalidParameter {
            what: "the grid's edge and weight tables are malformed",
        });
    }

    if grid.dim() != region.dim() {
        return Err(Error::DimensionMismatch {
            expected: region.dim(),
            found: grid.dim(),
        });
    }

    if integrand.dim() != region.dim() {
        return Err(Error::DimensionMismatch {
            expected: region.dim(),
            found: integrand.dim(),
        });
    }

    let dim = region.dim();
    let total_cells = grid.total_cells();
    let calls_per_cell = integration_calls_per_cell(params.calls, total_cells);
    let calls_per_cell_t = T::from_usize(calls_per_cell).unwrap();

    let mut estimators = VegasEstimators::default();
    let mut indices = vec![0; dim];
    let mut lower = vec![T::zero(); dim];
    let mut upper = vec![T::zero(); dim];
    let mut x = vec![T::zero(); dim];

    for _ in 0..params.times {
        for index in indices.iter_mut() {
            *index = 0;
        }

        let mut integral = T::zero();

        for _ in 0..total_cells {
            grid.subregion(region, &indices, &mut lower, &mut upper);
            let volume = cell_volume(&lower, &upper);

            let mut little_integral = T::zero();

            for _ in 0..calls_per_cell {
                sample_point(rng, &lower, &upper, &mut x);
                let value = integrand.call(&x);

                estimators.calls += 1;

                if value != T::zero() {
                    estimators.non_zero_calls += 1;

                    if value.is_finite() {
                        little_integral += volume * value / calls_per_cell_t;
                    } else {
                        estimators.non_finite_calls += 1;
                    }
                }
            }

            integral += little_integral;
            advance(&mut indices, grid.bins());
        }

        estimators.sum += integral;
        estimators.sumsq += integral * integral;
        estimators.times += 1;
    }

    Ok(estimators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::SinkCallback;
    use rand_pcg::Pcg64;

    struct Unit;

    impl Integrand<f64> for Unit {
        fn call(&self, _: &[f64]) -> f64 {
            1.0
        }

        fn dim(&self) -> usize {
            2
        }
    }

    fn rng() -> Pcg64 {
        Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96)
    }

    #[test]
    fn training_caps_calls_per_cell() {
        assert_eq!(training_calls_per_cell(2500, 2500), 1);
        assert_eq!(training_calls_per_cell(5000, 2500), 2);
        assert_eq!(training_calls_per_cell(1_000_000, 2500), 2);
        assert_eq!(training_calls_per_cell(100, 2500), 0);
    }

    #[test]
    fn integration_floors_calls_per_cell() {
        assert_eq!(integration_calls_per_cell(10_000, 2500), 4);
        assert_eq!(integration_calls_per_cell(2500, 2500), 2);
        assert_eq!(integration_calls_per_cell(100, 2500), 2);
    }

    #[test]
    fn train_rejects_tiny_alpha() {
        let region = Region::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let params = TrainingParameters::new(10, 1, 100, f64::EPSILON);

        let result = train(&Unit, &region, &mut rng(), &SinkCallback {}, &params);

        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn train_rejects_zero_bins() {
        let region = Region::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let params = TrainingParameters::new(0, 1, 100, 1.0);

        let result = train(&Unit, &region, &mut rng(), &SinkCallback {}, &params);

        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn train_rejects_dimension_mismatch() {
        let region = Region::new(vec![0.0], vec![1.0]).unwrap();
        let params = TrainingParameters::default();

        let result = train(&Unit, &region, &mut rng(), &SinkCallback {}, &params);

        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn integrate_rejects_zero_times() {
        let region = Region::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let grid = Grid::uniform(4, 2);
        let params = IntegrationParameters::new(0, 100);

        let result = integrate(&Unit, &region, &grid, &mut rng(), &params);

        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn integrate_rejects_zero_calls() {
        let region = Region::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let grid = Grid::uniform(4, 2);
        let params = IntegrationParameters::new(10, 0);

        let result = integrate(&Unit, &region, &grid, &mut rng(), &params);

        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn integrate_rejects_malformed_grid() {
        let region = Region::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        // a hand-edited grid file declaring zero bins must not reach the
        // per-cell call computation
        let grid: Grid<f64> =
            serde_json::from_str(r#"{"bins":0,"edges":[[0.0],[0.0]],"weights":[[],[]]}"#)
                .unwrap();
        let params = IntegrationParameters::default();

        let result = integrate(&Unit, &region, &grid, &mut rng(), &params);

        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn integrate_rejects_foreign_grid() {
        let region = Region::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let grid = Grid::uniform(4, 3);
        let params = IntegrationParameters::default();

        let result = integrate(&Unit, &region, &grid, &mut rng(), &params);

        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn zero_epochs_return_the_uniform_grid() {
        let region = Region::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let params = TrainingParameters::new(8, 0, 100, 1.0);

        let grid = train(&Unit, &region, &mut rng(), &SinkCallback {}, &params).unwrap();

        assert_eq!(grid, Grid::uniform(8, 2));
    }

    #[test]
    fn rejected_calls_consume_no_random_numbers() {
        let region = Region::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let params = TrainingParameters::new(10, 1, 100, 0.0);

        let mut generator = rng();
        let _ = train(&Unit, &region, &mut generator, &SinkCallback {}, &params);

        assert_eq!(
            serde_json::to_string(&generator).unwrap(),
            serde_json::to_string(&rng()).unwrap()
        );
    }
}
