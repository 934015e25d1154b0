//! The core module
pub mod estimators;

use num_traits::Float;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The error type of this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter failed validation before any work was performed.
    #[error("invalid parameter: {what}")]
    InvalidParameter {
        /// Which parameter was rejected and why.
        what: &'static str,
    },
    /// Two collaborating values disagree on the number of dimensions.
    #[error("dimension mismatch: expected {expected} dimensions, found {found}")]
    DimensionMismatch {
        /// The number of dimensions the callee expected.
        expected: usize,
        /// The number of dimensions it was given.
        found: usize,
    },
}

/// Shorthand for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait which every integrand must implement.
pub trait Integrand<T>: Send + Sync {
    /// Calculates the value of the integrand at the point `x` of the
    /// integration region, which has as many coordinates as specified by `dim()`.
    fn call(&self, x: &[T]) -> T;

    /// Returns the number of dimensions of the integrand.
    fn dim(&self) -> usize;
}

/// A hyper-rectangular integration domain, immutable after construction.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Region<T> {
    lower: Vec<T>,
    upper: Vec<T>,
}

impl<T: Float> Region<T> {
    /// Constructs the region spanned by the per-dimension bounds `lower` and `upper`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the bounds are empty, of unequal length, or if any
    /// lower bound is not strictly below its upper bound.
    pub fn new(lower: Vec<T>, upper: Vec<T>) -> Result<Self> {
        if lower.is_empty() || lower.len() != upper.len() {
            return Err(Error::InvalidParameter {
                what: "region bounds must be non-empty and of equal length",
            });
        }

        if lower.iter().zip(upper.iter()).any(|(&l, &u)| !(l < u)) {
            return Err(Error::InvalidParameter {
                what: "each lower bound must be strictly below its upper bound",
            });
        }

        Ok(Self { lower, upper })
    }

    /// Returns the number of dimensions of the region.
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Returns the per-dimension lower bounds.
    pub fn lower(&self) -> &[T] {
        &self.lower
    }

    /// Returns the per-dimension upper bounds.
    pub fn upper(&self) -> &[T] {
        &self.upper
    }

    /// Returns the volume of the region, the product of its side lengths.
    pub fn volume(&self) -> T {
        self.lower
            .iter()
            .zip(self.upper.iter())
            .fold(T::one(), |volume, (&l, &u)| volume * (u - l))
    }
}
