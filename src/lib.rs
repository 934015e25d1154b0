#![warn(clippy::all, clippy::cargo, clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

//! The crate `vegars` implements the [VEGAS] adaptive importance-sampling
//! algorithm for approximating definite multi-dimensional [integrals]. The name
//! is a contraction of VEGAS and Rust.
//!
//! # Features
//!
//! This library was designed with the following features as essential in mind:
//!
//! - **Generic numeric type**. The numeric type used in this library is not fixed, but instead a
//! generic parameter, so that the integration routines can be used with either `f32`, `f64`, or a
//! custom numeric type that implements the `Float` trait from the `num-traits` crate.
//! - **Generic random number generator**. Every random number generator that implements the `Rng`
//! trait from the `rand` crate can be used. The generator is injected into every sampling entry
//! point, so nothing in this crate owns or seeds ambient random state.
//! - **Reproducibility**. As far as the numeric type allows this, all results produced with
//! `vegars` are completely reproducible, in the sense that the results only depend on the used
//! random number generator and the chosen seed. Note that grid training and integration consume
//! the same generator sequentially, so the draws made by one phase shift the sequence seen by the
//! other.
//! - **Non-finite number filtering**. Non-finite numbers such as `inf` or `nan`, which integrands
//! sometimes produce in extreme regions of their integration domain due to finite numerical
//! precision, are filtered out. When this happens the result of the corresponding call is treated
//! as zero to not destroy the integration and a counter is increased that keeps track of how often
//! this happened.
//! - **Persistent grids**. A trained grid is an explicit value, produced by training and consumed
//! by integration, and it serializes with `serde`, so it can be saved and reused across runs.
//!
//! # What is ...?
//!
//! This section is a dictionary of terms that are used in this documentation. Given a
//! hyper-rectangular region $\Omega \subset \mathbb{R}^d$ we approximate
//!
//! $$ I = \int_\Omega \mathrm{d}^d x \, f(x) $$
//!
//! in two phases. The *training* phase learns, per dimension, where to place non-uniform bin
//! edges so that regions where $|f|$ is large are covered by narrower bins. The *integration*
//! phase then walks every cell of the frozen grid, samples the integrand inside it, and combines
//! the per-cell estimates into a stratified estimate of $I$ together with a standard error. We
//! use the following terms:
//!
//! - the *integrand* is the function $f$ that is being integrated. We assume that evaluating it
//! is the expensive operation;
//! - the number of *dimensions*, $d$, is the number of dimensions of the integration domain;
//! - a *bin* is one of the per-dimension sub-intervals the unit interval is partitioned into, and
//! a *cell* is the product of one bin per dimension;
//! - an *epoch* is one full pass over all cells during training, followed by one grid resize.
//!
//! [VEGAS]: https://en.wikipedia.org/wiki/VEGAS_algorithm
//! [integrals]: https://en.wikipedia.org/wiki/Integral

pub mod callbacks;
pub mod core;
pub mod grid;
pub mod integrators;

pub use crate::core::*;
