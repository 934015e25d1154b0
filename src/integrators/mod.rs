//! The different integrators provided by this crate.
pub mod vegas;
