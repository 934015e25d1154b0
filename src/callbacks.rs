//! Implementation of different callback functions.
use std::fmt::Display;

/// Trait for implementing callbacks for iterative MC algorithms
pub trait Callback<E> {
    /// This method is called after each successfully finished epoch and may print information
    /// about it.
    fn print(&self, reports: &[E]);
}

/// A callback function that does nothing
pub struct SinkCallback {}

impl<E> Callback<E> for SinkCallback {
    fn print(&self, _: &[E]) {}
}

/// A callback function that prints the result of each individual epoch
pub struct SimpleCallback {}

impl<E: Display> Callback<E> for SimpleCallback {
    fn print(&self, reports: &[E]) {
        // Make sure that there is at least one report, otherwise do nothing.
        if let Some(report) = reports.last() {
            println!("{}", report);
        }
    }
}
