//! URL model: turning raw input lines into scheme-qualified URLs.
//!
//! Pure string handling, no network I/O.

mod normalize;

pub use normalize::{normalize, NormalizeError, NormalizedUrl};
