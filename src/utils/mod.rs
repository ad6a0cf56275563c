//! The `utils` module provides shared utilities used across the `reelmq`
//! application: the crate-wide error type and the logging initializer.

pub mod error;
pub mod logging;
