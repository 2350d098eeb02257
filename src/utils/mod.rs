//! Utility helpers: dense solves and logging.

pub mod logging;
pub mod math;

pub use logging::{ProgressLog, ScopedTimer};
pub use math::{select_square, solve_dense};
