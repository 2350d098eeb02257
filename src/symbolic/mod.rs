//! Minimal symbolic algebra: expression trees, partial derivatives,
//! substitution, symbolic inversion, and compilation to numeric functions.
//!
//! This is not a general computer algebra system. Simplification is limited to
//! constant folding and neutral elements, which is enough for equations of
//! motion that are affine in the generalized accelerations.

mod compile;
mod expr;
mod matrix;
mod vector;

pub use compile::{CompiledExpr, CompiledMatrix};
pub use expr::{Expr, Symbol};
pub use matrix::{InversionMethod, SymMatrix};
pub use vector::{Dyadic, Vector};
