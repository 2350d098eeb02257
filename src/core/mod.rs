//! Model bookkeeping: symbols, generalized coordinates, force contributions and bodies.

pub mod body;
pub mod contributions;
pub mod coordinates;
pub mod symbols;

pub use body::{Body, Particle};
pub use contributions::{Contribution, ContributionLedger, Spring};
pub use coordinates::{CoordinateRegistry, Differentiable};
pub use symbols::{ConstantTable, SymbolTable};
