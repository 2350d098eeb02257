//! Equations of motion: virtual-work projection, constraint handling,
//! assembly of the bordered system, numeric evaluation and integration.

pub mod assembly;
pub mod constraints;
pub mod evaluator;
pub mod generalize;
pub mod integrator;

pub use assembly::{AssembledSystem, EquationAssembler};
pub use constraints::{Activity, Constraint};
pub use evaluator::{
    ActiveSet, NumericSystem, PostInvertedStateSpace, PreInvertedStateSpace, StateSpace,
};
pub use generalize::generalize;
pub use integrator::{linspace, IntegrationFailure, Integrator, Trajectory};
