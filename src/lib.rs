//! symdyn: symbolic multibody equations of motion for Rust.
//!
//! Describe a mechanical system with generalized coordinates, particles,
//! rigid bodies, forces and holonomic constraints. The crate projects every
//! contribution onto the generalized velocities by virtual work, assembles the
//! Lagrange-multiplier system and compiles it into a state-derivative function
//! that an integrator can call at every step.
//!
//! ```no_run
//! use glam::DVec3;
//! use symdyn::{Integrator, Particle, SolverConfig, System, Vector};
//!
//! let mut system = System::new();
//! let (y, _, _) = system.differentiable("y")?.triple().ok_or("missing derivatives")?;
//! let m = system.constant("m", 1.0)?;
//! let g = system.constant("g", 9.81)?;
//! Particle::new(&mut system, "ball", Vector::along(DVec3::Y, &y), m.expr());
//! system.add_gravity(&Vector::along(DVec3::NEG_Y, &g.expr()));
//!
//! let space = system.assembler()?.post_invert(&SolverConfig::default())?;
//! let times = symdyn::linspace(0.0, 1.0, 11);
//! let trajectory = Integrator::new(1e-3, 1).integrate(&space, &[10.0, 0.0], &times)?;
//! assert_eq!(trajectory.len(), 11);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod output;
pub mod symbolic;
pub mod system;
pub mod utils;

pub use glam::{DMat3, DVec3};

pub use config::{Baumgarte, SolverConfig};
pub use core::{
    body::{Body, Particle},
    contributions::{Contribution, ContributionLedger},
    coordinates::{CoordinateRegistry, Differentiable},
    symbols::{ConstantTable, SymbolTable},
};
pub use dynamics::{
    assembly::{AssembledSystem, EquationAssembler},
    constraints::{Activity, Constraint},
    evaluator::{ActiveSet, PostInvertedStateSpace, PreInvertedStateSpace, StateSpace},
    integrator::{linspace, IntegrationFailure, Integrator, Trajectory},
};
pub use error::{CompileError, ConfigError, DynamicsError, Result};
pub use output::Output;
pub use symbolic::{Dyadic, Expr, InversionMethod, SymMatrix, Symbol, Vector};
pub use system::System;
