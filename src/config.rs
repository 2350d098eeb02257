//! Global configuration constants and solver settings.

use serde::{Deserialize, Serialize};

use crate::symbolic::InversionMethod;

/// Highest derivative order tracked for a generalized coordinate (acceleration).
pub const MAX_DERIVATIVE_ORDER: usize = 2;

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f64 = 1.0e-3;

/// Default number of integrator substeps per timestep.
pub const DEFAULT_SUBSTEPS: u32 = 1;

/// Number of state-derivative evaluations between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Relative pivot magnitude below which a numeric system is treated as singular.
pub const DEFAULT_SINGULAR_TOLERANCE: f64 = 1.0e-12;

/// Name prefix of the scratch symbols created by scalar caching.
pub const SCALAR_CACHE_PREFIX: &str = "z";

/// Settings that control how assembled equations are compiled and solved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Substitute constant values before compiling instead of passing them as arguments.
    pub presolve_constants: bool,
    /// Symbolic inversion algorithm used by pre-inverted systems.
    pub inversion: InversionMethod,
    /// Replace nonzero matrix entries with scratch symbols before symbolic inversion.
    pub cache_scalars: bool,
    /// See [`DEFAULT_SINGULAR_TOLERANCE`].
    pub singular_tolerance: f64,
    /// See [`DEFAULT_PROGRESS_INTERVAL`]. Zero disables progress logging.
    pub progress_interval: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            presolve_constants: false,
            inversion: InversionMethod::GaussJordan,
            cache_scalars: false,
            singular_tolerance: DEFAULT_SINGULAR_TOLERANCE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl SolverConfig {
    pub fn with_presolved_constants(mut self, enabled: bool) -> Self {
        self.presolve_constants = enabled;
        self
    }

    pub fn with_inversion(mut self, method: InversionMethod) -> Self {
        self.inversion = method;
        self
    }

    pub fn with_scalar_caching(mut self, enabled: bool) -> Self {
        self.cache_scalars = enabled;
        self
    }

    pub fn with_singular_tolerance(mut self, tolerance: f64) -> Self {
        self.singular_tolerance = tolerance;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// Baumgarte constraint stabilization gains.
///
/// Constraint rows are solved as `eq_dd + 2·alpha·eq_d + beta²·eq = 0`, which
/// pulls drifted constraint violations back toward zero during integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baumgarte {
    pub alpha: f64,
    pub beta: f64,
}

impl Baumgarte {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Correction subtracted from a constraint row of the right-hand side.
    pub fn correction(&self, value: f64, rate: f64) -> f64 {
        2.0 * self.alpha * rate + self.beta * self.beta * value
    }
}
