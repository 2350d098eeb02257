use nalgebra::DMatrix;

use crate::{
    dynamics::Trajectory,
    error::{DynamicsError, Result},
    symbolic::{CompiledMatrix, Expr},
    system::System,
};

/// Symbolic quantities of interest compiled over the state and the system's
/// constants, for evaluation along a trajectory.
#[derive(Debug, Clone)]
pub struct Output {
    compiled: CompiledMatrix,
    state_len: usize,
    constant_values: Vec<f64>,
}

impl Output {
    pub fn new(exprs: &[Expr], system: &System) -> Result<Self> {
        let mut args = system.state_variables();
        let state_len = args.len();
        args.extend(system.constants().symbols());
        Ok(Self {
            compiled: CompiledMatrix::compile_column(exprs, &args)?,
            state_len,
            constant_values: system.constants().values(),
        })
    }

    pub fn len(&self) -> usize {
        self.compiled.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All outputs at one state.
    pub fn evaluate(&self, state: &[f64]) -> Result<Vec<f64>> {
        if state.len() != self.state_len {
            return Err(DynamicsError::DimensionMismatch {
                expected: self.state_len,
                found: state.len(),
            });
        }
        let mut args = Vec::with_capacity(state.len() + self.constant_values.len());
        args.extend_from_slice(state);
        args.extend_from_slice(&self.constant_values);
        Ok(self.compiled.evaluate_vector(&args)?.as_slice().to_vec())
    }

    /// Evaluates every output at every trajectory state: one row per sample.
    pub fn calc(&self, trajectory: &Trajectory) -> Result<DMatrix<f64>> {
        #[cfg(feature = "parallel")]
        let rows = {
            use rayon::prelude::*;
            trajectory
                .states
                .par_iter()
                .map(|state| self.evaluate(state))
                .collect::<Result<Vec<_>>>()?
        };
        #[cfg(not(feature = "parallel"))]
        let rows = trajectory
            .states
            .iter()
            .map(|state| self.evaluate(state))
            .collect::<Result<Vec<_>>>()?;

        Ok(DMatrix::from_fn(rows.len(), self.len(), |r, c| rows[r][c]))
    }
}
