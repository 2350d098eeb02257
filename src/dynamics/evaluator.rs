use nalgebra::{DMatrix, DVector};

use crate::{
    config::{Baumgarte, SolverConfig},
    error::{DynamicsError, Result},
    symbolic::{CompiledExpr, CompiledMatrix},
    utils::{
        logging::ProgressLog,
        math::{select_square, solve_dense},
    },
};

/// First-order state-derivative function consumed by an integrator.
///
/// The state is `[positions; velocities]` in registry order and the
/// derivative is `[velocities; accelerations]`.
pub trait StateSpace: Send + Sync {
    fn state_len(&self) -> usize;

    /// Constraint activity at `state`, or `None` when nothing can toggle.
    ///
    /// Integrators call this once per step and pass the result to every
    /// stage so that activity stays frozen within a step.
    fn active_set(&self, _state: &[f64]) -> Result<Option<ActiveSet>> {
        Ok(None)
    }

    /// Writes the state derivative into `out`. With `active` set to `None`
    /// activity is decided from `state` itself.
    fn evaluate(
        &self,
        state: &[f64],
        time: f64,
        active: Option<&ActiveSet>,
        out: &mut [f64],
    ) -> Result<()>;

    fn derivative(&self, state: &[f64], time: f64) -> Result<Vec<f64>> {
        let mut out = vec![0.0; self.state_len()];
        self.evaluate(state, time, None, &mut out)?;
        Ok(out)
    }
}

/// Per-constraint activity decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSet {
    flags: Vec<bool>,
}

impl ActiveSet {
    pub fn new(flags: Vec<bool>) -> Self {
        Self { flags }
    }

    pub fn all(count: usize) -> Self {
        Self::new(vec![true; count])
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledActivity {
    Static(bool),
    Predicate(CompiledExpr),
}

/// Compiled pieces of a post-inverted system.
#[derive(Debug, Clone)]
pub(crate) struct CompiledSystem {
    pub a: CompiledMatrix,
    pub b: CompiledMatrix,
    pub eq: CompiledMatrix,
    pub eq_d: CompiledMatrix,
    pub activity: Vec<CompiledActivity>,
}

/// Numeric system reduced to the active rows, as handed to the linear solve.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSystem {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
    /// Rows of the full bordered system kept in `a` and `b`.
    pub active_rows: Vec<usize>,
}

fn check_len(expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(DynamicsError::DimensionMismatch { expected, found })
    }
}

/// State space that evaluates and solves the bordered system at every call.
#[derive(Debug, Clone)]
pub struct PostInvertedStateSpace {
    dofs: usize,
    state_len: usize,
    constant_values: Vec<f64>,
    compiled: CompiledSystem,
    stabilization: Option<Baumgarte>,
    singular_tolerance: f64,
    progress: ProgressLog,
}

impl PostInvertedStateSpace {
    pub(crate) fn new(
        dofs: usize,
        state_len: usize,
        constant_values: Vec<f64>,
        compiled: CompiledSystem,
        config: &SolverConfig,
    ) -> Self {
        Self {
            dofs,
            state_len,
            constant_values,
            compiled,
            stabilization: None,
            singular_tolerance: config.singular_tolerance,
            progress: ProgressLog::new(config.progress_interval),
        }
    }

    /// Enables Baumgarte stabilization on every constraint row.
    pub fn with_stabilization(mut self, gains: Baumgarte) -> Self {
        self.stabilization = Some(gains);
        self
    }

    pub fn stabilization(&self) -> Option<Baumgarte> {
        self.stabilization
    }

    pub fn dofs(&self) -> usize {
        self.dofs
    }

    pub fn constraint_count(&self) -> usize {
        self.compiled.activity.len()
    }

    pub fn progress(&self) -> &ProgressLog {
        &self.progress
    }

    fn arguments(&self, state: &[f64]) -> Result<Vec<f64>> {
        check_len(self.state_len, state.len())?;
        let mut args = Vec::with_capacity(state.len() + self.constant_values.len());
        args.extend_from_slice(state);
        args.extend_from_slice(&self.constant_values);
        Ok(args)
    }

    fn activity_at(&self, args: &[f64]) -> Result<ActiveSet> {
        let flags = self
            .compiled
            .activity
            .iter()
            .map(|rule| -> Result<bool> {
                Ok(match rule {
                    CompiledActivity::Static(active) => *active,
                    CompiledActivity::Predicate(predicate) => predicate.call(args)? > 0.0,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ActiveSet::new(flags))
    }

    /// Constraint-level values `eq` and `eq_d` at `state`.
    pub fn constraint_values(&self, state: &[f64]) -> Result<(DVector<f64>, DVector<f64>)> {
        let args = self.arguments(state)?;
        Ok((
            self.compiled.eq.evaluate_vector(&args)?,
            self.compiled.eq_d.evaluate_vector(&args)?,
        ))
    }

    /// Evaluates `A` and `b`, applies `stabilization`, and keeps all velocity
    /// rows plus the active constraint rows.
    pub fn numeric_system(
        &self,
        state: &[f64],
        stabilization: Option<Baumgarte>,
        active: Option<&ActiveSet>,
    ) -> Result<NumericSystem> {
        let args = self.arguments(state)?;
        let m = self.dofs;
        let n = self.constraint_count();

        let a = self.compiled.a.evaluate(&args)?;
        let mut b = self.compiled.b.evaluate_vector(&args)?;

        if let Some(gains) = stabilization.filter(|_| n > 0) {
            let eq = self.compiled.eq.evaluate_vector(&args)?;
            let eq_d = self.compiled.eq_d.evaluate_vector(&args)?;
            for j in 0..n {
                b[m + j] -= gains.correction(eq[j], eq_d[j]);
            }
        }

        let computed;
        let active = match active {
            Some(set) => {
                check_len(n, set.len())?;
                set
            }
            None => {
                computed = self.activity_at(&args)?;
                &computed
            }
        };

        if active.active_count() == n {
            return Ok(NumericSystem {
                a,
                b,
                active_rows: (0..m + n).collect(),
            });
        }
        let active_rows: Vec<usize> = (0..m)
            .chain((0..n).filter(|&j| active.is_active(j)).map(|j| m + j))
            .collect();
        Ok(NumericSystem {
            a: select_square(&a, &active_rows),
            b: b.select_rows(&active_rows),
            active_rows,
        })
    }

    /// Full evaluation with explicit stabilization gains, overriding the stored ones.
    pub fn evaluate_with_gains(
        &self,
        state: &[f64],
        time: f64,
        stabilization: Option<Baumgarte>,
        active: Option<&ActiveSet>,
        out: &mut [f64],
    ) -> Result<()> {
        check_len(self.state_len, out.len())?;
        self.progress.tick(time);

        let system = self.numeric_system(state, stabilization, active)?;
        let solution = solve_dense(system.a, &system.b, self.singular_tolerance)?;

        let positions = self.state_len - self.dofs;
        out[..self.dofs].copy_from_slice(&state[positions..]);
        out[self.dofs..].copy_from_slice(&solution.as_slice()[..self.dofs]);
        Ok(())
    }
}

impl StateSpace for PostInvertedStateSpace {
    fn state_len(&self) -> usize {
        self.state_len
    }

    fn active_set(&self, state: &[f64]) -> Result<Option<ActiveSet>> {
        if self.constraint_count() == 0 {
            return Ok(None);
        }
        let args = self.arguments(state)?;
        self.activity_at(&args).map(Some)
    }

    fn evaluate(
        &self,
        state: &[f64],
        time: f64,
        active: Option<&ActiveSet>,
        out: &mut [f64],
    ) -> Result<()> {
        self.evaluate_with_gains(state, time, self.stabilization, active, out)
    }
}

/// State space whose accelerations were solved symbolically at assembly.
#[derive(Debug, Clone)]
pub struct PreInvertedStateSpace {
    dofs: usize,
    state_len: usize,
    accelerations: CompiledMatrix,
    progress: ProgressLog,
}

impl PreInvertedStateSpace {
    pub(crate) fn new(
        dofs: usize,
        state_len: usize,
        accelerations: CompiledMatrix,
        config: &SolverConfig,
    ) -> Self {
        Self {
            dofs,
            state_len,
            accelerations,
            progress: ProgressLog::new(config.progress_interval),
        }
    }

    pub fn dofs(&self) -> usize {
        self.dofs
    }

    pub fn progress(&self) -> &ProgressLog {
        &self.progress
    }
}

impl StateSpace for PreInvertedStateSpace {
    fn state_len(&self) -> usize {
        self.state_len
    }

    fn evaluate(
        &self,
        state: &[f64],
        time: f64,
        _active: Option<&ActiveSet>,
        out: &mut [f64],
    ) -> Result<()> {
        check_len(self.state_len, state.len())?;
        check_len(self.state_len, out.len())?;
        self.progress.tick(time);

        let accelerations = self.accelerations.evaluate_vector(state)?;
        // A structurally nonzero pivot can still vanish at this state.
        if accelerations.iter().any(|value| !value.is_finite()) {
            return Err(DynamicsError::SingularSystem {
                size: self.dofs,
                origin: "pre-inverted evaluation",
            });
        }
        let positions = self.state_len - self.dofs;
        out[..self.dofs].copy_from_slice(&state[positions..]);
        out[self.dofs..].copy_from_slice(accelerations.as_slice());
        Ok(())
    }
}
