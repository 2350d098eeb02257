use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::evaluator::{ActiveSet, StateSpace};
use crate::{
    config::{DEFAULT_SUBSTEPS, DEFAULT_TIME_STEP},
    error::{DynamicsError, Result},
};

/// Sampled solution: one state row per sample time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub states: Vec<Vec<f64>>,
}

impl Trajectory {
    pub fn push(&mut self, time: f64, state: Vec<f64>) {
        self.times.push(time);
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn last_state(&self) -> Option<&[f64]> {
        self.states.last().map(Vec::as_slice)
    }

    /// History of one state variable.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.states.iter().map(|s| s[index]).collect()
    }

    /// States as a `len × state_len` matrix.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let cols = self.states.first().map_or(0, Vec::len);
        DMatrix::from_fn(self.len(), cols, |r, c| self.states[r][c])
    }
}

/// Per-step failure, carrying everything integrated before it.
#[derive(Debug, Error)]
#[error("integration stopped at t = {time}: {source}")]
pub struct IntegrationFailure {
    pub time: f64,
    pub trajectory: Trajectory,
    #[source]
    pub source: DynamicsError,
}

/// Fixed-step classic Runge-Kutta integrator.
///
/// Each interval between consecutive sample times is split into equal steps
/// no longer than `dt`, each further divided into `substeps`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Integrator {
    pub dt: f64,
    pub substeps: u32,
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_STEP, DEFAULT_SUBSTEPS)
    }
}

impl Integrator {
    /// A `dt` that is not strictly positive (including NaN) falls back to
    /// [`DEFAULT_TIME_STEP`], and `substeps` is raised to at least 1.
    pub fn new(dt: f64, substeps: u32) -> Self {
        let dt = if dt > 0.0 { dt } else { DEFAULT_TIME_STEP };
        Self {
            dt,
            substeps: substeps.max(1),
        }
    }

    fn steps_for(&self, interval: f64) -> usize {
        let steps = (interval / self.dt).ceil().max(1.0) as usize;
        steps * self.substeps as usize
    }

    /// One RK4 step of length `h` from `(time, state)`.
    ///
    /// Constraint activity is decided at the start of the step and held for
    /// all four stages.
    pub fn step<S: StateSpace + ?Sized>(
        &self,
        system: &S,
        state: &[f64],
        time: f64,
        h: f64,
    ) -> Result<Vec<f64>> {
        let n = state.len();
        let active = system.active_set(state)?;
        let active: Option<&ActiveSet> = active.as_ref();

        let mut k1 = vec![0.0; n];
        let mut k2 = vec![0.0; n];
        let mut k3 = vec![0.0; n];
        let mut k4 = vec![0.0; n];
        let mut probe = vec![0.0; n];

        system.evaluate(state, time, active, &mut k1)?;
        offset(state, &k1, 0.5 * h, &mut probe);
        system.evaluate(&probe, time + 0.5 * h, active, &mut k2)?;
        offset(state, &k2, 0.5 * h, &mut probe);
        system.evaluate(&probe, time + 0.5 * h, active, &mut k3)?;
        offset(state, &k3, h, &mut probe);
        system.evaluate(&probe, time + h, active, &mut k4)?;

        Ok((0..n)
            .map(|i| state[i] + h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]))
            .collect())
    }

    /// Integrates from `initial` at `times[0]` and records the state at every sample time.
    pub fn integrate<S: StateSpace + ?Sized>(
        &self,
        system: &S,
        initial: &[f64],
        times: &[f64],
    ) -> std::result::Result<Trajectory, IntegrationFailure> {
        let mut trajectory = Trajectory::default();
        let start = times.first().copied().unwrap_or(0.0);
        if initial.len() != system.state_len() {
            return Err(IntegrationFailure {
                time: start,
                trajectory,
                source: DynamicsError::DimensionMismatch {
                    expected: system.state_len(),
                    found: initial.len(),
                },
            });
        }
        if times.is_empty() {
            return Ok(trajectory);
        }

        let mut state = initial.to_vec();
        trajectory.push(start, state.clone());

        for window in times.windows(2) {
            let (t0, t1) = (window[0], window[1]);
            let steps = self.steps_for(t1 - t0);
            let h = (t1 - t0) / steps as f64;
            for k in 0..steps {
                let time = t0 + k as f64 * h;
                match self.step(system, &state, time, h) {
                    Ok(next) => state = next,
                    Err(source) => {
                        log::warn!("integration stopped at t = {time}: {source}");
                        return Err(IntegrationFailure {
                            time,
                            trajectory,
                            source,
                        });
                    }
                }
            }
            trajectory.push(t1, state.clone());
        }
        Ok(trajectory)
    }
}

fn offset(state: &[f64], slope: &[f64], h: f64, out: &mut [f64]) {
    for ((o, s), k) in out.iter_mut().zip(state).zip(slope) {
        *o = s + h * k;
    }
}

/// `count` evenly spaced sample times from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + i as f64 * step).collect()
        }
    }
}
