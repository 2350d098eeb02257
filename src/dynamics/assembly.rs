use std::collections::HashMap;

use super::constraints::{Activity, Constraint};
use super::evaluator::{
    CompiledActivity, CompiledSystem, PostInvertedStateSpace, PreInvertedStateSpace,
};
use crate::{
    config::{SolverConfig, SCALAR_CACHE_PREFIX},
    error::{ConfigError, Result},
    symbolic::{CompiledExpr, CompiledMatrix, Expr, InversionMethod, Symbol, SymMatrix},
    system::System,
    utils::logging::ScopedTimer,
};

/// Bordered linear system `A·[q_dd; λ] = b`.
///
/// `A = [[M, Jᵀ], [J, 0]]` and `b = [b_dyn; c]`, where `M = ∂(ma - f)/∂q_dd`,
/// `b_dyn = -(ma - f)|q_dd=0`, `J = ∂eq_dd/∂q_dd` and `c = -eq_dd|q_dd=0`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSystem {
    pub a: SymMatrix,
    pub b: SymMatrix,
    pub dofs: usize,
    pub constraint_count: usize,
}

impl AssembledSystem {
    pub fn size(&self) -> usize {
        self.dofs + self.constraint_count
    }

    /// Mass block `M`.
    pub fn mass_matrix(&self) -> SymMatrix {
        let mut mass = SymMatrix::zeros(self.dofs, self.dofs);
        for r in 0..self.dofs {
            for c in 0..self.dofs {
                mass.set(r, c, self.a.get(r, c).clone());
            }
        }
        mass
    }
}

/// Turns generalized forces and constraints into an evaluable state space.
#[derive(Debug, Clone)]
pub struct EquationAssembler<'a> {
    system: &'a System,
    residual: Vec<Expr>,
    constraints: Vec<Constraint>,
}

impl<'a> EquationAssembler<'a> {
    /// Assembler for the residual `ma - f`.
    pub fn new(
        system: &'a System,
        f: Vec<Expr>,
        ma: Vec<Expr>,
    ) -> std::result::Result<Self, ConfigError> {
        if f.len() != ma.len() {
            return Err(ConfigError::CountMismatch {
                what: "generalized forces",
                expected: ma.len(),
                found: f.len(),
            });
        }
        let residual = ma.iter().zip(&f).map(|(ma, f)| ma - f).collect();
        Self::from_residual(system, residual)
    }

    /// Assembler for a pre-combined residual `Ax_b = ma - f`.
    pub fn from_residual(
        system: &'a System,
        residual: Vec<Expr>,
    ) -> std::result::Result<Self, ConfigError> {
        let registry = system.registry();
        let dofs = registry.coordinates(1).len();
        if dofs == 0 {
            return Err(ConfigError::NoCoordinates);
        }
        let checks = [
            ("residual entries", residual.len()),
            ("generalized positions", registry.coordinates(0).len()),
            ("generalized accelerations", registry.coordinates(2).len()),
        ];
        for (what, found) in checks {
            if found != dofs {
                return Err(ConfigError::CountMismatch {
                    what,
                    expected: dofs,
                    found,
                });
            }
        }
        Ok(Self {
            system,
            residual,
            constraints: Vec::new(),
        })
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_constraints(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    pub fn residual(&self) -> &[Expr] {
        &self.residual
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Builds `A` and `b` symbolically over all constraints.
    pub fn assemble(&self, substitute_constants: bool) -> AssembledSystem {
        self.assemble_rows(&self.constraints, substitute_constants)
    }

    fn constant_substitutions(&self, enabled: bool) -> HashMap<Symbol, Expr> {
        if enabled {
            self.system.constants().substitutions()
        } else {
            HashMap::new()
        }
    }

    fn assemble_rows(
        &self,
        constraints: &[Constraint],
        substitute_constants: bool,
    ) -> AssembledSystem {
        let _timer = ScopedTimer::new("assemble equations");
        let constants = self.constant_substitutions(substitute_constants);
        let accelerations = self.system.registry().coordinates(2);
        let at_rest: HashMap<Symbol, Expr> = accelerations
            .iter()
            .map(|s| (s.clone(), Expr::zero()))
            .collect();

        let residual: Vec<Expr> = self.residual.iter().map(|e| e.subs(&constants)).collect();
        let eq_dd: Vec<Expr> = constraints
            .iter()
            .map(|c| c.acceleration().subs(&constants))
            .collect();

        let dofs = residual.len();
        let constraint_count = eq_dd.len();
        let size = dofs + constraint_count;

        let mut a = SymMatrix::zeros(size, size);
        a.set_block(0, 0, &SymMatrix::jacobian(&residual, accelerations));
        if constraint_count > 0 {
            let jacobian = SymMatrix::jacobian(&eq_dd, accelerations);
            a.set_block(dofs, 0, &jacobian);
            a.set_block(0, dofs, &jacobian.transpose());
        }

        let b = SymMatrix::column(
            residual
                .iter()
                .chain(&eq_dd)
                .map(|e| -e.subs(&at_rest))
                .collect(),
        );
        log::trace!("assembled {size}x{size} system ({dofs} dofs, {constraint_count} constraints)");
        AssembledSystem {
            a,
            b,
            dofs,
            constraint_count,
        }
    }

    /// Compiles `A`, `b`, constraint levels and activity predicates for
    /// inversion at every evaluation.
    pub fn post_invert(&self, config: &SolverConfig) -> Result<PostInvertedStateSpace> {
        let assembled = self.assemble(config.presolve_constants);
        let _timer = ScopedTimer::new("compile post-invert state space");

        let mut args = self.system.state_variables();
        let state_len = args.len();
        let constant_values = if config.presolve_constants {
            Vec::new()
        } else {
            args.extend(self.system.constants().symbols());
            self.system.constants().values()
        };
        let constants = self.constant_substitutions(config.presolve_constants);

        let level = |pick: fn(&Constraint) -> Option<&Expr>| -> Vec<Expr> {
            self.constraints
                .iter()
                .map(|c| pick(c).map_or_else(Expr::zero, |e| e.subs(&constants)))
                .collect()
        };
        let eq = level(Constraint::position);
        let eq_d = level(Constraint::velocity);

        let activity = self
            .constraints
            .iter()
            .map(|c| -> Result<CompiledActivity> {
                Ok(match c.activity() {
                    Activity::Static(active) => CompiledActivity::Static(*active),
                    Activity::Predicate(predicate) => CompiledActivity::Predicate(
                        CompiledExpr::compile(&predicate.subs(&constants), &args)?,
                    ),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let compiled = CompiledSystem {
            a: CompiledMatrix::compile(&assembled.a, &args)?,
            b: CompiledMatrix::compile(&assembled.b, &args)?,
            eq: CompiledMatrix::compile_column(&eq, &args)?,
            eq_d: CompiledMatrix::compile_column(&eq_d, &args)?,
            activity,
        };
        Ok(PostInvertedStateSpace::new(
            assembled.dofs,
            state_len,
            constant_values,
            compiled,
            config,
        ))
    }

    /// Inverts the system symbolically once and compiles the accelerations
    /// over the state alone, with constants substituted.
    ///
    /// Statically inactive constraints are dropped; a state-dependent
    /// activity predicate cannot be honored and is rejected.
    pub fn pre_invert(&self, config: &SolverConfig) -> Result<PreInvertedStateSpace> {
        let mut active = Vec::with_capacity(self.constraints.len());
        for (index, constraint) in self.constraints.iter().enumerate() {
            match constraint.activity() {
                Activity::Static(true) => active.push(constraint.clone()),
                Activity::Static(false) => {}
                Activity::Predicate(_) => {
                    return Err(ConfigError::DynamicActivityNotSupported { index }.into())
                }
            }
        }
        let assembled = self.assemble_rows(&active, true);

        let inverse = {
            let _timer = ScopedTimer::new("symbolic inversion");
            if config.cache_scalars {
                self.cached_inverse(&assembled.a, config.inversion)?
            } else {
                assembled.a.inverse(config.inversion)?
            }
        };
        let solution = inverse.mul(&assembled.b)?;
        let accelerations = solution.row_range(0, assembled.dofs);

        let _timer = ScopedTimer::new("compile pre-invert state space");
        let state = self.system.state_variables();
        let compiled = CompiledMatrix::compile(&accelerations, &state)?;
        Ok(PreInvertedStateSpace::new(assembled.dofs, state.len(), compiled, config))
    }

    /// Solves the dynamics symbolically together with explicit constraint
    /// unknowns.
    ///
    /// `q_con` are model symbols (reaction forces, for example) that enter the
    /// residual through applied forces, and `eq_con` are equations linear in
    /// the accelerations and `q_con`. The system
    /// `[[M, C1], [C2]]·[q_dd; q_con] = b` is inverted with `method`, giving
    /// the accelerations and the constraint unknowns in declaration order.
    /// Constraints registered with [`with_constraint`](Self::with_constraint)
    /// are not part of this system.
    pub fn solve_constrained(
        &self,
        eq_con: &[Expr],
        q_con: &[Symbol],
        method: InversionMethod,
    ) -> Result<(Vec<Expr>, Vec<Expr>)> {
        if eq_con.len() != q_con.len() {
            return Err(ConfigError::CountMismatch {
                what: "constraint equations",
                expected: q_con.len(),
                found: eq_con.len(),
            }
            .into());
        }
        let _timer = ScopedTimer::new("constrained symbolic solve");
        let q_dyn = self.system.registry().coordinates(2);
        let unknowns: Vec<Symbol> = q_dyn.iter().chain(q_con).cloned().collect();
        let at_zero: HashMap<Symbol, Expr> = unknowns
            .iter()
            .map(|s| (s.clone(), Expr::zero()))
            .collect();

        let dofs = q_dyn.len();
        let size = unknowns.len();
        let mut a = SymMatrix::zeros(size, size);
        a.set_block(0, 0, &SymMatrix::jacobian(&self.residual, &unknowns));
        a.set_block(dofs, 0, &SymMatrix::jacobian(eq_con, &unknowns));
        let b = SymMatrix::column(
            self.residual
                .iter()
                .chain(eq_con)
                .map(|e| -e.subs(&at_zero))
                .collect(),
        );

        let solution = a.inverse(method)?.mul(&b)?.into_entries();
        let (x_dyn, x_con) = solution.split_at(dofs);
        Ok((x_dyn.to_vec(), x_con.to_vec()))
    }

    /// Replaces each non-literal entry with a scratch symbol, inverts the
    /// resulting sparse pattern and substitutes the entries back.
    fn cached_inverse(&self, a: &SymMatrix, method: InversionMethod) -> Result<SymMatrix> {
        let mut replacements = HashMap::new();
        let mut next = 0usize;
        let symbols = self.system.symbols();
        let pattern = a.map(|entry| {
            if entry.as_constant().is_some() {
                return entry.clone();
            }
            let z = symbols.scratch(&format!("{SCALAR_CACHE_PREFIX}{next}"));
            next += 1;
            replacements.insert(z.clone(), entry.clone());
            z.expr()
        });
        log::trace!("cached {} scalars before inversion", replacements.len());
        Ok(pattern.inverse(method)?.subs(&replacements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Particle;
    use crate::error::DynamicsError;
    use crate::symbolic::Vector;
    use glam::DVec3;

    fn particle_system() -> (System, Expr, Expr) {
        let mut system = System::new();
        let (x, _, _) = system.differentiable("x").unwrap().triple().unwrap();
        let (y, _, _) = system.differentiable("y").unwrap().triple().unwrap();
        let m = system.constant("m", 2.0).unwrap();
        let position = Vector::new(x.clone(), y.clone(), Expr::zero());
        Particle::new(&mut system, "p", position, m.expr());
        system.add_force(
            Vector::from_dvec3(DVec3::new(1.0, 2.0, 0.0)),
            Vector::new(
                system.time_derivative(&x),
                system.time_derivative(&y),
                Expr::zero(),
            ),
        );
        (system, x, y)
    }

    #[test]
    fn unconstrained_system_has_mass_matrix_and_forces() {
        let (system, _, _) = particle_system();
        let assembled = system.assembler().unwrap().assemble(true);
        assert_eq!(assembled.size(), 2);
        assert_eq!(assembled.a.get(0, 0).as_constant(), Some(2.0));
        assert!(assembled.a.get(0, 1).is_zero());
        assert_eq!(assembled.b.get(0, 0).as_constant(), Some(1.0));
        assert_eq!(assembled.b.get(1, 0).as_constant(), Some(2.0));
    }

    #[test]
    fn constraint_rows_border_the_mass_matrix() {
        let (system, x, _) = particle_system();
        let constraint = Constraint::holonomic(system.registry(), x - 1.0);
        let assembled = system
            .assembler()
            .unwrap()
            .with_constraint(constraint)
            .assemble(true);
        assert_eq!(assembled.size(), 3);
        assert!(assembled.a.get(2, 0).is_one());
        assert!(assembled.a.get(0, 2).is_one());
        assert!(assembled.a.get(2, 2).is_zero());
        assert!(assembled.b.get(2, 0).is_zero());
        assert_eq!(assembled.mass_matrix().get(1, 1).as_constant(), Some(2.0));
    }

    #[test]
    fn constrained_solve_recovers_the_reaction_force() {
        let mut system = System::new();
        let (x, _, _) = system.differentiable("x").unwrap().triple().unwrap();
        let (y, _, y_dd) = system.differentiable("y").unwrap().triple().unwrap();
        let m = system.constant("m", 2.0).unwrap();
        let g = system.constant("g", 9.81).unwrap();
        let reaction = system.variable("reaction").unwrap();
        let particle = Particle::new(
            &mut system,
            "p",
            Vector::new(x, y, Expr::zero()),
            m.expr(),
        );
        let velocity = particle.velocity().clone();
        system.add_gravity(&Vector::along(DVec3::NEG_Y, &g.expr()));
        system.add_force(Vector::along(DVec3::Y, &reaction.expr()), velocity);

        let (x_dyn, x_con) = system
            .assembler()
            .unwrap()
            .solve_constrained(&[y_dd], &[reaction], InversionMethod::GaussJordan)
            .unwrap();
        assert_eq!(x_dyn.len(), 2);
        assert_eq!(x_con.len(), 1);

        let values: HashMap<Symbol, f64> = system
            .constants()
            .iter()
            .map(|(symbol, value)| (symbol.clone(), value))
            .collect();
        assert!(x_dyn[0].evaluate(&values).unwrap().abs() < 1e-12);
        assert!(x_dyn[1].evaluate(&values).unwrap().abs() < 1e-12);
        let force = x_con[0].evaluate(&values).unwrap();
        assert!((force - 2.0 * 9.81).abs() < 1e-12, "reaction = {force}");
    }

    #[test]
    fn constrained_solve_needs_one_equation_per_unknown() {
        let (mut system, x, _) = particle_system();
        let lambda = system.variable("lambda").unwrap();
        let err = system
            .assembler()
            .unwrap()
            .solve_constrained(&[x.clone(), x], &[lambda], InversionMethod::GaussJordan)
            .unwrap_err();
        assert!(matches!(
            err,
            DynamicsError::Config(ConfigError::CountMismatch { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn residual_length_must_match_velocities() {
        let (system, _, _) = particle_system();
        let err = EquationAssembler::from_residual(&system, vec![Expr::zero()]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::CountMismatch {
                what: "residual entries",
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn empty_model_is_rejected() {
        let system = System::new();
        assert_eq!(
            system.assembler().unwrap_err(),
            ConfigError::NoCoordinates
        );
    }

    #[test]
    fn pre_invert_rejects_state_dependent_activity() {
        let (system, x, y) = particle_system();
        let constraint = Constraint::holonomic(system.registry(), x - 1.0)
            .with_activity(Activity::Predicate(y));
        let err = system
            .assembler()
            .unwrap()
            .with_constraint(constraint)
            .pre_invert(&SolverConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            DynamicsError::Config(ConfigError::DynamicActivityNotSupported { index: 0 })
        );
    }
}
