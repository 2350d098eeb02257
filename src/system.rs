use std::collections::HashMap;

use crate::{
    core::{ConstantTable, ContributionLedger, CoordinateRegistry, Differentiable, SymbolTable},
    config::MAX_DERIVATIVE_ORDER,
    dynamics::{assembly::EquationAssembler, generalize::generalize},
    error::ConfigError,
    symbolic::{Expr, Symbol, Vector},
};

#[derive(Debug, Clone)]
struct MassPoint {
    mass: Expr,
    position: Vector,
    velocity: Vector,
    gravity: Option<Vector>,
}

/// Central model container: owns the symbols, coordinates, constants and
/// contributions of one mechanical system.
///
/// Everything is append-only. Once equations have been assembled, further
/// declarations do not affect the compiled state space.
#[derive(Debug, Default)]
pub struct System {
    symbols: SymbolTable,
    registry: CoordinateRegistry,
    constants: ConstantTable,
    ledger: ContributionLedger,
    mass_points: Vec<MassPoint>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a generalized coordinate with velocity and acceleration.
    pub fn differentiable(&mut self, name: &str) -> Result<Differentiable, ConfigError> {
        self.declare(Some(name), MAX_DERIVATIVE_ORDER)
    }

    /// Declares a coordinate chain up to `max_order`; anonymous names come
    /// from a per-system counter.
    pub fn declare(
        &mut self,
        name: Option<&str>,
        max_order: usize,
    ) -> Result<Differentiable, ConfigError> {
        self.registry.declare(&mut self.symbols, name, max_order)
    }

    /// Declares a named constant with its numeric value.
    pub fn constant(&mut self, name: &str, value: f64) -> Result<Symbol, ConfigError> {
        let symbol = self.symbols.declare(name)?;
        self.constants.insert(symbol.clone(), value);
        Ok(symbol)
    }

    /// Rebinds the value of an existing constant.
    pub fn set_constant(&mut self, symbol: &Symbol, value: f64) {
        self.constants.insert(symbol.clone(), value);
    }

    /// Declares a free symbol that is neither a coordinate nor a constant.
    ///
    /// Expressions that still contain one at compile time are rejected.
    pub fn variable(&mut self, name: &str) -> Result<Symbol, ConfigError> {
        self.symbols.declare(name)
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn registry(&self) -> &CoordinateRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CoordinateRegistry {
        &mut self.registry
    }

    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    pub fn ledger(&self) -> &ContributionLedger {
        &self.ledger
    }

    pub fn add_force(&mut self, force: Vector, velocity: Vector) {
        self.ledger.add_force(force, velocity);
    }

    pub fn add_effective_force(&mut self, effective_force: Vector, velocity: Vector) {
        self.ledger.add_effective_force(effective_force, velocity);
    }

    pub fn add_kinetic_energy(&mut self, energy: &Expr) {
        self.ledger.add_kinetic_energy(energy);
    }

    pub fn add_spring(&mut self, stiffness: Expr, stretch: Vector, velocity: Vector) {
        self.ledger.add_spring(stiffness, stretch, velocity);
    }

    pub(crate) fn add_mass_point(&mut self, mass: Expr, position: Vector, velocity: Vector) {
        self.mass_points.push(MassPoint {
            mass,
            position,
            velocity,
            gravity: None,
        });
    }

    /// Adds `m·g` conjugate to the velocity of every particle and body declared so far.
    ///
    /// Repeated calls accumulate, and the potential energy follows the total field.
    pub fn add_gravity(&mut self, gravity: &Vector) {
        for point in self.mass_points.iter_mut() {
            let weight = gravity * &point.mass;
            self.ledger.add_force(weight, point.velocity.clone());
            point.gravity = Some(match point.gravity.take() {
                Some(existing) => &existing + gravity,
                None => gravity.clone(),
            });
        }
        log::trace!("gravity applied to {} mass points", self.mass_points.len());
    }

    pub fn kinetic_energy(&self) -> &Expr {
        self.ledger.kinetic_energy()
    }

    /// Gravitational potential energy relative to `reference`:
    /// `Σ -(m·g)·(p - reference)` over mass points under gravity.
    pub fn gravity_potential_energy(&self, reference: &Vector) -> Expr {
        self.mass_points
            .iter()
            .filter_map(|point| {
                let gravity = point.gravity.as_ref()?;
                let offset = &point.position - reference;
                Some(-(gravity * &point.mass).dot(&offset))
            })
            .sum()
    }

    pub fn spring_potential_energy(&self) -> Expr {
        self.ledger.spring_potential_energy()
    }

    pub fn time_derivative(&self, expr: &Expr) -> Expr {
        self.registry.time_derivative(expr)
    }

    pub fn time_derivative_vector(&self, v: &Vector) -> Vector {
        self.registry.time_derivative_vector(v)
    }

    /// Generalized applied forces `f` and generalized effective forces `ma`.
    pub fn dynamics(&self) -> (Vec<Expr>, Vec<Expr>) {
        let velocities = self.registry.coordinates(1);
        let f = generalize(self.ledger.forces(), velocities);
        let ma = generalize(self.ledger.effective_forces(), velocities);
        (f, ma)
    }

    /// Assembler over this system's own generalized forces.
    pub fn assembler(&self) -> Result<EquationAssembler<'_>, ConfigError> {
        let (f, ma) = self.dynamics();
        EquationAssembler::new(self, f, ma)
    }

    pub fn state_variables(&self) -> Vec<Symbol> {
        self.registry.state_variables()
    }

    /// Builds a state vector in registry layout from values keyed by coordinate name.
    pub fn initial_state(&self, values: &HashMap<&str, f64>) -> Result<Vec<f64>, ConfigError> {
        self.state_variables()
            .iter()
            .map(|symbol| {
                values
                    .get(symbol.name())
                    .copied()
                    .ok_or_else(|| ConfigError::MissingInitialValue(symbol.name().to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Particle;
    use approx::assert_relative_eq;
    use glam::DVec3;

    fn falling_particle() -> (System, Symbol) {
        let mut system = System::new();
        let (y, _, _) = system.differentiable("y").unwrap().triple().unwrap();
        let m = system.constant("m", 2.0).unwrap();
        let g = system.constant("g", 9.81).unwrap();
        Particle::new(&mut system, "p", Vector::along(DVec3::Y, &y), m.expr());
        system.add_gravity(&Vector::along(DVec3::NEG_Y, &g.expr()));
        (system, y.as_symbol().unwrap().clone())
    }

    #[test]
    fn gravity_potential_energy_grows_with_height() {
        let (system, y) = falling_particle();
        let pe = system.gravity_potential_energy(&Vector::zero());
        let mut values = HashMap::new();
        for (symbol, value) in system.constants().iter() {
            values.insert(symbol.clone(), value);
        }
        values.insert(y, 3.0);
        assert_relative_eq!(pe.evaluate(&values).unwrap(), 2.0 * 9.81 * 3.0, epsilon = 1e-12);
    }

    #[test]
    fn repeated_gravity_accumulates_force_and_energy() {
        let (mut system, y) = falling_particle();
        let g = system.symbol("g").unwrap().clone();
        system.add_gravity(&Vector::along(DVec3::NEG_Y, &g.expr()));

        let mut values = HashMap::new();
        for (symbol, value) in system.constants().iter() {
            values.insert(symbol.clone(), value);
        }
        values.insert(y, 3.0);
        let (f, _) = system.dynamics();
        assert_relative_eq!(f[0].evaluate(&values).unwrap(), -2.0 * 2.0 * 9.81, epsilon = 1e-12);
        let pe = system.gravity_potential_energy(&Vector::zero());
        assert_relative_eq!(
            pe.evaluate(&values).unwrap(),
            2.0 * 2.0 * 9.81 * 3.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn dynamics_has_one_entry_per_velocity() {
        let (system, _) = falling_particle();
        let (f, ma) = system.dynamics();
        assert_eq!(f.len(), 1);
        assert_eq!(ma.len(), 1);
        assert!(!f[0].is_zero());
    }

    #[test]
    fn initial_state_requires_every_coordinate() {
        let (system, _) = falling_particle();
        let mut values = HashMap::new();
        values.insert("y", 1.0);
        assert_eq!(
            system.initial_state(&values).unwrap_err(),
            ConfigError::MissingInitialValue("y_d".into())
        );
        values.insert("y_d", 0.0);
        assert_eq!(system.initial_state(&values).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn constants_and_variables_share_one_namespace() {
        let mut system = System::new();
        system.constant("k", 1.0).unwrap();
        assert!(system.variable("k").is_err());
        assert!(system.differentiable("k").is_err());
    }
}
