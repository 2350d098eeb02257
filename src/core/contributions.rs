use crate::symbolic::{Expr, Vector};

/// A force (or moment) acting conjugate to a velocity for virtual-work purposes.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub force: Vector,
    pub velocity: Vector,
}

impl Contribution {
    pub fn new(force: Vector, velocity: Vector) -> Self {
        Self { force, velocity }
    }
}

/// Linear spring bookkeeping for potential energy.
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    pub stiffness: Expr,
    pub stretch: Vector,
}

impl Spring {
    pub fn potential_energy(&self) -> Expr {
        0.5 * &self.stiffness * self.stretch.length_squared()
    }
}

/// Append-only record of applied and effective forces and energy terms.
#[derive(Debug, Clone, Default)]
pub struct ContributionLedger {
    forces: Vec<Contribution>,
    effective_forces: Vec<Contribution>,
    kinetic_energy: Expr,
    springs: Vec<Spring>,
}

impl ContributionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_force(&mut self, force: Vector, velocity: Vector) {
        self.forces.push(Contribution::new(force, velocity));
    }

    pub fn add_effective_force(&mut self, effective_force: Vector, velocity: Vector) {
        self.effective_forces
            .push(Contribution::new(effective_force, velocity));
    }

    pub fn add_kinetic_energy(&mut self, energy: &Expr) {
        self.kinetic_energy += energy;
    }

    /// Records the force `-k·stretch` conjugate to `velocity` and the spring itself.
    pub fn add_spring(&mut self, stiffness: Expr, stretch: Vector, velocity: Vector) {
        let force = -(&stretch * &stiffness);
        self.forces.push(Contribution::new(force, velocity));
        self.springs.push(Spring { stiffness, stretch });
    }

    pub fn forces(&self) -> &[Contribution] {
        &self.forces
    }

    pub fn effective_forces(&self) -> &[Contribution] {
        &self.effective_forces
    }

    pub fn kinetic_energy(&self) -> &Expr {
        &self.kinetic_energy
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    /// `Σ ½·k·(s·s)` over all springs.
    pub fn spring_potential_energy(&self) -> Expr {
        self.springs.iter().map(Spring::potential_energy).sum()
    }
}
