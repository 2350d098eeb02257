use crate::symbolic::{Dyadic, Expr, Vector};
use crate::system::System;

/// Point mass whose kinematics follow from its symbolic position.
#[derive(Debug, Clone)]
pub struct Particle {
    name: String,
    mass: Expr,
    position: Vector,
    velocity: Vector,
    acceleration: Vector,
}

impl Particle {
    /// Registers `m·a` conjugate to `v` and `½·m·v·v` with the system.
    pub fn new(system: &mut System, name: &str, position: Vector, mass: Expr) -> Self {
        let velocity = system.time_derivative_vector(&position);
        let acceleration = system.time_derivative_vector(&velocity);

        system.add_effective_force(&acceleration * &mass, velocity.clone());
        system.add_kinetic_energy(&(0.5 * &mass * velocity.length_squared()));
        system.add_mass_point(mass.clone(), position.clone(), velocity.clone());

        log::trace!("particle `{name}` registered");
        Self {
            name: name.to_string(),
            mass,
            position,
            velocity,
            acceleration,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mass(&self) -> &Expr {
        &self.mass
    }

    pub fn position(&self) -> &Vector {
        &self.position
    }

    pub fn velocity(&self) -> &Vector {
        &self.velocity
    }

    pub fn acceleration(&self) -> &Vector {
        &self.acceleration
    }

    pub fn linear_momentum(&self) -> Vector {
        &self.velocity * &self.mass
    }
}

/// Rigid body with a center of mass and an angular velocity, both expressed
/// in the Newtonian basis. `inertia` is taken about the center of mass and
/// expressed in the same basis.
#[derive(Debug, Clone)]
pub struct Body {
    particle: Particle,
    inertia: Dyadic,
    angular_velocity: Vector,
    angular_acceleration: Vector,
}

impl Body {
    pub fn new(
        system: &mut System,
        name: &str,
        position: Vector,
        angular_velocity: Vector,
        mass: Expr,
        inertia: Dyadic,
    ) -> Self {
        let particle = Particle::new(system, name, position, mass);
        let angular_acceleration = system.time_derivative_vector(&angular_velocity);

        let spin = inertia.dot(&angular_velocity);
        let moment = inertia.dot(&angular_acceleration) + angular_velocity.cross(&spin);
        system.add_effective_force(moment, angular_velocity.clone());
        system.add_kinetic_energy(&(0.5 * angular_velocity.dot(&spin)));

        Self {
            particle,
            inertia,
            angular_velocity,
            angular_acceleration,
        }
    }

    pub fn name(&self) -> &str {
        self.particle.name()
    }

    pub fn mass(&self) -> &Expr {
        self.particle.mass()
    }

    pub fn position(&self) -> &Vector {
        self.particle.position()
    }

    pub fn velocity(&self) -> &Vector {
        self.particle.velocity()
    }

    pub fn acceleration(&self) -> &Vector {
        self.particle.acceleration()
    }

    pub fn inertia(&self) -> &Dyadic {
        &self.inertia
    }

    pub fn angular_velocity(&self) -> &Vector {
        &self.angular_velocity
    }

    pub fn angular_acceleration(&self) -> &Vector {
        &self.angular_acceleration
    }

    pub fn linear_momentum(&self) -> Vector {
        self.particle.linear_momentum()
    }

    pub fn angular_momentum(&self) -> Vector {
        self.inertia.dot(&self.angular_velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn particle_registers_inertial_terms() {
        let mut system = System::new();
        let (x, _, x_dd) = system.differentiable("x").unwrap().triple().unwrap();
        let m = system.constant("m", 2.0).unwrap();
        let particle = Particle::new(
            &mut system,
            "p",
            Vector::along(DVec3::X, &x),
            m.expr(),
        );

        assert_eq!(particle.acceleration().x, x_dd);
        assert_eq!(system.ledger().effective_forces().len(), 1);
        assert_eq!(system.ledger().effective_forces()[0].force.x, &x_dd * m.expr());
        assert!(!system.kinetic_energy().is_zero());
    }

    #[test]
    fn body_adds_rotational_effective_force() {
        let mut system = System::new();
        let (q, q_d, q_dd) = system.differentiable("q").unwrap().triple().unwrap();
        let inertia = Dyadic::diagonal(Expr::one(), Expr::one(), Expr::constant(3.0));
        let body = Body::new(
            &mut system,
            "b",
            Vector::new(q.cos(), q.sin(), Expr::zero()),
            Vector::along(DVec3::Z, &q_d),
            Expr::one(),
            inertia,
        );

        assert_eq!(body.angular_acceleration().z, q_dd);
        let moment = &system.ledger().effective_forces()[1];
        assert_eq!(moment.force.z, 3.0 * &q_dd);
        assert!(moment.force.x.is_zero());
        assert_eq!(body.angular_momentum().z, 3.0 * &q_d);
    }
}
