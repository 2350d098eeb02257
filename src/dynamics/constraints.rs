use crate::core::CoordinateRegistry;
use crate::symbolic::Expr;

/// Whether a constraint's multiplier row participates in the solve.
#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    /// Fixed at assembly time.
    Static(bool),
    /// Evaluated numerically at each state; active while the value is positive.
    Predicate(Expr),
}

impl Default for Activity {
    fn default() -> Self {
        Activity::Static(true)
    }
}

/// Holonomic constraint at position, velocity and acceleration level.
///
/// The acceleration-level expression is what enters the bordered system; the
/// lower levels feed Baumgarte stabilization when present.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    position: Option<Expr>,
    velocity: Option<Expr>,
    acceleration: Expr,
    activity: Activity,
}

impl Constraint {
    /// Builds a constraint from its position-level zero set, differentiating
    /// twice through the coordinate links.
    pub fn holonomic(registry: &CoordinateRegistry, eq: Expr) -> Self {
        let velocity = registry.time_derivative(&eq);
        let acceleration = registry.time_derivative(&velocity);
        Self::from_levels(Some(eq), Some(velocity), acceleration)
    }

    pub fn from_levels(position: Option<Expr>, velocity: Option<Expr>, acceleration: Expr) -> Self {
        Self {
            position,
            velocity,
            acceleration,
            activity: Activity::default(),
        }
    }

    /// Acceleration-level constraint with no position or velocity form;
    /// stabilization leaves its row untouched.
    pub fn acceleration_level(acceleration: Expr) -> Self {
        Self::from_levels(None, None, acceleration)
    }

    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activity = activity;
        self
    }

    /// Shorthand for a constraint that never participates.
    pub fn inactive(self) -> Self {
        self.with_activity(Activity::Static(false))
    }

    pub fn position(&self) -> Option<&Expr> {
        self.position.as_ref()
    }

    pub fn velocity(&self) -> Option<&Expr> {
        self.velocity.as_ref()
    }

    pub fn acceleration(&self) -> &Expr {
        &self.acceleration
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SymbolTable;
    use std::collections::HashMap;

    #[test]
    fn holonomic_constraint_is_differentiated_twice() {
        let mut symbols = SymbolTable::new();
        let mut registry = CoordinateRegistry::new();
        let x = registry.declare(&mut symbols, Some("x"), 2).unwrap();
        let (x, x_d, x_dd) = x.triple().unwrap();
        let constraint = Constraint::holonomic(&registry, x.powi(2) - 1.0);

        let mut values = HashMap::new();
        values.insert(x.as_symbol().unwrap().clone(), 0.5);
        values.insert(x_d.as_symbol().unwrap().clone(), 2.0);
        values.insert(x_dd.as_symbol().unwrap().clone(), 3.0);
        let velocity = constraint.velocity().unwrap().evaluate(&values).unwrap();
        let acceleration = constraint.acceleration().evaluate(&values).unwrap();
        assert!((velocity - 2.0 * 0.5 * 2.0).abs() < 1e-12);
        assert!((acceleration - (2.0 * 2.0 * 2.0 + 2.0 * 0.5 * 3.0)).abs() < 1e-12);
        assert_eq!(constraint.activity(), &Activity::Static(true));
    }

    #[test]
    fn inactive_constraint_keeps_its_equations() {
        let constraint = Constraint::acceleration_level(Expr::one()).inactive();
        assert_eq!(constraint.activity(), &Activity::Static(false));
        assert!(constraint.position().is_none());
        assert!(constraint.acceleration().is_one());
    }
}
