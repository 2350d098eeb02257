use crate::core::Contribution;
use crate::symbolic::{Expr, Symbol};

/// Projects contributions onto generalized velocities by virtual work:
/// entry `i` is `Σ F · ∂V/∂v_i` over every `(F, V)` pair.
///
/// Velocities that do not appear in a contribution's `V` get nothing from it.
pub fn generalize(contributions: &[Contribution], velocities: &[Symbol]) -> Vec<Expr> {
    velocities
        .iter()
        .map(|speed| {
            contributions
                .iter()
                .map(|c| c.force.dot(&c.velocity.diff(speed)))
                .sum()
        })
        .collect()
}
