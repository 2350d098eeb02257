use symdyn::*;

/// A particle in the plane held on a unit circle by a Lagrange multiplier,
/// released slightly off the circle with and without Baumgarte stabilization.
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut system = System::new();
    let (x, _, _) = system.differentiable("x")?.triple().ok_or("missing derivatives")?;
    let (y, _, _) = system.differentiable("y")?.triple().ok_or("missing derivatives")?;
    let m = system.constant("m", 1.0)?;
    let g = system.constant("g", 9.81)?;

    Particle::new(
        &mut system,
        "p",
        Vector::new(x.clone(), y.clone(), Expr::zero()),
        m.expr(),
    );
    system.add_gravity(&Vector::along(DVec3::NEG_Y, &g.expr()));

    let eq = x.powi(2) + y.powi(2) - 1.0;
    let constraint = Constraint::holonomic(system.registry(), eq.clone());
    let space = system
        .assembler()?
        .with_constraint(constraint)
        .post_invert(&SolverConfig::default())?;
    let violation = Output::new(&[eq], &system)?;

    let times = linspace(0.0, 3.0, 7);
    let initial = [1.02, 0.0, 0.0, 0.0];
    for gains in [None, Some(Baumgarte::new(5.0, 5.0))] {
        let mut space = space.clone();
        if let Some(gains) = gains {
            space = space.with_stabilization(gains);
        }
        let trajectory = Integrator::new(1e-3, 1).integrate(&space, &initial, &times)?;
        let values = violation.calc(&trajectory)?;
        println!("stabilization: {gains:?}");
        for (i, time) in trajectory.times.iter().enumerate() {
            println!("  t = {time:3.1}  |eq| = {:.3e}", values[(i, 0)].abs());
        }
    }
    Ok(())
}
