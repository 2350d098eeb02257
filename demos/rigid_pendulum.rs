use symdyn::*;

/// A uniform rod swinging about one end, with its accelerations solved
/// symbolically once before integration.
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut system = System::new();
    let (q, q_d, _) = system.differentiable("q")?.triple().ok_or("missing derivatives")?;
    let m = system.constant("m", 1.0)?;
    let g = system.constant("g", 9.81)?;
    let length = 0.8;

    let center = Vector::new(q.sin(), -q.cos(), Expr::zero()) * (0.5 * length);
    let inertia = Dyadic::from_dmat3(DMat3::from_diagonal(DVec3::new(
        0.0,
        0.0,
        length * length / 12.0,
    )))
    .scale(&m.expr());
    let rod = Body::new(
        &mut system,
        "rod",
        center,
        Vector::along(DVec3::Z, &q_d),
        m.expr(),
        inertia,
    );
    system.add_gravity(&Vector::along(DVec3::NEG_Y, &g.expr()));

    let config = SolverConfig::default().with_scalar_caching(true);
    let space = system.assembler()?.pre_invert(&config)?;
    let times = linspace(0.0, 2.0, 21);
    let trajectory = Integrator::new(1e-3, 1).integrate(&space, &[0.5, 0.0], &times)?;

    let outputs = Output::new(
        &[rod.position().x.clone(), rod.position().y.clone()],
        &system,
    )?
    .calc(&trajectory)?;
    for (i, time) in trajectory.times.iter().enumerate() {
        println!(
            "t = {time:3.1}  center = ({:+.4}, {:+.4})",
            outputs[(i, 0)],
            outputs[(i, 1)]
        );
    }
    Ok(())
}
