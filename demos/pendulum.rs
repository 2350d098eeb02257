use symdyn::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut system = System::new();
    let (q, _, _) = system.differentiable("q")?.triple().ok_or("missing derivatives")?;
    let l = system.constant("l", 1.0)?;
    let m = system.constant("m", 1.0)?;
    let g = system.constant("g", 9.81)?;

    let position = Vector::new(q.sin(), -q.cos(), Expr::zero()).scale(&l.expr());
    Particle::new(&mut system, "bob", position, m.expr());
    system.add_gravity(&Vector::along(DVec3::NEG_Y, &g.expr()));

    let space = system
        .assembler()?
        .post_invert(&SolverConfig::default())?;
    let times = linspace(0.0, 5.0, 51);
    let trajectory = Integrator::new(1e-3, 1).integrate(&space, &[1.0, 0.0], &times)?;

    let energy = system.kinetic_energy() + system.gravity_potential_energy(&Vector::zero());
    let outputs = Output::new(&[energy], &system)?.calc(&trajectory)?;
    for (i, time) in trajectory.times.iter().enumerate().step_by(10) {
        println!(
            "t = {time:4.1}  q = {:+.4}  energy = {:.6}",
            trajectory.states[i][0],
            outputs[(i, 0)]
        );
    }
    Ok(())
}
