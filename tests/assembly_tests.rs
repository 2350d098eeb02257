use std::collections::HashMap;

use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector};
use symdyn::dynamics::generalize;
use symdyn::*;

fn planar_particle(mass: f64) -> (System, Expr, Expr) {
    let mut system = System::new();
    let (x, _, _) = system.differentiable("x").unwrap().triple().unwrap();
    let (y, _, _) = system.differentiable("y").unwrap().triple().unwrap();
    let m = system.constant("m", mass).unwrap();
    let g = system.constant("g", 9.81).unwrap();
    Particle::new(
        &mut system,
        "p",
        Vector::new(x.clone(), y.clone(), Expr::zero()),
        m.expr(),
    );
    system.add_gravity(&Vector::along(DVec3::NEG_Y, &g.expr()));
    (system, x, y)
}

/// Two point masses hanging from each other, in absolute angles.
fn double_pendulum() -> System {
    let mut system = System::new();
    let (q1, _, _) = system.differentiable("q1").unwrap().triple().unwrap();
    let (q2, _, _) = system.differentiable("q2").unwrap().triple().unwrap();
    let l1 = system.constant("l1", 1.0).unwrap();
    let l2 = system.constant("l2", 0.7).unwrap();
    let m1 = system.constant("m1", 2.0).unwrap();
    let m2 = system.constant("m2", 0.5).unwrap();
    let g = system.constant("g", 9.81).unwrap();

    let p1 = Vector::new(q1.sin(), -q1.cos(), Expr::zero()).scale(&l1.expr());
    let p2 = &p1 + &Vector::new(q2.sin(), -q2.cos(), Expr::zero()).scale(&l2.expr());
    Particle::new(&mut system, "a", p1, m1.expr());
    Particle::new(&mut system, "b", p2, m2.expr());
    system.add_gravity(&Vector::along(DVec3::NEG_Y, &g.expr()));
    system
}

#[test]
fn declaration_order_fixes_state_and_jacobian_layout() {
    let mut system = System::new();
    let coordinates: Vec<_> = ["c", "a", "b"]
        .iter()
        .map(|name| system.differentiable(name).unwrap())
        .collect();
    let residual: Vec<Expr> = coordinates
        .iter()
        .enumerate()
        .map(|(i, q)| (i + 1) as f64 * q.expr(2).unwrap())
        .collect();

    let names: Vec<_> = system
        .state_variables()
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(names, ["c", "a", "b", "c_d", "a_d", "b_d"]);

    let assembler = EquationAssembler::from_residual(&system, residual).unwrap();
    let first = assembler.assemble(true);
    for i in 0..3 {
        assert_eq!(first.a.get(i, i).as_constant(), Some((i + 1) as f64));
    }
    assert_eq!(first, assembler.assemble(true));
}

#[test]
fn generalized_forces_are_linear_in_contributions() {
    let mut system = System::new();
    let (q, q_d, _) = system.differentiable("q").unwrap().triple().unwrap();
    let (r, r_d, _) = system.differentiable("r").unwrap().triple().unwrap();
    let position = Vector::new(&r * q.cos(), &r * q.sin(), Expr::zero());
    let velocity = system.time_derivative_vector(&position);
    let f1 = Vector::from_dvec3(DVec3::new(1.0, -2.0, 0.5));
    let f2 = Vector::new(q.sin(), r.clone(), Expr::one());

    let velocities = system.registry().coordinates(1);
    let separate: Vec<Expr> = generalize(
        &[
            Contribution::new(f1.clone(), velocity.clone()),
            Contribution::new(f2.clone(), velocity.clone()),
        ],
        velocities,
    );
    let combined = generalize(&[Contribution::new(&f1 + &f2, velocity)], velocities);

    let mut values = HashMap::new();
    for (expr, value) in [(&q, 0.3), (&q_d, -1.2), (&r, 1.7), (&r_d, 0.4)] {
        values.insert(expr.as_symbol().unwrap().clone(), value);
    }
    for (a, b) in separate.iter().zip(&combined) {
        assert_relative_eq!(
            a.evaluate(&values).unwrap(),
            b.evaluate(&values).unwrap(),
            epsilon = 1e-12
        );
    }
}

#[test]
fn free_particle_recovers_force_over_mass() {
    let mut system = System::new();
    let position = Vector::new(
        system.differentiable("x").unwrap().expr(0).unwrap(),
        system.differentiable("y").unwrap().expr(0).unwrap(),
        system.differentiable("z").unwrap().expr(0).unwrap(),
    );
    let particle = Particle::new(&mut system, "p", position, Expr::constant(2.0));
    system.add_force(
        Vector::from_dvec3(DVec3::new(1.0, -2.0, 3.0)),
        particle.velocity().clone(),
    );

    let space = system
        .assembler()
        .unwrap()
        .post_invert(&SolverConfig::default())
        .unwrap();
    let state = [0.1, 0.2, 0.3, 1.0, 2.0, 3.0];
    let numeric = space.numeric_system(&state, None, None).unwrap();
    assert_eq!(numeric.a, DMatrix::identity(3, 3) * 2.0);
    assert_eq!(numeric.b, DVector::from_vec(vec![1.0, -2.0, 3.0]));

    let derivative = space.derivative(&state, 0.0).unwrap();
    assert_eq!(&derivative[..3], &state[3..]);
    for (a, f) in derivative[3..].iter().zip([1.0, -2.0, 3.0]) {
        assert_relative_eq!(*a, f / 2.0, epsilon = 1e-12);
    }
}

#[test]
fn inactive_constraint_leaves_reduced_system_full_rank() {
    let mut system = System::new();
    let (x, _, _) = system.differentiable("x").unwrap().triple().unwrap();
    let (y, _, _) = system.differentiable("y").unwrap().triple().unwrap();
    let (z, _, _) = system.differentiable("z").unwrap().triple().unwrap();
    let g = system.constant("g", 9.81).unwrap();
    Particle::new(
        &mut system,
        "p",
        Vector::new(x.clone(), y.clone(), z.clone()),
        Expr::one(),
    );
    system.add_gravity(&Vector::along(DVec3::NEG_Y, &g.expr()));

    let plane = Constraint::holonomic(system.registry(), z);
    let circle =
        Constraint::holonomic(system.registry(), x.powi(2) + y.powi(2) - 1.0).inactive();
    let space = system
        .assembler()
        .unwrap()
        .with_constraints([plane, circle])
        .post_invert(&SolverConfig::default())
        .unwrap();

    let state = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    let numeric = space.numeric_system(&state, None, None).unwrap();
    assert_eq!(numeric.active_rows, vec![0, 1, 2, 3]);
    assert_eq!(numeric.a.rank(1e-9), 4);

    let derivative = space.derivative(&state, 0.0).unwrap();
    assert_eq!(derivative.len(), 6);
    assert_relative_eq!(derivative[3], 0.0, epsilon = 1e-12);
    assert_relative_eq!(derivative[4], -9.81, epsilon = 1e-12);
    assert_relative_eq!(derivative[5], 0.0, epsilon = 1e-12);
}

#[test]
fn predicate_activity_switches_a_floor_on_below_zero() {
    let (system, _, y) = planar_particle(1.0);
    let floor = Constraint::holonomic(system.registry(), y.clone())
        .with_activity(Activity::Predicate(-y));
    let space = system
        .assembler()
        .unwrap()
        .with_constraint(floor)
        .post_invert(&SolverConfig::default())
        .unwrap();

    let above = [0.0, 0.5, 0.0, 0.0];
    assert_eq!(
        space.active_set(&above).unwrap(),
        Some(ActiveSet::new(vec![false]))
    );
    assert_relative_eq!(space.derivative(&above, 0.0).unwrap()[3], -9.81, epsilon = 1e-12);

    let below = [0.0, -0.1, 0.0, 0.0];
    assert_relative_eq!(space.derivative(&below, 0.0).unwrap()[3], 0.0, epsilon = 1e-12);

    let forced_off = ActiveSet::new(vec![false]);
    let mut out = [0.0; 4];
    space.evaluate(&below, 0.0, Some(&forced_off), &mut out).unwrap();
    assert_relative_eq!(out[3], -9.81, epsilon = 1e-12);
}

#[test]
fn duplicate_constraints_are_singular() {
    let (system, x, _) = planar_particle(1.0);
    let pin = Constraint::holonomic(system.registry(), x - 1.0);
    let assembler = system
        .assembler()
        .unwrap()
        .with_constraints([pin.clone(), pin]);

    let post = assembler.post_invert(&SolverConfig::default()).unwrap();
    let err = post.derivative(&[1.0, 0.0, 0.0, 0.0], 0.0).unwrap_err();
    assert!(matches!(
        err,
        DynamicsError::SingularSystem {
            size: 4,
            origin: "numeric solve"
        }
    ));

    let err = assembler.pre_invert(&SolverConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        DynamicsError::SingularSystem {
            origin: "symbolic inversion",
            ..
        }
    ));
}

#[test]
fn duplicate_circle_constraints_are_singular_when_evaluated() {
    let (system, x, y) = planar_particle(1.0);
    let circle = Constraint::holonomic(system.registry(), x.powi(2) + y.powi(2) - 1.0);
    let assembler = system
        .assembler()
        .unwrap()
        .with_constraints([circle.clone(), circle]);
    let state = [0.6, -0.8, 0.8, 0.6];

    let post = assembler.post_invert(&SolverConfig::default()).unwrap();
    assert!(matches!(
        post.derivative(&state, 0.0).unwrap_err(),
        DynamicsError::SingularSystem { .. }
    ));

    let configs = [
        SolverConfig::default(),
        SolverConfig::default().with_inversion(InversionMethod::Adjugate),
        SolverConfig::default().with_scalar_caching(true),
    ];
    for config in configs {
        let pre = match assembler.pre_invert(&config) {
            Ok(pre) => pre,
            Err(err) => {
                assert!(matches!(err, DynamicsError::SingularSystem { .. }));
                continue;
            }
        };
        let err = pre.derivative(&state, 0.0).unwrap_err();
        assert!(matches!(err, DynamicsError::SingularSystem { .. }), "{err:?}");

        let failure = Integrator::new(1e-2, 1)
            .integrate(&pre, &state, &linspace(0.0, 0.1, 2))
            .unwrap_err();
        assert!(matches!(failure.source, DynamicsError::SingularSystem { .. }));
        assert_eq!(failure.trajectory.len(), 1);
    }
}

#[test]
fn pre_and_post_inversion_agree() {
    let system = double_pendulum();
    let assembler = system.assembler().unwrap();
    let post = assembler.post_invert(&SolverConfig::default()).unwrap();
    let state = [0.4, -0.9, 1.3, 0.2];
    let expected = post.derivative(&state, 0.0).unwrap();

    let configs = [
        SolverConfig::default(),
        SolverConfig::default().with_inversion(InversionMethod::Adjugate),
        SolverConfig::default().with_scalar_caching(true),
    ];
    for config in configs {
        let pre = assembler.pre_invert(&config).unwrap();
        let derivative = pre.derivative(&state, 0.0).unwrap();
        for (a, b) in derivative.iter().zip(&expected) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    let presolved = assembler
        .post_invert(&SolverConfig::default().with_presolved_constants(true))
        .unwrap();
    for (a, b) in presolved.derivative(&state, 0.0).unwrap().iter().zip(&expected) {
        assert_relative_eq!(*a, *b, epsilon = 1e-10);
    }
}

#[test]
fn constrained_pre_inversion_matches_post_inversion() {
    let (system, x, y) = planar_particle(1.5);
    let circle = Constraint::holonomic(system.registry(), x.powi(2) + y.powi(2) - 1.0);
    let assembler = system.assembler().unwrap().with_constraint(circle);
    let state = [0.6, -0.8, 0.8, 0.6];

    let post = assembler
        .post_invert(&SolverConfig::default())
        .unwrap()
        .derivative(&state, 0.0)
        .unwrap();
    let pre = assembler
        .pre_invert(&SolverConfig::default())
        .unwrap()
        .derivative(&state, 0.0)
        .unwrap();
    for (a, b) in pre.iter().zip(&post) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9);
    }
}

#[test]
fn unbound_variable_is_a_compile_error() {
    let (mut system, x, _) = planar_particle(1.0);
    let w = system.variable("w").unwrap();
    let velocity = Vector::new(system.time_derivative(&x), Expr::zero(), Expr::zero());
    system.add_force(Vector::along(DVec3::X, &w.expr()), velocity);

    let err = system
        .assembler()
        .unwrap()
        .post_invert(&SolverConfig::default())
        .unwrap_err();
    assert_eq!(
        err,
        DynamicsError::Compile(CompileError::UnboundSymbol("w".into()))
    );
}

#[test]
fn mismatched_force_lists_are_rejected() {
    let (system, _, _) = planar_particle(1.0);
    let (f, ma) = system.dynamics();
    let err = EquationAssembler::new(&system, f[..1].to_vec(), ma).unwrap_err();
    assert!(matches!(err, ConfigError::CountMismatch { .. }));
}
