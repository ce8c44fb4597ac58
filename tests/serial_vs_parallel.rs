use verlet_sim::config::CollisionConfig;
use verlet_sim::initial_condition::{InitialCondition, Scatter};
use verlet_sim::{
    CollisionStrategy, Constraint, ParallelCollisionResolver, ParticleStore, Simulation,
    SimulationConfig, SimulationStatistics, Solver, SpatialGrid, Vec2,
};

fn scattered() -> ParticleStore {
    let mut store = ParticleStore::new();
    Scatter {
        bounds: Vec2::new(-540., -380.)..Vec2::new(540., 380.),
        count: 1000,
        radius: 6.,
        seed: 42,
    }
    .add_particles(&mut store);
    store
}

fn run(strategy: CollisionStrategy, ticks: usize) -> (ParticleStore, Solver) {
    let mut solver = Solver::new(0.004, 8);
    solver.set_constraint(Constraint::centered_box(Vec2::zeros(), Vec2::new(1120., 800.)));
    solver.set_collision_strategy(strategy);

    let mut grid = SpatialGrid::new(56, 40, 20., 20.);
    let mut store = scattered();
    for _ in 0..ticks {
        solver.step(&mut store, &mut grid).unwrap();
    }

    (store, solver)
}

fn assert_sane(store: &ParticleStore, constraint: &Constraint) {
    for p in store.iter() {
        assert!(p.position.iter().all(|x| x.is_finite()));
        assert!(constraint.contains(p.position, p.radius(), 3.0), "{:?}", p.position);
    }
}

#[test]
fn serial_and_parallel_grids_agree_on_aggregates() {
    let (serial, solver) = run(CollisionStrategy::Grid, 100);
    let (parallel, _) = run(
        CollisionStrategy::ParallelGrid(ParallelCollisionResolver::new(8).unwrap()),
        100,
    );

    let constraint = *solver.constraint().unwrap();
    assert_sane(&serial, &constraint);
    assert_sane(&parallel, &constraint);
    assert_eq!(serial.particle_count(), parallel.particle_count());

    let serial_centroid = serial.centroid().unwrap();
    let parallel_centroid = parallel.centroid().unwrap();
    assert!(
        (serial_centroid - parallel_centroid).magnitude() < 40.,
        "{:?} vs {:?}",
        serial_centroid,
        parallel_centroid
    );

    // Both runs start at rest and lose energy the same way, so their kinetic energies stay
    // within a small factor of each other
    let sub_dt = solver.sub_dt();
    let serial_energy = serial.total_kinetic_energy(sub_dt);
    let parallel_energy = parallel.total_kinetic_energy(sub_dt);
    let ratio = parallel_energy / serial_energy;
    assert!(ratio > 0.5 && ratio < 2.0, "{} vs {}", serial_energy, parallel_energy);
}

#[test]
fn emitters_fill_the_default_world() {
    let mut config = SimulationConfig::default();
    config.collision = CollisionConfig::ParallelGrid { section_count: 4 };
    for emitter in &mut config.emitters {
        emitter.particles_left_to_spawn = 150;
    }

    let mut simulation = Simulation::new(&config).unwrap();
    let mut vertices = Vec::new();
    for _ in 0..600 {
        vertices = simulation.simulate_frame().unwrap();
    }

    assert_eq!(vertices.len(), 300);
    assert_sane(&simulation.store, &config.constraint());
    // Everything has fallen into the lower half
    let centroid = simulation.store.centroid().unwrap();
    assert!(centroid.y < 0., "{:?}", centroid);
}
