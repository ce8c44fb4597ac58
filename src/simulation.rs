use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::emitter::ParticleEmitter;
use crate::error::SolverError;
use crate::grid::SpatialGrid;
use crate::initial_condition::InitialCondition;
use crate::particle::ParticleStore;
use crate::solver::Solver;

/// What a renderer needs to draw a particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleVertex {
    pub position: [f32; 2],
    pub radius: f32,
}

/// Contains all of the state for a running simulation: the particles, the grid, the solver
/// and the emitters feeding it.
#[derive(Debug)]
pub struct Simulation {
    pub store: ParticleStore,
    pub grid: SpatialGrid,
    pub solver: Solver,
    pub emitters: Vec<ParticleEmitter>,
    spawn_interval: usize,
    frame: usize,
}

impl Simulation {
    /// Creates a new simulation from the given configuration.
    pub fn new(config: &SimulationConfig) -> Result<Self, SolverError> {
        config.validate()?;

        let mut solver = Solver::from_params(config.solver.clone())?;
        solver.set_constraint(config.constraint());
        solver.set_collision_strategy(config.collision.build()?);

        let mut store = ParticleStore::new();
        if let Some(initial) = &config.initial_condition {
            initial.add_particles(&mut store);
        }

        tracing::debug!(
            particles = store.len(),
            emitters = config.emitters.len(),
            "simulation created"
        );

        Ok(Simulation {
            store,
            grid: config.grid.build(),
            solver,
            emitters: config.emitters.clone(),
            spawn_interval: config.spawn_interval,
            frame: 0,
        })
    }

    /// The number of frames simulated so far.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Spawns from the emitters (if it is time to), advances the solver by one step and
    /// returns the particles as they should be drawn.
    pub fn simulate_frame(&mut self) -> Result<Vec<ParticleVertex>, SolverError> {
        if self.frame % self.spawn_interval == 0 {
            self.spawn();
        }

        self.solver.step(&mut self.store, &mut self.grid)?;
        self.frame += 1;

        Ok(self.vertices())
    }

    /// Returns an array of `ParticleVertex`es, to be passed to a renderer.
    pub fn vertices(&self) -> Vec<ParticleVertex> {
        self.store
            .iter()
            .map(|p| ParticleVertex {
                position: [p.position.x, p.position.y],
                radius: p.radius(),
            })
            .collect()
    }

    fn spawn(&mut self) {
        let store = &mut self.store;
        let spawned = self
            .emitters
            .iter_mut()
            .filter_map(|emitter| emitter.spawn(store))
            .count();

        if spawned > 0 {
            tracing::debug!(spawned, total = store.len(), "spawned particles");
        }
    }
}
