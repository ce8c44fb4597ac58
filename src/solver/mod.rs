pub mod collision;
pub mod parallel;

pub use collision::{
    solve_collisions_brute_force, solve_collisions_with_grid, solve_particle_collision,
};
pub use parallel::{partition_columns, ParallelCollisionResolver};

use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;
use crate::error::SolverError;
use crate::grid::SpatialGrid;
use crate::particle::ParticleStore;
use crate::{Scalar, Vec2};

/// A struct containing all of the high-level parameters for the solver
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParameters {
    /// The time covered by a single call to `Solver::step`
    pub delta_time: Scalar,
    /// The number of sub-steps each step is split into. More sub-steps give stiffer, less
    /// overlapping piles at a higher cost.
    pub sub_steps: usize,
    /// The acceleration applied to every particle
    pub gravity: Vec2,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            delta_time: 0.004,
            sub_steps: 8,
            gravity: Vec2::new(0., -5000.),
        }
    }
}

impl SolverParameters {
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.sub_steps == 0 {
            return Err(SolverError::invalid("sub_steps", "must be at least 1"));
        }
        if !(self.delta_time.is_finite() && self.delta_time > 0.) {
            return Err(SolverError::invalid(
                "delta_time",
                format!("must be a positive number, got {}", self.delta_time),
            ));
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(SolverError::invalid("gravity", "must be finite"));
        }
        Ok(())
    }
}

/// How the collision phase of a sub-step finds overlapping particles.
#[derive(Debug)]
pub enum CollisionStrategy {
    /// Check every pair of particles. Only sensible for small particle counts or as a
    /// reference to compare the other strategies against. The grid is still rebuilt every
    /// sub-step, it just isn't used for the search.
    BruteForce,
    /// Check each grid cell against its 3x3 neighbourhood on the calling thread.
    Grid,
    /// Like `Grid`, but split into column sections solved on a worker pool.
    ParallelGrid(ParallelCollisionResolver),
}

impl Default for CollisionStrategy {
    fn default() -> Self {
        CollisionStrategy::Grid
    }
}

/// Position based (Verlet) particle solver.
#[derive(Debug)]
pub struct Solver {
    params: SolverParameters,
    constraint: Option<Constraint>,
    collisions: CollisionStrategy,
}

impl Solver {
    /// Creates a solver with the default gravity, no constraint and serial grid collisions.
    /// A `sub_steps` of zero is treated as one.
    pub fn new(delta_time: Scalar, sub_steps: usize) -> Self {
        if sub_steps == 0 {
            tracing::warn!("solver created with zero sub-steps, using one instead");
        }

        Solver {
            params: SolverParameters {
                delta_time,
                sub_steps: sub_steps.max(1),
                ..SolverParameters::default()
            },
            constraint: None,
            collisions: CollisionStrategy::default(),
        }
    }

    pub fn from_params(params: SolverParameters) -> Result<Self, SolverError> {
        params.validate()?;
        Ok(Solver {
            params,
            constraint: None,
            collisions: CollisionStrategy::default(),
        })
    }

    pub fn params(&self) -> &SolverParameters {
        &self.params
    }

    pub fn set_constraint(&mut self, constraint: Constraint) {
        self.constraint = Some(constraint);
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.params.gravity = gravity;
    }

    pub fn gravity(&self) -> Vec2 {
        self.params.gravity
    }

    pub fn set_collision_strategy(&mut self, strategy: CollisionStrategy) {
        self.collisions = strategy;
    }

    pub fn collision_strategy(&self) -> &CollisionStrategy {
        &self.collisions
    }

    pub fn delta_time(&self) -> Scalar {
        self.params.delta_time
    }

    pub fn sub_steps(&self) -> usize {
        self.params.sub_steps
    }

    /// The time covered by one sub-step.
    pub fn sub_dt(&self) -> Scalar {
        self.params.delta_time / self.params.sub_steps as Scalar
    }

    /// Advances the simulation by `delta_time`, split into `sub_steps` sub-steps.
    ///
    /// If a collision worker fails, the error is returned immediately and the particles are
    /// left as they were at the point of failure.
    pub fn step(&self, store: &mut ParticleStore, grid: &mut SpatialGrid) -> Result<(), SolverError> {
        let _span = tracing::debug_span!("step", particles = store.len()).entered();

        let sub_dt = self.sub_dt();
        for _ in 0..self.params.sub_steps {
            self.sub_step(store, grid, sub_dt)?;
        }

        Ok(())
    }

    fn sub_step(
        &self,
        store: &mut ParticleStore,
        grid: &mut SpatialGrid,
        sub_dt: Scalar,
    ) -> Result<(), SolverError> {
        self.apply_gravity(store);
        self.update_positions(store, sub_dt);

        // Rebuilt for every strategy so the caller's grid always matches the store
        grid.rebuild(store);

        match &self.collisions {
            CollisionStrategy::BruteForce => solve_collisions_brute_force(store),
            CollisionStrategy::Grid => solve_collisions_with_grid(store, grid),
            CollisionStrategy::ParallelGrid(resolver) => resolver.resolve(store, grid)?,
        }

        Ok(())
    }

    fn apply_gravity(&self, store: &mut ParticleStore) {
        let gravity = self.params.gravity;
        store.iter_mut().for_each(|p| p.accelerate(gravity));
    }

    fn update_positions(&self, store: &mut ParticleStore, sub_dt: Scalar) {
        for particle in store.iter_mut() {
            particle.update_position(sub_dt);

            // If the particle is outside the constraint, move it back
            if let Some(constraint) = &self.constraint {
                constraint.apply(particle);
            }
        }
    }
}
