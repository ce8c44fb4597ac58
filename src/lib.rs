pub mod config;
pub mod constraint;
pub mod emitter;
pub mod error;
pub mod grid;
pub mod initial_condition;
pub mod particle;
pub mod simulation;
pub mod solver;
pub mod statistics;

extern crate nalgebra as na;

pub use config::SimulationConfig;
pub use constraint::Constraint;
pub use emitter::ParticleEmitter;
pub use error::SolverError;
pub use grid::{GridCell, SpatialGrid};
pub use particle::{Particle, ParticleStore};
pub use simulation::{ParticleVertex, Simulation};
pub use solver::{CollisionStrategy, ParallelCollisionResolver, Solver, SolverParameters};
pub use statistics::SimulationStatistics;

pub type Scalar = f32;
pub type Vec2 = na::Vector2<Scalar>;
