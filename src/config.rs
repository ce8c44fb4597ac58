use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;
use crate::emitter::{self, ParticleEmitter};
use crate::error::SolverError;
use crate::grid::SpatialGrid;
use crate::initial_condition::InitialConditionConfig;
use crate::solver::{CollisionStrategy, ParallelCollisionResolver, SolverParameters};
use crate::{Scalar, Vec2};

/// Everything needed to set up a `Simulation`. Every section has a default, so a
/// configuration file only needs to mention what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub solver: SolverParameters,
    pub grid: GridConfig,
    /// Defaults to a box covering the whole grid
    pub constraint: Option<Constraint>,
    pub collision: CollisionConfig,
    pub emitters: Vec<ParticleEmitter>,
    /// Particles placed before the first frame
    pub initial_condition: Option<InitialConditionConfig>,
    /// Every emitter spawns one particle every `spawn_interval` frames
    pub spawn_interval: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let grid = GridConfig::default();
        SimulationConfig {
            solver: SolverParameters::default(),
            emitters: emitter::facing_pair(grid.half_extent(), 2000),
            grid,
            constraint: None,
            collision: CollisionConfig::default(),
            initial_condition: None,
            spawn_interval: 1,
        }
    }
}

impl SimulationConfig {
    /// The constraint the solver should use.
    pub fn constraint(&self) -> Constraint {
        self.constraint.unwrap_or_else(|| {
            let half = self.grid.half_extent();
            Constraint::Box {
                min: -half,
                max: half,
            }
        })
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        self.solver.validate()?;
        self.grid.validate()?;
        self.collision.validate()?;

        match self.constraint() {
            Constraint::Circle { radius, .. } if !(radius > 0.) => {
                return Err(SolverError::invalid("constraint", "circle radius must be positive"));
            }
            Constraint::Box { min, max } if !(min.x < max.x && min.y < max.y) => {
                return Err(SolverError::invalid(
                    "constraint",
                    "box min must be below and left of max",
                ));
            }
            _ => {}
        }

        if self.emitters.iter().any(|e| !(e.spawn_radius > 0.)) {
            return Err(SolverError::invalid("emitters", "spawn radius must be positive"));
        }
        if self.spawn_interval == 0 {
            return Err(SolverError::invalid("spawn_interval", "must be at least 1"));
        }
        if let Some(initial) = &self.initial_condition {
            initial.validate()?;
        }

        Ok(())
    }
}

/// Dimensions of the spatial grid, in cells and in world units per cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    pub cell_width: Scalar,
    pub cell_height: Scalar,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            width: 56,
            height: 40,
            cell_width: 20.,
            cell_height: 20.,
        }
    }
}

impl GridConfig {
    pub fn half_extent(&self) -> Vec2 {
        Vec2::new(
            self.width as Scalar * self.cell_width / 2.,
            self.height as Scalar * self.cell_height / 2.,
        )
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        if self.width == 0 || self.height == 0 {
            return Err(SolverError::invalid("grid", "needs at least one cell"));
        }
        if !(self.cell_width > 0. && self.cell_height > 0.) {
            return Err(SolverError::invalid("grid", "cell size must be positive"));
        }
        Ok(())
    }

    pub fn build(&self) -> SpatialGrid {
        SpatialGrid::new(self.width, self.height, self.cell_width, self.cell_height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollisionConfig {
    BruteForce,
    Grid,
    ParallelGrid { section_count: usize },
}

impl Default for CollisionConfig {
    fn default() -> Self {
        CollisionConfig::ParallelGrid {
            section_count: num_cpus::get().max(1),
        }
    }
}

impl CollisionConfig {
    pub fn validate(&self) -> Result<(), SolverError> {
        match self {
            CollisionConfig::ParallelGrid { section_count: 0 } => Err(SolverError::invalid(
                "section_count",
                "at least one section is required",
            )),
            _ => Ok(()),
        }
    }

    pub fn build(&self) -> Result<CollisionStrategy, SolverError> {
        Ok(match *self {
            CollisionConfig::BruteForce => CollisionStrategy::BruteForce,
            CollisionConfig::Grid => CollisionStrategy::Grid,
            CollisionConfig::ParallelGrid { section_count } => {
                CollisionStrategy::ParallelGrid(ParallelCollisionResolver::new(section_count)?)
            }
        })
    }
}
