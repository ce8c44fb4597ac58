use serde::{Deserialize, Serialize};

use crate::particle::{Particle, ParticleStore};
use crate::{Scalar, Vec2};

/// Spawns a fixed number of particles, one at a time, from a single point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleEmitter {
    pub spawn_position: Vec2,
    /// Initial displacement per sub-step of each spawned particle
    pub spawn_velocity: Vec2,
    pub spawn_radius: Scalar,
    pub particles_left_to_spawn: usize,
}

impl ParticleEmitter {
    pub fn new(
        particle_count: usize,
        spawn_position: Vec2,
        spawn_velocity: Vec2,
        spawn_radius: Scalar,
    ) -> Self {
        ParticleEmitter {
            spawn_position,
            spawn_velocity,
            spawn_radius,
            particles_left_to_spawn: particle_count,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.particles_left_to_spawn == 0
    }

    /// Pushes one particle into `store`, returning its index, or `None` once the emitter has
    /// run out of particles.
    pub fn spawn(&mut self, store: &mut ParticleStore) -> Option<usize> {
        if self.is_exhausted() {
            return None;
        }

        self.particles_left_to_spawn -= 1;
        Some(store.push(Particle::with_velocity(
            self.spawn_position,
            self.spawn_velocity,
            self.spawn_radius,
        )))
    }
}

/// Two emitters just inside the left and right walls of a world of the given half extent,
/// firing towards each other and slightly upwards.
pub fn facing_pair(half_extent: Vec2, particles_each: usize) -> Vec<ParticleEmitter> {
    let height = half_extent.y - 100.;
    vec![
        ParticleEmitter::new(
            particles_each,
            Vec2::new(-half_extent.x + 15., height),
            Vec2::new(1.7, 0.6),
            6.,
        ),
        ParticleEmitter::new(
            particles_each,
            Vec2::new(half_extent.x - 15., height),
            Vec2::new(-1.7, 0.6),
            6.,
        ),
    ]
}
