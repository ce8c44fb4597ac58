use crate::error::SolverError;
use crate::{Scalar, Vec2};

/// The number of particles a fresh `ParticleStore` has room for before it reallocates.
pub const INITIAL_CAPACITY: usize = 16;

/// A single circular particle. Velocity is implicit: it is the difference between
/// `position` and `last_position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    /// The position one sub-step ago
    pub last_position: Vec2,
    /// Accumulated acceleration, cleared by every call to `update_position`
    pub acceleration: Vec2,
    radius: Scalar,
}

impl Particle {
    /// Creates a particle at rest.
    pub fn new(position: Vec2, radius: Scalar) -> Self {
        debug_assert!(radius > 0., "particle radius must be positive");
        Particle {
            position,
            last_position: position,
            acceleration: Vec2::zeros(),
            radius,
        }
    }

    /// Creates a particle that starts out moving. `velocity` is a displacement per sub-step:
    /// the particle is placed at `position + velocity` and remembers `position` as its last
    /// position.
    pub fn with_velocity(position: Vec2, velocity: Vec2, radius: Scalar) -> Self {
        let mut particle = Particle::new(position, radius);
        particle.position += velocity;
        particle
    }

    pub fn radius(&self) -> Scalar {
        self.radius
    }

    /// The displacement over the last sub-step.
    pub fn velocity(&self) -> Vec2 {
        self.position - self.last_position
    }

    pub fn accelerate(&mut self, acceleration: Vec2) {
        self.acceleration += acceleration;
    }

    /// Verlet integration step.
    pub fn update_position(&mut self, dt: Scalar) {
        let velocity = self.velocity();
        self.last_position = self.position;
        self.position += velocity + self.acceleration * (dt * dt);
        self.acceleration = Vec2::zeros();
    }
}

/// Owns every particle in the simulation. Particles are referred to by their index, which
/// stays valid for as long as the store exists (unless `swap_remove` moves a particle).
#[derive(Debug, Clone)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl Default for ParticleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleStore {
    pub fn new() -> Self {
        ParticleStore {
            particles: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Appends a particle and returns its index.
    pub fn push(&mut self, particle: Particle) -> usize {
        let index = self.particles.len();
        self.particles.push(particle);
        index
    }

    pub fn get(&self, index: usize) -> Result<&Particle, SolverError> {
        let len = self.particles.len();
        self.particles
            .get(index)
            .ok_or(SolverError::IndexOutOfRange { index, len })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Particle, SolverError> {
        let len = self.particles.len();
        self.particles
            .get_mut(index)
            .ok_or(SolverError::IndexOutOfRange { index, len })
    }

    /// Removes the particle at `index` by moving the last particle into its slot.
    ///
    /// Every index below `index` is untouched; the particle that used to be last is now found
    /// at `index`. The solver rebuilds its grid from scratch every sub-step, so calling this
    /// between steps never leaves stale indices behind.
    pub fn swap_remove(&mut self, index: usize) -> Result<Particle, SolverError> {
        let len = self.particles.len();
        if index >= len {
            return Err(SolverError::IndexOutOfRange { index, len });
        }
        Ok(self.particles.swap_remove(index))
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.particles.capacity()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.particles.iter().map(|p| p.position)
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Mutable access to two distinct particles at once. Returns `None` if `a == b` or
    /// either index is out of range.
    pub(crate) fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut Particle, &mut Particle)> {
        if a == b || a >= self.particles.len() || b >= self.particles.len() {
            return None;
        }

        if a < b {
            let (head, tail) = self.particles.split_at_mut(b);
            Some((&mut head[a], &mut tail[0]))
        } else {
            let (head, tail) = self.particles.split_at_mut(a);
            Some((&mut tail[0], &mut head[b]))
        }
    }
}

impl<'a> IntoIterator for &'a ParticleStore {
    type Item = &'a Particle;
    type IntoIter = std::slice::Iter<'a, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.particles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_sequential_indices() {
        let mut store = ParticleStore::new();
        assert!(store.capacity() >= INITIAL_CAPACITY);

        for i in 0..40 {
            let index = store.push(Particle::new(Vec2::new(i as Scalar, 0.), 1.));
            assert_eq!(index, i);
        }

        assert_eq!(store.len(), 40);
        assert_eq!(store.get(17).unwrap().position.x, 17.);
    }

    #[test]
    fn out_of_range_access_fails() {
        let mut store = ParticleStore::new();
        store.push(Particle::new(Vec2::zeros(), 1.));

        assert!(matches!(
            store.get(1),
            Err(SolverError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert!(store.get_mut(5).is_err());
        assert!(store.swap_remove(3).is_err());
    }

    #[test]
    fn swap_remove_keeps_lower_indices() {
        let mut store = ParticleStore::new();
        for i in 0..5 {
            store.push(Particle::new(Vec2::new(i as Scalar, 0.), 1.));
        }

        let removed = store.swap_remove(1).unwrap();
        assert_eq!(removed.position.x, 1.);
        assert_eq!(store.len(), 4);
        assert_eq!(store.get(0).unwrap().position.x, 0.);
        // The last particle moved into the hole
        assert_eq!(store.get(1).unwrap().position.x, 4.);
        assert_eq!(store.get(3).unwrap().position.x, 3.);
    }

    #[test]
    fn pair_mut_rejects_aliasing() {
        let mut store = ParticleStore::new();
        store.push(Particle::new(Vec2::new(0., 0.), 1.));
        store.push(Particle::new(Vec2::new(1., 0.), 1.));

        assert!(store.pair_mut(0, 0).is_none());
        assert!(store.pair_mut(0, 2).is_none());

        let (b, a) = store.pair_mut(1, 0).unwrap();
        assert_eq!(a.position.x, 0.);
        assert_eq!(b.position.x, 1.);
    }

    #[test]
    fn verlet_step_keeps_velocity_and_clears_acceleration() {
        let mut p = Particle::with_velocity(Vec2::zeros(), Vec2::new(1., 0.), 1.);
        assert_eq!(p.velocity(), Vec2::new(1., 0.));

        p.accelerate(Vec2::new(0., -100.));
        p.update_position(0.1);

        assert!((p.position - Vec2::new(2., -1.)).magnitude() < 1e-5);
        assert_eq!(p.last_position, Vec2::new(1., 0.));
        assert_eq!(p.acceleration, Vec2::zeros());
    }
}
