use itertools::Itertools;
use std::ops::Range;

use crate::particle::ParticleStore;
use crate::{Scalar, Vec2};

/// Aggregate quantities used to compare runs and to keep an eye on a running simulation.
///
/// Particle mass is taken to be proportional to its area, i.e. `radius^2`.
pub trait SimulationStatistics {
    fn particle_count(&self) -> usize;
    fn total_mass(&self) -> Scalar;
    /// Mass weighted mean position
    fn centroid(&self) -> Option<Vec2>;
    /// Kinetic energy, using the implicit Verlet velocity over a sub-step of length `sub_dt`
    fn total_kinetic_energy(&self, sub_dt: Scalar) -> Scalar;
    /// The deepest overlap between any two particles. Checks every pair.
    fn max_penetration(&self) -> Scalar;
    /// The smallest axis aligned box containing every particle center
    fn extent(&self) -> Option<Range<Vec2>>;
}

impl SimulationStatistics for ParticleStore {
    fn particle_count(&self) -> usize {
        self.len()
    }

    fn total_mass(&self) -> Scalar {
        self.iter().map(|p| p.radius() * p.radius()).sum()
    }

    fn centroid(&self) -> Option<Vec2> {
        let mass = self.total_mass();
        if self.is_empty() || mass <= 0. {
            return None;
        }

        let weighted: Vec2 = self
            .iter()
            .map(|p| p.position * (p.radius() * p.radius()))
            .sum();
        Some(weighted / mass)
    }

    fn total_kinetic_energy(&self, sub_dt: Scalar) -> Scalar {
        self.iter()
            .map(|p| {
                let v = p.velocity() / sub_dt;
                0.5 * p.radius() * p.radius() * v.dot(&v)
            })
            .sum()
    }

    fn max_penetration(&self) -> Scalar {
        self.iter()
            .tuple_combinations()
            .map(|(a, b)| a.radius() + b.radius() - (a.position - b.position).magnitude())
            .fold(0., Scalar::max)
    }

    fn extent(&self) -> Option<Range<Vec2>> {
        let mut positions = self.positions();
        let first = positions.next()?;

        Some(positions.fold(first..first, |range, p| {
            range.start.inf(&p)..range.end.sup(&p)
        }))
    }
}
