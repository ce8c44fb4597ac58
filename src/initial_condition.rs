use itertools::iproduct;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::SolverError;
use crate::particle::{Particle, ParticleStore};
use crate::{Scalar, Vec2};

pub trait InitialCondition {
    fn add_particles(&self, store: &mut ParticleStore);
}

/// A jittered lattice of particles filling `bounds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub bounds: Range<Vec2>,
    pub spacing: Scalar,
    /// The maximum random offset applied to each lattice point, per axis
    pub jitter: Vec2,
    pub radius: Scalar,
    pub seed: u64,
}

impl Default for Block {
    fn default() -> Self {
        Block {
            bounds: Vec2::new(-200., -100.)..Vec2::new(200., 100.),
            spacing: 14.,
            jitter: Vec2::from_element(14. / 8.),
            radius: 6.,
            seed: 0,
        }
    }
}

impl Block {
    pub fn validate(&self) -> Result<(), SolverError> {
        validate_bounds(&self.bounds)?;
        validate_radius(self.radius)?;
        if !(self.spacing.is_finite() && self.spacing > 0.) {
            return Err(SolverError::invalid(
                "spacing",
                format!("must be a positive number, got {}", self.spacing),
            ));
        }
        if !self.jitter.iter().all(|j| j.is_finite() && *j >= 0.) {
            return Err(SolverError::invalid("jitter", "must be finite and non-negative"));
        }
        Ok(())
    }
}

impl InitialCondition for Block {
    fn add_particles(&self, store: &mut ParticleStore) {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let min = self.bounds.start;
        let max = self.bounds.end;

        let counts = ((max - min) / self.spacing).map(|x| x.ceil().max(0.) as usize);

        for (j, i) in iproduct!(0..counts.y, 0..counts.x) {
            let pos = Vec2::new(i as Scalar, j as Scalar) * self.spacing + min;

            let rand: Vec2 = rng.gen::<[Scalar; 2]>().into();
            let jitter = rand.component_mul(&self.jitter) - self.jitter / 2.;

            store.push(Particle::new(pos + jitter, self.radius));
        }
    }
}

/// Particles dropped at uniformly random positions inside `bounds`. They may overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scatter {
    pub bounds: Range<Vec2>,
    pub count: usize,
    pub radius: Scalar,
    pub seed: u64,
}

impl Default for Scatter {
    fn default() -> Self {
        Scatter {
            bounds: Vec2::new(-540., -380.)..Vec2::new(540., 380.),
            count: 1000,
            radius: 6.,
            seed: 0,
        }
    }
}

impl Scatter {
    pub fn validate(&self) -> Result<(), SolverError> {
        validate_bounds(&self.bounds)?;
        validate_radius(self.radius)
    }
}

impl InitialCondition for Scatter {
    fn add_particles(&self, store: &mut ParticleStore) {
        let mut rng = StdRng::seed_from_u64(self.seed);

        for _ in 0..self.count {
            let rand: Vec2 = rng.gen::<[Scalar; 2]>().into();
            let pos = self.bounds.start + rand.component_mul(&(self.bounds.end - self.bounds.start));

            store.push(Particle::new(pos, self.radius));
        }
    }
}

/// Any of the initial conditions, as they appear in a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitialConditionConfig {
    Block(Block),
    Scatter(Scatter),
}

impl InitialConditionConfig {
    pub fn validate(&self) -> Result<(), SolverError> {
        match self {
            InitialConditionConfig::Block(block) => block.validate(),
            InitialConditionConfig::Scatter(scatter) => scatter.validate(),
        }
    }
}

fn validate_bounds(bounds: &Range<Vec2>) -> Result<(), SolverError> {
    let finite = bounds
        .start
        .iter()
        .chain(bounds.end.iter())
        .all(|x| x.is_finite());
    if !finite {
        return Err(SolverError::invalid("bounds", "must be finite"));
    }
    if bounds.start.x > bounds.end.x || bounds.start.y > bounds.end.y {
        return Err(SolverError::invalid("bounds", "start must not be past end"));
    }
    Ok(())
}

fn validate_radius(radius: Scalar) -> Result<(), SolverError> {
    if !(radius.is_finite() && radius > 0.) {
        return Err(SolverError::invalid(
            "radius",
            format!("must be a positive number, got {}", radius),
        ));
    }
    Ok(())
}

impl InitialCondition for InitialConditionConfig {
    fn add_particles(&self, store: &mut ParticleStore) {
        match self {
            InitialConditionConfig::Block(block) => block.add_particles(store),
            InitialConditionConfig::Scatter(scatter) => scatter.add_particles(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_fills_lattice_without_overlap() {
        let block = Block {
            bounds: Vec2::new(0., 0.)..Vec2::new(100., 50.),
            spacing: 10.,
            jitter: Vec2::from_element(1.),
            radius: 4.,
            seed: 7,
        };
        let mut store = ParticleStore::new();
        block.add_particles(&mut store);

        assert_eq!(store.len(), 10 * 5);
        for (i, a) in store.iter().enumerate() {
            for b in store.iter().skip(i + 1) {
                assert!((a.position - b.position).magnitude() >= 8.);
            }
        }
    }

    #[test]
    fn defaults_are_valid() {
        Block::default().validate().unwrap();
        Scatter::default().validate().unwrap();
    }

    #[test]
    fn degenerate_shapes_are_rejected() {
        let zero_spacing = Block {
            spacing: 0.,
            ..Block::default()
        };
        assert!(matches!(
            zero_spacing.validate(),
            Err(SolverError::InvalidParameter { name: "spacing", .. })
        ));

        let negative_radius = Block {
            radius: -3.,
            ..Block::default()
        };
        assert!(matches!(
            negative_radius.validate(),
            Err(SolverError::InvalidParameter { name: "radius", .. })
        ));

        let negative_jitter = Block {
            jitter: Vec2::new(1., -1.),
            ..Block::default()
        };
        assert!(matches!(
            negative_jitter.validate(),
            Err(SolverError::InvalidParameter { name: "jitter", .. })
        ));

        let inverted = Scatter {
            bounds: Vec2::new(10., 0.)..Vec2::new(-10., 5.),
            ..Scatter::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(SolverError::InvalidParameter { name: "bounds", .. })
        ));

        let infinite = Scatter {
            bounds: Vec2::new(0., 0.)..Vec2::new(Scalar::INFINITY, 5.),
            ..Scatter::default()
        };
        assert!(infinite.validate().is_err());

        let zero_radius = Scatter {
            radius: 0.,
            ..Scatter::default()
        };
        assert!(zero_radius.validate().is_err());
    }

    #[test]
    fn scatter_is_reproducible_and_bounded() {
        let scatter = Scatter {
            count: 300,
            ..Scatter::default()
        };

        let mut first = ParticleStore::new();
        let mut second = ParticleStore::new();
        scatter.add_particles(&mut first);
        scatter.add_particles(&mut second);

        assert_eq!(first.len(), 300);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.position, b.position);
            assert!(a.position.x >= -540. && a.position.x <= 540.);
            assert!(a.position.y >= -380. && a.position.y <= 380.);
        }
    }
}
