use serde::{Deserialize, Serialize};

use crate::particle::Particle;
use crate::{Scalar, Vec2};

/// A boundary that keeps particles inside a region of the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Keeps particles inside a circle.
    Circle { center: Vec2, radius: Scalar },
    /// Keeps particles inside an axis aligned box.
    Box { min: Vec2, max: Vec2 },
}

impl Constraint {
    /// A box centered on `center` with the given full size.
    pub fn centered_box(center: Vec2, size: Vec2) -> Self {
        Constraint::Box {
            min: center - size / 2.,
            max: center + size / 2.,
        }
    }

    /// Moves `particle` back inside the constraint if it has left it.
    pub fn apply(&self, particle: &mut Particle) {
        particle.position = self.clamp(particle.position, particle.radius());
    }

    /// The closest position to `position` at which a particle of radius `radius` lies fully
    /// inside the constraint.
    pub fn clamp(&self, position: Vec2, radius: Scalar) -> Vec2 {
        match *self {
            Constraint::Box { min, max } => {
                let mut clamped = position;
                // Axes are independent, so the order of the checks does not matter
                for i in 0..2 {
                    let lo = min[i] + radius;
                    let hi = max[i] - radius;
                    if clamped[i] < lo {
                        clamped[i] = lo;
                    } else if clamped[i] > hi {
                        clamped[i] = hi;
                    }
                }
                clamped
            }
            Constraint::Circle {
                center,
                radius: constraint_radius,
            } => {
                let to_particle = position - center;
                let dist = to_particle.magnitude();
                let max_dist = constraint_radius - radius;

                // A particle sitting exactly on the center has no direction to be pushed
                // in, leave it alone
                if dist > max_dist && dist > 0. {
                    center + to_particle / dist * max_dist
                } else {
                    position
                }
            }
        }
    }

    /// Checks whether a particle of radius `radius` at `position` lies inside the
    /// constraint, allowing for `tolerance` of floating point slack.
    pub fn contains(&self, position: Vec2, radius: Scalar, tolerance: Scalar) -> bool {
        match *self {
            Constraint::Box { min, max } => (0..2).all(|i| {
                position[i] >= min[i] + radius - tolerance
                    && position[i] <= max[i] - radius + tolerance
            }),
            Constraint::Circle {
                center,
                radius: constraint_radius,
            } => (position - center).magnitude() <= constraint_radius - radius + tolerance,
        }
    }
}
