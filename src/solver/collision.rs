use crate::grid::{GridCell, SpatialGrid};
use crate::particle::{Particle, ParticleStore};

/// Anything that can resolve a collision between two particles given their indices.
///
/// The serial solvers resolve directly against the `ParticleStore`, the parallel solver
/// resolves through a view that is shared between worker threads.
pub(crate) trait PairResolver {
    fn resolve_pair(&mut self, a: usize, b: usize);
}

impl PairResolver for ParticleStore {
    fn resolve_pair(&mut self, a: usize, b: usize) {
        if let Some((first, second)) = self.pair_mut(a, b) {
            solve_particle_collision(first, second);
        }
    }
}

/// Pushes two overlapping particles apart along the line between their centers, each by half
/// of the overlap. Returns whether the particles were moved.
///
/// Particles sharing the exact same position have no well defined axis to be pushed along
/// and are left where they are.
pub fn solve_particle_collision(first: &mut Particle, second: &mut Particle) -> bool {
    let collision_axis = first.position - second.position;
    let dist = collision_axis.magnitude();
    let radius_sum = first.radius() + second.radius();

    if dist >= radius_sum || dist <= 0. {
        return false;
    }

    let normal = collision_axis / dist;
    let delta = 0.5 * (radius_sum - dist);

    first.position += normal * delta;
    second.position -= normal * delta;
    true
}

/// The O(n^2) baseline: resolves every unordered pair of particles once.
pub fn solve_collisions_brute_force(store: &mut ParticleStore) {
    let particles = store.as_mut_slice();
    for i in 0..particles.len() {
        let (head, tail) = particles.split_at_mut(i + 1);
        let first = &mut head[i];
        for second in tail {
            solve_particle_collision(first, second);
        }
    }
}

/// Resolves every particle of the grid against its 3x3 neighbourhood on the calling thread.
pub fn solve_collisions_with_grid(store: &mut ParticleStore, grid: &SpatialGrid) {
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            solve_neighbors(store, grid, x, y);
        }
    }
}

/// Resolves the particles of cell `(x, y)` against the particles of every cell around it
/// (the cell itself included).
pub(crate) fn solve_neighbors<P: PairResolver>(
    particles: &mut P,
    grid: &SpatialGrid,
    x: usize,
    y: usize,
) {
    let cell = match grid.cell_at(x, y) {
        Some(cell) if !cell.is_empty() => cell,
        _ => return,
    };

    grid.for_each_3x3_neighbor(x, y, |other| solve_cells(particles, cell, other));
}

fn solve_cells<P: PairResolver>(particles: &mut P, cell: &GridCell, other: &GridCell) {
    for &a in cell.iter() {
        for &b in other.iter() {
            // Don't solve a particle against itself
            if a == b {
                continue;
            }
            particles.resolve_pair(a, b);
        }
    }
}
