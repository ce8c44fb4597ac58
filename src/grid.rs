use itertools::iproduct;
use smallvec::SmallVec;
use std::ops::Index;

use crate::particle::ParticleStore;
use crate::{Scalar, Vec2};

/// Represents a single grid cell. A grid cell contains the indices (into the
/// `ParticleStore`) of the particles within it.
///
/// A `SmallVec` is used to prevent unnecessary allocation.
pub type GridCell = SmallVec<[usize; 4]>;

/// A 2d cell coordinate, `(column, row)`.
pub type Coord = (usize, usize);

/// Uniform grid used to narrow collision checks down to nearby particles.
///
/// The grid is centered on the world origin. Rows are counted from the top of the world,
/// so row 0 holds the particles with the largest `y`.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cells: Vec<GridCell>,
    width: usize,
    height: usize,
    cell_width: Scalar,
    cell_height: Scalar,
}

impl SpatialGrid {
    pub fn new(width: usize, height: usize, cell_width: Scalar, cell_height: Scalar) -> Self {
        SpatialGrid {
            cells: vec![GridCell::new(); width * height],
            width,
            height,
            cell_width,
            cell_height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_width(&self) -> Scalar {
        self.cell_width
    }

    pub fn cell_height(&self) -> Scalar {
        self.cell_height
    }

    /// Half of the grid's extent in world space, `(half_width, half_height)`.
    pub fn half_extent(&self) -> Vec2 {
        Vec2::new(
            self.width as Scalar * self.cell_width / 2.,
            self.height as Scalar * self.cell_height / 2.,
        )
    }

    fn coord_to_index(&self, (x, y): Coord) -> usize {
        y * self.width + x
    }

    /// Converts a world space position to the cell containing it, or `None` if the position
    /// lies outside the grid.
    pub fn world_to_cell(&self, position: Vec2) -> Option<Coord> {
        let half = self.half_extent();

        // Flip y so that row 0 is the top of the world
        let x = position.x;
        let y = -position.y;

        let inside_x = x > -half.x && x < half.x;
        let inside_y = y > -half.y && y < half.y;
        if !inside_x || !inside_y {
            return None;
        }

        // Rounding can land exactly on the far edge even though the position is strictly
        // inside, so clamp to the last column/row
        let cell_x = ((x + half.x) / self.cell_width).floor() as usize;
        let cell_y = ((y + half.y) / self.cell_height).floor() as usize;

        Some((
            cell_x.min(self.width.saturating_sub(1)),
            cell_y.min(self.height.saturating_sub(1)),
        ))
    }

    /// Empties every cell, keeping their allocations around for the next rebuild.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| cell.clear());
    }

    /// Inserts the index of every particle in `store` into the cell containing it.
    /// Particles outside the grid are skipped.
    pub fn insert_all(&mut self, store: &ParticleStore) {
        for (index, particle) in store.iter().enumerate() {
            if let Some(coord) = self.world_to_cell(particle.position) {
                let cell = self.coord_to_index(coord);
                self.cells[cell].push(index);
            }
        }
    }

    /// Clears the grid and re-inserts every particle.
    pub fn rebuild(&mut self, store: &ParticleStore) {
        self.clear();
        self.insert_all(store);
    }

    pub fn cell_at(&self, x: usize, y: usize) -> Option<&GridCell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(&self.cells[self.coord_to_index((x, y))])
    }

    /// Calls `f` on every in-bounds cell in the 3x3 block centered on `(x, y)`. Cells past
    /// the edge of the grid are skipped, there is no wraparound.
    pub fn for_each_3x3_neighbor<F>(&self, x: usize, y: usize, mut f: F)
    where
        F: FnMut(&GridCell),
    {
        for (ny, nx) in iproduct!(y.saturating_sub(1)..=y + 1, x.saturating_sub(1)..=x + 1) {
            if let Some(cell) = self.cell_at(nx, ny) {
                f(cell);
            }
        }
    }

    /// Iterates over the indices of every particle in the 3x3 block around `(x, y)`.
    pub fn get_neighbors(&self, (x, y): Coord) -> impl Iterator<Item = usize> + Clone + '_ {
        iproduct!(y.saturating_sub(1)..=y + 1, x.saturating_sub(1)..=x + 1)
            .filter_map(move |(ny, nx)| self.cell_at(nx, ny))
            .flat_map(|cell| cell.iter().copied())
    }

    /// Total number of indices currently stored across all cells.
    pub fn indexed_count(&self) -> usize {
        self.cells.iter().map(|cell| cell.len()).sum()
    }

    #[cfg(test)]
    pub(crate) fn measure_spilled(&self) -> usize {
        self.cells.iter().filter(|x| x.spilled()).count()
    }
}

impl Index<Coord> for SpatialGrid {
    type Output = GridCell;

    fn index(&self, i: Coord) -> &Self::Output {
        match self.cell_at(i.0, i.1) {
            Some(cell) => cell,
            None => panic!("Attempted to get index out of bounds: {:?}", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use proptest::prelude::*;

    fn test_grid() -> SpatialGrid {
        // World bounds are (-560, 560) x (-400, 400)
        SpatialGrid::new(56, 40, 20., 20.)
    }

    #[test]
    fn world_to_cell_uses_flipped_rows() {
        let grid = test_grid();

        assert_eq!(grid.world_to_cell(Vec2::new(0., 0.)), Some((28, 20)));
        // Top left corner of the world is cell (0, 0)
        assert_eq!(grid.world_to_cell(Vec2::new(-555., 395.)), Some((0, 0)));
        // Bottom right corner is the last cell
        assert_eq!(grid.world_to_cell(Vec2::new(555., -395.)), Some((55, 39)));
        // A particle slightly above the origin lands in the row above the center
        assert_eq!(grid.world_to_cell(Vec2::new(1., 1.)), Some((28, 19)));
    }

    #[test]
    fn world_to_cell_rejects_outside_positions() {
        let grid = test_grid();

        assert_eq!(grid.world_to_cell(Vec2::new(560., 0.)), None);
        assert_eq!(grid.world_to_cell(Vec2::new(-560., 0.)), None);
        assert_eq!(grid.world_to_cell(Vec2::new(0., 400.)), None);
        assert_eq!(grid.world_to_cell(Vec2::new(0., -1000.)), None);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut grid = test_grid();
        let mut store = ParticleStore::new();
        for _ in 0..10 {
            store.push(Particle::new(Vec2::new(5., 5.), 1.));
        }

        grid.insert_all(&store);
        let coord = grid.world_to_cell(Vec2::new(5., 5.)).unwrap();
        assert_eq!(grid[coord].len(), 10);
        assert_eq!(grid.measure_spilled(), 1);

        grid.clear();
        assert_eq!(grid[coord].len(), 0);
        assert_eq!(grid.indexed_count(), 0);
        assert!(grid[coord].capacity() >= 10);
    }

    #[test]
    fn outside_particles_are_skipped() {
        let mut grid = test_grid();
        let mut store = ParticleStore::new();
        store.push(Particle::new(Vec2::new(5000., 0.), 1.));
        store.push(Particle::new(Vec2::new(0., 0.), 1.));

        grid.insert_all(&store);
        assert_eq!(grid.indexed_count(), 1);
        assert_eq!(grid[(28, 20)].as_slice(), &[1]);
    }

    #[test]
    fn neighborhood_is_clipped_at_edges() {
        let grid = test_grid();

        let mut corner = 0;
        grid.for_each_3x3_neighbor(0, 0, |_| corner += 1);
        assert_eq!(corner, 4);

        let mut edge = 0;
        grid.for_each_3x3_neighbor(55, 20, |_| edge += 1);
        assert_eq!(edge, 6);

        let mut interior = 0;
        grid.for_each_3x3_neighbor(10, 10, |_| interior += 1);
        assert_eq!(interior, 9);

        assert!(grid.cell_at(56, 0).is_none());
        assert!(grid.cell_at(0, 40).is_none());
    }

    #[test]
    fn get_neighbors_collects_adjacent_particles() {
        let mut grid = test_grid();
        let mut store = ParticleStore::new();
        store.push(Particle::new(Vec2::new(5., 5.), 1.));
        store.push(Particle::new(Vec2::new(25., 5.), 1.));
        store.push(Particle::new(Vec2::new(65., 5.), 1.));

        grid.insert_all(&store);
        let coord = grid.world_to_cell(Vec2::new(5., 5.)).unwrap();
        let mut neighbors: Vec<usize> = grid.get_neighbors(coord).collect();
        neighbors.sort_unstable();

        assert_eq!(neighbors, vec![0, 1]);
    }

    proptest! {
        #[test]
        fn every_inside_particle_is_in_exactly_one_cell(
            points in prop::collection::vec((-559.0f32..559.0, -399.0f32..399.0), 1..200)
        ) {
            let mut grid = test_grid();
            let mut store = ParticleStore::new();
            for &(x, y) in &points {
                store.push(Particle::new(Vec2::new(x, y), 1.));
            }

            grid.insert_all(&store);
            prop_assert_eq!(grid.indexed_count(), store.len());

            let mut found: Vec<Vec<Coord>> = vec![Vec::new(); store.len()];
            for (y, x) in iproduct!(0..grid.height(), 0..grid.width()) {
                for &index in grid[(x, y)].iter() {
                    found[index].push((x, y));
                }
            }

            for (index, particle) in store.iter().enumerate() {
                let expected = grid.world_to_cell(particle.position).unwrap();
                prop_assert_eq!(&found[index], &vec![expected]);
            }
        }
    }
}
