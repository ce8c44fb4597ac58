use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::marker::PhantomData;
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::collision::{solve_neighbors, solve_particle_collision, PairResolver};
use crate::error::SolverError;
use crate::grid::SpatialGrid;
use crate::particle::{Particle, ParticleStore};

/// Splits `width` grid columns into at most `section_count` contiguous ranges.
///
/// When the columns don't divide evenly, the leftover columns go one each to the first
/// sections, rather than piling up in the last one. For example, 20 columns in 8 sections:
///
/// ```text
/// Naive:  # # | # # | # # | # # | # # | # # | # # | # # # # # #
/// Better: # # # | # # # | # # # | # # # | # # | # # | # # | # #
/// ```
pub fn partition_columns(width: usize, section_count: usize) -> Vec<Range<usize>> {
    if width == 0 || section_count == 0 {
        return Vec::new();
    }

    // Never split into more sections than there are columns
    let section_count = section_count.min(width);
    let base_width = width / section_count;
    let remainder = width % section_count;

    let mut sections = Vec::with_capacity(section_count);
    let mut start = 0;
    for i in 0..section_count {
        let section_width = if i < remainder {
            base_width + 1
        } else {
            base_width
        };
        sections.push(start..start + section_width);
        start += section_width;
    }

    sections
}

/// The column sections `width` columns are solved in by `workers` threads: up to two
/// sections per worker, never narrower than two columns (unless the grid itself is).
/// Sections with an even index run in the first phase, odd ones in the second.
pub fn schedule_columns(width: usize, workers: usize) -> Vec<Range<usize>> {
    let widest = (width / 2).max(1);
    partition_columns(width, (2 * workers).min(widest))
}

/// Resolves grid collisions on a pool of worker threads, one column section at a time per
/// worker.
///
/// A worker solving a section also reads and moves particles in the column on either side of
/// it, so two neighbouring sections can never run at the same time. The grid is cut into
/// (up to) twice as many sections as there are workers, each at least two columns wide, and
/// solved in two phases: even sections first, then odd sections. Sections within a phase are
/// then always separated by a full section, so no particle is touched by two workers at once.
#[derive(Debug)]
pub struct ParallelCollisionResolver {
    section_count: usize,
    pool: ThreadPool,
}

impl ParallelCollisionResolver {
    /// Creates a resolver backed by `section_count` worker threads.
    pub fn new(section_count: usize) -> Result<Self, SolverError> {
        if section_count == 0 {
            return Err(SolverError::invalid(
                "section_count",
                "at least one section is required",
            ));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(section_count)
            .thread_name(|i| format!("collision-worker-{}", i))
            .build()?;

        tracing::debug!(section_count, "built collision worker pool");

        Ok(ParallelCollisionResolver {
            section_count,
            pool,
        })
    }

    /// One section per available CPU.
    pub fn with_available_parallelism() -> Result<Self, SolverError> {
        Self::new(num_cpus::get().max(1))
    }

    pub fn section_count(&self) -> usize {
        self.section_count
    }

    /// The column sections a grid of `width` columns is solved in. Sections with an even
    /// index run in the first phase, odd ones in the second.
    pub fn schedule(&self, width: usize) -> Vec<Range<usize>> {
        schedule_columns(width, self.section_count)
    }

    /// Resolves every grid collision. `grid` must have been rebuilt from `store` since the
    /// store last changed length.
    pub(crate) fn resolve(
        &self,
        store: &mut ParticleStore,
        grid: &SpatialGrid,
    ) -> Result<(), SolverError> {
        debug_assert!(grid.indexed_count() <= store.len());

        let schedule = self.schedule(grid.width());
        let shared = SharedParticles::new(store.as_mut_slice());

        self.run_phases(&schedule, |_, columns| {
            solve_section(&mut SectionView(&shared), grid, columns)
        })
    }

    /// Runs `work` once per section of `schedule`: even sections in parallel, then odd
    /// sections in parallel. A panicking section fails the whole pass with `WorkerFailure`
    /// once its phase has joined; the other phase is never started if it was the first.
    fn run_phases<F>(&self, schedule: &[Range<usize>], work: F) -> Result<(), SolverError>
    where
        F: Fn(usize, Range<usize>) + Sync,
    {
        for parity in 0..2 {
            let phase: Vec<(usize, Range<usize>)> = schedule
                .iter()
                .cloned()
                .enumerate()
                .filter(|(i, _)| i % 2 == parity)
                .collect();

            let results: Vec<Result<(), SolverError>> = self.pool.install(|| {
                phase
                    .into_par_iter()
                    .map(|(section, columns)| {
                        catch_unwind(AssertUnwindSafe(|| work(section, columns))).map_err(
                            |payload| SolverError::WorkerFailure {
                                section,
                                message: panic_message(payload),
                            },
                        )
                    })
                    .collect()
            });

            for result in results {
                if let Err(e) = result {
                    tracing::error!(error = %e, "collision resolution aborted");
                    return Err(e);
                }
            }
        }

        Ok(())
    }
}

/// For the parallel solver, iterating over the columns first is better, since particles are
/// more likely to collect horizontally (at the bottom of the world). Iterating over rows
/// first would leave one worker with most of the work.
fn solve_section<P: PairResolver>(particles: &mut P, grid: &SpatialGrid, columns: Range<usize>) {
    for x in columns {
        for y in 0..grid.height() {
            solve_neighbors(particles, grid, x, y);
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Pointer to the particle buffer, shared between the workers of one phase.
///
/// # Safety
///
/// `schedule_columns` together with the phase split in `ParallelCollisionResolver::run_phases`
/// guarantees that workers running at the same time only ever touch particles indexed in disjoint sets of grid columns, and
/// every particle is indexed in at most one cell. That makes concurrent mutation of the
/// particles reached through this pointer sound.
struct SharedParticles<'a> {
    ptr: *mut Particle,
    len: usize,
    _marker: PhantomData<&'a mut [Particle]>,
}

unsafe impl Send for SharedParticles<'_> {}
unsafe impl Sync for SharedParticles<'_> {}

impl<'a> SharedParticles<'a> {
    fn new(particles: &'a mut [Particle]) -> Self {
        SharedParticles {
            ptr: particles.as_mut_ptr(),
            len: particles.len(),
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// No other reference to particle `a` or `b` may be alive while the returned references
    /// are.
    #[allow(clippy::mut_from_ref)]
    unsafe fn pair_mut(&self, a: usize, b: usize) -> Option<(&mut Particle, &mut Particle)> {
        if a == b || a >= self.len || b >= self.len {
            return None;
        }
        Some((&mut *self.ptr.add(a), &mut *self.ptr.add(b)))
    }
}

/// A single worker's handle on the shared particles.
struct SectionView<'s, 'a>(&'s SharedParticles<'a>);

impl PairResolver for SectionView<'_, '_> {
    fn resolve_pair(&mut self, a: usize, b: usize) {
        // SAFETY: see `SharedParticles`; the references don't outlive this call.
        if let Some((first, second)) = unsafe { self.0.pair_mut(a, b) } {
            solve_particle_collision(first, second);
        }
    }
}
