use std::fmt;

/// Everything that can go wrong while building or stepping a simulation.
///
/// Zero-distance collisions and projections are not errors: they are skipped where they
/// happen and never reach the caller.
#[derive(Debug)]
pub enum SolverError {
    /// A particle was looked up with an index past the end of the store.
    IndexOutOfRange { index: usize, len: usize },
    /// A collision worker panicked. Sections that finished before the failure stay applied.
    WorkerFailure { section: usize, message: String },
    /// The collision worker pool could not be created.
    ThreadPool(rayon::ThreadPoolBuildError),
    /// A configuration value was rejected.
    InvalidParameter { name: &'static str, reason: String },
}

impl SolverError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SolverError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::IndexOutOfRange { index, len } => write!(
                f,
                "particle index {} out of range for store of length {}",
                index, len
            ),
            SolverError::WorkerFailure { section, message } => write!(
                f,
                "collision worker for section {} failed: {}",
                section, message
            ),
            SolverError::ThreadPool(e) => write!(f, "failed to build collision worker pool: {}", e),
            SolverError::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter `{}`: {}", name, reason)
            }
        }
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolverError::ThreadPool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for SolverError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        SolverError::ThreadPool(e)
    }
}
