use core::num::NonZeroUsize;

/// Default per-worker ceiling on scratch memory, 1 MiB.
pub const DEFAULT_SCRATCH_LIMIT: usize = 1 << 20;

/// Shape and scratch sizing of a `WorkerPool`.
///
/// The pool has `group_count * group_worker_size` workers, one thread each.
/// `reduce_size` and `shared_size` are the initial scratch requests; they are
/// rounded up to 64 bytes and may grow later through
/// `WorkerPool::resize_worker_scratch`, up to `scratch_limit` bytes per
/// worker.
#[must_use]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    group_count: NonZeroUsize,
    group_worker_size: NonZeroUsize,
    reduce_size: usize,
    shared_size: usize,
    scratch_limit: usize,
}

impl PoolConfig {
    /// `group_count` groups (shepherds) of `group_worker_size` workers each.
    pub const fn new(group_count: NonZeroUsize, group_worker_size: NonZeroUsize) -> Self {
        Self {
            group_count,
            group_worker_size,
            reduce_size: 0,
            shared_size: 0,
            scratch_limit: DEFAULT_SCRATCH_LIMIT,
        }
    }

    /// A single group of `worker_size` workers.
    pub const fn single_group(worker_size: NonZeroUsize) -> Self {
        Self::new(NonZeroUsize::MIN, worker_size)
    }

    /// Initial size of the reduction region in bytes.
    pub const fn with_reduce_size(self, reduce_size: usize) -> Self {
        Self {
            reduce_size,
            ..self
        }
    }

    /// Initial size of the team-shared region in bytes.
    pub const fn with_shared_size(self, shared_size: usize) -> Self {
        Self {
            shared_size,
            ..self
        }
    }

    /// Per-worker ceiling on scratch memory in bytes.
    pub const fn with_scratch_limit(self, scratch_limit: usize) -> Self {
        Self {
            scratch_limit,
            ..self
        }
    }

    /// Number of groups.
    #[must_use]
    pub const fn group_count(&self) -> NonZeroUsize {
        self.group_count
    }

    /// Workers per group.
    #[must_use]
    pub const fn group_worker_size(&self) -> NonZeroUsize {
        self.group_worker_size
    }

    /// Requested reduction region size in bytes.
    #[must_use]
    pub const fn reduce_size(&self) -> usize {
        self.reduce_size
    }

    /// Requested team-shared region size in bytes.
    #[must_use]
    pub const fn shared_size(&self) -> usize {
        self.shared_size
    }

    /// Per-worker ceiling on scratch memory in bytes.
    #[must_use]
    pub const fn scratch_limit(&self) -> usize {
        self.scratch_limit
    }

    /// Total number of workers, `None` on overflow.
    #[must_use]
    pub const fn worker_size(&self) -> Option<NonZeroUsize> {
        self.group_count.checked_mul(self.group_worker_size)
    }
}
