use crate::{
    scratch::{Scratch, ScratchLayout, TeamShmem},
    signal::ActivityFlag,
    types::{ScratchValue, WorkerState},
};
use derive_more::Debug;

/// Position of a worker in the pool and in its group.
///
/// `worker_rank = group_rank * group_worker_size + group_worker_rank` and
/// `worker_size = group_size * group_worker_size`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct WorkerRanks {
    /// Global rank in the pool.
    pub worker_rank: usize,
    /// Number of workers in the pool.
    pub worker_size: usize,
    /// Rank of the worker's group (shepherd).
    pub group_rank: usize,
    /// Number of groups in the pool.
    pub group_size: usize,
    /// Rank inside the group.
    pub group_worker_rank: usize,
    /// Number of workers per group.
    pub group_worker_size: usize,
}

impl WorkerRanks {
    pub(crate) fn new(worker_rank: usize, group_size: usize, group_worker_size: usize) -> Self {
        let worker_size = group_size * group_worker_size;
        assert!(worker_rank < worker_size, "WorkerRanks::new: [1]");
        Self {
            worker_rank,
            worker_size,
            group_rank: worker_rank / group_worker_size,
            group_size,
            group_worker_rank: worker_rank % group_worker_size,
            group_worker_size,
        }
    }
}

/// Per-thread state stored in the pool arena.
#[must_use]
#[derive(Debug)]
pub(crate) struct WorkerRecord {
    pub(crate) ranks: WorkerRanks,
    /// Arrival/release handshake; read and written by fan neighbors.
    pub(crate) flag: ActivityFlag,
    /// `[reduce | shared]`; the reduction slot is read by fan neighbors.
    pub(crate) scratch: Scratch,
}

impl WorkerRecord {
    pub(crate) fn new(ranks: WorkerRanks, layout: ScratchLayout) -> Self {
        Self {
            ranks,
            flag: ActivityFlag::new(),
            scratch: Scratch::new(layout),
        }
    }
}

/// A worker as seen by the function running on it during
/// `WorkerPool::exec_all`.
///
/// Besides its own record the worker holds two read-only views of the pool
/// arena: every record ordered by global rank, and the records of its group
/// ordered by group rank. Collectives find their fan neighbors through these
/// views.
#[derive(Debug, Copy, Clone)]
pub struct Worker<'a> {
    pub(crate) record: &'a WorkerRecord,
    #[debug(skip)]
    pub(crate) worker_base: &'a [WorkerRecord],
    #[debug(skip)]
    pub(crate) group_base: &'a [WorkerRecord],
}

impl<'a> Worker<'a> {
    pub(crate) fn new(worker_base: &'a [WorkerRecord], worker_rank: usize) -> Self {
        let record = &worker_base[worker_rank];
        let WorkerRanks {
            group_rank,
            group_worker_size,
            ..
        } = record.ranks;
        let group_start = group_rank * group_worker_size;
        Self {
            record,
            worker_base,
            group_base: &worker_base[group_start..group_start + group_worker_size],
        }
    }

    /// All rank information of this worker.
    #[must_use]
    pub fn ranks(&self) -> WorkerRanks {
        self.record.ranks
    }

    /// Global rank in the pool.
    #[must_use]
    pub fn worker_rank(&self) -> usize {
        self.record.ranks.worker_rank
    }

    /// Number of workers in the pool.
    #[must_use]
    pub fn worker_size(&self) -> usize {
        self.record.ranks.worker_size
    }

    /// Rank of this worker's group.
    #[must_use]
    pub fn group_rank(&self) -> usize {
        self.record.ranks.group_rank
    }

    /// Number of groups in the pool.
    #[must_use]
    pub fn group_size(&self) -> usize {
        self.record.ranks.group_size
    }

    /// Rank inside the group.
    #[must_use]
    pub fn group_worker_rank(&self) -> usize {
        self.record.ranks.group_worker_rank
    }

    /// Number of workers per group.
    #[must_use]
    pub fn group_worker_size(&self) -> usize {
        self.record.ranks.group_worker_size
    }

    /// Current state of this worker's activity flag.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.record.flag.state()
    }

    /// This worker's reduction slot, as left by the last pool-scope reduce
    /// or scan.
    ///
    /// After `exec_all_reduce` only the root (the highest-ranked worker) holds
    /// the full reduction; other workers hold the partial value of their
    /// fan-in subtree.
    ///
    /// # Panics
    /// If `T` does not fit the reduction region.
    #[must_use]
    pub fn exec_all_reduce_value<T: ScratchValue>(&self) -> T {
        // SAFETY: Between collectives only the owner touches its reduction
        // slot, and the owner is the caller.
        unsafe { self.record.scratch.read() }
    }

    /// Fresh allocator over the team-shared region of this worker's group.
    pub fn team_shmem(&self) -> TeamShmem<'a> {
        let owner = self.group_base.last().expect("Worker::team_shmem: [1]");
        TeamShmem::new(&owner.scratch)
    }
}
