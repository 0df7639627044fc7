use crate::{
    config::PoolConfig,
    scratch::{ScratchError, ScratchLayout},
    worker::{WorkerRanks, WorkerRecord},
};
#[cfg(not(feature = "loom"))]
use log::debug;
use thiserror::Error;

/// Error returned by `WorkerPool::new` when the configuration cannot be
/// realized.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolSetupError {
    /// `group_count * group_worker_size` does not fit in `usize`.
    #[error("{group_count} groups of {group_worker_size} workers overflow the worker count")]
    TooManyWorkers {
        /// Requested number of groups.
        group_count: usize,
        /// Requested workers per group.
        group_worker_size: usize,
    },
    /// The initial scratch request is invalid.
    #[error(transparent)]
    Scratch(#[from] ScratchError),
    /// The thread pool hosting the workers could not be started.
    #[error("failed to start the worker threads")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub(super) fn worker_size(config: &PoolConfig) -> Result<usize, PoolSetupError> {
    config
        .worker_size()
        .map(|size| size.get())
        .ok_or(PoolSetupError::TooManyWorkers {
            group_count: config.group_count().get(),
            group_worker_size: config.group_worker_size().get(),
        })
}

pub(super) fn scratch_layout(config: &PoolConfig) -> Result<ScratchLayout, ScratchError> {
    ScratchLayout::MIN.grow(
        config.reduce_size(),
        config.shared_size(),
        config.scratch_limit(),
    )
}

/// Worker arena in global rank order; groups occupy consecutive ranks.
pub(super) fn records(
    config: &PoolConfig,
    worker_size: usize,
    layout: ScratchLayout,
) -> Box<[WorkerRecord]> {
    let group_count = config.group_count().get();
    let group_worker_size = config.group_worker_size().get();
    let records: Box<[_]> = (0..worker_size)
        .map(|rank| {
            WorkerRecord::new(
                WorkerRanks::new(rank, group_count, group_worker_size),
                layout,
            )
        })
        .collect();
    assert_eq!(records.len(), worker_size, "WorkerPool::new: [1]");
    records
}

#[cfg(not(feature = "loom"))]
pub(super) fn thread_pool(worker_size: usize) -> Result<rayon::ThreadPool, PoolSetupError> {
    debug!("starting {worker_size} worker threads");
    let threads = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_size)
        .thread_name(|index| format!("spmd-worker-{index}"))
        .build()?;
    assert_eq!(
        threads.current_num_threads(),
        worker_size,
        "WorkerPool::new: [2]"
    );
    Ok(threads)
}
