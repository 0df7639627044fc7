mod setup;

/// Error returned by `WorkerPool::new` for configurations that cannot be
/// realized.
pub use crate::pool::setup::PoolSetupError;
use crate::{
    config::PoolConfig,
    scratch::{Scratch, ScratchError, ScratchLayout},
    types::{ScratchValue, WorkerState},
    worker::{Worker, WorkerRecord},
};
use log::{debug, info, trace};

/// Fixed set of workers, one per thread, and the arena of their records.
///
/// Threads are provided by a dedicated `rayon` thread pool with exactly one
/// thread per worker; the pool never spawns or joins threads on its own.
/// [`WorkerPool::exec_all`] runs a function on every worker at once, and
/// inside it the workers synchronize through the collectives of
/// [`Worker`](crate::worker::Worker) and
/// [`TeamMember`](crate::team::TeamMember).
///
/// `exec_all` and [`WorkerPool::resize_worker_scratch`] both take `&mut self`,
/// so scratch memory can never be reallocated under a running collective.
#[must_use]
#[derive(Debug)]
pub struct WorkerPool {
    config: PoolConfig,
    layout: ScratchLayout,
    /// Records in global rank order. Never resized after construction, so the
    /// views handed to workers stay valid for the pool's lifetime.
    workers: Box<[WorkerRecord]>,
    #[cfg(not(feature = "loom"))]
    threads: rayon::ThreadPool,
}

impl WorkerPool {
    /// Builds the worker arena and starts one thread per worker.
    ///
    /// # Errors
    /// If the worker count overflows, the initial scratch request exceeds the
    /// configured limit, or the threads cannot be started.
    pub fn new(config: PoolConfig) -> Result<Self, PoolSetupError> {
        let worker_size = setup::worker_size(&config)?;
        let layout = setup::scratch_layout(&config)?;
        let workers = setup::records(&config, worker_size, layout);
        #[cfg(not(feature = "loom"))]
        let threads = setup::thread_pool(worker_size)?;
        info!(
            "worker pool ready: {} groups x {} workers, {} scratch bytes per worker",
            config.group_count(),
            config.group_worker_size(),
            layout.total_size()
        );
        Ok(Self {
            config,
            layout,
            workers,
            #[cfg(not(feature = "loom"))]
            threads,
        })
    }

    /// Configuration the pool was built from.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Current layout of every worker's scratch buffer.
    #[must_use]
    pub fn scratch_layout(&self) -> ScratchLayout {
        self.layout
    }

    /// Number of workers (and threads).
    #[must_use]
    pub fn worker_size(&self) -> usize {
        self.workers.len()
    }

    /// Grows every worker's scratch buffer to hold at least `reduce_size`
    /// bytes of reduction values and `shared_size` bytes of team-shared
    /// storage. Regions are rounded up to 64 bytes and never shrink.
    ///
    /// Reallocating invalidates everything previously stored in scratch
    /// memory.
    ///
    /// # Errors
    /// If the grown buffer would exceed `PoolConfig::scratch_limit`.
    pub fn resize_worker_scratch(
        &mut self,
        reduce_size: usize,
        shared_size: usize,
    ) -> Result<(), ScratchError> {
        let layout = self
            .layout
            .grow(reduce_size, shared_size, self.config.scratch_limit())?;
        if layout == self.layout {
            return Ok(());
        }
        debug!(
            "growing worker scratch from {} to {} bytes ({} reduce, {} shared)",
            self.layout.total_size(),
            layout.total_size(),
            layout.reduce_size(),
            layout.shared_size()
        );
        for worker in self.workers.iter_mut() {
            worker.scratch = Scratch::new(layout);
        }
        self.layout = layout;
        Ok(())
    }

    /// Result of the last `Worker::exec_all_reduce`, read from the root
    /// worker's reduction slot.
    ///
    /// # Panics
    /// If `T` does not fit the reduction region.
    #[must_use]
    pub fn exec_all_reduce_result<T: ScratchValue>(&self) -> T {
        let root = self.workers.last().expect("WorkerPool: [1]");
        // SAFETY: No collective is running while `self` is shared outside
        // `exec_all`.
        unsafe { root.scratch.read() }
    }

    /// Runs `f` once on every worker, concurrently, and returns when all
    /// calls have returned.
    ///
    /// `f` receives the worker it runs on. Must not be called from one of the
    /// pool's own threads.
    #[cfg(not(feature = "loom"))]
    pub fn exec_all<F>(&mut self, f: F)
    where
        F: Fn(Worker<'_>) + Sync,
    {
        self.debug_assert_quiescent();
        trace!("exec_all on {} workers", self.workers.len());
        let Self {
            workers, threads, ..
        } = self;
        let workers: &[WorkerRecord] = workers;
        threads.broadcast(|context| {
            debug_assert_eq!(context.num_threads(), workers.len(), "WorkerPool: [2]");
            f(Worker::new(workers, context.index()));
        });
    }

    /// Loom-testable version of `exec_all`: worker 0 runs on the calling
    /// thread, the others on loom threads.
    #[cfg(feature = "loom")]
    pub fn exec_all<F>(self: &crate::sync::Arc<Self>, f: F)
    where
        F: Fn(Worker<'_>) + Send + Sync + 'static,
    {
        use crate::sync::{Arc, thread};

        self.debug_assert_quiescent();
        trace!("exec_all on {} workers", self.workers.len());
        let f = Arc::new(f);
        let handles: Vec<_> = (1..self.workers.len())
            .map(|rank| {
                let pool = Arc::clone(self);
                let f = Arc::clone(&f);
                thread::spawn(move || f(Worker::new(&pool.workers, rank)))
            })
            .collect();
        f(Worker::new(&self.workers, 0));
        for handle in handles {
            handle.join().expect("WorkerPool: [3]");
        }
    }

    fn debug_assert_quiescent(&self) {
        debug_assert!(
            self.workers
                .iter()
                .all(|worker| worker.flag.state() == WorkerState::Active),
            "WorkerPool: a collective is still in flight"
        );
    }
}
