//! Lock-free combining-tree collectives for SPMD worker pools.
//!
//! This crate runs single-program-multiple-data work on a fixed pool of
//! worker threads split into groups ("shepherds"). It:
//! - Synchronizes workers with barrier, reduce and exclusive-scan collectives
//!   built on a binary fan-in/fan-out tree keyed by reverse rank, at pool
//!   scope or at group scope, with O(log n) depth and no locks.
//! - Hands each worker a cache-aligned scratch buffer that carries reduction
//!   values between workers and hosts storage shared by a team.
//! - Statically partitions a league of teams over the groups, each group
//!   running its teams one after another with all of its workers.
//!
//! Key modules:
//! - `pool`: the worker arena, its threads and `exec_all`.
//! - `worker`: the per-worker view and its rank information.
//! - `collective`: the combining-tree algorithms and the join capabilities.
//! - `league` / `team`: league partitioning and the per-team handle.
//!
//! Quick start:
//! 1. Build a `WorkerPool` from a `PoolConfig`.
//! 2. Build a `TeamPolicy` for the league.
//! 3. Call `WorkerPool::exec_all` and, inside, `TeamPolicy::execute` with a
//!    closure that does the team's work and calls the `TeamMember`
//!    collectives.
//!
//! ```
//! # #[cfg(not(any(feature = "loom", feature = "stub-collectives")))] {
//! use core::num::NonZeroUsize;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use spmd_collectives::{config::PoolConfig, league::TeamPolicy, pool::WorkerPool};
//!
//! let config = PoolConfig::new(NonZeroUsize::new(2).unwrap(), NonZeroUsize::new(2).unwrap());
//! let mut pool = WorkerPool::new(config).unwrap();
//! let policy = TeamPolicy::new(pool.config(), 6, 2);
//! let total = AtomicU64::new(0);
//! pool.exec_all(|worker| {
//!     policy.execute(worker, |member| {
//!         let sum = member.team_reduce(member.league_rank() as u64);
//!         if member.team_rank() == 0 {
//!             total.fetch_add(sum, Ordering::Relaxed);
//!         }
//!     });
//! });
//! // Each team of two adds its league rank twice.
//! assert_eq!(total.load(Ordering::Relaxed), 2 * (0 + 1 + 2 + 3 + 4 + 5));
//! # }
//! ```
//!
//! Every collective is a hand-rolled handshake on per-worker activity flags:
//! callers must make every participant enter the same collective with the
//! same team size. A missing participant blocks the others forever.

/// Combining-tree barrier, reduce and scan.
///
/// Exposes the collectives as methods of `Worker` at pool scope
/// (`exec_all_*`) and group scope (`shepherd_*`), together with the `JoinOp`
/// and `GlobalAccumulator` capabilities they are parameterized by.
pub mod collective;
/// Pool shape and scratch sizing.
pub mod config;
/// Static partition of a league of teams over the groups of a pool.
pub mod league;
/// The worker pool: record arena, threads, `exec_all` and scratch resizing.
pub mod pool;
/// Per-worker scratch memory layout and the team-shared allocator.
pub mod scratch;
mod signal;
mod sync;
/// The handle a worker holds while running the teams of its group.
pub mod team;
/// Values admitted in scratch memory and worker states.
pub mod types;
mod utils;
/// The view of a worker handed to functions run by `exec_all`.
pub mod worker;
