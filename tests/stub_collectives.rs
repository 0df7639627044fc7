#![allow(missing_docs)]
#![cfg(all(feature = "stub-collectives", not(feature = "loom")))]

use core::num::NonZeroUsize;
use spmd_collectives::{
    collective::Sum,
    config::PoolConfig,
    league::TeamPolicy,
    pool::WorkerPool,
    team::TeamMember,
};
use std::sync::atomic::{AtomicU64, Ordering};

fn nz(x: usize) -> NonZeroUsize {
    NonZeroUsize::new(x).unwrap()
}

#[test]
fn team_collectives_return_zero() {
    let mut pool = WorkerPool::new(PoolConfig::new(nz(2), nz(3))).expect("pool must build");
    let policy = TeamPolicy::new(pool.config(), 4, 3);
    let global = AtomicU64::new(0);
    let nonzero = AtomicU64::new(0);
    let teams = AtomicU64::new(0);
    pool.exec_all(|worker| {
        policy.execute(worker, |member| {
            member.team_barrier();
            let results = [
                member.team_reduce(7u64),
                member.team_reduce_with(7u64, &Sum::new()),
                member.team_scan(7u64),
                member.team_scan_with(7u64, &Sum::new()),
                member.team_scan_global(7u64, &global),
            ];
            if results.iter().any(|&result| result != 0) {
                nonzero.fetch_add(1, Ordering::Relaxed);
            }
            teams.fetch_add(1, Ordering::Relaxed);
        });
    });
    assert_eq!(nonzero.load(Ordering::Relaxed), 0);
    assert_eq!(global.load(Ordering::Relaxed), 0);
    // Three members for each of the four teams.
    assert_eq!(teams.load(Ordering::Relaxed), 12);
}

#[test]
fn pool_scope_collectives_are_not_stubbed() {
    let mut pool = WorkerPool::new(PoolConfig::new(nz(2), nz(2))).expect("pool must build");
    pool.exec_all(|worker| {
        worker.exec_all_reduce(worker.worker_rank() as u64 + 1, &Sum::new());
    });
    assert_eq!(pool.exec_all_reduce_result::<u64>(), 10);
}
