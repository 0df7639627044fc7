mod fan;
mod join;

pub use crate::collective::join::{GlobalAccumulator, JoinFn, JoinOp, Sum};
use crate::{collective::fan::fan_round, worker::{Worker, WorkerRecord}};

/// Pool scope collectives: every worker of the pool must take part.
impl Worker<'_> {
    /// Barrier across all workers of the `exec_all` call.
    ///
    /// Every write a worker makes before the barrier is visible to every
    /// worker after the barrier.
    pub fn exec_all_barrier(&self) {
        fan_round(
            self.worker_base,
            self.worker_rank(),
            self.worker_size(),
            |_| {},
            |_| {},
        );
    }

    /// Reduction across all workers of the `exec_all` call.
    ///
    /// The full result is left in the root's reduction slot only (the
    /// highest-ranked worker). Read it with `WorkerPool::exec_all_reduce_result`
    /// after `exec_all` returns, or with [`Worker::exec_all_reduce_value`] on
    /// the root.
    ///
    /// # Panics
    /// If `J::Value` does not fit the reduction region.
    pub fn exec_all_reduce<J: JoinOp>(&self, value: J::Value, op: &J) {
        let me = self.record;
        // SAFETY: Between collectives only the owner touches its slot.
        unsafe { me.scratch.write(value) };
        fan_round(
            self.worker_base,
            self.worker_rank(),
            self.worker_size(),
            |child| join_child(me, child, op),
            |_| {},
        );
    }

    /// Exclusive prefix scan across all workers in ascending worker rank.
    ///
    /// Worker 0 receives `op.init()`.
    ///
    /// # Panics
    /// If `J::Value` does not fit the reduction region.
    pub fn exec_all_scan<J: JoinOp>(&self, value: J::Value, op: &J) -> J::Value {
        let me = self.record;
        // SAFETY: Between collectives only the owner touches its slot.
        unsafe { me.scratch.write(value) };
        fan_round(
            self.worker_base,
            self.worker_rank(),
            self.worker_size(),
            |_| {},
            |members| scan_members(members, op, None),
        );
        // SAFETY: Released; the root no longer touches this slot.
        unsafe { me.scratch.read() }
    }
}

/// Group scope collectives: the workers of this group with
/// `group_worker_rank < team_size` must take part, all with the same
/// `team_size`.
impl Worker<'_> {
    /// Barrier across the first `team_size` workers of this group.
    ///
    /// A no-op for workers outside the team.
    pub fn shepherd_barrier(&self, team_size: usize) {
        let rank = self.group_worker_rank();
        if rank < team_size {
            fan_round(self.group_base, rank, team_size, |_| {}, |_| {});
        }
    }

    /// Reduction across the first `team_size` workers of this group; every
    /// member returns the reduced value.
    ///
    /// # Panics
    /// If `J::Value` does not fit the reduction region.
    pub fn shepherd_reduce<J: JoinOp>(&self, team_size: usize, value: J::Value, op: &J) -> J::Value {
        let me = self.record;
        let rank = self.team_rank(team_size);
        // SAFETY: Between collectives only the owner touches its slot.
        unsafe { me.scratch.write(value) };
        fan_round(
            self.group_base,
            rank,
            team_size,
            |child| join_child(me, child, op),
            |members| {
                // SAFETY: Every other member is parked until fan-out, and the
                // acquire chain of fan-in made their writes visible.
                unsafe {
                    let total = me.scratch.read::<J::Value>();
                    for member in members {
                        member.scratch.write(total);
                    }
                }
            },
        );
        // SAFETY: Released; the root no longer touches this slot.
        unsafe { me.scratch.read() }
    }

    /// Exclusive prefix scan across the first `team_size` workers of this
    /// group, in ascending group rank.
    ///
    /// Without `global` the lowest rank receives `op.init()`. With `global`
    /// the root adds the team total to the accumulator and the previous
    /// accumulator value becomes the base of the whole team's prefix.
    ///
    /// # Panics
    /// If `J::Value` does not fit the reduction region.
    pub fn shepherd_scan<J: JoinOp>(
        &self,
        team_size: usize,
        value: J::Value,
        op: &J,
        global: Option<&dyn GlobalAccumulator<J::Value>>,
    ) -> J::Value {
        let me = self.record;
        let rank = self.team_rank(team_size);
        // SAFETY: Between collectives only the owner touches its slot.
        unsafe { me.scratch.write(value) };
        fan_round(
            self.group_base,
            rank,
            team_size,
            |_| {},
            |members| scan_members(members, op, global),
        );
        // SAFETY: Released; the root no longer touches this slot.
        unsafe { me.scratch.read() }
    }

    fn team_rank(&self, team_size: usize) -> usize {
        let rank = self.group_worker_rank();
        debug_assert!(
            rank < team_size && team_size <= self.group_worker_size(),
            "worker {rank} is not a member of a team of {team_size} in a group of {}",
            self.group_worker_size()
        );
        rank
    }
}

/// Joins an arrived child's partial value into `me`'s accumulator.
fn join_child<J: JoinOp>(me: &WorkerRecord, child: &WorkerRecord, op: &J) {
    // SAFETY: `me` is the calling owner and `child` is parked after having
    // arrived, so neither slot has a concurrent writer.
    unsafe {
        let mut accum = me.scratch.read::<J::Value>();
        op.join(&mut accum, &child.scratch.read());
        me.scratch.write(accum);
    }
}

/// Replaces every member's value by its exclusive prefix, in ascending rank.
///
/// Runs on the root while every other member is parked.
fn scan_members<J: JoinOp>(
    members: &[WorkerRecord],
    op: &J,
    global: Option<&dyn GlobalAccumulator<J::Value>>,
) {
    // SAFETY: Every other member is parked until fan-out, and the acquire
    // chain of fan-in made their writes visible.
    unsafe {
        let mut prefix = match global {
            Some(global) => {
                let mut total = op.init();
                for member in members {
                    op.join(&mut total, &member.scratch.read());
                }
                global.fetch_join(total)
            }
            None => op.init(),
        };
        for member in members {
            let value = member.scratch.read::<J::Value>();
            member.scratch.write(prefix);
            op.join(&mut prefix, &value);
        }
    }
}
