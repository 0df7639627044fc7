use crate::{
    collective::{GlobalAccumulator, JoinOp, Sum},
    league::TeamPolicy,
    scratch::TeamShmem,
    types::ScratchValue,
    worker::Worker,
};
use bytemuck::Zeroable;
use core::ops::AddAssign;

/// Whether team collectives are compiled as no-ops returning the zero value.
const STUB_COLLECTIVES: bool = cfg!(feature = "stub-collectives");

/// A worker's handle on the team its group is currently running.
///
/// Driven as
///
/// ```text
/// let mut member = TeamMember::new(worker, &policy);
/// while member.is_live() {
///     // work on team `member.league_rank()`
///     member.next_team();
/// }
/// ```
///
/// or through [`TeamPolicy::execute`]. Every collective must be entered by
/// all members of the team; this is not checked.
#[derive(Debug)]
pub struct TeamMember<'a> {
    worker: Worker<'a>,
    shmem: TeamShmem<'a>,
    team_size: usize,
    team_rank: usize,
    league_size: usize,
    league_end: usize,
    league_rank: usize,
}

impl<'a> TeamMember<'a> {
    /// First team of `worker`'s group under `policy`.
    ///
    /// A worker whose group rank is not below the team size is not a member
    /// of any team: its handle is never live.
    pub fn new(worker: Worker<'a>, policy: &TeamPolicy) -> Self {
        let team_size = policy.team_size();
        let team_rank = worker.group_worker_rank();
        let range = policy.partition().range(worker.group_rank());
        let league_rank = if team_rank < team_size {
            range.start
        } else {
            range.end
        };
        Self {
            worker,
            shmem: worker.team_shmem(),
            team_size,
            team_rank,
            league_size: policy.league_size(),
            league_end: range.end,
            league_rank,
        }
    }

    /// Whether the handle still points at a team of its group's range.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.league_rank < self.league_end
    }

    /// Moves on to the group's next team and resets the team-shared region.
    pub fn next_team(&mut self) {
        self.league_rank += 1;
        self.shmem.reset();
    }

    /// Index of the current team in the league.
    #[must_use]
    pub fn league_rank(&self) -> usize {
        self.league_rank
    }

    /// Number of teams in the league.
    #[must_use]
    pub fn league_size(&self) -> usize {
        self.league_size
    }

    /// Rank inside the team (the worker's group rank).
    #[must_use]
    pub fn team_rank(&self) -> usize {
        self.team_rank
    }

    /// Workers per team.
    #[must_use]
    pub fn team_size(&self) -> usize {
        self.team_size
    }

    /// The worker running this member.
    #[must_use]
    pub fn worker(&self) -> Worker<'a> {
        self.worker
    }

    /// Team-shared scratch storage, reset on every `next_team`.
    pub fn team_shmem(&mut self) -> &mut TeamShmem<'a> {
        &mut self.shmem
    }

    /// Barrier across the team.
    pub fn team_barrier(&self) {
        if STUB_COLLECTIVES {
            return;
        }
        self.worker.shepherd_barrier(self.team_size);
    }

    /// Sum of `value` over the team, returned to every member.
    pub fn team_reduce<T: ScratchValue + AddAssign>(&self, value: T) -> T {
        self.team_reduce_with(value, &Sum::new())
    }

    /// Reduction of `value` over the team with `op`, returned to every member.
    pub fn team_reduce_with<J: JoinOp>(&self, value: J::Value, op: &J) -> J::Value {
        if STUB_COLLECTIVES {
            return Zeroable::zeroed();
        }
        self.worker.shepherd_reduce(self.team_size, value, op)
    }

    /// Exclusive prefix sum over the team in `team_rank` order.
    ///
    /// Rank 0 receives zero; the highest rank can compute the team total as
    /// `team_scan(value) + value`.
    pub fn team_scan<T: ScratchValue + AddAssign>(&self, value: T) -> T {
        self.team_scan_with(value, &Sum::new())
    }

    /// Exclusive prefix scan over the team with `op` in `team_rank` order.
    pub fn team_scan_with<J: JoinOp>(&self, value: J::Value, op: &J) -> J::Value {
        if STUB_COLLECTIVES {
            return Zeroable::zeroed();
        }
        self.worker.shepherd_scan(self.team_size, value, op, None)
    }

    /// Exclusive prefix sum over the team on top of a league-wide
    /// accumulator.
    ///
    /// The team total is added to `global`, and the value `global` held
    /// before is the base of this team's prefix. Teams run concurrently, so
    /// the base is non-deterministic; once the league has run `global` holds
    /// the league total.
    pub fn team_scan_global<T, A>(&self, value: T, global: &A) -> T
    where
        T: ScratchValue + AddAssign,
        A: GlobalAccumulator<T>,
    {
        if STUB_COLLECTIVES {
            return Zeroable::zeroed();
        }
        let global: &dyn GlobalAccumulator<T> = global;
        self.worker
            .shepherd_scan(self.team_size, value, &Sum::new(), Some(global))
    }
}

/// Per-thread vector helpers. Each runs on the calling worker alone, one
/// index after another, and never synchronizes with the rest of the team.
impl TeamMember<'_> {
    /// Runs `f` once on this worker and returns its result.
    pub fn vector_single<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }

    /// Calls `f(i)` for every `i` in `0..n`, in order.
    pub fn vector_par_for(&self, n: usize, f: impl FnMut(usize)) {
        (0..n).for_each(f);
    }

    /// Sum over `0..n` of the values produced by `f`.
    ///
    /// `f(i, tmp)` receives a `T::default()` and writes index `i`'s
    /// contribution into it.
    pub fn vector_par_reduce<T>(&self, n: usize, mut f: impl FnMut(usize, &mut T)) -> T
    where
        T: Default + AddAssign,
    {
        let mut total = T::default();
        for i in 0..n {
            let mut tmp = T::default();
            f(i, &mut tmp);
            total += tmp;
        }
        total
    }

    /// Reduction with `op` over `0..n` of the values produced by `f`.
    ///
    /// Every contribution starts as `op.init()` and is joined in index
    /// order.
    pub fn vector_par_reduce_with<J: JoinOp>(
        &self,
        n: usize,
        op: &J,
        mut f: impl FnMut(usize, &mut J::Value),
    ) -> J::Value {
        let mut total = op.init();
        for i in 0..n {
            let mut tmp = op.init();
            f(i, &mut tmp);
            op.join(&mut total, &tmp);
        }
        total
    }

    /// Serial prefix scan over `0..n`.
    ///
    /// `f(i, scan, true)` finds the exclusive prefix of index `i` in `scan`
    /// and must add its own contribution to it. Returns the total over all
    /// indices. The `final` flag is always `true` because there is exactly
    /// one pass.
    pub fn vector_par_scan<T: Default>(
        &self,
        n: usize,
        mut f: impl FnMut(usize, &mut T, bool),
    ) -> T {
        let mut scan = T::default();
        for i in 0..n {
            f(i, &mut scan, true);
        }
        scan
    }
}
