use crate::{config::PoolConfig, team::TeamMember, worker::Worker};
use core::{num::NonZeroUsize, ops::Range};

/// Static block partition of a league of teams over the groups of a pool.
///
/// Every group owns `shepherd_iter = ceil(league_size / group_count)`
/// consecutive team indices, counted back from the end of the league: the
/// last group ends at `league_size` and each earlier group ends where the
/// next one starts. Leading groups may therefore own a shorter range or
/// nothing at all.
///
/// ```
/// use core::num::NonZeroUsize;
/// use spmd_collectives::league::LeaguePartition;
///
/// let partition = LeaguePartition::new(10, NonZeroUsize::new(3).unwrap());
/// assert_eq!(partition.shepherd_iter(), 4);
/// assert_eq!(partition.range(0), 0..2);
/// assert_eq!(partition.range(1), 2..6);
/// assert_eq!(partition.range(2), 6..10);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LeaguePartition {
    league_size: usize,
    group_count: NonZeroUsize,
    shepherd_iter: usize,
}

impl LeaguePartition {
    /// Partitions `league_size` teams over `group_count` groups.
    #[must_use]
    pub fn new(league_size: usize, group_count: NonZeroUsize) -> Self {
        Self {
            league_size,
            group_count,
            shepherd_iter: league_size.div_ceil(group_count.get()),
        }
    }

    /// Number of teams in the league.
    #[must_use]
    pub fn league_size(&self) -> usize {
        self.league_size
    }

    /// Number of groups sharing the league.
    #[must_use]
    pub fn group_count(&self) -> NonZeroUsize {
        self.group_count
    }

    /// Chunk of teams per group.
    #[must_use]
    pub fn shepherd_iter(&self) -> usize {
        self.shepherd_iter
    }

    /// Team indices `[league_rank, league_end)` owned by group `group_rank`.
    ///
    /// # Panics
    /// If `group_rank >= group_count`.
    #[must_use]
    pub fn range(&self, group_rank: usize) -> Range<usize> {
        let groups_after = self
            .group_count
            .get()
            .checked_sub(group_rank + 1)
            .expect("LeaguePartition::range: group rank out of range");
        let league_end = self
            .league_size
            .saturating_sub(self.shepherd_iter.saturating_mul(groups_after));
        league_end.saturating_sub(self.shepherd_iter)..league_end
    }

    /// Ranges of every group, in group order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.group_count.get()).map(|group_rank| self.range(group_rank))
    }
}

/// League of teams to run on a pool, one active team per group at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TeamPolicy {
    partition: LeaguePartition,
    team_size: usize,
}

impl TeamPolicy {
    /// Policy for `league_size` teams of `team_size` workers.
    ///
    /// `team_size` is clamped to `[1, group_worker_size]`.
    #[must_use]
    pub fn new(config: &PoolConfig, league_size: usize, team_size: usize) -> Self {
        Self {
            partition: LeaguePartition::new(league_size, config.group_count()),
            team_size: team_size.clamp(1, Self::team_size_max(config)),
        }
    }

    /// Largest team a pool with `config` can run.
    #[must_use]
    pub fn team_size_max(config: &PoolConfig) -> usize {
        config.group_worker_size().get()
    }

    /// Workers per team.
    #[must_use]
    pub fn team_size(&self) -> usize {
        self.team_size
    }

    /// Number of teams in the league.
    #[must_use]
    pub fn league_size(&self) -> usize {
        self.partition.league_size()
    }

    /// Assignment of teams to groups.
    #[must_use]
    pub fn partition(&self) -> &LeaguePartition {
        &self.partition
    }

    /// Runs `f` for every team this worker's group owns.
    ///
    /// Must be called by every worker of the pool. Workers that are not team
    /// members (group rank `>= team_size`) return immediately.
    pub fn execute<'a>(&self, worker: Worker<'a>, mut f: impl FnMut(&mut TeamMember<'a>)) {
        let mut member = TeamMember::new(worker, self);
        while member.is_live() {
            f(&mut member);
            member.next_team();
        }
    }
}
