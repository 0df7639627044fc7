use crate::worker::WorkerRecord;
use core::iter;

/// Shape of the combining tree seen from one participant.
///
/// With `size` participants, the participant of rank `r` has reverse rank
/// `rev = size - (r + 1)`. Its fan neighbors have reverse ranks `rev + n` for
/// `n = 1, 2, 4, ...` while the low bits of `rev` stay clear and the neighbor
/// exists. The highest rank (`rev == 0`) is the root and has the most
/// neighbors.
///
/// ```text
/// size = 6, ranks by reverse rank:
///
///   rev 0 (rank 5) <- rev 1 (rank 4)
///                  <- rev 2 (rank 3) <- rev 3 (rank 2)
///                  <- rev 4 (rank 1) <- rev 5 (rank 0)
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Fan {
    size: usize,
    rev: usize,
}

impl Fan {
    #[inline]
    pub(crate) fn new(size: usize, rank: usize) -> Self {
        debug_assert!(rank < size, "Fan::new: rank {rank} out of {size}");
        Self {
            size,
            rev: size - (rank + 1),
        }
    }

    #[inline]
    pub(crate) fn is_root(&self) -> bool {
        self.rev == 0
    }

    /// Ranks of this participant's fan-in children, nearest first.
    ///
    /// Fan-out releases them in the same order.
    #[inline]
    pub(crate) fn neighbors(self) -> impl Iterator<Item = usize> {
        let Self { size, rev } = self;
        iter::successors(Some(1usize), |&n| Some(n << 1))
            .take_while(move |&n| rev & n == 0 && rev + n < size)
            .map(move |n| size - 1 - (rev + n))
    }
}

/// Runs one fan-in / fan-out round for `members[rank]` over the first `size`
/// members.
///
/// - `on_arrival` runs after each fan-in child has arrived, before this
///   member announces its own arrival. The child's subtree is parked and its
///   writes are visible.
/// - `on_root` runs on the root only, once every participant has arrived and
///   before anyone is released. It may touch every participant's scratch.
///
/// Every participant must call this with the same `size`.
pub(crate) fn fan_round<'m>(
    members: &'m [WorkerRecord],
    rank: usize,
    size: usize,
    mut on_arrival: impl FnMut(&'m WorkerRecord),
    on_root: impl FnOnce(&'m [WorkerRecord]),
) {
    debug_assert!(size <= members.len(), "fan_round: [1]");
    let fan = Fan::new(size, rank);
    let me = &members[rank];

    for child in fan.neighbors() {
        let child = &members[child];
        child.flag.await_arrival();
        on_arrival(child);
    }

    if fan.is_root() {
        on_root(&members[..size]);
    } else {
        me.flag.arrive();
        me.flag.await_release();
    }

    for child in fan.neighbors() {
        members[child].flag.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parents(size: usize) -> Vec<Option<usize>> {
        let mut parents = vec![None; size];
        for rank in 0..size {
            for child in Fan::new(size, rank).neighbors() {
                assert!(parents[child].is_none(), "rank {child} has two parents");
                parents[child] = Some(rank);
            }
        }
        parents
    }

    #[test]
    fn highest_rank_is_the_root() {
        for size in 1..=33 {
            assert!(Fan::new(size, size - 1).is_root());
            for rank in 0..size - 1 {
                assert!(!Fan::new(size, rank).is_root());
            }
        }
    }

    #[test]
    fn every_non_root_has_exactly_one_parent() {
        for size in 1..=65 {
            let parents = parents(size);
            assert_eq!(parents[size - 1], None);
            for (rank, parent) in parents.iter().enumerate().take(size - 1) {
                let parent = parent.unwrap_or_else(|| panic!("rank {rank} of {size} orphaned"));
                assert!(parent > rank, "parent must outrank its child");
            }
        }
    }

    #[test]
    fn neighbors_follow_trailing_zeros_of_reverse_rank() {
        let size = 8;
        let expected: [&[usize]; 8] = [
            &[],        // rank 0, rev 7
            &[0],       // rank 1, rev 6
            &[],        // rank 2, rev 5
            &[2, 1],    // rank 3, rev 4
            &[],        // rank 4, rev 3
            &[4],       // rank 5, rev 2
            &[],        // rank 6, rev 1
            &[6, 5, 3], // rank 7, rev 0
        ];
        for (rank, expected) in expected.iter().enumerate() {
            let neighbors: Vec<_> = Fan::new(size, rank).neighbors().collect();
            assert_eq!(&neighbors, expected, "rank {rank}");
        }
    }

    #[test]
    fn depth_is_logarithmic() {
        let size = 1000;
        let parents = parents(size);
        for rank in 0..size {
            let mut depth = 0;
            let mut cursor = rank;
            while let Some(parent) = parents[cursor] {
                cursor = parent;
                depth += 1;
            }
            assert_eq!(cursor, size - 1);
            assert!(depth <= 10, "rank {rank} is {depth} levels deep");
        }
    }
}
