use crate::{
    sync::UnsafeCell,
    types::ScratchValue,
    utils::{SCRATCH_GRAIN, align_alloc, align_up},
};
use core::{marker::PhantomData, ptr::NonNull};
use thiserror::Error;

/// Error produced when a scratch request cannot be satisfied.
///
/// Raised while the pool is being configured or resized, never while a
/// collective is running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScratchError {
    /// Rounding the request to the allocation grain overflows `usize`.
    #[error("scratch request of {requested} bytes overflows the address space")]
    Overflow {
        /// Requested size in bytes.
        requested: usize,
    },
    /// The grown per-worker buffer would exceed `PoolConfig::scratch_limit`.
    #[error("scratch of {required} bytes per worker exceeds the limit of {limit} bytes")]
    CapacityExceeded {
        /// Bytes per worker the request would need.
        required: usize,
        /// Configured per-worker limit.
        limit: usize,
    },
}

/// Byte layout shared by every worker's scratch buffer.
///
/// The buffer is `[reduction region | team-shared region]`, each region a
/// multiple of 64 bytes. The reduction region always holds at least one grain
/// so scalar collectives work without an explicit resize.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScratchLayout {
    reduce_end: usize,
    shared_size: usize,
}

impl ScratchLayout {
    pub(crate) const MIN: Self = Self {
        reduce_end: SCRATCH_GRAIN,
        shared_size: 0,
    };

    /// Size of the reduction region in bytes.
    #[must_use]
    pub fn reduce_size(&self) -> usize {
        self.reduce_end
    }

    /// Size of the team-shared region in bytes.
    #[must_use]
    pub fn shared_size(&self) -> usize {
        self.shared_size
    }

    /// Size of one worker's whole buffer in bytes.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.reduce_end + self.shared_size
    }

    /// Smallest layout that covers both `self` and the requested sizes.
    ///
    /// Regions only ever grow.
    pub(crate) fn grow(
        self,
        reduce_size: usize,
        shared_size: usize,
        limit: usize,
    ) -> Result<Self, ScratchError> {
        let reduce_end = align_alloc(reduce_size)
            .ok_or(ScratchError::Overflow {
                requested: reduce_size,
            })?
            .max(self.reduce_end);
        let shared_size = align_alloc(shared_size)
            .ok_or(ScratchError::Overflow {
                requested: shared_size,
            })?
            .max(self.shared_size);
        let required = reduce_end
            .checked_add(shared_size)
            .ok_or(ScratchError::Overflow {
                requested: reduce_size.saturating_add(shared_size),
            })?;
        if required > limit {
            return Err(ScratchError::CapacityExceeded { required, limit });
        }
        Ok(Self {
            reduce_end,
            shared_size,
        })
    }
}

#[derive(Copy, Clone)]
#[repr(C, align(64))]
struct Grain([u8; SCRATCH_GRAIN]);

const _: () = assert!(align_of::<Grain>() == SCRATCH_GRAIN);
const _: () = assert!(size_of::<Grain>() == SCRATCH_GRAIN);

/// One worker's cache-aligned, zero-initialized scratch buffer.
///
/// The buffer is reached through a raw base pointer: the owner writes its
/// reduction slot, and during a collective other workers read or write it.
/// Exclusion between those accesses comes from the activity-flag handshake,
/// not from the type system, which is why the accessors are `unsafe`.
#[derive(Debug)]
pub(crate) struct Scratch {
    base: NonNull<Grain>,
    grains: usize,
    layout: ScratchLayout,
    /// Every reduction slot access goes through this cell, so loom sees the
    /// slot as shared memory. Holds no data.
    reduce_access: UnsafeCell<()>,
}

// SAFETY: `Scratch` owns its allocation; cross-thread access goes through the
// unsafe accessors whose callers uphold the flag protocol.
unsafe impl Send for Scratch {}
// SAFETY: See above.
unsafe impl Sync for Scratch {}

impl Scratch {
    pub(crate) fn new(layout: ScratchLayout) -> Self {
        let grains = layout.total_size() / SCRATCH_GRAIN;
        let buffer = vec![Grain([0; SCRATCH_GRAIN]); grains].into_boxed_slice();
        Self {
            base: NonNull::from(Box::leak(buffer)).cast(),
            grains,
            layout,
            reduce_access: UnsafeCell::new(()),
        }
    }

    /// Reduction slot viewed as a `T`.
    ///
    /// # Panics
    /// If `T` does not fit the reduction region or needs more than grain
    /// alignment.
    #[inline]
    fn reduce_slot<T: ScratchValue>(&self) -> *mut T {
        assert!(
            size_of::<T>() <= self.layout.reduce_end && align_of::<T>() <= SCRATCH_GRAIN,
            "value of {} bytes (align {}) does not fit a {}-byte reduction region",
            size_of::<T>(),
            align_of::<T>(),
            self.layout.reduce_end,
        );
        self.base.as_ptr().cast()
    }

    /// # Safety
    ///
    /// No other thread may write the reduction region concurrently.
    #[inline]
    pub(crate) unsafe fn read<T: ScratchValue>(&self) -> T {
        let slot = self.reduce_slot::<T>();
        self.reduce_access.with(|_| {
            // SAFETY: The slot is in-bounds and aligned for `T`,
            // zero-initialized memory is a valid `T` (`Pod`), and the caller
            // excludes writers.
            unsafe { slot.read() }
        })
    }

    /// # Safety
    ///
    /// No other thread may access the reduction region concurrently.
    #[inline]
    pub(crate) unsafe fn write<T: ScratchValue>(&self, value: T) {
        let slot = self.reduce_slot::<T>();
        self.reduce_access.with_mut(|_| {
            // SAFETY: The slot is in-bounds and aligned for `T`; the caller
            // excludes concurrent readers and writers.
            unsafe { slot.write(value) }
        });
    }

    fn shared_region(&self) -> NonNull<u8> {
        // SAFETY: `reduce_end <= total_size`, so the result is in-bounds or
        // one past the end of the allocation.
        unsafe { self.base.cast::<u8>().add(self.layout.reduce_end) }
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let Self { base, grains, .. } = self;
        let slice = core::ptr::slice_from_raw_parts_mut(base.as_ptr(), *grains);
        // SAFETY: `base` and `grains` come from the `Box<[Grain]>` leaked in
        // `Scratch::new` and are released exactly once.
        drop(unsafe { Box::from_raw(slice) });
    }
}

/// Bump allocator over the team-shared scratch region.
///
/// The region belongs to the highest-ranked worker of the group, so every
/// member of a team sees the same bytes. Members that perform the same
/// sequence of [`TeamShmem::get_shmem`] calls receive the same pointers.
/// Accesses through those pointers are not synchronized: order them with
/// `TeamMember::team_barrier`.
#[derive(Debug)]
pub struct TeamShmem<'a> {
    base: NonNull<u8>,
    size: usize,
    offset: usize,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> TeamShmem<'a> {
    pub(crate) fn new(scratch: &'a Scratch) -> Self {
        Self {
            base: scratch.shared_region(),
            size: scratch.layout.shared_size,
            offset: 0,
            _marker: PhantomData,
        }
    }

    /// Total size of the team-shared region in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes not handed out since the last reset.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.size - self.offset
    }

    pub(crate) fn reset(&mut self) {
        self.offset = 0;
    }

    /// Carves `len` consecutive `T`s out of the region.
    ///
    /// Returns `None` once the region is exhausted.
    ///
    /// # Panics
    /// If `T` needs more than 64-byte alignment.
    pub fn get_shmem<T: ScratchValue>(&mut self, len: usize) -> Option<NonNull<T>> {
        assert!(
            align_of::<T>() <= SCRATCH_GRAIN,
            "TeamShmem::get_shmem: alignment {} exceeds the scratch grain",
            align_of::<T>()
        );
        let start = align_up(self.offset, align_of::<T>())?;
        let end = start.checked_add(size_of::<T>().checked_mul(len)?)?;
        if end > self.size {
            return None;
        }
        self.offset = end;
        // SAFETY: `start <= end <= size`, inside the shared region, and the
        // region base is grain aligned.
        Some(unsafe { self.base.add(start) }.cast())
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    #[test]
    fn layout_grows_monotonically() {
        let layout = ScratchLayout::MIN.grow(8, 100, 1 << 20).unwrap();
        assert_eq!(layout.reduce_size(), 64);
        assert_eq!(layout.shared_size(), 128);

        let same = layout.grow(0, 0, 1 << 20).unwrap();
        assert_eq!(same, layout);

        let bigger = layout.grow(200, 1, 1 << 20).unwrap();
        assert_eq!(bigger.reduce_size(), 256);
        assert_eq!(bigger.shared_size(), 128);
        assert_eq!(bigger.total_size(), 384);
    }

    #[test]
    fn layout_rejects_oversized_requests() {
        assert_eq!(
            ScratchLayout::MIN.grow(0, 1000, 512),
            Err(ScratchError::CapacityExceeded {
                required: 64 + 1024,
                limit: 512
            })
        );
        assert_eq!(
            ScratchLayout::MIN.grow(usize::MAX, 0, usize::MAX),
            Err(ScratchError::Overflow {
                requested: usize::MAX
            })
        );
    }

    #[test]
    fn scratch_round_trips_reduction_values() {
        let scratch = Scratch::new(ScratchLayout::MIN);
        // SAFETY: Single-threaded access.
        unsafe {
            assert_eq!(scratch.read::<u64>(), 0);
            scratch.write([1.5f64, -2.0]);
            assert_eq!(scratch.read::<[f64; 2]>(), [1.5, -2.0]);
        }
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn scratch_rejects_values_larger_than_the_reduction_region() {
        let scratch = Scratch::new(ScratchLayout::MIN);
        // SAFETY: Single-threaded access; panics before touching memory.
        unsafe { scratch.write([0u8; 65]) };
    }

    #[test]
    fn team_shmem_bump_allocates_and_resets() {
        let layout = ScratchLayout::MIN.grow(0, 64, 1 << 20).unwrap();
        let scratch = Scratch::new(layout);
        let mut shmem = TeamShmem::new(&scratch);
        assert_eq!(shmem.size(), 64);

        let first = shmem.get_shmem::<u8>(3).unwrap();
        let second = shmem.get_shmem::<u32>(4).unwrap();
        assert_eq!(second.as_ptr() as usize - first.as_ptr() as usize, 4);
        assert_eq!(shmem.remaining(), 64 - 20);
        assert!(shmem.get_shmem::<u64>(6).is_none());

        shmem.reset();
        assert_eq!(shmem.get_shmem::<u8>(1), Some(first));
    }
}
