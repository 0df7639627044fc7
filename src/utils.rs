/// Allocation grain of scratch memory, one cache line.
pub(crate) const SCRATCH_GRAIN: usize = 1 << 6;

const SCRATCH_GRAIN_MASK: usize = SCRATCH_GRAIN - 1;

/// Rounds `size` up to the next multiple of [`SCRATCH_GRAIN`].
///
/// Returns `None` if the rounded size does not fit in `usize`.
#[inline]
pub(crate) const fn align_alloc(size: usize) -> Option<usize> {
    match size.checked_add(SCRATCH_GRAIN_MASK) {
        Some(padded) => Some(padded & !SCRATCH_GRAIN_MASK),
        None => None,
    }
}

/// Rounds `offset` up to a multiple of `align`, which must be a power of two.
#[inline]
pub(crate) const fn align_up(offset: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    match offset.checked_add(align - 1) {
        Some(padded) => Some(padded & !(align - 1)),
        None => None,
    }
}
