use bytemuck::Pod;

/// A value that can travel through a worker's scratch memory.
///
/// Scratch memory is raw, zero-initialized and shared between threads, so
/// only plain-old-data is admitted: every bit pattern must be a valid value.
/// Values must also fit the reduction region and be aligned to at most one
/// scratch grain (64 bytes).
pub trait ScratchValue: Pod + Send + Sync {}

impl<T: Pod + Send + Sync> ScratchValue for T {}

/// State of a worker's activity flag.
///
/// Every flag of a pool is `Active` while no collective is in flight. A
/// worker switches its own flag to `Inactive` to announce that it and all of
/// its fan-in descendants have arrived; its parent switches it back to
/// `Active` to release it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Arrived at a collective and parked until released.
    Inactive = 0,
    /// Running user work, or released from the last collective.
    Active = 1,
}

impl WorkerState {
    #[inline]
    pub(crate) const fn from_raw(raw: u8) -> Self {
        if raw == Self::Active as u8 {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}
