use crate::{
    sync::{AtomicU8, Ordering, fence, spin_loop},
    types::WorkerState,
};

/// Arrival/release handshake cell owned by one worker.
///
/// All memory ordering of the combining tree lives here: a `Release` fence
/// precedes every store that hands the flag over, an `Acquire` fence follows
/// every spin that observes the hand-over. Stores and loads themselves are
/// `Relaxed`.
///
/// Aligned to its own cache lines so spinning neighbors do not share a line
/// with the owner's scratch pointer or another worker's flag.
#[must_use]
#[derive(Debug)]
#[repr(align(128))]
pub(crate) struct ActivityFlag {
    state: AtomicU8,
}

impl ActivityFlag {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Active as u8),
        }
    }

    pub(crate) fn state(&self) -> WorkerState {
        WorkerState::from_raw(self.state.load(Ordering::Relaxed))
    }

    /// Called by the owner: it and its fan-in descendants have arrived.
    ///
    /// Publishes every write the owner made (including the ones it acquired
    /// from its descendants) to the parent that awaits this arrival.
    #[inline]
    pub(crate) fn arrive(&self) {
        debug_assert_eq!(self.state(), WorkerState::Active, "ActivityFlag::arrive");
        fence(Ordering::Release);
        self.state
            .store(WorkerState::Inactive as u8, Ordering::Relaxed);
    }

    /// Called by the parent: spins until the owner has arrived.
    #[inline]
    pub(crate) fn await_arrival(&self) {
        self.spin_while(WorkerState::Active);
        fence(Ordering::Acquire);
    }

    /// Called by the parent: wakes the parked owner.
    #[inline]
    pub(crate) fn release(&self) {
        fence(Ordering::Release);
        self.state.store(WorkerState::Active as u8, Ordering::Relaxed);
    }

    /// Called by the owner after `arrive`: spins until the parent released it.
    #[inline]
    pub(crate) fn await_release(&self) {
        self.spin_while(WorkerState::Inactive);
        fence(Ordering::Acquire);
    }

    #[inline]
    fn spin_while(&self, state: WorkerState) {
        while self.state.load(Ordering::Relaxed) == state as u8 {
            spin_loop();
        }
    }
}
