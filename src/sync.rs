#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::{
        cell::UnsafeCell,
        sync::atomic::{
            AtomicI32, AtomicI64, AtomicIsize, AtomicU8, AtomicU32, AtomicU64, AtomicUsize,
            Ordering, fence,
        },
        thread,
    };
    pub(crate) use std::sync::Arc;

    /// Busy-wait hint. Loom has to be told that the thread cannot progress on
    /// its own, otherwise a spin loop is an infinite model branch.
    #[inline]
    pub(crate) fn spin_loop() {
        thread::yield_now();
    }
}

#[cfg(not(feature = "loom"))]
mod imp {
    pub(crate) use core::sync::atomic::{
        AtomicI32, AtomicI64, AtomicIsize, AtomicU8, AtomicU32, AtomicU64, AtomicUsize, Ordering,
        fence,
    };

    #[inline]
    pub(crate) fn spin_loop() {
        core::hint::spin_loop();
    }

    /// `core::cell::UnsafeCell` behind loom's closure-based access API.
    #[derive(Debug)]
    #[repr(transparent)]
    pub(crate) struct UnsafeCell<T>(core::cell::UnsafeCell<T>);

    impl<T> UnsafeCell<T> {
        pub(crate) const fn new(value: T) -> Self {
            Self(core::cell::UnsafeCell::new(value))
        }

        #[inline]
        pub(crate) fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
            f(self.0.get())
        }

        #[inline]
        pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
            f(self.0.get())
        }
    }
}

pub(crate) use imp::*;
