use crate::{
    sync::{AtomicI32, AtomicI64, AtomicIsize, AtomicU32, AtomicU64, AtomicUsize, Ordering},
    types::ScratchValue,
};
use core::{fmt, marker::PhantomData, ops::AddAssign};

/// Combine semantics of a reduction or scan.
///
/// `join` must be associative. Reductions combine partial values in tree
/// order, so results match a sequential fold only if `join` is also
/// commutative (or, for floating point, up to rounding). Scans always combine
/// in ascending rank order.
pub trait JoinOp: Sync {
    /// Value being combined; lives in scratch memory during the collective.
    type Value: ScratchValue;
    /// Identity element of `join`.
    fn init(&self) -> Self::Value;
    /// `accum = accum (+) value`.
    fn join(&self, accum: &mut Self::Value, value: &Self::Value);
}

/// Default join: `+=` with the zero value as identity.
pub struct Sum<T>(PhantomData<fn() -> T>);

impl<T> Sum<T> {
    /// Creates the additive join.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Sum<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Sum<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Sum<T> {}

impl<T> fmt::Debug for Sum<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sum")
    }
}

impl<T: ScratchValue + AddAssign> JoinOp for Sum<T> {
    type Value = T;

    #[inline]
    fn init(&self) -> T {
        T::zeroed()
    }

    #[inline]
    fn join(&self, accum: &mut T, value: &T) {
        *accum += *value;
    }
}

/// Join built from an identity value and a closure.
///
/// ```
/// use spmd_collectives::collective::{JoinFn, JoinOp};
///
/// let max = JoinFn::new(u32::MIN, |accum: &mut u32, value: &u32| *accum = (*accum).max(*value));
/// let mut accum = max.init();
/// max.join(&mut accum, &7);
/// max.join(&mut accum, &3);
/// assert_eq!(accum, 7);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct JoinFn<T, F> {
    init: T,
    join: F,
}

impl<T, F> JoinFn<T, F>
where
    T: ScratchValue,
    F: Fn(&mut T, &T) + Sync,
{
    /// Creates a join with identity `init`.
    pub const fn new(init: T, join: F) -> Self {
        Self { init, join }
    }
}

impl<T, F> JoinOp for JoinFn<T, F>
where
    T: ScratchValue,
    F: Fn(&mut T, &T) + Sync,
{
    type Value = T;

    #[inline]
    fn init(&self) -> T {
        self.init
    }

    #[inline]
    fn join(&self, accum: &mut T, value: &T) {
        (self.join)(accum, value);
    }
}

/// Cross-team accumulator of a global scan.
///
/// The root of each team adds its team total and receives the previous
/// value, which becomes the base of the team's exclusive prefix. Teams race
/// for the accumulator, so the base a given team receives is
/// non-deterministic; after the league completes the accumulator holds the
/// total.
pub trait GlobalAccumulator<T>: Sync {
    /// Atomically adds `total` and returns the previous value.
    fn fetch_join(&self, total: T) -> T;
}

macro_rules! impl_global_accumulator {
    ($($atomic:ty => $value:ty),* $(,)?) => {
        $(
            impl GlobalAccumulator<$value> for $atomic {
                #[inline]
                fn fetch_join(&self, total: $value) -> $value {
                    self.fetch_add(total, Ordering::Relaxed)
                }
            }
        )*
    };
}

impl_global_accumulator! {
    AtomicI32 => i32,
    AtomicI64 => i64,
    AtomicIsize => isize,
    AtomicU32 => u32,
    AtomicU64 => u64,
    AtomicUsize => usize,
}
