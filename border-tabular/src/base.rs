//! Core functionalities.
mod env;
mod step;
pub use env::{ActionSpace, Env};
use std::{convert::TryFrom, fmt::Debug, hash::Hash};
pub use step::{Info, Step};

/// A state of an environment.
///
/// States are keys of the Q-table, so they must be hashable and comparable.
/// This trait is implemented for every type satisfying the bounds.
pub trait State: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> State for T {}

/// An action of an environment.
///
/// Actions are keys of the Q-table as well as states. Discrete action spaces given
/// as a number of actions `n` ([`ActionSpace::Discrete`]) are turned into actions
/// with [`Act::from_index`]; types without a natural index keep the default
/// implementation, which returns `None`, and must be listed with
/// [`ActionSpace::Enumerated`].
pub trait Act: Clone + Eq + Hash + Debug {
    /// Returns the `ix`-th action of a discrete action space.
    #[allow(unused_variables)]
    fn from_index(ix: usize) -> Option<Self> {
        None
    }
}

macro_rules! impl_act_for_int {
    ($($t:ty),*) => {
        $(
            impl Act for $t {
                fn from_index(ix: usize) -> Option<Self> {
                    <$t>::try_from(ix).ok()
                }
            }
        )*
    };
}

impl_act_for_int!(usize, u8, u16, u32, u64, isize, i8, i16, i32, i64);

impl Act for char {}

impl Act for bool {}

impl Act for String {}

impl Act for &'static str {}
