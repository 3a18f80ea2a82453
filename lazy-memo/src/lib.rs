//! This crate provides compute-once-and-cache primitives ("memoizers") that are safe
//! to share between threads.
//!
//! # Usage
//!
//! 1. Pick a [`Strategy`]. If in doubt, use [`Strategy::default`].
//! 2. Construct a [`LazyMemoizer`] with the strategy and a factory function.
//!    The factory is bound at construction and not run yet.
//! 3. Share the memoizer (`&LazyMemoizer`, `Arc<LazyMemoizer>`) with as many threads as you like.
//! 4. Call [`LazyMemoizer::get`]. The first caller runs the factory, everyone gets the same value.
//!
//! A factory that returns `Err` does not poison the memoizer: the error is handed to the
//! caller and the next `get()` runs the factory again.
//!
//! ## Example 1: Infallible Factory
//!
//! ```rust
//! use lazy_memo::{LazyMemoizer, Strategy};
//!
//! let memo = LazyMemoizer::infallible(Strategy::DoubleChecked, || vec![1, 2, 3]);
//! assert!(!memo.is_computed());
//! assert_eq!(memo.value(), &[1, 2, 3]);
//! assert!(memo.is_computed());
//! ```
//!
//! ## Example 2: Fallible Factory, Shared Between Threads
//!
//! ```rust
//! use lazy_memo::{LazyMemoizer, Strategy};
//!
//! let memo = LazyMemoizer::new(Strategy::DoubleCheckedNulled, || "42".parse::<u64>());
//! std::thread::scope(|scope| {
//!     for _ in 0..4 {
//!         scope.spawn(|| assert_eq!(*memo.get().unwrap(), 42));
//!     }
//! });
//! ```
//!
//! # Strategies
//!
//! All strategies implement the sealed [`ComputeOnce`] trait and can also be used directly,
//! without the boxing that [`LazyMemoizer`] does. They differ in the locking they use and
//! in the [`Guarantee`] they give about factory invocations:
//!
//! - [`strategy::DoubleChecked`]: lock-free fast path on an acquire/release flag, mutex on the slow path.
//! - [`strategy::DoubleCheckedNulled`]: same, but the published value pointer is the flag
//!   and the factory is dropped once the value is published.
//! - [`strategy::AtomicSwap`]: no lock at all. Racing threads may *each* run the factory,
//!   only one of the values is kept. See [`Guarantee::SingleValue`].
//! - [`strategy::OnceCellBacked`]: `once_cell::sync::OnceCell`, for comparison.

pub(crate) mod sealed {
    pub trait Sealed {}
}

mod error;
mod memoizer;
pub mod strategy;

#[cfg(test)]
mod test_util;
#[cfg(test)]
mod tests;

pub use error::Error;
pub use memoizer::LazyMemoizer;
pub use strategy::{ComputeOnce, Guarantee, Strategy};
