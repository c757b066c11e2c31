//! Atomics and threads that are model-checked under `--cfg loom`.
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --lib --release
//! ```
//!
//! Without `loom` the models in `#[cfg(test)] mod loom` blocks run once on
//! real threads.

#[cfg(loom)]
mod inner {
    pub(crate) use loom::sync::atomic::{AtomicPtr, AtomicUsize};

    #[cfg(test)]
    pub(crate) use loom::{model, thread};

    /// Spinning never lets the loom scheduler switch threads, so every
    /// backoff step yields instead.
    pub(crate) struct Backoff(());

    impl Backoff {
        pub(crate) fn new() -> Self {
            Backoff(())
        }

        pub(crate) fn spin(&self) {
            loom::thread::yield_now();
        }

        pub(crate) fn snooze(&self) {
            loom::thread::yield_now();
        }
    }
}

#[cfg(not(loom))]
mod inner {
    pub(crate) use core::sync::atomic::{AtomicPtr, AtomicUsize};
    pub(crate) use crossbeam_utils::Backoff;

    #[cfg(test)]
    pub(crate) use std::thread;

    #[cfg(test)]
    pub(crate) fn model(f: impl Fn()) {
        f()
    }
}

pub(crate) use inner::*;
