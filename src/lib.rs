#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! Concurrency backbone for multimedia and streaming pipelines.
//!
//! Strand provides three tightly coupled building blocks:
//!
//! - Bounded channels in four producer/consumer multiplicities
//!   ([`spsc`], [`mpsc`], [`spmc`], [`mpmc`]), all sharing one lock-free
//!   circular-buffer discipline with monotonic 64-bit indices.
//! - A [`pool::ThreadPool`] draining a general FIFO queue plus per-tag
//!   serial sub-queues, so tasks sharing a tag run one at a time in
//!   submission order.
//! - A [`timer::AsyncTimer`] that sleeps until the nearest deadline and
//!   dispatches fired callbacks onto its own thread pool.
//!
//! Blocking channel operations cooperate by yielding; they never park a
//! thread. The pool and timer block on condition variables and join their
//! workers on shutdown, so no worker thread ever outlives its owner.

// Core modules
pub mod error;

// Channel variant modules
pub mod mpmc;
pub mod mpsc;
pub mod spmc;
pub mod spsc;

// Executors
pub mod pool;
pub mod timer;

// Internal utilities - not part of the public API
mod internal;
mod ring;

// Public re-exports for convenience
pub use error::{RecvError, SendError, TryRecvError, TrySendError};
pub use pool::ThreadPool;
pub use timer::{AsyncTimer, TimerId};
