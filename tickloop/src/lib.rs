//! Tickloop is a tick-driven cooperative runtime for long-running
//! control logic on embedded targets.
//!
//! A driver invokes the root *activity* once per logical time step
//! (tick). The activity body is straight-line `async` code that runs
//! until it would block and then returns [`Status::Waiting`],
//! resuming from the same suspension point on the next tick. When the
//! body finishes, the invocation returns [`Status::Done`] and the
//! activity's frame is back in its initial state, ready for a fresh
//! run.
//!
//! Features:
//! - Static allocation, frames are plain values pinned by the caller
//! - Structured concurrency with strong/weak join participants
//! - Preemption: abort, reset and suspend on per-tick predicates
//! - Tick-counted and wall-clock delays with wraparound-safe time
//! - Deferred cleanup, enter actions, suspend/resume notification
//! - Single-tick broadcast signals
//!
//! # Example
//! ```
//! use core::pin::pin;
//! use tickloop::activity::{activity, pause};
//! use tickloop::Status;
//!
//! let mut blink = pin!(activity(|| async {
//!     // turn led on ...
//!     pause().await;
//!     // turn led off ...
//!     pause().await;
//! }));
//!
//! // The driver ticks the root once per time step until it is done.
//! use tickloop::Frame;
//! while blink.as_mut().tick() == Status::Waiting {}
//! ```
//!
//! See the `demos/` directory for a complete example.
//!
//! [`Status::Waiting`]: activity::Status::Waiting
//! [`Status::Done`]: activity::Status::Done
//! [`Status`]: activity::Status

#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod common;

pub mod activity;
pub mod hooks;
pub mod join;
pub mod preempt;
pub mod signal;
pub mod timer;

pub use activity::{Frame, StartCause, Status};

#[cfg(feature = "macros")]
pub use tickloop_macros::*;
