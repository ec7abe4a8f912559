//! Deferred cleanup, enter actions and suspend/resume notification
//!
//! [`defer`] leans on drop order: the guard lives in the body's frame,
//! so the closure runs on every way out of the run, whether the body
//! completed or an enclosing construct dropped the run mid-flight.
//!
//! The `with_*` functions wrap a frame in another [`Frame`]. The
//! wrapper travels with the frame through joins and preemption
//! constructs, so opting in is structural: no registry, no ids, just a
//! bigger frame value.
//!
//! # Example
//! ```
//! use core::cell::Cell;
//! use core::pin::pin;
//! use tickloop::activity::{activity, halt, Frame, Status};
//! use tickloop::hooks::defer;
//! use tickloop::preempt::after_abort;
//!
//! let off = Cell::new(false);
//! let off = &off;
//!
//! let mut act = pin!(activity(|| async move {
//!     let mut child = pin!(activity(|| async move {
//!         let _guard = defer(|| off.set(true));
//!         // led on ...
//!         halt().await;
//!     }));
//!     after_abort(2, child.as_mut()).await;
//! }));
//!
//! while act.as_mut().tick() == Status::Waiting {}
//! // The run was cut short, but the cleanup still ran.
//! assert!(off.get());
//! ```

use core::pin::Pin;

use crate::activity::{Frame, Status};
use crate::common::trace;

/// Run a closure when the guard is dropped.
///
/// Bind the guard to a local at the top of the body; it is dropped,
/// and the closure runs, when the run ends on any path: normal
/// completion, abort, reset, or losing a join.
pub fn defer<F>(f: F) -> Defer<F>
where
    F: FnOnce(),
{
    Defer { f: Some(f) }
}

/// Guard returned by [`defer`].
#[must_use = "dropping the guard immediately runs the cleanup now"]
pub struct Defer<F>
where
    F: FnOnce(),
{
    f: Option<F>,
}

impl<F> Drop for Defer<F>
where
    F: FnOnce(),
{
    fn drop(&mut self) {
        if let Some(f) = self.f.take() {
            f();
        }
    }
}

/// Run an action at the start of every invocation of the frame.
///
/// The action runs before the resumed body, on every tick of every
/// run, making it the place for per-tick work that must happen even
/// while the body sits in a multi-tick wait.
pub fn with_enter<F, A>(frame: F, action: A) -> WithEnter<F, A>
where
    F: Frame,
    A: FnMut(),
{
    WithEnter { frame, action }
}

/// Frame wrapper returned by [`with_enter`].
pub struct WithEnter<F, A> {
    frame: F,
    action: A,
}

impl<F, A> WithEnter<F, A> {
    fn frame(self: Pin<&mut Self>) -> Pin<&mut F> {
        // Safety: frame is never moved out of the pinned wrapper.
        unsafe { self.map_unchecked_mut(|this| &mut this.frame) }
    }
}

impl<F, A> Frame for WithEnter<F, A>
where
    F: Frame,
    A: FnMut(),
{
    fn tick(self: Pin<&mut Self>) -> Status {
        let this = unsafe { self.get_unchecked_mut() };

        (this.action)();
        unsafe { Pin::new_unchecked(&mut this.frame) }.tick()
    }

    fn reset(self: Pin<&mut Self>) {
        self.frame().reset();
    }

    fn mark_aborted(self: Pin<&mut Self>) {
        self.frame().mark_aborted();
    }

    fn is_aborted(&self) -> bool {
        self.frame.is_aborted()
    }

    fn on_suspend(self: Pin<&mut Self>) {
        self.frame().on_suspend();
    }

    fn on_resume(self: Pin<&mut Self>) {
        self.frame().on_resume();
    }
}

/// Opt a frame into suspend/resume notification.
///
/// `on_suspend` runs when an enclosing
/// [`when_suspend`](crate::preempt::when_suspend) freezes the frame,
/// `on_resume` when it unfreezes it. Frames without this wrapper
/// ignore both notifications.
pub fn with_suspend_hooks<F, S, R>(frame: F, on_suspend: S, on_resume: R) -> WithSuspendHooks<F, S, R>
where
    F: Frame,
    S: FnMut(),
    R: FnMut(),
{
    WithSuspendHooks {
        frame,
        on_suspend,
        on_resume,
    }
}

/// Frame wrapper returned by [`with_suspend_hooks`].
pub struct WithSuspendHooks<F, S, R> {
    frame: F,
    on_suspend: S,
    on_resume: R,
}

impl<F, S, R> WithSuspendHooks<F, S, R> {
    fn frame(self: Pin<&mut Self>) -> Pin<&mut F> {
        // Safety: frame is never moved out of the pinned wrapper.
        unsafe { self.map_unchecked_mut(|this| &mut this.frame) }
    }
}

impl<F, S, R> Frame for WithSuspendHooks<F, S, R>
where
    F: Frame,
    S: FnMut(),
    R: FnMut(),
{
    fn tick(self: Pin<&mut Self>) -> Status {
        self.frame().tick()
    }

    fn reset(self: Pin<&mut Self>) {
        self.frame().reset();
    }

    fn mark_aborted(self: Pin<&mut Self>) {
        self.frame().mark_aborted();
    }

    fn is_aborted(&self) -> bool {
        self.frame.is_aborted()
    }

    fn on_suspend(self: Pin<&mut Self>) {
        trace!("suspend hook");
        let this = unsafe { self.get_unchecked_mut() };

        (this.on_suspend)();
        unsafe { Pin::new_unchecked(&mut this.frame) }.on_suspend();
    }

    fn on_resume(self: Pin<&mut Self>) {
        trace!("resume hook");
        let this = unsafe { self.get_unchecked_mut() };

        (this.on_resume)();
        unsafe { Pin::new_unchecked(&mut this.frame) }.on_resume();
    }
}
