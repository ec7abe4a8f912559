//! Resumable activities and their frames
//!
//! An activity body is an `async` block; every `.await` on one of this
//! crate's futures is a suspension point. The body's compiler-generated
//! state machine lives in an [`Activity`] cell together with a factory
//! closure that rebuilds it, which is all a frame is: resume position,
//! locals and the abort marker.
//!
//! # Example
//! ```
//! use core::pin::pin;
//! use tickloop::activity::{activity, pause, Frame, Status};
//!
//! let mut act = pin!(activity(|| async {
//!     pause().await;
//! }));
//!
//! assert_eq!(act.as_mut().tick(), Status::Waiting);
//! assert_eq!(act.as_mut().tick(), Status::Done);
//! // Done reset the frame; the next tick starts a fresh run.
//! assert_eq!(act.as_mut().tick(), Status::Waiting);
//! ```

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use crate::common::noop_waker;

/// Outcome of one invocation of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Not finished; invoke again next tick.
    Waiting,
    /// Finished; the frame is back in its initial state.
    Done,
}

/// Why an activity body is starting from the top.
///
/// Passed to cause-aware factories (see [`activity_with_cause`]) so a
/// body can tell a truly fresh start from a restart right after a
/// forced abort, before the marker is overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartCause {
    Fresh,
    AfterAbort,
}

/// The capability surface of a frame, independent of its concrete
/// activity type.
///
/// Join and preemption constructs operate on `dyn Frame` so they can
/// tick, reset and abort-mark participants without knowing their body
/// types. The suspend/resume notifications default to no-ops; a frame
/// opts in by wrapping itself in
/// [`with_suspend_hooks`](crate::hooks::with_suspend_hooks).
pub trait Frame {
    /// Advance the frame by one tick.
    fn tick(self: Pin<&mut Self>) -> Status;

    /// Return the frame to its initial state, dropping any live run.
    fn reset(self: Pin<&mut Self>);

    /// Record that the frame was cut short rather than completed.
    ///
    /// Always preceded by [`reset`](Frame::reset); the marker stays
    /// observable until the next invocation.
    fn mark_aborted(self: Pin<&mut Self>);

    /// Whether the frame holds an unread abort marker.
    fn is_aborted(&self) -> bool;

    /// Notification that an enclosing construct froze this frame.
    fn on_suspend(self: Pin<&mut Self>) {}

    /// Notification that an enclosing construct unfroze this frame.
    fn on_resume(self: Pin<&mut Self>) {}
}

/// Frame of a single activity: the live body future, the factory that
/// rebuilds it for a new run, and the abort marker.
///
/// Create with [`activity`] or [`activity_with_cause`] and pin with
/// [`core::pin::pin!`] before ticking.
pub struct Activity<Fut, Fac> {
    factory: Fac,
    live: Option<Fut>,
    aborted: bool,
}

impl<Fut, Fac> Activity<Fut, Fac>
where
    Fut: Future<Output = ()>,
    Fac: FnMut(StartCause) -> Fut,
{
    pub fn new(factory: Fac) -> Self {
        Self {
            factory,
            live: None,
            aborted: false,
        }
    }
}

impl<Fut, Fac> Frame for Activity<Fut, Fac>
where
    Fut: Future<Output = ()>,
    Fac: FnMut(StartCause) -> Fut,
{
    fn tick(self: Pin<&mut Self>) -> Status {
        // Safety: the cell is pinned and the live future is never
        // moved; it is polled in place and dropped in place.
        let this = unsafe { self.get_unchecked_mut() };

        // An unread abort marker means the previous run was cut
        // short; this invocation overwrites it and restarts the body.
        let cause = if this.aborted {
            this.live = None;
            this.aborted = false;
            StartCause::AfterAbort
        } else {
            StartCause::Fresh
        };

        let live = this.live.get_or_insert_with(|| (this.factory)(cause));
        let live = unsafe { Pin::new_unchecked(live) };

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        match live.poll(&mut cx) {
            Poll::Ready(()) => {
                this.live = None;
                Status::Done
            }
            Poll::Pending => Status::Waiting,
        }
    }

    fn reset(self: Pin<&mut Self>) {
        let this = unsafe { self.get_unchecked_mut() };
        this.live = None;
        this.aborted = false;
    }

    fn mark_aborted(self: Pin<&mut Self>) {
        unsafe { self.get_unchecked_mut() }.aborted = true;
    }

    fn is_aborted(&self) -> bool {
        self.aborted
    }
}

/// Create an activity frame from a body factory.
///
/// The factory is called once per run; communication in and out of the
/// body goes through shared cells ([`Cell`](core::cell::Cell),
/// [`Signal`](crate::signal::Signal)) captured by reference.
///
/// # Example
/// ```
/// use core::cell::Cell;
/// use core::pin::pin;
/// use tickloop::activity::{activity, pause, Frame};
///
/// let out = Cell::new(0);
/// let out = &out;
/// let mut act = pin!(activity(|| async move {
///     out.set(1);
///     pause().await;
///     out.set(2);
/// }));
/// act.as_mut().tick();
/// assert_eq!(out.get(), 1);
/// ```
pub fn activity<Fut, F>(mut f: F) -> Activity<Fut, impl FnMut(StartCause) -> Fut>
where
    Fut: Future<Output = ()>,
    F: FnMut() -> Fut,
{
    Activity::new(move |_| f())
}

/// Like [`activity`], but the factory receives the [`StartCause`], so
/// the body can react to being restarted after an abort.
pub fn activity_with_cause<Fut, Fac>(factory: Fac) -> Activity<Fut, Fac>
where
    Fut: Future<Output = ()>,
    Fac: FnMut(StartCause) -> Fut,
{
    Activity::new(factory)
}

/// Run a child activity to completion, across as many ticks as it
/// needs.
///
/// Each tick of the parent that reaches this point ticks the child
/// once; the parent continues past the `.await` in the same tick the
/// child finishes.
pub fn run<F>(frame: Pin<&mut F>) -> Run<'_, F>
where
    F: Frame + ?Sized,
{
    Run { frame }
}

/// Future returned by [`run`].
pub struct Run<'a, F: ?Sized> {
    frame: Pin<&'a mut F>,
}

impl<F> Future for Run<'_, F>
where
    F: Frame + ?Sized,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        match this.frame.as_mut().tick() {
            Status::Done => Poll::Ready(()),
            Status::Waiting => Poll::Pending,
        }
    }
}

/// Wait exactly one tick, then continue.
pub fn pause() -> Pause {
    Pause { waited: false }
}

/// Future returned by [`pause`].
#[derive(Debug)]
pub struct Pause {
    waited: bool,
}

impl Future for Pause {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.waited {
            Poll::Ready(())
        } else {
            self.waited = true;
            Poll::Pending
        }
    }
}

/// Block forever. Use to keep a finished participant idle until an
/// enclosing join or preemption construct cuts it short.
pub fn halt() -> Halt {
    Halt {}
}

/// Future returned by [`halt`].
#[derive(Debug)]
pub struct Halt {}

impl Future for Halt {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        Poll::Pending
    }
}

/// Wait at least one tick, then continue on the first tick where the
/// condition holds.
///
/// The condition is deliberately not checked on the current tick: it
/// was typically computed from this tick's inputs already. Use
/// [`wait_for_immediate`] to also check right away.
pub fn wait_for<P>(pred: P) -> WaitFor<P>
where
    P: FnMut() -> bool,
{
    WaitFor { pred, armed: false }
}

/// Future returned by [`wait_for`].
pub struct WaitFor<P> {
    pred: P,
    armed: bool,
}

impl<P> Future for WaitFor<P>
where
    P: FnMut() -> bool,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        if !this.armed {
            this.armed = true;
            return Poll::Pending;
        }

        if (this.pred)() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Continue on the first tick, including this one, where the
/// condition holds.
pub fn wait_for_immediate<P>(pred: P) -> WaitForImmediate<P>
where
    P: FnMut() -> bool,
{
    WaitForImmediate { pred }
}

/// Future returned by [`wait_for_immediate`].
pub struct WaitForImmediate<P> {
    pred: P,
}

impl<P> Future for WaitForImmediate<P>
where
    P: FnMut() -> bool,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        if (this.pred)() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::pin::pin;

    use super::*;

    #[test]
    fn reset_on_done() {
        let out = Cell::new(0);
        let out = &out;

        let mut act = pin!(activity(|| async move {
            out.set(out.get() + 1);
            pause().await;
            out.set(out.get() + 10);
        }));

        assert_eq!(act.as_mut().tick(), Status::Waiting);
        assert_eq!(out.get(), 1);
        assert_eq!(act.as_mut().tick(), Status::Done);
        assert_eq!(out.get(), 11);

        // A completed frame starts a brand-new run from the top.
        assert_eq!(act.as_mut().tick(), Status::Waiting);
        assert_eq!(out.get(), 12);
        assert_eq!(act.as_mut().tick(), Status::Done);
        assert_eq!(out.get(), 22);
    }

    #[test]
    fn locals_are_cleared_between_runs() {
        let out = Cell::new(0);
        let out = &out;

        let mut act = pin!(activity(|| async move {
            let mut value = 0;
            out.set(value);
            pause().await;
            value = 42;
            out.set(value);
            pause().await;
        }));

        for _ in 0..2 {
            assert_eq!(act.as_mut().tick(), Status::Waiting);
            assert_eq!(out.get(), 0);
            assert_eq!(act.as_mut().tick(), Status::Waiting);
            assert_eq!(out.get(), 42);
            assert_eq!(act.as_mut().tick(), Status::Done);
        }
    }

    #[test]
    fn abort_marker_is_read_once() {
        let mut act = pin!(activity(|| async {
            halt().await;
        }));

        assert_eq!(act.as_mut().tick(), Status::Waiting);

        act.as_mut().reset();
        act.as_mut().mark_aborted();
        assert!(act.is_aborted());

        // The next invocation overwrites the marker and restarts.
        assert_eq!(act.as_mut().tick(), Status::Waiting);
        assert!(!act.is_aborted());
    }

    #[test]
    fn start_cause_after_abort() {
        let causes = Cell::new((0, 0));
        let causes = &causes;

        let mut act = pin!(activity_with_cause(|cause| async move {
            let (fresh, aborted) = causes.get();
            match cause {
                StartCause::Fresh => causes.set((fresh + 1, aborted)),
                StartCause::AfterAbort => causes.set((fresh, aborted + 1)),
            }
            halt().await;
        }));

        act.as_mut().tick();
        assert_eq!(causes.get(), (1, 0));

        act.as_mut().reset();
        act.as_mut().mark_aborted();
        act.as_mut().tick();
        assert_eq!(causes.get(), (1, 1));

        act.as_mut().reset();
        act.as_mut().tick();
        assert_eq!(causes.get(), (2, 1));
    }

    #[test]
    fn run_continues_same_tick() {
        let out = Cell::new(0);
        let out = &out;

        let mut act = pin!(activity(|| async move {
            let mut child = pin!(activity(|| async move {
                out.set(1);
                pause().await;
                out.set(2);
            }));

            run(child.as_mut()).await;
            // Reached in the same tick the child finished.
            out.set(out.get() + 10);
        }));

        assert_eq!(act.as_mut().tick(), Status::Waiting);
        assert_eq!(out.get(), 1);
        assert_eq!(act.as_mut().tick(), Status::Done);
        assert_eq!(out.get(), 12);
    }

    #[test]
    fn run_reuses_one_slot() {
        let out = Cell::new(0);
        let out = &out;

        let mut act = pin!(activity(|| async move {
            let mut child = pin!(activity(|| async move {
                out.set(out.get() + 1);
                pause().await;
            }));

            run(child.as_mut()).await;
            run(child.as_mut()).await;
        }));

        assert_eq!(act.as_mut().tick(), Status::Waiting);
        assert_eq!(act.as_mut().tick(), Status::Waiting);
        assert_eq!(act.as_mut().tick(), Status::Done);
        assert_eq!(out.get(), 2);
    }

    #[test]
    fn wait_for_skips_current_tick() {
        let value = Cell::new(42);
        let value = &value;

        let mut act = pin!(activity(|| async move {
            wait_for(|| value.get() == 42).await;
        }));

        // True already, but not checked until the next tick.
        assert_eq!(act.as_mut().tick(), Status::Waiting);
        value.set(0);
        assert_eq!(act.as_mut().tick(), Status::Waiting);
        value.set(42);
        assert_eq!(act.as_mut().tick(), Status::Done);
    }

    #[test]
    fn wait_for_immediate_completes_same_tick() {
        let value = Cell::new(42);
        let value = &value;

        let mut act = pin!(activity(|| async move {
            wait_for_immediate(|| value.get() == 42).await;
        }));

        assert_eq!(act.as_mut().tick(), Status::Done);
    }
}
