//! Preemption: cutting a running frame short from outside
//!
//! Each construct here wraps a child frame and, on every tick, checks
//! a condition before the child runs. The condition sees the current
//! tick's inputs, including on the very first tick, so a child guarded
//! by an already-true abort condition never runs at all.
//!
//! Aborting and resetting both drop the child's live run; the
//! difference is what happens next. An abort completes the construct
//! and leaves the child's frame abort-marked for whoever invokes it
//! next. A reset restarts the child from the top in the same tick.
//!
//! # Example
//! ```
//! use core::cell::Cell;
//! use core::pin::pin;
//! use tickloop::activity::{activity, halt, Frame, Status};
//! use tickloop::preempt::{when_abort, Exit};
//!
//! let stop = Cell::new(false);
//! let stop = &stop;
//!
//! let mut act = pin!(activity(|| async move {
//!     let mut child = pin!(activity(|| async { halt().await }));
//!     let exit = when_abort(|| stop.get(), child.as_mut()).await;
//!     assert_eq!(exit, Exit::Aborted);
//! }));
//!
//! assert_eq!(act.as_mut().tick(), Status::Waiting);
//! stop.set(true);
//! assert_eq!(act.as_mut().tick(), Status::Done);
//! ```

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use crate::activity::{Frame, Status};
use crate::common::trace;
use crate::timer::{reached, Clock};

/// How a preemptible construct ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The child ran to completion on its own.
    Completed,
    /// The condition fired and the child was cut short.
    Aborted,
}

fn abort(mut frame: Pin<&mut (impl Frame + ?Sized)>) {
    frame.as_mut().reset();
    frame.as_mut().mark_aborted();
}

/// Run the child until it completes or the condition holds.
///
/// The condition is checked before the child's tick; when it fires the
/// child's run is dropped, its frame is abort-marked, and the
/// construct completes with [`Exit::Aborted`] without giving the child
/// its tick.
pub fn when_abort<P, F>(pred: P, frame: Pin<&mut F>) -> WhenAbort<'_, P, F>
where
    P: FnMut() -> bool,
    F: Frame + ?Sized,
{
    WhenAbort { pred, frame }
}

/// Future returned by [`when_abort`].
pub struct WhenAbort<'a, P, F: ?Sized> {
    pred: P,
    frame: Pin<&'a mut F>,
}

impl<P, F> Future for WhenAbort<'_, P, F>
where
    P: FnMut() -> bool,
    F: Frame + ?Sized,
{
    type Output = Exit;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        if (this.pred)() {
            trace!("abort condition fired");
            abort(this.frame.as_mut());
            return Poll::Ready(Exit::Aborted);
        }

        match this.frame.as_mut().tick() {
            Status::Done => Poll::Ready(Exit::Completed),
            Status::Waiting => Poll::Pending,
        }
    }
}

/// Run the child until it completes or `ms` milliseconds have passed.
///
/// The timeout measures from the first tick that reaches the
/// construct. On the tick the deadline is reached, the child is
/// aborted before it runs.
pub fn after_ms_abort<'a, F>(
    ms: u32,
    clock: &'a Clock,
    frame: Pin<&'a mut F>,
) -> AfterMsAbort<'a, F>
where
    F: Frame + ?Sized,
{
    AfterMsAbort {
        clock,
        duration: ms,
        deadline: None,
        frame,
    }
}

/// Future returned by [`after_ms_abort`].
pub struct AfterMsAbort<'a, F: ?Sized> {
    clock: &'a Clock,
    duration: u32,
    deadline: Option<u32>,
    frame: Pin<&'a mut F>,
}

impl<F> Future for AfterMsAbort<'_, F>
where
    F: Frame + ?Sized,
{
    type Output = Exit;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        let deadline = *this
            .deadline
            .get_or_insert_with(|| this.clock.now().wrapping_add(this.duration));

        if reached(this.clock.now(), deadline) {
            trace!("timeout fired after {} ms", this.duration);
            abort(this.frame.as_mut());
            return Poll::Ready(Exit::Aborted);
        }

        match this.frame.as_mut().tick() {
            Status::Done => Poll::Ready(Exit::Completed),
            Status::Waiting => Poll::Pending,
        }
    }
}

/// Run the child until it completes or `ticks` ticks have passed.
///
/// `after_abort(0)` aborts on the first tick without running the
/// child; `after_abort(n)` gives the child `n` ticks.
pub fn after_abort<F>(ticks: u32, frame: Pin<&mut F>) -> AfterAbort<'_, F>
where
    F: Frame + ?Sized,
{
    AfterAbort {
        remaining: ticks,
        frame,
    }
}

/// Future returned by [`after_abort`].
pub struct AfterAbort<'a, F: ?Sized> {
    remaining: u32,
    frame: Pin<&'a mut F>,
}

impl<F> Future for AfterAbort<'_, F>
where
    F: Frame + ?Sized,
{
    type Output = Exit;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        if this.remaining == 0 {
            abort(this.frame.as_mut());
            return Poll::Ready(Exit::Aborted);
        }
        this.remaining -= 1;

        match this.frame.as_mut().tick() {
            Status::Done => Poll::Ready(Exit::Completed),
            Status::Waiting => Poll::Pending,
        }
    }
}

/// Run the child until it completes, restarting it from the top on
/// every tick where the condition holds.
///
/// A reset happens within the tick: the run is dropped and the
/// restarted body runs its first segment immediately. The restart
/// carries [`StartCause::AfterAbort`](crate::activity::StartCause),
/// like any other forced termination.
pub fn when_reset<P, F>(pred: P, frame: Pin<&mut F>) -> WhenReset<'_, P, F>
where
    P: FnMut() -> bool,
    F: Frame + ?Sized,
{
    WhenReset { pred, frame }
}

/// Future returned by [`when_reset`].
pub struct WhenReset<'a, P, F: ?Sized> {
    pred: P,
    frame: Pin<&'a mut F>,
}

impl<P, F> Future for WhenReset<'_, P, F>
where
    P: FnMut() -> bool,
    F: Frame + ?Sized,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        if (this.pred)() {
            trace!("reset condition fired");
            abort(this.frame.as_mut());
        }

        match this.frame.as_mut().tick() {
            Status::Done => Poll::Ready(()),
            Status::Waiting => Poll::Pending,
        }
    }
}

/// Run the child until it completes, freezing it on every tick where
/// the condition holds.
///
/// A frozen child keeps its frame exactly as it was and receives no
/// tick; time-based waits inside it effectively stretch. The child is
/// notified through [`Frame::on_suspend`] on the first frozen tick and
/// [`Frame::on_resume`] on the first tick it runs again.
pub fn when_suspend<P, F>(pred: P, frame: Pin<&mut F>) -> WhenSuspend<'_, P, F>
where
    P: FnMut() -> bool,
    F: Frame + ?Sized,
{
    WhenSuspend {
        pred,
        frame,
        suspended: false,
    }
}

/// Future returned by [`when_suspend`].
pub struct WhenSuspend<'a, P, F: ?Sized> {
    pred: P,
    frame: Pin<&'a mut F>,
    suspended: bool,
}

impl<P, F> Future for WhenSuspend<'_, P, F>
where
    P: FnMut() -> bool,
    F: Frame + ?Sized,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        if (this.pred)() {
            if !this.suspended {
                trace!("suspending");
                this.suspended = true;
                this.frame.as_mut().on_suspend();
            }
            return Poll::Pending;
        }

        if this.suspended {
            trace!("resuming");
            this.suspended = false;
            this.frame.as_mut().on_resume();
        }

        match this.frame.as_mut().tick() {
            Status::Done => Poll::Ready(()),
            Status::Waiting => Poll::Pending,
        }
    }
}

/// Run the child once per rising edge of the condition, forever.
///
/// While the condition is false the child is left alone. On a tick
/// where it is true and no run is active, a run starts; while a run is
/// active the condition going false aborts it. The construct never
/// completes on its own; cut it short with an enclosing join or
/// preemption construct.
pub fn whenever<P, F>(pred: P, frame: Pin<&mut F>) -> Whenever<'_, P, F>
where
    P: FnMut() -> bool,
    F: Frame + ?Sized,
{
    Whenever {
        pred,
        frame,
        active: false,
    }
}

/// Future returned by [`whenever`].
pub struct Whenever<'a, P, F: ?Sized> {
    pred: P,
    frame: Pin<&'a mut F>,
    active: bool,
}

impl<P, F> Future for Whenever<'_, P, F>
where
    P: FnMut() -> bool,
    F: Frame + ?Sized,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        if (this.pred)() {
            this.active = true;
        } else if this.active {
            trace!("condition dropped; aborting run");
            abort(this.frame.as_mut());
            this.active = false;
        }

        if this.active && this.frame.as_mut().tick() == Status::Done {
            this.active = false;
        }

        Poll::Pending
    }
}
