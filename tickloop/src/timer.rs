//! Tick-counted and wall-clock waits
//!
//! Two notions of time coexist. [`delay`] counts ticks and needs no
//! time source at all. The millisecond variants read a [`Clock`], a
//! shared cell the driver advances between ticks; `u32` milliseconds
//! wrap after ~49.7 days, and all comparisons are wraparound-safe as
//! long as no single wait spans more than half the counter range.
//!
//! # Example
//! ```
//! use core::pin::pin;
//! use tickloop::activity::{activity, Frame, Status};
//! use tickloop::timer::Clock;
//!
//! let clock = Clock::new();
//! let clock = &clock;
//!
//! let mut act = pin!(activity(|| async move {
//!     clock.delay_ms(10).await;
//! }));
//!
//! while act.as_mut().tick() == Status::Waiting {
//!     clock.advance(1);
//! }
//! assert_eq!(clock.now(), 10);
//! ```

use core::cell::Cell;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

/// Millisecond time source shared between the driver and activity
/// bodies.
///
/// The driver owns the progression of time and calls [`set_now`] or
/// [`advance`] between ticks; bodies only read it, through the wait
/// constructors. Within one tick, time stands still.
///
/// [`set_now`]: Clock::set_now
/// [`advance`]: Clock::advance
#[derive(Debug, Default)]
pub struct Clock {
    now: Cell<u32>,
}

impl Clock {
    pub const fn new() -> Self {
        Self { now: Cell::new(0) }
    }

    /// A clock whose current time starts at `ms` instead of zero.
    pub const fn starting_at(ms: u32) -> Self {
        Self { now: Cell::new(ms) }
    }

    /// Current time in milliseconds.
    pub fn now(&self) -> u32 {
        self.now.get()
    }

    /// Overwrite the current time, e.g. from a hardware counter.
    pub fn set_now(&self, ms: u32) {
        self.now.set(ms);
    }

    /// Move the current time forward by `ms`, wrapping at `u32::MAX`.
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    /// Wait until at least `ms` milliseconds have passed.
    ///
    /// The deadline is armed on the first tick that reaches the
    /// `.await`, so the wait measures from there, not from frame
    /// creation. `delay_ms(0)` completes on that same tick.
    pub fn delay_ms(&self, ms: u32) -> DelayMs<'_> {
        DelayMs {
            clock: self,
            duration: ms,
            deadline: None,
        }
    }

    /// Periodic gate with a fixed cadence (see [`EveryMs`]).
    pub fn every_ms(&self, period: u32) -> EveryMs<'_> {
        EveryMs {
            clock: self,
            period,
            baseline: None,
        }
    }
}

/// Wraparound-safe "now is at or past deadline": the signed distance
/// from the deadline to now is non-negative.
pub(crate) fn reached(now: u32, deadline: u32) -> bool {
    now.wrapping_sub(deadline) as i32 >= 0
}

/// Wait a fixed number of ticks.
///
/// `delay(n)` is `Waiting` on the first `n - 1` ticks that poll it and
/// completes on the nth, so `delay(1)` completes on the tick that
/// reaches it and `delay(0)` does too.
pub fn delay(ticks: u32) -> Delay {
    Delay { remaining: ticks }
}

/// Future returned by [`delay`].
#[derive(Debug)]
pub struct Delay {
    remaining: u32,
}

impl Future for Delay {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.remaining > 0 {
            self.remaining -= 1;
        }

        if self.remaining == 0 {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Future returned by [`Clock::delay_ms`].
#[derive(Debug)]
pub struct DelayMs<'a> {
    clock: &'a Clock,
    duration: u32,
    deadline: Option<u32>,
}

impl Future for DelayMs<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let deadline = *this
            .deadline
            .get_or_insert_with(|| this.clock.now().wrapping_add(this.duration));

        if reached(this.clock.now(), deadline) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Periodic gate on an arbitrary condition.
///
/// The first [`wait`](Every::wait) completes on the first tick where
/// the condition holds, including the tick that reaches it. Later
/// waits always let at least one tick pass before checking again, so
/// a condition that stays true yields one body run per tick, not a
/// busy loop within the tick.
///
/// The value lives outside the loop and the per-iteration `.await`
/// borrows it, which is what keeps "first" across iterations:
///
/// ```
/// use core::pin::pin;
/// use tickloop::activity::{activity, Frame, Status};
/// use tickloop::timer::Every;
///
/// let mut act = pin!(activity(|| async {
///     let mut every = Every::new(|| true);
///     let mut count = 0;
///     loop {
///         every.wait().await;
///         count += 1;
///         if count == 3 {
///             break;
///         }
///     }
/// }));
///
/// let mut ticks = 0;
/// while act.as_mut().tick() == Status::Waiting {
///     ticks += 1;
/// }
/// assert_eq!(ticks, 2);
/// ```
pub struct Every<P> {
    pred: P,
    first: bool,
}

impl<P> Every<P>
where
    P: FnMut() -> bool,
{
    pub fn new(pred: P) -> Self {
        Self { pred, first: true }
    }

    /// Wait for the next occurrence of the condition.
    pub fn wait(&mut self) -> EveryWait<'_, P> {
        EveryWait {
            every: self,
            paused: false,
        }
    }
}

/// Future returned by [`Every::wait`].
pub struct EveryWait<'a, P> {
    every: &'a mut Every<P>,
    paused: bool,
}

impl<P> Future for EveryWait<'_, P>
where
    P: FnMut() -> bool,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        if this.every.first {
            if (this.every.pred)() {
                this.every.first = false;
                return Poll::Ready(());
            }
            return Poll::Pending;
        }

        if !this.paused {
            this.paused = true;
            return Poll::Pending;
        }

        if (this.every.pred)() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Periodic gate with a fixed millisecond cadence.
///
/// The first [`wait`](EveryMs::wait) completes immediately and arms
/// the baseline; each later wait completes once a full period has
/// passed since the previous occurrence. The cadence is anchored to
/// the baseline, not to when the body got around to waiting again, so
/// a fast body does not drift. If the loop falls behind by more than
/// one full period, the missed occurrences are dropped and the cadence
/// re-anchors at the current time.
pub struct EveryMs<'a> {
    clock: &'a Clock,
    period: u32,
    baseline: Option<u32>,
}

impl<'c> EveryMs<'c> {
    /// Wait for the next occurrence of the period.
    pub fn wait<'w>(&'w mut self) -> EveryMsWait<'w, 'c> {
        EveryMsWait { every: self }
    }
}

/// Future returned by [`EveryMs::wait`].
pub struct EveryMsWait<'w, 'c> {
    every: &'w mut EveryMs<'c>,
}

impl Future for EveryMsWait<'_, '_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let every = &mut *this.every;

        let Some(baseline) = every.baseline else {
            every.baseline = Some(every.clock.now());
            return Poll::Ready(());
        };

        let now = every.clock.now();
        let deadline = baseline.wrapping_add(every.period);

        if !reached(now, deadline) {
            return Poll::Pending;
        }

        // Catch up by at most one period.
        every.baseline = if reached(now, deadline.wrapping_add(every.period)) {
            Some(now)
        } else {
            Some(deadline)
        };

        Poll::Ready(())
    }
}
