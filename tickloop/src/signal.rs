//! Single-tick broadcast signals
//!
//! A [`Signal`] is a shared cell whose presence lasts one tick of its
//! owning frame: [`with_signals`] clears it at the start of every
//! invocation, so an emit is visible to everything ticked later in the
//! same tick and gone by the owner's next one. References to a signal
//! can be handed to child activities; the lifetime of an emission is
//! scoped by the owner, not the reader.
//!
//! # Example
//! ```
//! use core::pin::pin;
//! use tickloop::activity::{activity, pause, Frame, Status};
//! use tickloop::signal::{with_signals, Signal};
//!
//! let sig: Signal<u32> = Signal::new();
//! let sig = &sig;
//!
//! let mut act = pin!(with_signals(
//!     activity(|| async move {
//!         sig.emit(7);
//!         pause().await;
//!         // Cleared by the wrapper before this segment ran.
//!         assert!(!sig.is_present());
//!     }),
//!     [sig],
//! ));
//!
//! assert_eq!(act.as_mut().tick(), Status::Waiting);
//! assert_eq!(sig.value(), Some(7));
//! assert_eq!(act.as_mut().tick(), Status::Done);
//! ```

use core::cell::Cell;
use core::pin::Pin;

use crate::activity::{Frame, Status};

/// A broadcast cell that is present for at most one tick.
///
/// `Signal<()>` is a pure event; a payload type carries a value with
/// the emission. Emitting twice in one tick keeps the later value.
pub struct Signal<T = ()> {
    value: Cell<Option<T>>,
}

impl<T> Signal<T> {
    pub const fn new() -> Self {
        Self {
            value: Cell::new(None),
        }
    }

    /// Make the signal present for the rest of the owning tick.
    pub fn emit(&self, value: T) {
        self.value.set(Some(value));
    }

    /// Whether the signal was emitted this tick.
    pub fn is_present(&self) -> bool {
        let value = self.value.take();
        let present = value.is_some();
        self.value.set(value);
        present
    }

    /// Drop the emission, if any.
    pub fn clear(&self) {
        self.value.set(None);
    }
}

impl<T: Copy> Signal<T> {
    /// The emitted value, if the signal is present this tick.
    pub fn value(&self) -> Option<T> {
        let value = self.value.get();
        self.value.set(value);
        value
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clearing half of [`Signal`], independent of the payload type, so
/// one wrapper can own signals of mixed types.
pub trait ClearSignal {
    fn clear(&self);
}

impl<T> ClearSignal for Signal<T> {
    fn clear(&self) {
        Signal::clear(self);
    }
}

/// Tie the listed signals' lifetimes to the frame's invocations.
///
/// At the start of every invocation, and on reset, all listed signals
/// are cleared, consumed or not.
pub fn with_signals<'a, F, const N: usize>(
    frame: F,
    signals: [&'a dyn ClearSignal; N],
) -> WithSignals<'a, F, N>
where
    F: Frame,
{
    WithSignals { frame, signals }
}

/// Frame wrapper returned by [`with_signals`].
pub struct WithSignals<'a, F, const N: usize> {
    frame: F,
    signals: [&'a dyn ClearSignal; N],
}

impl<F, const N: usize> WithSignals<'_, F, N> {
    fn frame(self: Pin<&mut Self>) -> Pin<&mut F> {
        // Safety: frame is never moved out of the pinned wrapper.
        unsafe { self.map_unchecked_mut(|this| &mut this.frame) }
    }
}

impl<F, const N: usize> Frame for WithSignals<'_, F, N>
where
    F: Frame,
{
    fn tick(self: Pin<&mut Self>) -> Status {
        let this = unsafe { self.get_unchecked_mut() };

        for signal in this.signals {
            signal.clear();
        }

        unsafe { Pin::new_unchecked(&mut this.frame) }.tick()
    }

    fn reset(self: Pin<&mut Self>) {
        let this = unsafe { self.get_unchecked_mut() };

        for signal in this.signals {
            signal.clear();
        }

        unsafe { Pin::new_unchecked(&mut this.frame) }.reset();
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

#[cfg(test)]
mod tests {
    use core::pin::pin;

    use super::*;
    use crate::activity::{activity, pause, run};

    #[test]
    fn emission_lasts_one_tick() {
        let sig: Signal<()> = Signal::new();
        let sig = &sig;

        let mut act = pin!(with_signals(
            activity(|| async move {
                sig.emit(());
                pause().await;
                assert!(!sig.is_present());
                sig.emit(());
                pause().await;
            }),
            [sig],
        ));

        assert_eq!(act.as_mut().tick(), Status::Waiting);
        assert!(sig.is_present());
        assert_eq!(act.as_mut().tick(), Status::Waiting);
        assert!(sig.is_present());
        assert_eq!(act.as_mut().tick(), Status::Done);
        assert!(!sig.is_present());
    }

    #[test]
    fn child_sees_parent_emission() {
        let sig: Signal<u32> = Signal::new();
        let sig = &sig;
        let seen = core::cell::Cell::new(None);
        let seen = &seen;

        let mut act = pin!(with_signals(
            activity(|| async move {
                let mut child = pin!(activity(|| async move {
                    seen.set(sig.value());
                }));

                sig.emit(13);
                run(child.as_mut()).await;
            }),
            [sig],
        ));

        assert_eq!(act.as_mut().tick(), Status::Done);
        assert_eq!(seen.get(), Some(13));
    }

    #[test]
    fn reset_clears_pending_emission() {
        let sig: Signal<()> = Signal::new();
        let sig = &sig;

        let mut act = pin!(with_signals(
            activity(|| async move {
                sig.emit(());
                pause().await;
            }),
            [sig],
        ));

        assert_eq!(act.as_mut().tick(), Status::Waiting);
        assert!(sig.is_present());

        act.as_mut().reset();
        assert!(!sig.is_present());
    }

    #[test]
    fn mixed_payload_types_share_a_wrapper() {
        let event: Signal<()> = Signal::new();
        let event = &event;
        let reading: Signal<i16> = Signal::new();
        let reading = &reading;

        let mut act = pin!(with_signals(
            activity(|| async move {
                event.emit(());
                reading.emit(-40);
                pause().await;
            }),
            [event, reading],
        ));

        assert_eq!(act.as_mut().tick(), Status::Waiting);
        assert!(event.is_present());
        assert_eq!(reading.value(), Some(-40));
    }
}
