//! Concurrent composition with strong/weak termination policy
//!
//! A join runs several participant frames "in parallel" within the
//! tick: each tick, every unfinished participant is ticked once, in
//! declared order. Strong participants must finish for the join to
//! complete; once no strong participant is waiting, any weak
//! participant still running is cut short. A join of only weak
//! participants is a race: it completes as soon as one of them does.
//!
//! # Example
//! ```
//! use core::pin::pin;
//! use tickloop::activity::{activity, halt, Frame, Status};
//! use tickloop::join::{join, strong, weak};
//! use tickloop::timer::delay;
//!
//! let mut act = pin!(activity(|| async {
//!     let mut work = pin!(activity(|| async { delay(3).await }));
//!     let mut spin = pin!(activity(|| async { halt().await }));
//!
//!     join([strong(work.as_mut()), weak(spin.as_mut())]).await;
//!     assert!(spin.is_aborted());
//! }));
//!
//! while act.as_mut().tick() == Status::Waiting {}
//! ```

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use crate::activity::{Frame, Status};
use crate::common::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strength {
    Strong,
    Weak,
}

/// One participant of a [`join`], with its per-construct cached
/// status.
pub struct Participant<'a> {
    frame: Pin<&'a mut dyn Frame>,
    strength: Strength,
    status: Status,
}

/// A participant whose completion is required for the join to
/// complete.
pub fn strong(frame: Pin<&mut dyn Frame>) -> Participant<'_> {
    Participant {
        frame,
        strength: Strength::Strong,
        status: Status::Waiting,
    }
}

/// A participant that does not gate completion and is aborted if it
/// is still running when the join completes.
pub fn weak(frame: Pin<&mut dyn Frame>) -> Participant<'_> {
    Participant {
        frame,
        strength: Strength::Weak,
        status: Status::Waiting,
    }
}

/// Run the participants concurrently until the join completes.
///
/// Completion rule, evaluated each tick after every unfinished
/// participant has been ticked once:
/// - with at least one strong participant: complete once no strong
///   participant is waiting;
/// - all weak: complete once at least one participant is done.
///
/// On completion, weak participants still waiting are reset and
/// abort-marked; weak participants that finished earlier were already
/// reset by their own completion and carry no marker.
pub fn join<'a, const N: usize>(participants: [Participant<'a>; N]) -> Join<'a, N> {
    Join { participants }
}

/// Future returned by [`join`].
pub struct Join<'a, const N: usize> {
    participants: [Participant<'a>; N],
}

impl<const N: usize> Future for Join<'_, N> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        // Tick every unfinished participant exactly once, in declared
        // order, before looking at the completion rule. A finished
        // participant keeps its cached status for the rest of the
        // construct and is not ticked again.
        for participant in &mut this.participants {
            if participant.status == Status::Waiting {
                participant.status = participant.frame.as_mut().tick();
            }
        }

        let any_strong = this
            .participants
            .iter()
            .any(|p| p.strength == Strength::Strong);

        let complete = if any_strong {
            this.participants
                .iter()
                .all(|p| p.strength == Strength::Weak || p.status == Status::Done)
        } else {
            this.participants.iter().any(|p| p.status == Status::Done)
        };

        if !complete {
            return Poll::Pending;
        }

        for participant in &mut this.participants {
            if participant.strength == Strength::Weak && participant.status == Status::Waiting {
                trace!("join complete; cutting weak participant short");
                participant.frame.as_mut().reset();
                participant.frame.as_mut().mark_aborted();
            }
        }

        Poll::Ready(())
    }
}
