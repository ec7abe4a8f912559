use core::ptr;
use core::task::{RawWaker, RawWakerVTable, Waker};

/// Wakers are inert in this runtime: the driver re-polls the root
/// unconditionally on every tick, so waking is a no-op.
const VTABLE: RawWakerVTable = RawWakerVTable::new(clone, wake, wake, drop);

unsafe fn clone(ptr: *const ()) -> RawWaker {
    RawWaker::new(ptr, &VTABLE)
}

unsafe fn wake(_ptr: *const ()) {}

unsafe fn drop(_ptr: *const ()) {}

pub(crate) fn noop_waker() -> Waker {
    unsafe { Waker::from_raw(RawWaker::new(ptr::null(), &VTABLE)) }
}

/// Trace-level logging, compiled out unless the `log` feature is on.
macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::trace!($($arg)*);
    }};
}

pub(crate) use trace;
