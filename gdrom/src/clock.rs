use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Time and scheduling as seen by the command core.
///
/// Every wait inside a command cycle goes through `pass`, so the calling
/// thread gives up the CPU instead of spinning.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;

    /// Voluntarily yield the calling thread.
    fn pass(&self) {
        std::thread::yield_now();
    }
}

/// Wall clock time.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// A clock that only moves when the core yields.
///
/// Each `pass` advances time by a fixed step, which makes timeouts
/// deterministic for tests and scripted sessions.
pub struct VirtualClock {
    now:    AtomicU64,
    step:   u64,
}

impl VirtualClock {
    pub fn new(step_ms: u64) -> Self {
        Self {
            now:    AtomicU64::new(0),
            step:   step_ms,
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn pass(&self) {
        self.advance(self.step);
        std::thread::yield_now();
    }
}
