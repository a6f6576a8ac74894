use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// Exclusive access to the drive.
///
/// The firmware runs one command at a time, and nothing in the hardware
/// stops two callers from interleaving theirs. Whoever holds a [`GateGuard`]
/// owns the whole submit/poll cycle. Acquisition does not nest.
pub struct DriveGate<S> {
    syscalls: Mutex<S>,
}

/// Access to the firmware. The gate is released on drop.
pub struct GateGuard<'a, S> {
    inner: MutexGuard<'a, S>,
}

impl<S> DriveGate<S> {
    pub fn new(syscalls: S) -> Self {
        Self {
            syscalls: Mutex::new(syscalls),
        }
    }

    /// Wait until the drive is free.
    ///
    /// A holder that panicked left no command in flight we could resume, so
    /// a poisoned gate is simply taken over.
    pub fn lock(&self) -> GateGuard<'_, S> {
        let inner = self.syscalls.lock().unwrap_or_else(PoisonError::into_inner);
        GateGuard { inner }
    }

    /// Take the drive only if nobody else has it. Never blocks, so it is
    /// usable from contexts that must not wait.
    pub fn try_lock(&self) -> Option<GateGuard<'_, S>> {
        match self.syscalls.try_lock() {
            Ok(inner) => Some(GateGuard { inner }),
            Err(TryLockError::Poisoned(poisoned)) => Some(GateGuard { inner: poisoned.into_inner() }),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub fn into_inner(self) -> S {
        self.syscalls.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> Deref for GateGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S> DerefMut for GateGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_lock_fails_while_held() {
        let gate = DriveGate::new(0u32);
        let mut guard = gate.lock();
        *guard += 1;
        assert!(gate.try_lock().is_none());
        drop(guard);
        let guard = gate.try_lock().expect("gate should be free");
        assert_eq!(*guard, 1);
    }

    #[test]
    fn poisoned_gate_is_recovered() {
        let gate = std::sync::Arc::new(DriveGate::new(7u32));
        let g = gate.clone();
        let _ = std::thread::spawn(move || {
            let _guard = g.lock();
            panic!("holder died");
        }).join();
        assert_eq!(*gate.lock(), 7);
        assert!(gate.try_lock().is_some());
    }
}
