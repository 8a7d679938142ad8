//! Changer Lock: a per-changer writer-exclusive lock with plugin
//! notification wrapped around acquisition.
//!
//! Rather than threading a `lock_held: bool` through every internal
//! helper to avoid recursive acquisition, this hands out an RAII guard
//! that doubles as a capability token: functions that must run under
//! the lock take `Option<&ChangerLockGuard>` (`None` means "acquire it
//! yourself", `Some` means "caller already holds it, don't re-acquire
//! or re-emit plugin events") so the type system -- not a
//! stringly-typed bool -- is what prevents calling a mutating helper
//! without the lock.

use std::sync::{RwLock, RwLockWriteGuard};

use anyhow::{anyhow, Result};

use crate::error::AutochangerFault;
use crate::plugin::{PluginBus, PluginEvent, PluginEventContext};

pub struct ChangerLock {
    rwlock: RwLock<()>,
}

impl ChangerLock {
    pub fn new() -> Self {
        ChangerLock {
            rwlock: RwLock::new(()),
        }
    }

    /// Acquires the write lock and fires `ChangerLock`. A plugin veto
    /// releases the write lock again and returns
    /// `AutochangerFault::Veto`; an OS-level lock failure (a poisoned
    /// lock here) is `AutochangerFault::Lock`, fatal to the process --
    /// this call only propagates the error, it does not terminate
    /// anything itself.
    pub fn acquire<'a>(
        &'a self,
        plugin_bus: &'a dyn PluginBus,
        ctx: PluginEventContext,
    ) -> Result<ChangerLockGuard<'a>> {
        let guard = self.rwlock.write().map_err(|_| {
            anyhow!(AutochangerFault::Lock(
                "write-lock acquisition failed".to_string()
            ))
        })?;

        match plugin_bus.emit_event(PluginEvent::ChangerLock, &ctx) {
            crate::plugin::PluginVerdict::Ok => Ok(ChangerLockGuard {
                guard: Some(guard),
                plugin_bus,
                ctx,
            }),
            crate::plugin::PluginVerdict::Vetoed => {
                drop(guard);
                Err(anyhow!(AutochangerFault::Veto))
            }
        }
    }
}

impl Default for ChangerLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof that the Changer lock is held. Mutating helpers accept
/// `Option<&ChangerLockGuard>`: `None` means "acquire it yourself",
/// `Some` means the caller already holds it.
pub struct ChangerLockGuard<'a> {
    guard: Option<RwLockWriteGuard<'a, ()>>,
    plugin_bus: &'a dyn PluginBus,
    ctx: PluginEventContext,
}

impl<'a> Drop for ChangerLockGuard<'a> {
    fn drop(&mut self) {
        if self.guard.is_some() {
            // Emit ChangerUnlock before dropping the write lock.
            self.plugin_bus
                .emit_event(PluginEvent::ChangerUnlock, &self.ctx);
            self.guard.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{NullPluginBus, PluginVerdict};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> PluginEventContext {
        PluginEventContext {
            changer_name: "sg0".into(),
            job_name: "job".into(),
            drive_index: 0,
        }
    }

    #[test]
    fn acquire_then_drop_releases() {
        let lock = ChangerLock::new();
        let bus = NullPluginBus;
        {
            let _guard = lock.acquire(&bus, ctx()).unwrap();
            assert!(lock.rwlock.try_write().is_err());
        }
        assert!(lock.rwlock.try_write().is_ok());
    }

    struct CountingBus {
        locks: AtomicUsize,
        unlocks: AtomicUsize,
        veto: bool,
    }

    impl PluginBus for CountingBus {
        fn emit_event(&self, kind: PluginEvent, _ctx: &PluginEventContext) -> PluginVerdict {
            match kind {
                PluginEvent::ChangerLock => {
                    self.locks.fetch_add(1, Ordering::SeqCst);
                    if self.veto {
                        PluginVerdict::Vetoed
                    } else {
                        PluginVerdict::Ok
                    }
                }
                PluginEvent::ChangerUnlock => {
                    self.unlocks.fetch_add(1, Ordering::SeqCst);
                    PluginVerdict::Ok
                }
            }
        }
    }

    #[test]
    fn veto_releases_lock_and_fails() {
        let lock = ChangerLock::new();
        let bus = CountingBus {
            locks: AtomicUsize::new(0),
            unlocks: AtomicUsize::new(0),
            veto: true,
        };
        let result = lock.acquire(&bus, ctx());
        assert!(result.is_err());
        assert_eq!(bus.locks.load(Ordering::SeqCst), 1);
        assert_eq!(bus.unlocks.load(Ordering::SeqCst), 0);
        assert!(lock.rwlock.try_write().is_ok());
    }

    #[test]
    fn successful_acquire_fires_lock_then_unlock_on_drop() {
        let lock = ChangerLock::new();
        let bus = CountingBus {
            locks: AtomicUsize::new(0),
            unlocks: AtomicUsize::new(0),
            veto: false,
        };
        {
            let _guard = lock.acquire(&bus, ctx()).unwrap();
            assert_eq!(bus.locks.load(Ordering::SeqCst), 1);
            assert_eq!(bus.unlocks.load(Ordering::SeqCst), 0);
        }
        assert_eq!(bus.unlocks.load(Ordering::SeqCst), 1);
    }
}
