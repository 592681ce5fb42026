use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

/// Per-structure flag so each shared map reports poisoning at most once.
pub(crate) struct PoisonWarning {
    structure: &'static str,
    warned: AtomicBool,
}

impl PoisonWarning {
    pub(crate) const fn new(structure: &'static str) -> Self {
        Self {
            structure,
            warned: AtomicBool::new(false),
        }
    }

    fn warn_once(&self, operation: &'static str) {
        if self
            .warned
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            warn!(
                structure = self.structure,
                operation, "lock poisoned; recovered inner value"
            );
        }
    }
}

pub(crate) fn read_recovering<'a, T>(
    lock: &'a RwLock<T>,
    warning: &PoisonWarning,
) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warning.warn_once("read");
            poisoned.into_inner()
        }
    }
}

pub(crate) fn write_recovering<'a, T>(
    lock: &'a RwLock<T>,
    warning: &PoisonWarning,
) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warning.warn_once("write");
            poisoned.into_inner()
        }
    }
}
