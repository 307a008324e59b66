//! Re-entrancy guard.
//!
//! Action side effects can feed straight back into the engine (a proc spell
//! hitting an enemy produces a new hit event). The depth counter makes that
//! second pass a no-op. The counter is shared so a host bridge can hold a
//! clone and drop events that arrive while a proc is executing.

use std::cell::Cell;
use std::rc::Rc;

/// Shared proc-execution depth.
#[derive(Clone, Debug, Default)]
pub struct ProcDepth(Rc<Cell<u32>>);

impl ProcDepth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current depth.
    #[must_use]
    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// True while any proc is executing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.get() > 0
    }

    /// Enter one level; the returned guard leaves it on drop.
    #[must_use = "the depth is released as soon as the guard is dropped"]
    pub fn enter(&self) -> ProcDepthGuard {
        self.0.set(self.0.get().saturating_add(1));
        ProcDepthGuard(Rc::clone(&self.0))
    }
}

/// Scoped depth level.
#[derive(Debug)]
pub struct ProcDepthGuard(Rc<Cell<u32>>);

impl Drop for ProcDepthGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}
