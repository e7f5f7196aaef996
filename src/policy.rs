//! Per-session policy knobs (§4.G), set via the `config(key, value)` SQL
//! function and read by the virtual-table framework and entity tables.
//!
//! Mutated only from the workspace thread (§5), so plain `Cell`s are enough
//! — no locking, matching the rest of the single-thread design.

use std::cell::Cell;

use crate::adapter::UndoHandle;
use crate::error::EngineError;

/// `cache`, `undo`: default on. `batch`: default off — coalescing every
/// mutation in a statement into one undo handle is an opt-in for bulk
/// loads, not the steady-state behavior.
///
/// There is no "statement finished" hook this framework can observe (§4.G
/// Open Question territory: the spec names batch coalescing but not its
/// exact trigger), so a batch is bracketed explicitly by the caller's own
/// `config('batch','on')` / `config('batch','off')` pair rather than
/// implicitly by statement boundaries — the first mutation after `'on'`
/// opens the shared handle, `'off'` (or session drop) closes it.
pub struct Policy {
    cache: Cell<bool>,
    undo: Cell<bool>,
    batch: Cell<bool>,
    batch_handle: Cell<Option<UndoHandle>>,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            cache: Cell::new(true),
            undo: Cell::new(true),
            batch: Cell::new(false),
            batch_handle: Cell::new(None),
        }
    }
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.get()
    }

    pub fn undo_enabled(&self) -> bool {
        self.undo.get()
    }

    pub fn batch_enabled(&self) -> bool {
        self.batch.get()
    }

    /// `config('cache'|'undo'|'batch', 'on'|'off')`. Unknown key/value
    /// combinations are rejected rather than silently ignored, so a typo in
    /// a script surfaces immediately.
    pub fn set(&self, key: &str, value: &str) -> Result<(), EngineError> {
        let on = match value.to_ascii_lowercase().as_str() {
            "on" => true,
            "off" => false,
            other => {
                return Err(EngineError::InvalidArgument(format!(
                    "config value must be 'on' or 'off', got '{other}'"
                )))
            }
        };
        match key.to_ascii_lowercase().as_str() {
            "cache" => self.cache.set(on),
            "undo" => self.undo.set(on),
            "batch" => self.batch.set(on),
            other => {
                return Err(EngineError::InvalidArgument(format!(
                    "unknown config key '{other}'"
                )))
            }
        }
        Ok(())
    }

    /// Returns the shared batch undo handle, opening it via `open` on first
    /// use. Only meaningful while [`Policy::batch_enabled`] is set; callers
    /// check that first.
    pub fn batch_handle(&self, open: impl FnOnce() -> UndoHandle) -> UndoHandle {
        if let Some(h) = self.batch_handle.get() {
            return h;
        }
        let h = open();
        self.batch_handle.set(Some(h));
        h
    }

    /// Takes the currently open batch handle, if any, so the caller can
    /// close it on the adapter. Used when `batch` is switched back off.
    pub fn take_batch_handle(&self) -> Option<UndoHandle> {
        self.batch_handle.take()
    }
}
