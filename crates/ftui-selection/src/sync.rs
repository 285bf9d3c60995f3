#![forbid(unsafe_code)]

//! Current-item synchronization bridge.
//!
//! When enabled, the primary selection and the host's current-item cursor
//! track each other:
//!
//! - **push**: after a commit that changed the primary, the cursor moves to
//!   the new primary (or to nothing when the selection emptied);
//! - **pull**: when the host reports a cursor move, the selection becomes
//!   exactly the cursor item.
//!
//! A cursor move that the engine itself caused comes back as an echo. An
//! echo is recognized either by an open transaction, by an in-flight pull,
//! or by the cursor already naming the primary, and is ignored.

use crate::host::SelectionHost;
use crate::item::ItemRef;

/// Outcome of inspecting the host cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PullTarget<T> {
    /// Nothing to do: disabled, re-entrant, or an echo.
    Ignore,
    /// Make the selection exactly this item, or empty.
    Select(Option<ItemRef<T>>),
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CurrentItemSync {
    enabled: bool,
    pulling: bool,
}

impl CurrentItemSync {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            pulling: false,
        }
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_pulling(&mut self, pulling: bool) {
        self.pulling = pulling;
    }

    /// Move the host cursor to `primary` unless this commit came from a pull.
    pub(crate) fn push<T, H>(&self, host: &mut H, primary: Option<&ItemRef<T>>) -> bool
    where
        H: SelectionHost<T>,
    {
        if !self.enabled || self.pulling {
            return false;
        }
        host.set_current_item(primary);
        true
    }

    /// Decide what a cursor change means for the selection.
    pub(crate) fn pull_target<T, H>(&self, host: &H, primary: Option<&ItemRef<T>>) -> PullTarget<T>
    where
        T: PartialEq,
        H: SelectionHost<T>,
    {
        if !self.enabled || self.pulling {
            return PullTarget::Ignore;
        }
        let current = host.current_item();
        let echo = match (&current, primary) {
            (Some(current), Some(primary)) => current.key_eq(primary),
            (None, None) => true,
            _ => false,
        };
        if echo {
            PullTarget::Ignore
        } else {
            PullTarget::Select(current)
        }
    }
}
