#![forbid(unsafe_code)]

//! Selection error model.
//!
//! Only misuse and rejected batch operations are errors. Requests that
//! change nothing (selecting a selected item, unselecting an unselected one)
//! report `false`, and deferred requests for items that never appear simply
//! stay pending.

use std::fmt;

/// Errors returned by selection operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// `begin` while a transaction is already open. Transactions do not nest.
    AlreadyActive,
    /// `end` or `cancel` with no open transaction.
    NotActive,
    /// A batch asked for several items under single-select.
    MultipleSelectionNotAllowed {
        /// Number of items the batch requested.
        requested: usize,
    },
    /// A batch contained an item the host refuses to select.
    NotSelectable {
        /// Position of the rejected item within the batch.
        position: usize,
    },
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "selection transaction already active"),
            Self::NotActive => write!(f, "no active selection transaction"),
            Self::MultipleSelectionNotAllowed { requested } => write!(
                f,
                "{} items requested but selection mode allows only one",
                requested
            ),
            Self::NotSelectable { position } => {
                write!(f, "item at position {} is not selectable", position)
            }
        }
    }
}

impl std::error::Error for SelectionError {}

/// Standard result type for selection APIs.
pub type Result<T> = std::result::Result<T, SelectionError>;
