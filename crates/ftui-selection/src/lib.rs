#![forbid(unsafe_code)]

//! Selection-state reconciliation for multi-item selector widgets.
//!
//! # Role in FrankenTUI
//! `ftui-selection` owns the bookkeeping behind list, tree and table
//! selection: which items are selected, in what order, and how a batch of
//! select/unselect requests turns into one minimal change notification. It
//! knows nothing about rendering or input; widgets drive it through a
//! [`Selector`] and observe it through a [`SelectionHost`].
//!
//! # Model
//! - [`ItemRef`]: an item plus an optional realized container handle and
//!   an optional source index.
//! - [`SelectionSet`]: ordered, logically unique collection of `ItemRef`s
//!   with an optional hash index and scoped deferred removal.
//! - [`SelectionTransaction`]: begin/commit/cancel unit of work. Requests
//!   touch scratch sets only; the commit computes the delta, applies it
//!   (unselect before select) and emits a single notification.
//! - [`SelectionMode`]: single vs multi collapsing policy.
//! - Current-item synchronization keeps the primary selection aligned with
//!   a host cursor in both directions.
//!
//! # Example
//!
//! ```
//! use ftui_selection::{ItemRef, Selector, SelectorConfig, VecHost};
//!
//! let host = VecHost::new(vec![1, 2, 3, 4]);
//! let mut selector = Selector::new(host, SelectorConfig::multiple());
//!
//! let mut tx = selector.transaction().unwrap();
//! tx.select(ItemRef::new(1));
//! tx.select(ItemRef::new(3));
//! tx.commit();
//!
//! assert_eq!(selector.selected_items(), vec![1, 3]);
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod item;
pub mod policy;
pub mod selector;
pub mod set;
pub mod snapshot;
pub mod sync;
pub mod transaction;

pub use config::SelectorConfig;
pub use error::{Result, SelectionError};
pub use host::{SelectionHost, VecHost};
pub use item::{ContainerId, EqualityMode, ItemRef, Keyed, RefState};
pub use policy::SelectionMode;
pub use selector::{Selector, SourceChange};
pub use set::{DeferredRemoval, SelectionSet};
pub use snapshot::SelectionSnapshot;
pub use transaction::{ChangeFlags, SelectionTransaction, TransactionState};
