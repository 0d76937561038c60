//! quorum-state — scheduler state and its persistence.
//!
//! [`SchedulerState`] owns every live cluster and the graveyard of
//! retired ones. It is guarded by a single lock in the scheduler and
//! saved in full through a [`Persister`] whenever a reconciliation tick
//! changes it.
//!
//! [`StateStore`] is the redb-backed persister. It is `Clone` + `Send` +
//! `Sync` (backed by `Arc<Database>`) and supports on-disk and in-memory
//! backends.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{Persister, StateStore};
pub use types::*;
