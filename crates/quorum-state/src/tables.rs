//! redb table definitions for the Quorum state store.

use redb::TableDefinition;

/// Full scheduler state documents (JSON), keyed by document name.
pub const SCHEDULER: TableDefinition<&str, &[u8]> = TableDefinition::new("scheduler");

/// Store bookkeeping counters.
pub const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// Key of the scheduler state document in [`SCHEDULER`].
pub const STATE_KEY: &str = "state";

/// Key of the persist counter in [`META`].
pub const REVISION_KEY: &str = "revision";
