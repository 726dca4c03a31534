//! Snapshot table — captured visualization results keyed by opaque id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;


/// Identifier of one captured snapshot.
///
/// Allocated by the table and unique for the lifetime of a session: the
/// counter is not reset by `clear`, so an id can never refer to two
/// different snapshots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SnapshotId(u64);

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "snap-{}", self.0)
    }
}


/// One captured visualization result tied to a source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub file_path: String,
    /// 1-based line the visualization was emitted from.
    pub line_number: u32,
    /// Opaque visualization payload; the core never inspects it.
    pub view: Value,
}


/// Append/clear store of snapshots with O(1) lookup by id.
#[derive(Debug, Default)]
pub struct SnapshotTable {
    entries: HashMap<SnapshotId, Snapshot>,
    next_id: u64,
}

impl SnapshotTable {
    pub fn new() -> SnapshotTable {
        SnapshotTable::default()
    }

    /// Insert a new snapshot and return its freshly allocated id.
    pub fn insert(&mut self, file_path: String, line_number: u32, view: Value) -> SnapshotId {
        let id = SnapshotId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            Snapshot {
                file_path,
                line_number,
                view,
            },
        );
        id
    }

    /// Look up a snapshot. A miss is not an error; a layout entry whose id
    /// is absent renders as pending.
    pub fn get(&self, id: SnapshotId) -> Option<&Snapshot> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all snapshots. The id counter survives, so ids are never
    /// reused within a session.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
