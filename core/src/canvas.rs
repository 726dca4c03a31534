//! Canvas layout — the ordered, user-reorderable sequence of inspectors.
//!
//! An inspector is a weak reference into the snapshot table; the same
//! snapshot may legitimately appear in several inspectors (duplicate).
//! Indices are always dense `0..n-1` and every mutation is synchronous, so
//! an observer never sees a half-applied operation.

use serde::{Deserialize, Serialize};

use crate::snapshot::SnapshotId;


/// One visible pane referencing a snapshot (and optionally a sub-view
/// within it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspector {
    pub snapshot_id: SnapshotId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_id: Option<String>,
}


#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("index {index} out of range for layout of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}


/// Ordered sequence of inspectors.
#[derive(Debug, Default)]
pub struct CanvasLayout {
    inspectors: Vec<Inspector>,
}

impl CanvasLayout {
    pub fn new() -> CanvasLayout {
        CanvasLayout::default()
    }

    pub fn len(&self) -> usize {
        self.inspectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inspectors.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Inspector> {
        self.inspectors.get(idx)
    }

    pub fn inspectors(&self) -> &[Inspector] {
        &self.inspectors
    }

    /// Insert a new inspector.
    ///
    /// With `insert_after_idx` in `[-1, n-1]` the inspector lands at
    /// `insert_after_idx + 1` (so `-1` prepends); any other value appends.
    pub fn add_inspector(
        &mut self,
        snapshot_id: SnapshotId,
        view_id: Option<String>,
        insert_after_idx: Option<isize>,
    ) {
        let inspector = Inspector {
            snapshot_id,
            view_id,
        };
        match insert_after_idx {
            Some(idx) if idx >= -1 && idx < self.inspectors.len() as isize => {
                self.inspectors.insert((idx + 1) as usize, inspector);
            }
            _ => self.inspectors.push(inspector),
        }
    }

    /// Remove the inspector at `idx`; subsequent indices shift down by one.
    pub fn remove_inspector(&mut self, idx: usize) -> Result<Inspector, LayoutError> {
        if idx >= self.inspectors.len() {
            return Err(LayoutError::IndexOutOfRange {
                index: idx,
                len: self.inspectors.len(),
            });
        }
        Ok(self.inspectors.remove(idx))
    }

    /// Move the inspector at `src` to `dest`, where `dest` addresses the
    /// list with the element already removed (drag-and-drop semantics).
    /// Length and every inspector's identity are unchanged.
    pub fn reorder_inspector(&mut self, src: usize, dest: usize) -> Result<(), LayoutError> {
        let len = self.inspectors.len();
        if src >= len {
            return Err(LayoutError::IndexOutOfRange { index: src, len });
        }
        if dest >= len {
            return Err(LayoutError::IndexOutOfRange { index: dest, len });
        }
        let inspector = self.inspectors.remove(src);
        self.inspectors.insert(dest, inspector);
        Ok(())
    }

    /// Clone the inspector at `idx` and insert the copy right after it.
    pub fn duplicate_inspector(&mut self, idx: usize) -> Result<(), LayoutError> {
        let Some(inspector) = self.inspectors.get(idx).cloned() else {
            return Err(LayoutError::IndexOutOfRange {
                index: idx,
                len: self.inspectors.len(),
            });
        };
        self.add_inspector(inspector.snapshot_id, inspector.view_id, Some(idx as isize));
        Ok(())
    }

    /// Reset to the empty sequence.
    pub fn clear_all(&mut self) {
        self.inspectors.clear();
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotTable;

    // Allocate n distinct snapshot ids through a real table.
    fn ids(n: usize) -> Vec<SnapshotId> {
        let mut table = SnapshotTable::new();
        (0..n)
            .map(|i| table.insert("a.py".into(), i as u32 + 1, serde_json::json!(null)))
            .collect()
    }

    fn layout_of(ids: &[SnapshotId]) -> CanvasLayout {
        let mut layout = CanvasLayout::new();
        for id in ids {
            layout.add_inspector(*id, None, None);
        }
        layout
    }

    #[test]
    fn add_appends_by_default() {
        let ids = ids(3);
        let layout = layout_of(&ids);
        assert_eq!(layout.len(), 3);
        assert_eq!(layout.get(2).unwrap().snapshot_id, ids[2]);
    }

    #[test]
    fn add_after_index_inserts_in_middle() {
        // [I0, I1] with insert_after_idx = 0 becomes [I0, I_new, I1].
        let ids = ids(3);
        let mut layout = layout_of(&ids[..2]);
        layout.add_inspector(ids[2], Some("view1".into()), Some(0));
        assert_eq!(layout.len(), 3);
        assert_eq!(layout.get(1).unwrap().snapshot_id, ids[2]);
        assert_eq!(layout.get(1).unwrap().view_id.as_deref(), Some("view1"));
        assert_eq!(layout.get(2).unwrap().snapshot_id, ids[1]);
    }

    #[test]
    fn add_after_minus_one_prepends() {
        let ids = ids(3);
        let mut layout = layout_of(&ids[..2]);
        layout.add_inspector(ids[2], None, Some(-1));
        assert_eq!(layout.get(0).unwrap().snapshot_id, ids[2]);
    }

    #[test]
    fn add_after_out_of_range_appends() {
        let ids = ids(3);
        let mut layout = layout_of(&ids[..2]);
        layout.add_inspector(ids[2], None, Some(9));
        assert_eq!(layout.get(2).unwrap().snapshot_id, ids[2]);
    }

    #[test]
    fn remove_shifts_down() {
        let ids = ids(3);
        let mut layout = layout_of(&ids);
        let removed = layout.remove_inspector(1).unwrap();
        assert_eq!(removed.snapshot_id, ids[1]);
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.get(1).unwrap().snapshot_id, ids[2]);
    }

    #[test]
    fn remove_out_of_range_leaves_layout_unchanged() {
        let ids = ids(3);
        let mut layout = layout_of(&ids);
        let err = layout.remove_inspector(5).unwrap_err();
        assert_eq!(err, LayoutError::IndexOutOfRange { index: 5, len: 3 });
        assert_eq!(layout.len(), 3);
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(layout.get(i).unwrap().snapshot_id, *id);
        }
    }

    #[test]
    fn reorder_last_to_front() {
        // [I0, I1, I2] with reorder(2, 0) becomes [I2, I0, I1].
        let ids = ids(3);
        let mut layout = layout_of(&ids);
        layout.reorder_inspector(2, 0).unwrap();
        let order: Vec<SnapshotId> =
            layout.inspectors().iter().map(|i| i.snapshot_id).collect();
        assert_eq!(order, vec![ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn reorder_round_trip_restores_order() {
        let ids = ids(4);
        let mut layout = layout_of(&ids);
        layout.reorder_inspector(3, 1).unwrap();
        layout.reorder_inspector(1, 3).unwrap();
        let order: Vec<SnapshotId> =
            layout.inspectors().iter().map(|i| i.snapshot_id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn reorder_preserves_length_and_identity() {
        let ids = ids(3);
        let mut layout = layout_of(&ids);
        layout.reorder_inspector(0, 2).unwrap();
        assert_eq!(layout.len(), 3);
        let mut seen: Vec<SnapshotId> =
            layout.inspectors().iter().map(|i| i.snapshot_id).collect();
        seen.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn reorder_bad_src_is_error() {
        let ids = ids(2);
        let mut layout = layout_of(&ids);
        assert!(layout.reorder_inspector(5, 0).is_err());
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn reorder_bad_dest_is_error() {
        let ids = ids(2);
        let mut layout = layout_of(&ids);
        assert!(layout.reorder_inspector(0, 5).is_err());
        assert_eq!(layout.get(0).unwrap().snapshot_id, ids[0]);
    }

    #[test]
    fn duplicate_inserts_adjacent_copy() {
        let ids = ids(2);
        let mut layout = layout_of(&ids);
        layout.duplicate_inspector(0).unwrap();
        assert_eq!(layout.len(), 3);
        assert_eq!(layout.get(0).unwrap().snapshot_id, ids[0]);
        assert_eq!(layout.get(1).unwrap().snapshot_id, ids[0]);
        assert_eq!(layout.get(2).unwrap().snapshot_id, ids[1]);
    }

    #[test]
    fn duplicate_out_of_range_is_error() {
        let mut layout = CanvasLayout::new();
        assert!(layout.duplicate_inspector(0).is_err());
    }

    #[test]
    fn same_snapshot_may_appear_twice() {
        let ids = ids(1);
        let mut layout = CanvasLayout::new();
        layout.add_inspector(ids[0], None, None);
        layout.add_inspector(ids[0], Some("sub".into()), None);
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn clear_all_empties() {
        let ids = ids(3);
        let mut layout = layout_of(&ids);
        layout.clear_all();
        assert!(layout.is_empty());
    }
}
