//! Bulk move with anchor placement, plus bulk restore and purge.
//!
//! # Invariants
//! - Anchor validation happens before the first move.
//! - Moved nodes end up contiguous in caller order at the anchor point.
//! - Bulk restore and purge run sequentially and stop at the first failure.

use super::category_service::{
    describe_parent, log_failure, BulkFailure, CategoryResult, CategoryService,
    CategoryServiceError,
};
use super::requests::BulkMoveRequest;
use crate::model::category::{Category, CategoryId};
use crate::model::patch::Patch;
use crate::repo::node_store::NodeStore;
use log::info;
use std::collections::HashSet;
use std::time::Instant;

/// Placement of moved nodes among the target's remaining siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    End,
    Before(CategoryId),
    After(CategoryId),
}

impl Anchor {
    /// Builds an anchor from optional before/after ids; both set is rejected.
    pub fn from_ids(
        insert_before_id: Option<CategoryId>,
        insert_after_id: Option<CategoryId>,
    ) -> CategoryResult<Self> {
        match (insert_before_id, insert_after_id) {
            (Some(_), Some(_)) => Err(CategoryServiceError::AnchorConflict),
            (Some(before), None) => Ok(Self::Before(before)),
            (None, Some(after)) => Ok(Self::After(after)),
            (None, None) => Ok(Self::End),
        }
    }

    fn id(self) -> Option<CategoryId> {
        match self {
            Self::End => None,
            Self::Before(id) | Self::After(id) => Some(id),
        }
    }
}

/// Splices `moved` into `remaining` at the anchor.
///
/// # Errors
/// - `AnchorNotFound` when the anchor id is not in `remaining`.
pub fn splice_at_anchor(
    remaining: &[CategoryId],
    moved: &[CategoryId],
    anchor: Anchor,
) -> CategoryResult<Vec<CategoryId>> {
    let insert_at = match anchor {
        Anchor::End => remaining.len(),
        Anchor::Before(id) | Anchor::After(id) => {
            let index = remaining
                .iter()
                .position(|candidate| *candidate == id)
                .ok_or(CategoryServiceError::AnchorNotFound(id))?;
            if matches!(anchor, Anchor::After(_)) {
                index + 1
            } else {
                index
            }
        }
    };

    let mut ordered = Vec::with_capacity(remaining.len() + moved.len());
    ordered.extend_from_slice(&remaining[..insert_at]);
    ordered.extend_from_slice(moved);
    ordered.extend_from_slice(&remaining[insert_at..]);
    Ok(ordered)
}

impl<S: NodeStore> CategoryService<S> {
    /// Moves every source under the target parent and places them at the anchor.
    ///
    /// Returns the moved categories in `source_ids` order with final positions.
    pub fn bulk_move(&self, request: &BulkMoveRequest) -> CategoryResult<Vec<Category>> {
        let source_ids = dedup_preserving_order(&request.source_ids);
        if source_ids.is_empty() {
            return Err(CategoryServiceError::EmptyIds("source_ids"));
        }
        let anchor = Anchor::from_ids(request.insert_before_id, request.insert_after_id)?;
        if let Some(anchor_id) = anchor.id() {
            if source_ids.contains(&anchor_id) {
                return Err(CategoryServiceError::AnchorInSources(anchor_id));
            }
        }

        let target = request.target_parent_id;
        let started_at = Instant::now();
        info!(
            "event=category_bulk_move module=category status=start sources={} target_parent_id={}",
            source_ids.len(),
            describe_parent(target)
        );

        if let Some(anchor_id) = anchor.id() {
            let siblings = self.active_siblings(target, "list target siblings")?;
            if !siblings.iter().any(|node| node.id == anchor_id) {
                return Err(CategoryServiceError::AnchorNotFound(anchor_id));
            }
        }

        let mut moved = Vec::with_capacity(source_ids.len());
        for id in &source_ids {
            if let Err(err) = self.move_category(*id, Patch::present(target)) {
                log_failure("category_bulk_move", Some(*id), started_at, &err);
                return Err(BulkFailure::wrap("bulk_move", moved, Some(*id), err));
            }
            moved.push(*id);
        }

        let placed = self
            .place_moved(target, &source_ids, anchor)
            .inspect_err(|err| log_failure("category_bulk_move", None, started_at, err))
            .map_err(|err| BulkFailure::wrap("bulk_move", moved, None, err))?;

        info!(
            "event=category_bulk_move module=category status=ok moved={} duration_ms={}",
            placed.len(),
            started_at.elapsed().as_millis()
        );
        Ok(placed)
    }

    fn place_moved(
        &self,
        target: Option<CategoryId>,
        source_ids: &[CategoryId],
        anchor: Anchor,
    ) -> CategoryResult<Vec<Category>> {
        let moved_set: HashSet<CategoryId> = source_ids.iter().copied().collect();
        let remaining: Vec<CategoryId> = self
            .active_siblings(target, "list target siblings")?
            .into_iter()
            .map(|node| node.id)
            .filter(|id| !moved_set.contains(id))
            .collect();
        let ordered = splice_at_anchor(&remaining, source_ids, anchor)?;

        let siblings = self.reorder(target, &ordered)?;
        let mut placed: Vec<Category> = siblings
            .into_iter()
            .filter(|sibling| moved_set.contains(&sibling.id))
            .collect();
        placed.sort_by_key(|category| {
            source_ids
                .iter()
                .position(|id| *id == category.id)
                .unwrap_or(usize::MAX)
        });
        Ok(placed)
    }

    /// Restores each id in order.
    pub fn bulk_restore(&self, ids: &[CategoryId]) -> CategoryResult<Vec<Category>> {
        self.run_each("bulk_restore", ids, |id| self.restore_category(id))
    }

    /// Purges each id in order. Irreversible.
    pub fn bulk_purge(&self, ids: &[CategoryId]) -> CategoryResult<()> {
        self.run_each("bulk_purge", ids, |id| self.purge_category(id))
            .map(drop)
    }

    fn run_each<T>(
        &self,
        operation: &'static str,
        ids: &[CategoryId],
        mut step: impl FnMut(CategoryId) -> CategoryResult<T>,
    ) -> CategoryResult<Vec<T>> {
        if ids.is_empty() {
            return Err(CategoryServiceError::EmptyIds("ids"));
        }
        let started_at = Instant::now();
        let mut completed = Vec::with_capacity(ids.len());
        let mut outputs = Vec::with_capacity(ids.len());
        for id in ids {
            match step(*id) {
                Ok(output) => {
                    outputs.push(output);
                    completed.push(*id);
                }
                Err(err) => {
                    log_failure(operation, Some(*id), started_at, &err);
                    return Err(BulkFailure::wrap(operation, completed, Some(*id), err));
                }
            }
        }
        info!(
            "event={} module=category status=ok count={} duration_ms={}",
            operation,
            completed.len(),
            started_at.elapsed().as_millis()
        );
        Ok(outputs)
    }
}

fn dedup_preserving_order(ids: &[CategoryId]) -> Vec<CategoryId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::{dedup_preserving_order, splice_at_anchor, Anchor};
    use crate::service::category_service::CategoryServiceError;

    #[test]
    fn splice_places_moved_block_at_anchor() {
        let remaining = [1, 2, 3];
        assert_eq!(
            splice_at_anchor(&remaining, &[9, 8], Anchor::Before(2)).unwrap(),
            vec![1, 9, 8, 2, 3]
        );
        assert_eq!(
            splice_at_anchor(&remaining, &[9], Anchor::After(3)).unwrap(),
            vec![1, 2, 3, 9]
        );
        assert_eq!(
            splice_at_anchor(&remaining, &[9], Anchor::End).unwrap(),
            vec![1, 2, 3, 9]
        );
    }

    #[test]
    fn splice_rejects_missing_anchor() {
        assert!(matches!(
            splice_at_anchor(&[1, 2], &[9], Anchor::After(5)),
            Err(CategoryServiceError::AnchorNotFound(5))
        ));
    }

    #[test]
    fn anchor_from_ids_rejects_both() {
        assert!(matches!(
            Anchor::from_ids(Some(1), Some(2)),
            Err(CategoryServiceError::AnchorConflict)
        ));
        assert_eq!(Anchor::from_ids(None, None).unwrap(), Anchor::End);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        assert_eq!(dedup_preserving_order(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
