//! Recursive subtree copy with collision-free naming.
//!
//! # Responsibility
//! - Duplicate each source subtree under a target parent.
//! - Pick a display name that is unique among the destination's siblings and
//!   whose derived path the store accepts.
//!
//! # Invariants
//! - Sibling names are fetched at most once per destination parent per call.
//! - Copies created during this call are never copied again, so copying a
//!   node into its own subtree terminates.
//! - Partial progress is reported through `BulkFailure`; nothing is rolled back.

use super::category_service::{
    describe_parent, log_failure, BulkFailure, CategoryResult, CategoryService,
    CategoryServiceError,
};
use super::requests::BulkCopyRequest;
use crate::model::category::{Category, CategoryId};
use crate::repo::node_store::{NodeStore, StoreError};
use log::info;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Mutable state for one bulk copy call.
#[derive(Default)]
struct CopyRun {
    sibling_names: HashMap<Option<CategoryId>, HashSet<String>>,
    created: Vec<CategoryId>,
    created_set: HashSet<CategoryId>,
    cursor: Option<CategoryId>,
}

impl<S: NodeStore> CategoryService<S> {
    /// Copies each source subtree under `target_parent_id`.
    ///
    /// Returns the new top-level copies, each with its copied descendants.
    pub fn bulk_copy(&self, request: &BulkCopyRequest) -> CategoryResult<Vec<Category>> {
        if request.source_ids.is_empty() {
            return Err(CategoryServiceError::EmptyIds("source_ids"));
        }
        let started_at = Instant::now();
        info!(
            "event=category_bulk_copy module=category status=start sources={} target_parent_id={}",
            request.source_ids.len(),
            describe_parent(request.target_parent_id)
        );

        let mut run = CopyRun::default();
        let mut copies = Vec::with_capacity(request.source_ids.len());
        for source_id in &request.source_ids {
            match self.copy_subtree(&mut run, *source_id, request.target_parent_id) {
                Ok(copy) => copies.push(copy),
                Err(err) => {
                    log_failure("category_bulk_copy", run.cursor, started_at, &err);
                    return Err(BulkFailure::wrap("bulk_copy", run.created, run.cursor, err));
                }
            }
        }

        info!(
            "event=category_bulk_copy module=category status=ok created={} duration_ms={}",
            run.created.len(),
            started_at.elapsed().as_millis()
        );
        Ok(copies)
    }

    fn copy_subtree(
        &self,
        run: &mut CopyRun,
        source_id: CategoryId,
        target_parent_id: Option<CategoryId>,
    ) -> CategoryResult<Category> {
        run.cursor = Some(source_id);
        let source = self.get_category(source_id, true)?;
        if source.is_deleted() {
            return Err(CategoryServiceError::SourceDeleted(source_id));
        }

        let mut copy = self.create_unique_copy(run, target_parent_id, &source.name)?;
        run.created.push(copy.id);
        run.created_set.insert(copy.id);

        let children = self.active_siblings(Some(source_id), "list source children")?;
        for child in children {
            if run.created_set.contains(&child.id) {
                continue;
            }
            let child_copy = self.copy_subtree(run, child.id, Some(copy.id))?;
            copy.children.push(child_copy);
        }
        Ok(copy)
    }

    /// Creates a copy under the first free candidate among `base`,
    /// `base (copy)` and `base (copy N)` for `N` in `2..=copy_name_attempts`.
    ///
    /// Candidates are reserved as they are tried. A store path conflict (a
    /// sibling whose name differs only in case) moves on to the next one.
    fn create_unique_copy(
        &self,
        run: &mut CopyRun,
        parent_id: Option<CategoryId>,
        base: &str,
    ) -> CategoryResult<Category> {
        if !run.sibling_names.contains_key(&parent_id) {
            let names = self
                .active_siblings(parent_id, "list target siblings")?
                .into_iter()
                .map(|node| node.name)
                .collect();
            run.sibling_names.insert(parent_id, names);
        }

        for candidate in copy_name_candidates(base, self.limits.copy_name_attempts) {
            let taken = run.sibling_names.entry(parent_id).or_default();
            if !taken.insert(candidate.clone()) {
                continue;
            }
            match self.create_category(parent_id, candidate) {
                Err(CategoryServiceError::Store {
                    source: StoreError::Conflict(path),
                    ..
                }) => {
                    info!(
                        "event=category_bulk_copy module=category status=retry reason=path_conflict path={path}"
                    );
                }
                result => return result,
            }
        }
        Err(CategoryServiceError::UniqueNameExhausted(base.to_string()))
    }
}

fn copy_name_candidates(base: &str, attempts: u32) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string())
        .chain(std::iter::once(format!("{base} (copy)")))
        .chain((2..=attempts).map(move |n| format!("{base} (copy {n})")))
}

#[cfg(test)]
mod tests {
    use super::copy_name_candidates;

    #[test]
    fn candidates_follow_copy_suffix_sequence() {
        let candidates: Vec<String> = copy_name_candidates("Math", 3).collect();
        assert_eq!(
            candidates,
            vec!["Math", "Math (copy)", "Math (copy 2)", "Math (copy 3)"]
        );
    }

    #[test]
    fn single_attempt_offers_base_and_plain_copy() {
        assert_eq!(copy_name_candidates("A", 1).count(), 2);
    }
}
