//! Sibling reorder and combined move-then-reorder.

use super::category_service::{
    describe_parent, store_error, BulkFailure, CategoryResult, CategoryService,
    CategoryServiceError,
};
use crate::model::category::{Category, CategoryId};
use crate::model::patch::Patch;
use crate::repo::node_store::{NodeReorder, NodeStore, StoreError};
use log::info;
use serde::Serialize;

/// Outcome of a reposition: the moved category and its final sibling list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositionResult {
    pub category: Category,
    pub siblings: Vec<Category>,
}

impl<S: NodeStore> CategoryService<S> {
    /// Rewrites sibling positions under `parent_id` to follow `ordered_ids`.
    ///
    /// Returns the full active sibling list after the rewrite.
    pub fn reorder(
        &self,
        parent_id: Option<CategoryId>,
        ordered_ids: &[CategoryId],
    ) -> CategoryResult<Vec<Category>> {
        if ordered_ids.is_empty() {
            return Err(CategoryServiceError::EmptyIds("ordered_ids"));
        }

        let payload = NodeReorder {
            parent_id,
            ordered_ids: ordered_ids.to_vec(),
        };
        let siblings = self.store.reorder_nodes(&payload).map_err(|err| match err {
            StoreError::NodeNotFound(id) if Some(id) == parent_id => {
                CategoryServiceError::ParentNotFound(id)
            }
            other => store_error("reorder nodes")(other),
        })?;

        info!(
            "event=category_reorder module=category status=ok parent_id={} ordered={} siblings={}",
            describe_parent(parent_id),
            ordered_ids.len(),
            siblings.len()
        );
        Ok(siblings.into_iter().map(Category::from).collect())
    }

    /// Optionally moves `id` under a new parent, then reorders its siblings.
    ///
    /// The move only happens when `new_parent_id` is present and differs from
    /// the current parent, so repeating the same request is idempotent. A
    /// reorder failure after a completed move comes back as a `BulkFailure`
    /// listing `id`; the move is not undone.
    pub fn reposition(
        &self,
        id: CategoryId,
        new_parent_id: Patch<CategoryId>,
        ordered_ids: &[CategoryId],
    ) -> CategoryResult<RepositionResult> {
        if ordered_ids.is_empty() {
            return Err(CategoryServiceError::EmptyIds("ordered_ids"));
        }
        if !ordered_ids.contains(&id) {
            return Err(CategoryServiceError::OrderedIdsMissingTarget(id));
        }

        let mut current = self.get_category(id, true)?;
        let mut moved = Vec::new();
        if let Some(target_parent) = new_parent_id.as_present() {
            let target_parent = target_parent.copied();
            if target_parent != current.parent_id {
                current = self.move_category(id, Patch::present(target_parent))?;
                moved.push(id);
            }
        }

        let siblings = self
            .reorder(current.parent_id, ordered_ids)
            .map_err(|err| BulkFailure::wrap("reposition", moved, Some(id), err))?;
        let category = siblings
            .iter()
            .find(|sibling| sibling.id == id)
            .cloned()
            .unwrap_or(current);

        Ok(RepositionResult { category, siblings })
    }
}
