//! Category use-case service.
//!
//! # Responsibility
//! - Enforce category invariants the node store does not (names, slugs,
//!   delete-with-children policy).
//! - Provide single-node create, rename, move, delete, restore and purge.
//! - Host shared helpers used by tree, reorder and bulk operations.
//!
//! # Invariants
//! - Validation errors are returned before any node store call.
//! - Store failures are wrapped with the operation name and never retried.
//! - A node with active children is never soft-deleted.

use crate::config::ServiceLimits;
use crate::model::category::{Category, CategoryId};
use crate::model::patch::Patch;
use crate::model::slug::slug_or_fallback;
use crate::repo::node_store::{ListNodesParams, Node, NodeCreate, NodeStore, NodeUpdate, StoreError};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Result type used by category service operations.
pub type CategoryResult<T> = Result<T, CategoryServiceError>;

/// Errors from category service operations.
#[derive(Debug)]
pub enum CategoryServiceError {
    /// Display name is blank after trim.
    InvalidName,
    /// A required id list is empty; carries the field name.
    EmptyIds(&'static str),
    /// Reposition ordering does not contain the repositioned node.
    OrderedIdsMissingTarget(CategoryId),
    /// Both `insert_before_id` and `insert_after_id` were supplied.
    AnchorConflict,
    /// Anchor id is also one of the moved ids.
    AnchorInSources(CategoryId),
    /// Anchor id is not an active child of the target parent.
    AnchorNotFound(CategoryId),
    /// Every copy-name candidate is taken under the destination parent.
    UniqueNameExhausted(String),
    /// Copy source is soft-deleted.
    SourceDeleted(CategoryId),
    /// Target node does not exist.
    NotFound(CategoryId),
    /// Parent node does not exist.
    ParentNotFound(CategoryId),
    /// Delete blocked because the node still has active children.
    HasChildren(CategoryId),
    /// Node store failure, tagged with the failing operation.
    Store {
        operation: &'static str,
        source: StoreError,
    },
    /// Multi-step operation failed after completing some remote mutations.
    Bulk(Box<BulkFailure>),
}

impl Display for CategoryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "category name must not be blank"),
            Self::EmptyIds(field) => write!(f, "{field} is required"),
            Self::OrderedIdsMissingTarget(id) => {
                write!(f, "ordered_ids must contain the target category id {id}")
            }
            Self::AnchorConflict => write!(
                f,
                "insert_before_id and insert_after_id cannot both be set"
            ),
            Self::AnchorInSources(id) => write!(f, "anchor {id} cannot be part of source_ids"),
            Self::AnchorNotFound(id) => write!(f, "anchor id {id} not found among siblings"),
            Self::UniqueNameExhausted(base) => {
                write!(f, "unable to generate unique name for `{base}`")
            }
            Self::SourceDeleted(id) => write!(f, "source category {id} is deleted"),
            Self::NotFound(id) => write!(f, "category not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent category not found: {id}"),
            Self::HasChildren(id) => write!(f, "cannot delete category {id} with children"),
            Self::Store { operation, source } => write!(f, "{operation}: {source}"),
            Self::Bulk(failure) => write!(f, "{failure}"),
        }
    }
}

impl Error for CategoryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store { source, .. } => Some(source),
            Self::Bulk(failure) => Some(&failure.source),
            _ => None,
        }
    }
}

/// Partial progress report for a failed multi-step operation.
///
/// Nothing is rolled back; `completed` lists what the caller must reconcile.
#[derive(Debug)]
pub struct BulkFailure {
    pub operation: &'static str,
    /// Ids whose sub-step finished (for copies: every created node id).
    pub completed: Vec<CategoryId>,
    /// Id whose sub-step failed, when the failure belongs to one id.
    pub failed_id: Option<CategoryId>,
    pub source: CategoryServiceError,
}

impl BulkFailure {
    /// Wraps `source` when remote mutations already happened, otherwise returns it unchanged.
    pub(crate) fn wrap(
        operation: &'static str,
        completed: Vec<CategoryId>,
        failed_id: Option<CategoryId>,
        source: CategoryServiceError,
    ) -> CategoryServiceError {
        if completed.is_empty() {
            return source;
        }
        CategoryServiceError::Bulk(Box::new(Self {
            operation,
            completed,
            failed_id,
            source,
        }))
    }
}

impl Display for BulkFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} stopped after {} completed step(s)",
            self.operation,
            self.completed.len()
        )?;
        if let Some(id) = self.failed_id {
            write!(f, " at category {id}")?;
        }
        write!(f, ": {}", self.source)
    }
}

/// Maps store errors, turning a missing node into `NotFound`.
pub(crate) fn store_error(
    operation: &'static str,
) -> impl FnOnce(StoreError) -> CategoryServiceError {
    move |source| match source {
        StoreError::NodeNotFound(id) => CategoryServiceError::NotFound(id),
        source => CategoryServiceError::Store { operation, source },
    }
}

/// Maps store errors for parent lookups, turning a missing node into `ParentNotFound`.
pub(crate) fn parent_error(
    operation: &'static str,
) -> impl FnOnce(StoreError) -> CategoryServiceError {
    move |source| match source {
        StoreError::NodeNotFound(id) => CategoryServiceError::ParentNotFound(id),
        source => CategoryServiceError::Store { operation, source },
    }
}

/// Category service facade over a node store.
pub struct CategoryService<S: NodeStore> {
    pub(crate) store: S,
    pub(crate) limits: ServiceLimits,
}

impl<S: NodeStore> CategoryService<S> {
    /// Creates service with default limits.
    pub fn new(store: S) -> Self {
        Self::with_limits(store, ServiceLimits::default())
    }

    /// Creates service with explicit limits.
    pub fn with_limits(store: S, limits: ServiceLimits) -> Self {
        Self { store, limits }
    }

    /// Returns the underlying node store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the active limits.
    pub fn limits(&self) -> ServiceLimits {
        self.limits
    }

    /// Loads one category.
    pub fn get_category(&self, id: CategoryId, include_deleted: bool) -> CategoryResult<Category> {
        self.store
            .get_node(id, include_deleted)
            .map(Category::from)
            .map_err(store_error("get node"))
    }

    /// Creates one category under optional parent, appended as last sibling.
    pub fn create_category(
        &self,
        parent_id: Option<CategoryId>,
        name: impl Into<String>,
    ) -> CategoryResult<Category> {
        let name = normalize_name(name.into())?;
        let started_at = Instant::now();
        info!(
            "event=category_create module=category status=start parent_id={} name_len={}",
            describe_parent(parent_id),
            name.chars().count()
        );

        let parent_path = match parent_id {
            Some(parent_id) => Some(
                self.store
                    .get_node(parent_id, false)
                    .map_err(parent_error("fetch parent"))?
                    .path,
            ),
            None => None,
        };

        let body = NodeCreate {
            slug: slug_or_fallback(&name),
            name,
            parent_path,
        };
        let created = self
            .store
            .create_node(&body)
            .map_err(store_error("create node"))
            .inspect_err(|err| log_failure("category_create", None, started_at, err))?;

        info!(
            "event=category_create module=category status=ok id={} position={} duration_ms={}",
            created.id,
            created.position,
            started_at.elapsed().as_millis()
        );
        Ok(created.into())
    }

    /// Renames one category; the slug is re-derived on every rename.
    pub fn rename_category(
        &self,
        id: CategoryId,
        name: impl Into<String>,
    ) -> CategoryResult<Category> {
        let name = normalize_name(name.into())?;
        let started_at = Instant::now();
        let body = NodeUpdate {
            slug: Some(slug_or_fallback(&name)),
            name: Some(name),
            parent_path: Patch::Absent,
        };
        let updated = self
            .store
            .update_node(id, &body)
            .map_err(store_error("update node"))
            .inspect_err(|err| log_failure("category_rename", Some(id), started_at, err))?;

        info!(
            "event=category_rename module=category status=ok id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(updated.into())
    }

    /// Moves one category.
    ///
    /// `Patch::Absent` requests no change, `Patch::Null` moves to root and
    /// `Patch::Value` moves under that parent as its last child.
    pub fn move_category(
        &self,
        id: CategoryId,
        new_parent_id: Patch<CategoryId>,
    ) -> CategoryResult<Category> {
        let started_at = Instant::now();
        let parent_path = match new_parent_id {
            Patch::Absent => {
                info!("event=category_move module=category status=noop id={id}");
                return self.get_category(id, false);
            }
            Patch::Null => Patch::Null,
            Patch::Value(parent_id) => Patch::Value(
                self.store
                    .get_node(parent_id, false)
                    .map_err(parent_error("fetch new parent"))?
                    .path,
            ),
        };

        let body = NodeUpdate {
            parent_path,
            ..NodeUpdate::default()
        };
        let moved: Category = self
            .store
            .update_node(id, &body)
            .map_err(store_error("move node"))
            .inspect_err(|err| log_failure("category_move", Some(id), started_at, err))?
            .into();

        info!(
            "event=category_move module=category status=ok id={} parent_id={} position={} duration_ms={}",
            id,
            describe_parent(moved.parent_id),
            moved.position,
            started_at.elapsed().as_millis()
        );
        Ok(moved)
    }

    /// Soft-deletes one category that has no active children.
    pub fn delete_category(&self, id: CategoryId) -> CategoryResult<()> {
        let started_at = Instant::now();
        let has_children = self
            .store
            .has_children(id)
            .map_err(store_error("check children"))?;
        if has_children {
            info!("event=category_delete module=category status=blocked id={id} reason=has_children");
            return Err(CategoryServiceError::HasChildren(id));
        }

        self.store
            .delete_node(id)
            .map_err(store_error("delete node"))
            .inspect_err(|err| log_failure("category_delete", Some(id), started_at, err))?;
        info!(
            "event=category_delete module=category status=ok id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Clears the soft-delete marker of one category.
    pub fn restore_category(&self, id: CategoryId) -> CategoryResult<Category> {
        let started_at = Instant::now();
        let restored = self
            .store
            .restore_node(id)
            .map_err(store_error("restore node"))
            .inspect_err(|err| log_failure("category_restore", Some(id), started_at, err))?;
        info!(
            "event=category_restore module=category status=ok id={} position={}",
            id, restored.position
        );
        Ok(restored.into())
    }

    /// Permanently deletes one category. Irreversible.
    pub fn purge_category(&self, id: CategoryId) -> CategoryResult<()> {
        let started_at = Instant::now();
        self.store
            .purge_node(id)
            .map_err(store_error("purge node"))
            .inspect_err(|err| log_failure("category_purge", Some(id), started_at, err))?;
        info!("event=category_purge module=category status=ok id={id}");
        Ok(())
    }

    /// Lists active children of a parent, or the roots, ordered by position.
    pub fn list_children(&self, parent_id: Option<CategoryId>) -> CategoryResult<Vec<Category>> {
        Ok(self
            .active_siblings(parent_id, "list children")?
            .into_iter()
            .map(Category::from)
            .collect())
    }

    /// Fetches active siblings under a parent ordered by position.
    ///
    /// Roots have no parent to list, so they come from a paginated full scan.
    pub(crate) fn active_siblings(
        &self,
        parent_id: Option<CategoryId>,
        operation: &'static str,
    ) -> CategoryResult<Vec<Node>> {
        let mut siblings = match parent_id {
            Some(parent_id) => self
                .store
                .list_children(parent_id)
                .map_err(parent_error(operation))?,
            None => {
                let mut roots = Vec::new();
                self.for_each_page(
                    ListNodesParams {
                        page: 1,
                        size: self.limits.sibling_page_size,
                        include_deleted: false,
                    },
                    operation,
                    |items| roots.extend(items.into_iter().filter(|node| node.parent_id.is_none())),
                )?;
                roots
            }
        };
        siblings.retain(|node| !node.is_deleted());
        siblings.sort_by_key(|node| node.position);
        Ok(siblings)
    }
}

fn normalize_name(value: String) -> CategoryResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CategoryServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}

pub(crate) fn describe_parent(parent_id: Option<CategoryId>) -> String {
    parent_id.map_or_else(|| "root".to_string(), |id| id.to_string())
}

pub(crate) fn log_failure(
    event: &str,
    id: Option<CategoryId>,
    started_at: Instant,
    err: &CategoryServiceError,
) {
    error!(
        "event={} module=category status=error id={} duration_ms={} error={}",
        event,
        id.map_or_else(|| "-".to_string(), |id| id.to_string()),
        started_at.elapsed().as_millis(),
        err
    );
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, BulkFailure, CategoryServiceError};
    use crate::repo::node_store::StoreError;
    use std::error::Error;

    #[test]
    fn normalize_name_trims_and_rejects_blank() {
        assert_eq!(normalize_name("  Math ".to_string()).unwrap(), "Math");
        assert!(matches!(
            normalize_name(" \t ".to_string()),
            Err(CategoryServiceError::InvalidName)
        ));
    }

    #[test]
    fn bulk_wrap_returns_plain_error_without_progress() {
        let err = BulkFailure::wrap("bulk_move", Vec::new(), Some(3), CategoryServiceError::NotFound(3));
        assert!(matches!(err, CategoryServiceError::NotFound(3)));
    }

    #[test]
    fn bulk_wrap_reports_progress_and_chains_source() {
        let err = BulkFailure::wrap(
            "bulk_copy",
            vec![10, 11],
            Some(4),
            CategoryServiceError::Store {
                operation: "create node",
                source: StoreError::Conflict("/math".to_string()),
            },
        );
        let CategoryServiceError::Bulk(failure) = &err else {
            panic!("expected bulk failure, got {err:?}");
        };
        assert_eq!(failure.completed, vec![10, 11]);
        assert_eq!(failure.failed_id, Some(4));
        assert!(err.to_string().contains("bulk_copy stopped after 2 completed step(s) at category 4"));
        assert!(err.source().is_some());
    }
}
