//! Node store boundary contracts.
//!
//! # Responsibility
//! - Define the remote hierarchical store interface the category engine calls.
//! - Define wire-shaped records exchanged across that boundary.
//!
//! # Invariants
//! - The store owns `path` and `position` computation; callers never write them.
//! - Reads exclude soft-deleted nodes unless `include_deleted` is requested.
//! - `NodeUpdate::parent_path` is tri-state: absent keeps the parent, null
//!   moves to root, a value moves under the node at that path.

use crate::db::DbError;
use crate::model::category::{Category, CategoryId};
use crate::model::patch::Patch;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by node store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by node store implementations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying storage or transport failure.
    Db(DbError),
    /// Node does not exist, or is soft-deleted and deleted reads were not requested.
    NodeNotFound(CategoryId),
    /// No active node lives at the given path.
    PathNotFound(String),
    /// An active node already occupies the given path.
    Conflict(String),
    /// Request rejected by the store (bad reorder set, cyclic move, ...).
    InvalidRequest(String),
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NodeNotFound(id) => write!(f, "node not found: {id}"),
            Self::PathNotFound(path) => write!(f, "no node at path `{path}`"),
            Self::Conflict(path) => write!(f, "path already in use: `{path}`"),
            Self::InvalidRequest(message) => write!(f, "invalid node store request: {message}"),
            Self::InvalidData(message) => write!(f, "invalid node data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Node record as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub path: String,
    pub parent_id: Option<CategoryId>,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Node {
    /// Returns whether this node is a soft-delete tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl From<Node> for Category {
    fn from(node: Node) -> Self {
        Self {
            id: node.id,
            name: node.name,
            slug: node.slug,
            path: node.path,
            parent_id: node.parent_id,
            position: node.position,
            created_at: node.created_at,
            updated_at: node.updated_at,
            deleted_at: node.deleted_at,
            children: Vec::new(),
        }
    }
}

/// Create payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCreate {
    pub name: String,
    pub slug: String,
    /// Path of the parent node; `None` creates a root.
    pub parent_path: Option<String>,
}

/// Partial update payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub parent_path: Patch<String>,
}

/// Batch sibling reorder payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReorder {
    pub parent_id: Option<CategoryId>,
    pub ordered_ids: Vec<CategoryId>,
}

/// Paginated list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListNodesParams {
    /// 1-based page number.
    pub page: u32,
    pub size: u32,
    pub include_deleted: bool,
}

/// One page of nodes.
///
/// `total` and `size` come from the store and may be zero when it omits them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodesPage {
    pub page: u32,
    pub size: u32,
    pub total: u64,
    pub items: Vec<Node>,
}

/// Document bound to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub node_id: CategoryId,
    pub title: String,
    pub created_at: i64,
}

/// Remote node store interface.
pub trait NodeStore {
    /// Lists one page of nodes.
    fn list_nodes(&self, params: ListNodesParams) -> StoreResult<NodesPage>;
    /// Loads one node by id.
    fn get_node(&self, id: CategoryId, include_deleted: bool) -> StoreResult<Node>;
    /// Creates one node appended as last sibling.
    fn create_node(&self, body: &NodeCreate) -> StoreResult<Node>;
    /// Applies a partial update; slug and parent changes propagate to paths.
    fn update_node(&self, id: CategoryId, body: &NodeUpdate) -> StoreResult<Node>;
    /// Soft-deletes one node.
    fn delete_node(&self, id: CategoryId) -> StoreResult<()>;
    /// Clears the soft-delete marker.
    fn restore_node(&self, id: CategoryId) -> StoreResult<Node>;
    /// Permanently deletes one node.
    fn purge_node(&self, id: CategoryId) -> StoreResult<()>;
    /// Lists active direct children ordered by position.
    fn list_children(&self, id: CategoryId) -> StoreResult<Vec<Node>>;
    /// Returns whether the node has active children.
    fn has_children(&self, id: CategoryId) -> StoreResult<bool>;
    /// Assigns `position = index + 1` in the given order.
    fn reorder_nodes(&self, payload: &NodeReorder) -> StoreResult<Vec<Node>>;
    /// Lists active documents bound to the node, optionally its whole subtree.
    fn list_node_documents(
        &self,
        id: CategoryId,
        include_descendants: bool,
    ) -> StoreResult<Vec<Document>>;
}

impl<S: NodeStore + ?Sized> NodeStore for &S {
    fn list_nodes(&self, params: ListNodesParams) -> StoreResult<NodesPage> {
        (**self).list_nodes(params)
    }

    fn get_node(&self, id: CategoryId, include_deleted: bool) -> StoreResult<Node> {
        (**self).get_node(id, include_deleted)
    }

    fn create_node(&self, body: &NodeCreate) -> StoreResult<Node> {
        (**self).create_node(body)
    }

    fn update_node(&self, id: CategoryId, body: &NodeUpdate) -> StoreResult<Node> {
        (**self).update_node(id, body)
    }

    fn delete_node(&self, id: CategoryId) -> StoreResult<()> {
        (**self).delete_node(id)
    }

    fn restore_node(&self, id: CategoryId) -> StoreResult<Node> {
        (**self).restore_node(id)
    }

    fn purge_node(&self, id: CategoryId) -> StoreResult<()> {
        (**self).purge_node(id)
    }

    fn list_children(&self, id: CategoryId) -> StoreResult<Vec<Node>> {
        (**self).list_children(id)
    }

    fn has_children(&self, id: CategoryId) -> StoreResult<bool> {
        (**self).has_children(id)
    }

    fn reorder_nodes(&self, payload: &NodeReorder) -> StoreResult<Vec<Node>> {
        (**self).reorder_nodes(payload)
    }

    fn list_node_documents(
        &self,
        id: CategoryId,
        include_descendants: bool,
    ) -> StoreResult<Vec<Document>> {
        (**self).list_node_documents(id, include_descendants)
    }
}
