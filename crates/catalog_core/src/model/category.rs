//! Category read model.
//!
//! # Responsibility
//! - Describe one tree node as exposed by the management layer.
//!
//! # Invariants
//! - `position` is 1-based and dense among non-deleted siblings at rest.
//! - `path` is `parent.path + "/" + slug`, or `"/" + slug` for roots.
//! - `deleted_at` present means the node is a soft-delete tombstone.

use serde::{Deserialize, Serialize};

/// Node-store assigned category identifier.
pub type CategoryId = i64;

/// One category node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// User-facing display name.
    pub name: String,
    pub slug: String,
    /// Slash-delimited path computed by the node store.
    pub path: String,
    /// `None` means root-level node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    /// 1-based rank among non-deleted siblings.
    pub position: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
    /// Epoch ms soft-delete timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
    /// Nested children, populated only by tree aggregation and bulk copy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Category>,
}

impl Category {
    /// Returns whether this category is a soft-delete tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Counts this node plus every nested child.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Category::subtree_len)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::Category;

    fn sample(id: i64, children: Vec<Category>) -> Category {
        Category {
            id,
            name: format!("node-{id}"),
            slug: format!("node-{id}"),
            path: format!("/node-{id}"),
            parent_id: None,
            position: 1,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
            children,
        }
    }

    #[test]
    fn subtree_len_counts_nested_children() {
        let tree = sample(1, vec![sample(2, vec![sample(3, Vec::new())]), sample(4, Vec::new())]);
        assert_eq!(tree.subtree_len(), 4);
    }

    #[test]
    fn deleted_marker_follows_deleted_at() {
        let mut node = sample(1, Vec::new());
        assert!(!node.is_deleted());
        node.deleted_at = Some(10);
        assert!(node.is_deleted());
    }
}
