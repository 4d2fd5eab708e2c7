//! Decodable request bodies for category operations.
//!
//! # Invariants
//! - Fields that distinguish "omitted" from "null" use `Patch`.
//! - Missing optional id lists decode as empty and are rejected by the service.

use crate::model::category::CategoryId;
use crate::model::patch::Patch;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameCategoryRequest {
    pub name: String,
}

/// Single move. An omitted `new_parent_id` keeps the parent; `null` moves to root.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoveCategoryRequest {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub new_parent_id: Patch<CategoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub ordered_ids: Vec<CategoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepositionRequest {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub new_parent_id: Patch<CategoryId>,
    #[serde(default)]
    pub ordered_ids: Vec<CategoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkCopyRequest {
    #[serde(default)]
    pub source_ids: Vec<CategoryId>,
    #[serde(default)]
    pub target_parent_id: Option<CategoryId>,
}

/// Bulk move. At most one of the anchors may be set; neither appends at the end.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkMoveRequest {
    #[serde(default)]
    pub source_ids: Vec<CategoryId>,
    #[serde(default)]
    pub target_parent_id: Option<CategoryId>,
    #[serde(default)]
    pub insert_before_id: Option<CategoryId>,
    #[serde(default)]
    pub insert_after_id: Option<CategoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkIdsRequest {
    #[serde(default)]
    pub ids: Vec<CategoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DependencyCheckRequest {
    #[serde(default)]
    pub ids: Vec<CategoryId>,
    #[serde(default)]
    pub include_descendants: bool,
}
