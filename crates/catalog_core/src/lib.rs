//! Core category engine.
//! This crate is the single source of truth for category tree invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{CatalogConfig, ServiceLimits};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::category::{Category, CategoryId};
pub use model::patch::Patch;
pub use model::slug::slugify;
pub use repo::node_store::{Document, Node, NodeStore, StoreError, StoreResult};
pub use repo::sqlite_store::SqliteNodeStore;
pub use service::bulk_move::Anchor;
pub use service::category_service::{
    BulkFailure, CategoryResult, CategoryService, CategoryServiceError,
};
pub use service::dependency::DependencySummary;
pub use service::reorder::RepositionResult;
pub use service::requests::{
    BulkCopyRequest, BulkIdsRequest, BulkMoveRequest, CreateCategoryRequest,
    DependencyCheckRequest, MoveCategoryRequest, RenameCategoryRequest, ReorderRequest,
    RepositionRequest,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
