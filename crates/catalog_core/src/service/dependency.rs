//! Pre-delete dependency summaries.

use super::category_service::{store_error, CategoryResult, CategoryService, CategoryServiceError};
use super::requests::DependencyCheckRequest;
use crate::model::category::CategoryId;
use crate::repo::node_store::NodeStore;
use log::info;
use serde::Serialize;

/// What would be affected by deleting one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencySummary {
    pub id: CategoryId,
    pub name: String,
    pub path: String,
    pub has_children: bool,
    pub document_count: usize,
    pub include_descendants: bool,
    pub warnings: Vec<String>,
}

impl<S: NodeStore> CategoryService<S> {
    /// Summarizes child and document dependencies for each id, in input order.
    pub fn check_dependencies(
        &self,
        request: &DependencyCheckRequest,
    ) -> CategoryResult<Vec<DependencySummary>> {
        if request.ids.is_empty() {
            return Err(CategoryServiceError::EmptyIds("ids"));
        }

        let summaries = request
            .ids
            .iter()
            .map(|id| self.dependency_summary(*id, request.include_descendants))
            .collect::<CategoryResult<Vec<_>>>()?;

        info!(
            "event=category_dependency_check module=category status=ok ids={} warned={}",
            summaries.len(),
            summaries
                .iter()
                .filter(|summary| !summary.warnings.is_empty())
                .count()
        );
        Ok(summaries)
    }

    fn dependency_summary(
        &self,
        id: CategoryId,
        include_descendants: bool,
    ) -> CategoryResult<DependencySummary> {
        let category = self.get_category(id, false)?;
        let has_children = self
            .store
            .has_children(id)
            .map_err(store_error("check children"))?;
        let document_count = self
            .store
            .list_node_documents(id, include_descendants)
            .map_err(store_error("list documents"))?
            .len();

        Ok(DependencySummary {
            id,
            name: category.name,
            path: category.path,
            has_children,
            document_count,
            include_descendants,
            warnings: dependency_warnings(has_children, document_count),
        })
    }
}

fn dependency_warnings(has_children: bool, document_count: usize) -> Vec<String> {
    let mut warnings = Vec::new();
    if has_children {
        warnings.push("has child categories".to_string());
    }
    match document_count {
        0 => {}
        1 => warnings.push("bound to 1 document".to_string()),
        count => warnings.push(format!("bound to {count} documents")),
    }
    warnings
}
