//! Tree and trash aggregation.
//!
//! # Responsibility
//! - Drain the paginated node listing into one in-memory snapshot.
//! - Assemble the active forest and the flat trash list from that snapshot.
//!
//! # Invariants
//! - Pagination stops on reported total, an empty page, or a short page.
//! - Nodes whose parent is absent from the snapshot surface as roots.
//! - Siblings are ordered by `(position, name)`.

use super::category_service::{store_error, CategoryResult, CategoryService};
use crate::model::category::{Category, CategoryId};
use crate::repo::node_store::{ListNodesParams, Node, NodeStore};
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

impl<S: NodeStore> CategoryService<S> {
    /// Returns the category forest, with tombstones only when `include_deleted` is set.
    pub fn get_tree(&self, include_deleted: bool) -> CategoryResult<Vec<Category>> {
        let started_at = Instant::now();
        let mut nodes = Vec::new();
        let pages = self.for_each_page(
            ListNodesParams {
                page: 1,
                size: self.limits.tree_page_size,
                include_deleted,
            },
            "list nodes",
            |items| {
                nodes.extend(
                    items
                        .into_iter()
                        .filter(|node| include_deleted || !node.is_deleted()),
                )
            },
        )?;

        let node_count = nodes.len();
        let tree = build_tree(nodes);
        info!(
            "event=category_tree module=category status=ok include_deleted={} nodes={} roots={} pages={} duration_ms={}",
            include_deleted,
            node_count,
            tree.len(),
            pages,
            started_at.elapsed().as_millis()
        );
        Ok(tree)
    }

    /// Returns every soft-deleted category as a flat list in store order.
    pub fn get_trash(&self) -> CategoryResult<Vec<Category>> {
        let mut deleted = Vec::new();
        let pages = self.for_each_page(
            ListNodesParams {
                page: 1,
                size: self.limits.tree_page_size,
                include_deleted: true,
            },
            "list deleted nodes",
            |items| {
                deleted.extend(
                    items
                        .into_iter()
                        .filter(Node::is_deleted)
                        .map(Category::from),
                )
            },
        )?;
        info!(
            "event=category_trash module=category status=ok nodes={} pages={}",
            deleted.len(),
            pages
        );
        Ok(deleted)
    }

    /// Walks pages starting at `params.page`, handing each page's items to `sink`.
    ///
    /// Returns the number of pages fetched.
    pub(crate) fn for_each_page(
        &self,
        params: ListNodesParams,
        operation: &'static str,
        mut sink: impl FnMut(Vec<Node>),
    ) -> CategoryResult<u32> {
        let mut request = params;
        let mut fetched: u64 = 0;
        let mut pages = 0;

        loop {
            let page = self
                .store
                .list_nodes(request)
                .map_err(store_error(operation))?;
            pages += 1;

            let item_count = page.items.len();
            if item_count == 0 {
                break;
            }
            fetched += item_count as u64;
            let page_size = if page.size > 0 { page.size } else { request.size };
            debug!(
                "event=category_page module=category status=ok page={} items={} total={}",
                request.page, item_count, page.total
            );
            sink(page.items);

            if page.total != 0 && fetched >= page.total {
                break;
            }
            if item_count < page_size as usize {
                break;
            }
            request.page += 1;
        }

        Ok(pages)
    }
}

/// Assembles a forest from a flat node list.
///
/// Nodes pointing at parents outside the list become roots. Nodes trapped in
/// a parent cycle are promoted to roots as well so nothing is silently dropped.
pub fn build_tree(nodes: Vec<Node>) -> Vec<Category> {
    let known: HashSet<CategoryId> = nodes.iter().map(|node| node.id).collect();
    let mut roots = Vec::new();
    let mut children_of: BTreeMap<CategoryId, Vec<Category>> = BTreeMap::new();

    for node in nodes {
        match node.parent_id {
            Some(parent_id) if known.contains(&parent_id) => {
                children_of.entry(parent_id).or_default().push(node.into());
            }
            _ => roots.push(Category::from(node)),
        }
    }

    let mut forest: Vec<Category> = roots
        .into_iter()
        .map(|root| attach_children(root, &mut children_of))
        .collect();

    while let Some((_, stranded)) = children_of.pop_first() {
        forest.extend(
            stranded
                .into_iter()
                .map(|node| attach_children(node, &mut children_of)),
        );
    }

    sort_siblings(&mut forest);
    forest
}

fn attach_children(
    mut category: Category,
    children_of: &mut BTreeMap<CategoryId, Vec<Category>>,
) -> Category {
    if let Some(children) = children_of.remove(&category.id) {
        let mut children: Vec<Category> = children
            .into_iter()
            .map(|child| attach_children(child, children_of))
            .collect();
        sort_siblings(&mut children);
        category.children = children;
    }
    category
}

fn sort_siblings(siblings: &mut [Category]) {
    siblings.sort_by(|left, right| {
        left.position
            .cmp(&right.position)
            .then_with(|| left.name.cmp(&right.name))
    });
}
