use catalog_core::repo::node_store::{
    Document, ListNodesParams, Node, NodeCreate, NodeReorder, NodeUpdate, NodesPage,
};
use catalog_core::{CategoryService, NodeStore, ServiceLimits, StoreError, StoreResult};
use std::cell::Cell;

/// Read-only store serving a fixed node list with configurable page metadata.
struct PagedStore {
    nodes: Vec<Node>,
    reported_total: Option<u64>,
    report_size: bool,
    calls: Cell<u32>,
}

impl PagedStore {
    fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            reported_total: None,
            report_size: false,
            calls: Cell::new(0),
        }
    }
}

fn unsupported<T>() -> StoreResult<T> {
    Err(StoreError::InvalidRequest("read-only test store".to_string()))
}

impl NodeStore for PagedStore {
    fn list_nodes(&self, params: ListNodesParams) -> StoreResult<NodesPage> {
        self.calls.set(self.calls.get() + 1);
        let visible: Vec<&Node> = self
            .nodes
            .iter()
            .filter(|node| params.include_deleted || !node.is_deleted())
            .collect();
        let start = ((params.page - 1) * params.size) as usize;
        let items = visible
            .iter()
            .skip(start)
            .take(params.size as usize)
            .map(|node| (*node).clone())
            .collect();
        Ok(NodesPage {
            page: params.page,
            size: if self.report_size { params.size } else { 0 },
            total: self.reported_total.unwrap_or(0),
            items,
        })
    }

    fn get_node(&self, id: i64, _include_deleted: bool) -> StoreResult<Node> {
        Err(StoreError::NodeNotFound(id))
    }

    fn create_node(&self, _body: &NodeCreate) -> StoreResult<Node> {
        unsupported()
    }

    fn update_node(&self, _id: i64, _body: &NodeUpdate) -> StoreResult<Node> {
        unsupported()
    }

    fn delete_node(&self, _id: i64) -> StoreResult<()> {
        unsupported()
    }

    fn restore_node(&self, _id: i64) -> StoreResult<Node> {
        unsupported()
    }

    fn purge_node(&self, _id: i64) -> StoreResult<()> {
        unsupported()
    }

    fn list_children(&self, id: i64) -> StoreResult<Vec<Node>> {
        Ok(self
            .nodes
            .iter()
            .filter(|node| node.parent_id == Some(id))
            .cloned()
            .collect())
    }

    fn has_children(&self, id: i64) -> StoreResult<bool> {
        Ok(self.nodes.iter().any(|node| node.parent_id == Some(id)))
    }

    fn reorder_nodes(&self, _payload: &NodeReorder) -> StoreResult<Vec<Node>> {
        unsupported()
    }

    fn list_node_documents(&self, _id: i64, _include_descendants: bool) -> StoreResult<Vec<Document>> {
        Ok(Vec::new())
    }
}

fn node(id: i64, parent_id: Option<i64>, position: i64) -> Node {
    Node {
        id,
        name: format!("N{id}"),
        slug: format!("n{id}"),
        path: format!("/n{id}"),
        parent_id,
        position,
        created_at: 0,
        updated_at: 0,
        deleted_at: None,
    }
}

fn roots(count: i64) -> Vec<Node> {
    (1..=count).map(|id| node(id, None, id)).collect()
}

fn small_pages() -> ServiceLimits {
    ServiceLimits {
        tree_page_size: 2,
        sibling_page_size: 2,
        ..ServiceLimits::default()
    }
}

#[test]
fn missing_total_stops_on_short_page() {
    let store = PagedStore::new(roots(5));
    let service = CategoryService::with_limits(&store, small_pages());

    let tree = service.get_tree(false).unwrap();
    assert_eq!(tree.len(), 5);
    assert_eq!(store.calls.get(), 3);
}

#[test]
fn inflated_total_still_stops_on_short_page() {
    let mut store = PagedStore::new(roots(5));
    store.reported_total = Some(1_000);
    store.report_size = true;
    let service = CategoryService::with_limits(&store, small_pages());

    assert_eq!(service.get_tree(false).unwrap().len(), 5);
    assert_eq!(store.calls.get(), 3);
}

#[test]
fn exact_total_avoids_extra_request() {
    let mut store = PagedStore::new(roots(4));
    store.reported_total = Some(4);
    store.report_size = true;
    let service = CategoryService::with_limits(&store, small_pages());

    assert_eq!(service.get_tree(false).unwrap().len(), 4);
    assert_eq!(store.calls.get(), 2);
}

#[test]
fn empty_page_ends_pagination_without_total() {
    let store = PagedStore::new(roots(4));
    let service = CategoryService::with_limits(&store, small_pages());

    assert_eq!(service.get_tree(false).unwrap().len(), 4);
    assert_eq!(store.calls.get(), 3);
}

#[test]
fn understated_total_truncates_snapshot() {
    let mut store = PagedStore::new(roots(6));
    store.reported_total = Some(2);
    let service = CategoryService::with_limits(&store, small_pages());

    assert_eq!(service.get_tree(false).unwrap().len(), 2);
    assert_eq!(store.calls.get(), 1);
}

#[test]
fn trash_lists_only_deleted_nodes_across_pages() {
    let mut nodes = roots(5);
    nodes[1].deleted_at = Some(1);
    nodes[4].deleted_at = Some(2);
    let store = PagedStore::new(nodes);
    let service = CategoryService::with_limits(&store, small_pages());

    let trash = service.get_trash().unwrap();
    let ids: Vec<i64> = trash.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![2, 5]);

    let tree = service.get_tree(false).unwrap();
    assert_eq!(tree.len(), 3);
}

#[test]
fn root_sibling_scan_pages_and_sorts_by_position() {
    let store = PagedStore::new(vec![
        node(1, None, 3),
        node(2, None, 1),
        node(3, Some(1), 1),
        node(4, None, 2),
    ]);
    let service = CategoryService::with_limits(&store, small_pages());

    let roots = service.list_children(None).unwrap();
    let ids: Vec<i64> = roots.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![2, 4, 1]);
    assert_eq!(store.calls.get(), 3);
}
