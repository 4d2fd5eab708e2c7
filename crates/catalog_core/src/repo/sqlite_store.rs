//! Embedded SQLite node store.
//!
//! # Responsibility
//! - Implement the `NodeStore` contract over a migrated SQLite connection.
//! - Own path derivation, sibling positions and soft-delete bookkeeping.
//!
//! # Invariants
//! - Active siblings of one parent keep dense positions `1..N` after every write.
//! - Active paths are unique; tombstones may share a path with an active node.
//! - Child listing is deterministic: `position ASC, id ASC`.
//! - Multi-statement writes run in one immediate transaction.

use crate::db::migrations::latest_version;
use crate::model::category::CategoryId;
use crate::model::patch::Patch;
use crate::repo::node_store::{
    Document, ListNodesParams, Node, NodeCreate, NodeReorder, NodeStore, NodeUpdate, NodesPage,
    StoreError, StoreResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;

const NODE_SELECT_SQL: &str = "SELECT
    id,
    name,
    slug,
    path,
    parent_id,
    position,
    created_at,
    updated_at,
    deleted_at
FROM nodes";

const NOW_MS_SQL: &str = "(CAST(strftime('%s', 'now') AS INTEGER) * 1000)";

/// SQLite-backed node store.
pub struct SqliteNodeStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNodeStore<'conn> {
    /// Creates store from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Binds one document to an active node.
    ///
    /// Document content lives elsewhere; the store only keeps the binding used
    /// for dependency counts.
    pub fn bind_document(&self, node_id: CategoryId, title: &str) -> StoreResult<Document> {
        load_node(self.conn, node_id, false)?;
        self.conn.execute(
            "INSERT INTO documents (node_id, title) VALUES (?1, ?2);",
            params![node_id, title],
        )?;
        let id = self.conn.last_insert_rowid();
        let document = self.conn.query_row(
            "SELECT id, node_id, title, created_at FROM documents WHERE id = ?1;",
            [id],
            parse_document_row,
        )?;
        Ok(document)
    }

    /// Soft-deletes one bound document.
    pub fn unbind_document(&self, document_id: i64) -> StoreResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE documents
                 SET deleted_at = {NOW_MS_SQL}
                 WHERE id = ?1
                   AND deleted_at IS NULL;"
            ),
            [document_id],
        )?;
        if changed == 0 {
            return Err(StoreError::InvalidRequest(format!(
                "document {document_id} is not bound"
            )));
        }
        Ok(())
    }
}

impl NodeStore for SqliteNodeStore<'_> {
    fn list_nodes(&self, params: ListNodesParams) -> StoreResult<NodesPage> {
        if params.page == 0 || params.size == 0 {
            return Err(StoreError::InvalidRequest(format!(
                "page and size must be positive, got page={} size={}",
                params.page, params.size
            )));
        }

        let filter = if params.include_deleted {
            ""
        } else {
            " WHERE deleted_at IS NULL"
        };
        let total: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM nodes{filter};"), [], |row| {
                    row.get(0)
                })?;

        let offset = i64::from(params.page - 1) * i64::from(params.size);
        let mut stmt = self.conn.prepare(&format!(
            "{NODE_SELECT_SQL}{filter} ORDER BY id ASC LIMIT ?1 OFFSET ?2;"
        ))?;
        let mut rows = stmt.query(params![i64::from(params.size), offset])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_node_row(row)?);
        }

        Ok(NodesPage {
            page: params.page,
            size: params.size,
            total: u64::try_from(total).unwrap_or_default(),
            items,
        })
    }

    fn get_node(&self, id: CategoryId, include_deleted: bool) -> StoreResult<Node> {
        load_node(self.conn, id, include_deleted)
    }

    fn create_node(&self, body: &NodeCreate) -> StoreResult<Node> {
        if body.name.trim().is_empty() {
            return Err(StoreError::InvalidRequest("name must not be blank".to_string()));
        }
        ensure_valid_slug(&body.slug)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let parent = match body.parent_path.as_deref() {
            Some(parent_path) => Some(load_active_by_path(&tx, parent_path)?),
            None => None,
        };
        let parent_id = parent.as_ref().map(|node| node.id);
        let path = join_path(parent.as_ref().map_or("", |node| node.path.as_str()), &body.slug);
        ensure_path_available(&tx, &path, None)?;

        let position = next_position(&tx, parent_id)?;
        tx.execute(
            "INSERT INTO nodes (name, slug, path, parent_id, position)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![body.name, body.slug, path, parent_id, position],
        )?;
        let node = load_node(&tx, tx.last_insert_rowid(), false)?;
        tx.commit()?;
        Ok(node)
    }

    fn update_node(&self, id: CategoryId, body: &NodeUpdate) -> StoreResult<Node> {
        if let Some(name) = body.name.as_deref() {
            if name.trim().is_empty() {
                return Err(StoreError::InvalidRequest("name must not be blank".to_string()));
            }
        }
        if let Some(slug) = body.slug.as_deref() {
            ensure_valid_slug(slug)?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current = load_node(&tx, id, false)?;

        let (parent_id, parent_prefix) = match &body.parent_path {
            Patch::Absent => (current.parent_id, parent_prefix_of(&current.path).to_string()),
            Patch::Null => (None, String::new()),
            Patch::Value(parent_path) => {
                let parent = load_active_by_path(&tx, parent_path)?;
                if would_create_cycle(&tx, id, parent.id)? {
                    return Err(StoreError::InvalidRequest(format!(
                        "moving node {id} under {} would create a cycle",
                        parent.id
                    )));
                }
                (Some(parent.id), parent.path)
            }
        };

        let name = body.name.as_deref().unwrap_or(&current.name);
        let slug = body.slug.as_deref().unwrap_or(&current.slug);
        let path = join_path(&parent_prefix, slug);
        if path != current.path {
            ensure_path_available(&tx, &path, Some(id))?;
            rewrite_subtree_paths(&tx, id, &current.path, &path)?;
        }

        if parent_id != current.parent_id {
            let position = next_position(&tx, parent_id)?;
            tx.execute(
                &format!(
                    "UPDATE nodes
                     SET parent_id = ?2,
                         position = ?3,
                         updated_at = {NOW_MS_SQL}
                     WHERE id = ?1;"
                ),
                params![id, parent_id, position],
            )?;
            compact_siblings(&tx, current.parent_id)?;
        }

        tx.execute(
            &format!(
                "UPDATE nodes
                 SET name = ?2,
                     slug = ?3,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![id, name, slug],
        )?;

        let node = load_node(&tx, id, false)?;
        tx.commit()?;
        Ok(node)
    }

    fn delete_node(&self, id: CategoryId) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current = load_node(&tx, id, false)?;
        tx.execute(
            &format!(
                "UPDATE nodes
                 SET deleted_at = {NOW_MS_SQL},
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            [id],
        )?;
        compact_siblings(&tx, current.parent_id)?;
        tx.commit()?;
        Ok(())
    }

    fn restore_node(&self, id: CategoryId) -> StoreResult<Node> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current = load_node(&tx, id, true)?;
        if !current.is_deleted() {
            return Ok(current);
        }

        ensure_path_available(&tx, &current.path, Some(id))?;
        let position = next_position(&tx, current.parent_id)?;
        tx.execute(
            &format!(
                "UPDATE nodes
                 SET deleted_at = NULL,
                     position = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![id, position],
        )?;
        let node = load_node(&tx, id, false)?;
        tx.commit()?;
        Ok(node)
    }

    fn purge_node(&self, id: CategoryId) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current = load_node(&tx, id, true)?;
        // Subtree rows and bound documents go through ON DELETE CASCADE.
        tx.execute("DELETE FROM nodes WHERE id = ?1;", [id])?;
        if !current.is_deleted() {
            compact_siblings(&tx, current.parent_id)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_children(&self, id: CategoryId) -> StoreResult<Vec<Node>> {
        load_node(self.conn, id, true)?;
        list_active_children(self.conn, Some(id))
    }

    fn has_children(&self, id: CategoryId) -> StoreResult<bool> {
        load_node(self.conn, id, true)?;
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM nodes
                WHERE parent_id = ?1
                  AND deleted_at IS NULL
            );",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn reorder_nodes(&self, payload: &NodeReorder) -> StoreResult<Vec<Node>> {
        if payload.ordered_ids.is_empty() {
            return Err(StoreError::InvalidRequest("ordered_ids must not be empty".to_string()));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if let Some(parent_id) = payload.parent_id {
            load_node(&tx, parent_id, false)?;
        }

        let sibling_ids = list_active_child_ids(&tx, payload.parent_id)?;
        let sibling_set: HashSet<CategoryId> = sibling_ids.iter().copied().collect();
        let mut listed = HashSet::with_capacity(payload.ordered_ids.len());
        for id in &payload.ordered_ids {
            if !sibling_set.contains(id) {
                return Err(StoreError::InvalidRequest(format!(
                    "node {id} is not an active child of parent {}",
                    describe_parent(payload.parent_id)
                )));
            }
            if !listed.insert(*id) {
                return Err(StoreError::InvalidRequest(format!(
                    "node {id} listed more than once"
                )));
            }
        }

        let mut final_order = payload.ordered_ids.clone();
        final_order.extend(sibling_ids.into_iter().filter(|id| !listed.contains(id)));
        write_positions(&tx, &final_order)?;

        let siblings = list_active_children(&tx, payload.parent_id)?;
        tx.commit()?;
        Ok(siblings)
    }

    fn list_node_documents(
        &self,
        id: CategoryId,
        include_descendants: bool,
    ) -> StoreResult<Vec<Document>> {
        load_node(self.conn, id, true)?;
        let sql = if include_descendants {
            "WITH RECURSIVE subtree(id) AS (
                SELECT id
                FROM nodes
                WHERE id = ?1
                UNION ALL
                SELECT child.id
                FROM nodes child
                INNER JOIN subtree parent ON child.parent_id = parent.id
                WHERE child.deleted_at IS NULL
            )
            SELECT id, node_id, title, created_at
            FROM documents
            WHERE node_id IN (SELECT id FROM subtree)
              AND deleted_at IS NULL
            ORDER BY id ASC;"
        } else {
            "SELECT id, node_id, title, created_at
             FROM documents
             WHERE node_id = ?1
               AND deleted_at IS NULL
             ORDER BY id ASC;"
        };

        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([id])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }
}

fn load_node(conn: &Connection, id: CategoryId, include_deleted: bool) -> StoreResult<Node> {
    let sql = if include_deleted {
        format!("{NODE_SELECT_SQL} WHERE id = ?1;")
    } else {
        format!("{NODE_SELECT_SQL} WHERE id = ?1 AND deleted_at IS NULL;")
    };
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return parse_node_row(row);
    }
    Err(StoreError::NodeNotFound(id))
}

fn load_active_by_path(conn: &Connection, path: &str) -> StoreResult<Node> {
    let mut stmt = conn.prepare(&format!(
        "{NODE_SELECT_SQL} WHERE path = ?1 AND deleted_at IS NULL;"
    ))?;
    let mut rows = stmt.query([path])?;
    if let Some(row) = rows.next()? {
        return parse_node_row(row);
    }
    Err(StoreError::PathNotFound(path.to_string()))
}

fn ensure_path_available(
    conn: &Connection,
    path: &str,
    exclude_id: Option<CategoryId>,
) -> StoreResult<()> {
    let holder: Option<CategoryId> = conn
        .query_row(
            "SELECT id
             FROM nodes
             WHERE path = ?1
               AND deleted_at IS NULL
             LIMIT 1;",
            [path],
            |row| row.get(0),
        )
        .optional()?;
    match holder {
        Some(holder) if Some(holder) != exclude_id => Err(StoreError::Conflict(path.to_string())),
        _ => Ok(()),
    }
}

fn ensure_valid_slug(slug: &str) -> StoreResult<()> {
    if slug.is_empty() || slug.contains('/') {
        return Err(StoreError::InvalidRequest(format!("invalid slug `{slug}`")));
    }
    Ok(())
}

fn list_active_child_ids(
    conn: &Connection,
    parent_id: Option<CategoryId>,
) -> StoreResult<Vec<CategoryId>> {
    Ok(list_active_children(conn, parent_id)?
        .into_iter()
        .map(|node| node.id)
        .collect())
}

fn list_active_children(
    conn: &Connection,
    parent_id: Option<CategoryId>,
) -> StoreResult<Vec<Node>> {
    let mut items = Vec::new();
    match parent_id {
        Some(parent_id) => {
            let mut stmt = conn.prepare(&format!(
                "{NODE_SELECT_SQL}
                 WHERE parent_id = ?1
                   AND deleted_at IS NULL
                 ORDER BY position ASC, id ASC;"
            ))?;
            let mut rows = stmt.query([parent_id])?;
            while let Some(row) = rows.next()? {
                items.push(parse_node_row(row)?);
            }
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "{NODE_SELECT_SQL}
                 WHERE parent_id IS NULL
                   AND deleted_at IS NULL
                 ORDER BY position ASC, id ASC;"
            ))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                items.push(parse_node_row(row)?);
            }
        }
    }
    Ok(items)
}

fn next_position(conn: &Connection, parent_id: Option<CategoryId>) -> StoreResult<i64> {
    let next = match parent_id {
        Some(parent_id) => conn.query_row(
            "SELECT COALESCE(MAX(position), 0) + 1
             FROM nodes
             WHERE parent_id = ?1
               AND deleted_at IS NULL;",
            [parent_id],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COALESCE(MAX(position), 0) + 1
             FROM nodes
             WHERE parent_id IS NULL
               AND deleted_at IS NULL;",
            [],
            |row| row.get(0),
        )?,
    };
    Ok(next)
}

fn compact_siblings(conn: &Connection, parent_id: Option<CategoryId>) -> StoreResult<()> {
    let ids = list_active_child_ids(conn, parent_id)?;
    write_positions(conn, &ids)
}

fn write_positions(conn: &Connection, ordered_ids: &[CategoryId]) -> StoreResult<()> {
    for (index, id) in ordered_ids.iter().enumerate() {
        let position = i64::try_from(index + 1)
            .map_err(|_| StoreError::InvalidRequest("too many siblings".to_string()))?;
        conn.execute(
            &format!(
                "UPDATE nodes
                 SET position = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1
                   AND position <> ?2;"
            ),
            params![id, position],
        )?;
    }
    Ok(())
}

fn rewrite_subtree_paths(
    conn: &Connection,
    id: CategoryId,
    old_path: &str,
    new_path: &str,
) -> StoreResult<()> {
    conn.execute(
        &format!(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id
                FROM nodes
                WHERE id = ?1
                UNION ALL
                SELECT child.id
                FROM nodes child
                INNER JOIN subtree parent ON child.parent_id = parent.id
            )
            UPDATE nodes
            SET path = ?3 || substr(path, length(?2) + 1),
                updated_at = {NOW_MS_SQL}
            WHERE id IN (SELECT id FROM subtree);"
        ),
        params![id, old_path, new_path],
    )?;
    Ok(())
}

fn would_create_cycle(
    conn: &Connection,
    node_id: CategoryId,
    candidate_parent_id: CategoryId,
) -> StoreResult<bool> {
    let mut visited = HashSet::new();
    let mut cursor = Some(candidate_parent_id);
    while let Some(current) = cursor {
        if current == node_id || !visited.insert(current) {
            return Ok(true);
        }
        cursor = load_node(conn, current, true)?.parent_id;
    }
    Ok(false)
}

fn parent_prefix_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(prefix, _)| prefix)
}

fn join_path(parent_path: &str, slug: &str) -> String {
    format!("{parent_path}/{slug}")
}

fn describe_parent(parent_id: Option<CategoryId>) -> String {
    parent_id.map_or_else(|| "root".to_string(), |id| id.to_string())
}

fn parse_node_row(row: &Row<'_>) -> StoreResult<Node> {
    let position: i64 = row.get("position")?;
    if position < 1 {
        return Err(StoreError::InvalidData(format!(
            "invalid position `{position}` in nodes.position"
        )));
    }

    Ok(Node {
        id: row.get("id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        path: row.get("path")?,
        parent_id: row.get("parent_id")?,
        position,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

fn parse_document_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        node_id: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::InvalidData(format!(
            "node store requires schema version {expected_version}, got {actual_version}"
        )));
    }

    for (table, columns) in [
        (
            "nodes",
            &[
                "id",
                "name",
                "slug",
                "path",
                "parent_id",
                "position",
                "created_at",
                "updated_at",
                "deleted_at",
            ][..],
        ),
        (
            "documents",
            &["id", "node_id", "title", "created_at", "deleted_at"][..],
        ),
    ] {
        let present = table_columns(conn, table)?;
        if present.is_empty() {
            return Err(StoreError::InvalidData(format!(
                "node store requires table `{table}`"
            )));
        }
        if let Some(missing) = columns.iter().find(|column| !present.contains(**column)) {
            return Err(StoreError::InvalidData(format!(
                "node store requires column `{missing}` in table `{table}`"
            )));
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> StoreResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = HashSet::new();
    while let Some(row) = rows.next()? {
        columns.insert(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::{join_path, parent_prefix_of};

    #[test]
    fn parent_prefix_strips_last_segment() {
        assert_eq!(parent_prefix_of("/math"), "");
        assert_eq!(parent_prefix_of("/math/algebra"), "/math");
    }

    #[test]
    fn join_path_builds_root_and_nested_paths() {
        assert_eq!(join_path("", "math"), "/math");
        assert_eq!(join_path("/math", "algebra"), "/math/algebra");
    }
}
