use catalog_core::db::open_db_in_memory;
use catalog_core::{
    Category, CategoryService, CategoryServiceError, Patch, SqliteNodeStore, StoreError,
};

fn ids_and_positions(categories: &[Category]) -> Vec<(i64, i64)> {
    categories.iter().map(|c| (c.id, c.position)).collect()
}

#[test]
fn reorder_assigns_dense_positions_in_given_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteNodeStore::try_new(&conn).unwrap();
    let service = CategoryService::new(&store);

    let a = service.create_category(None, "A").unwrap();
    let b = service.create_category(None, "B").unwrap();
    let c = service.create_category(None, "C").unwrap();

    let siblings = service.reorder(None, &[c.id, a.id, b.id]).unwrap();
    assert_eq!(
        ids_and_positions(&siblings),
        vec![(c.id, 1), (a.id, 2), (b.id, 3)]
    );

    let tree = service.get_tree(false).unwrap();
    let names: Vec<&str> = tree.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["C", "A", "B"]);
}

#[test]
fn partial_reorder_keeps_unlisted_siblings_after_listed_ones() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteNodeStore::try_new(&conn).unwrap();
    let service = CategoryService::new(&store);

    let parent = service.create_category(None, "Parent").unwrap();
    let a = service.create_category(Some(parent.id), "A").unwrap();
    let b = service.create_category(Some(parent.id), "B").unwrap();
    let c = service.create_category(Some(parent.id), "C").unwrap();

    let siblings = service.reorder(Some(parent.id), &[c.id]).unwrap();
    assert_eq!(
        ids_and_positions(&siblings),
        vec![(c.id, 1), (a.id, 2), (b.id, 3)]
    );
}

#[test]
fn reorder_rejects_empty_unknown_and_missing_parent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteNodeStore::try_new(&conn).unwrap();
    let service = CategoryService::new(&store);

    let a = service.create_category(None, "A").unwrap();

    assert!(matches!(
        service.reorder(None, &[]),
        Err(CategoryServiceError::EmptyIds("ordered_ids"))
    ));
    assert!(matches!(
        service.reorder(None, &[a.id, 404]),
        Err(CategoryServiceError::Store {
            source: StoreError::InvalidRequest(_),
            ..
        })
    ));
    assert!(matches!(
        service.reorder(Some(9000), &[a.id]),
        Err(CategoryServiceError::ParentNotFound(9000))
    ));
}

#[test]
fn reposition_moves_then_reorders_and_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteNodeStore::try_new(&conn).unwrap();
    let service = CategoryService::new(&store);

    let a = service.create_category(None, "A").unwrap();
    let b = service.create_category(None, "B").unwrap();
    let x = service.create_category(Some(a.id), "X").unwrap();

    let ordered = [a.id, x.id, b.id];
    let first = service.reposition(x.id, Patch::Null, &ordered).unwrap();
    assert_eq!(first.category.id, x.id);
    assert_eq!(first.category.parent_id, None);
    assert_eq!(first.category.position, 2);
    assert_eq!(
        ids_and_positions(&first.siblings),
        vec![(a.id, 1), (x.id, 2), (b.id, 3)]
    );

    let second = service.reposition(x.id, Patch::Null, &ordered).unwrap();
    assert_eq!(
        ids_and_positions(&second.siblings),
        ids_and_positions(&first.siblings)
    );
    assert_eq!(second.category.path, "/x");
}

#[test]
fn reposition_without_parent_only_reorders_current_siblings() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteNodeStore::try_new(&conn).unwrap();
    let service = CategoryService::new(&store);

    let parent = service.create_category(None, "Parent").unwrap();
    let a = service.create_category(Some(parent.id), "A").unwrap();
    let b = service.create_category(Some(parent.id), "B").unwrap();

    let result = service
        .reposition(b.id, Patch::Absent, &[b.id, a.id])
        .unwrap();
    assert_eq!(result.category.parent_id, Some(parent.id));
    assert_eq!(result.category.position, 1);
    assert_eq!(
        ids_and_positions(&result.siblings),
        vec![(b.id, 1), (a.id, 2)]
    );

    let same_parent = service
        .reposition(b.id, Patch::Value(parent.id), &[a.id, b.id])
        .unwrap();
    assert_eq!(same_parent.category.position, 2);
}

#[test]
fn reposition_validates_ordering_before_touching_store() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteNodeStore::try_new(&conn).unwrap();
    let service = CategoryService::new(&store);

    let a = service.create_category(None, "A").unwrap();
    let b = service.create_category(None, "B").unwrap();

    assert!(matches!(
        service.reposition(a.id, Patch::Null, &[]),
        Err(CategoryServiceError::EmptyIds("ordered_ids"))
    ));
    assert!(matches!(
        service.reposition(a.id, Patch::Null, &[b.id]),
        Err(CategoryServiceError::OrderedIdsMissingTarget(id)) if id == a.id
    ));
    assert!(matches!(
        service.reposition(555, Patch::Absent, &[555]),
        Err(CategoryServiceError::NotFound(555))
    ));
}

#[test]
fn reposition_reports_completed_move_when_reorder_fails() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteNodeStore::try_new(&conn).unwrap();
    let service = CategoryService::new(&store);

    let a = service.create_category(None, "A").unwrap();
    let x = service.create_category(Some(a.id), "X").unwrap();

    let err = service
        .reposition(x.id, Patch::Null, &[x.id, 404])
        .unwrap_err();
    let CategoryServiceError::Bulk(failure) = &err else {
        panic!("expected bulk failure, got {err:?}");
    };
    assert_eq!(failure.operation, "reposition");
    assert_eq!(failure.completed, vec![x.id]);
    assert_eq!(failure.failed_id, Some(x.id));
    assert!(matches!(
        failure.source,
        CategoryServiceError::Store {
            source: StoreError::InvalidRequest(_),
            ..
        }
    ));
    assert_eq!(service.get_category(x.id, false).unwrap().parent_id, None);

    let unmoved = service
        .reposition(a.id, Patch::Absent, &[a.id, 404])
        .unwrap_err();
    assert!(matches!(
        unmoved,
        CategoryServiceError::Store {
            source: StoreError::InvalidRequest(_),
            ..
        }
    ));
}
