use postdesk_core::db::open_db_in_memory;
use postdesk_core::{
    Customer, ErrorKind, Filter, Post, RepoError, RepositoryService, TransactionScope,
};
use rusqlite::Connection;

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn assert_constraint_failure(err: &RepoError) {
    assert_eq!(err.kind(), ErrorKind::StoreFailure);
    match err {
        RepoError::Db(db_err) => assert!(db_err.is_constraint_violation(), "{db_err}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn create_then_find_returns_equal_entity_with_new_identity() {
    let conn = open_db_in_memory().unwrap();
    let service = RepositoryService::<Customer>::new(&conn);

    let mut customer = Customer::new("Ada");
    customer.phone = Some("555-0101".to_string());
    let created = service.create(customer.clone()).unwrap();

    assert_ne!(created.customer_id, 0);
    let loaded = service.find_by_id(created.customer_id).unwrap().unwrap();
    assert_eq!(
        loaded,
        Customer {
            customer_id: created.customer_id,
            ..customer
        }
    );
    assert!(conn.is_autocommit());
}

#[test]
fn add_many_rolls_back_whole_batch_on_duplicate_key() {
    let conn = open_db_in_memory().unwrap();
    let service = RepositoryService::<Customer>::new(&conn);
    let existing = service.create(Customer::new("Ada")).unwrap();

    let duplicate = Customer {
        customer_id: existing.customer_id,
        ..Customer::new("Copy")
    };
    let err = service
        .add_many(vec![Customer::new("Grace"), duplicate])
        .unwrap_err();

    assert_constraint_failure(&err);
    assert!(conn.is_autocommit());
    assert_eq!(count_rows(&conn, "customers"), 1);
    assert!(service
        .get_by_where(&Filter::eq("name", "Grace"))
        .unwrap()
        .is_none());
}

#[test]
fn create_with_missing_parent_fails_and_persists_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = RepositoryService::<Post>::new(&conn);

    let err = service.create(Post::new(42, "orphan", "body", 1)).unwrap_err();

    assert_constraint_failure(&err);
    assert_eq!(count_rows(&conn, "posts"), 0);
}

#[test]
fn update_reports_changed_flag_and_validates_target() {
    let conn = open_db_in_memory().unwrap();
    let service = RepositoryService::<Customer>::new(&conn);
    let created = service.create(Customer::new("Ada")).unwrap();

    let same = service.update(created.customer_id, &created).unwrap();
    assert!(!same.changed);

    let mut edited = created.clone();
    edited.email = Some("ada@example.com".to_string());
    let outcome = service.update(created.customer_id, &edited).unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.entity, edited);
    assert_eq!(
        service.find_by_id(created.customer_id).unwrap().unwrap(),
        edited
    );

    let err = service.update(999, &edited).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "customer", id: 999 }));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service.update(0, &edited).unwrap_err();
    assert!(matches!(err, RepoError::InvalidArgument(_)));
}

#[test]
fn failed_update_leaves_row_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let service = RepositoryService::<Customer>::new(&conn);
    let created = service.create(Customer::new("Ada")).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_customer_update BEFORE UPDATE ON customers
         BEGIN
            SELECT RAISE(ABORT, 'customers are read-only');
         END;",
    )
    .unwrap();

    let mut edited = created.clone();
    edited.name = "Renamed".to_string();
    let err = service.update(created.customer_id, &edited).unwrap_err();

    assert_constraint_failure(&err);
    assert!(conn.is_autocommit());
    assert_eq!(
        service.find_by_id(created.customer_id).unwrap().unwrap(),
        created
    );
}

#[test]
fn batch_operations_reject_empty_input() {
    let conn = open_db_in_memory().unwrap();
    let service = RepositoryService::<Post>::new(&conn);

    let err = service.add_many(Vec::new()).unwrap_err();
    assert!(matches!(err, RepoError::InvalidArgument(_)));
    let err = service.delete_many(Vec::new()).unwrap_err();
    assert!(matches!(err, RepoError::InvalidArgument(_)));
    let err = service.delete(Post::default()).unwrap_err();
    assert!(matches!(err, RepoError::InvalidArgument(_)));
    assert!(conn.is_autocommit());
}

#[test]
fn delete_many_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let customer = RepositoryService::<Customer>::new(&conn)
        .create(Customer::new("Ada"))
        .unwrap();
    let service = RepositoryService::<Post>::new(&conn);
    let created = service
        .add_many(vec![
            Post::new(customer.customer_id, "one", "body", 1),
            Post::new(customer.customer_id, "two", "body", 2),
        ])
        .unwrap();

    let missing = Post {
        post_id: 999,
        ..created[1].clone()
    };
    let err = service
        .delete_many(vec![created[0].clone(), missing])
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "post", id: 999 }));
    assert_eq!(count_rows(&conn, "posts"), 2);

    let deleted = service.delete_many(created.clone()).unwrap();
    assert_eq!(deleted, created);
    assert_eq!(count_rows(&conn, "posts"), 0);
}

#[test]
fn mutations_join_an_outer_transaction_without_committing_it() {
    let conn = open_db_in_memory().unwrap();
    let service = RepositoryService::<Customer>::new(&conn);

    let outer = TransactionScope::begin(&conn).unwrap();
    service.create(Customer::new("Ada")).unwrap();
    service
        .add_many(vec![Customer::new("Grace"), Customer::new("Linus")])
        .unwrap();
    assert!(!conn.is_autocommit());
    outer.rollback().unwrap();

    assert_eq!(count_rows(&conn, "customers"), 0);
}

#[test]
fn failed_batch_inside_outer_transaction_leaves_no_partial_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = RepositoryService::<Customer>::new(&conn);
    let ada = service.create(Customer::new("Ada")).unwrap();

    let outer = TransactionScope::begin(&conn).unwrap();
    let mut duplicate = Customer::new("Ada again");
    duplicate.customer_id = ada.customer_id;
    let err = service
        .add_many(vec![Customer::new("Grace"), duplicate])
        .unwrap_err();
    assert_constraint_failure(&err);
    assert!(!conn.is_autocommit());
    outer.commit().unwrap();

    assert_eq!(count_rows(&conn, "customers"), 1);
    assert!(service
        .get_by_where(&Filter::eq("name", "Grace"))
        .unwrap()
        .is_none());
}

#[test]
fn failed_delete_batch_inside_outer_transaction_keeps_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = RepositoryService::<Customer>::new(&conn);
    let ada = service.create(Customer::new("Ada")).unwrap();
    let mut missing = Customer::new("Ghost");
    missing.customer_id = ada.customer_id + 100;

    let outer = TransactionScope::begin(&conn).unwrap();
    let grace = service.create(Customer::new("Grace")).unwrap();
    let err = service.delete_many(vec![ada.clone(), missing]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    outer.commit().unwrap();

    assert_eq!(service.find_by_id(ada.customer_id).unwrap(), Some(ada));
    assert_eq!(service.find_by_id(grace.customer_id).unwrap(), Some(grace));
}

#[test]
fn reads_do_not_open_transactions() {
    let conn = open_db_in_memory().unwrap();
    let service = RepositoryService::<Customer>::new(&conn);
    service.create(Customer::new("Ada")).unwrap();

    let listed = service.get_list_by_where(&Filter::eq("name", "Ada")).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(service.get_all().count().unwrap(), 1);
    assert!(conn.is_autocommit());
}
