use postdesk_core::db::open_db_in_memory;
use postdesk_core::{
    Customer, CustomerService, CustomerServiceError, ErrorKind, Post, PostService, RepoError,
};
use rusqlite::Connection;

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn seed_posts(conn: &Connection, customer: &Customer, count: usize) -> Vec<Post> {
    let posts = (0..count)
        .map(|index| Post::new(customer.customer_id, format!("post {index}"), "body", 1))
        .collect();
    PostService::new(conn).create_multiple_posts(posts).unwrap()
}

#[test]
fn delete_customer_with_posts_removes_customer_and_only_its_posts() {
    let conn = open_db_in_memory().unwrap();
    let service = CustomerService::new(&conn);
    let target = service.create_customer(Customer::new("Ada")).unwrap();
    let bystander = service.create_customer(Customer::new("Grace")).unwrap();
    seed_posts(&conn, &target, 3);
    let kept = seed_posts(&conn, &bystander, 2);

    let deleted = service
        .delete_customer_with_posts(target.customer_id)
        .unwrap();

    assert_eq!(deleted, target);
    assert!(service.find_customer(target.customer_id).unwrap().is_none());
    let posts = PostService::new(&conn);
    assert!(posts.posts_for_customer(target.customer_id).unwrap().is_empty());
    assert_eq!(posts.list_posts().unwrap(), kept);
    assert!(conn.is_autocommit());
}

#[test]
fn delete_customer_without_posts_succeeds() {
    let conn = open_db_in_memory().unwrap();
    let service = CustomerService::new(&conn);
    let customer = service.create_customer(Customer::new("Ada")).unwrap();

    service
        .delete_customer_with_posts(customer.customer_id)
        .unwrap();

    assert_eq!(count_rows(&conn, "customers"), 0);
}

#[test]
fn delete_missing_customer_is_validation_error_and_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = CustomerService::new(&conn);
    let customer = service.create_customer(Customer::new("Ada")).unwrap();
    seed_posts(&conn, &customer, 2);

    let err = service.delete_customer_with_posts(999).unwrap_err();
    assert!(matches!(err, CustomerServiceError::CustomerNotFound(999)));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = service.delete_customer_with_posts(0).unwrap_err();
    assert!(matches!(err, CustomerServiceError::CustomerNotFound(0)));

    assert_eq!(count_rows(&conn, "customers"), 1);
    assert_eq!(count_rows(&conn, "posts"), 2);
    assert!(conn.is_autocommit());
}

#[test]
fn failed_customer_delete_restores_deleted_posts() {
    let conn = open_db_in_memory().unwrap();
    let service = CustomerService::new(&conn);
    let customer = service.create_customer(Customer::new("Ada")).unwrap();
    seed_posts(&conn, &customer, 4);
    conn.execute_batch(
        "CREATE TRIGGER keep_customers BEFORE DELETE ON customers
         BEGIN
            SELECT RAISE(ABORT, 'customers cannot be deleted');
         END;",
    )
    .unwrap();

    let err = service
        .delete_customer_with_posts(customer.customer_id)
        .unwrap_err();

    assert!(matches!(err, CustomerServiceError::Repo(RepoError::Db(_))));
    assert_eq!(err.kind(), ErrorKind::StoreFailure);
    assert_eq!(count_rows(&conn, "posts"), 4);
    assert_eq!(count_rows(&conn, "customers"), 1);
    assert!(conn.is_autocommit());
}

#[test]
fn create_customer_enforces_unique_trimmed_names() {
    let conn = open_db_in_memory().unwrap();
    let service = CustomerService::new(&conn);

    let created = service.create_customer(Customer::new("  Ada ")).unwrap();
    assert_eq!(created.name, "Ada");

    let err = service.create_customer(Customer::new("Ada")).unwrap_err();
    assert!(matches!(err, CustomerServiceError::DuplicateName(ref name) if name == "Ada"));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = service.create_customer(Customer::new("   ")).unwrap_err();
    assert!(matches!(err, CustomerServiceError::BlankName));
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    assert_eq!(service.list_customers().unwrap(), vec![created]);
}

#[test]
fn update_customer_checks_names_against_other_customers() {
    let conn = open_db_in_memory().unwrap();
    let service = CustomerService::new(&conn);
    let ada = service.create_customer(Customer::new("Ada")).unwrap();
    service.create_customer(Customer::new("Grace")).unwrap();

    let same = service.update_customer(ada.customer_id, ada.clone()).unwrap();
    assert!(!same.changed);

    let mut renamed = ada.clone();
    renamed.name = "Grace".to_string();
    let err = service
        .update_customer(ada.customer_id, renamed)
        .unwrap_err();
    assert!(matches!(err, CustomerServiceError::DuplicateName(_)));

    let mut edited = ada.clone();
    edited.email = Some("ada@example.com".to_string());
    let outcome = service
        .update_customer(ada.customer_id, edited.clone())
        .unwrap();
    assert!(outcome.changed);
    assert_eq!(
        service.find_customer(ada.customer_id).unwrap(),
        Some(edited.clone())
    );

    let err = service.update_customer(999, edited).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(conn.is_autocommit());
}
