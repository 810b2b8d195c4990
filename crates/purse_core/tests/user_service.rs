use purse_core::db::{open_db, open_db_in_memory, StorageGateway};
use purse_core::{
    CreateUserRequest, CredentialHasher, EntityKind, ErrorKind, SearchConditions, ServiceError,
    SqliteUserRepository, UpdateUserRequest, UserService,
};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const BUDGET: Duration = Duration::from_secs(5);

fn service(gateway: &StorageGateway) -> UserService<SqliteUserRepository<'_>> {
    UserService::with_hasher(SqliteUserRepository::new(gateway), CredentialHasher::low_cost())
}

fn request(email: &str) -> CreateUserRequest {
    CreateUserRequest {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: email.to_string(),
        password: "analytical-engine".to_string(),
    }
}

fn email_condition(email: &str) -> SearchConditions {
    SearchConditions::from([("email".to_string(), Some(email.to_string()))])
}

#[test]
fn create_then_get_returns_identical_view() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    let created = service.create_user(&request("Ada@Example.com"), BUDGET).unwrap();
    assert_eq!(created.email, "ada@example.com");

    let loaded = service
        .get_user_by_id(&created.id.to_string(), BUDGET)
        .unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn view_serialization_never_contains_password() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    let created = service.create_user(&request("ada@example.com"), BUDGET).unwrap();
    let json = serde_json::to_value(&created).unwrap();
    let object = json.as_object().unwrap();
    assert!(object.keys().all(|key| !key.contains("password")));
    assert!(!json.to_string().contains("analytical-engine"));
}

#[test]
fn stored_password_is_hashed_and_verifiable() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    let created = service.create_user(&request("ada@example.com"), BUDGET).unwrap();
    let stored: String = gateway
        .connection()
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?1;",
            [created.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert!(stored.starts_with("$argon2id$"));

    let id = created.id.to_string();
    assert!(service.verify_password(&id, "analytical-engine", BUDGET).unwrap());
    assert!(!service.verify_password(&id, "difference-engine", BUDGET).unwrap());
}

#[test]
fn invalid_input_is_rejected_before_storage() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    let cases = [
        CreateUserRequest {
            first_name: "  ".to_string(),
            ..request("a@example.com")
        },
        CreateUserRequest {
            last_name: String::new(),
            ..request("a@example.com")
        },
        request("not-an-email"),
        request(&format!("{}@example.com", "a".repeat(250))),
        CreateUserRequest {
            password: "short".to_string(),
            ..request("a@example.com")
        },
    ];
    for case in &cases {
        let err = service.create_user(case, BUDGET).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "accepted {case:?}");
    }

    let count: i64 = gateway
        .connection()
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn duplicate_email_reports_already_exists_on_email() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    service.create_user(&request("ada@example.com"), BUDGET).unwrap();
    let err = service
        .create_user(&request("ADA@example.com"), BUDGET)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::AlreadyExists { entity: EntityKind::User, ref field } if field == "email"
    ));
}

#[test]
fn concurrent_creates_with_same_email_yield_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    let gateways: Vec<StorageGateway> = (0..2).map(|_| open_db(&path).unwrap()).collect();
    let barrier = Arc::new(Barrier::new(gateways.len()));

    let handles: Vec<_> = gateways
        .into_iter()
        .map(|gateway| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let service = service(&gateway);
                barrier.wait();
                service
                    .create_user(&request("race@example.com"), BUDGET)
                    .map(|view| view.id)
                    .map_err(|err| err.kind())
            })
        })
        .collect();
    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let losers: Vec<_> = outcomes.iter().filter_map(|outcome| outcome.as_ref().err().copied()).collect();
    assert_eq!(winners, 1, "outcomes: {outcomes:?}");
    assert_eq!(losers, vec![ErrorKind::AlreadyExists]);
}

#[test]
fn search_requires_email_and_defaults_to_active_users() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    let err = service
        .search_users(&SearchConditions::new(), BUDGET)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    assert!(service
        .search_users(&email_condition("missing@example.com"), BUDGET)
        .unwrap()
        .is_empty());

    let created = service.create_user(&request("ada@example.com"), BUDGET).unwrap();
    let found = service
        .search_users(&email_condition("ADA@example.com"), BUDGET)
        .unwrap();
    assert_eq!(found, vec![created.clone()]);

    service.delete_user(&created.id.to_string(), BUDGET).unwrap();
    assert!(service
        .search_users(&email_condition("ada@example.com"), BUDGET)
        .unwrap()
        .is_empty());

    let mut deleted = email_condition("ada@example.com");
    deleted.insert("deleted".to_string(), Some("true".to_string()));
    let found = service.search_users(&deleted, BUDGET).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, created.id);
}

#[test]
fn lookup_of_sentinel_and_unknown_ids_is_not_found() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    for id in [
        "0",
        "00000000-0000-0000-0000-000000000000",
        "not-a-uuid",
        "0190f5a4-7b7e-7cc0-8d8e-5a3c6f1e2b44",
    ] {
        let err = service.get_user_by_id(id, BUDGET).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "id {id}");
    }

    let err = service.get_user_by_id("   ", BUDGET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn delete_is_idempotent_and_keeps_first_timestamp() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    let created = service.create_user(&request("ada@example.com"), BUDGET).unwrap();
    let id = created.id.to_string();
    service.delete_user(&id, BUDGET).unwrap();
    let first_deleted_at = deleted_at(&gateway, &id);
    assert!(first_deleted_at.is_some());

    thread::sleep(Duration::from_millis(5));
    service.delete_user(&id, BUDGET).unwrap();
    assert_eq!(deleted_at(&gateway, &id), first_deleted_at);

    let err = service.get_user_by_id(&id, BUDGET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service
        .delete_user("0190f5a4-7b7e-7cc0-8d8e-5a3c6f1e2b44", BUDGET)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn email_is_reusable_after_delete() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    let first = service.create_user(&request("a@x.com"), BUDGET).unwrap();
    service.delete_user(&first.id.to_string(), BUDGET).unwrap();

    let second = service.create_user(&request("a@x.com"), BUDGET).unwrap();
    assert_ne!(first.id, second.id);
}

#[test]
fn update_changes_only_supplied_fields() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    let created = service.create_user(&request("ada@example.com"), BUDGET).unwrap();
    let id = created.id.to_string();
    let updated = service
        .update_user(
            &id,
            &UpdateUserRequest {
                last_name: Some(" King ".to_string()),
                password: Some("new-secret-value".to_string()),
                ..UpdateUserRequest::default()
            },
            BUDGET,
        )
        .unwrap();

    assert_eq!(updated.first_name, "Ada");
    assert_eq!(updated.last_name, "King");
    assert_eq!(updated.email, created.email);
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(service.get_user_by_id(&id, BUDGET).unwrap(), updated);
    assert!(service.verify_password(&id, "new-secret-value", BUDGET).unwrap());
}

#[test]
fn update_rejects_taken_email_and_empty_requests() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    service.create_user(&request("ada@example.com"), BUDGET).unwrap();
    let other = service.create_user(&request("charles@example.com"), BUDGET).unwrap();
    let id = other.id.to_string();

    let err = service
        .update_user(
            &id,
            &UpdateUserRequest {
                email: Some("ada@example.com".to_string()),
                ..UpdateUserRequest::default()
            },
            BUDGET,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = service
        .update_user(&id, &UpdateUserRequest::default(), BUDGET)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn update_of_deleted_user_is_not_found() {
    let gateway = open_db_in_memory().unwrap();
    let service = service(&gateway);

    let created = service.create_user(&request("ada@example.com"), BUDGET).unwrap();
    let id = created.id.to_string();
    service.delete_user(&id, BUDGET).unwrap();

    let err = service
        .update_user(
            &id,
            &UpdateUserRequest {
                first_name: Some("Augusta".to_string()),
                ..UpdateUserRequest::default()
            },
            BUDGET,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

fn deleted_at(gateway: &StorageGateway, id: &str) -> Option<i64> {
    gateway
        .connection()
        .query_row("SELECT deleted_at FROM users WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .unwrap()
}
