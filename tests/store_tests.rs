//! Store-level tests for the guarded user delete: the admin count and the
//! delete run in one transaction, reported through `DeleteOutcome`.

use audiarr::db::{DeleteOutcome, Store};

async fn store() -> Store {
    Store::new("sqlite::memory:")
        .await
        .expect("Failed to open store")
}

#[tokio::test]
async fn deleting_the_only_admin_is_refused() {
    let store = store().await;
    store
        .create_user("root", "unused-hash".to_string(), None, None)
        .await
        .unwrap()
        .unwrap();
    store
        .create_user("carol", "unused-hash".to_string(), None, None)
        .await
        .unwrap()
        .unwrap();

    let outcome = store.delete_user("root").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::LastAdmin);

    // The refused delete left the row untouched.
    let root = store.get_user_by_username("root").await.unwrap().unwrap();
    assert!(root.is_admin);
}

#[tokio::test]
async fn deleting_a_regular_user_succeeds() {
    let store = store().await;
    store
        .create_user("root", "unused-hash".to_string(), None, None)
        .await
        .unwrap()
        .unwrap();
    store
        .create_user("carol", "unused-hash".to_string(), None, None)
        .await
        .unwrap()
        .unwrap();

    let outcome = store.delete_user("carol").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(store.get_user_by_username("carol").await.unwrap().is_none());

    // Once gone, a retry reports the absence rather than erroring.
    let outcome = store.delete_user("carol").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::NotFound);
}

#[tokio::test]
async fn unknown_user_reports_not_found() {
    let store = store().await;
    store
        .create_user("root", "unused-hash".to_string(), None, None)
        .await
        .unwrap()
        .unwrap();

    let outcome = store.delete_user("ghost").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::NotFound);
}
