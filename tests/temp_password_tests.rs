//! Service-level temp-password tests with a simulated clock: every operation
//! takes an explicit `now`, so expiry is exercised without sleeping.

use audiarr::db::Store;
use audiarr::entities::users;
use audiarr::services::error::AuthError;
use audiarr::services::{SecretStore, TempPasswordService};
use chrono::{Duration, Utc};

async fn setup() -> (Store, TempPasswordService, users::Model, users::Model) {
    let store = Store::new("sqlite::memory:")
        .await
        .expect("Failed to open store");
    let secrets = SecretStore::from_key(&[7u8; 32]);
    let service = TempPasswordService::new(store.clone(), secrets);

    let admin = store
        .create_user("root", "unused-hash".to_string(), None, None)
        .await
        .unwrap()
        .unwrap();
    assert!(admin.is_admin);

    let user = store
        .create_user("carol", "unused-hash".to_string(), None, None)
        .await
        .unwrap()
        .unwrap();
    assert!(!user.is_admin);

    (store, service, admin, user)
}

#[tokio::test]
async fn reveal_succeeds_once_then_gone() {
    let (_store, service, admin, _user) = setup().await;
    let now = Utc::now();

    let issued = service.generate(&admin, "carol", 15, now).await.unwrap();
    assert_eq!(issued.expires_at, now + Duration::minutes(15));

    let revealed = service.reveal(&admin, "carol", now).await.unwrap();
    assert_eq!(revealed.temp_password, issued.temp_password);

    match service.reveal(&admin, "carol", now).await {
        Err(AuthError::Gone(_)) => {}
        other => panic!("Expected Gone, got {other:?}"),
    }
}

#[tokio::test]
async fn reveal_after_expiry_is_gone() {
    let (_store, service, admin, _user) = setup().await;
    let now = Utc::now();

    service.generate(&admin, "carol", 10, now).await.unwrap();

    // Just before expiry the reveal would still work; at expiry it is gone.
    let later = now + Duration::minutes(10) + Duration::seconds(1);
    match service.reveal(&admin, "carol", later).await {
        Err(AuthError::Gone(_)) => {}
        other => panic!("Expected Gone, got {other:?}"),
    }

    // The expired record was removed, so a retry is a plain not-found.
    match service.reveal(&admin, "carol", later).await {
        Err(AuthError::NotFound(_)) => {}
        other => panic!("Expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn reveal_without_record_is_not_found() {
    let (_store, service, admin, _user) = setup().await;

    match service.reveal(&admin, "carol", Utc::now()).await {
        Err(AuthError::NotFound(_)) => {}
        other => panic!("Expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn regeneration_supersedes_previous_temp_password() {
    let (_store, service, admin, _user) = setup().await;
    let now = Utc::now();

    let first = service.generate(&admin, "carol", 15, now).await.unwrap();
    let second = service
        .generate(&admin, "carol", 15, now + Duration::minutes(1))
        .await
        .unwrap();
    assert_ne!(first.temp_password, second.temp_password);

    // Only the latest is revealable, and only once.
    let revealed = service
        .reveal(&admin, "carol", now + Duration::minutes(2))
        .await
        .unwrap();
    assert_eq!(revealed.temp_password, second.temp_password);

    // Superseding keeps one row per user.
    let rows = service.list(&admin, now).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn non_admins_are_refused() {
    let (_store, service, _admin, user) = setup().await;
    let now = Utc::now();

    for result in [
        service.generate(&user, "root", 15, now).await.err(),
        service.reveal(&user, "root", now).await.err(),
        service.list(&user, now).await.err(),
    ] {
        match result {
            Some(AuthError::Forbidden(_)) => {}
            other => panic!("Expected Forbidden, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn generate_for_unknown_user_is_not_found() {
    let (_store, service, admin, _user) = setup().await;

    match service.generate(&admin, "nobody", 15, Utc::now()).await {
        Err(AuthError::NotFound(_)) => {}
        other => panic!("Expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn list_computes_status_from_clock() {
    let (_store, service, admin, _user) = setup().await;
    let now = Utc::now();

    service.generate(&admin, "carol", 10, now).await.unwrap();

    let rows = service.list(&admin, now).await.unwrap();
    assert_eq!(rows[0].status, "active");

    let rows = service
        .list(&admin, now + Duration::minutes(11))
        .await
        .unwrap();
    assert_eq!(rows[0].status, "expired");

    service.reveal(&admin, "carol", now).await.unwrap();
    let rows = service.list(&admin, now).await.unwrap();
    assert_eq!(rows[0].status, "revealed");
}

#[tokio::test]
async fn ttl_floor_is_one_minute() {
    let (_store, service, admin, _user) = setup().await;
    let now = Utc::now();

    let issued = service.generate(&admin, "carol", 0, now).await.unwrap();
    assert_eq!(issued.expires_at, now + Duration::minutes(1));
}

#[tokio::test]
async fn audit_trail_records_generate_and_reveal() {
    let (_store, service, admin, _user) = setup().await;
    let now = Utc::now();

    service.generate(&admin, "carol", 15, now).await.unwrap();
    service.reveal(&admin, "carol", now).await.unwrap();

    let entries = service.audit(&admin).await.unwrap();
    assert_eq!(entries.len(), 2);
    // Newest first.
    assert_eq!(entries[0].action, "reveal_temp");
    assert_eq!(entries[1].action, "generate_temp");
    for entry in &entries {
        assert_eq!(entry.username, "carol");
        assert_eq!(entry.actor, "root");
    }
}
