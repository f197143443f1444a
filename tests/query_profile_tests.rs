//! Integration tests for the query profile repository.

mod test_utils;

use alertsync::error::Error;
use alertsync::models::query_profile::ProfileStatus;
use alertsync::repositories::query_profile::{CreateQueryProfile, UpdateQueryProfile};
use alertsync::repositories::{Actor, AuditRepository, QueryProfileRepository};
use uuid::Uuid;

use test_utils::setup_test_db;

fn create_input(name: &str) -> CreateQueryProfile {
    CreateQueryProfile {
        name: name.to_string(),
        query_text: "brand OR product".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_trims_and_defaults_to_active() {
    let db = setup_test_db().await.expect("setup db");
    let repo = QueryProfileRepository::new(db);

    let profile = repo
        .create(&Actor::system(), create_input("  Brand Monitoring  "))
        .await
        .expect("create");

    assert_eq!(profile.name, "Brand Monitoring");
    assert_eq!(profile.status, ProfileStatus::Active);
}

#[tokio::test]
async fn test_create_rejects_blank_fields() {
    let db = setup_test_db().await.expect("setup db");
    let repo = QueryProfileRepository::new(db);

    let err = repo
        .create(&Actor::system(), create_input("   "))
        .await
        .expect_err("blank name must fail");
    assert!(matches!(err, Error::Validation(_)));

    let err = repo
        .create(
            &Actor::system(),
            CreateQueryProfile {
                name: "Brand".to_string(),
                query_text: "  ".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect_err("blank query text must fail");
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_update_patches_fields_and_audits() {
    let db = setup_test_db().await.expect("setup db");
    let repo = QueryProfileRepository::new(db.clone());
    let audit = AuditRepository::new(db);
    let actor = Actor::user(Uuid::new_v4());

    let profile = repo
        .create(&actor, create_input("Brand"))
        .await
        .expect("create");

    let updated = repo
        .update(
            &actor,
            profile.id,
            UpdateQueryProfile {
                name: Some("Brand v2".to_string()),
                status: Some(ProfileStatus::Paused),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(updated.name, "Brand v2");
    assert_eq!(updated.status, ProfileStatus::Paused);
    // Untouched fields survive.
    assert_eq!(updated.query_text, profile.query_text);

    let entries = audit
        .list_for_resource("query_profile", profile.id, 10)
        .await
        .expect("audit entries");
    assert_eq!(entries.len(), 2);
    let update_entry = entries
        .iter()
        .find(|e| e.action == "query_profile.update")
        .expect("update entry");
    assert!(update_entry.snapshot_before.is_some());
    assert!(update_entry.snapshot_after.is_some());
    assert_eq!(update_entry.actor_user_id, actor.user_id);
}

#[tokio::test]
async fn test_empty_patch_is_conflict() {
    let db = setup_test_db().await.expect("setup db");
    let repo = QueryProfileRepository::new(db);
    let actor = Actor::system();

    let profile = repo
        .create(&actor, create_input("Brand"))
        .await
        .expect("create");

    let err = repo
        .update(&actor, profile.id, UpdateQueryProfile::default())
        .await
        .expect_err("empty patch must fail");
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let db = setup_test_db().await.expect("setup db");
    let repo = QueryProfileRepository::new(db);
    let actor = Actor::system();

    let a = repo.create(&actor, create_input("A")).await.expect("a");
    repo.create(&actor, create_input("B")).await.expect("b");

    repo.update(
        &actor,
        a.id,
        UpdateQueryProfile {
            status: Some(ProfileStatus::Archived),
            ..Default::default()
        },
    )
    .await
    .expect("archive");

    let active = repo
        .list(Some(ProfileStatus::Active), 10, 0)
        .await
        .expect("active list");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "B");

    let all = repo.list(None, 10, 0).await.expect("all");
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_get_unknown_profile_is_not_found() {
    let db = setup_test_db().await.expect("setup db");
    let repo = QueryProfileRepository::new(db);

    let err = repo.get(Uuid::new_v4()).await.expect_err("must fail");
    assert!(matches!(err, Error::NotFound(_)));
}
