//! Integration tests for the one-step linking flow: profile auto-creation,
//! upsert-by-remote-identity, and the progress reset on re-link.

mod test_utils;

use alertsync::error::Error;
use alertsync::models::alert_binding::{BindingStatus, SyncState, ValidationStatus};
use alertsync::models::query_profile;
use alertsync::repositories::alert_binding::{LinkRemoteAlert, SyncMode};
use alertsync::repositories::{Actor, AlertBindingRepository, AuditRepository};
use sea_orm::EntityTrait;
use uuid::Uuid;

use test_utils::{remote_alert, setup_test_db, validation_valid, validation_unknown};

fn link_input(remote_alert_id: &str, alias: Option<&str>) -> LinkRemoteAlert {
    LinkRemoteAlert {
        remote_alert_id: remote_alert_id.to_string(),
        alias: alias.map(str::to_string),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_link_creates_profile_and_binding() {
    let db = setup_test_db().await.expect("setup db");
    let repo = AlertBindingRepository::new(db.clone());

    let binding = repo
        .link_remote_alert(
            &Actor::system(),
            link_input("A1", Some("Brand Watch")),
            &validation_valid("A1"),
        )
        .await
        .expect("link");

    assert_eq!(binding.remote_alert_id, "A1");
    assert_eq!(binding.status, BindingStatus::Active);
    assert_eq!(binding.sync_state, SyncState::PendingBackfill);
    assert_eq!(binding.validation_status, ValidationStatus::Valid);

    // Provider name travels in the metadata bag.
    let metadata = binding.metadata.expect("metadata");
    assert_eq!(
        metadata.get("linked_alert_name").and_then(|v| v.as_str()),
        Some("Alert A1")
    );

    // The auto-created profile takes the alias as its name.
    let profile = query_profile::Entity::find_by_id(binding.profile_id)
        .one(&db)
        .await
        .expect("query")
        .expect("profile");
    assert_eq!(profile.name, "Brand Watch");
}

#[tokio::test]
async fn test_link_without_alias_uses_remote_alert_name() {
    let db = setup_test_db().await.expect("setup db");
    let repo = AlertBindingRepository::new(db.clone());

    let binding = repo
        .link_remote_alert(
            &Actor::system(),
            link_input("A1", None),
            &validation_valid("A1"),
        )
        .await
        .expect("link");

    let profile = query_profile::Entity::find_by_id(binding.profile_id)
        .one(&db)
        .await
        .expect("query")
        .expect("profile");
    assert_eq!(profile.name, "Alert A1");
}

#[tokio::test]
async fn test_relink_reuses_binding_and_resets_progress() {
    let db = setup_test_db().await.expect("setup db");
    let repo = AlertBindingRepository::new(db.clone());
    let actor = Actor::system();

    let binding = repo
        .link_remote_alert(
            &actor,
            link_input("A1", Some("Brand Watch")),
            &validation_valid("A1"),
        )
        .await
        .expect("link");

    // Make some sync progress so the reset is observable.
    repo.mark_sync_started(&actor, binding.id, SyncMode::Historical)
        .await
        .expect("start backfill");
    repo.mark_historical_completed(&actor, binding.id, None)
        .await
        .expect("complete backfill");

    let relinked = repo
        .link_remote_alert(
            &actor,
            link_input("A1", Some("Another Alias")),
            &validation_valid("A1"),
        )
        .await
        .expect("re-link");

    assert_eq!(relinked.id, binding.id);
    assert_eq!(relinked.sync_state, SyncState::PendingBackfill);
    assert!(relinked.backfill_started_at.is_none());
    assert!(relinked.backfill_completed_at.is_none());
    assert!(relinked.backfill_cursor.is_none());
    assert!(relinked.last_sync_at.is_none());

    // Still exactly one profile, the one from the original link.
    assert_eq!(relinked.profile_id, binding.profile_id);
    let profiles = query_profile::Entity::find()
        .all(&db)
        .await
        .expect("profiles");
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].name, "Brand Watch");
}

#[tokio::test]
async fn test_relink_can_change_status_and_connector() {
    let db = setup_test_db().await.expect("setup db");
    let repo = AlertBindingRepository::new(db);
    let actor = Actor::system();

    repo.link_remote_alert(&actor, link_input("A1", None), &validation_valid("A1"))
        .await
        .expect("link");

    let connector_id = Uuid::new_v4();
    let relinked = repo
        .link_remote_alert(
            &actor,
            LinkRemoteAlert {
                connector_id: Some(connector_id),
                status: Some(BindingStatus::Paused),
                ..link_input("A1", None)
            },
            &validation_valid("A1"),
        )
        .await
        .expect("re-link");

    assert_eq!(relinked.connector_id, Some(connector_id));
    assert_eq!(relinked.status, BindingStatus::Paused);
    assert_eq!(relinked.sync_state, SyncState::Paused);
}

#[tokio::test]
async fn test_link_definitively_absent_alert_is_not_found() {
    let db = setup_test_db().await.expect("setup db");
    let repo = AlertBindingRepository::new(db.clone());

    let mut validation = validation_unknown();
    validation.status = ValidationStatus::Invalid;
    validation.error = Some("remote alert 'ghost' was not found at the provider".to_string());
    validation.checked_at = Some(chrono::Utc::now().fixed_offset());
    validation.found = Some(false);

    let err = repo
        .link_remote_alert(&Actor::system(), link_input("ghost", None), &validation)
        .await
        .expect_err("absent alert must not link");
    assert!(matches!(err, Error::NotFound(_)));

    // Nothing was created.
    let profiles = query_profile::Entity::find()
        .all(&db)
        .await
        .expect("profiles");
    assert!(profiles.is_empty());
}

#[tokio::test]
async fn test_link_with_unknown_validation_links_softly() {
    let db = setup_test_db().await.expect("setup db");
    let repo = AlertBindingRepository::new(db.clone());

    let binding = repo
        .link_remote_alert(
            &Actor::system(),
            link_input("A1", Some("Brand Watch")),
            &validation_unknown(),
        )
        .await
        .expect("unknown validation still links");

    assert_eq!(binding.validation_status, ValidationStatus::Unknown);
    assert!(binding.last_validated_at.is_none());
    assert_eq!(binding.sync_state, SyncState::PendingBackfill);
}

#[tokio::test]
async fn test_inactive_alert_links_with_invalid_status() {
    let db = setup_test_db().await.expect("setup db");
    let repo = AlertBindingRepository::new(db);

    let mut validation = validation_unknown();
    validation.status = ValidationStatus::Invalid;
    validation.error = Some("remote alert 'A1' exists but is inactive".to_string());
    validation.checked_at = Some(chrono::Utc::now().fixed_offset());
    validation.alert = Some(remote_alert("A1", false));
    validation.found = Some(true);

    let binding = repo
        .link_remote_alert(&Actor::system(), link_input("A1", None), &validation)
        .await
        .expect("inactive alert still links");

    assert_eq!(binding.validation_status, ValidationStatus::Invalid);
    assert!(binding.last_validation_error.is_some());
}

#[tokio::test]
async fn test_link_audit_trail() {
    let db = setup_test_db().await.expect("setup db");
    let repo = AlertBindingRepository::new(db.clone());
    let audit = AuditRepository::new(db);
    let actor = Actor::user(Uuid::new_v4());

    let binding = repo
        .link_remote_alert(
            &actor,
            link_input("A1", Some("Brand Watch")),
            &validation_valid("A1"),
        )
        .await
        .expect("link");
    repo.link_remote_alert(&actor, link_input("A1", None), &validation_valid("A1"))
        .await
        .expect("re-link");

    let binding_entries = audit
        .list_for_resource("alert_binding", binding.id, 10)
        .await
        .expect("binding entries");
    assert_eq!(binding_entries.len(), 2);
    assert!(binding_entries.iter().all(|e| e.action == "binding.link"));

    let profile_entries = audit
        .list_for_resource("query_profile", binding.profile_id, 10)
        .await
        .expect("profile entries");
    assert_eq!(profile_entries.len(), 1);
    assert_eq!(profile_entries[0].action, "query_profile.create");
}
