//! Storage layer tests for the Cellar server.

use std::collections::BTreeMap;

use super::db::CellarDatabase;
use super::models::BottleStatus;
use super::queries_cellar::{BottleParams, DrinkLogParams};
use super::queries_tasting::{EntryScore, NewEntry, NewSession, SessionUpdate};
use cellar_core::db::{DatabaseError, unix_timestamp};

async fn test_db() -> CellarDatabase {
    CellarDatabase::open_in_memory().await.unwrap()
}

async fn db_with_user() -> CellarDatabase {
    let db = test_db().await;
    db.create_user("u1", "alice@example.com", "hash123", "Alice")
        .await
        .unwrap();
    db
}

fn bottle(name: &str) -> BottleParams {
    BottleParams {
        name: name.to_string(),
        country: "France".to_string(),
        price_cents: Some(2500),
        ..BottleParams::default()
    }
}

async fn session_with_entry(db: &CellarDatabase) -> (String, String) {
    db.create_session(
        "s1",
        "u1",
        &NewSession {
            name: "Friday flight".into(),
            occurred_at: unix_timestamp(),
            ..NewSession::default()
        },
    )
    .await
    .unwrap();
    let entry = NewEntry {
        ad_hoc_name: Some("Wine A".into()),
        ..NewEntry::default()
    };
    db.create_entry("e1", "s1", &entry, &EntryScore::default())
        .await
        .unwrap();
    ("s1".into(), "e1".into())
}

// === User tests ===

#[tokio::test]
async fn create_and_get_user() {
    let db = test_db().await;
    let user = db
        .create_user("u1", "alice@example.com", "hash123", "Alice")
        .await
        .unwrap();

    assert_eq!(user.id, "u1");
    assert_eq!(user.default_currency, "EUR");
    assert_eq!(user.beverage_type, "wine");

    let found = db.get_user_by_email("alice@example.com").await.unwrap();
    assert_eq!(found.unwrap().id, "u1");
    assert!(db.get_user_by_email("bob@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_conflict() {
    let db = db_with_user().await;
    let err = db
        .create_user("u2", "alice@example.com", "other", "Alice 2")
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn update_profile_keeps_unset_fields() {
    let db = db_with_user().await;
    let user = db
        .update_user_profile("u1", None, Some("USD"), Some("beer"))
        .await
        .unwrap();
    assert_eq!(user.display_name, "Alice");
    assert_eq!(user.default_currency, "USD");
    assert_eq!(user.beverage_type, "beer");

    assert!(db
        .update_user_profile("nobody", Some("x"), None, None)
        .await
        .is_err());
}

// === Location tests ===

#[tokio::test]
async fn location_lifecycle() {
    let db = db_with_user().await;
    db.create_location("l1", "u1", "Basement").await.unwrap();
    db.create_location("l2", "u1", "attic").await.unwrap();

    let names: Vec<_> = db
        .list_locations("u1")
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.name)
        .collect();
    assert_eq!(names, ["attic", "Basement"]);

    let renamed = db.rename_location("u1", "l1", "Cellar").await.unwrap();
    assert_eq!(renamed.name, "Cellar");

    assert!(db.delete_location("u1", "l2").await.unwrap());
    assert!(!db.delete_location("u1", "l2").await.unwrap());
}

#[tokio::test]
async fn duplicate_location_name_is_conflict() {
    let db = db_with_user().await;
    db.create_location("l1", "u1", "Basement").await.unwrap();
    let err = db.create_location("l2", "u1", "Basement").await.unwrap_err();
    assert!(matches!(err, DatabaseError::Conflict(_)));
}

#[tokio::test]
async fn deleting_location_clears_bottle_reference() {
    let db = db_with_user().await;
    db.create_location("l1", "u1", "Basement").await.unwrap();
    let params = BottleParams {
        location_id: Some("l1".into()),
        ..bottle("Chablis")
    };
    db.create_bottle("b1", "u1", &params, 2, "in_cellar")
        .await
        .unwrap();

    db.delete_location("u1", "l1").await.unwrap();
    let b = db.get_bottle("u1", "b1").await.unwrap();
    assert!(b.location_id.is_none());
}

// === Bottle tests ===

#[tokio::test]
async fn bottles_are_scoped_to_owner() {
    let db = db_with_user().await;
    db.create_user("u2", "bob@example.com", "hash", "Bob")
        .await
        .unwrap();
    db.create_bottle("b1", "u1", &bottle("Barolo"), 1, "in_cellar")
        .await
        .unwrap();

    assert!(db.get_bottle("u1", "b1").await.is_ok());
    assert!(matches!(
        db.get_bottle("u2", "b1").await,
        Err(DatabaseError::NotFound(_))
    ));
    assert!(!db.delete_bottle("u2", "b1").await.unwrap());
}

#[tokio::test]
async fn list_bottles_filters_by_status_and_location() {
    let db = db_with_user().await;
    db.create_location("l1", "u1", "Rack").await.unwrap();
    let racked = BottleParams {
        location_id: Some("l1".into()),
        ..bottle("Rioja")
    };
    db.create_bottle("b1", "u1", &racked, 1, "in_cellar")
        .await
        .unwrap();
    db.create_bottle("b2", "u1", &bottle("Port"), 1, "in_cellar")
        .await
        .unwrap();
    db.set_bottle_state("u1", "b2", "archived", 1).await.unwrap();

    let all = db.list_bottles("u1", None, None, 50, 0).await.unwrap();
    assert_eq!(all.len(), 2);

    let archived = db
        .list_bottles("u1", Some("archived"), None, 50, 0)
        .await
        .unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].id, "b2");

    let in_rack = db.list_bottles("u1", None, Some("l1"), 50, 0).await.unwrap();
    assert_eq!(in_rack.len(), 1);
    assert_eq!(in_rack[0].id, "b1");
}

#[tokio::test]
async fn update_bottle_keeps_quantity_when_unset() {
    let db = db_with_user().await;
    db.create_bottle("b1", "u1", &bottle("Barolo"), 4, "in_cellar")
        .await
        .unwrap();

    let params = BottleParams {
        vintage: Some(2016),
        ..bottle("Barolo Riserva")
    };
    let b = db.update_bottle("u1", "b1", &params, None).await.unwrap();
    assert_eq!(b.name, "Barolo Riserva");
    assert_eq!(b.vintage, Some(2016));
    assert_eq!(b.quantity, 4);

    let b = db.update_bottle("u1", "b1", &params, Some(6)).await.unwrap();
    assert_eq!(b.quantity, 6);
}

// === Drink log tests ===

#[tokio::test]
async fn drinking_last_bottles_marks_consumed() {
    let db = db_with_user().await;
    db.create_bottle("b1", "u1", &bottle("Chianti"), 3, "in_cellar")
        .await
        .unwrap();

    let params = DrinkLogParams {
        bottle_id: Some("b1".into()),
        drunk_at: unix_timestamp(),
        rating: Some(88),
        ..DrinkLogParams::default()
    };
    let (_, b) = db.log_drink("d1", "u1", &params, 2).await.unwrap();
    let b = b.unwrap();
    assert_eq!(b.quantity, 1);
    assert_eq!(b.status(), BottleStatus::InCellar);

    let (_, b) = db.log_drink("d2", "u1", &params, 1).await.unwrap();
    let b = b.unwrap();
    assert_eq!(b.quantity, 0);
    assert_eq!(b.status(), BottleStatus::Consumed);
}

#[tokio::test]
async fn over_consumption_writes_nothing() {
    let db = db_with_user().await;
    db.create_bottle("b1", "u1", &bottle("Chianti"), 1, "in_cellar")
        .await
        .unwrap();

    let params = DrinkLogParams {
        bottle_id: Some("b1".into()),
        drunk_at: unix_timestamp(),
        ..DrinkLogParams::default()
    };
    let err = db.log_drink("d1", "u1", &params, 2).await.unwrap_err();
    assert!(err.is_conflict());

    assert!(db
        .list_drink_logs("u1", None, 50, 0)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(db.get_bottle("u1", "b1").await.unwrap().quantity, 1);
}

#[tokio::test]
async fn drink_logs_keep_tasting_notes_and_sort_newest_first() {
    let db = db_with_user().await;
    let mut notes = BTreeMap::new();
    notes.insert("acidity".to_string(), "high".to_string());

    let older = DrinkLogParams {
        drunk_at: 1_700_000_000,
        tasting_notes: notes,
        ..DrinkLogParams::default()
    };
    let newer = DrinkLogParams {
        drunk_at: 1_700_000_500,
        ..DrinkLogParams::default()
    };
    db.log_drink("d1", "u1", &older, 1).await.unwrap();
    db.log_drink("d2", "u1", &newer, 1).await.unwrap();

    let logs = db.list_drink_logs("u1", None, 50, 0).await.unwrap();
    assert_eq!(logs[0].id, "d2");
    assert_eq!(logs[1].tasting_notes().get("acidity").unwrap(), "high");
}

#[tokio::test]
async fn summary_queries() {
    let db = db_with_user().await;
    db.create_bottle("b1", "u1", &bottle("A"), 2, "in_cellar")
        .await
        .unwrap();
    let italian = BottleParams {
        country: "Italy".into(),
        price_cents: None,
        ..bottle("B")
    };
    db.create_bottle("b2", "u1", &italian, 1, "in_cellar")
        .await
        .unwrap();
    db.create_bottle("b3", "u1", &bottle("C"), 0, "consumed")
        .await
        .unwrap();

    let statuses = db.bottle_status_totals("u1").await.unwrap();
    let in_cellar = statuses.iter().find(|s| s.status == "in_cellar").unwrap();
    assert_eq!(in_cellar.bottles, 2);
    assert_eq!(in_cellar.quantity, 3);

    assert_eq!(db.in_cellar_value_cents("u1").await.unwrap(), 5000);

    let countries = db.bottle_country_totals("u1").await.unwrap();
    assert_eq!(countries[0].country, "France");
    assert_eq!(countries[0].bottles, 2);

    assert_eq!(db.drink_log_totals("u1").await.unwrap(), (0, None));
    for (id, rating) in [("d1", 80), ("d2", 91)] {
        let params = DrinkLogParams {
            drunk_at: unix_timestamp(),
            rating: Some(rating),
            ..DrinkLogParams::default()
        };
        db.log_drink(id, "u1", &params, 1).await.unwrap();
    }
    assert_eq!(db.drink_log_totals("u1").await.unwrap(), (2, Some(86)));
}

// === Tasting session tests ===

#[tokio::test]
async fn session_update_is_partial() {
    let db = db_with_user().await;
    session_with_entry(&db).await;

    let update = SessionUpdate {
        summary: Some("Great night".into()),
        ..SessionUpdate::default()
    };
    let s = db.update_session("u1", "s1", &update).await.unwrap();
    assert_eq!(s.name, "Friday flight");
    assert_eq!(s.summary, "Great night");
}

#[tokio::test]
async fn join_code_is_assigned_once() {
    let db = db_with_user().await;
    session_with_entry(&db).await;

    assert!(db.assign_join_code("u1", "s1", "ABC234").await.unwrap());
    assert!(!db.assign_join_code("u1", "s1", "XYZ789").await.unwrap());

    let s = db.get_session_by_code("ABC234").await.unwrap().unwrap();
    assert_eq!(s.id, "s1");
}

#[tokio::test]
async fn join_code_collision_is_conflict() {
    let db = db_with_user().await;
    session_with_entry(&db).await;
    db.create_session("s2", "u1", &NewSession::default())
        .await
        .unwrap();

    db.assign_join_code("u1", "s1", "ABC234").await.unwrap();
    let err = db.assign_join_code("u1", "s2", "ABC234").await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn closing_invite_keeps_code_and_expiry() {
    let db = db_with_user().await;
    session_with_entry(&db).await;
    db.assign_join_code("u1", "s1", "ABC234").await.unwrap();

    let opened = db.open_invite("u1", "s1", 1_900_000_000).await.unwrap();
    assert!(opened.social_mode);

    let closed = db.close_invite("u1", "s1").await.unwrap();
    assert!(!closed.social_mode);
    assert_eq!(closed.join_code.as_deref(), Some("ABC234"));
    assert_eq!(closed.invite_expires_at, Some(1_900_000_000));
}

#[tokio::test]
async fn deleting_session_cascades() {
    let db = db_with_user().await;
    let (s, e) = session_with_entry(&db).await;
    db.create_guest("g1", &s, "Sam", "hash").await.unwrap();

    assert!(db.delete_session("u1", &s).await.unwrap());
    assert!(db.get_entry(&s, &e).await.is_err());
    assert!(db.list_guests(&s).await.unwrap().is_empty());
}

// === Tasting entry tests ===

#[tokio::test]
async fn entry_label_prefers_bottle_name() {
    let db = db_with_user().await;
    let (s, _) = session_with_entry(&db).await;
    db.create_bottle("b1", "u1", &bottle("Sancerre"), 1, "in_cellar")
        .await
        .unwrap();
    let entry = NewEntry {
        bottle_id: Some("b1".into()),
        ..NewEntry::default()
    };
    let e = db
        .create_entry("e2", &s, &entry, &EntryScore::default())
        .await
        .unwrap();

    assert_eq!(e.label(), "Sancerre");
    assert!(e.is_host_entry());

    let hosts = db.list_host_entries(&s).await.unwrap();
    let labels: Vec<_> = hosts.iter().map(|e| e.label()).collect();
    assert_eq!(labels, ["Wine A", "Sancerre"]);
}

#[tokio::test]
async fn second_guest_row_for_same_parent_is_conflict() {
    let db = db_with_user().await;
    let (s, e) = session_with_entry(&db).await;
    db.create_guest("g1", &s, "Sam", "hash").await.unwrap();

    let row = NewEntry {
        ad_hoc_name: Some("Wine A".into()),
        guest_id: Some("g1".into()),
        parent_entry_id: Some(e.clone()),
        ..NewEntry::default()
    };
    db.create_entry("ge1", &s, &row, &EntryScore::default())
        .await
        .unwrap();
    let err = db
        .create_entry("ge2", &s, &row, &EntryScore::default())
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let found = db.find_guest_entry(&s, "g1", &e).await.unwrap().unwrap();
    assert_eq!(found.id, "ge1");
    assert!(!found.is_host_entry());
    assert_eq!(db.list_guest_entries(&s).await.unwrap().len(), 1);
    assert_eq!(db.list_entries_by_guest(&s, "g1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn score_update_replaces_every_field() {
    let db = db_with_user().await;
    let (s, e) = session_with_entry(&db).await;

    let first = EntryScore {
        total_score: Some(80),
        short_notes: Some("bright".into()),
        tags: vec!["fruity".into()],
        ..EntryScore::default()
    };
    db.update_entry_score(&s, &e, &first).await.unwrap();

    let second = EntryScore {
        total_score: Some(85),
        ..EntryScore::default()
    };
    let updated = db.update_entry_score(&s, &e, &second).await.unwrap();
    assert_eq!(updated.total_score, Some(85));
    assert!(updated.short_notes.is_none());
    assert!(updated.tags().is_empty());
}

#[tokio::test]
async fn removing_host_entry_removes_guest_rows() {
    let db = db_with_user().await;
    let (s, e) = session_with_entry(&db).await;
    db.create_guest("g1", &s, "Sam", "hash").await.unwrap();
    let row = NewEntry {
        guest_id: Some("g1".into()),
        parent_entry_id: Some(e.clone()),
        ..NewEntry::default()
    };
    db.create_entry("ge1", &s, &row, &EntryScore::default())
        .await
        .unwrap();

    assert!(db.delete_entry(&s, &e).await.unwrap());
    assert!(db.list_guest_entries(&s).await.unwrap().is_empty());
}

#[tokio::test]
async fn linking_bottle_updates_guest_copies() {
    let db = db_with_user().await;
    let (s, e) = session_with_entry(&db).await;
    db.create_guest("g1", &s, "Sam", "hash").await.unwrap();
    let row = NewEntry {
        ad_hoc_name: Some("Wine A".into()),
        guest_id: Some("g1".into()),
        parent_entry_id: Some(e.clone()),
        ..NewEntry::default()
    };
    db.create_entry("ge1", &s, &row, &EntryScore::default())
        .await
        .unwrap();
    db.create_bottle("b1", "u1", &bottle("Wine A"), 0, "consumed")
        .await
        .unwrap();

    let linked = db.link_entry_bottle(&s, &e, "b1").await.unwrap();
    assert_eq!(linked.bottle_id.as_deref(), Some("b1"));
    let guest_row = db.get_entry(&s, "ge1").await.unwrap();
    assert_eq!(guest_row.bottle_id.as_deref(), Some("b1"));
}

// === Guest tests ===

#[tokio::test]
async fn guests_list_in_join_order() {
    let db = db_with_user().await;
    let (s, _) = session_with_entry(&db).await;
    db.create_guest("g1", &s, "Sam", "h1").await.unwrap();
    db.create_guest("g2", &s, "Lee", "h2").await.unwrap();

    let guests = db.list_guests(&s).await.unwrap();
    let names: Vec<_> = guests.iter().map(|g| g.display_name.as_str()).collect();
    assert_eq!(names, ["Sam", "Lee"]);
    assert!(guests[0].active);
    assert_eq!(guests[0].token_hash, "h1");
}
