//! Integration tests for the SQLite store.
//!
//! These tests verify entity storage using in-memory and on-disk SQLite
//! databases, and run live collections on top of it.

use std::sync::Arc;
use std::time::Duration;
use taskflow::db::Database;
use taskflow::error::CollectionError;
use taskflow::manager::OrderedCollection;
use taskflow::store::DocumentStore;
use taskflow::types::{EntityKind, EntityPatch, MoveDirection, NewEntity, OrderAssignment};
use tempfile::TempDir;

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

mod entity_tests {
    use super::*;

    #[test]
    fn insert_assigns_id_and_timestamps() {
        let db = setup_db();
        let id = db
            .insert_entity(EntityKind::Priority, &NewEntity::named("High").with_value("high"))
            .expect("Failed to insert");

        let entity = db
            .get_entity(EntityKind::Priority, &id)
            .unwrap()
            .expect("entity should exist");
        assert_eq!(entity.name, "High");
        assert_eq!(entity.value.as_deref(), Some("high"));
        assert_eq!(entity.order, 0);
        assert!(entity.created_at > 0);
        assert_eq!(entity.created_at, entity.updated_at);
    }

    #[test]
    fn insert_rejects_blank_name() {
        let db = setup_db();
        let err: CollectionError = db
            .insert_entity(EntityKind::Category, &NewEntity::named(" "))
            .unwrap_err()
            .into();
        assert_eq!(err, CollectionError::validation("name"));
    }

    #[test]
    fn list_orders_by_order_then_name() {
        let db = setup_db();
        for (name, order) in [("Gamma", 1), ("Beta", 1), ("Alpha", 2), ("Zeta", 0)] {
            db.insert_entity(EntityKind::Category, &NewEntity::named(name).with_order(order))
                .unwrap();
        }

        let names: Vec<_> = db
            .list_entities(EntityKind::Category)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Zeta", "Beta", "Gamma", "Alpha"]);
    }

    #[test]
    fn update_merges_only_set_fields() {
        let db = setup_db();
        let id = db
            .insert_entity(
                EntityKind::Status,
                &NewEntity::named("Done").with_value("done").with_order(2),
            )
            .unwrap();

        let patch = EntityPatch {
            color: Some("#0a0".into()),
            is_completion_status: Some(true),
            ..Default::default()
        };
        db.update_entity(EntityKind::Status, &id, &patch).unwrap();

        let entity = db.get_entity(EntityKind::Status, &id).unwrap().unwrap();
        assert_eq!(entity.name, "Done");
        assert_eq!(entity.order, 2);
        assert_eq!(entity.color.as_deref(), Some("#0a0"));
        assert!(entity.is_completion_status);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let db = setup_db();
        let err: CollectionError = db
            .update_entity(EntityKind::Status, "ghost", &EntityPatch::rename("x"))
            .unwrap_err()
            .into();
        assert_eq!(err, CollectionError::not_found("status", "ghost"));
    }

    #[test]
    fn update_does_not_cross_collections() {
        let db = setup_db();
        let id = db
            .insert_entity(EntityKind::Category, &NewEntity::named("Bug"))
            .unwrap();
        assert!(
            db.update_entity(EntityKind::Priority, &id, &EntityPatch::rename("x"))
                .is_err()
        );
    }

    #[test]
    fn delete_is_idempotent() {
        let db = setup_db();
        let id = db
            .insert_entity(EntityKind::Category, &NewEntity::named("Bug"))
            .unwrap();

        db.delete_entity(EntityKind::Category, &id).unwrap();
        db.delete_entity(EntityKind::Category, &id).unwrap();
        assert!(db.get_entity(EntityKind::Category, &id).unwrap().is_none());
    }

    #[test]
    fn reorder_writes_all_assignments() {
        let db = setup_db();
        let a = db
            .insert_entity(EntityKind::Priority, &NewEntity::named("Low").with_order(0))
            .unwrap();
        let b = db
            .insert_entity(EntityKind::Priority, &NewEntity::named("High").with_order(7))
            .unwrap();

        db.reorder_entities(
            EntityKind::Priority,
            &[OrderAssignment::new(&b, 0), OrderAssignment::new(&a, 1)],
        )
        .unwrap();

        let names: Vec<_> = db
            .list_entities(EntityKind::Priority)
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.order))
            .collect();
        assert_eq!(names, vec![("High".to_string(), 0), ("Low".to_string(), 1)]);
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taskflow.db");

        {
            let db = Database::open(&path).unwrap();
            db.insert_entity(EntityKind::Status, &NewEntity::named("To Do"))
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let statuses = db.list_entities(EntityKind::Status).unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].name, "To Do");
    }
}

mod store_tests {
    use super::*;

    #[tokio::test]
    async fn commits_are_broadcast() {
        let db = setup_db();
        let mut changes = db.changes();

        db.insert(EntityKind::Priority, &NewEntity::named("Low"))
            .await
            .unwrap();
        assert_eq!(changes.recv().await.unwrap(), EntityKind::Priority);
    }

    #[tokio::test]
    async fn failed_batch_is_not_broadcast() {
        let db = setup_db();
        let id = db
            .insert(EntityKind::Priority, &NewEntity::named("Low"))
            .await
            .unwrap();
        let mut changes = db.changes();

        let result = db
            .batch_update_order(
                EntityKind::Priority,
                &[OrderAssignment::new(&id, 3), OrderAssignment::new("ghost", 0)],
            )
            .await;
        assert!(matches!(result, Err(CollectionError::NotFound { .. })));
        assert!(changes.try_recv().is_err());
        assert_eq!(db.fetch(EntityKind::Priority).await.unwrap()[0].order, 0);
    }

    #[tokio::test]
    async fn clones_share_the_change_channel() {
        let db = setup_db();
        let other = db.clone();
        let mut changes = db.changes();

        other
            .insert(EntityKind::Category, &NewEntity::named("Bug"))
            .await
            .unwrap();
        assert_eq!(changes.recv().await.unwrap(), EntityKind::Category);
        assert_eq!(db.fetch(EntityKind::Category).await.unwrap().len(), 1);
    }
}

mod live_collection_tests {
    use super::*;

    fn stored_orders(db: &Database, kind: EntityKind) -> Vec<(String, u32)> {
        db.list_entities(kind)
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.order))
            .collect()
    }

    #[tokio::test]
    async fn move_round_trip_on_sqlite() {
        let db = Arc::new(setup_db());
        let collection = OrderedCollection::new(Arc::clone(&db), EntityKind::Priority);
        collection.ready().await.unwrap();

        let mut ids = Vec::new();
        for name in ["Low", "Medium", "High"] {
            ids.push(collection.add(NewEntity::named(name)).await.unwrap());
        }

        assert!(collection.move_entity(&ids[1], MoveDirection::Up).await.unwrap());

        let stored: Vec<_> = db
            .list_entities(EntityKind::Priority)
            .unwrap()
            .into_iter()
            .map(|e| (e.id, e.order))
            .collect();
        assert_eq!(
            stored,
            vec![(ids[1].clone(), 0), (ids[0].clone(), 1), (ids[2].clone(), 2)]
        );
    }

    #[tokio::test]
    async fn back_to_back_adds_on_sqlite() {
        let db = Arc::new(setup_db());
        let collection = OrderedCollection::new(Arc::clone(&db), EntityKind::Category);
        collection.ready().await.unwrap();

        collection.add(NewEntity::named("A")).await.unwrap();
        collection.add(NewEntity::named("B")).await.unwrap();
        let err = collection.add(NewEntity::named("a")).await.unwrap_err();
        assert!(matches!(err, CollectionError::Duplicate { .. }));

        assert_eq!(
            stored_orders(&db, EntityKind::Category),
            vec![("A".to_string(), 0), ("B".to_string(), 1)]
        );
        assert_eq!(collection.snapshot().revision, 2);
    }

    #[tokio::test]
    async fn back_to_back_moves_on_sqlite() {
        let db = Arc::new(setup_db());
        let collection = OrderedCollection::new(Arc::clone(&db), EntityKind::Priority);
        collection.ready().await.unwrap();

        let a = collection.add(NewEntity::named("A")).await.unwrap();
        collection.add(NewEntity::named("B")).await.unwrap();
        collection.add(NewEntity::named("C")).await.unwrap();

        assert!(collection.move_entity(&a, MoveDirection::Down).await.unwrap());
        assert!(collection.move_entity(&a, MoveDirection::Down).await.unwrap());

        assert_eq!(
            stored_orders(&db, EntityKind::Priority),
            vec![("B".to_string(), 0), ("C".to_string(), 1), ("A".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn writes_from_another_handle_reach_the_view() {
        let db = Arc::new(setup_db());
        let collection = OrderedCollection::new(Arc::clone(&db), EntityKind::Status);
        collection.ready().await.unwrap();

        db.insert_entity(EntityKind::Status, &NewEntity::named("Done"))
            .unwrap();

        let mut rx = collection.watch();
        let state = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| s.items.len() == 1),
        )
        .await
        .expect("timed out")
        .unwrap()
        .clone();
        assert_eq!(state.revision, 1);
    }
}
