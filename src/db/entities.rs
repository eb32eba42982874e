//! Ordered entity storage on SQLite.

use super::{Database, now_ms};
use crate::error::{CollectionError, CollectionResult};
use crate::store::{CollectionSnapshot, DocumentStore};
use crate::types::{EntityKind, EntityPatch, NewEntity, OrderAssignment, OrderedEntity};
use anyhow::Result;
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params, params_from_iter};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

pub fn parse_entity_row(row: &Row) -> rusqlite::Result<OrderedEntity> {
    Ok(OrderedEntity {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        value: row.get("value")?,
        order: row.get("sort_order")?,
        color: row.get("color")?,
        icon_name: row.get("icon_name")?,
        is_completion_status: row.get("is_completion_status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn list_entities_internal(conn: &Connection, kind: EntityKind) -> Result<Vec<OrderedEntity>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM entities WHERE collection = ?1 ORDER BY sort_order ASC, name ASC",
    )?;
    let rows = stmt.query_map(params![kind.collection()], parse_entity_row)?;
    let items = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

/// Build the SET clause and bound values for a partial update.
fn patch_assignments(patch: &EntityPatch, now: i64) -> (Vec<&'static str>, Vec<Value>) {
    let mut columns = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(name) = &patch.name {
        columns.push("name = ?");
        values.push(name.clone().into());
    }
    if let Some(value) = &patch.value {
        columns.push("value = ?");
        values.push(value.clone().into());
    }
    if let Some(description) = &patch.description {
        columns.push("description = ?");
        values.push(description.clone().into());
    }
    if let Some(order) = patch.order {
        columns.push("sort_order = ?");
        values.push(i64::from(order).into());
    }
    if let Some(color) = &patch.color {
        columns.push("color = ?");
        values.push(color.clone().into());
    }
    if let Some(icon_name) = &patch.icon_name {
        columns.push("icon_name = ?");
        values.push(icon_name.clone().into());
    }
    if let Some(flag) = patch.is_completion_status {
        columns.push("is_completion_status = ?");
        values.push(flag.into());
    }

    columns.push("updated_at = ?");
    values.push(now.into());

    (columns, values)
}

/// Bump the revision of `kind`'s collection. Call inside the write's transaction.
fn bump_revision(conn: &Connection, kind: EntityKind) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO collection_revisions (collection, revision) VALUES (?1, 1)
         ON CONFLICT(collection) DO UPDATE SET revision = revision + 1",
        params![kind.collection()],
    )?;
    Ok(())
}

fn revision_internal(conn: &Connection, kind: EntityKind) -> rusqlite::Result<u64> {
    let result = conn.query_row(
        "SELECT revision FROM collection_revisions WHERE collection = ?1",
        params![kind.collection()],
        |row| row.get::<_, i64>(0),
    );

    match result {
        Ok(revision) => Ok(u64::try_from(revision).unwrap_or(0)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

impl Database {
    /// List a collection in query order.
    pub fn list_entities(&self, kind: EntityKind) -> Result<Vec<OrderedEntity>> {
        self.with_conn(|conn| list_entities_internal(conn, kind))
    }

    /// Read a collection and its revision in one transaction.
    pub fn collection_snapshot(&self, kind: EntityKind) -> Result<CollectionSnapshot> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let revision = revision_internal(&tx, kind)?;
            let items = list_entities_internal(&tx, kind)?;
            tx.commit()?;
            Ok(CollectionSnapshot { revision, items })
        })
    }

    /// Current revision of a collection; `0` before its first write.
    pub fn collection_revision(&self, kind: EntityKind) -> Result<u64> {
        self.with_conn(|conn| Ok(revision_internal(conn, kind)?))
    }

    /// Get a record by id.
    pub fn get_entity(&self, kind: EntityKind, id: &str) -> Result<Option<OrderedEntity>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT * FROM entities WHERE collection = ?1 AND id = ?2",
                params![kind.collection(), id],
                parse_entity_row,
            );

            match result {
                Ok(entity) => Ok(Some(entity)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Insert a record and return its generated id.
    pub fn insert_entity(&self, kind: EntityKind, data: &NewEntity) -> Result<String> {
        if data.name.trim().is_empty() {
            return Err(CollectionError::validation("name").into());
        }

        let id = Uuid::now_v7().to_string();
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO entities (
                    id, collection, name, description, value, sort_order,
                    color, icon_name, is_completion_status, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    &id,
                    kind.collection(),
                    &data.name,
                    &data.description,
                    &data.value,
                    data.order.unwrap_or(0),
                    &data.color,
                    &data.icon_name,
                    data.is_completion_status,
                    now,
                    now,
                ],
            )?;
            bump_revision(&tx, kind)?;
            tx.commit()?;
            Ok(())
        })?;

        self.notify(kind);
        Ok(id)
    }

    /// Merge the set fields of `patch` into a record.
    pub fn update_entity(&self, kind: EntityKind, id: &str, patch: &EntityPatch) -> Result<()> {
        let (columns, mut values) = patch_assignments(patch, now_ms());
        values.push(kind.collection().to_string().into());
        values.push(id.to_string().into());

        let sql = format!(
            "UPDATE entities SET {} WHERE collection = ? AND id = ?",
            columns.join(", ")
        );

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(&sql, params_from_iter(values))?;
            if changed == 0 {
                return Err(CollectionError::not_found(kind.as_str(), id).into());
            }
            bump_revision(&tx, kind)?;
            tx.commit()?;
            Ok(())
        })?;

        self.notify(kind);
        Ok(())
    }

    /// Delete a record. Deleting an absent record is not an error.
    pub fn delete_entity(&self, kind: EntityKind, id: &str) -> Result<()> {
        let deleted = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let deleted = tx.execute(
                "DELETE FROM entities WHERE collection = ?1 AND id = ?2",
                params![kind.collection(), id],
            )?;
            if deleted > 0 {
                bump_revision(&tx, kind)?;
            }
            tx.commit()?;
            Ok(deleted)
        })?;

        if deleted > 0 {
            self.notify(kind);
        }
        Ok(())
    }

    /// Write new orders for a set of records in a single transaction.
    ///
    /// Rolls back and reports `NotFound` if any id is missing from the
    /// collection.
    pub fn reorder_entities(&self, kind: EntityKind, items: &[OrderAssignment]) -> Result<()> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "UPDATE entities SET sort_order = ?1, updated_at = ?2
                     WHERE collection = ?3 AND id = ?4",
                )?;
                for item in items {
                    let changed = stmt.execute(params![item.order, now, kind.collection(), &item.id])?;
                    if changed == 0 {
                        // Dropping the transaction rolls back.
                        return Err(CollectionError::not_found(kind.as_str(), item.id.clone()).into());
                    }
                }
            }
            bump_revision(&tx, kind)?;
            tx.commit()?;
            Ok(())
        })?;

        debug!(%kind, count = items.len(), "Committed reorder");
        self.notify(kind);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for Database {
    async fn snapshot(&self, kind: EntityKind) -> CollectionResult<CollectionSnapshot> {
        Ok(self.collection_snapshot(kind)?)
    }

    async fn fetch(&self, kind: EntityKind) -> CollectionResult<Vec<OrderedEntity>> {
        Ok(self.list_entities(kind)?)
    }

    fn changes(&self) -> broadcast::Receiver<EntityKind> {
        self.subscribe_changes()
    }

    async fn insert(&self, kind: EntityKind, data: &NewEntity) -> CollectionResult<String> {
        Ok(self.insert_entity(kind, data)?)
    }

    async fn update_fields(
        &self,
        kind: EntityKind,
        id: &str,
        patch: &EntityPatch,
    ) -> CollectionResult<()> {
        Ok(self.update_entity(kind, id, patch)?)
    }

    async fn remove(&self, kind: EntityKind, id: &str) -> CollectionResult<()> {
        Ok(self.delete_entity(kind, id)?)
    }

    async fn batch_update_order(
        &self,
        kind: EntityKind,
        items: &[OrderAssignment],
    ) -> CollectionResult<()> {
        Ok(self.reorder_entities(kind, items)?)
    }
}
