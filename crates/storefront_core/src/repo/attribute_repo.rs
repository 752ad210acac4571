//! Colour/material stores and product link store.
//!
//! # Responsibility
//! - Look up and create attribute entities by storage key.
//! - Insert product-attribute link rows and list a product's attributes.
//!
//! # Invariants
//! - Attribute keys are UNIQUE in storage; a duplicate insert returns
//!   `RepoError::Conflict` instead of a raw SQLite error.
//! - Link inserts never check for an existing identical link.
//! - Material keys compare case-insensitively (`COLLATE NOCASE` column).

use crate::db::SharedConnection;
use crate::model::attribute::{AttributeEntity, AttributeId, AttributeKind, ProductAttributeLink};
use crate::model::product::ProductId;
use crate::repo::{lock, parse_uuid, RepoError, RepoResult};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

/// Storage collaborator for one attribute collection, selected by `kind`.
pub trait AttributeStore: Send + Sync {
    /// Fails with `RepoError::NotFound` when no entity has this key.
    fn find_by_key(&self, kind: AttributeKind, key: &str) -> RepoResult<AttributeEntity>;
    /// Fails with `RepoError::Conflict` when the key already exists.
    fn create(&self, kind: AttributeKind, label: &str) -> RepoResult<AttributeEntity>;
    fn count(&self, kind: AttributeKind) -> RepoResult<i64>;
    fn list(&self, kind: AttributeKind, offset: i32, limit: i32) -> RepoResult<Vec<AttributeEntity>>;
}

/// Storage collaborator for product-attribute links.
pub trait LinkStore: Send + Sync {
    /// Inserts a new link row with a fresh id.
    fn upsert_link(
        &self,
        kind: AttributeKind,
        product_id: ProductId,
        attribute_id: AttributeId,
    ) -> RepoResult<ProductAttributeLink>;
    /// Counts link rows (not distinct attributes) for one product.
    fn count_for_product(&self, kind: AttributeKind, product_id: ProductId) -> RepoResult<i64>;
    /// Lists the linked entities of one product, one item per link row.
    fn list_for_product(
        &self,
        kind: AttributeKind,
        product_id: ProductId,
        offset: i32,
        limit: i32,
    ) -> RepoResult<Vec<AttributeEntity>>;
}

struct Tables {
    entity: &'static str,
    entity_table: &'static str,
    key_column: &'static str,
    link_table: &'static str,
    link_column: &'static str,
}

fn tables(kind: AttributeKind) -> Tables {
    match kind {
        AttributeKind::Colour => Tables {
            entity: "colour",
            entity_table: "colours",
            key_column: "colour_hex",
            link_table: "product_colours",
            link_column: "colour_id",
        },
        AttributeKind::Material => Tables {
            entity: "material",
            entity_table: "materials",
            key_column: "name",
            link_table: "product_materials",
            link_column: "material_id",
        },
    }
}

/// SQLite-backed attribute and link store.
pub struct SqliteAttributeRepository<'conn> {
    conn: &'conn SharedConnection,
}

impl<'conn> SqliteAttributeRepository<'conn> {
    pub fn new(conn: &'conn SharedConnection) -> Self {
        Self { conn }
    }
}

impl AttributeStore for SqliteAttributeRepository<'_> {
    fn find_by_key(&self, kind: AttributeKind, key: &str) -> RepoResult<AttributeEntity> {
        let conn = lock(self.conn)?;
        let t = tables(kind);
        select_entity(&conn, kind, &format!("{} = ?1", t.key_column), key)?.ok_or_else(|| {
            RepoError::NotFound {
                entity: t.entity,
                key: key.to_string(),
            }
        })
    }

    fn create(&self, kind: AttributeKind, label: &str) -> RepoResult<AttributeEntity> {
        let conn = lock(self.conn)?;
        let t = tables(kind);
        let id = Uuid::new_v4();
        let inserted = conn.execute(
            &format!(
                "INSERT INTO {} (id, {}) VALUES (?1, ?2);",
                t.entity_table, t.key_column
            ),
            params![id.to_string(), label],
        );

        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                debug!(
                    "event=attribute_create module=repo status=conflict kind={kind} key={label}"
                );
                return Err(RepoError::Conflict {
                    entity: t.entity,
                    key: label.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        }

        select_entity(&conn, kind, "id = ?1", &id.to_string())?.ok_or_else(|| {
            RepoError::InvalidData(format!("{} `{id}` missing after insert", t.entity))
        })
    }

    fn count(&self, kind: AttributeKind) -> RepoResult<i64> {
        let conn = lock(self.conn)?;
        let t = tables(kind);
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", t.entity_table),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list(&self, kind: AttributeKind, offset: i32, limit: i32) -> RepoResult<Vec<AttributeEntity>> {
        let conn = lock(self.conn)?;
        let t = tables(kind);
        let mut stmt = conn.prepare(&format!(
            "SELECT id, {key} AS label, created_at, last_updated
             FROM {table}
             ORDER BY {key} ASC, id ASC
             LIMIT ?1 OFFSET ?2;",
            key = t.key_column,
            table = t.entity_table,
        ))?;
        let mut rows = stmt.query(params![limit, offset])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(parse_entity_row(row, t.entity_table)?);
        }
        Ok(entities)
    }
}

impl LinkStore for SqliteAttributeRepository<'_> {
    fn upsert_link(
        &self,
        kind: AttributeKind,
        product_id: ProductId,
        attribute_id: AttributeId,
    ) -> RepoResult<ProductAttributeLink> {
        let conn = lock(self.conn)?;
        let t = tables(kind);
        let id = Uuid::new_v4();
        conn.execute(
            &format!(
                "INSERT INTO {} (id, product_id, {}) VALUES (?1, ?2, ?3);",
                t.link_table, t.link_column
            ),
            params![id.to_string(), product_id.to_string(), attribute_id.to_string()],
        )?;

        let created_at: i64 = conn.query_row(
            &format!("SELECT created_at FROM {} WHERE id = ?1;", t.link_table),
            [id.to_string()],
            |row| row.get(0),
        )?;

        Ok(ProductAttributeLink {
            id,
            kind,
            product_id,
            attribute_id,
            created_at,
        })
    }

    fn count_for_product(&self, kind: AttributeKind, product_id: ProductId) -> RepoResult<i64> {
        let conn = lock(self.conn)?;
        let t = tables(kind);
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE product_id = ?1;",
                t.link_table
            ),
            [product_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_for_product(
        &self,
        kind: AttributeKind,
        product_id: ProductId,
        offset: i32,
        limit: i32,
    ) -> RepoResult<Vec<AttributeEntity>> {
        let conn = lock(self.conn)?;
        let t = tables(kind);
        let mut stmt = conn.prepare(&format!(
            "SELECT a.id, a.{key} AS label, a.created_at, a.last_updated
             FROM {table} a
             INNER JOIN {links} l ON l.{link_column} = a.id
             WHERE l.product_id = ?1
             ORDER BY l.created_at ASC, l.rowid ASC
             LIMIT ?2 OFFSET ?3;",
            key = t.key_column,
            table = t.entity_table,
            links = t.link_table,
            link_column = t.link_column,
        ))?;
        let mut rows = stmt.query(params![product_id.to_string(), limit, offset])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(parse_entity_row(row, t.entity_table)?);
        }
        Ok(entities)
    }
}

fn select_entity(
    conn: &Connection,
    kind: AttributeKind,
    predicate: &str,
    value: &str,
) -> RepoResult<Option<AttributeEntity>> {
    let t = tables(kind);
    let mut stmt = conn.prepare(&format!(
        "SELECT id, {key} AS label, created_at, last_updated
         FROM {table}
         WHERE {predicate};",
        key = t.key_column,
        table = t.entity_table,
    ))?;
    let parsed = stmt
        .query_row([value], |row| Ok(parse_entity_row(row, t.entity_table)))
        .optional()?;
    parsed.transpose()
}

fn parse_entity_row(row: &Row<'_>, table: &str) -> RepoResult<AttributeEntity> {
    let id_text: String = row.get("id")?;
    Ok(AttributeEntity {
        id: parse_uuid(&id_text, &format!("{table}.id"))?,
        label: row.get("label")?,
        created_at: row.get("created_at")?,
        last_updated: row.get("last_updated")?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
