//! Product store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist product rows and read them back in domain shape.
//! - Provide count + window queries for paginated listings.
//!
//! # Invariants
//! - Every write is followed by a read-back under the same lock.
//! - `update_product` always refreshes `last_updated`.
//! - List order is `created_at DESC`; ties go to the later insert.

use crate::db::SharedConnection;
use crate::model::product::{NewProduct, Product, ProductId, ProductUpdate};
use crate::repo::{bool_to_int, lock, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const PRODUCT_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    image_url,
    price,
    stock,
    sub_category_id,
    brand,
    rating,
    review_count,
    discount_rate,
    keywords,
    is_active,
    created_at,
    last_updated
FROM products";

/// Storage collaborator for product rows.
pub trait ProductStore: Send + Sync {
    fn create_product(&self, product: &NewProduct) -> RepoResult<Product>;
    fn get_product(&self, id: ProductId) -> RepoResult<Product>;
    fn update_product(&self, update: &ProductUpdate) -> RepoResult<Product>;
    fn delete_product(&self, id: ProductId) -> RepoResult<()>;
    fn count_products(&self) -> RepoResult<i64>;
    fn list_products(&self, offset: i32, limit: i32) -> RepoResult<Vec<Product>>;
    fn count_products_by_category(&self, category_id: Uuid) -> RepoResult<i64>;
    fn list_products_by_category(
        &self,
        category_id: Uuid,
        offset: i32,
        limit: i32,
    ) -> RepoResult<Vec<Product>>;
}

/// SQLite-backed product store.
pub struct SqliteProductRepository<'conn> {
    conn: &'conn SharedConnection,
}

impl<'conn> SqliteProductRepository<'conn> {
    pub fn new(conn: &'conn SharedConnection) -> Self {
        Self { conn }
    }
}

impl ProductStore for SqliteProductRepository<'_> {
    fn create_product(&self, product: &NewProduct) -> RepoResult<Product> {
        let conn = lock(self.conn)?;
        conn.execute(
            "INSERT INTO products (
                id,
                name,
                description,
                image_url,
                price,
                stock,
                sub_category_id,
                brand,
                keywords
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                product.id.to_string(),
                product.name.as_str(),
                product.description.as_deref(),
                product.image_url.as_deref(),
                product.price.as_str(),
                product.stock,
                product.sub_category_id.map(|id| id.to_string()),
                product.brand.as_deref(),
                product.keywords.as_deref(),
            ],
        )?;

        load_product(&conn, product.id)
    }

    fn get_product(&self, id: ProductId) -> RepoResult<Product> {
        let conn = lock(self.conn)?;
        load_product(&conn, id)
    }

    fn update_product(&self, update: &ProductUpdate) -> RepoResult<Product> {
        let conn = lock(self.conn)?;
        let changed = conn.execute(
            "UPDATE products
             SET
                name = ?2,
                description = ?3,
                image_url = ?4,
                price = ?5,
                stock = ?6,
                sub_category_id = ?7,
                brand = ?8,
                rating = ?9,
                review_count = ?10,
                discount_rate = ?11,
                keywords = ?12,
                is_active = ?13,
                last_updated = CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)
             WHERE id = ?1;",
            params![
                update.id.to_string(),
                update.name.as_str(),
                update.description.as_deref(),
                update.image_url.as_deref(),
                update.price.as_str(),
                update.stock,
                update.sub_category_id.map(|id| id.to_string()),
                update.brand.as_deref(),
                update.rating.as_str(),
                update.review_count,
                update.discount_rate.as_str(),
                update.keywords.as_deref(),
                bool_to_int(update.is_active),
            ],
        )?;

        if changed == 0 {
            return Err(product_not_found(update.id));
        }

        load_product(&conn, update.id)
    }

    fn delete_product(&self, id: ProductId) -> RepoResult<()> {
        let conn = lock(self.conn)?;
        let changed = conn.execute("DELETE FROM products WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(product_not_found(id));
        }
        Ok(())
    }

    fn count_products(&self) -> RepoResult<i64> {
        let conn = lock(self.conn)?;
        let count = conn.query_row("SELECT COUNT(*) FROM products;", [], |row| row.get(0))?;
        Ok(count)
    }

    fn list_products(&self, offset: i32, limit: i32) -> RepoResult<Vec<Product>> {
        let conn = lock(self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{PRODUCT_SELECT_SQL}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1 OFFSET ?2;"
        ))?;
        let mut rows = stmt.query(params![limit, offset])?;
        let mut products = Vec::new();
        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row)?);
        }
        Ok(products)
    }

    fn count_products_by_category(&self, category_id: Uuid) -> RepoResult<i64> {
        let conn = lock(self.conn)?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM products WHERE sub_category_id = ?1;",
            [category_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_products_by_category(
        &self,
        category_id: Uuid,
        offset: i32,
        limit: i32,
    ) -> RepoResult<Vec<Product>> {
        let conn = lock(self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{PRODUCT_SELECT_SQL}
             WHERE sub_category_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2 OFFSET ?3;"
        ))?;
        let mut rows = stmt.query(params![category_id.to_string(), limit, offset])?;
        let mut products = Vec::new();
        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row)?);
        }
        Ok(products)
    }
}

fn load_product(conn: &Connection, id: ProductId) -> RepoResult<Product> {
    let mut stmt = conn.prepare(&format!("{PRODUCT_SELECT_SQL} WHERE id = ?1;"))?;
    let product = stmt
        .query_row([id.to_string()], |row| Ok(parse_product_row(row)))
        .optional()?;
    match product {
        Some(parsed) => parsed,
        None => Err(product_not_found(id)),
    }
}

fn product_not_found(id: ProductId) -> RepoError {
    RepoError::NotFound {
        entity: "product",
        key: id.to_string(),
    }
}

fn parse_product_row(row: &Row<'_>) -> RepoResult<Product> {
    let id_text: String = row.get("id")?;
    let sub_category_id = match row.get::<_, Option<String>>("sub_category_id")? {
        Some(value) => Some(parse_uuid(&value, "products.sub_category_id")?),
        None => None,
    };
    let is_active = match row.get::<_, i64>("is_active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_active value `{other}` in products.is_active"
            )));
        }
    };

    Ok(Product {
        id: parse_uuid(&id_text, "products.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        image_url: row.get("image_url")?,
        price: row.get("price")?,
        stock: row.get("stock")?,
        sub_category_id,
        brand: row.get("brand")?,
        rating: row.get("rating")?,
        review_count: row.get("review_count")?,
        discount_rate: row.get("discount_rate")?,
        keywords: row.get("keywords")?,
        is_active,
        created_at: row.get("created_at")?,
        last_updated: row.get("last_updated")?,
    })
}
