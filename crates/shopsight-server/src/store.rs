//! SQLite persistence for extracted brand records.
//!
//! One row per storefront in `brands`, with the nested maps stored as
//! JSON text. The catalog lives in `products` and is replaced
//! wholesale on every upsert, so a delisted product disappears on the
//! next run instead of lingering.

use async_trait::async_trait;
use shopsight_core::{BrandInsights, Error, InsightStore, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

const CREATE_BRANDS: &str = "
CREATE TABLE IF NOT EXISTS brands (
    store_url       TEXT PRIMARY KEY,
    brand_name      TEXT NOT NULL,
    brand_context   TEXT,
    hero_products   TEXT NOT NULL,
    policies        TEXT NOT NULL,
    faqs            TEXT NOT NULL,
    social_handles  TEXT NOT NULL,
    contact_details TEXT NOT NULL,
    important_links TEXT NOT NULL,
    updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
)";

const CREATE_PRODUCTS: &str = "
CREATE TABLE IF NOT EXISTS products (
    store_url    TEXT NOT NULL,
    id           INTEGER NOT NULL,
    title        TEXT NOT NULL,
    vendor       TEXT NOT NULL,
    product_type TEXT NOT NULL,
    handle       TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    price        REAL NOT NULL,
    sku          TEXT,
    image_url    TEXT,
    PRIMARY KEY (store_url, id)
)";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) a file-backed database.
    pub async fn connect(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(store_err)?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// An in-memory database, used by tests. Pinned to a single
    /// connection because each sqlite memory connection is its own
    /// database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(store_err)?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_BRANDS)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        sqlx::query(CREATE_PRODUCTS)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    pub async fn product_count(&self, store_url: &str) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM products WHERE store_url = ?")
                .bind(store_url)
                .fetch_one(&self.pool)
                .await
                .map_err(store_err)?;
        Ok(count)
    }
}

#[async_trait]
impl InsightStore for SqliteStore {
    async fn upsert(&self, insights: &BrandInsights) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query(
            "INSERT INTO brands (store_url, brand_name, brand_context, hero_products,
                                 policies, faqs, social_handles, contact_details,
                                 important_links, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))
             ON CONFLICT(store_url) DO UPDATE SET
                 brand_name = excluded.brand_name,
                 brand_context = excluded.brand_context,
                 hero_products = excluded.hero_products,
                 policies = excluded.policies,
                 faqs = excluded.faqs,
                 social_handles = excluded.social_handles,
                 contact_details = excluded.contact_details,
                 important_links = excluded.important_links,
                 updated_at = excluded.updated_at",
        )
        .bind(&insights.store_url)
        .bind(insights.brand_name())
        .bind(&insights.brand_context)
        .bind(to_json(&insights.hero_products)?)
        .bind(to_json(&insights.policies)?)
        .bind(to_json(&insights.faqs)?)
        .bind(to_json(&insights.social_handles)?)
        .bind(to_json(&insights.contact_details)?)
        .bind(to_json(&insights.important_links)?)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        sqlx::query("DELETE FROM products WHERE store_url = ?")
            .bind(&insights.store_url)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        for product in &insights.product_catalog {
            sqlx::query(
                "INSERT INTO products (store_url, id, title, vendor, product_type,
                                       handle, created_at, price, sku, image_url)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&insights.store_url)
            .bind(product.id)
            .bind(&product.title)
            .bind(&product.vendor)
            .bind(&product.product_type)
            .bind(&product.handle)
            .bind(&product.created_at)
            .bind(product.price)
            .bind(&product.sku)
            .bind(&product.image_url)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)
    }
}

fn store_err(err: sqlx::Error) -> Error {
    Error::Store(err.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Store(e.to_string()))
}
