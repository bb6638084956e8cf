use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::catalog::{
    dto::{ProductFilter, ProductInput},
    repo_types::{CategoryCount, Product},
};

/// Catalog store.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list(&self, filter: &ProductFilter) -> anyhow::Result<Vec<Product>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>>;
    async fn insert(&self, product: &Product) -> anyhow::Result<()>;
    /// Returns whether a row was changed.
    async fn update(&self, id: Uuid, input: &ProductInput) -> anyhow::Result<bool>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn category_counts(&self) -> anyhow::Result<Vec<CategoryCount>>;
    async fn count(&self) -> anyhow::Result<i64>;
}

#[derive(Clone)]
pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Escapes LIKE wildcards so search text matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

const PRODUCT_COLUMNS: &str =
    "SELECT id, name, description, price, category, image_url, stock, created_at FROM products";

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list(&self, filter: &ProductFilter) -> anyhow::Result<Vec<Product>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(PRODUCT_COLUMNS);
        qb.push(" WHERE TRUE");
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category);
        }
        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY created_at ASC, name ASC");

        let rows = qb.build_query_as::<Product>().fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(&format!("{PRODUCT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn insert(&self, product: &Product) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, category, image_url, stock, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.category)
        .bind(&product.image_url)
        .bind(product.stock)
        .bind(product.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update(&self, id: Uuid, input: &ProductInput) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE products
               SET name = $2, description = $3, price = $4, category = $5,
                   image_url = $6, stock = $7, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.category)
        .bind(&input.image_url)
        .bind(input.stock)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn category_counts(&self) -> anyhow::Result<Vec<CategoryCount>> {
        let rows = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, COUNT(*) AS count
              FROM products
             GROUP BY category
             ORDER BY category
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
