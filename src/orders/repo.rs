use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::orders::repo_types::{Order, OrderRow, OrderStatus};

/// Order store. Single-row writes only; no cross-document transactions.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> anyhow::Result<()>;
    /// Lookup that matches both id and owner.
    async fn find_for_owner(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Order>>;
    /// Newest first.
    async fn list_for_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>>;
    /// Newest first.
    async fn list_all(&self) -> anyhow::Result<Vec<Order>>;
    /// `pending -> paid`; returns false if the order is not pending (or not the owner's).
    async fn mark_paid(&self, id: Uuid, user_id: Uuid, paid_at: OffsetDateTime) -> anyhow::Result<bool>;
    /// Unconditional status overwrite; returns whether a row matched.
    async fn set_status(
        &self,
        id: Uuid,
        status: &OrderStatus,
        updated_at: OffsetDateTime,
    ) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgOrderStore {
    db: PgPool,
}

impl PgOrderStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const ORDER_COLUMNS: &str = r#"
    SELECT id, user_id, items, subtotal, service_fee, transportation_fee, total,
           status, created_at, delivery_address, paid_at, updated_at
      FROM orders
"#;

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, items, subtotal, service_fee, transportation_fee,
                                total, status, created_at, delivery_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(order.subtotal)
        .bind(order.service_fee)
        .bind(order.transportation_fee)
        .bind(order.total)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(&order.delivery_address)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find_for_owner(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_COLUMNS} WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Order::from))
    }

    async fn list_for_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_COLUMNS} WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_COLUMNS} ORDER BY created_at DESC"))
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn mark_paid(&self, id: Uuid, user_id: Uuid, paid_at: OffsetDateTime) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE orders
               SET status = 'paid', paid_at = $3
             WHERE id = $1 AND user_id = $2 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(paid_at)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: &OrderStatus,
        updated_at: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(updated_at)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
