use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Order status. Anything other than `pending`/`paid` is an admin-assigned label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Paid,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Other(s) => s,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => OrderStatus::Pending,
            "paid" => OrderStatus::Paid,
            _ => OrderStatus::Other(s),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(s: OrderStatus) -> Self {
        match s {
            OrderStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one product at order time. Never re-read from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderLineItem>,
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub transportation_fee: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub delivery_address: String,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Json<Vec<OrderLineItem>>,
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub transportation_fee: Decimal,
    pub total: Decimal,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub delivery_address: String,
    pub paid_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            items: r.items.0,
            subtotal: r.subtotal,
            service_fee: r.service_fee,
            transportation_fee: r.transportation_fee,
            total: r.total,
            status: OrderStatus::from(r.status),
            created_at: r.created_at,
            delivery_address: r.delivery_address,
            paid_at: r.paid_at,
            updated_at: r.updated_at,
        }
    }
}
