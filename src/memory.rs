//! In-process stores with the same semantics as the Postgres ones. Used when
//! no `DATABASE_URL` is configured, and by tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{repo::UserStore, repo_types::User},
    catalog::{
        dto::{ProductFilter, ProductInput},
        repo::ProductStore,
        repo_types::{CategoryCount, Product},
    },
    orders::{
        repo::OrderStore,
        repo_types::{Order, OrderStatus},
    },
};

#[derive(Default)]
pub struct MemoryUserStore {
    by_email: RwLock<HashMap<String, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.by_email.read().await.get(email).cloned())
    }

    async fn insert(&self, user: &User) -> anyhow::Result<bool> {
        let mut users = self.by_email.write().await;
        if users.contains_key(&user.email) {
            return Ok(false);
        }
        users.insert(user.email.clone(), user.clone());
        Ok(true)
    }
}

/// Products in insertion order.
#[derive(Default)]
pub struct MemoryProductStore {
    products: RwLock<Vec<Product>>,
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn list(&self, filter: &ProductFilter) -> anyhow::Result<Vec<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, product: &Product) -> anyhow::Result<()> {
        self.products.write().await.push(product.clone());
        Ok(())
    }

    async fn update(&self, id: Uuid, input: &ProductInput) -> anyhow::Result<bool> {
        let mut products = self.products.write().await;
        let Some(p) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        p.name = input.name.clone();
        p.description = input.description.clone();
        p.price = input.price;
        p.category = input.category.clone();
        p.image_url = input.image_url.clone();
        p.stock = input.stock;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() != before)
    }

    async fn category_counts(&self) -> anyhow::Result<Vec<CategoryCount>> {
        let products = self.products.read().await;
        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for p in products.iter() {
            *counts.entry(p.category.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect())
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(self.products.read().await.len() as i64)
    }
}

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<Uuid, Order>>,
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> anyhow::Result<()> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_for_owner(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).filter(|o| o.user_id == user_id).cloned())
    }

    async fn list_for_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(newest_first(
            orders.values().filter(|o| o.user_id == user_id).cloned().collect(),
        ))
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(newest_first(orders.values().cloned().collect()))
    }

    async fn mark_paid(&self, id: Uuid, user_id: Uuid, paid_at: OffsetDateTime) -> anyhow::Result<bool> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&id) {
            Some(o) if o.user_id == user_id && o.status == OrderStatus::Pending => {
                o.status = OrderStatus::Paid;
                o.paid_at = Some(paid_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: &OrderStatus,
        updated_at: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let mut orders = self.orders.write().await;
        let Some(o) = orders.get_mut(&id) else {
            return Ok(false);
        };
        o.status = status.clone();
        o.updated_at = Some(updated_at);
        Ok(true)
    }
}
