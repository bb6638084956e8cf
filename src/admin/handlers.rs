use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AdminUser,
    catalog::{dto::ProductInput, repo_types::Product},
    error::{AppError, AppResult},
    orders::{dto::StatusUpdate, repo_types::Order, services},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(list_all_orders))
        .route("/admin/orders/:id/status", put(update_order_status))
        .route("/admin/products", post(create_product))
        .route(
            "/admin/products/:id",
            put(update_product).delete(delete_product),
        )
}

#[instrument(skip_all)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(services::list_all_orders(&state, &admin).await?))
}

/// `?status=...` wins over a `{"status": ...}` body.
#[instrument(skip(state, admin, body))]
pub async fn update_order_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Query(query): Query<StatusUpdate>,
    body: Option<Json<StatusUpdate>>,
) -> AppResult<Json<MessageResponse>> {
    let status = query
        .status
        .or_else(|| body.and_then(|Json(b)| b.status))
        .ok_or_else(|| AppError::BadRequest("status is required".into()))?;
    services::override_status(&state, &admin, &id, status).await?;
    Ok(Json(MessageResponse {
        message: "Order status updated",
    }))
}

#[instrument(skip(state, admin, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<ProductInput>,
) -> AppResult<Json<Product>> {
    let input = payload.validated()?;
    let product = Product {
        id: Uuid::new_v4(),
        name: input.name,
        description: input.description,
        price: input.price,
        category: input.category,
        image_url: input.image_url,
        stock: input.stock,
        created_at: OffsetDateTime::now_utc(),
    };
    state.products.insert(&product).await?;
    info!(product_id = %product.id, admin_id = %admin.user().id, "product created");
    Ok(Json(product))
}

/// No existence check: unknown ids still answer with the success message.
#[instrument(skip(state, admin, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<ProductInput>,
) -> AppResult<Json<MessageResponse>> {
    let input = payload.validated()?;
    if let Ok(id) = Uuid::parse_str(&id) {
        if state.products.update(id, &input).await? {
            info!(product_id = %id, admin_id = %admin.user().id, "product updated");
        }
    }
    Ok(Json(MessageResponse {
        message: "Product updated",
    }))
}

#[instrument(skip(state, admin))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    if let Ok(id) = Uuid::parse_str(&id) {
        if state.products.delete(id).await? {
            info!(product_id = %id, admin_id = %admin.user().id, "product deleted");
        }
    }
    Ok(Json(MessageResponse {
        message: "Product deleted",
    }))
}
