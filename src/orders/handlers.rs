use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    orders::{
        dto::{CreateOrderRequest, PaymentResponse},
        repo_types::Order,
        services,
    },
    state::AppState,
};

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/pay", post(pay_order))
}

#[instrument(skip(state, principal, payload), fields(user_id = %principal.user_id()))]
pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<Order>> {
    let order = services::place_order(&state, &principal, payload).await?;
    Ok(Json(order))
}

#[instrument(skip(state, principal), fields(user_id = %principal.user_id()))]
pub async fn list_orders(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(services::list_orders(&state, &principal).await?))
}

#[instrument(skip(state, principal), fields(user_id = %principal.user_id()))]
pub async fn get_order(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(services::get_order(&state, &principal, &id).await?))
}

#[instrument(skip(state, principal), fields(user_id = %principal.user_id()))]
pub async fn pay_order(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<PaymentResponse>> {
    let order_id = services::pay_order(&state, &principal, &id).await?;
    Ok(Json(PaymentResponse {
        message: "Payment successful",
        order_id,
    }))
}
