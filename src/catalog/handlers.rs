use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    catalog::{
        dto::{ProductFilter, ProductQuery},
        repo_types::{CategoryCount, Product},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/categories", get(list_categories))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(q): Query<ProductQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let filter = ProductFilter::from(q);
    let products = state.products.list(&filter).await?;
    debug!(count = products.len(), "products listed");
    Ok(Json(products))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let not_found = || AppError::NotFound("Product not found".into());
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let product = state.products.find_by_id(id).await?.ok_or_else(not_found)?;
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<CategoryCount>>> {
    Ok(Json(state.products.category_counts().await?))
}
