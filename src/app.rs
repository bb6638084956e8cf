use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{admin, auth, catalog, orders};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(catalog::router())
                .merge(orders::router())
                .merge(admin::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8001".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use time::OffsetDateTime;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{
        auth::{password::hash_password, repo_types::User},
        catalog::seed::seed_if_empty,
    };

    struct Client {
        app: Router,
        token: Option<String>,
    }

    impl Client {
        async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(token) = &self.token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let req = match body {
                Some(b) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(b.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();
            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }
    }

    async fn login(state: &AppState, email: &str, is_admin: bool) -> Client {
        state
            .users
            .insert(&User {
                id: Uuid::new_v4(),
                email: email.into(),
                password_hash: hash_password("TestPass123!").unwrap(),
                full_name: email.into(),
                address: String::new(),
                phone: String::new(),
                is_admin,
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();
        let anon = Client {
            app: build_app(state.clone()),
            token: None,
        };
        let (status, body) = anon
            .send(
                Method::POST,
                "/api/login",
                Some(json!({"email": email, "password": "TestPass123!"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        Client {
            app: build_app(state.clone()),
            token: body["access_token"].as_str().map(str::to_string),
        }
    }

    async fn seeded() -> AppState {
        let state = AppState::fake();
        seed_if_empty(state.products.as_ref()).await.unwrap();
        state
    }

    async fn product_id(client: &Client, name: &str) -> String {
        let (_, products) = client
            .send(Method::GET, &format!("/api/products?search={}", name.replace(' ', "%20")), None)
            .await;
        products[0]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health() {
        let client = Client {
            app: build_app(AppState::fake()),
            token: None,
        };
        let res = client
            .app
            .clone()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn order_checkout_and_payment() {
        let state = seeded().await;
        let shopper = login(&state, "shopper@example.com", false).await;
        let bananas = product_id(&shopper, "Fresh Bananas").await;
        let veg = product_id(&shopper, "Mixed Vegetables").await;

        let (status, order) = shopper
            .send(
                Method::POST,
                "/api/orders",
                Some(json!({
                    "items": [
                        {"product_id": bananas, "quantity": 2},
                        {"product_id": veg, "quantity": 1}
                    ],
                    "delivery_address": "123 Campus Drive"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["status"], "pending");
        assert_eq!(order["subtotal"], 10.97);
        assert_eq!(order["service_fee"], 0.55);
        assert_eq!(order["transportation_fee"], 2.99);
        assert_eq!(order["total"], 14.51);
        assert_eq!(order["items"][0]["name"], "Fresh Bananas");
        let id = order["id"].as_str().unwrap().to_string();

        let (status, list) = shopper.send(Method::GET, "/api/orders", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, paid) = shopper
            .send(Method::POST, &format!("/api/orders/{id}/pay"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(paid["message"], "Payment successful");
        assert_eq!(paid["order_id"], id.as_str());

        let (status, again) = shopper
            .send(Method::POST, &format!("/api/orders/{id}/pay"), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(again["detail"], "Order already processed");

        let (_, fetched) = shopper.send(Method::GET, &format!("/api/orders/{id}"), None).await;
        assert_eq!(fetched["status"], "paid");
    }

    #[tokio::test]
    async fn unknown_product_returns_404_naming_it() {
        let state = seeded().await;
        let shopper = login(&state, "shopper@example.com", false).await;
        let (status, body) = shopper
            .send(
                Method::POST,
                "/api/orders",
                Some(json!({
                    "items": [{"product_id": "invalid-product-id", "quantity": 1}],
                    "delivery_address": "Dorm 101"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Product invalid-product-id not found");
        let (_, list) = shopper.send(Method::GET, "/api/orders", None).await;
        assert!(list.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn orders_require_auth_and_hide_foreign_orders() {
        let state = seeded().await;
        let anon = Client {
            app: build_app(state.clone()),
            token: None,
        };
        let (status, _) = anon.send(Method::GET, "/api/orders", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let owner = login(&state, "owner@example.com", false).await;
        let stranger = login(&state, "stranger@example.com", false).await;
        let bread = product_id(&owner, "Fresh Bread").await;
        let (_, order) = owner
            .send(
                Method::POST,
                "/api/orders",
                Some(json!({"items": [{"product_id": bread, "quantity": 1}], "delivery_address": "x"})),
            )
            .await;
        let id = order["id"].as_str().unwrap();

        let (status, _) = stranger.send(Method::GET, &format!("/api/orders/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = stranger.send(Method::POST, &format!("/api/orders/{id}/pay"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_endpoints_require_admin() {
        let state = seeded().await;
        let shopper = login(&state, "shopper@example.com", false).await;
        let (status, body) = shopper.send(Method::GET, "/api/admin/orders", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], "Admin access required");

        let (status, _) = shopper
            .send(Method::DELETE, &format!("/api/admin/products/{}", Uuid::new_v4()), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_manages_orders() {
        let state = seeded().await;
        let shopper = login(&state, "shopper@example.com", false).await;
        let admin = login(&state, "admin@example.com", true).await;
        let bread = product_id(&shopper, "Fresh Bread").await;
        let (_, order) = shopper
            .send(
                Method::POST,
                "/api/orders",
                Some(json!({"items": [{"product_id": bread, "quantity": 3}], "delivery_address": "x"})),
            )
            .await;
        let id = order["id"].as_str().unwrap();

        let (status, all) = admin.send(Method::GET, "/api/admin/orders", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 1);

        let (status, body) = admin
            .send(Method::PUT, &format!("/api/admin/orders/{id}/status?status=delivered"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Order status updated");
        let (_, fetched) = shopper.send(Method::GET, &format!("/api/orders/{id}"), None).await;
        assert_eq!(fetched["status"], "delivered");

        let (status, _) = admin
            .send(
                Method::PUT,
                &format!("/api/admin/orders/{id}/status"),
                Some(json!({"status": "cancelled"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (_, fetched) = shopper.send(Method::GET, &format!("/api/orders/{id}"), None).await;
        assert_eq!(fetched["status"], "cancelled");

        let (status, _) = admin
            .send(Method::PUT, &format!("/api/admin/orders/{id}/status"), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_status_on_missing_order_still_succeeds() {
        let state = seeded().await;
        let admin = login(&state, "admin@example.com", true).await;
        let (status, body) = admin
            .send(
                Method::PUT,
                &format!("/api/admin/orders/{}/status?status=shipped", Uuid::new_v4()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Order status updated");
        assert!(state.orders.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_manages_catalog() {
        let state = seeded().await;
        let admin = login(&state, "admin@example.com", true).await;
        let milk = json!({
            "name": "Whole Milk",
            "description": "Fresh whole milk",
            "price": 1.99,
            "category": "dairy",
            "image_url": "https://example.com/milk.jpg"
        });

        let (status, created) = admin.send(Method::POST, "/api/admin/products", Some(milk.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["stock"], 100);
        let id = created["id"].as_str().unwrap().to_string();

        let mut pricier = milk.clone();
        pricier["price"] = json!(2.49);
        let (status, body) = admin
            .send(Method::PUT, &format!("/api/admin/products/{id}"), Some(pricier))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Product updated");
        let (_, fetched) = admin.send(Method::GET, &format!("/api/products/{id}"), None).await;
        assert_eq!(fetched["price"], 2.49);

        let mut negative = milk;
        negative["price"] = json!(-1.0);
        let (status, _) = admin.send(Method::POST, "/api/admin/products", Some(negative)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = admin
            .send(Method::DELETE, &format!("/api/admin/products/{id}"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Product deleted");
        let (status, _) = admin.send(Method::GET, &format!("/api/products/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
