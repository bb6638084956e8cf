use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, MessageResponse, PublicUser, RegisterRequest, UserSummary},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::User,
    },
    error::{AppError, AppResult},
    state::AppState,
};

const BAD_CREDENTIALS: &str = "Incorrect email or password";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Lower-cases the domain only; the local part is matched exactly.
fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<Json<MessageResponse>> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(AppError::BadRequest("Password too short".into()));
    }

    // Ensure email is not taken
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        email: payload.email,
        password_hash: hash_password(&payload.password)?,
        full_name: payload.full_name.trim().to_string(),
        address: payload.address,
        phone: payload.phone,
        is_admin: false,
        created_at: OffsetDateTime::now_utc(),
    };
    // A concurrent registration may have taken the email since the check above.
    if !state.users.insert(&user).await? {
        warn!(email = %user.email, "email registered concurrently");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(MessageResponse {
        message: "User registered successfully",
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let email = normalize_email(&payload.email);

    // Unknown email and wrong password must be indistinguishable to the caller.
    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign(&user.email)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
        user: UserSummary::from(&user),
    }))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(principal): AuthUser) -> Json<PublicUser> {
    Json(PublicUser::from(principal.user()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use std::sync::Arc;

    use crate::{app::build_app, auth::repo::UserStore, memory::MemoryUserStore};

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.expect("router responds");
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn registration(email: &str) -> Value {
        json!({
            "email": email,
            "password": "TestPass123!",
            "full_name": "Test User",
            "address": "123 Campus Drive",
            "phone": "555-0123"
        })
    }

    #[test]
    fn normalization_keeps_local_part() {
        assert_eq!(normalize_email("  Foo.Bar@Example.COM "), "Foo.Bar@example.com");
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }

    #[tokio::test]
    async fn register_then_login() {
        let app = build_app(AppState::fake());

        let (status, body) = call(app.clone(), post_json("/api/register", registration("New@Example.com"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User registered successfully");

        let (status, body) = call(
            app.clone(),
            post_json("/api/login", json!({"email": "New@EXAMPLE.com", "password": "TestPass123!"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["user"]["email"], "New@example.com");
        assert_eq!(body["user"]["is_admin"], false);
        let token = body["access_token"].as_str().expect("token").to_string();

        let req = Request::get("/api/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["full_name"], "Test User");
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let app = build_app(AppState::fake());
        let (status, _) = call(app.clone(), post_json("/api/register", registration("dup@example.com"))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(app, post_json("/api/register", registration("dup@example.com"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Email already registered");
    }

    #[tokio::test]
    async fn bad_credentials_look_identical() {
        let app = build_app(AppState::fake());
        call(app.clone(), post_json("/api/register", registration("who@example.com"))).await;

        let wrong_password = call(
            app.clone(),
            post_json("/api/login", json!({"email": "who@example.com", "password": "WrongPass999"})),
        )
        .await;
        let unknown_email = call(
            app,
            post_json("/api/login", json!({"email": "nobody@example.com", "password": "TestPass123!"})),
        )
        .await;

        assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password, unknown_email);
    }

    #[tokio::test]
    async fn me_rejects_missing_and_bogus_tokens() {
        let app = build_app(AppState::fake());

        let (status, missing) = call(app.clone(), Request::get("/api/me").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::get("/api/me")
            .header(header::AUTHORIZATION, "Bearer garbage")
            .body(Body::empty())
            .unwrap();
        let (status, bogus) = call(app.clone(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(missing, bogus);

        // Valid signature, but the subject was never registered.
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign("ghost@example.com").unwrap();
        let req = Request::get("/api/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, ghost) = call(build_app(state), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(missing, ghost);
    }

    #[tokio::test]
    async fn local_part_case_distinguishes_accounts() {
        let app = build_app(AppState::fake());
        let (status, _) = call(app.clone(), post_json("/api/register", registration("Foo@x.com"))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(app.clone(), post_json("/api/register", registration("foo@x.com"))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            app,
            post_json("/api/login", json!({"email": "FOO@x.com", "password": "TestPass123!"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    /// Always reports "not registered" so the insert sees the duplicate.
    struct StaleLookup(MemoryUserStore);

    #[async_trait::async_trait]
    impl UserStore for StaleLookup {
        async fn find_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn insert(&self, user: &User) -> anyhow::Result<bool> {
            self.0.insert(user).await
        }
    }

    #[tokio::test]
    async fn duplicate_detected_at_insert_is_a_conflict() {
        let state = AppState {
            users: Arc::new(StaleLookup(MemoryUserStore::default())),
            ..AppState::fake()
        };
        let app = build_app(state);
        let (status, _) = call(app.clone(), post_json("/api/register", registration("race@example.com"))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(app, post_json("/api/register", registration("race@example.com"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Email already registered");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_yield_one_account() {
        let app = build_app(AppState::fake());
        let calls: Vec<_> = (0..8)
            .map(|_| {
                let app = app.clone();
                tokio::spawn(async move {
                    call(app, post_json("/api/register", registration("burst@example.com"))).await.0
                })
            })
            .collect();

        let mut codes = Vec::new();
        for c in calls {
            codes.push(c.await.expect("task"));
        }
        assert_eq!(codes.iter().filter(|s| **s == StatusCode::OK).count(), 1, "{codes:?}");
        assert!(codes.iter().all(|s| *s == StatusCode::OK || *s == StatusCode::BAD_REQUEST), "{codes:?}");
    }
}
