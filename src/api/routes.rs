use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tower_http::cors::CorsLayer;

use crate::auth::{
    api as auth_api,
    middleware::{ADMINS, READERS},
    access_gate, AccessGate, AuthState, Authenticator, IdentityStore, JwtHandler, TokenConfig,
};
use crate::books::{api as books_api, BookState, BookStore, ExternalBookService};
use crate::middleware::request_logging;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub books: BookState,
    pub jwt_handler: Arc<JwtHandler>,
}

impl AppState {
    /// Wire the collaborators together around one immutable token config
    pub fn new(
        identity_store: Arc<dyn IdentityStore>,
        book_store: Arc<BookStore>,
        token_config: &TokenConfig,
        external_delay: Duration,
    ) -> Self {
        let jwt_handler = Arc::new(JwtHandler::new(token_config));
        let authenticator = Arc::new(Authenticator::new(identity_store, jwt_handler.clone()));

        Self {
            auth: AuthState::new(authenticator),
            books: BookState {
                store: book_store,
                external: Arc::new(ExternalBookService::new(external_delay)),
            },
            jwt_handler,
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    // Public auth routes
    let auth_router = Router::new()
        .route("/api/auth/register", post(auth_api::register))
        .route("/api/auth/login", post(auth_api::login))
        .with_state(state.auth.clone());

    // User + Admin
    let reader_routes = Router::new()
        .route("/api/auth/me", get(auth_api::get_current_user))
        .route("/api/auth/user", get(auth_api::user_endpoint))
        .route("/api/books", get(books_api::list_books))
        .route(
            "/api/books/grouped-by-author",
            get(books_api::books_grouped_by_author),
        )
        .route("/api/books/top-borrowed", get(books_api::top_borrowed_books))
        .route("/api/books/:id", get(books_api::get_book))
        .route(
            "/api/books/:id/external-details",
            get(books_api::external_details),
        )
        .route_layer(middleware::from_fn_with_state(
            AccessGate::new(state.jwt_handler.clone(), READERS),
            access_gate,
        ))
        .with_state(state.books.clone());

    // Admin only
    let admin_routes = Router::new()
        .route("/api/auth/admin", get(auth_api::admin_endpoint))
        .route("/api/books", post(books_api::create_book))
        .route(
            "/api/books/:id",
            axum::routing::put(books_api::update_book).delete(books_api::delete_book),
        )
        .route_layer(middleware::from_fn_with_state(
            AccessGate::new(state.jwt_handler.clone(), ADMINS),
            access_gate,
        ))
        .with_state(state.books.clone());

    let public_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(public_routes)
        .merge(auth_router)
        .merge(reader_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{models::LoginResponse, SqliteIdentityStore};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::new(
            Arc::new(SqliteIdentityStore::in_memory().unwrap()),
            Arc::new(BookStore::in_memory().unwrap()),
            &TokenConfig::new("test-secret-key-0123456789abcdef", 1),
            Duration::from_millis(1),
        );
        create_router(state)
    }

    fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register_and_login(app: &Router, email: &str, role: &str) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({"fullName": "Test", "email": email, "password": "Secret123", "role": role}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({"email": email, "password": "Secret123"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let login: LoginResponse = serde_json::from_value(body_json(response).await).unwrap();
        login.token
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = app().oneshot(get_request("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_register_validation_and_conflict() {
        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({"fullName": "NoPass", "email": "a@x.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({"email": "a@x.com", "password": "pw", "role": "Librarian"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        register_and_login(&app, "a@x.com", "User").await;

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({"email": "a@x.com", "password": "Other456", "role": "User"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "User already exists");
    }

    #[tokio::test]
    async fn test_login_missing_fields_is_bad_request() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({"email": "a@x.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_undecodable_login_body_is_bad_request() {
        let app = app();

        // Wrong field type
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({"email": 5, "password": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());

        // Truncated JSON
        let truncated = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email": "a@x.com""#))
            .unwrap();
        let response = app.clone().oneshot(truncated).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());

        // No content type
        let untyped = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/register")
            .body(Body::from(r#"{"email": "a@x.com", "password": "pw"}"#))
            .unwrap();
        let response = app.oneshot(untyped).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_undecodable_book_body_is_bad_request() {
        let app = app();
        let admin = register_and_login(&app, "root@x.com", "Admin").await;

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/books",
                Some(&admin),
                json!({"title": "Dune", "author": "Frank Herbert", "isbn": "x", "yearPublished": "soon"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_books_require_token() {
        let response = app()
            .oneshot(get_request("/api/books", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_catalog_roles() {
        let app = app();
        let admin = register_and_login(&app, "root@x.com", "Admin").await;
        let user = register_and_login(&app, "reader@x.com", "User").await;

        let book = json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "isbn": "9780441013593",
            "yearPublished": 1965,
            "timesBorrowed": 5
        });

        // Readers cannot write
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/books", Some(&user), book.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/books", Some(&admin), book))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        let id = created["id"].as_i64().unwrap();

        // Readers can read
        let response = app
            .clone()
            .oneshot(get_request(&format!("/api/books/{}", id), Some(&user)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["title"], "Dune");

        let response = app
            .clone()
            .oneshot(get_request("/api/books/top-borrowed", Some(&user)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(get_request("/api/books/grouped-by-author", Some(&user)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await[0]["author"], "Frank Herbert");

        let response = app
            .clone()
            .oneshot(get_request(
                &format!("/api/books/{}/external-details", id),
                Some(&user),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["reviewSource"], "External API");

        // Update and delete are admin-only
        let change = json!({
            "title": "Dune Messiah",
            "author": "Frank Herbert",
            "isbn": "9780593098233",
            "yearPublished": 1969
        });
        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/books/{}", id),
                Some(&user),
                change.clone(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/books/{}", id),
                Some(&admin),
                change,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let delete = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/books/{}", id))
            .header(header::AUTHORIZATION, format!("Bearer {}", admin))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(get_request(&format!("/api/books/{}", id), Some(&user)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_me_reflects_token() {
        let app = app();
        let token = register_and_login(&app, "me@x.com", "User").await;

        let response = app
            .oneshot(get_request("/api/auth/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let me = body_json(response).await;
        assert_eq!(me["email"], "me@x.com");
        assert_eq!(me["role"], "User");
    }
}
