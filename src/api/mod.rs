//! HTTP API.
//!
//! Public routes live under `/api`, admin routes under `/api/admin` behind Basic
//! authentication. Stored candidate images are served from `/uploads/candidates`.

/// Basic authentication for admin routes
pub mod auth;
mod error;
/// Request handlers grouped by resource
pub mod handlers;

pub use error::{Params, Payload};

use crate::{config::AppConfig, core::images::ImageStore, errors::Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use handlers::{candidates, categories, codes, event, public, results};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Runtime settings
    pub config: Arc<AppConfig>,
    /// Candidate image storage
    pub images: ImageStore,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let images = ImageStore::new(config.upload_dir.clone());
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            images,
        }
    }
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(public::health))
        .route("/event-state", get(public::event_state))
        .route("/validate-code", post(public::validate_code))
        .route("/nominate", post(public::nominate))
        .route("/vote", post(public::vote))
        .route("/categories", get(public::list_categories))
        .route("/candidates", get(public::list_candidates))
        .route("/winners", get(public::list_winners))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/login", post(event::login))
        .route(
            "/event-state",
            get(event::get_event_state).put(event::set_event_state),
        )
        .route(
            "/categories",
            get(categories::list)
                .post(categories::create)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route(
            "/categories/selected-candidates",
            get(categories::selected_candidates),
        )
        .route(
            "/categories/select-candidates",
            post(categories::select_candidates),
        )
        .route(
            "/candidates",
            get(candidates::list)
                .post(candidates::create)
                .put(candidates::update)
                .delete(candidates::delete),
        )
        .route("/candidates/import", post(candidates::import))
        .route("/nominations", get(results::nominations))
        .route("/votes", get(results::votes))
        .route("/results", get(results::category_results))
        .route("/publish-winner", post(results::publish_winner))
        .route("/import-codes", post(codes::import))
        .route("/codes", get(codes::list))
        .route("/codes/stats", get(codes::stats))
        .route("/presentation-data", get(results::presentation))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%origin, "Ignoring invalid CORS origin: {e}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let api = public_routes().nest("/admin", admin_routes(&state));

    Router::new()
        .route("/health", get(public::health))
        .nest("/api", api)
        .nest_service(
            crate::core::images::PUBLIC_PREFIX,
            ServeDir::new(state.images.dir()),
        )
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> Result<()> {
    let address = state.config.bind_addr;
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{
            categories::{CategoryChanges, update_category},
            codes as member_codes,
            event as stage, finalists,
        },
        entities::EventStage,
        errors::Result,
        test_utils::{
            build_xlsx, create_test_candidate, create_test_category, insert_test_vote,
            setup_test_db, test_config,
        },
    };
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn test_state() -> Result<AppState> {
        let db = setup_test_db().await?;
        Ok(AppState::new(db, test_config()))
    }

    fn admin_auth() -> String {
        format!("Basic {}", STANDARD.encode("admin:secret"))
    }

    fn json_request(method: Method, uri: &str, body: &Value, admin: bool) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if admin {
            builder = builder.header(header::AUTHORIZATION, admin_auth());
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, admin: bool) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if admin {
            builder = builder.header(header::AUTHORIZATION, admin_auth());
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health() -> Result<()> {
        let state = test_state().await?;
        let (status, body) = send(&state, get_request("/api/health", false)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_routes_require_credentials() -> Result<()> {
        let state = test_state().await?;

        let (status, body) = send(&state, get_request("/api/admin/codes", false)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");

        let wrong = Request::builder()
            .method(Method::POST)
            .uri("/api/admin/login")
            .header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode("admin:wrong")),
            )
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&state, wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            send(&state, json_request(Method::POST, "/api/admin/login", &json!({}), true)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        Ok(())
    }

    #[tokio::test]
    async fn test_nomination_flow_consumes_code() -> Result<()> {
        let state = test_state().await?;
        let best = create_test_category(state.db.as_ref(), "Best Member", 1).await?;
        let helpful = create_test_category(state.db.as_ref(), "Most Helpful", 2).await?;
        let alice = create_test_candidate(state.db.as_ref(), "Alice").await?;
        let bob = create_test_candidate(state.db.as_ref(), "Bob").await?;

        let (status, body) = send(
            &state,
            json_request(
                Method::POST,
                "/api/admin/import-codes",
                &json!({ "codes": ["CONDOR001", "condor002", "CONDOR001"] }),
                true,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 2);

        let ballot = json!({
            "code": "CONDOR001",
            "nominations": [
                { "category_id": best.id, "candidate_id": alice.id },
                { "category_id": helpful.id, "candidate_id": bob.id },
            ],
        });

        // Still in SETUP
        let (status, body) =
            send(&state, json_request(Method::POST, "/api/nominate", &ballot, false)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("SETUP"));

        let (status, _) = send(
            &state,
            json_request(
                Method::PUT,
                "/api/admin/event-state",
                &json!({ "state": "NOMINATIONS" }),
                true,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(&state, json_request(Method::POST, "/api/nominate", &ballot, false)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["recorded"], 2);

        let (status, body) =
            send(&state, json_request(Method::POST, "/api/nominate", &ballot, false)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("already used"));

        let (status, body) = send(&state, get_request("/api/admin/nominations", true)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_vote_for_non_finalist_is_rejected() -> Result<()> {
        let state = test_state().await?;
        let category = create_test_category(state.db.as_ref(), "Best Member", 1).await?;
        let alice = create_test_candidate(state.db.as_ref(), "Alice").await?;
        let bob = create_test_candidate(state.db.as_ref(), "Bob").await?;
        finalists::select_finalists(state.db.as_ref(), category.id, &[alice.id], 5).await?;
        member_codes::import_codes(state.db.as_ref(), &["CONDOR001"]).await?;
        stage::set_event_state(state.db.as_ref(), EventStage::Voting, None).await?;

        let ballot = json!({
            "code": "CONDOR001",
            "votes": [{ "category_id": category.id, "candidate_id": bob.id }],
        });
        let (status, body) =
            send(&state, json_request(Method::POST, "/api/vote", &ballot, false)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("not a finalist"));

        // The failed ballot did not consume the code
        let ballot = json!({
            "code": "CONDOR001",
            "votes": [{ "category_id": category.id, "candidate_id": alice.id }],
        });
        let (status, body) =
            send(&state, json_request(Method::POST, "/api/vote", &ballot, false)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recorded"], 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_code_reports_in_body() -> Result<()> {
        let state = test_state().await?;
        member_codes::import_codes(state.db.as_ref(), &["CONDOR001"]).await?;
        stage::set_event_state(state.db.as_ref(), EventStage::Nominations, None).await?;

        let (status, body) = send(
            &state,
            json_request(
                Method::POST,
                "/api/validate-code",
                &json!({ "code": " condor001 " }),
                false,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["state"], "NOMINATIONS");

        let (status, body) = send(
            &state,
            json_request(
                Method::POST,
                "/api/validate-code",
                &json!({ "code": "NOPE" }),
                false,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
        assert!(body["error"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_code_listing_is_censored() -> Result<()> {
        let state = test_state().await?;
        member_codes::import_codes(state.db.as_ref(), &["CONDOR001"]).await?;

        let (status, body) = send(&state, get_request("/api/admin/codes", true)).await;
        assert_eq!(status, StatusCode::OK);
        let listed = body[0]["code"].as_str().unwrap();
        assert_ne!(listed, "CONDOR001");
        assert!(listed.contains('*'));

        let (_, stats) = send(&state, get_request("/api/admin/codes/stats", true)).await;
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["unused"], 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_winner_and_clear() -> Result<()> {
        let state = test_state().await?;
        let category = create_test_category(state.db.as_ref(), "Best Member", 1).await?;
        let alice = create_test_candidate(state.db.as_ref(), "Alice").await?;

        let (status, body) = send(
            &state,
            json_request(
                Method::POST,
                "/api/admin/publish-winner",
                &json!({ "category_id": category.id, "candidate_id": alice.id, "announce": true }),
                true,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["winner_candidate_id"], alice.id);
        assert_eq!(body["winner_announced"], true);

        let (_, winners) = send(&state, get_request("/api/winners", false)).await;
        assert_eq!(winners.as_array().unwrap().len(), 1);
        assert_eq!(winners[0]["candidate_name"], "Alice");

        let (status, body) = send(
            &state,
            json_request(
                Method::POST,
                "/api/admin/publish-winner",
                &json!({ "category_id": category.id, "candidate_id": null }),
                true,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["winner_candidate_id"], Value::Null);
        assert_eq!(body["winner_announced"], false);

        let (_, winners) = send(&state, get_request("/api/winners", false)).await;
        assert!(winners.as_array().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() -> Result<()> {
        let state = test_state().await?;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/vote")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_candidate_with_multipart_image() -> Result<()> {
        let state = test_state().await?;
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"display_name\"\r\n\r\n\
             Alice\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"image\"; filename=\"alice.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             fake png\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/admin/candidates")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header(header::AUTHORIZATION, admin_auth())
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display_name"], "Alice");
        let url = body["profile_image_url"].as_str().unwrap();
        assert!(url.starts_with("/uploads/candidates/"));

        let (status, _) = send(&state, get_request(url, false)).await;
        assert_eq!(status, StatusCode::OK);
        Ok(())
    }

    fn multipart_request(uri: &str, part: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let mut body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"{part}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header(header::AUTHORIZATION, admin_auth())
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_candidate_import_upload() -> Result<()> {
        let state = test_state().await?;
        let xlsx = build_xlsx(&[&["Nombre", "Activo"], &["Alice", "si"], &["Bob", "no"], &[""]]);

        let (status, body) = send(
            &state,
            multipart_request("/api/admin/candidates/import", "file", "miembros.xlsx", &xlsx),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 2);
        assert_eq!(body["total"], 2);
        assert_eq!(body["images_linked"], 0);

        let (_, public) = send(&state, get_request("/api/candidates", false)).await;
        let names: Vec<_> = public
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["display_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Alice"]);

        let (status, _) = send(
            &state,
            multipart_request("/api/admin/candidates/import", "file", "notes.txt", b"hello"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_public_categories_with_candidates() -> Result<()> {
        let state = test_state().await?;
        let best = create_test_category(state.db.as_ref(), "Best Member", 1).await?;
        let retired = create_test_category(state.db.as_ref(), "Retired Award", 2).await?;
        update_category(
            state.db.as_ref(),
            retired.id,
            CategoryChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;
        let alice = create_test_candidate(state.db.as_ref(), "Alice").await?;
        finalists::select_finalists(state.db.as_ref(), best.id, &[alice.id], 5).await?;

        let (status, body) = send(
            &state,
            get_request("/api/categories?active=true&withCandidates=true", false),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let listed = body.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["name"], "Best Member");
        assert_eq!(
            listed[0]["candidates"],
            json!([{ "id": alice.id, "display_name": "Alice", "profile_image_url": null }])
        );

        let (_, body) = send(&state, get_request("/api/categories", false)).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert!(body[0].get("candidates").is_none());

        let (status, _) = send(&state, get_request("/api/categories?active=maybe", false)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_results_and_presentation() -> Result<()> {
        let state = test_state().await?;
        let category = create_test_category(state.db.as_ref(), "Best Member", 1).await?;
        let alice = create_test_candidate(state.db.as_ref(), "Alice").await?;
        let bob = create_test_candidate(state.db.as_ref(), "Bob").await?;
        finalists::select_finalists(state.db.as_ref(), category.id, &[alice.id, bob.id], 5).await?;
        insert_test_vote(state.db.as_ref(), category.id, bob.id).await?;
        insert_test_vote(state.db.as_ref(), category.id, bob.id).await?;
        insert_test_vote(state.db.as_ref(), category.id, alice.id).await?;

        let (status, body) = send(&state, get_request("/api/admin/results", true)).await;
        assert_eq!(status, StatusCode::OK);
        let result = &body[0];
        assert_eq!(result["leading_candidate_id"], bob.id);
        assert_eq!(result["winner_candidate_id"], Value::Null);
        assert_eq!(result["candidates"][0]["candidate_name"], "Bob");
        assert_eq!(result["candidates"][0]["votes"], 2);
        assert_eq!(result["candidates"][1]["votes"], 1);

        // Nothing is announced yet
        let (status, body) = send(&state, get_request("/api/admin/presentation-data", true)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());

        let (status, _) = send(
            &state,
            json_request(
                Method::POST,
                "/api/admin/publish-winner",
                &json!({ "category_id": category.id, "candidate_id": bob.id, "announce": true }),
                true,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&state, get_request("/api/admin/presentation-data", true)).await;
        let slides = body.as_array().unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0]["category_name"], "Best Member");
        assert_eq!(slides[0]["nominees"].as_array().unwrap().len(), 2);
        assert_eq!(slides[0]["winner"]["candidate_name"], "Bob");
        assert_eq!(slides[0]["winner"]["votes"], 2);
        Ok(())
    }
}
