use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, error::AppError, images, state::AppState};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(images::router())
                .route("/health", get(health)),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Image Generator API is running" }))
}

/// Fails while the credential store is unreachable or the search provider
/// has no credential.
async fn health(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.users.ping().await?;
    state.search.ensure_configured()?;
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::search::SearchProxy;
    use crate::testing::StubProvider;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register(app: &Router, name: &str, email: &str) -> (String, String) {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": name, "email": email, "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["userId"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn generate_history_delete_scenario() {
        let app = build_app(AppState::fake());
        let (_, ada) = register(&app, "Ada", "ada@x.com").await;
        let (_, bob) = register(&app, "Bob", "bob@x.com").await;

        let (status, created) = call(
            &app,
            Method::POST,
            "/api/images/generate",
            Some(&ada),
            Some(json!({ "prompt": "mountains" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(!created["imageUrl"].as_str().unwrap().is_empty());
        assert_eq!(created["prompt"], "mountains");
        assert!(created.get("userId").is_none());
        assert!(created.get("createdAt").is_some());
        let id = created["id"].as_str().unwrap().to_string();

        let (status, history) = call(&app, Method::GET, "/api/images/history", Some(&ada), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["id"], id.as_str());

        let (status, bob_history) = call(&app, Method::GET, "/api/images/history", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(bob_history.as_array().unwrap().is_empty());

        let uri = format!("/api/images/{id}");
        let (status, _) = call(&app, Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, Method::DELETE, &uri, Some(&ada), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Image deleted successfully");

        let (_, history) = call(&app, Method::GET, "/api/images/history", Some(&ada), None).await;
        assert!(history.as_array().unwrap().is_empty());

        let (status, _) = call(&app, Method::DELETE, &uri, Some(&ada), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn zero_matches_is_404_and_nothing_is_stored() {
        let stub = Arc::new(StubProvider::default().with_miss("zzzznotarealthing"));
        let app = build_app(AppState::fake_with_provider(stub));
        let (_, token) = register(&app, "Ada", "ada@x.com").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/images/generate",
            Some(&token),
            Some(json!({ "prompt": "zzzznotarealthing" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].is_string());

        let (_, history) = call(&app, Method::GET, "/api/images/history", Some(&token), None).await;
        assert!(history.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn protected_routes_require_a_valid_token() {
        let app = build_app(AppState::fake());
        for (method, uri) in [
            (Method::GET, "/api/images/history"),
            (Method::POST, "/api/images/generate"),
            (Method::DELETE, "/api/images/6f1c0d2e-8d4b-4a55-9d55-0b8f4f7c2a10"),
            (Method::GET, "/api/auth/me"),
            (Method::POST, "/api/auth/logout"),
        ] {
            let (status, _) = call(&app, method.clone(), uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            let (status, _) = call(&app, method.clone(), uri, Some("forged"), None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn register_login_me_and_logout() {
        let app = build_app(AppState::fake());
        let (user_id, _) = register(&app, "Ada", "ada@x.com").await;

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ada", "email": "ada@x.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, wrong) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@x.com", "password": "wrong-one" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, unknown) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@x.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@x.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], user_id.as_str());
        let token = body["token"].as_str().unwrap().to_string();

        let (status, me) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], user_id.as_str());
        assert_eq!(me["name"], "Ada");
        assert!(me.get("password_hash").is_none());

        let (status, _) = call(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_input_is_400() {
        let app = build_app(AppState::fake());
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "ada@x.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ada", "email": "ada@x.com", "password": "12345" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, token) = register(&app, "Ada", "ada@x.com").await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/images/generate",
            Some(&token),
            Some(json!({ "prompt": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::DELETE, "/api/images/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn owner_cannot_be_smuggled_in_the_body() {
        let app = build_app(AppState::fake());
        let (ada_id, _) = register(&app, "Ada", "ada@x.com").await;
        let (_, bob) = register(&app, "Bob", "bob@x.com").await;

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/images/generate",
            Some(&bob),
            Some(json!({ "prompt": "rivers", "userId": ada_id, "ownerId": ada_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, bob_history) = call(&app, Method::GET, "/api/images/history", Some(&bob), None).await;
        assert_eq!(bob_history.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn health_reports_missing_provider_credential() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let app = build_app(AppState::fake_with_search(SearchProxy::unconfigured()));
        let (status, _) = call(&app, Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (_, token) = register(&app, "Ada", "ada@x.com").await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/images/generate",
            Some(&token),
            Some(json!({ "prompt": "mountains" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn root_reports_running() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Image Generator API is running");
    }
}
