use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware, Extension, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{admin::admin_handler, auth::auth_handler, public::public_handler},
    middleware::require_admin,
    services::images::PUBLIC_PREFIX,
    AppState,
};

pub fn create_routes(app_state: Arc<AppState>) -> Router {
    let body_limit = app_state.config.upload_limits.request_body_limit();

    let admin_routes = admin_handler()
        .route_layer(middleware::from_fn(require_admin))
        .merge(auth_handler())
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .merge(public_handler())
        .nest("/admin", admin_routes)
        .nest_service(
            PUBLIC_PREFIX,
            ServeDir::new(&app_state.config.public_upload_dir),
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, models::images::UploadLimits, repositories::memory::MemoryRepo};

    const BOUNDARY: &str = "school-board-boundary";

    struct TestApp {
        router: Router,
        state: Arc<AppState>,
        repo: Arc<MemoryRepo>,
        _dir: TempDir,
    }

    impl TestApp {
        async fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = Config {
                database_url: String::new(),
                database_max_connections: 1,
                session_secret: "router-test-secret".to_string(),
                session_max_age_hours: 24,
                port: 0,
                production: false,
                upload_dir: dir.path().join("uploads"),
                public_upload_dir: dir.path().join("public"),
                upload_limits: UploadLimits::default(),
            };
            let repo = Arc::new(MemoryRepo::with_categories(&[("General", "general")]));
            let state = Arc::new(AppState::new(config, repo.clone()));
            state.image_service.ensure_dirs().await.unwrap();

            Self {
                router: create_routes(state.clone()),
                state,
                repo,
                _dir: dir,
            }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn login(&self) -> String {
            self.state
                .auth_service
                .create_user("admin", "changeme", None)
                .await
                .unwrap();

            let response = self
                .send(
                    Request::post("/admin/login")
                        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                        .body(Body::from("username=admin&password=changeme"))
                        .unwrap(),
                )
                .await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/admin/dashboard");

            session_pair(&response)
        }
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    fn session_pair(response: &Response) -> String {
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("school.sid="));
        assert!(cookie.contains("HttpOnly"));
        cookie.split(';').next().unwrap().to_string()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn multipart_form(fields: &[(&str, &str)]) -> Body {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    #[tokio::test]
    async fn anonymous_admin_requests_are_redirected_or_refused() {
        let app = TestApp::new().await;

        let response = app
            .send(Request::get("/admin/dashboard").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin/login");

        let response = app
            .send(
                Request::post("/admin/reorder")
                    .header("X-Requested-With", "XMLHttpRequest")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Authentication required");
        assert_eq!(body["redirect"], "/admin/login");
    }

    #[tokio::test]
    async fn wrong_password_stays_on_login() {
        let app = TestApp::new().await;
        app.login().await;

        let response = app
            .send(
                Request::post("/admin/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=admin&password=wrong"))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(json_body(response).await["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn session_rolls_on_each_admin_request() {
        let app = TestApp::new().await;
        let cookie = app.login().await;

        let response = app
            .send(
                Request::get("/admin/dashboard")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let renewed = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(renewed.contains("Max-Age=86400"));
        assert!(renewed.contains("SameSite=Lax"));
        assert_eq!(json_body(response).await["username"], "admin");
    }

    #[tokio::test]
    async fn create_then_reorder_through_the_router() {
        let app = TestApp::new().await;
        let cookie = app.login().await;

        let mut ids = Vec::new();
        for title in ["Assembly", "Bake sale"] {
            let response = app
                .send(
                    Request::post("/admin/create")
                        .header(header::COOKIE, &cookie)
                        .header(header::ACCEPT, "application/json")
                        .header(
                            header::CONTENT_TYPE,
                            format!("multipart/form-data; boundary={BOUNDARY}"),
                        )
                        .body(multipart_form(&[
                            ("title", title),
                            ("content", "Details inside"),
                            ("category_id", "1"),
                        ]))
                        .unwrap(),
                )
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            let body = json_body(response).await;
            ids.push(body["id"].as_str().unwrap().to_string());
        }

        let response = app
            .send(
                Request::post("/admin/reorder")
                    .header(header::COOKIE, &cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(r#"{{"order": ["{}"]}}"#, ids[1])))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);

        let response = app
            .send(Request::get("/api/posts").body(Body::empty()).unwrap())
            .await;
        let body = json_body(response).await;
        let listed: Vec<_> = body["posts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|post| post["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(listed, vec![ids[1].clone(), ids[0].clone()]);
        assert_eq!(body["posts"][0]["categorySlug"], "general");
    }

    #[tokio::test]
    async fn invalid_reorder_and_form_are_bad_requests() {
        let app = TestApp::new().await;
        let cookie = app.login().await;

        for payload in [r#"{"order": []}"#, r#"{"order": "a,b"}"#, r#"{}"#] {
            let response = app
                .send(
                    Request::post("/admin/reorder")
                        .header(header::COOKIE, &cookie)
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(payload))
                        .unwrap(),
                )
                .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["error"], "Invalid post IDs array");
        }

        let response = app
            .send(
                Request::post("/admin/create")
                    .header(header::COOKIE, &cookie)
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(multipart_form(&[("title", "  "), ("content", "Kept text")]))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["errors"][0], "Title is required");
        assert_eq!(body["content"], "Kept text");
    }

    #[tokio::test]
    async fn public_routes_hide_missing_posts_and_redirect_empty_search() {
        let app = TestApp::new().await;

        let response = app
            .send(Request::get("/post/not-a-uuid").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .send(Request::get("/category/unknown").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .send(Request::get("/search").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let response = app
            .send(Request::get("/search?q=%20%20").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["posts"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn logout_clears_the_session_cookie() {
        let app = TestApp::new().await;
        let cookie = app.login().await;

        let response = app
            .send(
                Request::get("/admin/logout")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cleared.starts_with("school.sid=;"));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn cookie_replayed_after_logout_is_refused() {
        let app = TestApp::new().await;
        let cookie = app.login().await;

        let dashboard = || {
            Request::get("/admin/dashboard")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap()
        };
        let response = app.send(dashboard()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let rolled = session_pair(&response);

        app.send(
            Request::get("/admin/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        let response = app.send(dashboard()).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin/login");

        let response = app
            .send(
                Request::get("/admin/dashboard")
                    .header(header::COOKIE, &rolled)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin/login");
        assert_eq!(app.repo.session_count(), 0);
    }

    #[tokio::test]
    async fn deactivated_admin_loses_their_session() {
        let app = TestApp::new().await;
        let cookie = app.login().await;

        app.repo.set_user_active("admin", false);

        let response = app
            .send(
                Request::get("/admin/api/stats")
                    .header(header::COOKIE, &cookie)
                    .header(header::ACCEPT, "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["redirect"], "/admin/login");
    }
}
