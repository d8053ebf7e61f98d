use std::sync::Arc;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Form, Json, Router,
};
use validator::Validate;

use crate::{
    errors::INVALID_CREDENTIALS,
    middleware::{
        clear_session_cookie, current_session, session_cookie, set_cookie, wants_json,
    },
    models::{response::Response as ApiResponse, users::LoginUserDto, views::LoginView},
    AppState, Error, Result,
};

pub const DASHBOARD_PATH: &str = "/admin/dashboard";

pub fn auth_handler() -> Router {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

pub async fn login_page(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if current_session(&app_state, &headers).await.is_some() {
        return Redirect::to(DASHBOARD_PATH).into_response();
    }

    Json(LoginView { error: None }).into_response()
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Form(credentials): Form<LoginUserDto>,
) -> Result<Response> {
    if credentials.validate().is_err() {
        let view = LoginView {
            error: Some("Username and password are required".to_string()),
        };
        return Ok((StatusCode::BAD_REQUEST, Json(view)).into_response());
    }

    let identity = match app_state
        .auth_service
        .authenticate(&credentials.username, &credentials.password)
        .await
    {
        Ok(identity) => identity,
        Err(Error::InvalidCredentials) => {
            let view = LoginView {
                error: Some(INVALID_CREDENTIALS.to_string()),
            };
            return Ok((StatusCode::UNAUTHORIZED, Json(view)).into_response());
        }
        Err(err) => return Err(err),
    };

    let token = app_state.auth_service.start_session(identity).await?;

    let mut response = if wants_json(&headers) {
        Json(ApiResponse::ok()).into_response()
    } else {
        Redirect::to(DASHBOARD_PATH).into_response()
    };
    set_cookie(&mut response, session_cookie(token, &app_state.config));

    Ok(response)
}

pub async fn logout(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if let Some(session) = current_session(&app_state, &headers).await {
        app_state.auth_service.logout(&session).await;
    }

    let mut response = Redirect::to("/").into_response();
    set_cookie(&mut response, clear_session_cookie());

    response
}
