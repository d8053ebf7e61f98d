use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use serde_json::json;
use tower_cookies::{cookie::SameSite, Cookie};
use tracing::{debug, error, warn};

use crate::{config::Config, models::users::AdminSession, AppState, Error, Result};

pub const SESSION_COOKIE: &str = "school.sid";
pub const LOGIN_PATH: &str = "/admin/login";

/// True when the client asked for JSON or sent an XHR marker.
pub fn wants_json(headers: &HeaderMap) -> bool {
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"));
    let is_xhr = headers
        .get("x-requested-with")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"));

    accepts_json || is_xhr
}

pub fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    let same_site = if config.production {
        SameSite::Strict
    } else {
        SameSite::Lax
    };

    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .max_age(time::Duration::hours(config.session_max_age_hours))
        .http_only(true)
        .secure(config.production)
        .same_site(same_site)
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build()
}

pub fn set_cookie(response: &mut Response, cookie: Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(err) => error!("Could not encode session cookie: {:?}", err),
    }
}

/// The live session behind the request's cookie, if any.
pub async fn current_session(app_state: &AppState, headers: &HeaderMap) -> Option<AdminSession> {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(SESSION_COOKIE)?;

    match app_state.auth_service.resume_session(cookie.value()).await {
        Ok(session) => Some(session),
        Err(Error::Unauthorized) => None,
        Err(err) => {
            warn!("Could not resolve session: {:?}", err);
            None
        }
    }
}

fn login_required(headers: &HeaderMap) -> Response {
    if wants_json(headers) {
        let body = Json(json!({
            "success": false,
            "error": "Authentication required",
            "redirect": LOGIN_PATH,
        }));
        return (StatusCode::UNAUTHORIZED, body).into_response();
    }

    Redirect::to(LOGIN_PATH).into_response()
}

/// Gate for `/admin/*`. Requests without a live session are sent to the
/// login page, signed-in ones get the session extended and re-issued.
pub async fn require_admin(mut req: Request, next: Next) -> Result<Response> {
    let app_state = req
        .extensions()
        .get::<Arc<AppState>>()
        .cloned()
        .ok_or(Error::InternalServerError)?;

    let headers = req.headers().clone();
    let Some(session) = current_session(&app_state, &headers).await else {
        debug!(path = %req.uri().path(), "Anonymous request to admin route");
        return Ok(login_required(&headers));
    };

    let token = match app_state.auth_service.refresh_session(&session).await {
        Ok(token) => token,
        Err(Error::Unauthorized) => return Ok(login_required(&headers)),
        Err(err) => return Err(err),
    };
    req.extensions_mut().insert(session.identity);

    let mut response = next.run(req).await;
    set_cookie(&mut response, session_cookie(token, &app_state.config));

    Ok(response)
}
