use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::models::images::UploadError;

pub type Result<T> = core::result::Result<T, Error>;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_ORDER: &str = "Invalid post IDs array";

#[derive(Debug)]
pub enum Error {
    NotFound,
    Unauthorized,
    InvalidCredentials,
    InternalServerError,
    BadRequest(String),
    Validation(Vec<String>),
    InvalidOrder,
    Upload(UploadError),
    Config(String),
    DatabaseError(sqlx::Error),
    InvalidHashFormat(argon2::password_hash::Error),
    Io(std::io::Error),
    Image(image::ImageError),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS),
            Self::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            Self::Validation(errors) => {
                let body = Json(json!({ "success": false, "errors": errors }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            Self::InvalidOrder => (StatusCode::BAD_REQUEST, INVALID_ORDER),
            Self::Upload(ref err) => {
                let body = Json(json!({ "success": false, "error": err.to_string() }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            Self::InternalServerError
            | Self::Config(_)
            | Self::DatabaseError(_)
            | Self::InvalidHashFormat(_)
            | Self::Io(_)
            | Self::Image(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong, please try again",
            ),
        };

        let body = Json(json!({ "success": false, "error": message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        error!("Database error: {:?}", err);
        Self::DatabaseError(err)
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        error!("Password hash error: {:?}", err);
        Self::InvalidHashFormat(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        error!("File system error: {:?}", err);
        Self::Io(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        error!("Image processing error: {:?}", err);
        Self::Image(err)
    }
}

impl From<UploadError> for Error {
    fn from(err: UploadError) -> Self {
        Self::Upload(err)
    }
}
