use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::warn;

use crate::{
    handlers::auth::DASHBOARD_PATH,
    middleware::wants_json,
    models::{
        images::{ImageUpload, IncomingFile, UploadError, UploadLimits},
        posts::{PostInput, PostSaved},
        query::ReorderDto,
        response::Response as ApiResponse,
        users::AdminIdentity,
        views::{
            CleanupResponse, DashboardView, FormErrorView, PostFormView, SavedResponse,
            StatsResponse, ToggleResponse,
        },
    },
    AppState, Error, Result,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/create", get(create_form).post(create_post))
        .route("/edit/{id}", get(edit_form).post(update_post))
        .route("/toggle/{id}", post(toggle_post))
        .route("/delete/{id}", post(delete_post))
        .route("/delete-image/{image_id}", post(delete_image))
        .route("/reorder", post(reorder_posts))
        .route("/api/stats", get(stats))
        .route("/cleanup-images", post(cleanup_images))
}

pub async fn dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
) -> Result<impl IntoResponse> {
    let posts = app_state.post_service.list(true).await?;
    let stats = app_state.post_service.stats().await?;

    Ok(Json(DashboardView {
        username: admin.username,
        posts,
        stats,
    }))
}

pub async fn create_form(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse> {
    let categories = app_state.category_service.list_active().await?;

    Ok(Json(PostFormView {
        post: None,
        categories,
    }))
}

pub async fn create_post(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response> {
    let (input, upload) =
        read_post_form(multipart, app_state.image_service.limits()).await?;

    let saved = app_state
        .post_service
        .create(input.clone(), Some(admin.id), upload)
        .await;

    saved_response(saved, input, None, &headers, StatusCode::CREATED)
}

pub async fn edit_form(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let post = app_state
        .post_service
        .get_by_id(&id)
        .await?
        .ok_or(Error::NotFound)?;
    let categories = app_state.category_service.list_active().await?;

    Ok(Json(PostFormView {
        post: Some(post),
        categories,
    }))
}

pub async fn update_post(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response> {
    let (input, upload) =
        read_post_form(multipart, app_state.image_service.limits()).await?;

    let saved = app_state
        .post_service
        .update(&id, input.clone(), Some(admin.id), upload)
        .await;

    saved_response(saved, input, Some(id), &headers, StatusCode::OK)
}

pub async fn toggle_post(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let is_active = app_state
        .post_service
        .toggle_active(&id, Some(admin.id))
        .await?;

    Ok(Json(ToggleResponse {
        success: true,
        is_active,
    }))
}

pub async fn delete_post(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    app_state.post_service.delete(&id, Some(admin.id)).await?;

    if wants_json(&headers) {
        return Ok(Json(ApiResponse::ok()).into_response());
    }
    Ok(Redirect::to(DASHBOARD_PATH).into_response())
}

pub async fn delete_image(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(image_id): Path<String>,
) -> Result<impl IntoResponse> {
    app_state.image_service.delete(&image_id).await?;

    Ok(Json(ApiResponse::ok()))
}

pub async fn reorder_posts(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Json(body): Json<ReorderDto>,
) -> Result<impl IntoResponse> {
    let ids = body.ids().ok_or(Error::InvalidOrder)?;
    app_state.post_service.reorder(&ids, Some(admin.id)).await?;

    Ok(Json(ApiResponse::ok()))
}

pub async fn stats(Extension(app_state): Extension<Arc<AppState>>) -> Result<impl IntoResponse> {
    let stats = app_state.post_service.stats().await?;

    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

pub async fn cleanup_images(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse> {
    let deleted_count = app_state.image_service.cleanup_orphaned().await?;

    Ok(Json(CleanupResponse {
        success: true,
        deleted_count,
    }))
}

fn saved_response(
    saved: Result<PostSaved>,
    input: PostInput,
    post_id: Option<String>,
    headers: &HeaderMap,
    json_status: StatusCode,
) -> Result<Response> {
    let saved = match saved {
        Ok(saved) => saved,
        Err(Error::Validation(errors)) => {
            let view = FormErrorView::new(errors, input, post_id);
            return Ok((StatusCode::BAD_REQUEST, Json(view)).into_response());
        }
        Err(err) => return Err(err),
    };

    if !wants_json(headers) {
        return Ok(Redirect::to(DASHBOARD_PATH).into_response());
    }

    let body = Json(SavedResponse {
        success: true,
        id: saved.id,
        uploaded_images: saved.uploaded_images,
        image_errors: saved.image_errors,
    });
    Ok((json_status, body).into_response())
}

/// Reads the post form fields and image files. Empty file inputs are
/// dropped; limits are checked later by the image service.
async fn read_post_form(
    mut multipart: Multipart,
    limits: &UploadLimits,
) -> Result<(PostInput, ImageUpload)> {
    let mut input = PostInput::default();
    let mut upload = ImageUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_failure(err, limits))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "images" => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| multipart_failure(err, limits))?;

                if original_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                upload.files.push(IncomingFile {
                    original_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "title" | "content" | "category_id" | "caption" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| multipart_failure(err, limits))?;
                match name.as_str() {
                    "title" => input.title = value,
                    "content" => input.content = value,
                    "category_id" => input.category_id = value.trim().parse().ok(),
                    _ => upload.caption = Some(value),
                }
            }
            _ => {}
        }
    }

    Ok((input, upload))
}

fn multipart_failure(err: MultipartError, limits: &UploadLimits) -> Error {
    warn!("Multipart read failed: {}", err.body_text());

    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadError::FileTooLarge {
            max_bytes: limits.max_file_size,
        }
        .into();
    }
    UploadError::InvalidFormData.into()
}
