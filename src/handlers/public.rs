use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Json, Router,
};

use crate::{
    models::{
        query::SearchQueryDto,
        views::{CategoryView, HomeView, PostsResponse, SearchView},
    },
    AppState, Error, Result,
};

pub fn public_handler() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/posts", get(api_posts))
        .route("/category/{slug}", get(category))
        .route("/search", get(search))
        .route("/post/{id}", get(post))
}

pub async fn home(Extension(app_state): Extension<Arc<AppState>>) -> Result<impl IntoResponse> {
    let posts = app_state.post_service.list(false).await?;
    let categories = app_state.category_service.counts_by_category().await?;

    Ok(Json(HomeView { posts, categories }))
}

pub async fn api_posts(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse> {
    let posts = app_state.post_service.list(false).await?;

    Ok(Json(PostsResponse {
        success: true,
        posts,
    }))
}

pub async fn category(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let category = app_state
        .category_service
        .get_by_slug(&slug)
        .await?
        .ok_or(Error::NotFound)?;

    let posts = app_state
        .post_service
        .list_by_category(&category.slug, false)
        .await?;
    let categories = app_state.category_service.counts_by_category().await?;

    Ok(Json(CategoryView {
        category,
        posts,
        categories,
    }))
}

pub async fn search(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(params): Query<SearchQueryDto>,
) -> Result<Response> {
    let Some(query) = params.q.as_deref() else {
        return Ok(Redirect::to("/").into_response());
    };

    let category = params.category_slug();
    let posts = app_state
        .post_service
        .search(query, category, false)
        .await?;

    Ok(Json(SearchView {
        query: query.trim().to_string(),
        category: category.map(str::to_string),
        posts,
    })
    .into_response())
}

pub async fn post(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let post = app_state
        .post_service
        .get_by_id(&id)
        .await?
        .filter(|post| post.is_active)
        .ok_or(Error::NotFound)?;

    Ok(Json(post))
}
