use serde::Serialize;
use uuid::Uuid;

use super::{
    categories::{Category, CategoryCount},
    images::PostImage,
    posts::{Post, PostInput, PostStats},
};

#[derive(Debug, Serialize)]
pub struct HomeView {
    pub posts: Vec<Post>,
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Serialize)]
pub struct PostsResponse {
    pub success: bool,
    pub posts: Vec<Post>,
}

#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub category: Category,
    pub posts: Vec<Post>,
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Serialize)]
pub struct SearchView {
    pub query: String,
    pub category: Option<String>,
    pub posts: Vec<Post>,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub username: String,
    pub posts: Vec<Post>,
    pub stats: PostStats,
}

#[derive(Debug, Serialize)]
pub struct PostFormView {
    pub post: Option<Post>,
    pub categories: Vec<Category>,
}

/// A rejected form, echoed back with what the admin typed.
#[derive(Debug, Serialize)]
pub struct FormErrorView {
    pub success: bool,
    pub errors: Vec<String>,
    #[serde(rename = "postId", skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i32>,
}

impl FormErrorView {
    pub fn new(errors: Vec<String>, input: PostInput, post_id: Option<String>) -> Self {
        Self {
            success: false,
            errors,
            post_id,
            title: input.title,
            content: input.content,
            category_id: input.category_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub success: bool,
    pub id: Uuid,
    #[serde(rename = "uploadedImages")]
    pub uploaded_images: Vec<PostImage>,
    #[serde(rename = "imageErrors")]
    pub image_errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginView {
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub success: bool,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: PostStats,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    #[serde(rename = "deletedCount")]
    pub deleted_count: u64,
}
