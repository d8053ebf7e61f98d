use std::{borrow::Cow, cmp::Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{categories::CategoryCount, images::PostImage};

pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_CONTENT_LENGTH: usize = 10_000;

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i32>,
    #[serde(rename = "categoryName")]
    pub category_name: Option<String>,
    #[serde(rename = "categorySlug")]
    pub category_slug: Option<String>,
    #[serde(rename = "categoryColor")]
    pub category_color: Option<String>,
    #[serde(rename = "displayOrder")]
    pub display_order: Option<i32>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub images: Vec<PostImage>,
}

/// The columns that decide where a post sits in the listing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostOrderKey {
    pub id: Uuid,
    pub display_order: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl PostOrderKey {
    /// `display_order` ascending with nulls last, then newest first.
    pub fn display_cmp(a: &Self, b: &Self) -> Ordering {
        match (a.display_order, b.display_order) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| b.created_at.cmp(&a.created_at))
    }
}

impl From<&Post> for PostOrderKey {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            display_order: post.display_order,
            created_at: post.created_at,
        }
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::new("title_required")
            .with_message(Cow::from("Title is required")));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::new("title_length")
            .with_message(Cow::from("Title must be less than 255 characters")));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), ValidationError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::new("content_required")
            .with_message(Cow::from("Content is required")));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(ValidationError::new("content_length")
            .with_message(Cow::from("Content must be less than 10,000 characters")));
    }
    Ok(())
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct PostInput {
    #[validate(custom(function = "validate_title"))]
    #[serde(default)]
    pub title: String,
    #[validate(custom(function = "validate_content"))]
    #[serde(default)]
    pub content: String,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i32>,
}

impl PostInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>, category_id: Option<i32>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category_id,
        }
    }

    /// Every violated rule, title messages first.
    pub fn validation_errors(&self) -> Vec<String> {
        let Err(errors) = self.validate() else {
            return Vec::new();
        };
        let fields = errors.field_errors();

        ["title", "content"]
            .iter()
            .filter_map(|field| fields.get(*field))
            .flat_map(|errs| errs.iter())
            .filter_map(|err| err.message.as_ref().map(|msg| msg.to_string()))
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct PostSaved {
    pub id: Uuid,
    #[serde(rename = "uploadedImages")]
    pub uploaded_images: Vec<PostImage>,
    #[serde(rename = "imageErrors")]
    pub image_errors: Vec<String>,
}

#[derive(Debug, Default, Clone, sqlx::FromRow)]
pub struct PostCounts {
    pub total_posts: i64,
    pub active_posts: i64,
    pub inactive_posts: i64,
    pub latest_post_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct PostStats {
    #[serde(rename = "totalPosts")]
    pub total_posts: i64,
    #[serde(rename = "activePosts")]
    pub active_posts: i64,
    #[serde(rename = "inactivePosts")]
    pub inactive_posts: i64,
    #[serde(rename = "latestPostDate")]
    pub latest_post_date: Option<DateTime<Utc>>,
    #[serde(rename = "totalImages")]
    pub total_images: i64,
    pub categories: Vec<CategoryCount>,
}
