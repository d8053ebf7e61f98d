use std::{collections::HashSet, sync::Arc};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    models::{
        activity::ActivityAction,
        images::ImageUpload,
        posts::{Post, PostInput, PostOrderKey, PostSaved, PostStats},
    },
    repositories::{
        activity_repo::ActivityRepository, category_repo::CategoriesRepository,
        posts_repo::PostsRepository,
    },
    services::images::ImageService,
    Error, Result,
};

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepository>,
    categories: Arc<dyn CategoriesRepository>,
    images: ImageService,
    activity: Arc<dyn ActivityRepository>,
}

/// Positions for every post after a reorder request: the requested
/// known ids take 1..n in the given order, the remaining posts follow
/// in their current order. Unknown and repeated ids are skipped.
pub fn plan_order(current: &[PostOrderKey], requested: &[Uuid]) -> Vec<(Uuid, i32)> {
    let mut current = current.to_vec();
    current.sort_by(PostOrderKey::display_cmp);

    let known: HashSet<Uuid> = current.iter().map(|key| key.id).collect();
    let mut placed = HashSet::new();

    let mut order: Vec<Uuid> = requested
        .iter()
        .copied()
        .filter(|id| known.contains(id) && placed.insert(*id))
        .collect();
    order.extend(
        current
            .iter()
            .map(|key| key.id)
            .filter(|id| !placed.contains(id)),
    );

    order.into_iter().zip(1..).collect()
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepository>,
        categories: Arc<dyn CategoriesRepository>,
        images: ImageService,
        activity: Arc<dyn ActivityRepository>,
    ) -> Self {
        Self {
            posts,
            categories,
            images,
            activity,
        }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Post>> {
        let mut posts = self.posts.list_posts(include_inactive).await?;
        self.images.load_into(&mut posts).await?;

        Ok(posts)
    }

    pub async fn list_by_category(&self, slug: &str, include_inactive: bool) -> Result<Vec<Post>> {
        let mut posts = self
            .posts
            .list_posts_by_category(slug, include_inactive)
            .await?;
        self.images.load_into(&mut posts).await?;

        Ok(posts)
    }

    pub async fn get_by_id(&self, post_id: &str) -> Result<Option<Post>> {
        let Ok(post_id) = Uuid::parse_str(post_id) else {
            return Ok(None);
        };

        let Some(mut post) = self.posts.get_post(post_id).await? else {
            return Ok(None);
        };
        post.images = self.images.list_for_post(post_id).await?;

        Ok(Some(post))
    }

    pub async fn create(
        &self,
        input: PostInput,
        admin_user_id: Option<i32>,
        upload: ImageUpload,
    ) -> Result<PostSaved> {
        let input = self.checked(input).await?;
        let post_id = Uuid::now_v7();

        self.posts
            .create_post(post_id, &input.title, &input.content, input.category_id)
            .await?;
        info!(%post_id, "Post created");

        self.record(
            admin_user_id,
            ActivityAction::Create,
            format!("Created post: {}", input.title),
        )
        .await;

        let (uploaded_images, image_errors) = self.images.attach(post_id, &upload).await;

        Ok(PostSaved {
            id: post_id,
            uploaded_images,
            image_errors,
        })
    }

    pub async fn update(
        &self,
        post_id: &str,
        input: PostInput,
        admin_user_id: Option<i32>,
        upload: ImageUpload,
    ) -> Result<PostSaved> {
        let post_id = Uuid::parse_str(post_id).map_err(|_| Error::NotFound)?;
        let input = self.checked(input).await?;

        let updated = self
            .posts
            .update_post(post_id, &input.title, &input.content, input.category_id)
            .await?;
        if !updated {
            return Err(Error::NotFound);
        }
        info!(%post_id, "Post updated");

        self.record(
            admin_user_id,
            ActivityAction::Update,
            format!("Updated post: {}", input.title),
        )
        .await;

        let (uploaded_images, image_errors) = self.images.attach(post_id, &upload).await;

        Ok(PostSaved {
            id: post_id,
            uploaded_images,
            image_errors,
        })
    }

    /// Flips `is_active` and returns the new value.
    pub async fn toggle_active(&self, post_id: &str, admin_user_id: Option<i32>) -> Result<bool> {
        let post_id = Uuid::parse_str(post_id).map_err(|_| Error::NotFound)?;
        let post = self.posts.get_post(post_id).await?.ok_or(Error::NotFound)?;

        let is_active = !post.is_active;
        if !self.posts.set_post_active(post_id, is_active).await? {
            return Err(Error::NotFound);
        }

        let state = if is_active { "active" } else { "inactive" };
        info!(%post_id, is_active, "Post visibility changed");
        self.record(
            admin_user_id,
            ActivityAction::Update,
            format!("Marked post {state}: {}", post.title),
        )
        .await;

        Ok(is_active)
    }

    pub async fn delete(&self, post_id: &str, admin_user_id: Option<i32>) -> Result<()> {
        let post_id = Uuid::parse_str(post_id).map_err(|_| Error::NotFound)?;
        let post = self.posts.get_post(post_id).await?.ok_or(Error::NotFound)?;
        let images = self.images.list_for_post(post_id).await?;

        if !self.posts.delete_post(post_id).await? {
            return Err(Error::NotFound);
        }

        for image in &images {
            self.images.remove_files(image).await;
        }
        info!(%post_id, images = images.len(), "Post deleted");

        self.record(
            admin_user_id,
            ActivityAction::Delete,
            format!("Deleted post: {}", post.title),
        )
        .await;

        Ok(())
    }

    pub async fn reorder(&self, ordered_ids: &[String], admin_user_id: Option<i32>) -> Result<()> {
        if ordered_ids.is_empty() {
            return Err(Error::InvalidOrder);
        }

        let requested: Vec<Uuid> = ordered_ids
            .iter()
            .filter_map(|id| Uuid::parse_str(id.trim()).ok())
            .collect();

        let current = self.posts.order_keys().await?;
        let plan = plan_order(&current, &requested);
        self.posts.apply_order(&plan).await?;

        info!(requested = ordered_ids.len(), posts = plan.len(), "Posts reordered");
        self.record(
            admin_user_id,
            ActivityAction::Reorder,
            format!("Reordered {} posts", requested.len()),
        )
        .await;

        Ok(())
    }

    pub async fn search(
        &self,
        query: &str,
        category_slug: Option<&str>,
        include_inactive: bool,
    ) -> Result<Vec<Post>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut posts = self
            .posts
            .search_posts(query, category_slug, include_inactive)
            .await?;
        self.images.load_into(&mut posts).await?;

        Ok(posts)
    }

    pub async fn stats(&self) -> Result<PostStats> {
        let counts = self.posts.post_counts().await?;
        let total_images = self.images.count().await?;
        let categories = self.categories.category_counts().await?;

        Ok(PostStats {
            total_posts: counts.total_posts,
            active_posts: counts.active_posts,
            inactive_posts: counts.inactive_posts,
            latest_post_date: counts.latest_post_date,
            total_images,
            categories,
        })
    }

    /// Validated, trimmed input with a category id that points at an
    /// active category or nothing.
    async fn checked(&self, input: PostInput) -> Result<PostInput> {
        let errors = input.validation_errors();
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        let category_id = match input.category_id {
            Some(category_id) => {
                let active = self.categories.active_categories().await?;
                if active.iter().any(|category| category.id == category_id) {
                    Some(category_id)
                } else {
                    warn!(category_id, "Unknown category on post, storing without one");
                    None
                }
            }
            None => None,
        };

        Ok(PostInput::new(
            input.title.trim(),
            input.content.trim(),
            category_id,
        ))
    }

    async fn record(&self, admin_user_id: Option<i32>, action: ActivityAction, details: String) {
        let Some(admin_user_id) = admin_user_id else {
            return;
        };
        if let Err(err) = self
            .activity
            .log_activity(admin_user_id, action, &details)
            .await
        {
            warn!(%action, "Could not record activity: {:?}", err);
        }
    }
}
