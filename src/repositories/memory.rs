//! In-process implementation of every repository trait, used by the
//! service and router tests. Mirrors the SQL semantics: ordering, left
//! joins on active categories, cascade from posts to images.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    models::{
        activity::ActivityAction,
        categories::{Category, CategoryCount, NewCategory},
        images::PostImage,
        posts::{Post, PostCounts, PostOrderKey},
        users::{AdminIdentity, AdminUser},
    },
    Result,
};

use super::{
    activity_repo::ActivityRepository, category_repo::CategoriesRepository,
    image_repo::ImagesRepository, posts_repo::PostsRepository, user_repo::AdminUserRepository,
};

#[derive(Default)]
struct MemoryState {
    posts: Vec<Post>,
    categories: Vec<Category>,
    images: Vec<PostImage>,
    users: Vec<AdminUser>,
    activity: Vec<(i32, ActivityAction, String)>,
    sessions: Vec<(Uuid, i32, DateTime<Utc>)>,
}

#[derive(Default)]
pub struct MemoryRepo {
    state: Mutex<MemoryState>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(names: &[(&str, &str)]) -> Self {
        let repo = Self::new();
        {
            let mut state = repo.lock();
            for (index, (name, slug)) in names.iter().enumerate() {
                state.categories.push(Category {
                    id: index as i32 + 1,
                    name: name.to_string(),
                    slug: slug.to_string(),
                    description: None,
                    color: "#6c757d".to_string(),
                    display_order: index as i32 + 1,
                    is_active: true,
                    created_at: Utc::now(),
                });
            }
        }
        repo
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn deactivate_category(&self, category_id: i32) {
        let mut state = self.lock();
        if let Some(category) = state.categories.iter_mut().find(|c| c.id == category_id) {
            category.is_active = false;
        }
    }

    pub fn image_rows(&self) -> Vec<PostImage> {
        self.lock().images.clone()
    }

    pub fn activity(&self) -> Vec<(i32, ActivityAction, String)> {
        self.lock().activity.clone()
    }

    pub fn last_login(&self, username: &str) -> Option<DateTime<Utc>> {
        self.lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .and_then(|u| u.last_login)
    }

    pub fn set_user_active(&self, username: &str, is_active: bool) {
        let mut state = self.lock();
        if let Some(user) = state.users.iter_mut().find(|u| u.username == username) {
            user.is_active = is_active;
        }
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn password_hash(&self, username: &str) -> Option<String> {
        self.lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.password_hash.clone())
    }

    pub fn set_display_order(&self, post_id: Uuid, display_order: Option<i32>) {
        let mut state = self.lock();
        if let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) {
            post.display_order = display_order;
        }
    }
}

impl MemoryState {
    fn joined(&self, post: &Post) -> Post {
        let mut post = post.clone();
        let category = post
            .category_id
            .and_then(|id| self.categories.iter().find(|c| c.id == id && c.is_active));
        post.category_name = category.map(|c| c.name.clone());
        post.category_slug = category.map(|c| c.slug.clone());
        post.category_color = category.map(|c| c.color.clone());
        post
    }

    fn ordered(&self, mut posts: Vec<Post>) -> Vec<Post> {
        posts.sort_by(|a, b| {
            PostOrderKey::display_cmp(&PostOrderKey::from(a), &PostOrderKey::from(b))
        });
        posts
    }
}

#[async_trait]
impl PostsRepository for MemoryRepo {
    async fn list_posts(&self, include_inactive: bool) -> Result<Vec<Post>> {
        let state = self.lock();
        let posts = state
            .posts
            .iter()
            .filter(|p| include_inactive || p.is_active)
            .map(|p| state.joined(p))
            .collect();
        Ok(state.ordered(posts))
    }

    async fn list_posts_by_category(
        &self,
        category_slug: &str,
        include_inactive: bool,
    ) -> Result<Vec<Post>> {
        let state = self.lock();
        let posts = state
            .posts
            .iter()
            .filter(|p| include_inactive || p.is_active)
            .map(|p| state.joined(p))
            .filter(|p| p.category_slug.as_deref() == Some(category_slug))
            .collect();
        Ok(state.ordered(posts))
    }

    async fn search_posts(
        &self,
        term: &str,
        category_slug: Option<&str>,
        include_inactive: bool,
    ) -> Result<Vec<Post>> {
        let state = self.lock();
        let needle = term.to_lowercase();
        let posts = state
            .posts
            .iter()
            .filter(|p| include_inactive || p.is_active)
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.content.to_lowercase().contains(&needle)
            })
            .map(|p| state.joined(p))
            .filter(|p| category_slug.is_none() || p.category_slug.as_deref() == category_slug)
            .collect();
        Ok(state.ordered(posts))
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let state = self.lock();
        Ok(state
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .map(|p| state.joined(p)))
    }

    async fn create_post(
        &self,
        post_id: Uuid,
        title: &str,
        content: &str,
        category_id: Option<i32>,
    ) -> Result<()> {
        let mut state = self.lock();
        let next_order = state
            .posts
            .iter()
            .filter_map(|p| p.display_order)
            .max()
            .unwrap_or(0)
            + 1;
        let now = Utc::now();
        state.posts.push(Post {
            id: post_id,
            title: title.to_string(),
            content: content.to_string(),
            category_id,
            category_name: None,
            category_slug: None,
            category_color: None,
            display_order: Some(next_order),
            is_active: true,
            created_at: now,
            updated_at: now,
            images: Vec::new(),
        });
        Ok(())
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        title: &str,
        content: &str,
        category_id: Option<i32>,
    ) -> Result<bool> {
        let mut state = self.lock();
        let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) else {
            return Ok(false);
        };
        post.title = title.to_string();
        post.content = content.to_string();
        post.category_id = category_id;
        post.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_post_active(&self, post_id: Uuid, is_active: bool) -> Result<bool> {
        let mut state = self.lock();
        let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) else {
            return Ok(false);
        };
        post.is_active = is_active;
        post.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        let mut state = self.lock();
        let before = state.posts.len();
        state.posts.retain(|p| p.id != post_id);
        let deleted = state.posts.len() < before;
        if deleted {
            state.images.retain(|i| i.post_id != post_id);
        }
        Ok(deleted)
    }

    async fn order_keys(&self) -> Result<Vec<PostOrderKey>> {
        let state = self.lock();
        let mut keys: Vec<PostOrderKey> = state.posts.iter().map(PostOrderKey::from).collect();
        keys.sort_by(PostOrderKey::display_cmp);
        Ok(keys)
    }

    async fn apply_order(&self, order: &[(Uuid, i32)]) -> Result<()> {
        let mut state = self.lock();
        for (id, position) in order {
            if let Some(post) = state.posts.iter_mut().find(|p| p.id == *id) {
                post.display_order = Some(*position);
            }
        }
        Ok(())
    }

    async fn post_counts(&self) -> Result<PostCounts> {
        let state = self.lock();
        let active = state.posts.iter().filter(|p| p.is_active).count() as i64;
        Ok(PostCounts {
            total_posts: state.posts.len() as i64,
            active_posts: active,
            inactive_posts: state.posts.len() as i64 - active,
            latest_post_date: state.posts.iter().map(|p| p.created_at).max(),
        })
    }
}

#[async_trait]
impl ImagesRepository for MemoryRepo {
    async fn insert_image(&self, image: &PostImage) -> Result<()> {
        self.lock().images.push(image.clone());
        Ok(())
    }

    async fn get_image(&self, image_id: Uuid) -> Result<Option<PostImage>> {
        Ok(self.lock().images.iter().find(|i| i.id == image_id).cloned())
    }

    async fn images_for_post(&self, post_id: Uuid) -> Result<Vec<PostImage>> {
        self.images_for_posts(&[post_id]).await
    }

    async fn images_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<PostImage>> {
        let mut images: Vec<PostImage> = self
            .lock()
            .images
            .iter()
            .filter(|i| post_ids.contains(&i.post_id))
            .cloned()
            .collect();
        images.sort_by_key(|i| i.created_at);
        Ok(images)
    }

    async fn delete_image(&self, image_id: Uuid) -> Result<bool> {
        let mut state = self.lock();
        let before = state.images.len();
        state.images.retain(|i| i.id != image_id);
        Ok(state.images.len() < before)
    }

    async fn orphaned_images(&self) -> Result<Vec<PostImage>> {
        let state = self.lock();
        Ok(state
            .images
            .iter()
            .filter(|i| !state.posts.iter().any(|p| p.id == i.post_id))
            .cloned()
            .collect())
    }

    async fn count_images(&self) -> Result<i64> {
        Ok(self.lock().images.len() as i64)
    }
}

#[async_trait]
impl CategoriesRepository for MemoryRepo {
    async fn active_categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .lock()
            .categories
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(categories)
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self
            .lock()
            .categories
            .iter()
            .find(|c| c.slug == slug && c.is_active)
            .cloned())
    }

    async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let categories = self.active_categories().await?;
        let state = self.lock();
        Ok(categories
            .into_iter()
            .map(|c| CategoryCount {
                post_count: state
                    .posts
                    .iter()
                    .filter(|p| p.is_active && p.category_id == Some(c.id))
                    .count() as i64,
                id: c.id,
                name: c.name,
                slug: c.slug,
                color: c.color,
            })
            .collect())
    }

    async fn create_category(&self, category: &NewCategory) -> Result<Option<Category>> {
        let mut state = self.lock();
        if state
            .categories
            .iter()
            .any(|c| c.slug == category.slug || c.name == category.name)
        {
            return Ok(None);
        }
        let created = Category {
            id: state.categories.iter().map(|c| c.id).max().unwrap_or(0) + 1,
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            color: category.color.clone(),
            display_order: state
                .categories
                .iter()
                .map(|c| c.display_order)
                .max()
                .unwrap_or(0)
                + 1,
            is_active: true,
            created_at: Utc::now(),
        };
        state.categories.push(created.clone());
        Ok(Some(created))
    }

    async fn delete_category(&self, category_id: i32) -> Result<bool> {
        let mut state = self.lock();
        let before = state.categories.len();
        state.categories.retain(|c| c.id != category_id);
        if state.categories.len() == before {
            return Ok(false);
        }
        for post in state.posts.iter_mut() {
            if post.category_id == Some(category_id) {
                post.category_id = None;
            }
        }
        Ok(true)
    }

    async fn assign_uncategorized(&self, slug: &str) -> Result<u64> {
        let mut state = self.lock();
        let Some(category_id) = state.categories.iter().find(|c| c.slug == slug).map(|c| c.id)
        else {
            return Ok(0);
        };
        let mut moved = 0;
        for post in state.posts.iter_mut().filter(|p| p.category_id.is_none()) {
            post.category_id = Some(category_id);
            moved += 1;
        }
        Ok(moved)
    }
}

#[async_trait]
impl AdminUserRepository for MemoryRepo {
    async fn find_active_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.username == username && u.is_active)
            .cloned())
    }

    async fn touch_last_login(&self, user_id: i32) -> Result<()> {
        let mut state = self.lock();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_admin(
        &self,
        username: &str,
        password_hash: &str,
        email: Option<&str>,
    ) -> Result<i32> {
        let mut state = self.lock();
        let id = state.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        state.users.push(AdminUser {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            email: email.map(str::to_string),
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> Result<Option<i32>> {
        let mut state = self.lock();
        Ok(state
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .map(|user| {
                user.password_hash = password_hash.to_string();
                user.id
            }))
    }

    async fn create_session(
        &self,
        session_id: Uuid,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.lock().sessions.push((session_id, user_id, expires_at));
        Ok(())
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<AdminIdentity>> {
        let state = self.lock();
        let now = Utc::now();
        Ok(state
            .sessions
            .iter()
            .find(|(id, _, expires_at)| *id == session_id && *expires_at > now)
            .and_then(|(_, user_id, _)| {
                state.users.iter().find(|u| u.id == *user_id && u.is_active)
            })
            .map(|user| AdminIdentity {
                id: user.id,
                username: user.username.clone(),
            }))
    }

    async fn extend_session(&self, session_id: Uuid, expires_at: DateTime<Utc>) -> Result<bool> {
        let mut state = self.lock();
        let Some(session) = state.sessions.iter_mut().find(|(id, _, _)| *id == session_id) else {
            return Ok(false);
        };
        session.2 = expires_at;
        Ok(true)
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<bool> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|(id, _, _)| *id != session_id);
        Ok(state.sessions.len() < before)
    }

    async fn delete_user_sessions(&self, user_id: i32) -> Result<u64> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|(_, owner, _)| *owner != user_id);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn purge_expired_sessions(&self) -> Result<u64> {
        let mut state = self.lock();
        let now = Utc::now();
        let before = state.sessions.len();
        state.sessions.retain(|(_, _, expires_at)| *expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl ActivityRepository for MemoryRepo {
    async fn log_activity(
        &self,
        admin_user_id: i32,
        action: ActivityAction,
        details: &str,
    ) -> Result<()> {
        self.lock()
            .activity
            .push((admin_user_id, action, details.to_string()));
        Ok(())
    }
}
