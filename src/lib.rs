use std::sync::Arc;

use config::Config;
use repositories::{
    activity_repo::ActivityRepository, category_repo::CategoriesRepository,
    image_repo::ImagesRepository, posts_repo::PostsRepository, user_repo::AdminUserRepository,
};
use services::{
    auth::AuthService,
    categories::CategoryService,
    images::{ImageService, ImageStorage},
    posts::PostService,
};

pub use self::errors::{Error, Result};

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub auth_service: AuthService,
    pub post_service: PostService,
    pub category_service: CategoryService,
    pub image_service: ImageService,
}

impl AppState {
    /// Wires every service to `repo`, which backs all the stores.
    pub fn new<R>(config: Config, repo: Arc<R>) -> Self
    where
        R: PostsRepository
            + CategoriesRepository
            + ImagesRepository
            + AdminUserRepository
            + ActivityRepository
            + 'static,
    {
        let image_service = ImageService::new(
            repo.clone(),
            ImageStorage::new(&config.upload_dir, &config.public_upload_dir),
            config.upload_limits.clone(),
        );

        Self {
            auth_service: AuthService::new(
                repo.clone(),
                repo.clone(),
                config.session_secret.clone(),
                config.session_max_age_hours,
            ),
            post_service: PostService::new(
                repo.clone(),
                repo.clone(),
                image_service.clone(),
                repo.clone(),
            ),
            category_service: CategoryService::new(repo),
            image_service,
            config,
        }
    }
}
