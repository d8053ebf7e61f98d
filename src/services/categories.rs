use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    models::categories::{
        slugify, Category, CategoryCount, NewCategory, DEFAULT_CATEGORIES, DEFAULT_CATEGORY_COLOR,
    },
    repositories::category_repo::CategoriesRepository,
    Error, Result,
};

#[derive(Clone)]
pub struct CategoryService {
    repo: Arc<dyn CategoriesRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoriesRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_active(&self) -> Result<Vec<Category>> {
        self.repo.active_categories().await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        self.repo.category_by_slug(slug.trim()).await
    }

    pub async fn counts_by_category(&self) -> Result<Vec<CategoryCount>> {
        self.repo.category_counts().await
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
    ) -> Result<Category> {
        let name = name.trim();
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(Error::BadRequest("Category name is required".to_string()));
        }

        let Some(category) = self
            .repo
            .create_category(&NewCategory {
                name: name.to_string(),
                slug,
                description: description
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string),
                color: color
                    .map(str::trim)
                    .filter(|color| !color.is_empty())
                    .unwrap_or(DEFAULT_CATEGORY_COLOR)
                    .to_string(),
            })
            .await?
        else {
            return Err(Error::BadRequest("Category already exists".to_string()));
        };

        info!(category_id = category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    /// Creates whichever default categories are missing and returns them.
    pub async fn ensure_defaults(&self) -> Result<Vec<Category>> {
        let mut created = Vec::new();
        for (name, description, color) in DEFAULT_CATEGORIES {
            if self.repo.category_by_slug(&slugify(name)).await?.is_some() {
                continue;
            }
            match self.create(name, Some(description), Some(color)).await {
                Ok(category) => created.push(category),
                Err(Error::BadRequest(_)) => {
                    warn!(name, "Default category exists but is inactive, skipping");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(created)
    }

    /// Files every post without a category under `slug`.
    pub async fn assign_uncategorized(&self, slug: &str) -> Result<u64> {
        let moved = self.repo.assign_uncategorized(slug).await?;
        info!(slug, moved, "Uncategorized posts assigned");
        Ok(moved)
    }

    /// Posts in the deleted category keep existing without one.
    pub async fn delete(&self, category_id: i32) -> Result<()> {
        if !self.repo.delete_category(category_id).await? {
            return Err(Error::NotFound);
        }

        info!(category_id, "Category deleted");
        Ok(())
    }
}
