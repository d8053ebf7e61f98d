use async_trait::async_trait;

use crate::{
    models::categories::{Category, CategoryCount, NewCategory},
    Result,
};

use super::PostgresRepo;

#[async_trait]
pub trait CategoriesRepository: Send + Sync {
    async fn active_categories(&self) -> Result<Vec<Category>>;
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>>;
    async fn category_counts(&self) -> Result<Vec<CategoryCount>>;
    /// `None` when the name or slug is already taken.
    async fn create_category(&self, category: &NewCategory) -> Result<Option<Category>>;
    async fn delete_category(&self, category_id: i32) -> Result<bool>;
    /// Moves every post without a category into the one with `slug`.
    async fn assign_uncategorized(&self, slug: &str) -> Result<u64>;
}

#[async_trait]
impl CategoriesRepository for PostgresRepo {
    async fn active_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, slug, description, color, display_order, is_active, created_at
            FROM categories
            WHERE is_active
            ORDER BY display_order, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, slug, description, color, display_order, is_active, created_at
            FROM categories
            WHERE slug = $1 AND is_active
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let counts = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT c.id, c.name, c.slug, c.color, COUNT(p.id) AS post_count
            FROM categories c
            LEFT JOIN posts p ON p.category_id = c.id AND p.is_active
            WHERE c.is_active
            GROUP BY c.id, c.name, c.slug, c.color, c.display_order
            ORDER BY c.display_order, c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn create_category(&self, category: &NewCategory) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, slug, description, color, display_order)
            SELECT $1, $2, $3, $4, COALESCE(MAX(display_order), 0) + 1
            FROM categories
            ON CONFLICT DO NOTHING
            RETURNING id, name, slug, description, color, display_order, is_active, created_at
            "#,
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.color)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn delete_category(&self, category_id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn assign_uncategorized(&self, slug: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET category_id = c.id
            FROM categories c
            WHERE c.slug = $1 AND posts.category_id IS NULL
            "#,
        )
        .bind(slug)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
