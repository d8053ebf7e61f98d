use async_trait::async_trait;
use uuid::Uuid;

use crate::{models::images::PostImage, Result};

use super::PostgresRepo;

#[async_trait]
pub trait ImagesRepository: Send + Sync {
    async fn insert_image(&self, image: &PostImage) -> Result<()>;
    async fn get_image(&self, image_id: Uuid) -> Result<Option<PostImage>>;
    async fn images_for_post(&self, post_id: Uuid) -> Result<Vec<PostImage>>;
    async fn images_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<PostImage>>;
    async fn delete_image(&self, image_id: Uuid) -> Result<bool>;
    async fn orphaned_images(&self) -> Result<Vec<PostImage>>;
    async fn count_images(&self) -> Result<i64>;
}

#[async_trait]
impl ImagesRepository for PostgresRepo {
    async fn insert_image(&self, image: &PostImage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO post_images (
                id, post_id, filename, thumbnail_filename,
                public_path, thumbnail_path, caption, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(image.id)
        .bind(image.post_id)
        .bind(&image.filename)
        .bind(&image.thumbnail_filename)
        .bind(&image.public_path)
        .bind(&image.thumbnail_path)
        .bind(&image.caption)
        .bind(image.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_image(&self, image_id: Uuid) -> Result<Option<PostImage>> {
        let image = sqlx::query_as::<_, PostImage>(
            r#"
            SELECT id, post_id, filename, thumbnail_filename, public_path, thumbnail_path, caption, created_at
            FROM post_images
            WHERE id = $1
            "#,
        )
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(image)
    }

    async fn images_for_post(&self, post_id: Uuid) -> Result<Vec<PostImage>> {
        let images = sqlx::query_as::<_, PostImage>(
            r#"
            SELECT id, post_id, filename, thumbnail_filename, public_path, thumbnail_path, caption, created_at
            FROM post_images
            WHERE post_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    async fn images_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<PostImage>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let images = sqlx::query_as::<_, PostImage>(
            r#"
            SELECT id, post_id, filename, thumbnail_filename, public_path, thumbnail_path, caption, created_at
            FROM post_images
            WHERE post_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    async fn delete_image(&self, image_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM post_images WHERE id = $1")
            .bind(image_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn orphaned_images(&self) -> Result<Vec<PostImage>> {
        let images = sqlx::query_as::<_, PostImage>(
            r#"
            SELECT pi.id, pi.post_id, pi.filename, pi.thumbnail_filename,
                   pi.public_path, pi.thumbnail_path, pi.caption, pi.created_at
            FROM post_images pi
            LEFT JOIN posts p ON p.id = pi.post_id
            WHERE p.id IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    async fn count_images(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_images")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
