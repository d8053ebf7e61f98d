use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    models::posts::{Post, PostCounts, PostOrderKey},
    Result,
};

use super::PostgresRepo;

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.category_id,
           c.name AS category_name, c.slug AS category_slug, c.color AS category_color,
           p.display_order, p.is_active, p.created_at, p.updated_at
    FROM posts p
"#;

const POST_ORDER: &str = "ORDER BY p.display_order ASC NULLS LAST, p.created_at DESC";

#[async_trait]
pub trait PostsRepository: Sync + Send {
    async fn list_posts(&self, include_inactive: bool) -> Result<Vec<Post>>;
    async fn list_posts_by_category(
        &self,
        category_slug: &str,
        include_inactive: bool,
    ) -> Result<Vec<Post>>;
    async fn search_posts(
        &self,
        term: &str,
        category_slug: Option<&str>,
        include_inactive: bool,
    ) -> Result<Vec<Post>>;
    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>>;
    async fn create_post(
        &self,
        post_id: Uuid,
        title: &str,
        content: &str,
        category_id: Option<i32>,
    ) -> Result<()>;
    async fn update_post(
        &self,
        post_id: Uuid,
        title: &str,
        content: &str,
        category_id: Option<i32>,
    ) -> Result<bool>;
    async fn set_post_active(&self, post_id: Uuid, is_active: bool) -> Result<bool>;
    async fn delete_post(&self, post_id: Uuid) -> Result<bool>;
    async fn order_keys(&self) -> Result<Vec<PostOrderKey>>;
    async fn apply_order(&self, order: &[(Uuid, i32)]) -> Result<()>;
    async fn post_counts(&self) -> Result<PostCounts>;
}

/// `%term%` for ILIKE with the pattern metacharacters escaped.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl PostsRepository for PostgresRepo {
    async fn list_posts(&self, include_inactive: bool) -> Result<Vec<Post>> {
        let sql = format!(
            r#"{POST_SELECT}
            LEFT JOIN categories c ON c.id = p.category_id AND c.is_active
            WHERE ($1 OR p.is_active)
            {POST_ORDER}"#
        );

        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    async fn list_posts_by_category(
        &self,
        category_slug: &str,
        include_inactive: bool,
    ) -> Result<Vec<Post>> {
        let sql = format!(
            r#"{POST_SELECT}
            INNER JOIN categories c ON c.id = p.category_id
            WHERE c.slug = $1 AND c.is_active AND ($2 OR p.is_active)
            {POST_ORDER}"#
        );

        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(category_slug)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    #[instrument(skip(self))]
    async fn search_posts(
        &self,
        term: &str,
        category_slug: Option<&str>,
        include_inactive: bool,
    ) -> Result<Vec<Post>> {
        let sql = format!(
            r#"{POST_SELECT}
            LEFT JOIN categories c ON c.id = p.category_id AND c.is_active
            WHERE (p.title ILIKE $1 OR p.content ILIKE $1)
              AND ($2 OR p.is_active)
              AND ($3::TEXT IS NULL OR c.slug = $3)
            {POST_ORDER}"#
        );

        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(like_pattern(term))
            .bind(include_inactive)
            .bind(category_slug)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(results = posts.len(), "Search completed");

        Ok(posts)
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let sql = format!(
            r#"{POST_SELECT}
            LEFT JOIN categories c ON c.id = p.category_id AND c.is_active
            WHERE p.id = $1"#
        );

        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    async fn create_post(
        &self,
        post_id: Uuid,
        title: &str,
        content: &str,
        category_id: Option<i32>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, title, content, category_id, display_order, is_active, created_at, updated_at)
            SELECT $1, $2, $3, $4, COALESCE(MAX(display_order), 0) + 1, TRUE, NOW(), NOW()
            FROM posts
            "#,
        )
        .bind(post_id)
        .bind(title)
        .bind(content)
        .bind(category_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        title: &str,
        content: &str,
        category_id: Option<i32>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = $2,
                content = $3,
                category_id = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(title)
        .bind(content)
        .bind(category_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_post_active(&self, post_id: Uuid, is_active: bool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE posts SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(post_id)
        .bind(is_active)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn order_keys(&self) -> Result<Vec<PostOrderKey>> {
        let keys = sqlx::query_as::<_, PostOrderKey>(
            r#"
            SELECT id, display_order, created_at
            FROM posts
            ORDER BY display_order ASC NULLS LAST, created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    #[instrument(skip_all, fields(posts = order.len()))]
    async fn apply_order(&self, order: &[(Uuid, i32)]) -> Result<()> {
        let (ids, positions): (Vec<Uuid>, Vec<i32>) = order.iter().copied().unzip();

        sqlx::query(
            r#"
            UPDATE posts AS p
            SET display_order = o.display_order
            FROM UNNEST($1::UUID[], $2::INT4[]) AS o(id, display_order)
            WHERE p.id = o.id
            "#,
        )
        .bind(ids)
        .bind(positions)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn post_counts(&self) -> Result<PostCounts> {
        let counts = sqlx::query_as::<_, PostCounts>(
            r#"
            SELECT
                COUNT(*) AS total_posts,
                COUNT(*) FILTER (WHERE is_active) AS active_posts,
                COUNT(*) FILTER (WHERE NOT is_active) AS inactive_posts,
                MAX(created_at) AS latest_post_date
            FROM posts
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}
