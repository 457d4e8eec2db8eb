use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::application::provider::{
    BlogWriter, CreatePostInput, ProviderError, ResolvedTag, UpdatePostInput,
    resolve_published_at, resolve_tags,
};
use crate::domain::entities::Post;
use crate::domain::types::PostStatus;

use super::PostgresProvider;
use super::types::PostStateRow;
use super::util::{map_post_write_error, map_sqlx_error};

impl PostgresProvider {
    /// Replace the tag set of `post_id`, creating missing tags by slug.
    async fn replace_post_tags(
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
        tags: &[ResolvedTag],
    ) -> Result<(), ProviderError> {
        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        for (position, tag) in tags.iter().enumerate() {
            let tag_id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO tags (id, slug, name)
                VALUES ($1, $2, $3)
                ON CONFLICT (slug) DO UPDATE SET name = tags.name
                RETURNING id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&tag.slug)
            .bind(&tag.name)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

            let position = i32::try_from(position)
                .map_err(|_| ProviderError::validation("too many tags on one post"))?;
            sqlx::query("INSERT INTO post_tags (post_id, tag_id, position) VALUES ($1, $2, $3)")
                .bind(post_id)
                .bind(tag_id)
                .bind(position)
                .execute(&mut **tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        Ok(())
    }
}

#[async_trait]
impl BlogWriter for PostgresProvider {
    async fn create_post(&self, input: CreatePostInput) -> Result<Post, ProviderError> {
        input.validate()?;
        let tags = resolve_tags(&input.tags)?;

        let CreatePostInput {
            slug,
            title,
            content,
            excerpt,
            image,
            published,
            published_at,
            locale,
            author_id,
            tags: _,
        } = input;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let published_at = resolve_published_at(published, published_at, None, now);

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, slug, title, content, excerpt, image, status, locale,
                published_at, author_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            "#,
        )
        .bind(id)
        .bind(&slug)
        .bind(title)
        .bind(content)
        .bind(excerpt)
        .bind(image)
        .bind(PostStatus::from_published(published))
        .bind(locale)
        .bind(published_at)
        .bind(author_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|err| map_post_write_error(err, &slug))?;

        Self::replace_post_tags(&mut tx, id, &tags).await?;
        let post = Self::load_post(&mut *tx, id).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(
            target = "quire::db",
            slug = %post.slug,
            status = %post.status,
            "post created"
        );
        Ok(post)
    }

    async fn update_post(
        &self,
        slug: &str,
        input: UpdatePostInput,
    ) -> Result<Post, ProviderError> {
        input.validate()?;
        let tags = input.tags.as_deref().map(resolve_tags).transpose()?;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let current: PostStateRow = sqlx::query_as(
            "SELECT id, status, published_at FROM posts WHERE slug = $1 FOR UPDATE",
        )
        .bind(slug)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| ProviderError::not_found(slug))?;

        let now = OffsetDateTime::now_utc();
        let published = input
            .published
            .unwrap_or_else(|| current.status.is_published());
        let published_at =
            resolve_published_at(published, input.published_at, current.published_at, now);
        let target_slug = input.slug.clone().unwrap_or_else(|| slug.to_string());

        sqlx::query(
            r#"
            UPDATE posts
            SET slug = COALESCE($2, slug),
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                excerpt = COALESCE($5, excerpt),
                image = CASE WHEN $12 THEN $6 ELSE image END,
                locale = CASE WHEN $13 THEN $7 ELSE locale END,
                author_id = CASE WHEN $14 THEN $8 ELSE author_id END,
                status = $9,
                published_at = $10,
                updated_at = GREATEST($11, updated_at)
            WHERE id = $1
            "#,
        )
        .bind(current.id)
        .bind(input.slug)
        .bind(input.title)
        .bind(input.content)
        .bind(input.excerpt)
        .bind(input.image.clone().flatten())
        .bind(input.locale.clone().flatten())
        .bind(input.author_id.flatten())
        .bind(PostStatus::from_published(published))
        .bind(published_at)
        .bind(now)
        .bind(input.image.is_some())
        .bind(input.locale.is_some())
        .bind(input.author_id.is_some())
        .execute(&mut *tx)
        .await
        .map_err(|err| map_post_write_error(err, &target_slug))?;

        if let Some(tags) = tags {
            Self::replace_post_tags(&mut tx, current.id, &tags).await?;
        }

        let post = Self::load_post(&mut *tx, current.id).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(
            target = "quire::db",
            slug = %post.slug,
            status = %post.status,
            "post updated"
        );
        Ok(post)
    }

    async fn delete_post(&self, slug: &str) -> Result<(), ProviderError> {
        let result = sqlx::query("DELETE FROM posts WHERE slug = $1")
            .bind(slug)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(ProviderError::not_found(slug));
        }

        debug!(target = "quire::db", slug, "post deleted");
        Ok(())
    }
}
