use async_trait::async_trait;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::application::provider::{BlogReader, PostFilter, PostLookup, ProviderError};
use crate::domain::entities::Post;

use super::PostgresProvider;
use super::types::PostRow;
use super::util::map_sqlx_error;

impl PostgresProvider {
    /// Load one fully hydrated post by id on any executor, so writes can read
    /// back their own result before committing.
    pub(super) async fn load_post<'e, E>(executor: E, id: Uuid) -> Result<Post, ProviderError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = Self::select_posts();
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_one(executor)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Post::from(row))
    }
}

#[async_trait]
impl BlogReader for PostgresProvider {
    async fn get_all_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, ProviderError> {
        let mut qb = Self::select_posts();
        Self::apply_post_filter(&mut qb, filter);
        Self::push_page(&mut qb, filter);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn get_post_by_slug(
        &self,
        slug: &str,
        lookup: &PostLookup,
    ) -> Result<Option<Post>, ProviderError> {
        let mut qb = Self::select_posts();
        qb.push(" AND p.slug = ");
        qb.push_bind(slug);
        if let Some(locale) = lookup.locale.as_ref() {
            qb.push(" AND p.locale = ");
            qb.push_bind(locale);
        }

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Post::from))
    }
}
