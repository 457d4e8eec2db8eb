//! Postgres-backed provider implementation.

mod migrations;
mod read;
mod types;
mod util;
mod write;

pub use migrations::{MigrationState, MigrationStatus, Migrations};
pub use util::{map_post_write_error, map_sqlx_error};

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder, Transaction,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::provider::PostFilter;
use crate::domain::types::PostStatus;

const POST_SELECT: &str = "SELECT p.id, p.slug, p.title, p.content, p.excerpt, p.image, \
    p.status, p.locale, p.published_at, p.created_at, p.updated_at, p.author_id, \
    a.name AS author_name, a.image AS author_image, \
    COALESCE(( \
        SELECT json_agg(json_build_object('id', t.id, 'slug', t.slug, 'name', t.name) \
                        ORDER BY pt.position) \
        FROM post_tags pt \
        INNER JOIN tags t ON t.id = pt.tag_id \
        WHERE pt.post_id = p.id \
    ), '[]'::json) AS tags \
    FROM posts p \
    LEFT JOIN authors a ON a.id = p.author_id \
    WHERE 1=1 ";

#[derive(Clone)]
pub struct PostgresProvider {
    pool: Arc<PgPool>,
}

impl PostgresProvider {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn select_posts<'q>() -> QueryBuilder<'q, Postgres> {
        QueryBuilder::new(POST_SELECT)
    }

    fn apply_post_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PostFilter) {
        if let Some(slug) = filter.slug.as_ref() {
            qb.push(" AND p.slug = ");
            qb.push_bind(slug);
        }

        if let Some(tag) = filter.tag.as_ref() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM post_tags pt INNER JOIN tags t ON t.id = pt.tag_id WHERE pt.post_id = p.id AND (t.slug = ",
            );
            qb.push_bind(tag);
            qb.push(" OR t.name = ");
            qb.push_bind(tag);
            qb.push("))");
        }

        if let Some(published) = filter.published {
            qb.push(" AND p.status = ");
            qb.push_bind(PostStatus::from_published(published));
        }

        if let Some(locale) = filter.locale.as_ref() {
            qb.push(" AND p.locale = ");
            qb.push_bind(locale);
        }

        if let Some(search) = filter.query.as_ref() {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (p.title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR p.content ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    fn push_page(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
        qb.push(" ORDER BY p.created_at DESC, p.id DESC ");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::from(limit));
        }
        if let Some(offset) = filter.offset {
            qb.push(" OFFSET ");
            qb.push_bind(i64::from(offset));
        }
    }
}

/// Escape `LIKE` metacharacters so user input only matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
