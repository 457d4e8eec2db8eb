use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{Author, Post, Tag};
use crate::domain::types::PostStatus;

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: Uuid,
    pub(crate) slug: String,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) excerpt: String,
    pub(crate) image: Option<String>,
    pub(crate) status: PostStatus,
    pub(crate) locale: Option<String>,
    pub(crate) published_at: Option<OffsetDateTime>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
    pub(crate) author_id: Option<Uuid>,
    pub(crate) author_name: Option<String>,
    pub(crate) author_image: Option<String>,
    pub(crate) tags: Json<Vec<Tag>>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let author = match (row.author_id, row.author_name) {
            (Some(id), Some(name)) => Some(Author {
                id,
                name,
                image: row.author_image,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            content: row.content,
            excerpt: row.excerpt,
            image: row.image,
            published: row.status.is_published(),
            status: row.status,
            locale: row.locale,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author_id: row.author_id,
            author,
            tags: row.tags.0,
        }
    }
}

/// Current values of a post row, locked for update.
#[derive(sqlx::FromRow)]
pub(crate) struct PostStateRow {
    pub(crate) id: Uuid,
    pub(crate) status: PostStatus,
    pub(crate) published_at: Option<OffsetDateTime>,
}
