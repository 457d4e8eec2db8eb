//! Non-durable, single-process provider backed by an in-memory post list.
//!
//! Reads do a full linear scan applying every filter predicate and then slice
//! by offset/limit. Tags and authors live in maps keyed by id and are joined
//! onto posts when they are handed out.

mod seed;

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::application::provider::{
    BlogReader, BlogWriter, CreatePostInput, PostFilter, ProviderError, ResolvedTag,
    UpdatePostInput, resolve_published_at, resolve_tags,
};
use crate::domain::entities::{Author, Post, Tag};
use crate::domain::types::PostStatus;
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "infra::memory";

#[derive(Debug, Clone)]
struct StoredPost {
    seq: u64,
    id: Uuid,
    slug: String,
    title: String,
    content: String,
    excerpt: String,
    image: Option<String>,
    published: bool,
    locale: Option<String>,
    published_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    author_id: Option<Uuid>,
    tag_ids: Vec<Uuid>,
}

#[derive(Debug, Default)]
struct MemoryState {
    posts: Vec<StoredPost>,
    tags: HashMap<Uuid, Tag>,
    authors: HashMap<Uuid, Author>,
    next_seq: u64,
}

impl MemoryState {
    fn hydrate(&self, stored: &StoredPost) -> Post {
        Post {
            id: stored.id,
            slug: stored.slug.clone(),
            title: stored.title.clone(),
            content: stored.content.clone(),
            excerpt: stored.excerpt.clone(),
            image: stored.image.clone(),
            published: stored.published,
            status: PostStatus::from_published(stored.published),
            locale: stored.locale.clone(),
            published_at: stored.published_at,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            author_id: stored.author_id,
            author: stored
                .author_id
                .and_then(|id| self.authors.get(&id))
                .cloned(),
            tags: stored
                .tag_ids
                .iter()
                .filter_map(|id| self.tags.get(id))
                .cloned()
                .collect(),
        }
    }

    fn position(&self, slug: &str) -> Option<usize> {
        self.posts.iter().position(|post| post.slug == slug)
    }

    fn ensure_author(&self, author_id: Option<Uuid>) -> Result<(), ProviderError> {
        match author_id {
            Some(id) if !self.authors.contains_key(&id) => Err(ProviderError::validation(
                format!("author `{id}` does not exist"),
            )),
            _ => Ok(()),
        }
    }

    /// Get-or-create by slug; an existing tag keeps its stored name.
    fn upsert_tags(&mut self, resolved: Vec<ResolvedTag>) -> Vec<Uuid> {
        resolved
            .into_iter()
            .map(|tag| {
                if let Some(existing) = self.tags.values().find(|t| t.slug == tag.slug) {
                    return existing.id;
                }
                let id = Uuid::new_v4();
                self.tags.insert(
                    id,
                    Tag {
                        id,
                        slug: tag.slug,
                        name: tag.name,
                    },
                );
                id
            })
            .collect()
    }

    fn insert_post(
        &mut self,
        input: CreatePostInput,
        created_at: OffsetDateTime,
    ) -> Result<Post, ProviderError> {
        input.validate()?;
        let resolved = resolve_tags(&input.tags)?;
        if self.position(&input.slug).is_some() {
            return Err(ProviderError::conflict(input.slug));
        }
        self.ensure_author(input.author_id)?;

        let tag_ids = self.upsert_tags(resolved);
        let seq = self.next_seq;
        self.next_seq += 1;

        let stored = StoredPost {
            seq,
            id: Uuid::new_v4(),
            published_at: resolve_published_at(
                input.published,
                input.published_at,
                None,
                created_at,
            ),
            slug: input.slug,
            title: input.title,
            content: input.content,
            excerpt: input.excerpt,
            image: input.image,
            published: input.published,
            locale: input.locale,
            created_at,
            updated_at: created_at,
            author_id: input.author_id,
            tag_ids,
        };
        let post = self.hydrate(&stored);
        self.posts.push(stored);
        Ok(post)
    }
}

#[derive(Debug, Default)]
pub struct MemoryProvider {
    state: RwLock<MemoryState>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider pre-populated with the demo authors and posts.
    pub fn seeded() -> Result<Self, ProviderError> {
        let provider = Self::new();
        {
            let mut state = rw_write(&provider.state, SOURCE, "seed");
            seed::populate(&mut state)?;
        }
        Ok(provider)
    }

    pub fn insert_author(&self, name: impl Into<String>, image: Option<String>) -> Author {
        let author = Author {
            id: Uuid::new_v4(),
            name: name.into(),
            image,
        };
        rw_write(&self.state, SOURCE, "insert_author")
            .authors
            .insert(author.id, author.clone());
        author
    }

    pub fn len(&self) -> usize {
        rw_read(&self.state, SOURCE, "len").posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlogReader for MemoryProvider {
    async fn get_all_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, ProviderError> {
        let state = rw_read(&self.state, SOURCE, "get_all_posts");

        let mut matched: Vec<(&StoredPost, Post)> = state
            .posts
            .iter()
            .map(|stored| (stored, state.hydrate(stored)))
            .filter(|(_, post)| filter.matches(post))
            .collect();
        matched.sort_by(|(a, _), (b, _)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, post)| post)
            .collect())
    }
}

#[async_trait]
impl BlogWriter for MemoryProvider {
    async fn create_post(&self, input: CreatePostInput) -> Result<Post, ProviderError> {
        let mut state = rw_write(&self.state, SOURCE, "create_post");
        let post = state.insert_post(input, OffsetDateTime::now_utc())?;
        debug!(target = "quire::memory", slug = %post.slug, "post created");
        Ok(post)
    }

    async fn update_post(
        &self,
        slug: &str,
        input: UpdatePostInput,
    ) -> Result<Post, ProviderError> {
        input.validate()?;
        let resolved = input.tags.as_deref().map(resolve_tags).transpose()?;

        let mut state = rw_write(&self.state, SOURCE, "update_post");
        let index = state
            .position(slug)
            .ok_or_else(|| ProviderError::not_found(slug))?;
        if let Some(new_slug) = input.slug.as_deref() {
            if new_slug != slug && state.position(new_slug).is_some() {
                return Err(ProviderError::conflict(new_slug));
            }
        }
        state.ensure_author(input.author_id.flatten())?;

        let tag_ids = resolved.map(|tags| state.upsert_tags(tags));
        let now = OffsetDateTime::now_utc();
        let stored = &mut state.posts[index];

        let published = input.published.unwrap_or(stored.published);
        stored.published_at =
            resolve_published_at(published, input.published_at, stored.published_at, now);
        stored.published = published;
        if let Some(slug) = input.slug {
            stored.slug = slug;
        }
        if let Some(title) = input.title {
            stored.title = title;
        }
        if let Some(content) = input.content {
            stored.content = content;
        }
        if let Some(excerpt) = input.excerpt {
            stored.excerpt = excerpt;
        }
        if let Some(image) = input.image {
            stored.image = image;
        }
        if let Some(locale) = input.locale {
            stored.locale = locale;
        }
        if let Some(author_id) = input.author_id {
            stored.author_id = author_id;
        }
        if let Some(tag_ids) = tag_ids {
            stored.tag_ids = tag_ids;
        }
        stored.updated_at = now.max(stored.updated_at);

        let stored = stored.clone();
        debug!(target = "quire::memory", slug = %stored.slug, "post updated");
        Ok(state.hydrate(&stored))
    }

    async fn delete_post(&self, slug: &str) -> Result<(), ProviderError> {
        let mut state = rw_write(&self.state, SOURCE, "delete_post");
        let index = state
            .position(slug)
            .ok_or_else(|| ProviderError::not_found(slug))?;
        state.posts.remove(index);
        debug!(target = "quire::memory", slug, "post deleted");
        Ok(())
    }
}
