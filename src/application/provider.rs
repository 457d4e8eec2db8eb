//! Provider contract shared by every blog backend.
//!
//! Reading is mandatory, writing is a separate capability: a read-only
//! backend implements [`BlogReader`] alone and callers hold the writer as an
//! `Option`.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{Post, validate_locale, validate_tag_name, validate_title};
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugError, derive_slug, validate_slug};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("post `{slug}` not found")]
    NotFound { slug: String },
    #[error("a post with slug `{slug}` already exists")]
    Conflict { slug: String },
    #[error("invalid input: {message}")]
    Validation { message: String },
    #[error("connection failure: {0}")]
    Connection(String),
    #[error("database timeout")]
    Timeout,
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("backend does not support `{operation}`")]
    Unsupported { operation: &'static str },
}

impl ProviderError {
    pub fn not_found(slug: impl Into<String>) -> Self {
        Self::NotFound { slug: slug.into() }
    }

    pub fn conflict(slug: impl Into<String>) -> Self {
        Self::Conflict { slug: slug.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<SlugError> for ProviderError {
    fn from(err: SlugError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<DomainError> for ProviderError {
    fn from(err: DomainError) -> Self {
        Self::validation(err.to_string())
    }
}

/// Query descriptor for [`BlogReader::get_all_posts`]. Every present field
/// narrows the result; absent fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostFilter {
    pub slug: Option<String>,
    pub tag: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub query: Option<String>,
    pub published: Option<bool>,
    pub locale: Option<String>,
}

impl PostFilter {
    pub fn by_slug(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            ..Default::default()
        }
    }

    pub fn by_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    /// Copy of this filter restricted to one page.
    pub fn page(&self, offset: u32, limit: u32) -> Self {
        Self {
            offset: Some(offset),
            limit: Some(limit),
            ..self.clone()
        }
    }

    /// Whether `post` satisfies every predicate of this filter. Pagination is
    /// not a predicate and is ignored here.
    pub fn matches(&self, post: &Post) -> bool {
        if self.slug.as_deref().is_some_and(|slug| post.slug != slug) {
            return false;
        }
        if self.tag.as_deref().is_some_and(|tag| !post.has_tag(tag)) {
            return false;
        }
        if self
            .published
            .is_some_and(|published| post.published != published)
        {
            return false;
        }
        if self
            .locale
            .as_deref()
            .is_some_and(|locale| post.locale.as_deref() != Some(locale))
        {
            return false;
        }
        if let Some(query) = self.query.as_deref() {
            let needle = query.to_lowercase();
            let hit = post.title.to_lowercase().contains(&needle)
                || post.content.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostLookup {
    pub locale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

impl TagInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: None,
        }
    }

    /// The slug this tag is stored under: the explicit one, or one derived from the name.
    pub fn resolved_slug(&self) -> Result<String, ProviderError> {
        match self.slug.as_deref() {
            Some(slug) => {
                validate_slug(slug)?;
                Ok(slug.to_string())
            }
            None => Ok(derive_slug(&self.name)?),
        }
    }
}

/// A tag ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTag {
    pub slug: String,
    pub name: String,
}

/// Resolve and dedupe tag inputs, keeping first occurrence order.
pub fn resolve_tags(inputs: &[TagInput]) -> Result<Vec<ResolvedTag>, ProviderError> {
    let mut resolved: Vec<ResolvedTag> = Vec::with_capacity(inputs.len());
    for input in inputs {
        validate_tag_name(&input.name)?;
        let name = input.name.trim();
        let slug = input.resolved_slug()?;
        if resolved.iter().any(|tag| tag.slug == slug) {
            continue;
        }
        resolved.push(ResolvedTag {
            slug,
            name: name.to_string(),
        });
    }
    Ok(resolved)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<TagInput>,
}

impl CreatePostInput {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            content: String::new(),
            excerpt: String::new(),
            image: None,
            published: false,
            published_at: None,
            locale: None,
            author_id: None,
            tags: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        validate_slug(&self.slug)?;
        validate_title(&self.title)?;
        if let Some(locale) = self.locale.as_deref() {
            validate_locale(locale)?;
        }
        Ok(())
    }
}

/// Partial update; `None` leaves the stored value untouched and
/// `tags: Some(..)` replaces the whole tag set.
///
/// The nullable columns take a second level: `Some(None)` (JSON `null`)
/// clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePostInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<Option<String>>,
    pub published: Option<bool>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub locale: Option<Option<String>>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub author_id: Option<Option<Uuid>>,
    pub tags: Option<Vec<TagInput>>,
}

/// A field that is present deserializes to `Some`, even when it is `null`;
/// an absent field falls back to the container default.
fn present_or_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdatePostInput {
    pub fn validate(&self) -> Result<(), ProviderError> {
        if let Some(slug) = self.slug.as_deref() {
            validate_slug(slug)?;
        }
        if let Some(title) = self.title.as_deref() {
            validate_title(title)?;
        }
        if let Some(Some(locale)) = self.locale.as_ref() {
            validate_locale(locale)?;
        }
        Ok(())
    }
}

/// Publication timestamp convention: published posts always carry one,
/// drafts never do.
pub fn resolve_published_at(
    published: bool,
    requested: Option<OffsetDateTime>,
    current: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Option<OffsetDateTime> {
    if !published {
        return None;
    }
    requested.or(current).or(Some(now))
}

#[async_trait]
pub trait BlogReader: Send + Sync {
    /// Posts matching every field of `filter`, newest first. An empty match is
    /// an empty vector, never an error.
    async fn get_all_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, ProviderError>;

    /// Exact slug lookup. Backends without a dedicated path fall back to a
    /// slug-filtered listing.
    async fn get_post_by_slug(
        &self,
        slug: &str,
        lookup: &PostLookup,
    ) -> Result<Option<Post>, ProviderError> {
        let filter = PostFilter {
            slug: Some(slug.to_string()),
            locale: lookup.locale.clone(),
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.get_all_posts(&filter).await?.into_iter().next())
    }
}

#[async_trait]
pub trait BlogWriter: Send + Sync {
    async fn create_post(&self, input: CreatePostInput) -> Result<Post, ProviderError>;

    async fn update_post(&self, slug: &str, input: UpdatePostInput)
    -> Result<Post, ProviderError>;

    /// Fails with [`ProviderError::NotFound`] when no post has `slug`.
    async fn delete_post(&self, slug: &str) -> Result<(), ProviderError>;
}
