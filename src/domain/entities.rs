//! Blog records as handed out by every provider.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DomainError;
use super::types::PostStatus;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub published: bool,
    pub status: PostStatus,
    pub locale: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub author_id: Option<Uuid>,
    pub author: Option<Author>,
    pub tags: Vec<Tag>,
}

impl Post {
    pub fn has_tag(&self, needle: &str) -> bool {
        self.tags
            .iter()
            .any(|tag| tag.slug == needle || tag.name == needle)
    }
}

/// Titles are free text but must contain something besides whitespace.
pub fn validate_title(title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::BlankTitle);
    }
    Ok(())
}

pub fn validate_tag_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::BlankTagName);
    }
    Ok(())
}

/// Accepts BCP 47 shaped tags: a 2-3 letter language followed by
/// alphanumeric subtags of 1-8 characters, joined by hyphens.
pub fn validate_locale(locale: &str) -> Result<(), DomainError> {
    let mut subtags = locale.split('-');
    let language_ok = subtags.next().is_some_and(|language| {
        (2..=3).contains(&language.len()) && language.bytes().all(|b| b.is_ascii_alphabetic())
    });
    let rest_ok = subtags.all(|subtag| {
        (1..=8).contains(&subtag.len()) && subtag.bytes().all(|b| b.is_ascii_alphanumeric())
    });

    if language_ok && rest_ok {
        Ok(())
    } else {
        Err(DomainError::InvalidLocale {
            locale: locale.to_string(),
        })
    }
}
