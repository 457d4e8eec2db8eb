//! Deterministic demo content for examples and tests.

use time::macros::datetime;
use uuid::Uuid;

use super::MemoryState;
use crate::application::provider::{CreatePostInput, ProviderError, TagInput};
use crate::domain::entities::Author;

pub(super) const SEED_AUTHOR: &str = "Quire Editorial";

pub(super) fn populate(state: &mut MemoryState) -> Result<(), ProviderError> {
    let author = Author {
        id: Uuid::new_v4(),
        name: SEED_AUTHOR.to_string(),
        image: None,
    };
    state.authors.insert(author.id, author.clone());

    state.insert_post(
        CreatePostInput {
            content: "Welcome to the blog. This is the very first post.".to_string(),
            excerpt: "The very first post.".to_string(),
            published: true,
            locale: Some("en".to_string()),
            author_id: Some(author.id),
            tags: vec![TagInput::named("intro")],
            ..CreatePostInput::new("hello-world", "Hello, world")
        },
        datetime!(2025-01-01 09:00 UTC),
    )?;

    state.insert_post(
        CreatePostInput {
            content: "Another post, with a little news attached.".to_string(),
            excerpt: "A little news.".to_string(),
            published: true,
            locale: Some("en".to_string()),
            author_id: Some(author.id),
            tags: vec![TagInput::named("intro"), TagInput::named("news")],
            ..CreatePostInput::new("second-post", "Second post")
        },
        datetime!(2025-01-02 09:00 UTC),
    )?;

    state.insert_post(
        CreatePostInput {
            content: "Notes that are not ready yet.".to_string(),
            author_id: Some(author.id),
            ..CreatePostInput::new("work-in-progress", "Work in progress")
        },
        datetime!(2025-01-03 09:00 UTC),
    )?;

    Ok(())
}
