//! Tag aggregation over the post listing contract.
//!
//! Works against any [`BlogReader`]: posts are fetched page by page with an
//! advancing offset and their tags folded into a set keyed by tag id.

use std::collections::HashMap;

use futures::stream::{self, BoxStream, TryStreamExt};
use tracing::debug;
use uuid::Uuid;

use crate::application::provider::{BlogReader, PostFilter, ProviderError};
use crate::domain::entities::{Post, Tag};

pub const DEFAULT_TAG_PAGE_SIZE: u32 = 50;

/// Stream successive pages of posts matching `base`.
///
/// Ends after the first page shorter than `page_size` or the first empty
/// page, so a store holding an exact multiple of `page_size` posts costs one
/// extra (empty) fetch.
pub fn paged_posts<'a, R>(
    reader: &'a R,
    base: &PostFilter,
    page_size: u32,
) -> BoxStream<'a, Result<Vec<Post>, ProviderError>>
where
    R: BlogReader + ?Sized,
{
    let page_size = page_size.max(1);
    let base = base.clone();

    let pages = stream::try_unfold(Some(0u32), move |cursor| {
        let filter = cursor.map(|offset| base.page(offset, page_size));
        async move {
            let Some(filter) = filter else {
                return Ok(None);
            };
            let offset = filter.offset.unwrap_or(0);
            let page = reader.get_all_posts(&filter).await?;
            if page.is_empty() {
                return Ok(None);
            }

            let fetched = u32::try_from(page.len()).unwrap_or(u32::MAX);
            let next = (fetched >= page_size).then(|| offset.saturating_add(fetched));
            Ok(Some((page, next)))
        }
    });

    Box::pin(pages)
}

/// Every distinct tag attached to a post matching `base`, sorted by name
/// ignoring case, then by exact name and slug.
pub async fn collect_tags<R>(
    reader: &R,
    base: &PostFilter,
    page_size: u32,
) -> Result<Vec<Tag>, ProviderError>
where
    R: BlogReader + ?Sized,
{
    let mut pages = paged_posts(reader, base, page_size);
    let mut by_id: HashMap<Uuid, Tag> = HashMap::new();
    let mut scanned = 0usize;

    while let Some(page) = pages.try_next().await? {
        scanned += page.len();
        for post in page {
            for tag in post.tags {
                by_id.entry(tag.id).or_insert(tag);
            }
        }
    }

    let mut tags: Vec<Tag> = by_id.into_values().collect();
    tags.sort_by_cached_key(|tag| {
        (
            tag.name.to_lowercase(),
            tag.name.clone(),
            tag.slug.clone(),
        )
    });

    debug!(
        target = "quire::tags",
        posts = scanned,
        tags = tags.len(),
        "aggregated tag list"
    );

    Ok(tags)
}
