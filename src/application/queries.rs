//! Query keys and the cached read path over a provider.
//!
//! Every read is addressed by a [`QueryKey`]. Results are kept in an LRU
//! cache until they go stale or a mutation through [`BlogQueries`]
//! invalidates their [`QueryScope`].

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::{counter, histogram};
use tracing::{debug, info};

use crate::application::provider::{
    BlogReader, BlogWriter, CreatePostInput, PostFilter, PostLookup, ProviderError,
    UpdatePostInput,
};
use crate::application::tags::{DEFAULT_TAG_PAGE_SIZE, collect_tags};
use crate::domain::entities::{Post, Tag};
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "application::queries";
const DEFAULT_CACHE_CAPACITY: usize = 256;
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryScope {
    Posts,
    Tags,
}

impl QueryScope {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryScope::Posts => "posts",
            QueryScope::Tags => "tags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    PostList(PostFilter),
    PostDetail {
        slug: String,
        locale: Option<String>,
    },
    TagList,
}

impl QueryKey {
    pub fn post_list(filter: &PostFilter) -> Self {
        Self::PostList(filter.clone())
    }

    pub fn post_detail(slug: &str, lookup: &PostLookup) -> Self {
        Self::PostDetail {
            slug: slug.to_string(),
            locale: lookup.locale.clone(),
        }
    }

    pub fn scope(&self) -> QueryScope {
        match self {
            QueryKey::PostList(_) | QueryKey::PostDetail { .. } => QueryScope::Posts,
            QueryKey::TagList => QueryScope::Tags,
        }
    }

    /// Hierarchical key, most general segment first.
    pub fn segments(&self) -> Vec<String> {
        let scope = self.scope().as_str().to_string();
        match self {
            QueryKey::PostList(filter) => vec![
                scope,
                "list".to_string(),
                serde_json::to_string(filter).unwrap_or_default(),
            ],
            QueryKey::PostDetail { slug, locale } => vec![
                scope,
                "detail".to_string(),
                slug.clone(),
                locale.clone().unwrap_or_default(),
            ],
            QueryKey::TagList => vec![scope, "list".to_string()],
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join("/"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Posts(Vec<Post>),
    Post(Option<Post>),
    Tags(Vec<Tag>),
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub capacity: NonZeroUsize,
    pub stale_after: Duration,
    pub tag_page_size: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            stale_after: DEFAULT_STALE_AFTER,
            tag_page_size: DEFAULT_TAG_PAGE_SIZE,
        }
    }
}

struct Entry {
    value: CachedValue,
    stored_at: Instant,
}

struct CacheState {
    entries: LruCache<QueryKey, Entry>,
    posts_generation: u64,
    tags_generation: u64,
}

impl CacheState {
    fn generation_mut(&mut self, scope: QueryScope) -> &mut u64 {
        match scope {
            QueryScope::Posts => &mut self.posts_generation,
            QueryScope::Tags => &mut self.tags_generation,
        }
    }
}

/// LRU of query results with a stale time.
///
/// Each scope carries a generation bumped by [`QueryCache::invalidate`]. A
/// result fetched under an older generation is refused by
/// [`QueryCache::put`], so a read that overlaps a write cannot repopulate
/// the cache with pre-write data.
pub struct QueryCache {
    state: RwLock<CacheState>,
    stale_after: Duration,
}

impl QueryCache {
    pub fn new(capacity: NonZeroUsize, stale_after: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: LruCache::new(capacity),
                posts_generation: 0,
                tags_generation: 0,
            }),
            stale_after,
        }
    }

    /// Current generation of `scope`; pass it to [`QueryCache::put`].
    pub fn generation(&self, scope: QueryScope) -> u64 {
        let state = rw_read(&self.state, SOURCE, "generation");
        match scope {
            QueryScope::Posts => state.posts_generation,
            QueryScope::Tags => state.tags_generation,
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<CachedValue> {
        let mut state = rw_write(&self.state, SOURCE, "get");
        let entries = &mut state.entries;
        let fresh = entries
            .get(key)
            .map(|entry| entry.stored_at.elapsed() < self.stale_after);

        match fresh {
            Some(true) => {
                counter!("quire_query_cache_hit_total").increment(1);
                entries.get(key).map(|entry| entry.value.clone())
            }
            Some(false) => {
                entries.pop(key);
                counter!("quire_query_cache_miss_total").increment(1);
                None
            }
            None => {
                counter!("quire_query_cache_miss_total").increment(1);
                None
            }
        }
    }

    /// Store `value` unless `key`'s scope was invalidated after
    /// `generation` was read. Returns whether the value was stored.
    pub fn put(&self, key: QueryKey, value: CachedValue, generation: u64) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "put");
        let current = *state.generation_mut(key.scope());
        if current != generation {
            debug!(
                target = "quire::queries",
                key = %key,
                fetched_at = generation,
                current,
                "discarding result fetched before invalidation"
            );
            return false;
        }

        let entry = Entry {
            value,
            stored_at: Instant::now(),
        };
        let evicted = state.entries.push(key.clone(), entry);
        if evicted.is_some_and(|(evicted_key, _)| evicted_key != key) {
            counter!("quire_query_cache_evict_total").increment(1);
        }
        true
    }

    /// Drop every entry in `scope` and advance its generation, returning
    /// how many entries were removed.
    pub fn invalidate(&self, scope: QueryScope) -> usize {
        let mut state = rw_write(&self.state, SOURCE, "invalidate");
        *state.generation_mut(scope) += 1;
        let doomed: Vec<QueryKey> = state
            .entries
            .iter()
            .filter(|(key, _)| key.scope() == scope)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            state.entries.pop(key);
        }
        counter!("quire_query_cache_invalidate_total").increment(doomed.len() as u64);
        doomed.len()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cached reads and cache-invalidating writes over one provider.
#[derive(Clone)]
pub struct BlogQueries {
    reader: Arc<dyn BlogReader>,
    writer: Option<Arc<dyn BlogWriter>>,
    cache: Arc<QueryCache>,
    tag_page_size: u32,
}

impl BlogQueries {
    pub fn new(
        reader: Arc<dyn BlogReader>,
        writer: Option<Arc<dyn BlogWriter>>,
        config: QueryConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            cache: Arc::new(QueryCache::new(config.capacity, config.stale_after)),
            tag_page_size: config.tag_page_size,
        }
    }

    /// Convenience for backends that implement both halves of the contract.
    pub fn for_provider<P>(provider: Arc<P>, config: QueryConfig) -> Self
    where
        P: BlogReader + BlogWriter + 'static,
    {
        let reader: Arc<dyn BlogReader> = provider.clone();
        let writer: Arc<dyn BlogWriter> = provider;
        Self::new(reader, Some(writer), config)
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn can_write(&self) -> bool {
        self.writer.is_some()
    }

    pub async fn posts(&self, filter: &PostFilter) -> Result<Vec<Post>, ProviderError> {
        let key = QueryKey::post_list(filter);
        if let Some(CachedValue::Posts(posts)) = self.cache.get(&key) {
            return Ok(posts);
        }

        let generation = self.cache.generation(key.scope());
        let posts = self.reader.get_all_posts(filter).await?;
        self.cache.put(key, CachedValue::Posts(posts.clone()), generation);
        Ok(posts)
    }

    pub async fn post(
        &self,
        slug: &str,
        lookup: &PostLookup,
    ) -> Result<Option<Post>, ProviderError> {
        let key = QueryKey::post_detail(slug, lookup);
        if let Some(CachedValue::Post(post)) = self.cache.get(&key) {
            return Ok(post);
        }

        let generation = self.cache.generation(key.scope());
        let post = self.reader.get_post_by_slug(slug, lookup).await?;
        self.cache.put(key, CachedValue::Post(post.clone()), generation);
        Ok(post)
    }

    pub async fn tags(&self) -> Result<Vec<Tag>, ProviderError> {
        let key = QueryKey::TagList;
        if let Some(CachedValue::Tags(tags)) = self.cache.get(&key) {
            return Ok(tags);
        }

        let generation = self.cache.generation(key.scope());
        let started_at = Instant::now();
        let tags = collect_tags(
            self.reader.as_ref(),
            &PostFilter::default(),
            self.tag_page_size,
        )
        .await?;
        histogram!("quire_tag_aggregation_ms").record(started_at.elapsed().as_secs_f64() * 1000.0);
        self.cache.put(key, CachedValue::Tags(tags.clone()), generation);
        Ok(tags)
    }

    pub async fn create_post(&self, input: CreatePostInput) -> Result<Post, ProviderError> {
        let post = self.writer("create_post")?.create_post(input).await?;
        self.invalidate_after_write("create_post", &post.slug);
        Ok(post)
    }

    pub async fn update_post(
        &self,
        slug: &str,
        input: UpdatePostInput,
    ) -> Result<Post, ProviderError> {
        let post = self.writer("update_post")?.update_post(slug, input).await?;
        self.invalidate_after_write("update_post", slug);
        Ok(post)
    }

    pub async fn delete_post(&self, slug: &str) -> Result<(), ProviderError> {
        self.writer("delete_post")?.delete_post(slug).await?;
        self.invalidate_after_write("delete_post", slug);
        Ok(())
    }

    fn writer(&self, operation: &'static str) -> Result<&Arc<dyn BlogWriter>, ProviderError> {
        self.writer
            .as_ref()
            .ok_or(ProviderError::unsupported(operation))
    }

    fn invalidate_after_write(&self, operation: &'static str, slug: &str) {
        let posts = self.cache.invalidate(QueryScope::Posts);
        let tags = self.cache.invalidate(QueryScope::Tags);
        info!(
            target = "quire::queries",
            operation,
            slug,
            "post mutated"
        );
        debug!(
            target = "quire::queries",
            posts_invalidated = posts,
            tags_invalidated = tags,
            "query cache invalidated"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::infra::memory::MemoryProvider;

    #[derive(Default)]
    struct CountingReader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BlogReader for CountingReader {
        async fn get_all_posts(&self, _filter: &PostFilter) -> Result<Vec<Post>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    /// Returns the listing it fetched, but only after pushing a write
    /// through `queries` on its first call, so the write lands between the
    /// fetch and the cache store.
    struct OverlappingReader {
        store: Arc<MemoryProvider>,
        queries: OnceLock<BlogQueries>,
        overlapped: AtomicBool,
    }

    #[async_trait]
    impl BlogReader for OverlappingReader {
        async fn get_all_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, ProviderError> {
            let fetched = self.store.get_all_posts(filter).await?;
            if self.overlapped.swap(true, Ordering::SeqCst) {
                return Ok(fetched);
            }
            if let Some(queries) = self.queries.get() {
                let mut input = CreatePostInput::new("fresh", "Fresh");
                input.published = true;
                queries.create_post(input).await?;
            }
            Ok(fetched)
        }
    }

    fn small_cache(capacity: usize) -> QueryCache {
        QueryCache::new(
            NonZeroUsize::new(capacity).expect("non-zero"),
            Duration::from_secs(60),
        )
    }

    fn store(cache: &QueryCache, key: QueryKey, value: CachedValue) {
        let generation = cache.generation(key.scope());
        assert!(cache.put(key, value, generation));
    }

    #[test]
    fn keys_render_hierarchically() {
        insta::assert_snapshot!(QueryKey::TagList.to_string(), @"tags/list");
        insta::assert_snapshot!(
            QueryKey::post_detail("hello-world", &PostLookup { locale: Some("en".into()) }).to_string(),
            @"posts/detail/hello-world/en"
        );
        insta::assert_snapshot!(
            QueryKey::post_list(&PostFilter::by_tag("intro")).to_string(),
            @r#"posts/list/{"slug":null,"tag":"intro","offset":null,"limit":null,"query":null,"published":null,"locale":null}"#
        );
    }

    #[test]
    fn distinct_filters_produce_distinct_keys() {
        let a = QueryKey::post_list(&PostFilter::by_tag("intro"));
        let b = QueryKey::post_list(&PostFilter::by_tag("news"));
        assert_ne!(a, b);
        assert_eq!(a, QueryKey::post_list(&PostFilter::by_tag("intro")));
    }

    #[test]
    fn invalidate_only_touches_the_requested_scope() {
        let cache = small_cache(8);
        store(&cache, QueryKey::TagList, CachedValue::Tags(Vec::new()));
        store(
            &cache,
            QueryKey::post_list(&PostFilter::default()),
            CachedValue::Posts(Vec::new()),
        );
        store(
            &cache,
            QueryKey::post_detail("a", &PostLookup::default()),
            CachedValue::Post(None),
        );

        assert_eq!(cache.invalidate(QueryScope::Posts), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&QueryKey::TagList).is_some());
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let cache = small_cache(1);
        store(&cache, QueryKey::TagList, CachedValue::Tags(Vec::new()));
        store(
            &cache,
            QueryKey::post_list(&PostFilter::default()),
            CachedValue::Posts(Vec::new()),
        );
        assert!(cache.get(&QueryKey::TagList).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn stale_entries_are_dropped_on_read() {
        let cache = QueryCache::new(NonZeroUsize::MIN, Duration::ZERO);
        store(&cache, QueryKey::TagList, CachedValue::Tags(Vec::new()));
        assert!(cache.get(&QueryKey::TagList).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn repeated_reads_hit_the_cache() {
        let reader = Arc::new(CountingReader::default());
        let queries = BlogQueries::new(reader.clone(), None, QueryConfig::default());

        queries.posts(&PostFilter::default()).await.expect("first");
        queries.posts(&PostFilter::default()).await.expect("second");
        queries.posts(&PostFilter::by_tag("x")).await.expect("third");

        assert_eq!(reader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn writes_without_writer_are_unsupported() {
        let queries = BlogQueries::new(
            Arc::new(CountingReader::default()),
            None,
            QueryConfig::default(),
        );
        assert!(!queries.can_write());

        let err = queries.delete_post("anything").await.expect_err("read-only");
        assert!(matches!(
            err,
            ProviderError::Unsupported {
                operation: "delete_post"
            }
        ));
    }

    #[test]
    fn put_refuses_results_fetched_before_invalidation() {
        let cache = small_cache(8);
        let key = QueryKey::post_list(&PostFilter::default());
        let before = cache.generation(QueryScope::Posts);

        cache.invalidate(QueryScope::Posts);

        assert!(!cache.put(key.clone(), CachedValue::Posts(Vec::new()), before));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.generation(QueryScope::Tags), 0);
    }

    #[tokio::test]
    async fn write_during_read_is_visible_to_the_next_read() {
        let store = Arc::new(MemoryProvider::new());
        let reader = Arc::new(OverlappingReader {
            store: store.clone(),
            queries: OnceLock::new(),
            overlapped: AtomicBool::new(false),
        });
        let writer: Arc<dyn BlogWriter> = store;
        let queries = BlogQueries::new(reader.clone(), Some(writer), QueryConfig::default());
        assert!(reader.queries.set(queries.clone()).is_ok());

        let during = queries.posts(&PostFilter::default()).await.expect("first read");
        assert!(during.is_empty());

        let after = queries.posts(&PostFilter::default()).await.expect("second read");
        let slugs: Vec<&str> = after.iter().map(|post| post.slug.as_str()).collect();
        assert_eq!(slugs, vec!["fresh"]);
    }
}
