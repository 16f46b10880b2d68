//! Query cache with tag-based invalidation.
//!
//! Every read goes through a [`QueryKey`] holding its full parameter tuple.
//! Each key maps to a set of [`ResourceTag`]s. A successful mutation returns an
//! [`Invalidation`] naming the tags it touched; [`QueryCache::invalidate`]
//! drops every entry with an overlapping tag and broadcasts the event so open
//! views know to refetch.
//!
//! Entries live in a `moka` future cache with a TTL, so data the client never
//! invalidates (changes made by other users) still ages out.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lending_core::{AuthorId, BookId};
use moka::future::Cache;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::api::{
    AdminBookQuery, AdminOverview, Author, AuthorBooksQuery, Book, BookQuery, Cart, Category,
    Loan, LoanQuery, MyReviewsQuery, Paginated, RecommendQuery, Review, ReviewQuery, User,
    UserProfile, UserQuery,
};
use crate::config::ClientConfig;

/// Capacity of the invalidation broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Keys and tags
// =============================================================================

/// A cacheable read, with every parameter that affects its result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Books(BookQuery),
    Book(BookId),
    Recommended(RecommendQuery),
    Categories,
    Authors(Option<String>),
    PopularAuthors(Option<u32>),
    AuthorBooks(AuthorId, AuthorBooksQuery),
    Cart,
    MyLoans(LoanQuery),
    BookReviews(BookId, ReviewQuery),
    MyReviews(MyReviewsQuery),
    Profile,
    AdminOverview,
    AdminBooks(AdminBookQuery),
    AdminUsers(UserQuery),
    AdminLoans(LoanQuery),
    OverdueLoans,
}

/// A server resource whose change makes some queries stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "tag", content = "id", rename_all = "camelCase")]
pub enum ResourceTag {
    /// Any book list or detail (stock, ratings)
    Books,
    /// One book's detail
    Book(BookId),
    Categories,
    Authors,
    Cart,
    /// Loans seen from any side
    Loans,
    /// One book's review list
    Reviews(BookId),
    /// Every review list
    AllReviews,
    MyReviews,
    Profile,
    AdminOverview,
    AdminBooks,
    AdminUsers,
    AdminLoans,
    OverdueLoans,
}

impl QueryKey {
    /// Tags whose invalidation makes this query stale.
    #[must_use]
    pub fn tags(&self) -> Vec<ResourceTag> {
        use ResourceTag as T;

        match self {
            Self::Books(_) | Self::Recommended(_) => vec![T::Books],
            Self::Book(id) => vec![T::Book(*id), T::Books],
            Self::Categories => vec![T::Categories],
            Self::Authors(_) | Self::PopularAuthors(_) => vec![T::Authors],
            Self::AuthorBooks(..) => vec![T::Authors, T::Books],
            Self::Cart => vec![T::Cart],
            Self::MyLoans(_) => vec![T::Loans],
            Self::BookReviews(id, _) => vec![T::Reviews(*id), T::AllReviews],
            Self::MyReviews(_) => vec![T::MyReviews],
            Self::Profile => vec![T::Profile],
            Self::AdminOverview => vec![T::AdminOverview],
            Self::AdminBooks(_) => vec![T::AdminBooks, T::Books],
            Self::AdminUsers(_) => vec![T::AdminUsers],
            Self::AdminLoans(_) => vec![T::AdminLoans, T::Loans],
            Self::OverdueLoans => vec![T::OverdueLoans, T::Loans],
        }
    }
}

/// The set of tags a mutation touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Invalidation {
    tags: BTreeSet<ResourceTag>,
}

impl Invalidation {
    pub fn new(tags: impl IntoIterator<Item = ResourceTag>) -> Self {
        Self {
            tags: tags.into_iter().collect(),
        }
    }

    /// Add one more tag.
    #[must_use]
    pub fn with(mut self, tag: ResourceTag) -> Self {
        self.tags.insert(tag);
        self
    }

    #[must_use]
    pub fn contains(&self, tag: ResourceTag) -> bool {
        self.tags.contains(&tag)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = ResourceTag> + '_ {
        self.tags.iter().copied()
    }

    /// Whether `key` is stale after this invalidation.
    #[must_use]
    pub fn matches(&self, key: &QueryKey) -> bool {
        key.tags().iter().any(|tag| self.tags.contains(tag))
    }

    // -- per-mutation sets ----------------------------------------------------

    /// After a cart item was added, removed or the cart cleared.
    #[must_use]
    pub fn cart_changed() -> Self {
        Self::new([ResourceTag::Cart])
    }

    /// After a successful cart checkout.
    #[must_use]
    pub fn checkout_completed() -> Self {
        Self::loans_changed().with(ResourceTag::Cart)
    }

    /// After the member borrowed or returned a book.
    #[must_use]
    pub fn loans_changed() -> Self {
        Self::new([ResourceTag::Loans, ResourceTag::Books, ResourceTag::Profile])
    }

    /// After a review was posted for `book_id`.
    #[must_use]
    pub fn review_created(book_id: BookId) -> Self {
        Self::new([
            ResourceTag::Reviews(book_id),
            ResourceTag::Book(book_id),
            ResourceTag::Books,
            ResourceTag::MyReviews,
        ])
    }

    /// After a review was deleted; its book is not known locally.
    #[must_use]
    pub fn review_deleted() -> Self {
        Self::new([
            ResourceTag::AllReviews,
            ResourceTag::MyReviews,
            ResourceTag::Books,
        ])
    }

    /// After an admin created, updated or deleted a book.
    #[must_use]
    pub fn book_changed(book_id: Option<BookId>) -> Self {
        let inv = Self::new([
            ResourceTag::AdminBooks,
            ResourceTag::Books,
            ResourceTag::AdminOverview,
        ]);
        match book_id {
            Some(id) => inv.with(ResourceTag::Book(id)),
            None => inv,
        }
    }

    #[must_use]
    pub fn categories_changed() -> Self {
        Self::new([ResourceTag::Categories, ResourceTag::Books])
    }

    #[must_use]
    pub fn authors_changed() -> Self {
        Self::new([ResourceTag::Authors, ResourceTag::Books])
    }

    /// After an admin created or updated a loan.
    #[must_use]
    pub fn admin_loans_changed() -> Self {
        Self::new([
            ResourceTag::AdminLoans,
            ResourceTag::Loans,
            ResourceTag::OverdueLoans,
            ResourceTag::AdminOverview,
            ResourceTag::Books,
        ])
    }

    #[must_use]
    pub fn profile_changed() -> Self {
        Self::new([ResourceTag::Profile])
    }
}

// =============================================================================
// Values
// =============================================================================

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Books(Arc<Paginated<Book>>),
    Book(Arc<Book>),
    Categories(Arc<Vec<Category>>),
    Authors(Arc<Vec<Author>>),
    Cart(Arc<Cart>),
    Loans(Arc<Paginated<Loan>>),
    LoanList(Arc<Vec<Loan>>),
    Reviews(Arc<Paginated<Review>>),
    Profile(Arc<UserProfile>),
    Overview(AdminOverview),
    Users(Arc<Paginated<User>>),
}

/// A type that can be stored in the [`QueryCache`].
pub trait Cacheable: Clone + Sized {
    fn into_cached(self) -> CachedValue;
    fn from_cached(value: CachedValue) -> Option<Self>;
}

macro_rules! cacheable {
    ($ty:ty => $variant:ident) => {
        impl Cacheable for $ty {
            fn into_cached(self) -> CachedValue {
                CachedValue::$variant(Arc::new(self))
            }

            fn from_cached(value: CachedValue) -> Option<Self> {
                match value {
                    CachedValue::$variant(v) => Some(Arc::unwrap_or_clone(v)),
                    _ => None,
                }
            }
        }
    };
}

cacheable!(Paginated<Book> => Books);
cacheable!(Book => Book);
cacheable!(Vec<Category> => Categories);
cacheable!(Vec<Author> => Authors);
cacheable!(Cart => Cart);
cacheable!(Paginated<Loan> => Loans);
cacheable!(Vec<Loan> => LoanList);
cacheable!(Paginated<Review> => Reviews);
cacheable!(UserProfile => Profile);
cacheable!(Paginated<User> => Users);

impl Cacheable for AdminOverview {
    fn into_cached(self) -> CachedValue {
        CachedValue::Overview(self)
    }

    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Overview(v) => Some(v),
            _ => None,
        }
    }
}

// =============================================================================
// Cache
// =============================================================================

/// In-memory query cache shared by all views.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<QueryCacheInner>,
}

struct QueryCacheInner {
    cache: Cache<QueryKey, CachedValue>,
    events: broadcast::Sender<Invalidation>,
    /// Bumped on every invalidation; fetches started before a bump must not
    /// write their (possibly stale) result back.
    generation: AtomicU64,
}

impl QueryCache {
    #[must_use]
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(QueryCacheInner {
                cache,
                events,
                generation: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.cache_ttl, config.cache_capacity)
    }

    /// Cached value for `key`, if present and of the expected type.
    pub async fn get<T: Cacheable>(&self, key: &QueryKey) -> Option<T> {
        let value = self.inner.cache.get(key).await?;
        let hit = T::from_cached(value);
        if hit.is_some() {
            debug!(?key, "Cache hit");
        }
        hit
    }

    /// Current invalidation generation; pass to [`insert_since`](Self::insert_since).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Store `value` unconditionally.
    pub async fn insert<T: Cacheable>(&self, key: QueryKey, value: T) {
        self.inner.cache.insert(key, value.into_cached()).await;
    }

    /// Store `value` unless an invalidation happened since `generation`.
    ///
    /// Returns whether the value was stored.
    pub async fn insert_since<T: Cacheable>(&self, key: QueryKey, value: T, generation: u64) -> bool {
        if self.generation() != generation {
            debug!(?key, "Skipping cache write for a fetch that raced an invalidation");
            return false;
        }
        self.insert(key, value).await;
        true
    }

    /// Drop every entry matching `invalidation` and notify subscribers.
    ///
    /// Returns the number of entries dropped.
    pub async fn invalidate(&self, invalidation: &Invalidation) -> usize {
        if invalidation.is_empty() {
            return 0;
        }

        self.inner.generation.fetch_add(1, Ordering::AcqRel);

        let stale: Vec<Arc<QueryKey>> = self
            .inner
            .cache
            .iter()
            .filter(|(key, _)| invalidation.matches(key))
            .map(|(key, _)| key)
            .collect();

        for key in &stale {
            self.inner.cache.invalidate(key.as_ref()).await;
        }

        debug!(
            tags = ?invalidation.tags().collect::<Vec<_>>(),
            dropped = stale.len(),
            "Invalidated cached queries"
        );

        // No subscribers is fine
        let _ = self.inner.events.send(invalidation.clone());
        stale.len()
    }

    /// Drop everything (logout).
    pub async fn clear(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    /// Receive every future invalidation.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.inner.events.subscribe()
    }

    /// Whether `key` currently has a cached entry.
    #[must_use]
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.cache.contains_key(key)
    }
}
