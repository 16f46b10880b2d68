//! View-level orchestration.
//!
//! [`LendingApp`] is what a front-end talks to. Reads go through the query
//! cache with a light automatic retry; mutations are guarded against double
//! submission, never retried, and invalidate the queries they affect only
//! after the server confirmed them.
//!
//! # Example
//!
//! ```rust,ignore
//! use lending_client::{ClientConfig, LendingApp};
//!
//! let config = ClientConfig::from_env()?;
//! let app = LendingApp::from_config(&config).await?;
//!
//! let page = app.catalog(Some(1), Some(12)).await?;
//! app.add_to_cart(page.data[0].id).await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use lending_core::{AuthorId, BookId, BorrowDuration, CartItemId, CategoryId, LoanId, ReviewId};
use secrecy::SecretString;
use tracing::{debug, info, instrument, warn};

use crate::api::{
    AdminBookQuery, AdminLoanUpdate, AdminOverview, ApiClient, ApiError, Author, AuthorBooksQuery,
    AuthResponse, Book, BookQuery, Cart, Category, Loan, LoanQuery, MyReviewsQuery, Paginated,
    RecommendQuery, Review, ReviewQuery, User, UserProfile, UserQuery,
};
use crate::cache::{Cacheable, Invalidation, QueryCache, QueryKey};
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::session_file::SessionFile;
use crate::store::{FilterAction, StateSnapshot, Store};
use crate::validation::{
    self, AdminLoanForm, BookForm, CheckoutForm, LoginForm, ProfileForm, RegisterForm,
    ReviewForm, ValidationErrors,
};
use crate::views::{Access, InFlight, InFlightGuard, MutationKey, Route};

/// Longest single backoff between read retries.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Result of a confirmed mutation and the queries it made stale.
#[derive(Debug, Clone)]
pub struct Mutated<T> {
    pub value: T,
    pub invalidation: Invalidation,
}

impl<T> Mutated<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// The lending client as seen by views.
///
/// Cheap to clone; clones share the cache, store and HTTP pool.
#[derive(Clone)]
pub struct LendingApp {
    inner: Arc<LendingAppInner>,
}

struct LendingAppInner {
    api: ApiClient,
    cache: QueryCache,
    store: Store,
    in_flight: InFlight,
    read_retries: u32,
    retry_base: Duration,
    cart_hint_ttl: Duration,
}

impl LendingApp {
    /// Build an app around an existing store.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, store: Store) -> Result<Self, AppError> {
        let api = ApiClient::new(config, store.clone())?;

        Ok(Self {
            inner: Arc::new(LendingAppInner {
                api,
                cache: QueryCache::from_config(config),
                store,
                in_flight: InFlight::new(),
                read_retries: config.read_retries,
                retry_base: config.retry_base,
                cart_hint_ttl: config.cart_hint_ttl,
            }),
        })
    }

    /// Build an app that persists its session to the configured file.
    ///
    /// Does not restore the session; call [`restore_session`](Self::restore_session).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let store = Store::with_session_file(SessionFile::new(&config.session_file));
        Self::new(config, store)
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    #[must_use]
    pub fn in_flight(&self) -> &InFlight {
        &self.inner.in_flight
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        self.inner.store.snapshot().await
    }

    /// Whether the current session may open `route`.
    pub async fn open(&self, route: Route) -> Access {
        route.access(&self.snapshot().await)
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Serve `key` from the cache, or fetch it with retries and cache it.
    async fn cached<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, AppError>
    where
        T: Cacheable,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(hit) = self.inner.cache.get::<T>(&key).await {
            return Ok(hit);
        }

        let generation = self.inner.cache.generation();
        match self.with_retry(&key, fetch).await {
            Ok(value) => {
                self.inner
                    .cache
                    .insert_since(key, value.clone(), generation)
                    .await;
                Ok(value)
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn with_retry<T, F, Fut>(&self, key: &QueryKey, fetch: F) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            match fetch().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.inner.read_retries => {
                    let delay = retry_delay(self.inner.retry_base, attempt, &e);
                    warn!(?key, attempt = attempt + 1, ?delay, error = %e, "Read failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Turn an API error into an app error, dropping cached data when a 401
    /// ended the session.
    async fn fail(&self, error: ApiError) -> AppError {
        if error.ended_session() {
            // The store already cleared the session in the API client
            self.inner.cache.clear().await;
        }
        AppError::Api(error)
    }

    fn begin(&self, key: MutationKey) -> Result<InFlightGuard, AppError> {
        self.inner.in_flight.begin(key.clone()).ok_or_else(|| {
            debug!(?key, "Duplicate submission ignored");
            AppError::Busy
        })
    }

    async fn invalidated<T>(&self, value: T, invalidation: Invalidation) -> Mutated<T> {
        self.inner.cache.invalidate(&invalidation).await;
        Mutated {
            value,
            invalidation,
        }
    }

    /// Run a mutation once; invalidate only after it succeeded.
    async fn mutate<T, Fut>(
        &self,
        key: MutationKey,
        invalidation: Invalidation,
        op: Fut,
    ) -> Result<Mutated<T>, AppError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let _guard = self.begin(key)?;
        match op.await {
            Ok(value) => Ok(self.invalidated(value, invalidation).await),
            Err(e @ ApiError::Parse(_)) => {
                // The server answered 2xx; only its body was unreadable
                self.inner.cache.invalidate(&invalidation).await;
                Err(self.fail(e).await)
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn require_session(&self) -> Result<(), AppError> {
        if self.inner.store.is_authenticated().await {
            Ok(())
        } else {
            Err(AppError::NotSignedIn)
        }
    }

    async fn require_admin(&self) -> Result<(), AppError> {
        self.require_session().await?;
        // A restored session does not know its role until the profile loads
        if self.inner.store.current_user().await.is_none() {
            self.profile().await?;
        }
        if self.inner.store.is_admin().await {
            Ok(())
        } else {
            warn!("Refusing admin operation for non-admin session");
            Err(AppError::AdminOnly)
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns validation errors, [`AppError::LoginFailed`] for rejected
    /// credentials, or any other request failure.
    #[instrument(skip_all)]
    pub async fn login(&self, form: &LoginForm) -> Result<User, AppError> {
        let payload = form.validate()?;
        let _guard = self.begin(MutationKey::Login)?;

        match self.inner.api.login(&payload).await {
            Ok(auth) => Ok(self.start_session(auth).await),
            Err(ApiError::Unauthorized(message)) => Err(AppError::LoginFailed(message)),
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns validation errors or the server's rejection.
    #[instrument(skip_all)]
    pub async fn register(&self, form: &RegisterForm) -> Result<User, AppError> {
        let payload = form.validate()?;
        let _guard = self.begin(MutationKey::Register)?;

        match self.inner.api.register(&payload).await {
            Ok(auth) => Ok(self.start_session(auth).await),
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn start_session(&self, auth: AuthResponse) -> User {
        // Nothing cached for a previous identity may leak into this one
        self.inner.cache.clear().await;
        self.inner
            .store
            .sign_in(SecretString::from(auth.token), auth.user.clone())
            .await;
        info!(user_id = %auth.user.id, role = %auth.user.role, "Signed in");
        auth.user
    }

    /// Sign out locally: session, session file and every cached query.
    pub async fn logout(&self) {
        self.inner.store.sign_out().await;
        self.inner.cache.clear().await;
        info!("Signed out");
    }

    /// Restore a persisted session and load its user.
    ///
    /// Returns `None` when there is no session or the server rejected it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file is unreadable or the profile
    /// fetch fails for a reason other than an expired session.
    pub async fn restore_session(&self) -> Result<Option<User>, AppError> {
        if !self.inner.store.restore().await? {
            return Ok(None);
        }
        match self.profile().await {
            Ok(profile) => Ok(Some(profile.user)),
            Err(e) if e.requires_login() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// The signed-in user with loan counters; refreshes the stored user.
    ///
    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    pub async fn profile(&self) -> Result<UserProfile, AppError> {
        self.require_session().await?;
        let api = &self.inner.api;
        let profile: UserProfile = self.cached(QueryKey::Profile, || api.profile()).await?;
        self.inner.store.set_user(profile.user.clone()).await;
        Ok(profile)
    }

    /// Refetch the profile, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    pub async fn refresh_profile(&self) -> Result<UserProfile, AppError> {
        self.inner
            .cache
            .invalidate(&Invalidation::profile_changed())
            .await;
        self.profile().await
    }

    /// Update name, phone and photo, then reload the profile.
    ///
    /// # Errors
    ///
    /// Returns validation errors, the server's rejection, or a failure of
    /// the follow-up profile fetch.
    #[instrument(skip_all)]
    pub async fn update_profile(
        &self,
        form: &ProfileForm,
    ) -> Result<Mutated<UserProfile>, AppError> {
        self.require_session().await?;
        let input = form.validate()?;
        let Mutated { invalidation, .. } = self
            .mutate(
                MutationKey::UpdateProfile,
                Invalidation::profile_changed(),
                self.inner.api.update_profile(&input),
            )
            .await?;
        let profile = self.refresh_profile().await?;
        Ok(Mutated {
            value: profile,
            invalidation,
        })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Books matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn books(&self, query: &BookQuery) -> Result<Paginated<Book>, AppError> {
        let api = &self.inner.api;
        self.cached(QueryKey::Books(query.clone()), || api.list_books(query))
            .await
    }

    /// One page of the catalog filtered by the store's filter state.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn catalog(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Paginated<Book>, AppError> {
        let query = self.inner.store.filters().await.to_book_query(page, limit);
        self.books(&query).await
    }

    /// Apply a catalog filter action.
    pub async fn filter(&self, action: FilterAction) {
        self.inner.store.update_filters(action).await;
    }

    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn book(&self, id: BookId) -> Result<Book, AppError> {
        let api = &self.inner.api;
        self.cached(QueryKey::Book(id), || api.get_book(id)).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn recommended(&self, query: &RecommendQuery) -> Result<Paginated<Book>, AppError> {
        let api = &self.inner.api;
        self.cached(QueryKey::Recommended(query.clone()), || {
            api.recommended_books(query)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn categories(&self) -> Result<Vec<Category>, AppError> {
        let api = &self.inner.api;
        self.cached(QueryKey::Categories, || api.list_categories())
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn authors(&self, q: Option<&str>) -> Result<Vec<Author>, AppError> {
        let api = &self.inner.api;
        let q = q.map(str::trim).filter(|q| !q.is_empty());
        self.cached(QueryKey::Authors(q.map(str::to_owned)), || {
            api.list_authors(q)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn popular_authors(&self, limit: Option<u32>) -> Result<Vec<Author>, AppError> {
        let api = &self.inner.api;
        self.cached(QueryKey::PopularAuthors(limit), || api.popular_authors(limit))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn author_books(
        &self,
        id: AuthorId,
        query: &AuthorBooksQuery,
    ) -> Result<Paginated<Book>, AppError> {
        let api = &self.inner.api;
        self.cached(QueryKey::AuthorBooks(id, *query), || {
            api.author_books(id, query)
        })
        .await
    }

    // =========================================================================
    // Cart & checkout
    // =========================================================================

    /// The cart; its size becomes the authoritative badge count.
    ///
    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    pub async fn cart(&self) -> Result<Cart, AppError> {
        self.require_session().await?;
        let api = &self.inner.api;
        let cart: Cart = self.cached(QueryKey::Cart, || api.get_cart()).await?;
        self.inner.store.reconcile_cart(cart.item_count()).await;
        Ok(cart)
    }

    /// Stage a book; the badge is bumped before the request goes out.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Busy`] if the same book is already being added, or
    /// the server's rejection (the bump is then undone).
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, book_id: BookId) -> Result<Mutated<()>, AppError> {
        self.require_session().await?;
        let _guard = self.begin(MutationKey::AddToCart(book_id))?;
        self.inner.store.bump_cart(self.inner.cart_hint_ttl).await;

        match self.inner.api.add_to_cart(book_id).await {
            Ok(()) => Ok(self.invalidated((), Invalidation::cart_changed()).await),
            Err(e) => {
                self.inner.store.rollback_cart_bump().await;
                Err(self.fail(e).await)
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, item_id: CartItemId) -> Result<Mutated<()>, AppError> {
        self.require_session().await?;
        self.mutate(
            MutationKey::RemoveFromCart(item_id),
            Invalidation::cart_changed(),
            self.inner.api.remove_from_cart(item_id),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    pub async fn clear_cart(&self) -> Result<Mutated<()>, AppError> {
        self.require_session().await?;
        self.mutate(
            MutationKey::ClearCart,
            Invalidation::cart_changed(),
            self.inner.api.clear_cart(),
        )
        .await
    }

    /// Borrow the selected cart items.
    ///
    /// The form is checked against the current cart first. On success the
    /// badge drops to zero and cart, loans, books and profile are refetched on
    /// next read; on failure nothing local changes.
    ///
    /// # Errors
    ///
    /// Returns validation errors, [`AppError::Busy`] for a double submit, or
    /// the server's rejection.
    #[instrument(skip_all, fields(items = form.item_ids.len(), days = form.duration.days()))]
    pub async fn checkout(&self, form: &CheckoutForm) -> Result<Mutated<Vec<Loan>>, AppError> {
        self.require_session().await?;
        let cart = self.cart().await?;
        let request = form.validate(&cart)?;

        let loans = self
            .mutate(
                MutationKey::Checkout,
                Invalidation::checkout_completed(),
                self.inner.api.checkout_from_cart(&request),
            )
            .await?;

        self.inner.store.reset_cart().await;
        info!(loans = loans.value.len(), "Checkout completed");
        Ok(loans)
    }

    /// Borrow one book directly, bypassing the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if not signed in or the server refuses the loan.
    #[instrument(skip(self))]
    pub async fn borrow(
        &self,
        book_id: BookId,
        duration: BorrowDuration,
    ) -> Result<Mutated<Loan>, AppError> {
        self.require_session().await?;
        self.mutate(
            MutationKey::Borrow(book_id),
            Invalidation::loans_changed(),
            self.inner.api.borrow_book(book_id, duration),
        )
        .await
    }

    // =========================================================================
    // Loans
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    pub async fn my_loans(&self, query: &LoanQuery) -> Result<Paginated<Loan>, AppError> {
        self.require_session().await?;
        let api = &self.inner.api;
        self.cached(QueryKey::MyLoans(query.clone()), || api.my_loans(query))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if not signed in or the server refuses the return.
    #[instrument(skip(self))]
    pub async fn return_loan(&self, id: LoanId) -> Result<Mutated<Loan>, AppError> {
        self.require_session().await?;
        self.mutate(
            MutationKey::ReturnLoan(id),
            Invalidation::loans_changed(),
            self.inner.api.return_loan(id),
        )
        .await
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn book_reviews(
        &self,
        book_id: BookId,
        query: &ReviewQuery,
    ) -> Result<Paginated<Review>, AppError> {
        let api = &self.inner.api;
        self.cached(QueryKey::BookReviews(book_id, *query), || {
            api.book_reviews(book_id, query)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    pub async fn my_reviews(&self, query: &MyReviewsQuery) -> Result<Paginated<Review>, AppError> {
        self.require_session().await?;
        let api = &self.inner.api;
        self.cached(QueryKey::MyReviews(query.clone()), || api.my_reviews(query))
            .await
    }

    /// # Errors
    ///
    /// Returns validation errors or the server's rejection.
    #[instrument(skip_all, fields(book_id = %form.book_id))]
    pub async fn create_review(&self, form: &ReviewForm) -> Result<Mutated<Review>, AppError> {
        self.require_session().await?;
        let review = form.validate()?;
        self.mutate(
            MutationKey::CreateReview(review.book_id),
            Invalidation::review_created(review.book_id),
            self.inner.api.create_review(&review),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn delete_review(&self, id: ReviewId) -> Result<Mutated<()>, AppError> {
        self.require_session().await?;
        self.mutate(
            MutationKey::DeleteReview(id),
            Invalidation::review_deleted(),
            self.inner.api.delete_review(id),
        )
        .await
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`] for non-admin sessions, or a request failure.
    pub async fn admin_overview(&self) -> Result<AdminOverview, AppError> {
        self.require_admin().await?;
        let api = &self.inner.api;
        self.cached(QueryKey::AdminOverview, || api.admin_overview())
            .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`] for non-admin sessions, or a request failure.
    pub async fn admin_books(&self, query: &AdminBookQuery) -> Result<Paginated<Book>, AppError> {
        self.require_admin().await?;
        let api = &self.inner.api;
        self.cached(QueryKey::AdminBooks(query.clone()), || api.admin_books(query))
            .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`] for non-admin sessions, or a request failure.
    pub async fn admin_users(&self, query: &UserQuery) -> Result<Paginated<User>, AppError> {
        self.require_admin().await?;
        let api = &self.inner.api;
        self.cached(QueryKey::AdminUsers(query.clone()), || api.admin_users(query))
            .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`] for non-admin sessions, or a request failure.
    pub async fn admin_loans(&self, query: &LoanQuery) -> Result<Paginated<Loan>, AppError> {
        self.require_admin().await?;
        let api = &self.inner.api;
        self.cached(QueryKey::AdminLoans(query.clone()), || api.admin_loans(query))
            .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`] for non-admin sessions, or a request failure.
    pub async fn overdue_loans(&self) -> Result<Vec<Loan>, AppError> {
        self.require_admin().await?;
        let api = &self.inner.api;
        self.cached(QueryKey::OverdueLoans, || api.overdue_loans())
            .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`], validation errors, or the server's rejection.
    #[instrument(skip_all)]
    pub async fn create_book(&self, form: &BookForm) -> Result<Mutated<Book>, AppError> {
        self.require_admin().await?;
        let input = form.validate()?;
        let _guard = self.begin(MutationKey::Admin("create-book", None))?;
        match self.inner.api.create_book(&input).await {
            Ok(book) => {
                let invalidation = Invalidation::book_changed(Some(book.id));
                Ok(self.invalidated(book, invalidation).await)
            }
            Err(e @ ApiError::Parse(_)) => {
                self.inner
                    .cache
                    .invalidate(&Invalidation::book_changed(None))
                    .await;
                Err(self.fail(e).await)
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`], validation errors, or the server's rejection.
    #[instrument(skip(self, form))]
    pub async fn update_book(&self, id: BookId, form: &BookForm) -> Result<Mutated<Book>, AppError> {
        self.require_admin().await?;
        let input = form.validate()?;
        self.mutate(
            MutationKey::Admin("update-book", Some(id.as_i32())),
            Invalidation::book_changed(Some(id)),
            self.inner.api.update_book(id, &input),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`] or the server's rejection.
    #[instrument(skip(self))]
    pub async fn delete_book(&self, id: BookId) -> Result<Mutated<()>, AppError> {
        self.require_admin().await?;
        self.mutate(
            MutationKey::Admin("delete-book", Some(id.as_i32())),
            Invalidation::book_changed(Some(id)),
            self.inner.api.delete_book(id),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`], validation errors, or the server's rejection.
    pub async fn create_category(&self, name: &str) -> Result<Mutated<Category>, AppError> {
        self.require_admin().await?;
        let input = validation::category(name)?;
        self.mutate(
            MutationKey::Admin("create-category", None),
            Invalidation::categories_changed(),
            self.inner.api.create_category(&input),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`], validation errors, or the server's rejection.
    pub async fn update_category(
        &self,
        id: CategoryId,
        name: &str,
    ) -> Result<Mutated<Category>, AppError> {
        self.require_admin().await?;
        let input = validation::category(name)?;
        self.mutate(
            MutationKey::Admin("update-category", Some(id.as_i32())),
            Invalidation::categories_changed(),
            self.inner.api.update_category(id, &input),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`] or the server's rejection.
    pub async fn delete_category(&self, id: CategoryId) -> Result<Mutated<()>, AppError> {
        self.require_admin().await?;
        self.mutate(
            MutationKey::Admin("delete-category", Some(id.as_i32())),
            Invalidation::categories_changed(),
            self.inner.api.delete_category(id),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`], validation errors, or the server's rejection.
    pub async fn create_author(
        &self,
        name: &str,
        bio: Option<&str>,
    ) -> Result<Mutated<Author>, AppError> {
        self.require_admin().await?;
        let input = validation::author(name, bio)?;
        self.mutate(
            MutationKey::Admin("create-author", None),
            Invalidation::authors_changed(),
            self.inner.api.create_author(&input),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`], validation errors, or the server's rejection.
    pub async fn update_author(
        &self,
        id: AuthorId,
        name: &str,
        bio: Option<&str>,
    ) -> Result<Mutated<Author>, AppError> {
        self.require_admin().await?;
        let input = validation::author(name, bio)?;
        self.mutate(
            MutationKey::Admin("update-author", Some(id.as_i32())),
            Invalidation::authors_changed(),
            self.inner.api.update_author(id, &input),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`] or the server's rejection.
    pub async fn delete_author(&self, id: AuthorId) -> Result<Mutated<()>, AppError> {
        self.require_admin().await?;
        self.mutate(
            MutationKey::Admin("delete-author", Some(id.as_i32())),
            Invalidation::authors_changed(),
            self.inner.api.delete_author(id),
        )
        .await
    }

    /// Lend a book to a member; `today` bounds the due date.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`], validation errors, or the server's rejection.
    #[instrument(skip(self))]
    pub async fn create_admin_loan(
        &self,
        form: &AdminLoanForm,
        today: NaiveDate,
    ) -> Result<Mutated<Loan>, AppError> {
        self.require_admin().await?;
        let input = form.validate(today)?;
        self.mutate(
            MutationKey::Admin("create-loan", None),
            Invalidation::admin_loans_changed(),
            self.inner.api.create_admin_loan(&input),
        )
        .await
    }

    /// Change a loan's due date or status.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AdminOnly`], a validation error for an empty
    /// update, or the server's rejection.
    #[instrument(skip(self))]
    pub async fn update_admin_loan(
        &self,
        id: LoanId,
        update: &AdminLoanUpdate,
    ) -> Result<Mutated<Loan>, AppError> {
        self.require_admin().await?;
        if update.due_at.is_none() && update.status.is_none() {
            let mut errors = ValidationErrors::default();
            errors.add("update", "nothing to change");
            return Err(errors.into());
        }
        self.mutate(
            MutationKey::Admin("update-loan", Some(id.as_i32())),
            Invalidation::admin_loans_changed(),
            self.inner.api.update_admin_loan(id, update),
        )
        .await
    }
}

/// Backoff before retry number `attempt + 1`: `base * 2^attempt`, and never
/// shorter than a server-requested `Retry-After`.
fn retry_delay(base: Duration, attempt: u32, error: &ApiError) -> Duration {
    let backoff = base.saturating_mul(1 << attempt.min(MAX_BACKOFF_SHIFT));
    match error {
        ApiError::RateLimited(secs) => backoff.max(Duration::from_secs(*secs)),
        _ => backoff,
    }
}
