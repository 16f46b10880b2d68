//! Global client state: the session and two UI conveniences.
//!
//! [`AppState`] is a plain struct mutated only through its named action
//! methods. [`Store`] shares one instance behind a `tokio` `RwLock` and keeps
//! the session file in step with the in-memory token.
//!
//! What lives here:
//! - the session (bearer token + current user)
//! - the catalog filter state used to build [`BookQuery`]
//! - the cart badge (authoritative count plus an optimistic hint)
//!
//! Server data (books, loans, the cart itself) never lives here; it is
//! fetched through [`crate::app::LendingApp`] and cached per query.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lending_core::{AuthorId, CategoryId, StarRating};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::api::{BookQuery, User};
use crate::session_file::{SessionFile, SessionFileError};

// =============================================================================
// Session
// =============================================================================

/// An authenticated session.
///
/// `user` is `None` between restoring a token from disk and the first
/// profile fetch.
#[derive(Clone)]
pub struct Session {
    pub token: SecretString,
    pub user: Option<User>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

impl Session {
    /// Whether the current user is known to be an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.is_admin())
    }
}

// =============================================================================
// Catalog filters
// =============================================================================

/// Catalog filter state shared between views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiFilters {
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub author_id: Option<AuthorId>,
    pub min_rating: Option<StarRating>,
}

impl UiFilters {
    /// Catalog query for one page of the filtered list.
    #[must_use]
    pub fn to_book_query(&self, page: Option<u32>, limit: Option<u32>) -> BookQuery {
        BookQuery {
            q: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_owned),
            category_id: self.category_id,
            author_id: self.author_id,
            min_rating: self.min_rating.map(StarRating::get),
            page,
            limit,
        }
    }

    /// Whether any filter is set.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.search.is_some()
            || self.category_id.is_some()
            || self.author_id.is_some()
            || self.min_rating.is_some()
    }
}

// =============================================================================
// Cart badge
// =============================================================================

/// Cart item count shown in the navigation.
///
/// `confirmed` is the count from the last cart fetch. Each successful add
/// bumps a pending hint that expires after a short TTL; the next
/// authoritative read replaces both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartBadge {
    confirmed: u32,
    pending: u32,
    pending_until: Option<Instant>,
}

impl CartBadge {
    /// Count to display at `now`.
    #[must_use]
    pub fn count_at(&self, now: Instant) -> u32 {
        match self.pending_until {
            Some(until) if now < until => self.confirmed.saturating_add(self.pending),
            _ => self.confirmed,
        }
    }

    /// Authoritative count from the last read.
    #[must_use]
    pub const fn confirmed(&self) -> u32 {
        self.confirmed
    }

    /// Whether an unexpired optimistic bump is showing at `now`.
    #[must_use]
    pub fn has_hint_at(&self, now: Instant) -> bool {
        self.pending > 0 && self.pending_until.is_some_and(|until| now < until)
    }

    fn bump(&mut self, now: Instant, ttl: Duration) {
        // An expired hint is stale; start over from the confirmed count
        if !self.has_hint_at(now) {
            self.pending = 0;
        }
        self.pending = self.pending.saturating_add(1);
        self.pending_until = Some(now + ttl);
    }

    fn rollback(&mut self) {
        self.pending = self.pending.saturating_sub(1);
        if self.pending == 0 {
            self.pending_until = None;
        }
    }

    fn reconcile(&mut self, count: u32) {
        *self = Self {
            confirmed: count,
            pending: 0,
            pending_until: None,
        };
    }
}

// =============================================================================
// AppState
// =============================================================================

/// The whole client state. Mutate only through the action methods.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    session: Option<Session>,
    filters: UiFilters,
    cart_badge: CartBadge,
}

impl AppState {
    // -- session actions ------------------------------------------------------

    /// Start a session after login or registration.
    pub fn sign_in(&mut self, token: SecretString, user: User) {
        self.session = Some(Session {
            token,
            user: Some(user),
        });
    }

    /// Start a session from a persisted token; the user is fetched later.
    pub fn restore(&mut self, token: SecretString) {
        self.session = Some(Session { token, user: None });
    }

    /// Replace the stored user. Ignored without a session.
    pub fn set_user(&mut self, user: User) {
        if let Some(session) = &mut self.session {
            session.user = Some(user);
        }
    }

    /// Drop the session and everything derived from it.
    pub fn sign_out(&mut self) {
        self.session = None;
        self.cart_badge = CartBadge::default();
    }

    // -- filter actions -------------------------------------------------------

    pub fn set_search(&mut self, search: Option<String>) {
        self.filters.search = search.filter(|s| !s.trim().is_empty());
    }

    pub const fn set_category(&mut self, category_id: Option<CategoryId>) {
        self.filters.category_id = category_id;
    }

    pub const fn set_author(&mut self, author_id: Option<AuthorId>) {
        self.filters.author_id = author_id;
    }

    pub const fn set_min_rating(&mut self, min_rating: Option<StarRating>) {
        self.filters.min_rating = min_rating;
    }

    pub fn reset_filters(&mut self) {
        self.filters = UiFilters::default();
    }

    // -- cart badge actions ---------------------------------------------------

    /// Optimistically count one more item.
    pub fn bump_cart(&mut self, now: Instant, ttl: Duration) {
        self.cart_badge.bump(now, ttl);
    }

    /// Undo one optimistic bump after a failed add.
    pub fn rollback_cart_bump(&mut self) {
        self.cart_badge.rollback();
    }

    /// Take the count from an authoritative cart read.
    pub fn reconcile_cart(&mut self, count: u32) {
        self.cart_badge.reconcile(count);
    }

    /// The cart was emptied by checkout.
    pub fn reset_cart(&mut self) {
        self.cart_badge.reconcile(0);
    }

    // -- selectors ------------------------------------------------------------

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn filters(&self) -> &UiFilters {
        &self.filters
    }

    #[must_use]
    pub const fn cart_badge(&self) -> &CartBadge {
        &self.cart_badge
    }

    /// Serializable view of the state at `now`, without the token.
    #[must_use]
    pub fn snapshot_at(&self, now: Instant) -> StateSnapshot {
        let user = self.session.as_ref().and_then(|s| s.user.clone());
        StateSnapshot {
            authenticated: self.session.is_some(),
            is_admin: self.session.as_ref().is_some_and(Session::is_admin),
            user,
            filters: self.filters.clone(),
            cart_count: self.cart_badge.count_at(now),
        }
    }
}

/// Point-in-time copy of [`AppState`] for views and assertions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub authenticated: bool,
    pub is_admin: bool,
    pub user: Option<User>,
    pub filters: UiFilters,
    pub cart_count: u32,
}

// =============================================================================
// Store
// =============================================================================

/// Shared handle to the [`AppState`].
///
/// Cheap to clone; all clones see the same state.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    state: RwLock<AppState>,
    session_file: Option<SessionFile>,
}

impl Store {
    /// A store that keeps the session in memory only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that persists the bearer token to `file`.
    #[must_use]
    pub fn with_session_file(file: SessionFile) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(AppState::default()),
                session_file: Some(file),
            }),
        }
    }

    /// Load a persisted token into memory.
    ///
    /// Returns whether a session was restored. A corrupt file is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be read.
    pub async fn restore(&self) -> Result<bool, SessionFileError> {
        let Some(file) = &self.inner.session_file else {
            return Ok(false);
        };

        let token = match file.load().await {
            Ok(token) => token,
            Err(SessionFileError::Corrupt(e)) => {
                warn!(error = %e, "Discarding corrupt session file");
                file.clear().await?;
                None
            }
            Err(e) => return Err(e),
        };

        let Some(token) = token else {
            return Ok(false);
        };

        self.inner.state.write().await.restore(token);
        debug!("Restored session from file");
        Ok(true)
    }

    /// Start a session and persist its token.
    ///
    /// The in-memory session is set even if persisting fails; the failure
    /// is logged and only costs the session surviving a restart.
    pub async fn sign_in(&self, token: SecretString, user: User) {
        // File and memory change under one lock; see `force_logout`
        let mut state = self.inner.state.write().await;
        if let Some(file) = &self.inner.session_file
            && let Err(e) = file.save(&token).await
        {
            warn!(error = %e, "Failed to persist session token");
        }
        state.sign_in(token, user);
    }

    /// Clear the session in memory and on disk.
    pub async fn sign_out(&self) {
        let mut state = self.inner.state.write().await;
        state.sign_out();
        self.clear_file().await;
    }

    /// Clear the session after the server rejected `token`.
    ///
    /// Only the session that still holds `token` is ended; a session started
    /// while the rejected request was in flight is left alone. Returns
    /// whether a session was ended.
    pub async fn force_logout(&self, token: &SecretString) -> bool {
        let mut state = self.inner.state.write().await;
        let current = state
            .session
            .as_ref()
            .is_some_and(|s| s.token.expose_secret() == token.expose_secret());
        if !current {
            debug!("Ignoring 401 for a token that is no longer in use");
            return false;
        }

        state.sign_out();
        self.clear_file().await;
        debug!("Session cleared after 401");
        true
    }

    async fn clear_file(&self) {
        if let Some(file) = &self.inner.session_file
            && let Err(e) = file.clear().await
        {
            warn!(error = %e, "Failed to clear session file");
        }
    }

    /// Current bearer token.
    pub async fn token(&self) -> Option<SecretString> {
        self.inner
            .state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub async fn current_user(&self) -> Option<User> {
        self.inner
            .state
            .read()
            .await
            .session
            .as_ref()
            .and_then(|s| s.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.state.read().await.session.is_some()
    }

    pub async fn is_admin(&self) -> bool {
        self.inner
            .state
            .read()
            .await
            .session
            .as_ref()
            .is_some_and(Session::is_admin)
    }

    pub async fn set_user(&self, user: User) {
        self.inner.state.write().await.set_user(user);
    }

    pub async fn filters(&self) -> UiFilters {
        self.inner.state.read().await.filters.clone()
    }

    /// Apply one of the filter actions.
    pub async fn update_filters(&self, action: FilterAction) {
        let mut state = self.inner.state.write().await;
        match action {
            FilterAction::Search(q) => state.set_search(q),
            FilterAction::Category(id) => state.set_category(id),
            FilterAction::Author(id) => state.set_author(id),
            FilterAction::MinRating(rating) => state.set_min_rating(rating),
            FilterAction::Reset => state.reset_filters(),
        }
    }

    pub async fn bump_cart(&self, ttl: Duration) {
        self.inner.state.write().await.bump_cart(Instant::now(), ttl);
    }

    pub async fn rollback_cart_bump(&self) {
        self.inner.state.write().await.rollback_cart_bump();
    }

    pub async fn reconcile_cart(&self, count: u32) {
        self.inner.state.write().await.reconcile_cart(count);
    }

    pub async fn reset_cart(&self) {
        self.inner.state.write().await.reset_cart();
    }

    pub async fn cart_count(&self) -> u32 {
        self.inner.state.read().await.cart_badge.count_at(Instant::now())
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        self.inner.state.read().await.snapshot_at(Instant::now())
    }
}

/// Named catalog filter updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    Search(Option<String>),
    Category(Option<CategoryId>),
    Author(Option<AuthorId>),
    MinRating(Option<StarRating>),
    Reset,
}
