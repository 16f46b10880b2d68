//! View-model helpers shared by every front-end.
//!
//! Nothing here talks to the network. These types turn fetched data and the
//! [`StateSnapshot`] into what a view shows: load states, loan countdowns,
//! which routes are reachable, and which submissions are still pending.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use lending_core::{BookId, CartItemId, LoanId, ReviewId};
use serde::Serialize;

use crate::api::Loan;
use crate::error::AppError;
use crate::store::StateSnapshot;

// =============================================================================
// Query state
// =============================================================================

/// Load state of one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState<T> {
    Loading,
    Ready(T),
    /// `retryable` decides whether a retry button is offered.
    Failed { message: String, retryable: bool },
}

impl<T> QueryState<T> {
    /// Fold a finished fetch into a state.
    pub fn from_result(result: Result<T, AppError>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => Self::Failed {
                retryable: e.is_retryable(),
                message: e.user_message(),
            },
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        match self {
            Self::Loading => QueryState::Loading,
            Self::Ready(value) => QueryState::Ready(f(value)),
            Self::Failed { message, retryable } => QueryState::Failed { message, retryable },
        }
    }
}

// =============================================================================
// Loans
// =============================================================================

/// Days until a loan is due, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "days", rename_all = "camelCase")]
pub enum Countdown {
    /// Due in this many days (at least one).
    Remaining(i64),
    DueToday,
    /// Past due by this many days (at least one).
    Overdue(i64),
}

impl Countdown {
    /// `ceil((due - now) / 1 day)`, classified.
    #[must_use]
    pub fn between(now: DateTime<Utc>, due: DateTime<Utc>) -> Self {
        let days = ceil_days(due - now);
        match days {
            d if d > 0 => Self::Remaining(d),
            0 => Self::DueToday,
            d => Self::Overdue(-d),
        }
    }

    /// Countdown for an unreturned loan; `None` once it is returned.
    #[must_use]
    pub fn for_loan(loan: &Loan, now: DateTime<Utc>) -> Option<Self> {
        loan.status
            .is_active()
            .then(|| Self::between(now, loan.due_date))
    }
}

impl std::fmt::Display for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remaining(1) => write!(f, "1 day left"),
            Self::Remaining(n) => write!(f, "{n} days left"),
            Self::DueToday => write!(f, "due today"),
            Self::Overdue(1) => write!(f, "1 day overdue"),
            Self::Overdue(n) => write!(f, "{n} days overdue"),
        }
    }
}

fn ceil_days(delta: TimeDelta) -> i64 {
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    let ms = delta.num_milliseconds();
    // Integer ceiling that also rounds negative values toward zero
    let days = ms / DAY_MS;
    if ms % DAY_MS > 0 { days + 1 } else { days }
}

/// Whether the return action is offered for `loan`.
#[must_use]
pub const fn can_return(loan: &Loan) -> bool {
    loan.status.is_active() && loan.return_date.is_none()
}

// =============================================================================
// Routes
// =============================================================================

/// Every view of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "route", content = "id", rename_all = "camelCase")]
pub enum Route {
    Login,
    Register,
    Books,
    BookDetail(BookId),
    Cart,
    Checkout,
    MyLoans,
    MyReviews,
    Profile,
    AdminDashboard,
    AdminBooks,
    AdminLoans,
    AdminUsers,
}

/// Outcome of opening a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Access {
    Allowed,
    Redirect(Route),
}

/// Where a view should go after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Navigation {
    Stay,
    /// The session is gone; show the login view.
    Login,
    To(Route),
}

impl Route {
    /// Open without a session.
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(
            self,
            Self::Login | Self::Register | Self::Books | Self::BookDetail(_)
        )
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(
            self,
            Self::AdminDashboard | Self::AdminBooks | Self::AdminLoans | Self::AdminUsers
        )
    }

    /// Whether the current session may open this route.
    ///
    /// Admin routes send anonymous users to login and members to the
    /// catalog; the server authorizes independently.
    #[must_use]
    pub const fn access(self, state: &StateSnapshot) -> Access {
        if self.is_public() {
            return Access::Allowed;
        }
        if !state.authenticated {
            return Access::Redirect(Self::Login);
        }
        if self.is_admin() && !state.is_admin {
            return Access::Redirect(Self::Books);
        }
        Access::Allowed
    }

    /// Landing route after login.
    #[must_use]
    pub const fn home(state: &StateSnapshot) -> Self {
        if state.is_admin {
            Self::AdminDashboard
        } else {
            Self::Books
        }
    }
}

// =============================================================================
// In-flight submissions
// =============================================================================

/// Identity of a mutation for duplicate-submit suppression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationKey {
    Login,
    Register,
    AddToCart(BookId),
    RemoveFromCart(CartItemId),
    ClearCart,
    Checkout,
    Borrow(BookId),
    ReturnLoan(LoanId),
    CreateReview(BookId),
    DeleteReview(ReviewId),
    UpdateProfile,
    /// Admin mutations keyed by a short name and optional id
    Admin(&'static str, Option<i32>),
}

/// Set of mutations currently awaiting a response.
///
/// Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    pending: Arc<Mutex<HashSet<MutationKey>>>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as pending. Returns `None` if it already is.
    ///
    /// The mark is released when the guard drops, whatever the outcome.
    #[must_use]
    pub fn begin(&self, key: MutationKey) -> Option<InFlightGuard> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            pending: Arc::clone(&self.pending),
            key,
        })
    }

    #[must_use]
    pub fn is_pending(&self, key: &MutationKey) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Releases a pending mark on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    pending: Arc<Mutex<HashSet<MutationKey>>>,
    key: MutationKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
