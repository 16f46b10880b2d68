//! Status and role enums mirrored from the lending API.
//!
//! The server is the only authority on these values. The client parses them
//! for display and filtering and sends them back unchanged when an
//! administrator requests a status update.

use serde::{Deserialize, Serialize};

/// Loan status as reported by the server.
///
/// `Late` is assigned server-side once the due date has passed on an
/// unreturned loan; the client never derives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    #[default]
    Borrowed,
    Returned,
    Late,
}

impl LoanStatus {
    /// Wire value used in query strings and request bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Borrowed => "BORROWED",
            Self::Returned => "RETURNED",
            Self::Late => "LATE",
        }
    }

    /// Whether the book is still out (borrowed or late).
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Borrowed | Self::Late)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Borrowed => "Borrowed",
            Self::Returned => "Returned",
            Self::Late => "Overdue",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BORROWED" => Ok(Self::Borrowed),
            "RETURNED" => Ok(Self::Returned),
            "LATE" | "OVERDUE" => Ok(Self::Late),
            _ => Err(format!("invalid loan status: {s}")),
        }
    }
}

/// Loan list filter: every status, or exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoanStatusFilter {
    #[default]
    All,
    Only(LoanStatus),
}

impl LoanStatusFilter {
    /// Query-string value, or `None` for all statuses.
    #[must_use]
    pub const fn as_query(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Only(status) => Some(status.as_str()),
        }
    }
}

impl std::str::FromStr for LoanStatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

/// User role. Administrators can reach the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Whether this role may open administrative views.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "USER"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}
