//! Borrow duration offered at checkout.

use chrono::{DateTime, Days, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// Errors that can occur when choosing a [`BorrowDuration`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationError {
    /// The number of days is not one of the offered choices.
    #[error("borrow duration must be 3, 5 or 10 days (got {0})")]
    Unsupported(i64),
}

/// How long a checkout borrows its books for.
///
/// The lending service only offers a fixed set of choices. Serialized as the
/// number of days (`"days": 5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub enum BorrowDuration {
    #[default]
    ThreeDays,
    FiveDays,
    TenDays,
}

impl BorrowDuration {
    /// All offered durations, shortest first.
    pub const ALL: [Self; 3] = [Self::ThreeDays, Self::FiveDays, Self::TenDays];

    /// Length in days.
    #[must_use]
    pub const fn days(self) -> u32 {
        match self {
            Self::ThreeDays => 3,
            Self::FiveDays => 5,
            Self::TenDays => 10,
        }
    }

    /// Pick the duration matching a number of days.
    ///
    /// # Errors
    ///
    /// Returns [`DurationError::Unsupported`] for anything but 3, 5 or 10.
    pub const fn from_days(days: i64) -> Result<Self, DurationError> {
        match days {
            3 => Ok(Self::ThreeDays),
            5 => Ok(Self::FiveDays),
            10 => Ok(Self::TenDays),
            other => Err(DurationError::Unsupported(other)),
        }
    }

    /// Expected return date for a borrow starting on `start`.
    ///
    /// Display only; the server computes the authoritative due date.
    #[must_use]
    pub fn return_date_from(self, start: NaiveDate) -> NaiveDate {
        start
            .checked_add_days(Days::new(u64::from(self.days())))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Expected return date for a borrow starting at `now`, in `now`'s zone.
    #[must_use]
    pub fn return_date_at<Tz: TimeZone>(self, now: &DateTime<Tz>) -> NaiveDate {
        self.return_date_from(now.date_naive())
    }
}

impl TryFrom<i64> for BorrowDuration {
    type Error = DurationError;

    fn try_from(days: i64) -> Result<Self, Self::Error> {
        Self::from_days(days)
    }
}

impl From<BorrowDuration> for u32 {
    fn from(duration: BorrowDuration) -> Self {
        duration.days()
    }
}

impl std::fmt::Display for BorrowDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} days", self.days())
    }
}

impl std::str::FromStr for BorrowDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let days = s
            .trim()
            .trim_end_matches("days")
            .trim_end_matches('d')
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid duration {s}: {e}"))?;
        Self::from_days(days).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_offered_durations() {
        let days: Vec<u32> = BorrowDuration::ALL.iter().map(|d| d.days()).collect();
        assert_eq!(days, vec![3, 5, 10]);
    }

    #[test]
    fn test_from_days_rejects_other_values() {
        assert_eq!(BorrowDuration::from_days(5), Ok(BorrowDuration::FiveDays));
        assert_eq!(
            BorrowDuration::from_days(7),
            Err(DurationError::Unsupported(7))
        );
    }

    #[test]
    fn test_wire_format_is_day_count() {
        assert_eq!(serde_json::to_string(&BorrowDuration::TenDays).unwrap(), "10");
        let parsed: BorrowDuration = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, BorrowDuration::ThreeDays);
        assert!(serde_json::from_str::<BorrowDuration>("4").is_err());
    }

    #[test]
    fn test_return_date_crosses_month_end() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 29).unwrap();
        assert_eq!(
            BorrowDuration::FiveDays.return_date_from(start),
            NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()
        );
    }

    #[test]
    fn test_return_date_at_uses_calendar_day() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 23, 59, 0).unwrap();
        assert_eq!(
            BorrowDuration::ThreeDays.return_date_at(&now),
            NaiveDate::from_ymd_opt(2026, 3, 13).unwrap()
        );
    }

    #[test]
    fn test_from_str_accepts_suffixes() {
        assert_eq!("10".parse::<BorrowDuration>().unwrap(), BorrowDuration::TenDays);
        assert_eq!("5d".parse::<BorrowDuration>().unwrap(), BorrowDuration::FiveDays);
        assert_eq!("3 days".parse::<BorrowDuration>().unwrap(), BorrowDuration::ThreeDays);
        assert!("2".parse::<BorrowDuration>().is_err());
    }
}
