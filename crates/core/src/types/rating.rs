//! Star rating for reviews.

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`StarRating`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingError {
    /// The value is outside 1..=5.
    #[error("rating must be between {min} and {max} stars (got {got})")]
    OutOfRange {
        /// Lowest accepted value.
        min: u8,
        /// Highest accepted value.
        max: u8,
        /// Value that was supplied.
        got: i64,
    },
}

/// A review rating of one to five stars.
///
/// Serialized as a bare integer (`"star": 4`).
///
/// ```
/// use lending_core::StarRating;
///
/// assert_eq!(StarRating::new(4).unwrap().get(), 4);
/// assert!(StarRating::new(0).is_err());
/// assert!(StarRating::new(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct StarRating(u8);

impl StarRating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Build a rating from any integer.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] unless `1 <= value <= 5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                got: value,
            })
    }

    /// Number of stars.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Filled and empty stars, e.g. `★★★☆☆`.
    #[must_use]
    pub fn stars(self) -> String {
        let filled = usize::from(self.0);
        let empty = usize::from(Self::MAX) - filled;
        format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
    }
}

impl TryFrom<i64> for StarRating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StarRating> for u8 {
    fn from(rating: StarRating) -> Self {
        rating.0
    }
}

impl std::fmt::Display for StarRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

impl std::str::FromStr for StarRating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid rating {s}: {e}"))?;
        Self::new(value).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_one_through_five() {
        for value in 1..=5 {
            assert_eq!(i64::from(StarRating::new(value).unwrap().get()), value);
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(
            StarRating::new(0),
            Err(RatingError::OutOfRange { min: 1, max: 5, got: 0 })
        );
        assert!(StarRating::new(6).is_err());
        assert!(StarRating::new(-1).is_err());
        assert!(StarRating::new(i64::from(u8::MAX) + 1).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let rating: StarRating = serde_json::from_str("3").unwrap();
        assert_eq!(rating.get(), 3);
        assert!(serde_json::from_str::<StarRating>("9").is_err());
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&StarRating::new(5).unwrap()).unwrap();
        assert_eq!(json, "5");
    }

    #[test]
    fn test_stars() {
        assert_eq!(StarRating::new(2).unwrap().stars(), "★★☆☆☆");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("4".parse::<StarRating>().unwrap().get(), 4);
        assert!("four".parse::<StarRating>().is_err());
        assert!("7".parse::<StarRating>().is_err());
    }
}
