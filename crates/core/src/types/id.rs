//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create ID wrappers that prevent passing a
//! loan ID where a cart item ID is expected. The lending API uses plain
//! integer identifiers, so every wrapper is transparent over `i32` on the wire.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>`, `Into<i32>` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use lending_core::define_id;
/// define_id!(ShelfId);
/// define_id!(BranchId);
///
/// let shelf = ShelfId::new(1);
/// let branch: BranchId = "7".parse().unwrap();
///
/// assert_eq!(shelf.as_i32(), 1);
/// assert_eq!(branch.to_string(), "7");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Entity IDs returned by the lending API
define_id!(UserId);
define_id!(BookId);
define_id!(AuthorId);
define_id!(CategoryId);
define_id!(LoanId);
define_id!(ReviewId);
define_id!(CartId);
define_id!(CartItemId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_transparent_on_the_wire() {
        let json = serde_json::to_string(&BookId::new(42)).unwrap();
        assert_eq!(json, "42");

        let id: LoanId = serde_json::from_str("7").unwrap();
        assert_eq!(id, LoanId::new(7));
    }

    #[test]
    fn test_parse_from_cli_argument() {
        let id: CartItemId = " 12 ".parse().unwrap();
        assert_eq!(id.as_i32(), 12);
        assert!("twelve".parse::<CartItemId>().is_err());
    }

    #[test]
    fn test_ordering_follows_inner_value() {
        let mut ids = vec![ReviewId::new(3), ReviewId::new(1), ReviewId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![ReviewId::new(1), ReviewId::new(2), ReviewId::new(3)]);
    }
}
