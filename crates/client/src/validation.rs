//! Form validation that runs before anything is sent.
//!
//! Each form turns into the request body it feeds, or a [`ValidationErrors`]
//! listing every failing field at once so a view can mark them all.

use chrono::NaiveDate;
use lending_core::{
    AuthorId, BookId, BorrowDuration, CartItemId, CategoryId, Email, StarRating, UserId,
};
use serde::Serialize;
use thiserror::Error;

use crate::api::{
    AdminLoanCreate, AuthorInput, BookInput, Cart, CartCheckoutRequest, CategoryInput,
    LoginPayload, NewReview, ProfileInput, RegisterPayload, Upload,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// One failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every failing field of a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error, Serialize)]
#[error("{}", summary(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Message for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// `Ok(value)` when nothing failed.
    fn finish<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, Self> {
        if !self.is_empty() {
            return Err(self);
        }
        // Every field that feeds `value` was checked above
        value().ok_or(self)
    }
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn required<'a>(errors: &mut ValidationErrors, field: &'static str, value: &'a str) -> Option<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "is required");
        None
    } else {
        Some(trimmed)
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn email(errors: &mut ValidationErrors, value: &str) -> Option<Email> {
    Email::parse(value)
        .map_err(|e| errors.add("email", e.to_string()))
        .ok()
}

fn phone(errors: &mut ValidationErrors, value: Option<&str>) -> Option<String> {
    let phone = optional(value)?;
    let valid = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
        && phone.chars().filter(char::is_ascii_digit).count() >= 6;
    if valid {
        Some(phone)
    } else {
        errors.add("phone", "must be a phone number");
        None
    }
}

fn image(errors: &mut ValidationErrors, field: &'static str, upload: Option<&Upload>) {
    let Some(upload) = upload else {
        return;
    };
    if !upload.mime_type.starts_with("image/") {
        errors.add(field, "must be an image");
    } else if upload.bytes.is_empty() {
        errors.add(field, "is empty");
    } else if upload.bytes.len() > MAX_UPLOAD_BYTES {
        errors.add(field, format!("must be at most {} MB", MAX_UPLOAD_BYTES / 1024 / 1024));
    }
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<LoginPayload, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let email = email(&mut errors, &self.email);
        if self.password.is_empty() {
            errors.add("password", "is required");
        }
        errors.finish(|| {
            Some(LoginPayload {
                email: email?.into_inner(),
                password: self.password.clone(),
            })
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

impl RegisterForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<RegisterPayload, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let name = required(&mut errors, "name", &self.name);
        let email = email(&mut errors, &self.email);
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
            );
        }
        let phone = phone(&mut errors, self.phone.as_deref());

        errors.finish(|| {
            Some(RegisterPayload {
                name: name?.to_owned(),
                email: email?.into_inner(),
                password: self.password.clone(),
                phone,
            })
        })
    }
}

// =============================================================================
// Profile
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub name: String,
    pub phone: Option<String>,
    pub profile_photo: Option<Upload>,
}

impl ProfileForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<ProfileInput, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let name = required(&mut errors, "name", &self.name);
        let phone = phone(&mut errors, self.phone.as_deref());
        image(&mut errors, "profilePhoto", self.profile_photo.as_ref());

        errors.finish(|| {
            Some(ProfileInput {
                name: name?.to_owned(),
                phone,
                profile_photo: self.profile_photo.clone(),
            })
        })
    }
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Clone)]
pub struct ReviewForm {
    pub book_id: BookId,
    /// Raw star input; anything outside 1..=5 is rejected
    pub star: i64,
    pub comment: Option<String>,
}

impl ReviewForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<NewReview, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let star = StarRating::new(self.star)
            .map_err(|e| errors.add("star", e.to_string()))
            .ok();
        let comment = optional(self.comment.as_deref());
        if comment
            .as_ref()
            .is_some_and(|c| c.chars().count() > MAX_COMMENT_LENGTH)
        {
            errors.add(
                "comment",
                format!("must be at most {MAX_COMMENT_LENGTH} characters"),
            );
        }

        errors.finish(|| {
            Some(NewReview {
                book_id: self.book_id,
                star: star?,
                comment,
            })
        })
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Everything the checkout view collects before borrowing.
#[derive(Debug, Clone, Default)]
pub struct CheckoutForm {
    /// Cart items to borrow
    pub item_ids: Vec<CartItemId>,
    pub duration: BorrowDuration,
    /// Why the member borrows; required but not transmitted
    pub purpose: String,
    /// "I will return the books before the due date"
    pub agree_return: bool,
    /// "I accept the library policy"
    pub agree_policy: bool,
    /// Defaults to today server-side
    pub borrow_date: Option<NaiveDate>,
}

impl CheckoutForm {
    /// Check the form against the current cart.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self, cart: &Cart) -> Result<CartCheckoutRequest, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.purpose.trim().is_empty() {
            errors.add("purpose", "please enter a borrow purpose");
        }
        if !(self.agree_return && self.agree_policy) {
            errors.add("agreements", "please agree to all terms");
        }

        let mut item_ids = Vec::with_capacity(self.item_ids.len());
        for id in &self.item_ids {
            if !item_ids.contains(id) {
                item_ids.push(*id);
            }
        }
        if item_ids.is_empty() {
            errors.add("itemIds", "no items selected");
        } else if let Some(missing) = item_ids.iter().find(|id| !cart.contains(**id)) {
            errors.add("itemIds", format!("item {missing} is no longer in the cart"));
        }

        errors.finish(|| {
            Some(CartCheckoutRequest {
                item_ids,
                days: self.duration,
                borrow_date: self.borrow_date,
            })
        })
    }

    /// Expected return date for display, counted from the borrow date or `today`.
    #[must_use]
    pub fn expected_return_date(&self, today: NaiveDate) -> NaiveDate {
        self.duration
            .return_date_from(self.borrow_date.unwrap_or(today))
    }
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct BookForm {
    pub title: String,
    pub isbn: String,
    pub description: String,
    /// Raw stock input; must not be negative
    pub stock: i64,
    pub author_id: Option<AuthorId>,
    pub category_id: Option<CategoryId>,
    pub cover_image: Option<Upload>,
}

impl BookForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<BookInput, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let title = required(&mut errors, "title", &self.title);
        let isbn = required(&mut errors, "isbn", &self.isbn);
        let stock = u32::try_from(self.stock)
            .map_err(|_| errors.add("stock", "must be zero or more"))
            .ok();
        if self.author_id.is_none() {
            errors.add("authorId", "please select an author");
        }
        if self.category_id.is_none() {
            errors.add("categoryId", "please select a category");
        }
        image(&mut errors, "coverImage", self.cover_image.as_ref());

        errors.finish(|| {
            Some(BookInput {
                title: title?.to_owned(),
                isbn: isbn?.to_owned(),
                description: self.description.trim().to_owned(),
                stock: stock?,
                author_id: self.author_id?,
                category_id: self.category_id?,
                cover_image: self.cover_image.clone(),
            })
        })
    }
}

/// Direct loan created by an administrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminLoanForm {
    pub user_id: Option<UserId>,
    pub book_id: Option<BookId>,
    pub due_at: Option<NaiveDate>,
}

impl AdminLoanForm {
    /// The due date, when given, must be after `today`.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self, today: NaiveDate) -> Result<AdminLoanCreate, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.user_id.is_none() {
            errors.add("userId", "is required");
        }
        if self.book_id.is_none() {
            errors.add("bookId", "is required");
        }
        if self.due_at.is_some_and(|due| due <= today) {
            errors.add("dueAt", "must be after today");
        }

        errors.finish(|| {
            Some(AdminLoanCreate {
                user_id: self.user_id?,
                book_id: self.book_id?,
                due_at: self.due_at,
            })
        })
    }
}

/// Validate a category name.
///
/// # Errors
///
/// Returns an error if the name is blank.
pub fn category(name: &str) -> Result<CategoryInput, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let name = required(&mut errors, "name", name);
    errors.finish(|| {
        Some(CategoryInput {
            name: name?.to_owned(),
        })
    })
}

/// Validate an author name and optional bio.
///
/// # Errors
///
/// Returns an error if the name is blank.
pub fn author(name: &str, bio: Option<&str>) -> Result<AuthorInput, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let name = required(&mut errors, "name", name);
    errors.finish(|| {
        Some(AuthorInput {
            name: name?.to_owned(),
            bio: optional(bio),
        })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::api::{Author, Book, CartItem, Category};

    fn cart_with(ids: &[i32]) -> Cart {
        let items = ids
            .iter()
            .map(|&id| CartItem {
                id: CartItemId::new(id),
                book_id: BookId::new(id * 10),
                book: Book {
                    id: BookId::new(id * 10),
                    title: format!("Book {id}"),
                    isbn: "978".to_string(),
                    cover_image: None,
                    description: None,
                    stock: 1,
                    available_stock: 1,
                    average_rating: 0.0,
                    total_reviews: 0,
                    author: Author {
                        id: AuthorId::new(1),
                        name: "A".to_string(),
                        bio: None,
                        photo_url: None,
                    },
                    category: Category {
                        id: CategoryId::new(1),
                        name: "C".to_string(),
                    },
                    created_at: Utc::now(),
                },
            })
            .collect();
        Cart {
            id: None,
            user_id: None,
            items,
        }
    }

    fn checkout(ids: &[i32]) -> CheckoutForm {
        CheckoutForm {
            item_ids: ids.iter().copied().map(CartItemId::new).collect(),
            duration: BorrowDuration::FiveDays,
            purpose: "Thesis research".to_string(),
            agree_return: true,
            agree_policy: true,
            borrow_date: None,
        }
    }

    #[test]
    fn test_login_collects_all_errors() {
        let errors = LoginForm {
            email: "nope".to_string(),
            password: String::new(),
        }
        .validate()
        .unwrap_err();
        assert!(errors.get("email").is_some());
        assert_eq!(errors.get("password"), Some("is required"));
    }

    #[test]
    fn test_login_trims_email() {
        let payload = LoginForm {
            email: "  ada@example.org ".to_string(),
            password: "pw".to_string(),
        }
        .validate()
        .unwrap();
        assert_eq!(payload.email, "ada@example.org");
    }

    #[test]
    fn test_register_password_length() {
        let form = RegisterForm {
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
            password: "short".to_string(),
            phone: Some(String::new()),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("password"), Some("must be at least 8 characters"));
        assert!(errors.get("phone").is_none());
    }

    #[test]
    fn test_register_phone() {
        let mut form = RegisterForm {
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
            password: "long enough".to_string(),
            phone: Some("+62 812-3456-7890".to_string()),
        };
        assert_eq!(
            form.validate().unwrap().phone.as_deref(),
            Some("+62 812-3456-7890")
        );

        form.phone = Some("call me".to_string());
        assert!(form.validate().unwrap_err().get("phone").is_some());
    }

    #[test]
    fn test_review_star_range() {
        let form = ReviewForm {
            book_id: BookId::new(1),
            star: 6,
            comment: Some("  ".to_string()),
        };
        assert!(form.validate().unwrap_err().get("star").is_some());

        let review = ReviewForm { star: 5, ..form }.validate().unwrap();
        assert_eq!(review.star.get(), 5);
        assert!(review.comment.is_none());
    }

    #[test]
    fn test_review_comment_length() {
        let form = ReviewForm {
            book_id: BookId::new(1),
            star: 3,
            comment: Some("x".repeat(MAX_COMMENT_LENGTH + 1)),
        };
        assert!(form.validate().unwrap_err().get("comment").is_some());
    }

    #[test]
    fn test_checkout_valid() {
        let request = checkout(&[1, 3]).validate(&cart_with(&[1, 2, 3])).unwrap();
        assert_eq!(request.item_ids, vec![CartItemId::new(1), CartItemId::new(3)]);
        assert_eq!(request.days, BorrowDuration::FiveDays);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({ "itemIds": [1, 3], "days": 5 }));
    }

    #[test]
    fn test_checkout_requires_purpose_and_agreements() {
        let mut form = checkout(&[1]);
        form.purpose = "   ".to_string();
        form.agree_policy = false;
        let errors = form.validate(&cart_with(&[1])).unwrap_err();
        assert!(errors.get("purpose").is_some());
        assert_eq!(errors.get("agreements"), Some("please agree to all terms"));
    }

    #[test]
    fn test_checkout_requires_selection_in_cart() {
        let errors = checkout(&[]).validate(&cart_with(&[1])).unwrap_err();
        assert_eq!(errors.get("itemIds"), Some("no items selected"));

        let errors = checkout(&[1, 9]).validate(&cart_with(&[1])).unwrap_err();
        assert_eq!(errors.get("itemIds"), Some("item 9 is no longer in the cart"));
    }

    #[test]
    fn test_checkout_dedupes_selection() {
        let request = checkout(&[2, 2]).validate(&cart_with(&[2])).unwrap();
        assert_eq!(request.item_ids, vec![CartItemId::new(2)]);
    }

    #[test]
    fn test_expected_return_date() {
        let today = NaiveDate::from_ymd_opt(2026, 4, 28).unwrap();
        let mut form = checkout(&[1]);
        form.duration = BorrowDuration::TenDays;
        assert_eq!(
            form.expected_return_date(today),
            NaiveDate::from_ymd_opt(2026, 5, 8).unwrap()
        );
    }

    #[test]
    fn test_book_form() {
        let form = BookForm {
            title: " Dune ".to_string(),
            isbn: "9780441013593".to_string(),
            stock: -1,
            ..BookForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("stock").is_some());
        assert!(errors.get("authorId").is_some());
        assert!(errors.get("categoryId").is_some());
        assert!(errors.get("title").is_none());

        let input = BookForm {
            stock: 3,
            author_id: Some(AuthorId::new(1)),
            category_id: Some(CategoryId::new(2)),
            ..form
        }
        .validate()
        .unwrap();
        assert_eq!(input.title, "Dune");
        assert_eq!(input.stock, 3);
    }

    #[test]
    fn test_cover_image_must_be_image() {
        let form = BookForm {
            title: "Dune".to_string(),
            isbn: "1".to_string(),
            stock: 1,
            author_id: Some(AuthorId::new(1)),
            category_id: Some(CategoryId::new(1)),
            cover_image: Some(Upload {
                file_name: "cover.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                bytes: vec![1],
            }),
            ..BookForm::default()
        };
        assert_eq!(
            form.validate().unwrap_err().get("coverImage"),
            Some("must be an image")
        );
    }

    #[test]
    fn test_admin_loan_due_date_after_today() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let form = AdminLoanForm {
            user_id: Some(UserId::new(1)),
            book_id: Some(BookId::new(2)),
            due_at: Some(today),
        };
        assert!(form.validate(today).unwrap_err().get("dueAt").is_some());

        let ok = AdminLoanForm {
            due_at: today.succ_opt(),
            ..form
        }
        .validate(today)
        .unwrap();
        assert_eq!(ok.user_id, UserId::new(1));
    }

    #[test]
    fn test_validation_errors_display() {
        let errors = category("  ").unwrap_err();
        assert_eq!(errors.to_string(), "name: is required");
        assert_eq!(author("Le Guin", Some(" ")).unwrap().bio, None);
    }
}
