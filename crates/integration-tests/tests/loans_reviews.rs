//! Loan history, returns, direct borrowing and reviews.

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use lending_client::api::{ApiError, LoanQuery, ReviewQuery};
use lending_client::validation::ReviewForm;
use lending_client::views::can_return;
use lending_client::{AppError, Countdown, QueryKey};
use lending_core::{BookId, BorrowDuration, LoanId, LoanStatus, LoanStatusFilter, ReviewId, UserRole};
use lending_integration_tests::{TestContext, loan_json, page, profile_json, review_json};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_loan_filter_and_countdown() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("GET"))
        .and(path("/loans/my"))
        .and(query_param("status", "BORROWED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![loan_json(90, 12, "BORROWED")],
            1,
            10,
            1,
        )))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let query = LoanQuery {
        status: LoanStatusFilter::Only(LoanStatus::Borrowed),
        ..LoanQuery::default()
    };
    let loans = ctx.app.my_loans(&query).await.unwrap();
    let loan = &loans.data[0];

    assert!(can_return(loan));
    // Due 2026-05-06 10:00; 36 hours earlier rounds up to two days
    let now = Utc.with_ymd_and_hms(2026, 5, 4, 22, 0, 0).unwrap();
    assert_eq!(Countdown::for_loan(loan, now), Some(Countdown::Remaining(2)));
}

#[tokio::test]
async fn test_return_invalidates_loans_and_profile() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("GET"))
        .and(path("/loans/my"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![loan_json(90, 12, "BORROWED")],
            1,
            10,
            1,
        )))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(1, UserRole::User)))
        .mount(&ctx.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/loans/90/return"))
        .respond_with(ResponseTemplate::new(200).set_body_json({
            let mut loan = loan_json(90, 12, "RETURNED");
            loan["returnDate"] = json!("2026-05-03T12:00:00Z");
            loan
        }))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.app.my_loans(&LoanQuery::default()).await.unwrap();
    ctx.app.profile().await.unwrap();

    let returned = ctx.app.return_loan(LoanId::new(90)).await.unwrap().into_inner();
    assert_eq!(returned.status, LoanStatus::Returned);
    assert!(!can_return(&returned));
    assert_eq!(Countdown::for_loan(&returned, Utc::now()), None);

    assert!(!ctx.app.cache().contains(&QueryKey::MyLoans(LoanQuery::default())));
    assert!(!ctx.app.cache().contains(&QueryKey::Profile));
}

#[tokio::test]
async fn test_refused_return_keeps_cache() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("GET"))
        .and(path("/loans/my"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], 1, 10, 0)))
        .mount(&ctx.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/loans/90/return"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Loan already returned" })),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.app.my_loans(&LoanQuery::default()).await.unwrap();
    let err = ctx.app.return_loan(LoanId::new(90)).await.unwrap_err();

    assert_eq!(err.user_message(), "Loan already returned");
    assert!(!err.is_retryable());
    assert!(ctx.app.cache().contains(&QueryKey::MyLoans(LoanQuery::default())));
}

#[tokio::test]
async fn test_unreadable_success_body_still_invalidates() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("GET"))
        .and(path("/loans/my"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![loan_json(90, 12, "BORROWED")],
            1,
            10,
            1,
        )))
        .mount(&ctx.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/loans/90/return"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Loan returned"))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.app.my_loans(&LoanQuery::default()).await.unwrap();
    let err = ctx.app.return_loan(LoanId::new(90)).await.unwrap_err();

    assert!(matches!(err, AppError::Api(ApiError::Parse(_))));
    assert!(ctx.app.store().is_authenticated().await);
    assert!(!ctx.app.cache().contains(&QueryKey::MyLoans(LoanQuery::default())));
}

#[tokio::test]
async fn test_borrow_sends_duration() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("POST"))
        .and(path("/loans"))
        .and(body_json(json!({ "bookId": 12, "days": 10 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(loan_json(91, 12, "BORROWED")))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let loan = ctx
        .app
        .borrow(BookId::new(12), BorrowDuration::TenDays)
        .await
        .unwrap()
        .into_inner();
    assert_eq!(loan.id, LoanId::new(91));
}

#[tokio::test]
async fn test_review_invalidates_that_book_only() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    for book in [12, 31] {
        Mock::given(method("GET"))
            .and(path(format!("/reviews/book/{book}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(
                vec![review_json(book * 10, book, 5)],
                1,
                10,
                1,
            )))
            .mount(&ctx.server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/reviews"))
        .and(body_json(json!({ "bookId": 12, "star": 4, "comment": "Dense but rewarding" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(review_json(500, 12, 4)))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let query = ReviewQuery::default();
    ctx.app.book_reviews(BookId::new(12), &query).await.unwrap();
    ctx.app.book_reviews(BookId::new(31), &query).await.unwrap();

    let form = ReviewForm {
        book_id: BookId::new(12),
        star: 4,
        comment: Some("  Dense but rewarding ".to_string()),
    };
    let review = ctx.app.create_review(&form).await.unwrap().into_inner();
    assert_eq!(review.id, ReviewId::new(500));

    assert!(!ctx.app.cache().contains(&QueryKey::BookReviews(BookId::new(12), query)));
    assert!(ctx.app.cache().contains(&QueryKey::BookReviews(BookId::new(31), query)));
}

#[tokio::test]
async fn test_out_of_range_rating_is_rejected_locally() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("POST"))
        .and(path("/reviews"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let form = ReviewForm {
        book_id: BookId::new(12),
        star: 6,
        comment: None,
    };
    let AppError::Validation(errors) = ctx.app.create_review(&form).await.unwrap_err() else {
        panic!("expected validation errors");
    };
    assert!(errors.get("star").is_some());
}

#[tokio::test]
async fn test_delete_review_invalidates_every_review_list() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("GET"))
        .and(path("/reviews/book/31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![review_json(310, 31, 3)],
            1,
            10,
            1,
        )))
        .mount(&ctx.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/reviews/310"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let query = ReviewQuery::default();
    ctx.app.book_reviews(BookId::new(31), &query).await.unwrap();
    ctx.app.delete_review(ReviewId::new(310)).await.unwrap();

    assert!(!ctx.app.cache().contains(&QueryKey::BookReviews(BookId::new(31), query)));
}
