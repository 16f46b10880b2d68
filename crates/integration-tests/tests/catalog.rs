//! Catalog queries: filters, pagination, caching and read retries.

#![allow(clippy::unwrap_used)]

use lending_client::api::{ApiError, AuthorBooksQuery, BookQuery, RecommendQuery};
use lending_client::{AppError, FilterAction, QueryKey, QueryState};
use lending_core::{AuthorId, BookId, CategoryId, StarRating, UserRole};
use lending_integration_tests::{TestContext, book_json, page};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_catalog_sends_store_filters() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/books"))
        .and(query_param("q", "dune"))
        .and(query_param("categoryId", "2"))
        .and(query_param("minRating", "4"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![book_json(9, "Dune")], 2, 1, 3)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.app
        .filter(FilterAction::Search(Some("  dune ".to_string())))
        .await;
    ctx.app
        .filter(FilterAction::Category(Some(CategoryId::new(2))))
        .await;
    ctx.app
        .filter(FilterAction::MinRating(Some(StarRating::new(4).unwrap())))
        .await;

    let books = ctx.app.catalog(Some(2), Some(1)).await.unwrap();
    assert_eq!(books.data.len(), 1);
    assert_eq!(books.data[0].title, "Dune");
    assert_eq!(books.meta.total_pages, 3);
    assert!(books.meta.has_next());
}

#[tokio::test]
async fn test_books_are_served_from_cache() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/books"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![book_json(1, "Dune")], 1, 10, 1)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let query = BookQuery::default();
    let first = ctx.app.books(&query).await.unwrap();
    let second = ctx.app.books(&query).await.unwrap();
    assert_eq!(first, second);
    assert!(ctx.app.cache().contains(&QueryKey::Books(query)));
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/books/3"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/books/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(book_json(3, "Solaris")))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let book = ctx.app.book(BookId::new(3)).await.unwrap();
    assert_eq!(book.title, "Solaris");
}

#[tokio::test]
async fn test_retries_give_up() {
    let ctx = TestContext::new().await;

    // One attempt plus two retries
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&ctx.server)
        .await;

    let state = QueryState::from_result(ctx.app.categories().await);
    assert!(matches!(state, QueryState::Failed { retryable: true, .. }));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/books/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Book not found" })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let err = ctx.app.book(BookId::new(404)).await.unwrap_err();
    assert!(matches!(err, AppError::Api(ApiError::NotFound(_))));
    assert_eq!(err.user_message(), "Book not found");
    assert!(!ctx.app.cache().contains(&QueryKey::Book(BookId::new(404))));
}

#[tokio::test]
async fn test_public_reads_need_no_session() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/authors/popular"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 7, "name": "Frank Herbert" },
            { "id": 8, "name": "Ursula K. Le Guin" }
        ])))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let authors = ctx.app.popular_authors(Some(3)).await.unwrap();
    assert_eq!(authors.len(), 2);
    assert!(!ctx.app.store().is_authenticated().await);
}

#[tokio::test]
async fn test_member_reads_require_session() {
    let ctx = TestContext::new().await;
    let err = ctx.app.profile().await.unwrap_err();
    assert!(matches!(err, AppError::NotSignedIn));

    let member = TestContext::signed_in(UserRole::User).await;
    Mock::given(method("GET"))
        .and(path("/loans/my"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], 1, 10, 0)))
        .expect(1)
        .mount(&member.server)
        .await;
    let loans = member.app.my_loans(&Default::default()).await.unwrap();
    assert!(loans.data.is_empty());
}

#[tokio::test]
async fn test_recommended_books_send_strategy() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/books/recommend"))
        .and(query_param("by", "rating"))
        .and(query_param("categoryId", "2"))
        .and(query_param("limit", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![book_json(9, "Dune"), book_json(10, "Hyperion")],
            1,
            4,
            2,
        )))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let query = RecommendQuery {
        by: Some("rating".to_string()),
        category_id: Some(CategoryId::new(2)),
        limit: Some(4),
        ..RecommendQuery::default()
    };
    let books = ctx.app.recommended(&query).await.unwrap();
    assert_eq!(books.data.len(), 2);
    assert_eq!(books.data[1].title, "Hyperion");

    // Served from cache the second time
    ctx.app.recommended(&query).await.unwrap();
    assert!(ctx.app.cache().contains(&QueryKey::Recommended(query)));
}

#[tokio::test]
async fn test_author_books_are_paginated() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/authors/7/books"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![book_json(11, "Children of Dune")], 2, 1, 3)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let query = AuthorBooksQuery {
        page: Some(2),
        limit: Some(1),
    };
    let books = ctx.app.author_books(AuthorId::new(7), &query).await.unwrap();
    assert_eq!(books.data[0].title, "Children of Dune");
    assert_eq!(books.meta.page, 2);
    assert!(books.meta.has_next());
}
