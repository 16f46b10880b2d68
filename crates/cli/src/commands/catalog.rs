//! Catalog browsing: books, categories and authors.

use std::io::Write;

use lending_client::api::{AuthorBooksQuery, RecommendQuery, ReviewQuery};
use lending_client::{FilterAction, LendingApp};
use lending_core::{AuthorId, BookId, CategoryId, StarRating};

use super::{CliError, write_book, write_books, write_reviews};

/// Catalog filters from the command line.
#[derive(Debug, Default)]
pub struct Filters {
    pub search: Option<String>,
    pub category: Option<CategoryId>,
    pub author: Option<AuthorId>,
    pub min_rating: Option<StarRating>,
}

pub async fn list(
    app: &LendingApp,
    out: &mut impl Write,
    filters: Filters,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<(), CliError> {
    app.filter(FilterAction::Search(filters.search)).await;
    app.filter(FilterAction::Category(filters.category)).await;
    app.filter(FilterAction::Author(filters.author)).await;
    app.filter(FilterAction::MinRating(filters.min_rating)).await;

    let books = app.catalog(page, limit).await?;
    write_books(out, &books)?;
    Ok(())
}

pub async fn show(app: &LendingApp, out: &mut impl Write, id: BookId) -> Result<(), CliError> {
    let book = app.book(id).await?;
    write_book(out, &book)?;
    writeln!(out, "ISBN {}", book.isbn)?;
    if let Some(description) = &book.description {
        writeln!(out)?;
        writeln!(out, "{description}")?;
    }

    let query = ReviewQuery {
        page: Some(1),
        limit: Some(5),
    };
    let reviews = app.book_reviews(id, &query).await?;
    writeln!(out)?;
    write_reviews(out, &reviews)?;
    Ok(())
}

pub async fn recommend(
    app: &LendingApp,
    out: &mut impl Write,
    by: Option<String>,
    category: Option<CategoryId>,
    limit: Option<u32>,
) -> Result<(), CliError> {
    let query = RecommendQuery {
        by,
        category_id: category,
        page: None,
        limit,
    };
    let books = app.recommended(&query).await?;
    write_books(out, &books)?;
    Ok(())
}

pub async fn categories(app: &LendingApp, out: &mut impl Write) -> Result<(), CliError> {
    for category in app.categories().await? {
        writeln!(out, "#{:<5} {}", category.id, category.name)?;
    }
    Ok(())
}

pub async fn authors(
    app: &LendingApp,
    out: &mut impl Write,
    search: Option<&str>,
) -> Result<(), CliError> {
    let authors = app.authors(search).await?;
    if authors.is_empty() {
        writeln!(out, "No authors found.")?;
    }
    for author in authors {
        writeln!(out, "#{:<5} {}", author.id, author.name)?;
    }
    Ok(())
}

pub async fn popular_authors(
    app: &LendingApp,
    out: &mut impl Write,
    limit: Option<u32>,
) -> Result<(), CliError> {
    for (rank, author) in app.popular_authors(limit).await?.iter().enumerate() {
        writeln!(out, "{:>2}. {} (#{})", rank + 1, author.name, author.id)?;
    }
    Ok(())
}

pub async fn author_books(
    app: &LendingApp,
    out: &mut impl Write,
    id: AuthorId,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<(), CliError> {
    let books = app
        .author_books(id, &AuthorBooksQuery { page, limit })
        .await?;
    write_books(out, &books)?;
    Ok(())
}
