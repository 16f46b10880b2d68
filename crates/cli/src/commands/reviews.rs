//! Review commands.

use std::io::Write;

use lending_client::LendingApp;
use lending_client::api::{MyReviewsQuery, ReviewQuery};
use lending_client::validation::ReviewForm;
use lending_core::{BookId, ReviewId};

use super::{CliError, write_reviews};

pub async fn list(
    app: &LendingApp,
    out: &mut impl Write,
    book: BookId,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<(), CliError> {
    let reviews = app.book_reviews(book, &ReviewQuery { page, limit }).await?;
    write_reviews(out, &reviews)?;
    Ok(())
}

pub async fn add(
    app: &LendingApp,
    out: &mut impl Write,
    book_id: BookId,
    star: i64,
    comment: Option<String>,
) -> Result<(), CliError> {
    let form = ReviewForm {
        book_id,
        star,
        comment,
    };
    let review = app.create_review(&form).await?.into_inner();
    writeln!(out, "Review #{} posted: {}", review.id, review.star.stars())?;
    Ok(())
}

pub async fn delete(app: &LendingApp, out: &mut impl Write, id: ReviewId) -> Result<(), CliError> {
    app.delete_review(id).await?;
    writeln!(out, "Review #{id} deleted.")?;
    Ok(())
}

pub async fn mine(
    app: &LendingApp,
    out: &mut impl Write,
    q: Option<String>,
    page: Option<u32>,
) -> Result<(), CliError> {
    let query = MyReviewsQuery {
        q,
        page,
        limit: None,
    };
    let reviews = app.my_reviews(&query).await?;
    write_reviews(out, &reviews)?;
    Ok(())
}
