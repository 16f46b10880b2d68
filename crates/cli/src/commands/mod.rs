//! Subcommand implementations.
//!
//! Each command calls [`LendingApp`](lending_client::LendingApp) and writes
//! plain text to the given writer; logs go to stderr through `tracing`.

pub mod account;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod loans;
pub mod reviews;

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use lending_client::api::{Book, Loan, Paginated, PaginationMeta, Review, Upload};
use lending_client::{AppError, ConfigError, Countdown};
use thiserror::Error;

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The lending service or a local check refused the operation.
    #[error("{}", app_message(.0))]
    App(#[from] AppError),

    /// Writing output or reading an upload failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The upload has an extension we cannot map to an image type.
    #[error("Unsupported image file: {0}")]
    UnsupportedImage(String),
}

fn app_message(error: &AppError) -> String {
    error.user_message()
}

/// Read an image file for a multipart upload.
pub async fn read_upload(path: &Path) -> Result<Upload, CliError> {
    let mime_type = image_mime(path)
        .ok_or_else(|| CliError::UnsupportedImage(path.display().to_string()))?;
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());

    Ok(Upload {
        file_name,
        mime_type: mime_type.to_string(),
        bytes,
    })
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

// =============================================================================
// Rendering
// =============================================================================

pub(crate) fn write_book(out: &mut impl Write, book: &Book) -> io::Result<()> {
    writeln!(
        out,
        "#{:<5} {}  by {}  [{}]  {:.1}★ ({} reviews)  {}/{} available",
        book.id,
        book.title,
        book.author.name,
        book.category.name,
        book.average_rating,
        book.total_reviews,
        book.available_stock,
        book.stock,
    )
}

pub(crate) fn write_books(out: &mut impl Write, page: &Paginated<Book>) -> io::Result<()> {
    if page.data.is_empty() {
        return writeln!(out, "No books found.");
    }
    for book in &page.data {
        write_book(out, book)?;
    }
    write_page(out, &page.meta)
}

pub(crate) fn write_page(out: &mut impl Write, meta: &PaginationMeta) -> io::Result<()> {
    writeln!(
        out,
        "-- page {} of {} ({} total)",
        meta.page,
        meta.total_pages.max(1),
        meta.total
    )
}

pub(crate) fn write_loan(out: &mut impl Write, loan: &Loan) -> io::Result<()> {
    let countdown = Countdown::for_loan(loan, Utc::now())
        .map(|c| format!("  ({c})"))
        .unwrap_or_default();
    writeln!(
        out,
        "#{:<5} {}  {}  borrowed {}  due {}{}",
        loan.id,
        loan.book.title,
        loan.status.label(),
        loan.borrow_date.date_naive(),
        loan.due_date.date_naive(),
        countdown,
    )
}

pub(crate) fn write_loans(out: &mut impl Write, page: &Paginated<Loan>) -> io::Result<()> {
    if page.data.is_empty() {
        return writeln!(out, "No loans.");
    }
    for loan in &page.data {
        write_loan(out, loan)?;
    }
    write_page(out, &page.meta)
}

pub(crate) fn write_reviews(out: &mut impl Write, page: &Paginated<Review>) -> io::Result<()> {
    if page.data.is_empty() {
        return writeln!(out, "No reviews yet.");
    }
    for review in &page.data {
        let about = review
            .book
            .as_ref()
            .map(|b| format!(" on {}", b.title))
            .unwrap_or_default();
        writeln!(
            out,
            "#{:<5} {} {}{}  {}",
            review.id,
            review.star.stars(),
            review.user.name,
            about,
            review.created_at.date_naive(),
        )?;
        if let Some(comment) = &review.comment {
            writeln!(out, "       {comment}")?;
        }
    }
    write_page(out, &page.meta)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Path::new("cover.PNG")), Some("image/png"));
        assert_eq!(image_mime(Path::new("me.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime(Path::new("notes.txt")), None);
        assert_eq!(image_mime(Path::new("no-extension")), None);
    }

    #[test]
    fn test_write_page_never_shows_zero_pages() {
        let meta = PaginationMeta {
            total: 0,
            page: 1,
            limit: 10,
            total_pages: 0,
        };
        let mut out = Vec::new();
        write_page(&mut out, &meta).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "-- page 1 of 1 (0 total)\n");
    }

    #[tokio::test]
    async fn test_read_upload_rejects_unknown_extension() {
        let err = read_upload(Path::new("/tmp/resume.pdf")).await.unwrap_err();
        assert!(matches!(err, CliError::UnsupportedImage(_)));
    }

    #[tokio::test]
    async fn test_read_upload() {
        let path = std::env::temp_dir().join(format!("lend-cover-{}.png", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, [0x89, b'P', b'N', b'G']).await.unwrap();

        let upload = read_upload(&path).await.unwrap();
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.bytes.len(), 4);
        assert!(upload.file_name.starts_with("lend-cover-"));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
