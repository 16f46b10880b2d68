//! Administration commands.
//!
//! Every command is refused locally for non-admin sessions; the server
//! enforces the same rule independently.

use std::io::Write;

use chrono::Local;
use lending_client::api::{AdminBookQuery, AdminLoanUpdate, LoanQuery, UserQuery};
use lending_client::validation::{AdminLoanForm, BookForm};
use lending_client::LendingApp;
use lending_core::{AuthorId, BookId, CategoryId, LoanId, LoanStatus, LoanStatusFilter, UserId};

use super::{CliError, write_books, write_loan, write_loans, write_page};

pub async fn overview(app: &LendingApp, out: &mut impl Write) -> Result<(), CliError> {
    let o = app.admin_overview().await?;
    writeln!(out, "Books:    {}", o.total_books)?;
    writeln!(out, "Members:  {}", o.total_users)?;
    writeln!(
        out,
        "Loans:    {} total, {} active, {} overdue, {} returned",
        o.total_loans, o.active_loans, o.overdue_loans, o.returned_loans
    )?;
    Ok(())
}

pub async fn books(
    app: &LendingApp,
    out: &mut impl Write,
    query: &AdminBookQuery,
) -> Result<(), CliError> {
    let books = app.admin_books(query).await?;
    write_books(out, &books)?;
    Ok(())
}

pub async fn users(
    app: &LendingApp,
    out: &mut impl Write,
    q: Option<String>,
    page: Option<u32>,
) -> Result<(), CliError> {
    let users = app
        .admin_users(&UserQuery {
            q,
            page,
            limit: None,
        })
        .await?;
    for user in &users.data {
        writeln!(
            out,
            "#{:<5} {} <{}>  {}  {}",
            user.id,
            user.name,
            user.email,
            user.role,
            user.phone.as_deref().unwrap_or("-")
        )?;
    }
    write_page(out, &users.meta)?;
    Ok(())
}

pub async fn loans(
    app: &LendingApp,
    out: &mut impl Write,
    status: LoanStatusFilter,
    q: Option<String>,
    page: Option<u32>,
) -> Result<(), CliError> {
    let query = LoanQuery {
        status,
        q,
        page,
        limit: None,
    };
    let loans = app.admin_loans(&query).await?;
    write_loans(out, &loans)?;
    Ok(())
}

pub async fn overdue(app: &LendingApp, out: &mut impl Write) -> Result<(), CliError> {
    let loans = app.overdue_loans().await?;
    if loans.is_empty() {
        writeln!(out, "No overdue loans.")?;
    }
    for loan in &loans {
        let borrower = loan.user.as_ref().map_or("unknown member", |u| u.name.as_str());
        write!(out, "{borrower}: ")?;
        write_loan(out, loan)?;
    }
    Ok(())
}

pub async fn create_book(
    app: &LendingApp,
    out: &mut impl Write,
    form: BookForm,
) -> Result<(), CliError> {
    let book = app.create_book(&form).await?.into_inner();
    writeln!(out, "Created book #{} \"{}\".", book.id, book.title)?;
    Ok(())
}

pub async fn update_book(
    app: &LendingApp,
    out: &mut impl Write,
    id: BookId,
    form: BookForm,
) -> Result<(), CliError> {
    let book = app.update_book(id, &form).await?.into_inner();
    writeln!(out, "Updated book #{} \"{}\".", book.id, book.title)?;
    Ok(())
}

pub async fn delete_book(app: &LendingApp, out: &mut impl Write, id: BookId) -> Result<(), CliError> {
    app.delete_book(id).await?;
    writeln!(out, "Deleted book #{id}.")?;
    Ok(())
}

pub async fn create_category(
    app: &LendingApp,
    out: &mut impl Write,
    name: &str,
) -> Result<(), CliError> {
    let category = app.create_category(name).await?.into_inner();
    writeln!(out, "Created category #{} {}.", category.id, category.name)?;
    Ok(())
}

pub async fn update_category(
    app: &LendingApp,
    out: &mut impl Write,
    id: CategoryId,
    name: &str,
) -> Result<(), CliError> {
    let category = app.update_category(id, name).await?.into_inner();
    writeln!(out, "Renamed category #{} to {}.", category.id, category.name)?;
    Ok(())
}

pub async fn delete_category(
    app: &LendingApp,
    out: &mut impl Write,
    id: CategoryId,
) -> Result<(), CliError> {
    app.delete_category(id).await?;
    writeln!(out, "Deleted category #{id}.")?;
    Ok(())
}

pub async fn create_author(
    app: &LendingApp,
    out: &mut impl Write,
    name: &str,
    bio: Option<&str>,
) -> Result<(), CliError> {
    let author = app.create_author(name, bio).await?.into_inner();
    writeln!(out, "Created author #{} {}.", author.id, author.name)?;
    Ok(())
}

pub async fn update_author(
    app: &LendingApp,
    out: &mut impl Write,
    id: AuthorId,
    name: &str,
    bio: Option<&str>,
) -> Result<(), CliError> {
    let author = app.update_author(id, name, bio).await?.into_inner();
    writeln!(out, "Updated author #{} {}.", author.id, author.name)?;
    Ok(())
}

pub async fn delete_author(
    app: &LendingApp,
    out: &mut impl Write,
    id: AuthorId,
) -> Result<(), CliError> {
    app.delete_author(id).await?;
    writeln!(out, "Deleted author #{id}.")?;
    Ok(())
}

pub async fn create_loan(
    app: &LendingApp,
    out: &mut impl Write,
    user: UserId,
    book: BookId,
    due: Option<chrono::NaiveDate>,
) -> Result<(), CliError> {
    let form = AdminLoanForm {
        user_id: Some(user),
        book_id: Some(book),
        due_at: due,
    };
    let loan = app
        .create_admin_loan(&form, Local::now().date_naive())
        .await?
        .into_inner();
    write_loan(out, &loan)?;
    Ok(())
}

pub async fn update_loan(
    app: &LendingApp,
    out: &mut impl Write,
    id: LoanId,
    due: Option<chrono::NaiveDate>,
    status: Option<LoanStatus>,
) -> Result<(), CliError> {
    let update = AdminLoanUpdate {
        due_at: due,
        status,
    };
    let loan = app.update_admin_loan(id, &update).await?.into_inner();
    write_loan(out, &loan)?;
    Ok(())
}
