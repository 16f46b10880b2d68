//! Loan commands.

use std::io::Write;

use lending_client::LendingApp;
use lending_client::api::LoanQuery;
use lending_client::views::can_return;
use lending_core::{BookId, BorrowDuration, LoanId, LoanStatusFilter};

use super::{CliError, write_loan, write_loans};

pub async fn list(
    app: &LendingApp,
    out: &mut impl Write,
    status: LoanStatusFilter,
    q: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<(), CliError> {
    let query = LoanQuery {
        status,
        q,
        page,
        limit,
    };
    let loans = app.my_loans(&query).await?;
    write_loans(out, &loans)?;

    let returnable = loans.data.iter().filter(|loan| can_return(loan)).count();
    if returnable > 0 {
        writeln!(out, "{returnable} loan(s) can be returned with `lend loans return <id>`.")?;
    }
    Ok(())
}

pub async fn borrow(
    app: &LendingApp,
    out: &mut impl Write,
    book: BookId,
    days: BorrowDuration,
) -> Result<(), CliError> {
    let loan = app.borrow(book, days).await?.into_inner();
    write_loan(out, &loan)?;
    Ok(())
}

pub async fn return_loan(
    app: &LendingApp,
    out: &mut impl Write,
    id: LoanId,
) -> Result<(), CliError> {
    let loan = app.return_loan(id).await?.into_inner();
    writeln!(out, "Returned \"{}\".", loan.book.title)?;
    Ok(())
}
