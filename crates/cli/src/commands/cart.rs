//! Cart and checkout commands.

use std::io::Write;

use chrono::Local;
use lending_client::{CheckoutForm, LendingApp};
use lending_core::{BookId, CartItemId};

use super::{CliError, write_loan};

pub async fn show(app: &LendingApp, out: &mut impl Write) -> Result<(), CliError> {
    let cart = app.cart().await?;
    if cart.items.is_empty() {
        writeln!(out, "Your cart is empty.")?;
        return Ok(());
    }
    for item in &cart.items {
        writeln!(
            out,
            "item #{:<5} {} (book #{}, {} available)",
            item.id, item.book.title, item.book_id, item.book.available_stock
        )?;
    }
    writeln!(out, "-- {} item(s)", cart.item_count())?;
    Ok(())
}

pub async fn add(app: &LendingApp, out: &mut impl Write, book: BookId) -> Result<(), CliError> {
    app.add_to_cart(book).await?;
    writeln!(
        out,
        "Added book #{book} to your cart ({} item(s)).",
        app.store().cart_count().await
    )?;
    Ok(())
}

pub async fn remove(
    app: &LendingApp,
    out: &mut impl Write,
    item: CartItemId,
) -> Result<(), CliError> {
    app.remove_from_cart(item).await?;
    writeln!(out, "Removed item #{item}.")?;
    Ok(())
}

pub async fn clear(app: &LendingApp, out: &mut impl Write) -> Result<(), CliError> {
    app.clear_cart().await?;
    writeln!(out, "Cart cleared.")?;
    Ok(())
}

/// Check out the selected items, or the whole cart when none are given.
pub async fn checkout(
    app: &LendingApp,
    out: &mut impl Write,
    mut form: CheckoutForm,
) -> Result<(), CliError> {
    if form.item_ids.is_empty() {
        form.item_ids = app.cart().await?.items.iter().map(|item| item.id).collect();
    }

    let today = Local::now().date_naive();
    writeln!(
        out,
        "Borrowing {} book(s) for {}, expected back by {}.",
        form.item_ids.len(),
        form.duration,
        form.expected_return_date(today)
    )?;

    let loans = app.checkout(&form).await?.into_inner();
    for loan in &loans {
        write_loan(out, loan)?;
    }
    writeln!(out, "Checkout complete: {} loan(s) created.", loans.len())?;
    Ok(())
}
