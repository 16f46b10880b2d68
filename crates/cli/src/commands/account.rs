//! Session and profile commands.

use std::io::Write;
use std::path::PathBuf;

use lending_client::LendingApp;
use lending_client::api::User;
use lending_client::validation::{LoginForm, ProfileForm, RegisterForm};
use lending_client::views::Route;

use super::{CliError, read_upload};

pub async fn login(
    app: &LendingApp,
    out: &mut impl Write,
    email: String,
    password: String,
) -> Result<(), CliError> {
    let user = app.login(&LoginForm { email, password }).await?;
    welcome(app, out, &user).await
}

pub async fn register(
    app: &LendingApp,
    out: &mut impl Write,
    name: String,
    email: String,
    password: String,
    phone: Option<String>,
) -> Result<(), CliError> {
    let form = RegisterForm {
        name,
        email,
        password,
        phone,
    };
    let user = app.register(&form).await?;
    welcome(app, out, &user).await
}

async fn welcome(app: &LendingApp, out: &mut impl Write, user: &User) -> Result<(), CliError> {
    writeln!(out, "Signed in as {} <{}>", user.name, user.email)?;
    let home = Route::home(&app.snapshot().await);
    if home == Route::AdminDashboard {
        writeln!(out, "You have admin access; try `lend admin overview`.")?;
    }
    Ok(())
}

pub async fn logout(app: &LendingApp, out: &mut impl Write) -> Result<(), CliError> {
    app.logout().await;
    writeln!(out, "Signed out.")?;
    Ok(())
}

pub async fn whoami(app: &LendingApp, out: &mut impl Write) -> Result<(), CliError> {
    match app.snapshot().await.user {
        Some(user) => writeln!(out, "{} <{}> ({})", user.name, user.email, user.role)?,
        None => writeln!(out, "Not signed in.")?,
    }
    Ok(())
}

pub async fn profile(app: &LendingApp, out: &mut impl Write) -> Result<(), CliError> {
    let profile = app.profile().await?;
    let user = &profile.user;
    let stats = &profile.loan_stats;

    writeln!(out, "{} <{}>", user.name, user.email)?;
    writeln!(out, "Role:    {}", user.role)?;
    writeln!(out, "Phone:   {}", user.phone.as_deref().unwrap_or("-"))?;
    writeln!(out, "Member:  since {}", user.created_at.date_naive())?;
    writeln!(
        out,
        "Loans:   {} total, {} active, {} returned, {} overdue",
        stats.total, stats.active, stats.returned, stats.overdue
    )?;
    Ok(())
}

pub async fn update_profile(
    app: &LendingApp,
    out: &mut impl Write,
    name: String,
    phone: Option<String>,
    photo: Option<PathBuf>,
) -> Result<(), CliError> {
    let profile_photo = match photo {
        Some(path) => Some(read_upload(&path).await?),
        None => None,
    };
    let form = ProfileForm {
        name,
        phone,
        profile_photo,
    };
    let profile = app.update_profile(&form).await?.into_inner();
    writeln!(out, "Profile updated for {}.", profile.user.name)?;
    Ok(())
}
