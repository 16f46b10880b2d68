//! Lending Desk CLI - terminal front-end for the library lending service.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the token is kept in LENDING_SESSION_FILE)
//! lend login -e reader@example.org -p 'correct horse'
//!
//! # Browse the catalog
//! lend books list --search dune --min-rating 4
//!
//! # Stage two books and borrow them for ten days
//! lend cart add 12
//! lend cart add 31
//! lend checkout --days 10 --purpose "Thesis research" --agree-return --agree-policy
//!
//! # Follow up
//! lend loans list --status borrowed
//! lend loans return 88
//! ```
//!
//! # Commands
//!
//! - `login`, `register`, `logout`, `whoami`, `profile` - Session and account
//! - `books`, `categories`, `authors` - Catalog
//! - `cart`, `checkout`, `borrow` - Cart and borrowing
//! - `loans`, `reviews` - Loan history and reviews
//! - `admin` - Administration (admin role only)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lending_client::{ClientConfig, LendingApp};
use lending_core::{
    AuthorId, BookId, BorrowDuration, CartItemId, CategoryId, LoanId, LoanStatus,
    LoanStatusFilter, ReviewId, StarRating, UserId,
};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "lend")]
#[command(author, version, about = "Lending Desk - borrow books from the library")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        #[arg(long)]
        phone: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// View or edit your profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Browse books
    Books {
        #[command(subcommand)]
        action: BooksAction,
    },
    /// List categories
    Categories,
    /// Browse authors
    Authors {
        #[command(subcommand)]
        action: AuthorsAction,
    },
    /// Manage the borrowing cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Borrow books from the cart
    Checkout {
        /// Cart item IDs to borrow (default: the whole cart)
        #[arg(short, long = "item")]
        items: Vec<CartItemId>,

        /// Loan length: 3, 5 or 10 days
        #[arg(short, long, default_value = "5")]
        days: BorrowDuration,

        /// Why you are borrowing
        #[arg(long)]
        purpose: String,

        /// Agree to return the books on time
        #[arg(long)]
        agree_return: bool,

        /// Agree to the lending policy
        #[arg(long)]
        agree_policy: bool,

        /// Start date (YYYY-MM-DD, default: today)
        #[arg(long)]
        borrow_date: Option<NaiveDate>,
    },
    /// Borrow a single book without the cart
    Borrow {
        book: BookId,

        #[arg(short, long, default_value = "5")]
        days: BorrowDuration,
    },
    /// Your loans
    Loans {
        #[command(subcommand)]
        action: LoansAction,
    },
    /// Book reviews
    Reviews {
        #[command(subcommand)]
        action: ReviewsAction,
    },
    /// Administration
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show profile and loan counters
    Show,
    /// Update name, phone or photo
    Update {
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        phone: Option<String>,

        /// Image file to upload as profile photo
        #[arg(long)]
        photo: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum BooksAction {
    /// Search the catalog
    List {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        category: Option<CategoryId>,

        #[arg(short, long)]
        author: Option<AuthorId>,

        /// Minimum average rating (1-5)
        #[arg(short, long)]
        min_rating: Option<StarRating>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show a book with its latest reviews
    Show { id: BookId },
    /// Recommended books
    Recommend {
        /// Ranking (`rating` or `popular`)
        #[arg(long)]
        by: Option<String>,

        #[arg(short, long)]
        category: Option<CategoryId>,

        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Subcommand)]
enum AuthorsAction {
    /// List authors
    List {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Most borrowed authors
    Popular {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Books by an author
    Books {
        id: AuthorId,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show staged books
    Show,
    /// Stage a book
    Add { book: BookId },
    /// Remove a cart item
    Remove { item: CartItemId },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum LoansAction {
    /// List your loans
    List {
        /// `all`, `borrowed`, `returned` or `late`
        #[arg(short, long, default_value = "all")]
        status: LoanStatusFilter,

        #[arg(short, long)]
        query: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },
    /// Return a borrowed book
    Return { id: LoanId },
}

#[derive(Subcommand)]
enum ReviewsAction {
    /// Reviews of a book
    List {
        book: BookId,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },
    /// Review a book
    Add {
        book: BookId,

        /// Stars (1-5)
        #[arg(short, long)]
        star: i64,

        #[arg(short, long)]
        comment: Option<String>,
    },
    /// Delete one of your reviews
    Delete { id: ReviewId },
    /// Your reviews
    Mine {
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long)]
        page: Option<u32>,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Library totals
    Overview,
    /// Book table
    Books {
        /// Availability (`available`, `borrowed`)
        #[arg(long)]
        status: Option<String>,

        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        category: Option<CategoryId>,

        #[arg(short, long)]
        author: Option<AuthorId>,

        #[arg(long)]
        page: Option<u32>,
    },
    /// Member table
    Users {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        page: Option<u32>,
    },
    /// All loans
    Loans {
        #[arg(short, long, default_value = "all")]
        status: LoanStatusFilter,

        #[arg(short, long)]
        query: Option<String>,

        #[arg(long)]
        page: Option<u32>,
    },
    /// Overdue loans
    Overdue,
    /// Add a book
    BookCreate(BookArgs),
    /// Edit a book
    BookUpdate {
        id: BookId,

        #[command(flatten)]
        book: BookArgs,
    },
    /// Delete a book
    BookDelete { id: BookId },
    /// Add a category
    CategoryCreate { name: String },
    /// Rename a category
    CategoryUpdate { id: CategoryId, name: String },
    /// Delete a category
    CategoryDelete { id: CategoryId },
    /// Add an author
    AuthorCreate {
        name: String,

        #[arg(long)]
        bio: Option<String>,
    },
    /// Edit an author
    AuthorUpdate {
        id: AuthorId,
        name: String,

        #[arg(long)]
        bio: Option<String>,
    },
    /// Delete an author
    AuthorDelete { id: AuthorId },
    /// Lend a book to a member
    LoanCreate {
        #[arg(long)]
        user: UserId,

        #[arg(long)]
        book: BookId,

        /// Due date (YYYY-MM-DD, default: server policy)
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Change a loan's due date or status
    LoanUpdate {
        id: LoanId,

        #[arg(long)]
        due: Option<NaiveDate>,

        /// `borrowed`, `returned` or `late`
        #[arg(long)]
        status: Option<LoanStatus>,
    },
}

/// Book fields shared by create and update.
#[derive(clap::Args)]
struct BookArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    isbn: String,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long)]
    stock: i64,

    #[arg(long)]
    author: AuthorId,

    #[arg(long)]
    category: CategoryId,

    /// Cover image file
    #[arg(long)]
    cover: Option<PathBuf>,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration is needed before tracing for the Sentry DSN
    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Logs go to stderr; stdout carries command output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lending_cli=info,lending_client=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(CliError::from(e)),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), CliError> {
    let app = LendingApp::from_config(config)?;

    // Login and register start a fresh session; everything else resumes one
    if !matches!(cli.command, Commands::Login { .. } | Commands::Register { .. }) {
        app.restore_session().await?;
    }

    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&app, &mut out, email, password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
            phone,
        } => {
            commands::account::register(&app, &mut out, name, email, password, phone).await?;
        }
        Commands::Logout => commands::account::logout(&app, &mut out).await?,
        Commands::Whoami => commands::account::whoami(&app, &mut out).await?,
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::account::profile(&app, &mut out).await?,
            ProfileAction::Update { name, phone, photo } => {
                commands::account::update_profile(&app, &mut out, name, phone, photo).await?;
            }
        },
        Commands::Books { action } => match action {
            BooksAction::List {
                search,
                category,
                author,
                min_rating,
                page,
                limit,
            } => {
                let filters = commands::catalog::Filters {
                    search,
                    category,
                    author,
                    min_rating,
                };
                commands::catalog::list(&app, &mut out, filters, page, limit).await?;
            }
            BooksAction::Show { id } => commands::catalog::show(&app, &mut out, id).await?,
            BooksAction::Recommend {
                by,
                category,
                limit,
            } => commands::catalog::recommend(&app, &mut out, by, category, limit).await?,
        },
        Commands::Categories => commands::catalog::categories(&app, &mut out).await?,
        Commands::Authors { action } => match action {
            AuthorsAction::List { search } => {
                commands::catalog::authors(&app, &mut out, search.as_deref()).await?;
            }
            AuthorsAction::Popular { limit } => {
                commands::catalog::popular_authors(&app, &mut out, limit).await?;
            }
            AuthorsAction::Books { id, page, limit } => {
                commands::catalog::author_books(&app, &mut out, id, page, limit).await?;
            }
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&app, &mut out).await?,
            CartAction::Add { book } => commands::cart::add(&app, &mut out, book).await?,
            CartAction::Remove { item } => commands::cart::remove(&app, &mut out, item).await?,
            CartAction::Clear => commands::cart::clear(&app, &mut out).await?,
        },
        Commands::Checkout {
            items,
            days,
            purpose,
            agree_return,
            agree_policy,
            borrow_date,
        } => {
            let form = lending_client::CheckoutForm {
                item_ids: items,
                duration: days,
                purpose,
                agree_return,
                agree_policy,
                borrow_date,
            };
            commands::cart::checkout(&app, &mut out, form).await?;
        }
        Commands::Borrow { book, days } => {
            commands::loans::borrow(&app, &mut out, book, days).await?;
        }
        Commands::Loans { action } => match action {
            LoansAction::List {
                status,
                query,
                page,
                limit,
            } => commands::loans::list(&app, &mut out, status, query, page, limit).await?,
            LoansAction::Return { id } => commands::loans::return_loan(&app, &mut out, id).await?,
        },
        Commands::Reviews { action } => match action {
            ReviewsAction::List { book, page, limit } => {
                commands::reviews::list(&app, &mut out, book, page, limit).await?;
            }
            ReviewsAction::Add {
                book,
                star,
                comment,
            } => commands::reviews::add(&app, &mut out, book, star, comment).await?,
            ReviewsAction::Delete { id } => commands::reviews::delete(&app, &mut out, id).await?,
            ReviewsAction::Mine { query, page } => {
                commands::reviews::mine(&app, &mut out, query, page).await?;
            }
        },
        Commands::Admin { action } => run_admin(&app, &mut out, action).await?,
    }
    Ok(())
}

async fn run_admin(
    app: &LendingApp,
    out: &mut impl std::io::Write,
    action: AdminAction,
) -> Result<(), CliError> {
    use commands::admin;

    match action {
        AdminAction::Overview => admin::overview(app, out).await,
        AdminAction::Books {
            status,
            search,
            category,
            author,
            page,
        } => {
            let query = lending_client::api::AdminBookQuery {
                status,
                q: search,
                category_id: category,
                author_id: author,
                page,
                limit: None,
            };
            admin::books(app, out, &query).await
        }
        AdminAction::Users { search, page } => admin::users(app, out, search, page).await,
        AdminAction::Loans {
            status,
            query,
            page,
        } => admin::loans(app, out, status, query, page).await,
        AdminAction::Overdue => admin::overdue(app, out).await,
        AdminAction::BookCreate(book) => admin::create_book(app, out, book.into_form().await?).await,
        AdminAction::BookUpdate { id, book } => {
            admin::update_book(app, out, id, book.into_form().await?).await
        }
        AdminAction::BookDelete { id } => admin::delete_book(app, out, id).await,
        AdminAction::CategoryCreate { name } => admin::create_category(app, out, &name).await,
        AdminAction::CategoryUpdate { id, name } => {
            admin::update_category(app, out, id, &name).await
        }
        AdminAction::CategoryDelete { id } => admin::delete_category(app, out, id).await,
        AdminAction::AuthorCreate { name, bio } => {
            admin::create_author(app, out, &name, bio.as_deref()).await
        }
        AdminAction::AuthorUpdate { id, name, bio } => {
            admin::update_author(app, out, id, &name, bio.as_deref()).await
        }
        AdminAction::AuthorDelete { id } => admin::delete_author(app, out, id).await,
        AdminAction::LoanCreate { user, book, due } => {
            admin::create_loan(app, out, user, book, due).await
        }
        AdminAction::LoanUpdate { id, due, status } => {
            admin::update_loan(app, out, id, due, status).await
        }
    }
}

impl BookArgs {
    async fn into_form(self) -> Result<lending_client::validation::BookForm, CliError> {
        let cover_image = match self.cover {
            Some(path) => Some(commands::read_upload(&path).await?),
            None => None,
        };
        Ok(lending_client::validation::BookForm {
            title: self.title,
            isbn: self.isbn,
            description: self.description,
            stock: self.stock,
            author_id: Some(self.author),
            category_id: Some(self.category),
            cover_image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_checkout_arguments() {
        let cli = Cli::try_parse_from([
            "lend",
            "checkout",
            "--item",
            "4",
            "--item",
            "9",
            "--days",
            "10",
            "--purpose",
            "Exam prep",
            "--agree-return",
        ])
        .unwrap_or_else(|e| panic!("{e}"));

        let Commands::Checkout {
            items,
            days,
            agree_return,
            agree_policy,
            ..
        } = cli.command
        else {
            panic!("expected checkout");
        };
        assert_eq!(items, vec![CartItemId::new(4), CartItemId::new(9)]);
        assert_eq!(days, BorrowDuration::TenDays);
        assert!(agree_return);
        assert!(!agree_policy);
    }

    #[test]
    fn test_rejects_unsupported_duration() {
        assert!(Cli::try_parse_from(["lend", "borrow", "3", "--days", "7"]).is_err());
    }
}
