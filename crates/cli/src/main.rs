//! Pinbazaar CLI - cart and checkout from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! pinbazaar cart show
//!
//! # Add two of a product, change a line's quantity, remove it
//! pinbazaar cart add pubg-660uc -q 2
//! pinbazaar cart set gid-line-1 5
//! pinbazaar cart remove gid-line-1
//!
//! # Fetch payment instructions, copy the IBAN and confirm the transfer
//! pinbazaar checkout --copy iban --confirm
//! ```
//!
//! Configuration comes from the environment (see
//! `pinbazaar_storefront::config`). `PINBAZAAR_ACCESS_TOKEN` stands in for
//! a signed-in user.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};
use pinbazaar_storefront::config::{ConfigError, StorefrontConfig};
use pinbazaar_storefront::error::{CartError, CheckoutError, GENERIC_MESSAGE};
use pinbazaar_storefront::gateway::GatewayError;
use pinbazaar_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod clipboard;
mod commands;

#[derive(Parser)]
#[command(name = "pinbazaar")]
#[command(author, version, about = "Pinbazaar cart and checkout")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Fetch bank-transfer instructions for the cart
    Checkout {
        /// Copy a payment detail to the clipboard
        #[arg(long, value_enum)]
        copy: Option<CopyTarget>,

        /// Confirm the transfer, empty the cart and finish the order
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show lines, subtotals and the total
    Show,
    /// Add a product
    Add {
        /// Product ID
        product: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Line ID
        line: String,
    },
    /// Set a line's quantity (0 removes it)
    Set {
        /// Line ID
        line: String,

        /// New quantity
        quantity: u32,
    },
    /// Empty the cart
    Clear,
}

/// Payment detail to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CopyTarget {
    Iban,
    Bank,
}

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gateway client error: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),
}

impl CliError {
    /// What to tell the user, unless a notice already did.
    fn user_message(&self) -> Option<String> {
        match self {
            Self::Config(err) => Some(err.to_string()),
            Self::Gateway(_) => Some(GENERIC_MESSAGE.to_string()),
            Self::InvalidQuantity(_) => Some(self.to_string()),
            Self::Cart(_) | Self::Checkout(_) => None,
        }
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pinbazaar_storefront=info,pinbazaar_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => exit_with(&CliError::Config(e)),
    };

    // Sentry before the subscriber so its layer has a client
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        exit_with(&e);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let state = AppState::new(config)?;
    let printer = tokio::spawn(commands::print_notices(state.notifier().subscribe()));

    let result = match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state).await,
            CartAction::Add { product, quantity } => {
                commands::cart::add(&state, &product, quantity).await
            }
            CartAction::Remove { line } => commands::cart::remove(&state, &line).await,
            CartAction::Set { line, quantity } => {
                commands::cart::set(&state, &line, quantity).await
            }
            CartAction::Clear => commands::cart::clear(&state).await,
        },
        Commands::Checkout { copy, confirm } => {
            commands::checkout::run(&state, copy, confirm).await
        }
    };

    // Dropping the last notifier handle ends the printer once it has caught up
    drop(state);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "Notice printer stopped early");
    }
    result
}

#[allow(clippy::print_stdout)]
fn exit_with(err: &CliError) -> ! {
    tracing::error!("Command failed: {err}");
    if let Some(message) = err.user_message() {
        println!("{message}");
    }
    std::process::exit(1);
}
