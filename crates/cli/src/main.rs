//! GymFuel CLI - cart, wishlist and coupons from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Add two tubs of whey in a specific size and flavor
//! gymfuel cart add whey --name "Whey Protein" --price 2499 --quantity 2 --size 1kg --flavor Mocha
//!
//! # Show the cart with a coupon applied
//! gymfuel cart show --coupon WELCOME10
//!
//! # Toggle a wishlist entry
//! gymfuel wishlist toggle creatine
//!
//! # Talk to the commerce API instead of local storage
//! GYMFUEL_CART_MODE=remote gymfuel cart show
//! ```
//!
//! # Commands
//!
//! - `cart show|add|update|remove|clear` - Manage the cart
//! - `wishlist list|toggle|remove` - Manage the wishlist
//! - `coupon check` - Verify a coupon against the current cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use gymfuel_core::{VariantAttributes, VariantKey};
use gymfuel_storefront::api::CommerceClient;
use gymfuel_storefront::backend::{CartBackend, CartMode, LocalBackend, RemoteBackend};
use gymfuel_storefront::config::StorefrontConfig;
use gymfuel_storefront::coupon::{CatalogCouponVerifier, CouponVerifier, RemoteCouponVerifier};
use gymfuel_storefront::storage::{FileStorage, Storage};
use gymfuel_storefront::{Error, telemetry};

mod commands;

use commands::Session;

#[derive(Parser)]
#[command(name = "gymfuel")]
#[command(author, version, about = "GymFuel storefront cart tools")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Work with coupons
    Coupon {
        #[command(subcommand)]
        action: CouponAction,
    },
}

/// Size/flavor selection identifying a line.
#[derive(clap::Args, Debug, Clone, Default)]
struct VariantArgs {
    /// Size, e.g. `1kg`
    #[arg(long)]
    size: Option<String>,

    /// Flavor, e.g. `Mocha`
    #[arg(long)]
    flavor: Option<String>,
}

impl VariantArgs {
    fn key(&self) -> VariantKey {
        VariantKey::new(self.size.as_deref(), self.flavor.as_deref())
    }

    fn into_attributes(self) -> VariantAttributes {
        VariantAttributes::new(self.size, self.flavor)
    }
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart and its totals
    Show {
        /// Apply a coupon before printing
        #[arg(long)]
        coupon: Option<String>,
    },
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: String,

        /// Product name
        #[arg(long)]
        name: String,

        /// Unit price
        #[arg(long)]
        price: Decimal,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        #[command(flatten)]
        variant: VariantArgs,

        /// Product variant ID (required in remote mode)
        #[arg(long)]
        variant_id: Option<String>,

        #[arg(long)]
        slug: Option<String>,

        /// Image URL
        #[arg(long)]
        image: Option<String>,
    },
    /// Set the quantity of a line
    Update {
        product_id: String,
        quantity: u32,
        #[command(flatten)]
        variant: VariantArgs,
    },
    /// Remove a line
    Remove {
        product_id: String,
        #[command(flatten)]
        variant: VariantArgs,
    },
    /// Remove every line and the coupon
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// List wishlisted products
    List,
    /// Add or remove a product
    Toggle { product_id: String },
    /// Remove a product
    Remove { product_id: String },
}

#[derive(Subcommand)]
enum CouponAction {
    /// Verify a coupon against the current cart
    Check { code: String },
}

/// Commands that need a cart session.
enum CartJob {
    Cart(CartAction),
    Coupon(CouponAction),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing(cli.log_json);
            fail(&Error::from(e));
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(cli.log_json);

    if let Err(e) = run(cli, config).await {
        e.report();
        drop(sentry_guard);
        fail(&e);
    }
}

#[allow(clippy::print_stderr)]
fn fail(error: &Error) -> ! {
    tracing::debug!(error = %error, "Command failed");
    eprintln!("error: {}", error.user_message());
    std::process::exit(1);
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Error> {
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(&config.storage_dir)?);

    let job = match cli.command {
        Commands::Wishlist { action } => {
            match action {
                WishlistAction::List => commands::wishlist::list(storage).await,
                WishlistAction::Toggle { product_id } => {
                    commands::wishlist::toggle(storage, &product_id).await;
                }
                WishlistAction::Remove { product_id } => {
                    commands::wishlist::remove(storage, &product_id).await;
                }
            }
            return Ok(());
        }
        Commands::Cart { action } => CartJob::Cart(action),
        Commands::Coupon { action } => CartJob::Coupon(action),
    };

    tracing::debug!(mode = %config.cart_mode, "Opening cart");
    match config.cart_mode {
        CartMode::Local => {
            let session = Session::open(
                LocalBackend::new(storage),
                CatalogCouponVerifier::new(config.coupons.clone()),
                &config,
            )
            .await?;
            run_job(job, &session).await
        }
        CartMode::Remote => {
            let client = CommerceClient::new(&config.api)?;
            let session = Session::open(
                RemoteBackend::new(client.clone()),
                RemoteCouponVerifier::new(client),
                &config,
            )
            .await?;
            run_job(job, &session).await
        }
    }
}

async fn run_job<B: CartBackend, V: CouponVerifier>(
    job: CartJob,
    session: &Session<B, V>,
) -> Result<(), Error> {
    let result = match job {
        CartJob::Cart(action) => match action {
            CartAction::Show { coupon } => commands::cart::show(session, coupon.as_deref()).await,
            CartAction::Add {
                product_id,
                name,
                price,
                quantity,
                variant,
                variant_id,
                slug,
                image,
            } => {
                commands::cart::add(
                    session,
                    commands::cart::NewItem {
                        product_id,
                        name,
                        price,
                        quantity,
                        variant: variant.into_attributes(),
                        variant_id,
                        slug,
                        image,
                    },
                )
                .await
            }
            CartAction::Update {
                product_id,
                quantity,
                variant,
            } => commands::cart::update(session, &product_id, &variant.key(), quantity).await,
            CartAction::Remove {
                product_id,
                variant,
            } => commands::cart::remove(session, &product_id, &variant.key()).await,
            CartAction::Clear => commands::cart::clear(session).await,
        },
        CartJob::Coupon(CouponAction::Check { code }) => {
            commands::coupon::check(session, &code).await
        }
    };

    session.settle().await;
    result
}
