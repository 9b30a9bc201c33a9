//! # Command-Line Surface
//!
//! clap definitions for the `stockbook` binary and the dispatcher that maps
//! each subcommand onto one function in [`crate::commands`].
//!
//! ```text
//! stockbook [--data-dir DIR] [-v] <COMMAND>
//!
//!   login / logout / whoami / register / passwd
//!   products  list | search | add | edit | delete
//!   stock     shop
//!   movements list | add
//!   sales     list | add        invoice <SALE_ID>
//!   expenses  list | add
//!   debtors   dashboard
//!   users     list | grant
//!   backup    export | import
//!   config
//! ```
//!
//! Amounts are integers in the smallest currency unit.

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use crate::commands;
use crate::error::ApiError;
use crate::App;
use stock_core::{
    Capability, ExpenseInput, MovementInput, MovementKind, PaymentMode, Permissions, ProductInput, Role,
    SaleInput,
};

#[derive(Debug, Parser)]
#[command(name = "stockbook", version, about = "Stock ledger for a small shop")]
pub struct Cli {
    /// Directory holding the snapshot and session slots
    #[arg(long, env = "STOCKBOOK_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open a session
    Login {
        email: String,
        #[arg(long, env = "STOCKBOOK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Close the session
    Logout,
    /// Show the logged-in identity
    Whoami,
    /// Create an account with every capability granted
    Register {
        email: String,
        #[arg(long)]
        password: String,
        /// Create an administrator (requires an administrator session)
        #[arg(long)]
        admin: bool,
    },
    /// Change the session user's email and/or password
    Passwd {
        /// Current password
        #[arg(long)]
        current: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long = "new-password")]
        new_password: Option<String>,
    },
    #[command(subcommand)]
    Products(ProductCommand),
    /// Current stock per product, with low-stock flags
    Stock,
    /// Products with stock on hand
    Shop,
    #[command(subcommand)]
    Movements(MovementCommand),
    #[command(subcommand)]
    Sales(SaleCommand),
    #[command(subcommand)]
    Expenses(ExpenseCommand),
    /// Clients with an outstanding balance
    Debtors,
    /// Stock, expense and sales totals
    Dashboard,
    /// Print the invoice of a sale
    Invoice { sale_id: i64 },
    #[command(subcommand)]
    Users(UserCommand),
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Show the effective configuration
    Config,
}

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    List,
    /// Match code, name or category (case-insensitive)
    Search { query: String },
    Add(ProductArgs),
    Edit {
        id: i64,
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Delete a product (administrator); its history is kept
    Delete { id: i64 },
}

#[derive(Debug, Args)]
pub struct ProductArgs {
    pub code: String,
    pub name: String,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, default_value_t = 0)]
    pub initial_stock: i64,
    #[arg(long, default_value_t = 0)]
    pub min_stock: i64,
    /// Selling price
    #[arg(long, default_value_t = 0)]
    pub price: i64,
    #[arg(long, default_value_t = 0)]
    pub purchase_price: i64,
    #[arg(long, default_value_t = 0)]
    pub reseller_price: i64,
    #[arg(long)]
    pub image: Option<String>,
}

impl From<ProductArgs> for ProductInput {
    fn from(args: ProductArgs) -> Self {
        ProductInput {
            code: args.code,
            name: args.name,
            category: args.category,
            initial_stock: args.initial_stock,
            min_stock: args.min_stock,
            unit_price_cents: args.price,
            purchase_price_cents: args.purchase_price,
            reseller_price_cents: args.reseller_price,
            image_path: args.image,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum MovementCommand {
    List,
    Add(MovementArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    /// Goods in
    Entree,
    /// Goods out
    Sortie,
}

impl From<KindArg> for MovementKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Entree => MovementKind::Entree,
            KindArg::Sortie => MovementKind::Sortie,
        }
    }
}

#[derive(Debug, Args)]
pub struct MovementArgs {
    #[arg(value_enum)]
    pub kind: KindArg,
    pub product_id: i64,
    pub quantity: i64,
    /// Defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub price: Option<i64>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum SaleCommand {
    List,
    Add(SaleArgs),
}

#[derive(Debug, Args)]
pub struct SaleArgs {
    pub product_id: i64,
    pub quantity: i64,
    /// Unit price
    #[arg(long)]
    pub price: i64,
    /// cash, cheque, transfer, mobile
    #[arg(long, value_parser = parse_payment_mode)]
    pub payment: PaymentMode,
    #[arg(long, default_value_t = 0)]
    pub paid: i64,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ExpenseCommand {
    List,
    Add(ExpenseArgs),
}

#[derive(Debug, Args)]
pub struct ExpenseArgs {
    pub description: String,
    pub amount: i64,
    #[arg(long, value_parser = parse_payment_mode)]
    pub payment: PaymentMode,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Accounts and their capabilities (administrator)
    List,
    /// Replace a user's capabilities (administrator)
    Grant {
        user_id: i64,
        /// Capability to grant; repeat for several. Omitted ones are revoked.
        #[arg(long = "cap", value_parser = parse_capability)]
        caps: Vec<Capability>,
        /// Grant everything
        #[arg(long, conflicts_with = "caps")]
        all: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Write the store to a file (administrator)
    Export { path: PathBuf },
    /// Replace the store with a file's contents (administrator)
    Import { path: PathBuf },
}

// =============================================================================
// Value Parsers
// =============================================================================

fn parse_payment_mode(input: &str) -> Result<PaymentMode, String> {
    PaymentMode::parse(input).ok_or_else(|| format!("unknown payment mode '{}'", input))
}

/// Accepts `sales` as well as the column name `can_sales`.
fn parse_capability(input: &str) -> Result<Capability, String> {
    let wanted = input.trim().to_lowercase();
    Capability::ALL
        .into_iter()
        .find(|cap| cap.column() == wanted || cap.column().trim_start_matches("can_") == wanted)
        .ok_or_else(|| format!("unknown capability '{}'", input))
}

// =============================================================================
// Dispatch
// =============================================================================

/// What a command prints.
#[derive(Debug)]
pub enum Output {
    Json(serde_json::Value),
    Text(String),
}

fn json<T: Serialize>(value: T) -> Result<Output, ApiError> {
    serde_json::to_value(value)
        .map(Output::Json)
        .map_err(|e| ApiError::internal(e.to_string()))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Runs one subcommand against a started [`App`].
pub async fn run(app: &App, command: Command) -> Result<Output, ApiError> {
    let (db, session) = (&app.db, &app.session);

    match command {
        Command::Login { email, password } => json(commands::auth::login(db, session, &email, &password).await?),
        Command::Logout => {
            commands::auth::logout(session).await;
            Ok(Output::Text("Logged out".to_string()))
        }
        Command::Whoami => json(commands::auth::whoami(session).await?),
        Command::Register { email, password, admin } => {
            let role = if admin { Role::Admin } else { Role::User };
            json(commands::auth::register(db, session, &email, &password, role).await?)
        }
        Command::Passwd {
            current,
            email,
            new_password,
        } => json(
            commands::auth::change_credentials(db, session, &current, email.as_deref(), new_password.as_deref())
                .await?,
        ),

        Command::Products(cmd) => match cmd {
            ProductCommand::List => json(commands::product::list_products(db, session).await?),
            ProductCommand::Search { query } => json(commands::product::search_products(db, session, &query).await?),
            ProductCommand::Add(args) => json(commands::product::create_product(db, session, args.into()).await?),
            ProductCommand::Edit { id, product } => {
                json(commands::product::update_product(db, session, id, product.into()).await?)
            }
            ProductCommand::Delete { id } => {
                commands::product::delete_product(db, session, id).await?;
                Ok(Output::Text(format!("Product {} deleted", id)))
            }
        },
        Command::Stock => json(commands::product::list_stock(db, session).await?),
        Command::Shop => json(commands::product::shop(db, session).await?),

        Command::Movements(cmd) => match cmd {
            MovementCommand::List => json(commands::movement::list_movements(db, session).await?),
            MovementCommand::Add(args) => {
                let input = MovementInput {
                    date: args.date.unwrap_or_else(today),
                    kind: args.kind.into(),
                    product_id: Some(args.product_id),
                    quantity: args.quantity,
                    unit_price_cents: args.price,
                    client_name: args.client,
                    client_phone: args.phone,
                    comment: args.comment,
                };
                json(commands::movement::record_movement(db, session, input).await?)
            }
        },

        Command::Sales(cmd) => match cmd {
            SaleCommand::List => json(commands::sale::list_sales(db, session).await?),
            SaleCommand::Add(args) => {
                let input = SaleInput {
                    date: args.date.unwrap_or_else(today),
                    product_id: Some(args.product_id),
                    quantity: args.quantity,
                    unit_price_cents: args.price,
                    payment_mode: Some(args.payment),
                    client_name: args.client,
                    client_phone: args.phone,
                    paid_amount_cents: args.paid,
                    comment: args.comment,
                };
                json(commands::sale::record_sale(db, session, input).await?)
            }
        },

        Command::Expenses(cmd) => match cmd {
            ExpenseCommand::List => json(commands::expense::list_expenses(db, session).await?),
            ExpenseCommand::Add(args) => {
                let input = ExpenseInput {
                    date: args.date.unwrap_or_else(today),
                    description: args.description,
                    amount_cents: args.amount,
                    payment_mode: Some(args.payment),
                    category: args.category,
                    comment: args.comment,
                };
                json(commands::expense::record_expense(db, session, input).await?)
            }
        },

        Command::Debtors => json(commands::report::debtors(db, session).await?),
        Command::Dashboard => json(commands::report::dashboard(db, session).await?),
        Command::Invoice { sale_id } => {
            let invoice = commands::sale::invoice(db, session, &app.config, sale_id).await?;
            Ok(Output::Text(invoice.render()))
        }

        Command::Users(cmd) => match cmd {
            UserCommand::List => json(commands::auth::list_users(db, session).await?),
            UserCommand::Grant { user_id, caps, all } => {
                let permissions = if all {
                    Permissions::all_granted()
                } else {
                    caps.into_iter()
                        .fold(Permissions::none(), |perms, cap| perms.with(cap, true))
                };
                json(commands::auth::set_permissions(db, session, user_id, permissions).await?)
            }
        },

        Command::Backup(cmd) => match cmd {
            BackupCommand::Export { path } => json(commands::backup::export_backup(db, session, &path).await?),
            BackupCommand::Import { path } => json(commands::backup::import_backup(db, session, &path).await?),
        },

        Command::Config => json(&app.config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sale() {
        let cli = Cli::try_parse_from([
            "stockbook", "sales", "add", "3", "2", "--price", "500", "--payment", "momo", "--paid", "600",
        ])
        .unwrap();

        match cli.command {
            Command::Sales(SaleCommand::Add(args)) => {
                assert_eq!(args.product_id, 3);
                assert_eq!(args.payment, PaymentMode::MobileMoney);
                assert_eq!(args.paid, 600);
                assert!(args.date.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_payment_mode() {
        let result = Cli::try_parse_from(["stockbook", "sales", "add", "3", "2", "--price", "500", "--payment", "iou"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_capability_names() {
        assert_eq!(parse_capability("sales"), Ok(Capability::Sales));
        assert_eq!(parse_capability("can_debtors"), Ok(Capability::Debtors));
        assert!(parse_capability("payroll").is_err());
    }

    #[test]
    fn test_parse_movement_with_date() {
        let cli = Cli::try_parse_from([
            "stockbook", "movements", "add", "entree", "1", "12", "--date", "2024-05-01",
        ])
        .unwrap();

        match cli.command {
            Command::Movements(MovementCommand::Add(args)) => {
                assert!(matches!(args.kind, KindArg::Entree));
                assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 5, 1));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
