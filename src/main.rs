//! `caja` command line front end.
//!
//! Stands in for the admin screens: every command loads the stored login
//! into a [`SessionContext`], calls the library, and prints the result.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

use caja_client::reconciliation::format_currency;
use caja_client::sessions::{
    FULL_DAY_WINDOW_MINUTES, SHORT_WINDOW_MINUTES, SummarySource,
};
use caja_client::users::{NewUser, Role};
use caja_client::{
    config, logging, products, sessions, storage, users, ApiClient, ClientConfig,
    ClosingSummary, OpenSessionRequest, Resolution, SessionContext,
};

#[derive(Parser, Debug)]
#[command(name = "caja")]
#[command(about = "Cash register sessions, products and users for the POS admin backend")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_SHA"), ")"))]
struct Cli {
    /// Backend base URL (overrides CAJA_API_URL and the stored URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the open cash register, if any
    Status,
    /// Open a cash register session
    Open {
        /// Opening balance
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        /// Employee id (defaults to the employee of the logged-in user)
        #[arg(long)]
        operator: Option<String>,
        /// Opening date, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Keep the session current for the whole day
        #[arg(long)]
        full_day: bool,
    },
    /// Close the open cash register and print the reconciliation
    Close {
        /// Counted closing balance
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
    },
    /// Print the closing summary of a session
    Summary { session_id: String },
    /// List all sessions
    History,
    /// Store the auth token and user object of a login
    Login {
        #[arg(long)]
        token: String,
        /// Serialized user object, e.g. '{"id":12}'
        #[arg(long)]
        user: String,
    },
    /// Forget the stored login
    Logout,
    /// Product catalog
    #[command(subcommand)]
    Products(ProductCommand),
    /// User accounts
    #[command(subcommand)]
    Users(UserCommand),
}

#[derive(Subcommand, Debug)]
enum ProductCommand {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "type", default_value = "")]
        kind: String,
        #[arg(long)]
        storable: bool,
        #[arg(long)]
        image_url: Option<String>,
    },
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    List,
    Register {
        #[arg(long)]
        user_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    /// Change a user's role (Administrador, Repartidor, Empleado, Cliente)
    Role { user_id: String, role: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init(&config::log_dir());

    info!(
        "caja v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_SHA"),
        env!("BUILD_TIMESTAMP")
    );

    let mut client_config = ClientConfig::load();
    if let Some(url) = cli.api_url.as_deref() {
        client_config.base_url = caja_client::api::normalize_base_url(url);
    }
    let api = ApiClient::from_config(&client_config).context("building HTTP client")?;
    let ctx = storage::load_session_context();

    run(cli.command, &api, &ctx).await
}

async fn run(command: Command, api: &ApiClient, ctx: &SessionContext) -> Result<()> {
    match command {
        Command::Status => {
            print_resolution(&sessions::resolve(api, ctx).await);
        }
        Command::Open {
            amount,
            operator,
            date,
            full_day,
        } => {
            let req = OpenSessionRequest {
                opening_balance: amount,
                operator_id: operator,
                opened_on: date,
                window_minutes: Some(if full_day {
                    FULL_DAY_WINDOW_MINUTES
                } else {
                    SHORT_WINDOW_MINUTES
                }),
            };
            sessions::open_session(api, ctx, &req).await?;
            println!("Cash register opened.");
            print_resolution(&sessions::resolve(api, ctx).await);
        }
        Command::Close { amount } => {
            let Some(open) = sessions::resolve_open_session(api, ctx).await else {
                anyhow::bail!("There is no open cash register to close.");
            };
            let outcome = sessions::close_session(api, ctx, &open.id, &amount).await?;
            println!("Cash register closed.");
            if outcome.source == SummarySource::CloseResponse {
                println!("(summary unavailable, showing the close response)");
            }
            print_summary(&outcome.summary);
            print_resolution(&sessions::resolve(api, ctx).await);
        }
        Command::Summary { session_id } => {
            match sessions::get_summary(api, ctx, &session_id).await? {
                Some(summary) => print_summary(&summary),
                None => println!("No summary available."),
            }
        }
        Command::History => {
            for s in sessions::list_sessions(api, ctx).await? {
                println!(
                    "{:>6}  {:<7} {:<26} opening {:>14}  closing {:>14}",
                    s.id,
                    if s.is_open() { "open" } else { "closed" },
                    s.opened_at.as_deref().unwrap_or("-"),
                    format_currency(s.opening_balance),
                    s.closing_balance
                        .map(format_currency)
                        .unwrap_or_else(|| "-".into()),
                );
            }
        }
        Command::Login { token, user } => {
            storage::store_login(&token, &user)?;
            println!("Login stored.");
        }
        Command::Logout => {
            storage::clear_login()?;
            println!("Login cleared.");
        }
        Command::Products(cmd) => run_products(cmd, api, ctx).await?,
        Command::Users(cmd) => run_users(cmd, api, ctx).await?,
    }
    Ok(())
}

async fn run_products(cmd: ProductCommand, api: &ApiClient, ctx: &SessionContext) -> Result<()> {
    match cmd {
        ProductCommand::List => {
            for p in products::list_products(api, ctx).await? {
                println!(
                    "{:>6}  {:<30} {:<12} {:>12}{}",
                    p.id,
                    p.name,
                    p.kind.as_deref().unwrap_or("-"),
                    format_currency(p.price),
                    if p.storable { "  [stock]" } else { "" }
                );
            }
        }
        ProductCommand::Add {
            name,
            price,
            description,
            kind,
            storable,
            image_url,
        } => {
            let product = products::NewProduct {
                name,
                description,
                kind,
                price,
                storable,
                image_url,
            };
            products::register_product(api, ctx, &product).await?;
            println!("Product registered.");
        }
        ProductCommand::Rm { id } => {
            products::delete_product(api, ctx, &id).await?;
            println!("Product deleted.");
        }
    }
    Ok(())
}

async fn run_users(cmd: UserCommand, api: &ApiClient, ctx: &SessionContext) -> Result<()> {
    match cmd {
        UserCommand::List => {
            for u in users::list_users(api, ctx).await? {
                println!(
                    "{:>6}  {:<20} {:<30} {}",
                    u.id,
                    u.user_name.as_deref().unwrap_or("-"),
                    u.email.as_deref().unwrap_or("-"),
                    u.role_name()
                );
            }
        }
        UserCommand::Register {
            user_name,
            email,
            password,
            phone,
        } => {
            let user = NewUser {
                user_name,
                email,
                password,
                phone,
            };
            users::register_user(api, &user).await?;
            println!("User registered.");
        }
        UserCommand::Role { user_id, role } => {
            let role: Role = role.parse()?;
            users::change_role(api, ctx, &user_id, role).await?;
            println!("Role changed to \"{role}\".");
        }
    }
    Ok(())
}

fn print_resolution(resolution: &Resolution) {
    match &resolution.session {
        Some(s) => println!(
            "Open cash register #{} since {} with opening balance {}",
            s.id,
            s.opened_at.as_deref().unwrap_or("-"),
            format_currency(s.opening_balance)
        ),
        None => println!("No open cash register. Use `caja open --amount <x>`."),
    }
    if resolution.has_duplicate_open_sessions() {
        println!(
            "warning: the backend reports {} open cash registers",
            resolution.open_count.unwrap_or_default()
        );
    }
}

fn print_summary(summary: &ClosingSummary) {
    let r = summary.reconciliation();
    println!("{}", r.verdict());
    println!(
        "Expected: {}  Actual: {}",
        format_currency(r.expected),
        format_currency(r.closing)
    );
    println!("Date:          {}", summary.opened_at.as_deref().unwrap_or("-"));
    println!("Employee:      {}", summary.operator_name.as_deref().unwrap_or("-"));
    println!("Opening:       {}", format_currency(r.opening));
    println!("Closing:       {}", format_currency(r.closing));
    println!("Total sales:   {}", format_currency(r.sales));
    println!("Sale count:    {}", summary.sale_count);
    if !summary.sales_by_payment_method.is_empty() {
        println!("Sales by payment method:");
        for (method, amount) in &summary.sales_by_payment_method {
            println!("  {:<20} {:>14}", method, format_currency(*amount));
        }
    }
}
