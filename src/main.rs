use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use shipdesk::application::Portal;
use shipdesk::application::identity::{AuthSession, require_role};
use shipdesk::application::search::{Scope, filter_payments};
use shipdesk::config::PortalConfig;
use shipdesk::domain::payment::{CardDetails, PaymentStatus};
use shipdesk::domain::ports::Stores;
use shipdesk::domain::shipment::{NewShipment, ServiceTier, ShipmentStatus};
use shipdesk::domain::user::{Registration, Role};
use shipdesk::error::ShippingError;
use shipdesk::infrastructure::seed;
use shipdesk::infrastructure::session_file::FileSessionStore;
use shipdesk::interfaces::csv::report_writer::ReportWriter;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Shipping agency portal", long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true, env = "SHIPDESK_DB_PATH")]
    db_path: Option<PathBuf>,

    /// File holding the signed-in session.
    #[arg(
        long,
        global = true,
        env = "SHIPDESK_SESSION_FILE",
        default_value = ".shipdesk-session.json"
    )]
    session_file: PathBuf,

    /// Probability that the simulated gateway approves a charge.
    #[arg(long, global = true, env = "SHIPDESK_PAYMENT_SUCCESS_RATE", default_value_t = 0.95)]
    payment_success_rate: f64,

    /// Artificial delay added to every in-memory store call.
    #[arg(long, global = true, env = "SHIPDESK_LATENCY_MS", default_value_t = 0)]
    latency_ms: u64,

    #[arg(long, global = true, env = "SHIPDESK_CURRENCY", default_value = "USD")]
    currency: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password.
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create a customer account and sign in.
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    SignOut,
    /// Show the signed-in user.
    Whoami,
    /// Public tracking lookup.
    Track { tracking_code: String },
    /// Create a shipment and pay for it.
    Create {
        #[arg(long)]
        sender_name: String,
        #[arg(long)]
        sender_address: String,
        #[arg(long)]
        recipient_name: String,
        #[arg(long)]
        recipient_address: String,
        /// Weight in kg.
        #[arg(long)]
        weight: Decimal,
        #[arg(long, default_value = "standard")]
        service: ServiceTier,
        /// Saved card to charge; defaults to the default card.
        #[arg(long)]
        method: Option<String>,
    },
    /// Retry payment for an unpaid shipment.
    Pay {
        tracking_code: String,
        #[arg(long)]
        method: Option<String>,
    },
    /// List shipments (all of them for admins).
    Shipments {
        #[arg(long, default_value = "")]
        query: String,
        /// Omit to list every status.
        #[arg(long)]
        status: Option<ShipmentStatus>,
    },
    /// Admin: move a shipment to a new status.
    UpdateStatus {
        tracking_code: String,
        status: ShipmentStatus,
        #[arg(long)]
        location: Option<String>,
        /// Skip the transition table.
        #[arg(long)]
        force: bool,
    },
    /// Admin: customer accounts with totals.
    Customers {
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Payment history (all payments for admins).
    Payments {
        #[arg(long)]
        status: Option<PaymentStatus>,
    },
    /// Admin: dashboard figures.
    Stats,
    /// Save a card.
    AddCard {
        #[arg(long)]
        number: String,
        #[arg(long)]
        exp_month: u32,
        #[arg(long)]
        exp_year: i32,
        #[arg(long)]
        cvc: String,
        #[arg(long)]
        name: String,
    },
    /// List saved cards.
    Methods,
    /// Make a saved card the default.
    SetDefault { method_id: String },
}

impl Cli {
    fn config(&self) -> PortalConfig {
        PortalConfig {
            payment_success_rate: self.payment_success_rate,
            currency: self.currency.clone(),
            latency: Duration::from_millis(self.latency_ms),
            ..Default::default()
        }
    }

    fn stores(&self, config: &PortalConfig) -> shipdesk::error::Result<Stores> {
        if let Some(db_path) = &self.db_path {
            #[cfg(feature = "storage-rocksdb")]
            {
                let store = shipdesk::infrastructure::rocksdb::RocksDBStore::open(db_path)?;
                return Ok(store.stores());
            }
            #[cfg(not(feature = "storage-rocksdb"))]
            {
                let _ = db_path;
                eprintln!(
                    "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
                );
            }
        }
        Ok(Stores::in_memory_with_latency(config.latency))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    let stores = cli.stores(&config).into_diagnostic()?;
    seed::seed_if_empty(&stores).await.into_diagnostic()?;

    let sessions = Arc::new(FileSessionStore::new(&cli.session_file));
    let portal = Portal::new(stores, sessions, &config).into_diagnostic()?;

    run(&portal, cli.command).await.into_diagnostic()
}

async fn run(portal: &Portal, command: Command) -> shipdesk::error::Result<()> {
    let stdout = io::stdout();
    let mut report = ReportWriter::new(stdout.lock());

    match command {
        Command::SignIn { email, password } => {
            let session = portal.identity.authenticate(&email, &password).await?;
            print_session(&session);
        }
        Command::SignUp {
            email,
            password,
            first_name,
            last_name,
        } => {
            let session = portal
                .identity
                .register(Registration {
                    email,
                    password,
                    first_name,
                    last_name,
                })
                .await?;
            print_session(&session);
        }
        Command::SignOut => {
            portal.identity.sign_out().await?;
            println!("Signed out");
        }
        Command::Whoami => {
            let session = portal.identity.current_session().await?;
            print_session(&session);
        }
        Command::Track { tracking_code } => {
            let report_for = portal.registry.track(&tracking_code).await?;
            let Some(found) = report_for else {
                return Err(ShippingError::not_found("Tracking code", tracking_code.trim()));
            };
            let s = &found.shipment;
            println!(
                "{} {} {} -> {} (estimated {})",
                s.tracking_code, s.status, s.sender_name, s.recipient_name, s.estimated_delivery
            );
            report.write_events(&found.events)?;
        }
        Command::Create {
            sender_name,
            sender_address,
            recipient_name,
            recipient_address,
            weight,
            service,
            method,
        } => {
            let session = portal.identity.current_session().await?;
            let method = resolve_method(portal, &session, method).await?;
            let receipt = portal
                .checkout
                .checkout(
                    NewShipment {
                        customer_id: session.user.id,
                        sender_name,
                        sender_address,
                        recipient_name,
                        recipient_address,
                        weight,
                        service,
                    },
                    &method,
                )
                .await?;
            println!(
                "Created {} for {} (payment {})",
                receipt.shipment.tracking_code,
                receipt.shipment.total_cost,
                receipt.payment.payment_id
            );
        }
        Command::Pay {
            tracking_code,
            method,
        } => {
            let session = portal.identity.current_session().await?;
            let shipment = portal
                .registry
                .find(&tracking_code)
                .await?
                .filter(|s| s.customer_id == session.user.id || session.user.is_admin())
                .ok_or_else(|| ShippingError::not_found("Tracking code", tracking_code.trim()))?;
            let method = resolve_method(portal, &session, method).await?;
            let receipt = portal.checkout.pay(shipment.id, &method).await?;
            println!(
                "Paid {} (payment {})",
                receipt.shipment.tracking_code, receipt.payment.payment_id
            );
        }
        Command::Shipments { query, status } => {
            let session = portal.identity.current_session().await?;
            let scope = if session.user.is_admin() {
                Scope::All
            } else {
                Scope::Customer(session.user.id)
            };
            let shipments = portal.query.shipments(&query, status, scope).await?;
            report.write_shipments(&shipments)?;
        }
        Command::UpdateStatus {
            tracking_code,
            status,
            location,
            force,
        } => {
            let session = portal.identity.current_session().await?;
            require_role(&session.user, Role::Admin)?;
            let shipment = portal
                .registry
                .find(&tracking_code)
                .await?
                .ok_or_else(|| ShippingError::not_found("Tracking code", tracking_code.trim()))?;
            let updated = if force {
                portal
                    .registry
                    .override_status(shipment.id, status, location.as_deref())
                    .await?
            } else {
                portal
                    .registry
                    .update_status(shipment.id, status, location.as_deref())
                    .await?
            };
            println!("{} is now {}", updated.tracking_code, updated.status);
        }
        Command::Customers { query } => {
            let session = portal.identity.current_session().await?;
            require_role(&session.user, Role::Admin)?;
            report.write_customers(&portal.query.customers(&query).await?)?;
        }
        Command::Payments { status } => {
            let session = portal.identity.current_session().await?;
            let payments = if session.user.is_admin() {
                portal.query.payments(status).await?
            } else {
                let own = portal.payments.list_payments(session.user.id).await?;
                filter_payments(&own, status).into_iter().cloned().collect()
            };
            report.write_payments(&payments)?;
        }
        Command::Stats => {
            let session = portal.identity.current_session().await?;
            require_role(&session.user, Role::Admin)?;
            let stats = portal.query.admin_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::AddCard {
            number,
            exp_month,
            exp_year,
            cvc,
            name,
        } => {
            let session = portal.identity.current_session().await?;
            let method = portal
                .payments
                .add_method(
                    session.user.id,
                    CardDetails {
                        number,
                        expiry_month: exp_month,
                        expiry_year: exp_year,
                        cvc,
                        name,
                    },
                )
                .await?;
            println!("Saved {} as {}", method.description(), method.id);
        }
        Command::Methods => {
            let session = portal.identity.current_session().await?;
            report.write_methods(&portal.payments.list_methods(session.user.id).await?)?;
        }
        Command::SetDefault { method_id } => {
            let session = portal.identity.current_session().await?;
            let method = portal
                .payments
                .set_default_method(session.user.id, &method_id)
                .await?;
            println!("Default card is now {}", method.description());
        }
    }
    Ok(())
}

fn print_session(session: &AuthSession) {
    println!(
        "{} <{}> ({})",
        session.user.full_name(),
        session.user.email,
        session.user.role
    );
}

/// The requested card if it belongs to the user, else their default card.
async fn resolve_method(
    portal: &Portal,
    session: &AuthSession,
    requested: Option<String>,
) -> shipdesk::error::Result<String> {
    let methods = portal.payments.list_methods(session.user.id).await?;
    match requested {
        Some(id) if methods.iter().any(|m| m.id == id) => Ok(id),
        Some(id) => Err(ShippingError::not_found("Payment method", id)),
        None => portal
            .payments
            .default_method(session.user.id)
            .await?
            .map(|m| m.id)
            .ok_or_else(|| {
                ShippingError::ValidationError("No saved payment method; add a card first".into())
            }),
    }
}
