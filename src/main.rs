#![allow(clippy::print_stdout, clippy::print_stderr)]
//! Command-line front end for the CRM logger.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crm_logger::config::AppConfig;
use crm_logger::export::{export_path, ExportFormat};
use crm_logger::logging::{init_logging, OperationTimer};
use crm_logger::metrics::describe_metrics;
use crm_logger::models::{parse_date, ContactMethod, CustomerType, FollowUp, PaymentMethod, TicketType};
use crm_logger::query::{SortOrder, ViewQuery};
use crm_logger::schema::{interactions, tickets};
use crm_logger::{CrmService, NewInteraction, Session, Table, TicketSaleRecord, UpsertOutcome};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Login name
    #[arg(long, global = true, env = "CRM_LOGGER_USERNAME")]
    username: Option<String>,

    /// Login password
    #[arg(long, global = true, env = "CRM_LOGGER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Extra configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the customer log and ticket tables if missing
    Init,
    /// Log a customer interaction (repeat names count as another visit)
    Log {
        /// Customer name
        #[arg(short, long)]
        name: String,

        /// Email or phone
        #[arg(short, long, default_value = "")]
        contact: String,

        /// Customer type (new, returning, vip)
        #[arg(short = 't', long = "type", default_value = "new")]
        customer_type: String,

        /// Company or organization
        #[arg(long)]
        company: Option<String>,

        /// Preferred contact method (email, phone-call, whatsapp, in-person)
        #[arg(short, long, default_value = "email")]
        preferred: String,

        /// Last interaction date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        last_interaction: Option<String>,

        /// Follow-up reminder date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        follow_up: Option<String>,

        /// Interaction notes
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Search, filter and sort the customer log
    List {
        /// Match name, contact or company (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,

        /// Keep only these customer types (repeatable)
        #[arg(short = 't', long = "type")]
        types: Vec<String>,

        /// Column to sort by, e.g. "Customer Name"
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Export the view (csv or json)
        #[arg(short, long)]
        export: Option<String>,

        /// Export file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show upcoming follow-ups
    FollowUps {
        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        today: Option<String>,
    },
    /// Mark a customer's follow-up as completed
    Complete {
        /// Customer name (exact match)
        name: String,
    },
    /// Record a ticket sale
    Ticket {
        /// Buyer name, "Anonymous" when omitted
        #[arg(short, long, default_value = "")]
        name: String,

        /// Ticket type (general, vip, student-discount)
        #[arg(short = 't', long = "type", default_value = "general")]
        ticket_type: String,

        /// Payment method (card, cash-at-door, bank-deposit)
        #[arg(short, long, default_value = "card")]
        payment: String,

        /// Amount paid
        #[arg(short, long)]
        amount: String,

        /// Event name
        #[arg(short, long)]
        event: String,

        /// Purchase date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },
    /// List ticket sales
    Tickets {
        /// Column to sort by, e.g. "Amount Paid"
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Show per-event totals instead of rows
        #[arg(long)]
        summary: bool,

        /// Export the view (csv or json)
        #[arg(short, long)]
        export: Option<String>,

        /// Export file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load(cli.config.as_deref())?;

    // Initialize logging
    let log_level = cli.log_level.clone().unwrap_or_else(|| config.get_log_level());
    let log_file = config.logging.file_path.as_ref().map(PathBuf::from);
    let _log_guard = init_logging(Some(&log_level), &config.logging.format, log_file.as_deref())?;
    describe_metrics();

    info!("Starting crm-logger");

    if matches!(cli.command, Commands::Config) {
        print!("{}", config.to_redacted_yaml()?);
        return Ok(());
    }

    let mut session = Session::new();
    let username = cli
        .username
        .as_deref()
        .context("Login required: pass --username or set CRM_LOGGER_USERNAME")?;
    let password = cli
        .password
        .as_deref()
        .context("Login required: pass --password or set CRM_LOGGER_PASSWORD")?;
    session.login(&config.auth.credentials(), username, password)?;

    let service = CrmService::open(&config.storage);
    for diagnostic in service.diagnostics() {
        warn!("{diagnostic}");
        eprintln!("warning: {diagnostic}");
    }

    let result = run(&cli.command, &config, &service, &session);
    session.logout();
    result
}

fn run(command: &Commands, config: &AppConfig, service: &CrmService, session: &Session) -> Result<()> {
    let timer = OperationTimer::new("command");
    match command {
        Commands::Init => {
            for path in config.storage.table_locations()? {
                debug!(backend = config.storage.backend.as_str(), path = %path.display(), "Table location");
            }
            println!(
                "Customer log: {}",
                if service.interactions_available() { "ready" } else { "unavailable" }
            );
            println!(
                "Ticket sales: {}",
                if service.tickets_available() { "ready" } else { "unavailable" }
            );
        },
        Commands::Log {
            name,
            contact,
            customer_type,
            company,
            preferred,
            last_interaction,
            follow_up,
            notes,
        } => {
            let today = Local::now().date_naive();
            let candidate = NewInteraction {
                customer_name: name.clone(),
                contact: contact.clone(),
                customer_type: customer_type.parse()?,
                company: company.clone(),
                preferred_contact: preferred.parse::<ContactMethod>()?,
                last_interaction: parse_date_or(last_interaction.as_deref(), today)?,
                follow_up: FollowUp::Due(parse_date_or(follow_up.as_deref(), today)?),
                notes: notes.clone(),
            };
            match service.log_interaction(session, &candidate)? {
                UpsertOutcome::Inserted => println!("Interaction saved for new customer {}", candidate.customer_name),
                UpsertOutcome::Incremented { total_visits } => {
                    println!("Interaction saved: {} now has {total_visits} visits", candidate.customer_name);
                },
            }
        },
        Commands::List {
            search,
            types,
            sort,
            desc,
            export,
            output,
        } => {
            let view = ViewQuery {
                search: search.clone(),
                customer_types: types
                    .iter()
                    .map(|t| t.parse::<CustomerType>())
                    .collect::<crm_logger::Result<Vec<_>>>()?,
                sort_by: sort.clone(),
                order: sort_order(*desc),
            };
            let table = service.interaction_view(session, &view)?;
            print!("{}", render_table(&table));
            maybe_export(config, service, session, &table, interactions::TABLE, export.as_deref(), output.as_deref())?;
        },
        Commands::FollowUps { today } => {
            let today = parse_date_or(today.as_deref(), Local::now().date_naive())?;
            let due = service.follow_ups(session, today)?;
            if due.is_empty() {
                println!("No upcoming follow-ups.");
            }
            for row in due.iter() {
                println!(
                    "{} - Follow-up on {}",
                    row.get_or_empty(interactions::CUSTOMER_NAME),
                    row.get_or_empty(interactions::FOLLOW_UP)
                );
            }
        },
        Commands::Complete { name } => {
            if service.complete_follow_up(session, name)? {
                println!("Follow-up for {name} marked as completed");
            } else {
                println!("No customer named {name}");
            }
        },
        Commands::Ticket {
            name,
            ticket_type,
            payment,
            amount,
            event,
            date,
        } => {
            let amount = Decimal::from_str(amount.trim()).with_context(|| format!("Invalid amount: {amount}"))?;
            let sale = TicketSaleRecord::new(
                parse_date_or(date.as_deref(), Local::now().date_naive())?,
                name,
                ticket_type.parse::<TicketType>()?,
                payment.parse::<PaymentMethod>()?,
                amount,
                event,
            )?;
            service.record_ticket_sale(session, &sale)?;
            println!("Ticket sale recorded: {} for {}", sale.customer_name, sale.event_name);
        },
        Commands::Tickets {
            sort,
            desc,
            summary,
            export,
            output,
        } => {
            if *summary {
                let summary = service.ticket_summary(session)?;
                for event in &summary.events {
                    println!("{}: {} tickets, {:.2}", event.event_name, event.tickets, event.revenue);
                }
                println!("Total: {} tickets, {:.2}", summary.total_tickets, summary.total_revenue);
            } else {
                let view = ViewQuery {
                    sort_by: sort.clone(),
                    order: sort_order(*desc),
                    ..ViewQuery::default()
                };
                let table = service.ticket_view(session, &view)?;
                print!("{}", render_table(&table));
                maybe_export(config, service, session, &table, tickets::TABLE, export.as_deref(), output.as_deref())?;
            }
        },
        Commands::Config => {},
    }
    timer.finish();
    Ok(())
}

const fn sort_order(desc: bool) -> SortOrder {
    if desc {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    }
}

fn parse_date_or(value: Option<&str>, fallback: NaiveDate) -> Result<NaiveDate> {
    value.map_or(Ok(fallback), |v| parse_date(v).map_err(anyhow::Error::from))
}

/// Export when a format or an output path was given.
fn maybe_export(
    config: &AppConfig,
    service: &CrmService,
    session: &Session,
    table: &Table,
    table_name: &str,
    format: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    if format.is_none() && output.is_none() {
        return Ok(());
    }
    let format = match format {
        Some(f) => f.parse::<ExportFormat>()?,
        None => config.export.format()?,
    };
    let path = output.map_or_else(
        || {
            let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
            export_path(Path::new(&config.export.output_directory), table_name, format, &timestamp)
        },
        Path::to_path_buf,
    );
    service.export_view(session, table, format, &path)?;
    println!("Exported {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Render a snapshot as an aligned text table.
fn render_table(table: &Table) -> String {
    if table.is_empty() {
        return "No rows.\n".to_string();
    }

    let mut widths: Vec<usize> = table.header().iter().map(|h| h.chars().count()).collect();
    for row in table.rows() {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        widths
            .iter()
            .enumerate()
            .map(|(i, &width)| format!("{:<width$}", cells.get(i).map_or("", String::as_str)))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(table.header()));
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
    out.push('\n');
    for row in table.rows() {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}
