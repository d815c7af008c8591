//! Application service: both stores behind the login gate.
//!
//! Each table is opened independently. When one cannot be opened it becomes a
//! disabled section backed by [`UnavailableBackend`], its diagnostic is kept for
//! display, and the other table keeps working.

use std::path::Path;
use std::rc::Rc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::backend::{CsvBackend, SqliteBackend, TableBackend, UnavailableBackend};
use crate::config::{BackendKind, StorageConfig};
use crate::error::{CrmError, Result};
use crate::export::{write_table_to_file, ExportFormat};
use crate::models::{InteractionRecord, NewInteraction, TicketSaleRecord};
use crate::query::{self, TicketSummary, ViewQuery};
use crate::schema::{interactions, tickets};
use crate::session::Session;
use crate::store::{InteractionStore, TicketStore, UpsertOutcome, UpsertPolicy};
use crate::table::Table;
use crate::validation::InputValidator;

/// A store that either initialized or was disabled with a diagnostic.
struct Section<S> {
    table: &'static str,
    store: S,
    disabled: Option<String>,
}

impl<S> Section<S> {
    fn available(&self) -> Result<&S> {
        match &self.disabled {
            None => Ok(&self.store),
            Some(reason) => Err(CrmError::Unavailable {
                table: self.table.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Customer log and ticket sales, gated by a [`Session`].
pub struct CrmService {
    interactions: Section<InteractionStore>,
    tickets: Section<TicketStore>,
}

impl CrmService {
    /// Open the configured backend and initialize both tables. Never fails: an
    /// unreachable table is disabled instead.
    pub fn open(config: &StorageConfig) -> Self {
        let policy = config.policy().unwrap_or_default();
        let backends = match config.backend_kind() {
            Ok(BackendKind::Csv) => {
                let backend: Rc<dyn TableBackend> = Rc::new(CsvBackend::new(&config.data_dir));
                (Rc::clone(&backend), backend)
            },
            Ok(BackendKind::Sqlite) => match SqliteBackend::open(&config.database_path()) {
                Ok(backend) => {
                    let backend: Rc<dyn TableBackend> = Rc::new(backend);
                    (Rc::clone(&backend), backend)
                },
                Err(e) => unavailable_pair(&e.to_string()),
            },
            Err(e) => unavailable_pair(&e.to_string()),
        };
        Self::from_backends(backends.0, backends.1, policy)
    }

    /// Build from explicit backends, initializing both tables.
    pub fn from_backends(
        interaction_backend: Rc<dyn TableBackend>,
        ticket_backend: Rc<dyn TableBackend>,
        policy: UpsertPolicy,
    ) -> Self {
        let interactions = init_section(interactions::TABLE, interaction_backend, |backend| {
            InteractionStore::new(backend, policy)
        });
        let tickets = init_section(tickets::TABLE, ticket_backend, TicketStore::new);
        Self { interactions, tickets }
    }

    /// One line per disabled table.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        [
            (self.interactions.table, &self.interactions.disabled),
            (self.tickets.table, &self.tickets.disabled),
        ]
        .into_iter()
        .filter_map(|(table, disabled)| disabled.as_ref().map(|reason| format!("{table} unavailable: {reason}")))
        .collect()
    }

    /// True when the customer log opened.
    #[must_use]
    pub const fn interactions_available(&self) -> bool {
        self.interactions.disabled.is_none()
    }

    /// True when the ticket table opened.
    #[must_use]
    pub const fn tickets_available(&self) -> bool {
        self.tickets.disabled.is_none()
    }

    /// Validate and upsert an interaction.
    pub fn log_interaction(&self, session: &Session, candidate: &NewInteraction) -> Result<UpsertOutcome> {
        let user = session.require()?;
        let store = self.interactions.available()?;

        let mut candidate = candidate.clone();
        candidate.customer_name = candidate.customer_name.trim().to_string();
        InputValidator::validate_interaction(&candidate)?;

        let outcome = store.upsert_interaction(&candidate)?;
        info!(user, customer = candidate.customer_name.as_str(), ?outcome, "Interaction saved");
        Ok(outcome)
    }

    /// The customer log after search, type filter and sort.
    pub fn interaction_view(&self, session: &Session, view: &ViewQuery) -> Result<Table> {
        session.require()?;
        let store = self.interactions.available()?;
        Ok(view.apply(&store.load_snapshot()))
    }

    /// Decoded customer records.
    pub fn interaction_records(&self, session: &Session) -> Result<Vec<InteractionRecord>> {
        session.require()?;
        Ok(self.interactions.available()?.load_all())
    }

    /// Rows with a follow-up on or after `today`, soonest first.
    pub fn follow_ups(&self, session: &Session, today: NaiveDate) -> Result<Table> {
        session.require()?;
        let store = self.interactions.available()?;
        let due = query::upcoming_follow_ups(&store.load_snapshot(), today);
        Ok(query::sort_by_column(&due, interactions::FOLLOW_UP, query::SortOrder::Ascending))
    }

    /// Mark a customer's follow-up completed. `false` when the name is unknown.
    pub fn complete_follow_up(&self, session: &Session, customer_name: &str) -> Result<bool> {
        let user = session.require()?;
        let marked = self.interactions.available()?.mark_follow_up_completed(customer_name.trim())?;
        if marked {
            info!(user, customer = customer_name, "Follow-up completed");
        }
        Ok(marked)
    }

    /// Validate and append a ticket sale.
    pub fn record_ticket_sale(&self, session: &Session, sale: &TicketSaleRecord) -> Result<()> {
        let user = session.require()?;
        let store = self.tickets.available()?;
        InputValidator::validate_amount(sale.amount_paid)?;
        InputValidator::validate_event_name(&sale.event_name)?;
        store.append_ticket_sale(sale)?;
        info!(user, event = sale.event_name.as_str(), "Ticket sale saved");
        Ok(())
    }

    /// The ticket table, optionally sorted.
    pub fn ticket_view(&self, session: &Session, view: &ViewQuery) -> Result<Table> {
        session.require()?;
        let store = self.tickets.available()?;
        Ok(view.apply(&store.load_snapshot()))
    }

    /// Per-event ticket totals.
    pub fn ticket_summary(&self, session: &Session) -> Result<TicketSummary> {
        session.require()?;
        let sales = self.tickets.available()?.load_all();
        Ok(query::ticket_summary(&sales))
    }

    /// Write a displayed view to disk.
    pub fn export_view(&self, session: &Session, view: &Table, format: ExportFormat, path: &Path) -> Result<()> {
        session.require()?;
        InputValidator::validate_file_path(path)?;
        write_table_to_file(view, format, path)
    }
}

fn unavailable_pair(reason: &str) -> (Rc<dyn TableBackend>, Rc<dyn TableBackend>) {
    let backend: Rc<dyn TableBackend> = Rc::new(UnavailableBackend::new(reason));
    (Rc::clone(&backend), backend)
}

fn init_section<S, F>(table: &'static str, backend: Rc<dyn TableBackend>, build: F) -> Section<S>
where
    F: Fn(Rc<dyn TableBackend>) -> S,
    S: Initialize,
{
    let store = build(Rc::clone(&backend));
    match store.init_table() {
        Ok(()) => Section {
            table,
            store,
            disabled: None,
        },
        Err(e) => {
            let reason = match e {
                CrmError::Unavailable { reason, .. } => reason,
                other => other.to_string(),
            };
            warn!(table, reason = reason.as_str(), "Disabling table");
            Section {
                table,
                store: build(Rc::new(UnavailableBackend::new(reason.clone()))),
                disabled: Some(reason),
            }
        },
    }
}

/// Stores that can create their table.
trait Initialize {
    fn init_table(&self) -> Result<()>;
}

impl Initialize for InteractionStore {
    fn init_table(&self) -> Result<()> {
        self.initialize()
    }
}

impl Initialize for TicketStore {
    fn init_table(&self) -> Result<()> {
        self.initialize()
    }
}
