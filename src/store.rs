//! Record stores for the interaction log and ticket sales.
//!
//! Both stores sit on a [`TableBackend`] and follow the same cycle for every
//! write: read the full table, decide, then write either a new row or a targeted
//! patch. Nothing is cached between calls.
//!
//! The upsert is a read-then-write with no lock or version check. Two writers
//! logging the same customer at the same time can both read the same visit count
//! and one increment is lost. The process is single-operator and synchronous, so
//! this is accepted rather than guarded.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::TableBackend;
use crate::error::{CrmError, Result};
use crate::logging::OperationTimer;
use crate::metrics;
use crate::models::{InteractionRecord, NewInteraction, TicketSaleRecord};
use crate::schema::{interactions, tickets, TableSpec, FOLLOW_UP_COMPLETED};
use crate::table::Table;

/// What to do with the submitted fields when the customer already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertPolicy {
    /// Bump the visit count and keep every stored field.
    #[default]
    IncrementOnly,
    /// Bump the visit count and overwrite the stored fields with the submission,
    /// keeping the original timestamp and name.
    MergeIncoming,
}

impl UpsertPolicy {
    /// Config spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IncrementOnly => "increment_only",
            Self::MergeIncoming => "merge_incoming",
        }
    }
}

impl fmt::Display for UpsertPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpsertPolicy {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "increment_only" | "increment" => Ok(Self::IncrementOnly),
            "merge_incoming" | "merge" => Ok(Self::MergeIncoming),
            other => Err(CrmError::InvalidConfig(format!(
                "Unknown upsert policy: {other}. Must be one of: increment_only, merge_incoming"
            ))),
        }
    }
}

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row had this customer name; a new row was appended.
    Inserted,
    /// An existing row was updated.
    Incremented {
        /// Visit count after the update
        total_visits: u32,
    },
}

/// Current local time at minute precision, matching the stored timestamp format.
#[must_use]
pub fn now_to_minute() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now)
}

/// Backend plus table, with timing and metrics around each call.
struct TableStore {
    backend: Rc<dyn TableBackend>,
    spec: TableSpec,
}

impl TableStore {
    fn observe<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&dyn TableBackend, &TableSpec) -> Result<T>,
    {
        let timer = OperationTimer::new(&format!("{}.{operation}", self.spec.name));
        let result = f(self.backend.as_ref(), &self.spec);
        let duration = timer.finish();
        metrics::record_store_operation(self.spec.name, operation, duration, result.is_ok());
        result
    }

    fn initialize(&self) -> Result<()> {
        let created = self.observe("initialize", |backend, spec| backend.ensure_table(spec))?;
        if created {
            info!(table = self.spec.name, backend = self.backend.kind(), "Initialized empty table");
        } else {
            debug!(table = self.spec.name, "Table already present");
        }
        Ok(())
    }

    fn load_snapshot(&self) -> Table {
        match self.observe("load", |backend, spec| backend.read_table(spec)) {
            Ok(table) => {
                metrics::record_rows_loaded(self.spec.name, table.len());
                table
            },
            Err(e) => {
                warn!(table = self.spec.name, error = %e, "Read failed, serving an empty snapshot");
                metrics::record_degraded_read(self.spec.name);
                Table::empty(&self.spec)
            },
        }
    }

    fn decode_all<R>(&self, decode: impl Fn(&crate::table::RowView<'_>) -> Result<R>) -> Vec<R> {
        let table = self.load_snapshot();
        table
            .iter()
            .filter_map(|row| match decode(&row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(table = self.spec.name, row = row.index(), error = %e, "Skipping undecodable row");
                    None
                },
            })
            .collect()
    }
}

/// The customer interaction log, keyed by customer name.
pub struct InteractionStore {
    inner: TableStore,
    policy: UpsertPolicy,
}

impl InteractionStore {
    /// Store over `backend` using `policy` for repeat customers.
    pub fn new(backend: Rc<dyn TableBackend>, policy: UpsertPolicy) -> Self {
        Self {
            inner: TableStore {
                backend,
                spec: interactions::SPEC,
            },
            policy,
        }
    }

    /// Policy applied to repeat customers.
    #[must_use]
    pub const fn policy(&self) -> UpsertPolicy {
        self.policy
    }

    /// Create the table if it does not exist. Safe on every start.
    pub fn initialize(&self) -> Result<()> {
        self.inner.initialize()
    }

    /// Every stored row, unfiltered. A failed read yields an empty table.
    pub fn load_snapshot(&self) -> Table {
        self.inner.load_snapshot()
    }

    /// Every decodable record in storage order. A failed read yields nothing.
    pub fn load_all(&self) -> Vec<InteractionRecord> {
        self.inner.decode_all(InteractionRecord::from_row)
    }

    /// Log an interaction now. See [`Self::upsert_interaction_at`].
    pub fn upsert_interaction(&self, candidate: &NewInteraction) -> Result<UpsertOutcome> {
        self.upsert_interaction_at(candidate, now_to_minute())
    }

    /// Log an interaction, stamping a new row with `logged_at`.
    ///
    /// An exact, case-sensitive name match bumps that row's visit count (and
    /// merges the submission under [`UpsertPolicy::MergeIncoming`]). Otherwise a
    /// new row is appended with one visit. A failed read is returned as an error,
    /// never treated as an empty table.
    pub fn upsert_interaction_at(&self, candidate: &NewInteraction, logged_at: NaiveDateTime) -> Result<UpsertOutcome> {
        let policy = self.policy;
        self.inner.observe("upsert", |backend, spec| {
            let table = backend.read_table(spec)?;
            let name = candidate.customer_name.as_str();

            let Some((index, existing)) = table
                .find_row(interactions::CUSTOMER_NAME, name)
                .and_then(|i| table.row(i).map(|row| (i, row)))
            else {
                let record = candidate.clone().into_record(logged_at);
                backend.append_row(spec, &record.to_row())?;
                info!(customer = name, "Logged new customer");
                return Ok(UpsertOutcome::Inserted);
            };

            let current = existing
                .get(interactions::TOTAL_VISITS)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or_else(|| {
                    warn!(customer = name, row = index, "Stored visit count unreadable, counting from zero");
                    0
                });
            let total_visits = current.saturating_add(1);

            match policy {
                UpsertPolicy::IncrementOnly => {
                    backend.update_cell(spec, index, interactions::TOTAL_VISITS, &total_visits.to_string())?;
                },
                UpsertPolicy::MergeIncoming => {
                    let mut record = InteractionRecord::from_row(&existing).unwrap_or_else(|e| {
                        warn!(customer = name, row = index, error = %e, "Stored row undecodable, merging over the submission");
                        candidate.clone().into_record(logged_at)
                    });
                    candidate.merge_into(&mut record);
                    record.total_visits = total_visits;

                    // Date and name stay exactly as stored.
                    let mut merged = record.to_row();
                    for column in [interactions::DATE, interactions::CUSTOMER_NAME] {
                        if let (Some(pos), Some(stored)) = (spec.position(column), existing.get(column)) {
                            merged[pos] = stored.to_string();
                        }
                    }
                    backend.update_row(spec, index, &merged)?;
                },
            }

            info!(customer = name, total_visits, policy = %policy, "Recorded repeat visit");
            Ok(UpsertOutcome::Incremented { total_visits })
        })
    }

    /// Overwrite the customer's follow-up date with the completed sentinel.
    ///
    /// Returns `false`, without writing, when no row has this name.
    pub fn mark_follow_up_completed(&self, customer_name: &str) -> Result<bool> {
        self.inner.observe("mark_completed", |backend, spec| {
            let table = backend.read_table(spec)?;
            let Some(index) = table.find_row(interactions::CUSTOMER_NAME, customer_name) else {
                debug!(customer = customer_name, "No row to mark completed");
                return Ok(false);
            };
            backend.update_cell(spec, index, interactions::FOLLOW_UP, FOLLOW_UP_COMPLETED)?;
            info!(customer = customer_name, "Marked follow-up completed");
            Ok(true)
        })
    }
}

/// The append-only ticket sales table.
pub struct TicketStore {
    inner: TableStore,
}

impl TicketStore {
    /// Store over `backend`.
    pub fn new(backend: Rc<dyn TableBackend>) -> Self {
        Self {
            inner: TableStore {
                backend,
                spec: tickets::SPEC,
            },
        }
    }

    /// Create the table if it does not exist. Safe on every start.
    pub fn initialize(&self) -> Result<()> {
        self.inner.initialize()
    }

    /// Every stored row, unfiltered. A failed read yields an empty table.
    pub fn load_snapshot(&self) -> Table {
        self.inner.load_snapshot()
    }

    /// Every decodable sale in storage order. A failed read yields nothing.
    pub fn load_all(&self) -> Vec<TicketSaleRecord> {
        self.inner.decode_all(TicketSaleRecord::from_row)
    }

    /// Append a sale. No key, no deduplication.
    pub fn append_ticket_sale(&self, record: &TicketSaleRecord) -> Result<()> {
        self.inner.observe("append", |backend, spec| backend.append_row(spec, &record.to_row()))?;
        info!(
            event = record.event_name.as_str(),
            ticket_type = %record.ticket_type,
            amount = %record.amount_paid,
            "Recorded ticket sale"
        );
        Ok(())
    }
}
