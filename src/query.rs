//! Query helpers over loaded snapshots.
//!
//! Everything here is a pure function of a [`Table`] (or decoded records): no
//! store access, no side effects. Missing columns never panic. Filters treat a
//! missing cell as empty, sorting by a missing column keeps the order, and the
//! follow-up view of a table without the follow-up column is empty.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{parse_date, CustomerType, TicketSaleRecord};
use crate::schema::interactions;
use crate::table::Table;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// Rows where the customer name, contact or company contains `query`,
/// ignoring case. A blank query keeps every row.
#[must_use]
pub fn search(table: &Table, query: &str) -> Table {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return table.clone();
    }
    table.filter_rows(|row| {
        interactions::SEARCH_COLUMNS
            .iter()
            .any(|column| row.get_or_empty(column).to_lowercase().contains(&needle))
    })
}

/// Rows whose customer type is one of `types`. An empty set keeps every row.
#[must_use]
pub fn filter_by_customer_type(table: &Table, types: &[CustomerType]) -> Table {
    if types.is_empty() {
        return table.clone();
    }
    table.filter_rows(|row| {
        row.get(interactions::CUSTOMER_TYPE)
            .and_then(|value| CustomerType::from_str(value).ok())
            .is_some_and(|t| types.contains(&t))
    })
}

/// Compare two cells by their natural ordering.
///
/// Cells that parse as numbers sort before all other cells and compare
/// numerically among themselves. Everything else compares as text, which is
/// chronological for `YYYY-MM-DD` and `YYYY-MM-DD HH:MM` values.
#[must_use]
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    match (Decimal::from_str(a.trim()), Decimal::from_str(b.trim())) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map_or("", String::as_str)
}

/// Stable sort by `column`. Ties keep their storage order in both directions.
/// An unknown column returns the table unchanged.
#[must_use]
pub fn sort_by_column(table: &Table, column: &str, order: SortOrder) -> Table {
    let Some(col) = table.column_index(column) else {
        return table.clone();
    };

    let mut rows = table.rows().to_vec();
    rows.sort_by(|a, b| {
        let ordering = compare_cells(cell(a, col), cell(b, col));
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
    table.with_rows(rows)
}

/// Rows with a follow-up date on or after `today`.
///
/// Only cells that parse as `YYYY-MM-DD` qualify, so completed follow-ups never
/// appear.
#[must_use]
pub fn upcoming_follow_ups(table: &Table, today: NaiveDate) -> Table {
    if !table.has_column(interactions::FOLLOW_UP) {
        return table.with_rows(Vec::new());
    }
    table.filter_rows(|row| {
        row.get(interactions::FOLLOW_UP)
            .and_then(|value| parse_date(value).ok())
            .is_some_and(|due| due >= today)
    })
}

/// A combined search, type filter and sort, applied in that order.
#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    /// Free-text search over name, contact and company
    pub search: Option<String>,
    /// Customer types to keep; empty keeps all
    pub customer_types: Vec<CustomerType>,
    /// Column to sort by
    pub sort_by: Option<String>,
    /// Sort direction
    pub order: SortOrder,
}

impl ViewQuery {
    /// Derive the displayed view from a snapshot.
    #[must_use]
    pub fn apply(&self, table: &Table) -> Table {
        let mut view = match &self.search {
            Some(query) => search(table, query),
            None => table.clone(),
        };
        view = filter_by_customer_type(&view, &self.customer_types);
        if let Some(column) = &self.sort_by {
            view = sort_by_column(&view, column, self.order);
        }
        view
    }
}

/// Sales totals for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTotals {
    /// Event name
    pub event_name: String,
    /// Tickets sold
    pub tickets: usize,
    /// Sum of amounts paid
    pub revenue: Decimal,
}

/// Sales totals per event and overall.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketSummary {
    /// Per-event totals, sorted by event name
    pub events: Vec<EventTotals>,
    /// Tickets sold across all events
    pub total_tickets: usize,
    /// Revenue across all events
    pub total_revenue: Decimal,
}

/// Count and sum ticket sales per event.
#[must_use]
pub fn ticket_summary(sales: &[TicketSaleRecord]) -> TicketSummary {
    let mut by_event: BTreeMap<&str, (usize, Decimal)> = BTreeMap::new();
    for sale in sales {
        let entry = by_event.entry(sale.event_name.as_str()).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += sale.amount_paid;
    }

    let events: Vec<EventTotals> = by_event
        .into_iter()
        .map(|(event_name, (tickets, revenue))| EventTotals {
            event_name: event_name.to_string(),
            tickets,
            revenue,
        })
        .collect();

    TicketSummary {
        total_tickets: sales.len(),
        total_revenue: events.iter().map(|e| e.revenue).sum(),
        events,
    }
}
