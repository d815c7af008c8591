//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};
use crm_logger::backend::{CsvBackend, SqliteBackend, TableBackend};
use crm_logger::models::{parse_timestamp, ContactMethod, CustomerType, FollowUp};
use crm_logger::NewInteraction;

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("test date")
}

pub fn at(value: &str) -> NaiveDateTime {
    parse_timestamp(value).expect("test timestamp")
}

pub fn interaction(name: &str) -> NewInteraction {
    NewInteraction {
        customer_name: name.to_string(),
        contact: format!("{}@example.com", name.to_lowercase()),
        customer_type: CustomerType::New,
        company: Some("Teatro Norte".to_string()),
        preferred_contact: ContactMethod::Email,
        last_interaction: date("2024-01-10"),
        follow_up: FollowUp::Due(date("2024-02-01")),
        notes: "asked about season tickets".to_string(),
    }
}

/// One CSV and one SQLite backend rooted in `dir`.
pub fn backends(dir: &Path) -> Vec<(&'static str, Rc<dyn TableBackend>)> {
    let csv: Rc<dyn TableBackend> = Rc::new(CsvBackend::new(dir.join("csv")));
    let sqlite: Rc<dyn TableBackend> =
        Rc::new(SqliteBackend::open(&dir.join("sqlite").join("crm.db")).expect("open sqlite"));
    vec![("csv", csv), ("sqlite", sqlite)]
}
