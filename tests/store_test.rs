mod common;

use std::rc::Rc;

use mockall::mock;
use mockall::predicate::always;
use rust_decimal::Decimal;
use tempfile::tempdir;

use common::{at, backends, date, interaction};
use crm_logger::backend::TableBackend;
use crm_logger::models::{CustomerType, FollowUp, PaymentMethod, TicketType};
use crm_logger::schema::{interactions, TableSpec};
use crm_logger::{CrmError, InteractionStore, Table, TicketSaleRecord, TicketStore, UpsertOutcome, UpsertPolicy};

mock! {
    pub Backend {}

    impl TableBackend for Backend {
        fn kind(&self) -> &'static str;
        fn ensure_table(&self, spec: &TableSpec) -> crm_logger::Result<bool>;
        fn read_table(&self, spec: &TableSpec) -> crm_logger::Result<Table>;
        fn append_row(&self, spec: &TableSpec, row: &[String]) -> crm_logger::Result<()>;
        fn update_cell(&self, spec: &TableSpec, row_index: usize, column: &str, value: &str) -> crm_logger::Result<()>;
        fn update_row(&self, spec: &TableSpec, row_index: usize, row: &[String]) -> crm_logger::Result<()>;
    }
}

fn offline() -> CrmError {
    CrmError::Io(std::io::Error::new(std::io::ErrorKind::NotConnected, "offline"))
}

#[test]
fn test_repeated_upsert_counts_visits() {
    let dir = tempdir().expect("Failed to create temp directory");
    for (kind, backend) in backends(dir.path()) {
        let store = InteractionStore::new(backend, UpsertPolicy::IncrementOnly);
        store.initialize().unwrap();

        let mut last = None;
        for _ in 0..4 {
            last = Some(store.upsert_interaction(&interaction("Ana")).unwrap());
        }
        assert_eq!(last, Some(UpsertOutcome::Incremented { total_visits: 4 }), "{kind}");

        let records = store.load_all();
        let ana: Vec<_> = records.iter().filter(|r| r.customer_name == "Ana").collect();
        assert_eq!(ana.len(), 1, "{kind}");
        assert_eq!(ana[0].total_visits, 4, "{kind}");
    }
}

#[test]
fn test_new_name_is_appended_verbatim() {
    let dir = tempdir().expect("Failed to create temp directory");
    for (kind, backend) in backends(dir.path()) {
        let store = InteractionStore::new(backend, UpsertPolicy::IncrementOnly);
        store.initialize().unwrap();
        store.upsert_interaction_at(&interaction("Ana"), at("2024-01-10 09:15")).unwrap();

        let outcome = store
            .upsert_interaction_at(&interaction("Bo"), at("2024-01-11 17:40"))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted, "{kind}");

        let records = store.load_all();
        assert_eq!(records.len(), 2, "{kind}");
        let bo = &records[1];
        assert_eq!(bo.customer_name, "Bo");
        assert_eq!(bo.contact, "bo@example.com");
        assert_eq!(bo.company.as_deref(), Some("Teatro Norte"));
        assert_eq!(bo.follow_up, FollowUp::Due(date("2024-02-01")));
        assert_eq!(bo.notes, "asked about season tickets");
        assert_eq!(bo.total_visits, 1);
        assert_eq!(bo.logged_at, at("2024-01-11 17:40"));
    }
}

#[test]
fn test_name_match_is_case_sensitive() {
    let dir = tempdir().expect("Failed to create temp directory");
    for (kind, backend) in backends(dir.path()) {
        let store = InteractionStore::new(backend, UpsertPolicy::IncrementOnly);
        store.initialize().unwrap();
        store.upsert_interaction(&interaction("Ana")).unwrap();
        let outcome = store.upsert_interaction(&interaction("ana")).unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted, "{kind}");
        assert_eq!(store.load_all().len(), 2, "{kind}");
    }
}

#[test]
fn test_increment_only_keeps_stored_fields() {
    let dir = tempdir().expect("Failed to create temp directory");
    for (kind, backend) in backends(dir.path()) {
        let store = InteractionStore::new(backend, UpsertPolicy::IncrementOnly);
        store.initialize().unwrap();
        store.upsert_interaction_at(&interaction("Ana"), at("2024-01-10 09:15")).unwrap();

        let mut again = interaction("Ana");
        again.contact = "+15551234567".to_string();
        again.notes = "second visit".to_string();
        store.upsert_interaction_at(&again, at("2024-03-01 12:00")).unwrap();

        let ana = &store.load_all()[0];
        assert_eq!(ana.contact, "ana@example.com", "{kind}");
        assert_eq!(ana.notes, "asked about season tickets", "{kind}");
        assert_eq!(ana.logged_at, at("2024-01-10 09:15"), "{kind}");
        assert_eq!(ana.total_visits, 2, "{kind}");
    }
}

#[test]
fn test_merge_incoming_overwrites_submitted_fields() {
    let dir = tempdir().expect("Failed to create temp directory");
    for (kind, backend) in backends(dir.path()) {
        let store = InteractionStore::new(backend, UpsertPolicy::MergeIncoming);
        store.initialize().unwrap();
        store.upsert_interaction_at(&interaction("Ana"), at("2024-01-10 09:15")).unwrap();

        let mut again = interaction("Ana");
        again.customer_type = CustomerType::Vip;
        again.company = None;
        again.notes = "bought a season pass".to_string();
        store.upsert_interaction_at(&again, at("2024-03-01 12:00")).unwrap();

        let ana = &store.load_all()[0];
        assert_eq!(ana.customer_type, CustomerType::Vip, "{kind}");
        assert_eq!(ana.company, None, "{kind}");
        assert_eq!(ana.notes, "bought a season pass", "{kind}");
        assert_eq!(ana.logged_at, at("2024-01-10 09:15"), "{kind}");
        assert_eq!(ana.total_visits, 2, "{kind}");
    }
}

#[test]
fn test_empty_table_loads_empty_after_initialize() {
    let dir = tempdir().expect("Failed to create temp directory");
    for (kind, backend) in backends(dir.path()) {
        let store = InteractionStore::new(Rc::clone(&backend), UpsertPolicy::default());
        store.initialize().unwrap();
        store.initialize().unwrap();
        assert!(store.load_all().is_empty(), "{kind}");

        let snapshot = store.load_snapshot();
        assert!(snapshot.is_empty(), "{kind}");
        assert_eq!(snapshot.header(), interactions::SPEC.header_row().as_slice(), "{kind}");

        let tickets = TicketStore::new(backend);
        tickets.initialize().unwrap();
        assert!(tickets.load_all().is_empty(), "{kind}");
    }
}

#[test]
fn test_initialize_never_rewrites_existing_rows() {
    let dir = tempdir().expect("Failed to create temp directory");
    for (kind, backend) in backends(dir.path()) {
        let store = InteractionStore::new(backend, UpsertPolicy::default());
        store.initialize().unwrap();
        store.upsert_interaction(&interaction("Ana")).unwrap();
        store.initialize().unwrap();
        assert_eq!(store.load_all().len(), 1, "{kind}");
    }
}

#[test]
fn test_mark_follow_up_completed() {
    let dir = tempdir().expect("Failed to create temp directory");
    for (kind, backend) in backends(dir.path()) {
        let store = InteractionStore::new(backend, UpsertPolicy::default());
        store.initialize().unwrap();
        store.upsert_interaction(&interaction("Ana")).unwrap();
        store.upsert_interaction(&interaction("Bo")).unwrap();

        assert!(store.mark_follow_up_completed("Bo").unwrap(), "{kind}");
        assert!(!store.mark_follow_up_completed("Zed").unwrap(), "{kind}");

        let records = store.load_all();
        assert_eq!(records[0].follow_up, FollowUp::Due(date("2024-02-01")), "{kind}");
        assert_eq!(records[1].follow_up, FollowUp::Completed, "{kind}");
        assert_eq!(
            store.load_snapshot().row(1).unwrap().get(interactions::FOLLOW_UP),
            Some("Completed"),
            "{kind}"
        );
    }
}

#[test]
fn test_ticket_sales_are_append_only() {
    let dir = tempdir().expect("Failed to create temp directory");
    for (kind, backend) in backends(dir.path()) {
        let store = TicketStore::new(backend);
        store.initialize().unwrap();
        let sale = TicketSaleRecord::new(
            date("2024-05-01"),
            "",
            TicketType::StudentDiscount,
            PaymentMethod::CashAtDoor,
            Decimal::new(750, 2),
            "Hamlet",
        )
        .unwrap();
        store.append_ticket_sale(&sale).unwrap();
        store.append_ticket_sale(&sale).unwrap();

        let sales = store.load_all();
        assert_eq!(sales.len(), 2, "{kind}");
        assert_eq!(sales[0], sale, "{kind}");
        assert_eq!(sales[0].customer_name, "Anonymous", "{kind}");
        assert_eq!(
            store.load_snapshot().row(0).unwrap().get("Amount Paid"),
            Some("7.50"),
            "{kind}"
        );
    }
}

#[test]
fn test_load_degrades_to_empty_on_read_failure() {
    let mut backend = MockBackend::new();
    backend.expect_read_table().returning(|_| Err(offline()));
    let store = InteractionStore::new(Rc::new(backend), UpsertPolicy::default());

    assert!(store.load_all().is_empty());
    let snapshot = store.load_snapshot();
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.header().len(), interactions::HEADER.len());
}

#[test]
fn test_upsert_propagates_read_failure_without_writing() {
    let mut backend = MockBackend::new();
    backend.expect_read_table().times(1).returning(|_| Err(offline()));
    backend.expect_append_row().never();
    backend.expect_update_cell().never();
    let store = InteractionStore::new(Rc::new(backend), UpsertPolicy::default());

    let err = store.upsert_interaction(&interaction("Ana")).unwrap_err();
    assert!(matches!(err, CrmError::Io(_)));
}

#[test]
fn test_increment_issues_single_cell_patch() {
    let mut backend = MockBackend::new();
    backend.expect_read_table().returning(|spec| {
        let mut row = vec![String::new(); spec.header.len()];
        row[1] = "Ana".to_string();
        row[9] = "2".to_string();
        Ok(Table::from_parts(spec.header_row(), vec![row]))
    });
    backend
        .expect_update_cell()
        .with(always(), mockall::predicate::eq(0_usize), mockall::predicate::eq("Total Visits"), mockall::predicate::eq("3"))
        .times(1)
        .returning(|_, _, _, _| Ok(()));
    backend.expect_append_row().never();
    backend.expect_update_row().never();

    let store = InteractionStore::new(Rc::new(backend), UpsertPolicy::IncrementOnly);
    let outcome = store.upsert_interaction(&interaction("Ana")).unwrap();
    assert_eq!(outcome, UpsertOutcome::Incremented { total_visits: 3 });
}

#[test]
fn test_malformed_rows_are_skipped_not_fatal() {
    let mut backend = MockBackend::new();
    backend.expect_read_table().returning(|spec| {
        let good = vec![
            "2024-01-10 09:15".to_string(),
            "Ana".to_string(),
            "ana@example.com".to_string(),
            "New".to_string(),
            String::new(),
            "Email".to_string(),
            "2024-01-10".to_string(),
            "2024-02-01".to_string(),
            String::new(),
            "1".to_string(),
        ];
        let short = vec!["2024-01-11 10:00".to_string(), "Bo".to_string()];
        Ok(Table::from_parts(spec.header_row(), vec![good, short]))
    });
    let store = InteractionStore::new(Rc::new(backend), UpsertPolicy::default());

    let records = store.load_all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].customer_name, "Ana");
    assert_eq!(store.load_snapshot().len(), 2);
}

#[test]
fn test_merge_over_undecodable_row_keeps_stored_date_and_name() {
    let mut backend = MockBackend::new();
    backend.expect_read_table().returning(|spec| {
        let mut row = vec![String::new(); spec.header.len()];
        row[0] = "2023-12-01 08:00".to_string();
        row[1] = "Ana".to_string();
        row[3] = "Gold".to_string();
        row[9] = "n/a".to_string();
        Ok(Table::from_parts(spec.header_row(), vec![row]))
    });
    backend
        .expect_update_row()
        .withf(|_, index, row: &[String]| {
            *index == 0
                && row[0] == "2023-12-01 08:00"
                && row[1] == "Ana"
                && row[2] == "ana@example.com"
                && row[3] == "New"
                && row[7] == "2024-02-01"
                && row[9] == "1"
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    backend.expect_append_row().never();
    backend.expect_update_cell().never();

    let store = InteractionStore::new(Rc::new(backend), UpsertPolicy::MergeIncoming);
    let outcome = store
        .upsert_interaction_at(&interaction("Ana"), at("2024-03-01 12:00"))
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Incremented { total_visits: 1 });
}
