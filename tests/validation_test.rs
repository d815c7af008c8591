//! Unit tests for validation.rs module

use chrono::{Duration, Local};
use rust_decimal::Decimal;
use std::path::Path;

use crm_logger::models::{ContactMethod, CustomerType, FollowUp};
use crm_logger::validation::{ContactKind, InputValidator};
use crm_logger::NewInteraction;

#[test]
fn test_validate_customer_name_valid() {
    assert!(InputValidator::validate_customer_name("Ana Souza").is_ok());
}

#[test]
fn test_validate_customer_name_whitespace_only() {
    assert!(InputValidator::validate_customer_name("   ").is_err());
}

#[test]
fn test_validate_customer_name_exactly_100_chars() {
    let name = "a".repeat(100);
    assert!(InputValidator::validate_customer_name(&name).is_ok());
}

#[test]
fn test_validate_customer_name_too_long() {
    let name = "a".repeat(101);
    assert!(InputValidator::validate_customer_name(&name).is_err());
}

#[test]
fn test_validate_customer_name_with_newline() {
    assert!(InputValidator::validate_customer_name("Ana\nSouza").is_err());
}

#[test]
fn test_validate_customer_name_unicode() {
    assert!(InputValidator::validate_customer_name("José García").is_ok());
}

#[test]
fn test_validate_contact_accepts_blank_email_and_phone() {
    assert!(InputValidator::validate_contact("").is_ok());
    assert!(InputValidator::validate_contact("ana@example.com").is_ok());
    assert!(InputValidator::validate_contact("+44 20 1234 5678").is_ok());
}

#[test]
fn test_validate_contact_keeps_free_text() {
    assert!(InputValidator::validate_contact("ask at the bar").is_ok());
    assert_eq!(InputValidator::classify_contact("ask at the bar"), ContactKind::Other);
}

#[test]
fn test_validate_contact_too_long() {
    let contact = format!("{}@example.com", "a".repeat(250));
    assert!(InputValidator::validate_contact(&contact).is_err());
}

#[test]
fn test_validate_notes_limit() {
    assert!(InputValidator::validate_notes(&"n".repeat(5000)).is_ok());
    assert!(InputValidator::validate_notes(&"n".repeat(5001)).is_err());
}

#[test]
fn test_validate_interaction_dates_future_last_interaction_is_allowed() {
    let next_month = Local::now().date_naive() + Duration::days(30);
    assert!(InputValidator::validate_interaction_dates(next_month, None).is_ok());
}

#[test]
fn test_validate_interaction_dates_follow_up_before_interaction_is_allowed() {
    let today = Local::now().date_naive();
    let earlier = today - Duration::days(3);
    assert!(InputValidator::validate_interaction_dates(today, Some(earlier)).is_ok());
}

#[test]
fn test_validate_interaction_completed_follow_up() {
    let candidate = NewInteraction {
        customer_name: "Ana".to_string(),
        contact: String::new(),
        customer_type: CustomerType::Returning,
        company: None,
        preferred_contact: ContactMethod::PhoneCall,
        last_interaction: Local::now().date_naive(),
        follow_up: FollowUp::Completed,
        notes: String::new(),
    };
    assert!(InputValidator::validate_interaction(&candidate).is_ok());
}

#[test]
fn test_validate_amount() {
    assert!(InputValidator::validate_amount(Decimal::ZERO).is_ok());
    assert!(InputValidator::validate_amount(Decimal::new(1999, 2)).is_ok());
    assert!(InputValidator::validate_amount(Decimal::new(-1, 0)).is_err());
    assert!(InputValidator::validate_amount(Decimal::new(10_005, 3)).is_err());
}

#[test]
fn test_validate_event_name() {
    assert!(InputValidator::validate_event_name("Hamlet").is_ok());
    assert!(InputValidator::validate_event_name("").is_err());
    assert!(InputValidator::validate_event_name(&"e".repeat(201)).is_err());
}

#[test]
fn test_validate_file_path_valid() {
    assert!(InputValidator::validate_file_path(Path::new("output/customer_log.csv")).is_ok());
}

#[test]
fn test_validate_file_path_traversal() {
    assert!(InputValidator::validate_file_path(Path::new("output/../../etc/passwd")).is_err());
}

#[test]
fn test_validate_file_path_empty() {
    assert!(InputValidator::validate_file_path(Path::new("")).is_err());
}
