use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{CrmError, Result};
use crate::models::NewInteraction;

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]{1,64}@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

#[allow(clippy::expect_used)]
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-.]{5,}[0-9]$").expect("valid phone pattern"));

/// What a free-form contact field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// Looks like an email address
    Email,
    /// Looks like a phone number
    Phone,
    /// Neither
    Other,
}

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate customer name
    pub fn validate_customer_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(CrmError::Validation("Customer name cannot be empty".into()));
        }

        if name.chars().count() > 100 {
            return Err(CrmError::Validation("Customer name too long (max 100 characters)".into()));
        }

        // Names are the upsert key and a CSV cell; control characters break both
        if name.contains('\0') || name.contains('\r') || name.contains('\n') {
            return Err(CrmError::Validation("Customer name contains invalid characters".into()));
        }

        Ok(())
    }

    /// Classify a contact field.
    #[must_use]
    pub fn classify_contact(contact: &str) -> ContactKind {
        let contact = contact.trim();
        if EMAIL_RE.is_match(contact) {
            ContactKind::Email
        } else if PHONE_RE.is_match(contact) && digit_count(contact) >= 7 && digit_count(contact) <= 15 {
            ContactKind::Phone
        } else {
            ContactKind::Other
        }
    }

    /// Validate contact field. Blank is allowed. Values that are neither an email
    /// address nor a phone number are kept but logged.
    pub fn validate_contact(contact: &str) -> Result<()> {
        if contact.trim().is_empty() {
            return Ok(());
        }

        if contact.len() > 254 {
            return Err(CrmError::Validation("Contact too long (max 254 characters)".into()));
        }

        match Self::classify_contact(contact) {
            ContactKind::Email | ContactKind::Phone => Ok(()),
            ContactKind::Other => {
                tracing::warn!(contact, "Contact is neither an email address nor a phone number");
                Ok(())
            },
        }
    }

    /// Validate notes length
    pub fn validate_notes(notes: &str) -> Result<()> {
        if notes.chars().count() > 5000 {
            return Err(CrmError::Validation("Interaction notes too long (max 5000 characters)".into()));
        }
        Ok(())
    }

    /// Check interaction dates. Dates are stored as submitted; a future
    /// interaction or a follow-up before the interaction is only logged.
    pub fn validate_interaction_dates(last_interaction: NaiveDate, follow_up: Option<NaiveDate>) -> Result<()> {
        let today = chrono::Local::now().date_naive();
        if last_interaction > today {
            tracing::warn!(%last_interaction, %today, "Last interaction date is in the future");
        }

        if let Some(follow_up) = follow_up {
            if follow_up < last_interaction {
                tracing::warn!(%follow_up, %last_interaction, "Follow-up date is before the interaction");
            }
        }

        Ok(())
    }

    /// Validate a whole interaction submission.
    pub fn validate_interaction(candidate: &NewInteraction) -> Result<()> {
        Self::validate_customer_name(&candidate.customer_name)?;
        Self::validate_contact(&candidate.contact)?;
        Self::validate_notes(&candidate.notes)?;
        Self::validate_interaction_dates(candidate.last_interaction, candidate.follow_up.due_date())
    }

    /// Validate ticket amount
    pub fn validate_amount(amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(CrmError::Validation("Amount paid cannot be negative".into()));
        }

        if amount.scale() > 2 && amount.round_dp(2) != amount {
            return Err(CrmError::Validation("Amount paid has more than two decimal places".into()));
        }

        Ok(())
    }

    /// Validate event name
    pub fn validate_event_name(event_name: &str) -> Result<()> {
        if event_name.trim().is_empty() {
            return Err(CrmError::Validation("Event name cannot be empty".into()));
        }

        if event_name.chars().count() > 200 {
            return Err(CrmError::Validation("Event name too long (max 200 characters)".into()));
        }

        Ok(())
    }

    /// Validate file path
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.is_empty() {
            return Err(CrmError::Validation("File path cannot be empty".into()));
        }

        // Check for path traversal attempts
        if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(CrmError::Validation("File path must not contain '..'".into()));
        }

        if path_str.len() > 4096 {
            return Err(CrmError::Validation("File path too long (max 4096 characters)".into()));
        }

        Ok(())
    }
}

fn digit_count(value: &str) -> usize {
    value.chars().filter(char::is_ascii_digit).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_classification() {
        assert_eq!(InputValidator::classify_contact("ana@example.com"), ContactKind::Email);
        assert_eq!(InputValidator::classify_contact("+1 (780) 555-0199"), ContactKind::Phone);
        assert_eq!(InputValidator::classify_contact("call me"), ContactKind::Other);
        assert_eq!(InputValidator::classify_contact("123"), ContactKind::Other);
    }
}
