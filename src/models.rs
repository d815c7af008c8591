//! Data models for customer interactions and ticket sales
//!
//! This module contains the typed records stored in the two tables, the choice
//! enums used by their columns, and the row mapping between records and the
//! string cells the backends persist.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};
use crate::schema::{interactions, tickets, DATE_FORMAT, FOLLOW_UP_COMPLETED, TIMESTAMP_FORMAT};
use crate::table::RowView;

/// Buyer name written when a ticket sale has none
pub const ANONYMOUS_CUSTOMER: &str = "Anonymous";

// Lowercase and drop separators so "Phone Call", "phone-call" and "phone_call" agree.
fn normalize_label(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Declares a closed set of choices with a stored label per variant.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $label)] $variant),+
        }

        impl $name {
            /// Every variant in display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Label as stored in the table.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CrmError;

            fn from_str(s: &str) -> Result<Self> {
                let wanted = normalize_label(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| normalize_label(v.as_str()) == wanted)
                    .ok_or_else(|| CrmError::Validation(format!("Unknown {}: {s}", $what)))
            }
        }
    };
}

labelled_enum! {
    /// Customer relationship tier
    CustomerType, "customer type" {
        /// First contact
        New => "New",
        /// Seen before
        Returning => "Returning",
        /// Priority customer
        Vip => "VIP",
    }
}

labelled_enum! {
    /// How the customer prefers to be reached
    ContactMethod, "contact method" {
        /// Email
        Email => "Email",
        /// Phone call
        PhoneCall => "Phone Call",
        /// WhatsApp message
        WhatsApp => "WhatsApp",
        /// Face to face
        InPerson => "In-Person",
    }
}

labelled_enum! {
    /// Ticket category
    TicketType, "ticket type" {
        /// Standard admission
        General => "General",
        /// VIP admission
        Vip => "VIP",
        /// Discounted student admission
        StudentDiscount => "Student Discount",
    }
}

labelled_enum! {
    /// How a ticket was paid for
    PaymentMethod, "payment method" {
        /// Card payment
        Card => "Card",
        /// Cash paid at the door
        CashAtDoor => "Cash at Door",
        /// Bank transfer
        BankDeposit => "Bank Deposit",
    }
}

/// Follow-up reminder: a due date, or the completed sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FollowUp {
    /// Follow up on this date
    Due(NaiveDate),
    /// Already handled
    Completed,
}

impl FollowUp {
    /// Due date, if still pending.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Due(date) => Some(*date),
            Self::Completed => None,
        }
    }
}

impl fmt::Display for FollowUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Due(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            Self::Completed => f.write_str(FOLLOW_UP_COMPLETED),
        }
    }
}

impl FromStr for FollowUp {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == FOLLOW_UP_COMPLETED {
            return Ok(Self::Completed);
        }
        parse_date(s).map(Self::Due)
    }
}

impl TryFrom<String> for FollowUp {
    type Error = CrmError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FollowUp> for String {
    fn from(value: FollowUp) -> Self {
        value.to_string()
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| CrmError::InvalidDate(format!("{value}: {e}")))
}

/// Parse a `YYYY-MM-DD HH:MM` timestamp.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| CrmError::InvalidDate(format!("{value}: {e}")))
}

/// A stored customer interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// When the row was first logged
    pub logged_at: NaiveDateTime,
    /// Customer name, unique within the table
    pub customer_name: String,
    /// Email or phone as entered
    pub contact: String,
    /// Relationship tier
    pub customer_type: CustomerType,
    /// Company or organization
    pub company: Option<String>,
    /// Preferred contact channel
    pub preferred_contact: ContactMethod,
    /// Date of the last interaction
    pub last_interaction: NaiveDate,
    /// Follow-up reminder
    pub follow_up: FollowUp,
    /// Free text notes
    pub notes: String,
    /// Number of times this customer was logged, at least 1
    pub total_visits: u32,
}

impl InteractionRecord {
    /// Cells in storage order.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.logged_at.format(TIMESTAMP_FORMAT).to_string(),
            self.customer_name.clone(),
            self.contact.clone(),
            self.customer_type.to_string(),
            self.company.clone().unwrap_or_default(),
            self.preferred_contact.to_string(),
            self.last_interaction.format(DATE_FORMAT).to_string(),
            self.follow_up.to_string(),
            self.notes.clone(),
            self.total_visits.to_string(),
        ]
    }

    /// Map a stored row into a record.
    pub fn from_row(row: &RowView<'_>) -> Result<Self> {
        let field = |column: &str| {
            row.get(column)
                .ok_or_else(|| CrmError::invalid_record(interactions::TABLE, format!("missing column '{column}'")))
        };

        let customer_name = field(interactions::CUSTOMER_NAME)?.to_string();
        if customer_name.trim().is_empty() {
            return Err(CrmError::invalid_record(interactions::TABLE, "blank customer name"));
        }

        let total_visits = parse_visits(field(interactions::TOTAL_VISITS)?)?;
        let company = field(interactions::COMPANY)?;

        Ok(Self {
            logged_at: parse_timestamp(field(interactions::DATE)?)?,
            customer_name,
            contact: field(interactions::CONTACT)?.to_string(),
            customer_type: field(interactions::CUSTOMER_TYPE)?.parse()?,
            company: (!company.trim().is_empty()).then(|| company.to_string()),
            preferred_contact: field(interactions::PREFERRED_CONTACT)?.parse()?,
            last_interaction: parse_date(field(interactions::LAST_INTERACTION)?)?,
            follow_up: field(interactions::FOLLOW_UP)?.parse()?,
            notes: field(interactions::NOTES)?.to_string(),
            total_visits,
        })
    }
}

/// Parse a stored visit counter, enforcing the lower bound of 1.
pub fn parse_visits(value: &str) -> Result<u32> {
    let visits: u32 = value
        .trim()
        .parse()
        .map_err(|_| CrmError::invalid_record(interactions::TABLE, format!("total visits '{value}' is not a number")))?;
    if visits == 0 {
        return Err(CrmError::invalid_record(interactions::TABLE, "total visits must be at least 1"));
    }
    Ok(visits)
}

/// A submitted interaction, before the store assigns the timestamp and visit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInteraction {
    /// Customer name, the upsert key
    pub customer_name: String,
    /// Email or phone
    pub contact: String,
    /// Relationship tier
    pub customer_type: CustomerType,
    /// Company or organization
    pub company: Option<String>,
    /// Preferred contact channel
    pub preferred_contact: ContactMethod,
    /// Date of the interaction
    pub last_interaction: NaiveDate,
    /// Follow-up reminder
    pub follow_up: FollowUp,
    /// Free text notes
    pub notes: String,
}

impl NewInteraction {
    /// Turn into a first-visit record logged at `logged_at`.
    #[must_use]
    pub fn into_record(self, logged_at: NaiveDateTime) -> InteractionRecord {
        InteractionRecord {
            logged_at,
            customer_name: self.customer_name,
            contact: self.contact,
            customer_type: self.customer_type,
            company: self.company.filter(|c| !c.trim().is_empty()),
            preferred_contact: self.preferred_contact,
            last_interaction: self.last_interaction,
            follow_up: self.follow_up,
            notes: self.notes,
            total_visits: 1,
        }
    }

    /// Overwrite the mutable fields of `existing` with this submission,
    /// keeping its timestamp, name and visit count.
    pub fn merge_into(&self, existing: &mut InteractionRecord) {
        existing.contact.clone_from(&self.contact);
        existing.customer_type = self.customer_type;
        existing.company = self.company.clone().filter(|c| !c.trim().is_empty());
        existing.preferred_contact = self.preferred_contact;
        existing.last_interaction = self.last_interaction;
        existing.follow_up = self.follow_up;
        existing.notes.clone_from(&self.notes);
    }
}

/// A ticket sale. Append-only, no key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSaleRecord {
    /// Purchase date
    pub date: NaiveDate,
    /// Buyer
    pub customer_name: String,
    /// Ticket category
    pub ticket_type: TicketType,
    /// Payment channel
    pub payment_method: PaymentMethod,
    /// Amount paid, never negative
    pub amount_paid: Decimal,
    /// Event name
    pub event_name: String,
}

impl TicketSaleRecord {
    /// Build a sale, substituting "Anonymous" for a blank buyer and rejecting a
    /// negative amount.
    pub fn new(
        date: NaiveDate,
        customer_name: &str,
        ticket_type: TicketType,
        payment_method: PaymentMethod,
        amount_paid: Decimal,
        event_name: &str,
    ) -> Result<Self> {
        if amount_paid.is_sign_negative() && !amount_paid.is_zero() {
            return Err(CrmError::Validation(format!("Amount paid cannot be negative: {amount_paid}")));
        }
        let customer_name = customer_name.trim();
        Ok(Self {
            date,
            customer_name: if customer_name.is_empty() {
                ANONYMOUS_CUSTOMER.to_string()
            } else {
                customer_name.to_string()
            },
            ticket_type,
            payment_method,
            amount_paid,
            event_name: event_name.trim().to_string(),
        })
    }

    /// Cells in storage order. The amount is written with two decimals.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.format(DATE_FORMAT).to_string(),
            self.customer_name.clone(),
            self.ticket_type.to_string(),
            self.payment_method.to_string(),
            format!("{:.2}", self.amount_paid.round_dp(2)),
            self.event_name.clone(),
        ]
    }

    /// Map a stored row into a record.
    pub fn from_row(row: &RowView<'_>) -> Result<Self> {
        let field = |column: &str| {
            row.get(column)
                .ok_or_else(|| CrmError::invalid_record(tickets::TABLE, format!("missing column '{column}'")))
        };

        let raw_amount = field(tickets::AMOUNT_PAID)?;
        let amount_paid = Decimal::from_str(raw_amount.trim())
            .map_err(|e| CrmError::invalid_record(tickets::TABLE, format!("amount '{raw_amount}': {e}")))?;

        Self::new(
            parse_date(field(tickets::DATE)?)?,
            field(tickets::CUSTOMER_NAME)?,
            field(tickets::TICKET_TYPE)?.parse()?,
            field(tickets::PAYMENT_METHOD)?.parse()?,
            amount_paid,
            field(tickets::EVENT_NAME)?,
        )
    }
}
