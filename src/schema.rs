//! Table schema definitions
//!
//! This module provides constants for table and column names shared by the CSV and
//! SQLite backends. Column names double as the header row of each table, so their
//! order here is the storage order.

/// Date format for the interaction log timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";
/// Date format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Sentinel written over a follow-up date once it has been handled
pub const FOLLOW_UP_COMPLETED: &str = "Completed";

/// A logical table: its storage name and header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    /// Storage name (CSV file stem or SQLite table name)
    pub name: &'static str,
    /// Column names in storage order
    pub header: &'static [&'static str],
}

impl TableSpec {
    /// Position of `column` in the header.
    #[must_use]
    pub fn position(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|c| *c == column)
    }

    /// Header as owned strings.
    #[must_use]
    pub fn header_row(&self) -> Vec<String> {
        self.header.iter().map(ToString::to_string).collect()
    }
}

/// Customer interaction table schema
pub mod interactions {
    use super::TableSpec;

    /// Table name
    pub const TABLE: &str = "customer_log";
    /// Timestamp the row was logged
    pub const DATE: &str = "Date";
    /// Customer name, the natural key
    pub const CUSTOMER_NAME: &str = "Customer Name";
    /// Email or phone
    pub const CONTACT: &str = "Contact";
    /// New / Returning / VIP
    pub const CUSTOMER_TYPE: &str = "Customer Type";
    /// Company or organization
    pub const COMPANY: &str = "Company";
    /// Preferred contact channel
    pub const PREFERRED_CONTACT: &str = "Preferred Contact Method";
    /// Last interaction date
    pub const LAST_INTERACTION: &str = "Last Interaction Date";
    /// Follow-up date or the completed sentinel
    pub const FOLLOW_UP: &str = "Follow-up Reminder Date";
    /// Free text notes
    pub const NOTES: &str = "Interaction Notes";
    /// Visit counter
    pub const TOTAL_VISITS: &str = "Total Visits";

    /// Header in storage order
    pub const HEADER: [&str; 10] = [
        DATE,
        CUSTOMER_NAME,
        CONTACT,
        CUSTOMER_TYPE,
        COMPANY,
        PREFERRED_CONTACT,
        LAST_INTERACTION,
        FOLLOW_UP,
        NOTES,
        TOTAL_VISITS,
    ];

    /// Columns searched by free-text queries
    pub const SEARCH_COLUMNS: [&str; 3] = [CUSTOMER_NAME, CONTACT, COMPANY];

    /// Table spec
    pub const SPEC: TableSpec = TableSpec {
        name: TABLE,
        header: &HEADER,
    };
}

/// Ticket sales table schema
pub mod tickets {
    use super::TableSpec;

    /// Table name
    pub const TABLE: &str = "ticket_sales";
    /// Purchase date
    pub const DATE: &str = "Date";
    /// Buyer, "Anonymous" when not given
    pub const CUSTOMER_NAME: &str = "Customer Name";
    /// General / VIP / Student Discount
    pub const TICKET_TYPE: &str = "Ticket Type";
    /// Card / Cash at Door / Bank Deposit
    pub const PAYMENT_METHOD: &str = "Payment Method";
    /// Amount with two decimal places
    pub const AMOUNT_PAID: &str = "Amount Paid";
    /// Event the ticket was sold for
    pub const EVENT_NAME: &str = "Event Name";

    /// Header in storage order
    pub const HEADER: [&str; 6] = [DATE, CUSTOMER_NAME, TICKET_TYPE, PAYMENT_METHOD, AMOUNT_PAID, EVENT_NAME];

    /// Table spec
    pub const SPEC: TableSpec = TableSpec {
        name: TABLE,
        header: &HEADER,
    };
}
