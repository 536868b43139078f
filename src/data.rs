use std::fmt;

use chrono::NaiveDate;

use crate::dates::{display_raw, parse_due_date};
use crate::types::{CompanyName, RawDate};

/// One client row: company name plus the due date exactly as stored.
///
/// The date is kept raw so unparseable values survive a load/save cycle.
/// Validity is assessed through [`ClientRecord::due_date`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientRecord {
    /// Non-empty, trimmed company name.
    pub company: CompanyName,
    /// Due date as read (trimmed); may be empty or malformed.
    pub raw_due: RawDate,
}

impl ClientRecord {
    /// Build a record, trimming both fields.
    pub fn new(company: impl Into<CompanyName>, raw_due: impl Into<RawDate>) -> Self {
        Self {
            company: company.into().trim().to_string(),
            raw_due: raw_due.into().trim().to_string(),
        }
    }

    /// Parsed due date, or `None` when absent or malformed.
    pub fn due_date(&self) -> Option<NaiveDate> {
        parse_due_date(&self.raw_due)
    }

    /// Due date rendered as `DD/MM/YYYY`, or the raw value when unparseable.
    pub fn display_due(&self) -> String {
        display_raw(&self.raw_due)
    }
}

/// A dated record with its signed distance from "today".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedRecord {
    /// The source record.
    pub record: ClientRecord,
    /// Parsed due date (always present for classified records).
    pub due_date: NaiveDate,
    /// `due_date - today` in whole days; negative means overdue.
    pub days_until_due: i64,
}

impl ClassifiedRecord {
    /// True when the due date is before today.
    pub fn is_overdue(&self) -> bool {
        self.days_until_due < 0
    }
}

/// Visual urgency tier. Variants are declared from most to least urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DisplayBand {
    /// Due date already passed.
    Overdue,
    /// Due within 15 days, today included.
    DueWithin15,
    /// Due in 16 to 30 days.
    DueWithin30,
    /// Due more than 30 days out.
    FarFuture,
    /// Missing or unparseable date.
    Undated,
}

impl DisplayBand {
    /// Short label used by the table view.
    pub const fn label(self) -> &'static str {
        match self {
            DisplayBand::Overdue => "overdue",
            DisplayBand::DueWithin15 => "due<=15d",
            DisplayBand::DueWithin30 => "due<=30d",
            DisplayBand::FarFuture => "ok",
            DisplayBand::Undated => "-",
        }
    }
}

impl fmt::Display for DisplayBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the banded client table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayRow {
    /// The source record.
    pub record: ClientRecord,
    /// `None` for undated records.
    pub days_until_due: Option<i64>,
    /// Urgency tier.
    pub band: DisplayBand,
}
