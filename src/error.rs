// Error types for the reservation engine and its inventory loader

use crate::car::Period;
use chrono::{DateTime, Utc};
use thiserror::Error;

// Failures returned by engine operations at request time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReservationError {
    #[error("No car of type '{car_type}' available for {period}")]
    NoAvailability { car_type: String, period: Period },

    #[error("Unknown car type: {0}")]
    UnknownCarType(String),

    #[error("Invalid period: start {start} is not before end {end}")]
    InvalidPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

// Failures while reading the inventory file; any of these aborts startup
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed inventory record: {0}")]
    Csv(#[from] csv::Error),

    #[error("Line {line}: expected 6 fields, found {found}")]
    FieldCount { line: u64, found: usize },

    #[error("Line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("Line {line}: car type '{name}' is declared twice")]
    DuplicateCarType { line: u64, name: String },

    #[error("Inventory contains no car types")]
    Empty,
}
