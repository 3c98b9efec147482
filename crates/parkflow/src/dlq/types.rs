//! DLQ types for rejected rows.
//!
//! Contains the record written for each rejected row and the per-reason
//! failure counts reported when a run ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// A row rejected by validation, as written to the DLQ file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRow {
    /// 1-based line number in the input, header included.
    pub line_number: u64,
    /// Why the row was rejected.
    pub error: String,
    /// The raw line text (lossily decoded if it was not valid UTF-8).
    pub line: String,
    /// When the rejection was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Rejected rows by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureStats {
    pub missing_field: u64,
    pub column_count: u64,
    pub invalid_integer: u64,
    pub invalid_amount: u64,
    pub invalid_timestamp: u64,
    pub invalid_encoding: u64,
}

impl FailureStats {
    /// Increment the count for the reason behind `error`.
    pub fn increment(&mut self, error: &SchemaError) {
        match error {
            SchemaError::MissingField { .. } => self.missing_field += 1,
            SchemaError::ColumnCount { .. } => self.column_count += 1,
            SchemaError::InvalidInteger { .. } => self.invalid_integer += 1,
            SchemaError::InvalidAmount { .. } => self.invalid_amount += 1,
            SchemaError::InvalidTimestamp { .. } => self.invalid_timestamp += 1,
            SchemaError::InvalidEncoding { .. } => self.invalid_encoding += 1,
        }
    }

    /// Get total failure count.
    pub fn total(&self) -> u64 {
        self.missing_field
            + self.column_count
            + self.invalid_integer
            + self.invalid_amount
            + self.invalid_timestamp
            + self.invalid_encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_stats_increment() {
        let mut stats = FailureStats::default();
        stats.increment(&SchemaError::MissingField { column: "ID" });
        stats.increment(&SchemaError::MissingField { column: "Source" });
        stats.increment(&SchemaError::InvalidAmount {
            value: "abc".to_string(),
        });

        assert_eq!(stats.missing_field, 2);
        assert_eq!(stats.invalid_amount, 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_rejected_row_serializes_camel_case() {
        let row = RejectedRow {
            line_number: 7,
            error: "Invalid amount: \"abc\"".to_string(),
            line: "1,x".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["lineNumber"], 7);
        assert_eq!(json["line"], "1,x");
        assert!(json.get("timestamp").is_some());
    }
}
