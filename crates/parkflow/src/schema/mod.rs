//! Transaction record schema and normalizer.
//!
//! A [`RawRow`] holds the twelve trimmed text fields of one CSV line in the
//! fixed column order of the transaction export. [`normalize`] validates it
//! and produces a typed [`TransactionRecord`]; it has no side effects and any
//! failure is confined to the row.

mod amount;
mod timestamp;

pub use amount::parse_minor_units;
pub use timestamp::parse_timestamp;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{
    ColumnCountSnafu, InvalidAmountSnafu, InvalidIntegerSnafu, InvalidTimestampSnafu,
    MissingFieldSnafu, SchemaError,
};

/// Columns of the transaction export, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Source,
    DurationMinutes,
    StartTime,
    EndTime,
    Amount,
    KioskId,
    AppZoneId,
    AppZoneGroup,
    PaymentMethod,
    LocationGroup,
    LastUpdated,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::Id,
        Column::Source,
        Column::DurationMinutes,
        Column::StartTime,
        Column::EndTime,
        Column::Amount,
        Column::KioskId,
        Column::AppZoneId,
        Column::AppZoneGroup,
        Column::PaymentMethod,
        Column::LocationGroup,
        Column::LastUpdated,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Header name as it appears in the export.
    pub fn name(self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::Source => "Source",
            Column::DurationMinutes => "Duration in Minutes",
            Column::StartTime => "Start Time",
            Column::EndTime => "End Time",
            Column::Amount => "Amount",
            Column::KioskId => "Kiosk ID",
            Column::AppZoneId => "App Zone ID",
            Column::AppZoneGroup => "App Zone Group",
            Column::PaymentMethod => "Payment Method",
            Column::LocationGroup => "Location Group",
            Column::LastUpdated => "Last Updated",
        }
    }

    /// Whether an empty value rejects the row.
    pub fn is_required(self) -> bool {
        !matches!(
            self,
            Column::AppZoneId | Column::AppZoneGroup | Column::LocationGroup
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Check a header line against the expected column names.
pub fn header_matches(fields: &[String]) -> bool {
    fields.len() == Column::COUNT
        && fields
            .iter()
            .zip(Column::ALL)
            .all(|(field, column)| field.trim() == column.name())
}

/// The text fields of one input line, keyed by [`Column`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    fields: [String; Column::COUNT],
}

impl RawRow {
    /// Build a row from split fields.
    ///
    /// Fields are trimmed. Missing trailing fields become empty strings; more
    /// fields than columns is a [`SchemaError::ColumnCount`].
    pub fn from_fields(fields: Vec<String>) -> Result<Self, SchemaError> {
        let found = fields.len();
        if found > Column::COUNT {
            return ColumnCountSnafu {
                expected: Column::COUNT,
                found,
            }
            .fail();
        }

        let mut slots: [String; Column::COUNT] = Default::default();
        for (slot, field) in slots.iter_mut().zip(fields) {
            *slot = field.trim().to_string();
        }

        Ok(Self { fields: slots })
    }

    pub fn get(&self, column: Column) -> &str {
        &self.fields[column.index()]
    }

    fn required(&self, column: Column) -> Result<&str, SchemaError> {
        let value = self.get(column);
        if value.is_empty() {
            return MissingFieldSnafu {
                column: column.name(),
            }
            .fail();
        }
        Ok(value)
    }

    fn optional(&self, column: Column) -> Option<String> {
        let value = self.get(column);
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// A validated, typed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: i64,
    pub source: String,
    pub duration_minutes: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub amount_minor_units: i64,
    pub kiosk_id: String,
    pub app_zone_id: Option<String>,
    pub app_zone_group: Option<String>,
    pub payment_method: String,
    pub location_group: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// Validate and convert a raw row.
///
/// Every required column is checked for presence before any value is parsed,
/// so a row missing its ID reports the missing field rather than a parse error
/// in a later column.
pub fn normalize(row: &RawRow) -> Result<TransactionRecord, SchemaError> {
    for column in Column::ALL.into_iter().filter(|c| c.is_required()) {
        row.required(column)?;
    }

    let amount = row.required(Column::Amount)?;
    let amount_minor_units = parse_minor_units(amount).ok_or_else(|| {
        InvalidAmountSnafu {
            value: amount.to_string(),
        }
        .build()
    })?;

    Ok(TransactionRecord {
        id: parse_integer(row, Column::Id)?,
        source: row.required(Column::Source)?.to_string(),
        duration_minutes: parse_integer(row, Column::DurationMinutes)?,
        start_time: parse_time(row, Column::StartTime)?,
        end_time: parse_time(row, Column::EndTime)?,
        amount_minor_units,
        kiosk_id: row.required(Column::KioskId)?.to_string(),
        app_zone_id: row.optional(Column::AppZoneId),
        app_zone_group: row.optional(Column::AppZoneGroup),
        payment_method: row.required(Column::PaymentMethod)?.to_string(),
        location_group: row.optional(Column::LocationGroup),
        last_updated: parse_time(row, Column::LastUpdated)?,
    })
}

fn parse_integer<T: std::str::FromStr>(row: &RawRow, column: Column) -> Result<T, SchemaError> {
    let value = row.required(column)?;
    value.parse().map_err(|_| {
        InvalidIntegerSnafu {
            column: column.name(),
            value: value.to_string(),
        }
        .build()
    })
}

fn parse_time(row: &RawRow, column: Column) -> Result<DateTime<Utc>, SchemaError> {
    let value = row.required(column)?;
    parse_timestamp(value).ok_or_else(|| {
        InvalidTimestampSnafu {
            column: column.name(),
            value: value.to_string(),
        }
        .build()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn row(values: &[&str]) -> RawRow {
        RawRow::from_fields(values.iter().map(|v| v.to_string()).collect()).unwrap()
    }

    fn valid_fields() -> Vec<&'static str> {
        vec![
            "16224328",
            "Parking Meter",
            "60",
            "01/14/2017 12:57:28 PM",
            "01/14/2017 01:57:28 PM",
            "2.50",
            "PARD-11",
            "",
            "",
            "CREDIT CARD",
            "Zilker",
            "01/15/2017 09:00:00 AM",
        ]
    }

    #[test]
    fn test_normalize_valid_row() {
        let record = normalize(&row(&valid_fields())).unwrap();

        assert_eq!(record.id, 16_224_328);
        assert_eq!(record.source, "Parking Meter");
        assert_eq!(record.duration_minutes, 60);
        assert_eq!(record.amount_minor_units, 250);
        assert_eq!(record.kiosk_id, "PARD-11");
        assert_eq!(record.app_zone_id, None);
        assert_eq!(record.app_zone_group, None);
        assert_eq!(record.payment_method, "CREDIT CARD");
        assert_eq!(record.location_group.as_deref(), Some("Zilker"));
        assert_eq!(record.start_time.day(), 14);
        assert_eq!(record.last_updated.day(), 15);
    }

    #[test]
    fn test_fields_are_trimmed() {
        let mut fields = valid_fields();
        fields[0] = "  42 ";
        fields[7] = "  ";
        fields[8] = " Downtown ";
        let record = normalize(&row(&fields)).unwrap();

        assert_eq!(record.id, 42);
        assert_eq!(record.app_zone_id, None);
        assert_eq!(record.app_zone_group.as_deref(), Some("Downtown"));
    }

    #[test]
    fn test_missing_required_field() {
        let mut fields = valid_fields();
        fields[0] = "";
        assert_eq!(
            normalize(&row(&fields)),
            Err(SchemaError::MissingField { column: "ID" })
        );

        let mut fields = valid_fields();
        fields[9] = "";
        assert_eq!(
            normalize(&row(&fields)),
            Err(SchemaError::MissingField {
                column: "Payment Method"
            })
        );
    }

    #[test]
    fn test_missing_field_reported_before_parse_errors() {
        let mut fields = valid_fields();
        fields[2] = "sixty";
        fields[11] = "";
        assert_eq!(
            normalize(&row(&fields)),
            Err(SchemaError::MissingField {
                column: "Last Updated"
            })
        );
    }

    #[test]
    fn test_short_rows_pad_with_empty_fields() {
        let fields = &valid_fields()[..10];
        let raw = row(fields);
        assert_eq!(raw.get(Column::LocationGroup), "");
        assert_eq!(
            normalize(&raw),
            Err(SchemaError::MissingField {
                column: "Last Updated"
            })
        );
    }

    #[test]
    fn test_too_many_fields() {
        let mut fields: Vec<String> = valid_fields().iter().map(|s| s.to_string()).collect();
        fields.push("extra".to_string());
        assert_eq!(
            RawRow::from_fields(fields),
            Err(SchemaError::ColumnCount {
                expected: 12,
                found: 13
            })
        );
    }

    #[test]
    fn test_invalid_numbers() {
        let mut fields = valid_fields();
        fields[0] = "12.5";
        assert!(matches!(
            normalize(&row(&fields)),
            Err(SchemaError::InvalidInteger { column: "ID", .. })
        ));

        let mut fields = valid_fields();
        fields[2] = "99999999999";
        assert!(matches!(
            normalize(&row(&fields)),
            Err(SchemaError::InvalidInteger {
                column: "Duration in Minutes",
                ..
            })
        ));

        let mut fields = valid_fields();
        fields[5] = "abc";
        assert_eq!(
            normalize(&row(&fields)),
            Err(SchemaError::InvalidAmount {
                value: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_timestamp() {
        let mut fields = valid_fields();
        fields[4] = "not a date";
        assert!(matches!(
            normalize(&row(&fields)),
            Err(SchemaError::InvalidTimestamp {
                column: "End Time",
                ..
            })
        ));
    }

    #[test]
    fn test_amount_rounding_boundaries() {
        for (amount, expected) in [("19.995", 2000), ("2.005", 201), ("2.004", 200), ("0.125", 13)]
        {
            let mut fields = valid_fields();
            fields[5] = amount;
            let record = normalize(&row(&fields)).unwrap();
            assert_eq!(record.amount_minor_units, expected, "amount {amount}");
        }
    }

    #[test]
    fn test_header_matches() {
        let header: Vec<String> = Column::ALL.iter().map(|c| c.name().to_string()).collect();
        assert!(header_matches(&header));

        let mut renamed = header.clone();
        renamed[5] = "Price".to_string();
        assert!(!header_matches(&renamed));
    }
}
