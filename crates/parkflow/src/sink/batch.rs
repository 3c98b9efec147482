//! Columnar encoding of transaction records.

use std::sync::{Arc, LazyLock};

use arrow::array::{
    ArrayRef, Int32Builder, Int64Builder, RecordBatch, StringBuilder, TimestampMillisecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::error::ArrowError;

use crate::schema::TransactionRecord;

const UTC: &str = "UTC";

static SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    let timestamp = || DataType::Timestamp(TimeUnit::Millisecond, Some(UTC.into()));
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("durationMinutes", DataType::Int32, false),
        Field::new("startTime", timestamp(), false),
        Field::new("endTime", timestamp(), false),
        Field::new("amountMinorUnits", DataType::Int64, false),
        Field::new("kioskId", DataType::Utf8, false),
        Field::new("appZoneId", DataType::Utf8, true),
        Field::new("appZoneGroup", DataType::Utf8, true),
        Field::new("paymentMethod", DataType::Utf8, false),
        Field::new("locationGroup", DataType::Utf8, true),
        Field::new("lastUpdated", timestamp(), false),
    ]))
});

/// Arrow schema of every partition file.
pub fn transaction_schema() -> SchemaRef {
    SCHEMA.clone()
}

/// Accumulates records column by column until they are turned into a batch.
pub struct TransactionBatchBuilder {
    id: Int64Builder,
    source: StringBuilder,
    duration_minutes: Int32Builder,
    start_time: TimestampMillisecondBuilder,
    end_time: TimestampMillisecondBuilder,
    amount_minor_units: Int64Builder,
    kiosk_id: StringBuilder,
    app_zone_id: StringBuilder,
    app_zone_group: StringBuilder,
    payment_method: StringBuilder,
    location_group: StringBuilder,
    last_updated: TimestampMillisecondBuilder,
    len: usize,
}

impl TransactionBatchBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        let timestamps =
            || TimestampMillisecondBuilder::with_capacity(capacity).with_timezone(UTC);
        let strings = || StringBuilder::with_capacity(capacity, capacity * 16);
        Self {
            id: Int64Builder::with_capacity(capacity),
            source: strings(),
            duration_minutes: Int32Builder::with_capacity(capacity),
            start_time: timestamps(),
            end_time: timestamps(),
            amount_minor_units: Int64Builder::with_capacity(capacity),
            kiosk_id: strings(),
            app_zone_id: strings(),
            app_zone_group: strings(),
            payment_method: strings(),
            location_group: strings(),
            last_updated: timestamps(),
            len: 0,
        }
    }

    pub fn append(&mut self, record: &TransactionRecord) {
        self.id.append_value(record.id);
        self.source.append_value(&record.source);
        self.duration_minutes.append_value(record.duration_minutes);
        self.start_time
            .append_value(record.start_time.timestamp_millis());
        self.end_time.append_value(record.end_time.timestamp_millis());
        self.amount_minor_units
            .append_value(record.amount_minor_units);
        self.kiosk_id.append_value(&record.kiosk_id);
        self.app_zone_id.append_option(record.app_zone_id.as_deref());
        self.app_zone_group
            .append_option(record.app_zone_group.as_deref());
        self.payment_method.append_value(&record.payment_method);
        self.location_group
            .append_option(record.location_group.as_deref());
        self.last_updated
            .append_value(record.last_updated.timestamp_millis());
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drain the buffered rows into a record batch, leaving the builder empty.
    pub fn finish(&mut self) -> Result<RecordBatch, ArrowError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(self.id.finish()),
            Arc::new(self.source.finish()),
            Arc::new(self.duration_minutes.finish()),
            Arc::new(self.start_time.finish()),
            Arc::new(self.end_time.finish()),
            Arc::new(self.amount_minor_units.finish()),
            Arc::new(self.kiosk_id.finish()),
            Arc::new(self.app_zone_id.finish()),
            Arc::new(self.app_zone_group.finish()),
            Arc::new(self.payment_method.finish()),
            Arc::new(self.location_group.finish()),
            Arc::new(self.last_updated.finish()),
        ];
        self.len = 0;
        RecordBatch::try_new(transaction_schema(), columns)
    }
}
