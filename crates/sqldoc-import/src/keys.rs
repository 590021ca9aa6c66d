//! Document identifier derivation and time-series repeat expansion.
//!
//! A row yields one identifier (explicit id column, or `<table>:<ordinal>`)
//! unless a date field is configured, in which case it is exploded into
//! `repeat_count` time-shifted copies keyed `<base>_<i>`. A row whose date
//! field parses with neither supported format is skipped, not fatal.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};

use crate::config::ImportOptions;
use crate::error::{Error, Result};
use crate::value::{Document, Value};

/// Primary datetime format, e.g. `Jan 14, 2016 10:06:35 PM`.
pub const PRIMARY_DATE_FORMAT: &str = "%b %-d, %Y %I:%M:%S %p";

/// Fallback datetime format, e.g. `2016-03-15 19:04:29.0`.
pub const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S.0";

/// Parse a date-field value against the primary format, then the fallback.
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, PRIMARY_DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, FALLBACK_DATE_FORMAT))
        .ok()
}

/// Result of applying the key policy to one row.
#[derive(Debug)]
pub enum KeyOutcome {
    /// Documents to write, in emission order.
    Documents(Vec<(String, Document)>),
    /// Row skipped: the date field's value parsed with neither format.
    Skipped {
        /// The unparseable text, for the skip log.
        raw: String,
    },
}

/// Derives document identifiers and key-dependent field mutations.
#[derive(Debug, Clone)]
pub struct KeyPolicy {
    id_field: Option<String>,
    date_field: Option<String>,
    year_field: Option<String>,
    month_field: Option<String>,
    day_field: Option<String>,
    hour_field: Option<String>,
    repeat_count: u32,
    repeat_step: Duration,
    legacy_clock_fields: bool,
}

impl KeyPolicy {
    /// Build a policy from import options.
    #[must_use]
    pub fn from_options(options: &ImportOptions) -> Self {
        Self {
            id_field: options.id_field.clone(),
            date_field: options.date_field.clone(),
            year_field: options.year_field.clone(),
            month_field: options.month_field.clone(),
            day_field: options.day_field.clone(),
            hour_field: options.hour_field.clone(),
            repeat_count: options.repeat_count,
            repeat_step: Duration::milliseconds(options.repeat_step_millis),
            legacy_clock_fields: options.legacy_clock_fields,
        }
    }

    /// Base identifier for a row: the id column's string form when
    /// configured, otherwise `<table>:<ordinal>` (1-based, read order).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`] when the configured id column is missing
    /// or NULL on the document.
    pub fn base_identifier(&self, table: &str, ordinal: u64, doc: &Document) -> Result<String> {
        match &self.id_field {
            Some(field) => match doc.get(field) {
                Some(value) if !value.is_null() => Ok(value.to_text()),
                _ => Err(Error::Extraction(format!(
                    "id field '{field}' missing on row {ordinal} of table '{table}'"
                ))),
            },
            None => Ok(format!("{table}:{ordinal}")),
        }
    }

    /// Expand a row's document into the documents to write.
    ///
    /// With no date field configured this is exactly the input document under
    /// the base identifier. With a date field, the parsed instant is advanced
    /// by the step once per copy and the date (and any calendar component
    /// fields) are rewritten before each emission.
    #[must_use]
    pub fn expand(&self, base_id: &str, doc: Document) -> KeyOutcome {
        let Some(date_field) = &self.date_field else {
            return KeyOutcome::Documents(vec![(base_id.to_string(), doc)]);
        };

        let raw = doc.get(date_field).map(Value::to_text).unwrap_or_default();
        let Some(start) = parse_date(&raw) else {
            return KeyOutcome::Skipped { raw };
        };

        // Legacy importers stamped calendar fields from the wall clock rather
        // than the advanced instant; both behaviors are selectable.
        let clock = self
            .legacy_clock_fields
            .then(|| chrono::Local::now().naive_local());

        let mut documents = Vec::with_capacity(self.repeat_count as usize);
        let mut instant = start;
        for i in 0..self.repeat_count {
            instant += self.repeat_step;
            let mut copy = doc.clone();
            copy.insert(
                date_field.clone(),
                Value::DateTime(instant.format(PRIMARY_DATE_FORMAT).to_string()),
            );
            let components = clock.unwrap_or(instant);
            if let Some(field) = &self.year_field {
                copy.insert(field.clone(), Value::Integer(i64::from(components.year())));
            }
            if let Some(field) = &self.month_field {
                // Zero-based month index, matching the legacy output.
                copy.insert(field.clone(), Value::Integer(i64::from(components.month0())));
            }
            if let Some(field) = &self.day_field {
                copy.insert(field.clone(), Value::Integer(i64::from(components.day())));
            }
            if let Some(field) = &self.hour_field {
                copy.insert(field.clone(), Value::Integer(i64::from(components.hour())));
            }
            documents.push((format!("{base_id}_{i}"), copy));
        }
        KeyOutcome::Documents(documents)
    }

    /// Whether a date field is configured.
    #[must_use]
    pub fn expands(&self) -> bool {
        self.date_field.is_some()
    }
}
