//! Date-granularity bucketing for dimension values.

use chrono::{Datelike, NaiveDate};

use crate::model::DateGranularity;

use super::Value;

/// Parse the date prefix of a value: `YYYY-MM-DD` with or without a
/// trailing time component.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let s = match value {
        Value::Str(s) => s.trim(),
        _ => return None,
    };
    let prefix = s.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Bucket a date value into its granularity label.
///
/// `year` → `"2024"`; `quarter` → `"2024-Q2"`; `month` → `"2024-05"`;
/// `week` → `"2024-W19"` (calendar year with the ISO week number);
/// `day` → `"2024-05-07"`. Null and unparseable values pass through
/// unchanged, as does `raw`.
pub fn apply_granularity(value: &Value, granularity: DateGranularity) -> Value {
    if granularity == DateGranularity::Raw || value.is_null() {
        return value.clone();
    }
    let Some(date) = parse_date(value) else {
        return value.clone();
    };

    let label = match granularity {
        DateGranularity::Raw => unreachable!(),
        DateGranularity::Year => date.year().to_string(),
        DateGranularity::Quarter => {
            let quarter = date.month0() / 3 + 1;
            format!("{}-Q{}", date.year(), quarter)
        }
        DateGranularity::Month => format!("{}-{:02}", date.year(), date.month()),
        // Calendar year paired with the ISO week number, so the first days
        // of January can land in week 52/53 of the same calendar year
        DateGranularity::Week => format!("{}-W{:02}", date.year(), date.iso_week().week()),
        DateGranularity::Day => date.format("%Y-%m-%d").to_string(),
    };
    Value::Str(label)
}
