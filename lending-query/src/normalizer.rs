//! Reshapes indexing API results into a list of flat records.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};

use crate::errors::NormalizeError;

/// A single result entity, field name to value.
pub type Record = Map<String, Value>;

/// The only field rewritten by [`normalize`].
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// UTC date-time format replacing epoch seconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Turns a query result into a list of records, rewriting `timestamp` fields from epoch
/// seconds into [`TIMESTAMP_FORMAT`] strings.
///
/// A `null` result means the query matched nothing and is reported as
/// [`NormalizeError::EmptyResult`].
pub fn normalize(result: Value) -> Result<Vec<Record>, NormalizeError> {
    let mut records = ensure_enumerable(result)?;
    for record in &mut records {
        for (field, value) in record.iter_mut() {
            if field == TIMESTAMP_FIELD {
                *value = Value::String(format_timestamp(value)?);
            }
        }
    }
    Ok(records)
}

/// Wraps a single record into a one-element list.
pub fn ensure_enumerable(result: Value) -> Result<Vec<Record>, NormalizeError> {
    match result {
        Value::Null => Err(NormalizeError::EmptyResult),
        Value::Object(record) => Ok(vec![record]),
        Value::Array(entries) => entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::Object(record) => Ok(record),
                _ => Err(NormalizeError::NotARecord { index }),
            })
            .collect(),
        _ => Err(NormalizeError::NotARecord { index: 0 }),
    }
}

/// Formats epoch seconds, given as an integer or a decimal string, as a UTC date-time.
pub fn format_timestamp(value: &Value) -> Result<String, NormalizeError> {
    let invalid = || NormalizeError::InvalidTimestamp(value.clone());
    let seconds = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(invalid)?;

    let datetime = DateTime::from_timestamp(seconds, 0).ok_or_else(invalid)?;
    Ok(datetime.format(TIMESTAMP_FORMAT).to_string())
}

/// Parses a [`TIMESTAMP_FORMAT`] string back into epoch seconds.
pub fn parse_timestamp(formatted: &str) -> Result<i64, NormalizeError> {
    let datetime = NaiveDateTime::parse_from_str(formatted, TIMESTAMP_FORMAT)?;
    Ok(datetime.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn single_record_becomes_a_list() {
        //* When
        let records = normalize(json!({ "foo": 1 })).expect("normalization failed");

        //* Then
        assert_eq!(
            serde_json::to_value(records).expect("serialization failed"),
            json!([{ "foo": 1 }])
        );
    }

    #[test]
    fn timestamp_fields_are_formatted() {
        //* Given
        let result = json!([
            { "id": "0x01", "timestamp": "1680307200", "totalValueLockedUSD": "1234.5" },
            { "id": "0x02", "timestamp": 1680393600, "blockNumber": "1680393600" },
        ]);

        //* When
        let records = normalize(result).expect("normalization failed");

        //* Then
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["timestamp"], "2023-04-01 00:00:00");
        assert_eq!(records[0]["totalValueLockedUSD"], "1234.5");
        assert_eq!(records[1]["timestamp"], "2023-04-02 00:00:00");
        // Only fields literally named `timestamp` are rewritten.
        assert_eq!(records[1]["blockNumber"], "1680393600");
    }

    #[test]
    fn nested_timestamps_are_left_alone() {
        //* Given
        let result = json!({ "market": { "timestamp": "0" }, "timestamp": "0" });

        //* When
        let records = normalize(result).expect("normalization failed");

        //* Then
        assert_eq!(records[0]["timestamp"], "1970-01-01 00:00:00");
        assert_eq!(records[0]["market"], json!({ "timestamp": "0" }));
    }

    #[test]
    fn formatted_timestamp_round_trips() {
        for seconds in [0_i64, 1, 59, 86_399, 951_782_400, 1_680_307_200, 4_102_444_799, -86_400] {
            //* When
            let formatted = format_timestamp(&json!(seconds)).expect("invalid timestamp");

            //* Then
            assert_eq!(parse_timestamp(&formatted).ok(), Some(seconds), "{formatted}");
        }
    }

    #[test]
    fn leap_day_is_formatted_in_utc() {
        assert_eq!(
            format_timestamp(&json!("951782400")).ok().as_deref(),
            Some("2000-02-29 00:00:00")
        );
    }

    #[test]
    fn empty_result_is_an_error() {
        assert_matches!(normalize(Value::Null), Err(NormalizeError::EmptyResult));
    }

    #[test]
    fn empty_list_is_not_an_error() {
        assert_matches!(normalize(json!([])), Ok(records) if records.is_empty());
    }

    #[test]
    fn non_record_entries_are_rejected() {
        assert_matches!(
            normalize(json!([{ "id": "0x01" }, 42])),
            Err(NormalizeError::NotARecord { index: 1 })
        );
        assert_matches!(
            normalize(json!("scalar")),
            Err(NormalizeError::NotARecord { index: 0 })
        );
    }

    #[test]
    fn invalid_timestamps_are_rejected() {
        for value in [json!("yesterday"), json!("1.5"), json!(true), json!(null), json!(i64::MAX)] {
            //* When
            let result = normalize(json!({ "timestamp": value.clone() }));

            //* Then
            assert_matches!(result, Err(NormalizeError::InvalidTimestamp(v)) => assert_eq!(v, value));
        }
    }

    #[test]
    fn unparsable_date_time_is_rejected() {
        assert_matches!(
            parse_timestamp("2023-04-01T00:00:00Z"),
            Err(NormalizeError::InvalidDateTime(_))
        );
    }
}
