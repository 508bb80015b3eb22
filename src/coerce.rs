//! Retypes the order date column from text to a calendar date.
//!
//! Dates are naive (no timezone) and must match [`ORDER_DATE_FORMAT`]
//! exactly. Nulls stay null; any other value that fails to parse stops the
//! run with the offending value in the error.

use chrono::NaiveDate;
use log::info;

use crate::{
    data::{ColumnType, Value},
    error::{EtlError, Result},
    records::RecordTable,
};

pub const ORDER_DATE: &str = "order_date";
pub const ORDER_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_order_date(column: &str, row: usize, raw: &str) -> Result<NaiveDate> {
    let invalid = || EtlError::DateParse {
        column: column.to_string(),
        row,
        value: raw.to_string(),
        format: ORDER_DATE_FORMAT,
    };
    if !has_iso_date_shape(raw) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(raw, ORDER_DATE_FORMAT).map_err(|_| invalid())
}

/// `YYYY-MM-DD` with zero-padded fields. chrono alone also accepts leading
/// whitespace, a signed year, and unpadded month or day.
fn has_iso_date_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(idx, b)| match idx {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

pub fn coerce_order_date(table: RecordTable) -> Result<RecordTable> {
    coerce_date_column(table, ORDER_DATE)
}

pub fn coerce_date_column(table: RecordTable, column: &str) -> Result<RecordTable> {
    let table = table.map_column(column, ColumnType::Date, |row_idx, cell| {
        let row = row_idx + 1;
        match cell {
            None => Ok(None),
            Some(Value::Date(date)) => Ok(Some(Value::Date(date))),
            Some(Value::Text(raw)) => {
                parse_order_date(column, row, &raw).map(|date| Some(Value::Date(date)))
            }
            Some(other) => Err(EtlError::DateParse {
                column: column.to_string(),
                row,
                value: other.as_display(),
                format: ORDER_DATE_FORMAT,
            }),
        }
    })?;
    info!("Parsed '{column}' as {ORDER_DATE_FORMAT} dates");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ColumnMeta;

    fn dates(values: &[Option<&str>]) -> RecordTable {
        RecordTable::new(
            vec![ColumnMeta::new(ORDER_DATE, ColumnType::Text)],
            values
                .iter()
                .map(|v| vec![v.map(|s| Value::Text(s.to_string()))])
                .collect(),
        )
    }

    #[test]
    fn parses_iso_dates_and_keeps_nulls() {
        let table = coerce_order_date(dates(&[Some("2021-03-05"), None])).unwrap();
        assert_eq!(table.columns()[0].datatype, ColumnType::Date);
        assert_eq!(
            table.rows()[0][0],
            Some(Value::Date(NaiveDate::from_ymd_opt(2021, 3, 5).unwrap()))
        );
        assert_eq!(table.rows()[1][0], None);
    }

    #[test]
    fn accepts_leap_day() {
        let date = parse_order_date(ORDER_DATE, 1, "2024-02-29").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn rejects_impossible_day() {
        let err = parse_order_date(ORDER_DATE, 1, "2023-02-29").unwrap_err();
        assert!(matches!(err, EtlError::DateParse { .. }));
    }

    #[test]
    fn rejects_other_formats_naming_the_value() {
        let err =
            coerce_order_date(dates(&[Some("2021-03-05"), Some("05/03/2021")])).unwrap_err();
        match err {
            EtlError::DateParse { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "05/03/2021");
            }
            other => panic!("expected date parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_loose_shapes_chrono_would_accept() {
        for raw in [" 2021-03-05", "+2021-03-05", "2021-3-5", "2021-03-5", "2021/03/05"] {
            let err = parse_order_date(ORDER_DATE, 3, raw).unwrap_err();
            assert!(
                matches!(err, EtlError::DateParse { ref value, row: 3, .. } if value == raw),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_trailing_time_component() {
        assert!(parse_order_date(ORDER_DATE, 1, "2021-03-05 10:00:00").is_err());
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let table = RecordTable::new(
            vec![ColumnMeta::new("ship_mode", ColumnType::Text)],
            Vec::new(),
        );
        assert!(matches!(
            coerce_order_date(table),
            Err(EtlError::MissingColumn(_))
        ));
    }
}
