use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
    Date,
}

impl ColumnType {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "BIGINT",
            ColumnType::Decimal => "NUMERIC",
            ColumnType::Date => "DATE",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Decimal => "decimal",
            ColumnType::Date => "date",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Date(NaiveDate),
}

impl Value {
    /// Numeric view used by the metric derivation; text never converts.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.normalize().to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Parses a decimal literal, accepting scientific notation as a fallback.
pub fn parse_decimal_literal(value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .ok()
        .or_else(|| Decimal::from_scientific(trimmed).ok())
}

pub fn parse_integer_literal(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

/// Picks the narrowest type every non-null sample satisfies.
pub fn infer_column_type<'a, I>(samples: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut all_integer = true;
    let mut all_decimal = true;
    let mut seen = false;
    for sample in samples {
        seen = true;
        if all_integer && parse_integer_literal(sample).is_none() {
            all_integer = false;
        }
        if all_decimal && parse_decimal_literal(sample).is_none() {
            all_decimal = false;
        }
        if !all_integer && !all_decimal {
            return ColumnType::Text;
        }
    }
    if !seen {
        ColumnType::Text
    } else if all_integer {
        ColumnType::Integer
    } else if all_decimal {
        ColumnType::Decimal
    } else {
        ColumnType::Text
    }
}

/// Converts raw text into a typed cell. Callers pass only text that already
/// satisfied [`infer_column_type`] for `ty`, so a failed parse falls back to text.
pub fn typed_value(raw: String, ty: ColumnType) -> Value {
    match ty {
        ColumnType::Integer => match parse_integer_literal(&raw) {
            Some(i) => Value::Integer(i),
            None => Value::Text(raw),
        },
        ColumnType::Decimal => match parse_decimal_literal(&raw) {
            Some(d) => Value::Decimal(d),
            None => Value::Text(raw),
        },
        ColumnType::Text | ColumnType::Date => Value::Text(raw),
    }
}
