//! SQL value types for schema-agnostic row transfer.
//!
//! Rows are ordered sequences of [`SqlValue`]s, positionally matching the
//! column catalog. The engine never inspects individual values; it only
//! carries them from the source cursor into the target insert payload.

use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

/// A single row in catalog column order.
pub type Row = Vec<SqlValue>;

/// Which side of the transfer a SQL literal is rendered for.
///
/// Byte strings are the one point where the two disagree: MySQL has no
/// `\xHH` string escape (the backslash is dropped and the hex digits
/// survive as plain text), so the source side gets a `0x<hex>` literal,
/// while ClickHouse accepts `\xHH` inside a quoted string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralForm {
    /// Source-side literals: key-window predicates against MySQL.
    Mysql,

    /// Target-side literals: the bulk VALUES payload for ClickHouse.
    ClickHouse,
}

/// Owned SQL value enum covering the MySQL types the dialect decodes.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,

    /// Boolean value (MySQL `bit`/`boolean`).
    Bool(bool),

    /// Signed integer (tinyint through bigint).
    Int(i64),

    /// Unsigned integer (the `unsigned` column variants).
    UInt(u64),

    /// 32-bit floating point.
    Float(f32),

    /// 64-bit floating point.
    Double(f64),

    /// Decimal value with arbitrary precision.
    Decimal(Decimal),

    /// Text data (char, varchar, text, enum, set, json).
    Text(String),

    /// Binary data (binary, varbinary, blob).
    Bytes(Vec<u8>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Render this value as a SQL literal for `form` into `out`.
    ///
    /// Quoted strings (with `\`/`'` escaped) and `YYYY-MM-DD HH:MM:SS`
    /// timestamps are accepted by both MySQL and ClickHouse; only byte
    /// strings render differently per [`LiteralForm`].
    pub fn write_sql_literal(&self, out: &mut String, form: LiteralForm) {
        match self {
            SqlValue::Null => out.push_str("NULL"),
            SqlValue::Bool(v) => out.push_str(if *v { "1" } else { "0" }),
            SqlValue::Int(v) => {
                let _ = write!(out, "{}", v);
            }
            SqlValue::UInt(v) => {
                let _ = write!(out, "{}", v);
            }
            SqlValue::Float(v) => write_float(out, f64::from(*v)),
            SqlValue::Double(v) => write_float(out, *v),
            SqlValue::Decimal(v) => {
                let _ = write!(out, "{}", v);
            }
            SqlValue::Text(s) => write_quoted(out, s),
            SqlValue::Bytes(b) => write_bytes(out, b, form),
            SqlValue::Date(d) => {
                let _ = write!(out, "'{}'", d.format("%Y-%m-%d"));
            }
            SqlValue::Time(t) => {
                let _ = write!(out, "'{}'", t.format("%H:%M:%S"));
            }
            SqlValue::DateTime(dt) => {
                let _ = write!(out, "'{}'", dt.format("%Y-%m-%d %H:%M:%S"));
            }
        }
    }

    /// Render this value as a SQL literal string for `form`.
    #[must_use]
    pub fn to_sql_literal(&self, form: LiteralForm) -> String {
        let mut out = String::new();
        self.write_sql_literal(&mut out, form);
        out
    }
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

fn write_float(out: &mut String, v: f64) {
    // NaN/inf have no portable literal form; they land as NULL.
    if v.is_finite() {
        let _ = write!(out, "{}", v);
    } else {
        out.push_str("NULL");
    }
}

fn write_bytes(out: &mut String, bytes: &[u8], form: LiteralForm) {
    if bytes.is_empty() {
        out.push_str("''");
        return;
    }
    match form {
        LiteralForm::Mysql => {
            out.push_str("0x");
            for byte in bytes {
                let _ = write!(out, "{:02X}", byte);
            }
        }
        LiteralForm::ClickHouse => {
            out.push('\'');
            for byte in bytes {
                let _ = write!(out, "\\x{:02X}", byte);
            }
            out.push('\'');
        }
    }
}

/// Render a row as a parenthesized tuple of SQL literals for `form`.
pub fn write_row_tuple(out: &mut String, row: &[SqlValue], form: LiteralForm) {
    out.push('(');
    for (i, value) in row.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        value.write_sql_literal(out, form);
    }
    out.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(value: &SqlValue) -> String {
        value.to_sql_literal(LiteralForm::ClickHouse)
    }

    #[test]
    fn test_null_and_numbers() {
        assert_eq!(ch(&SqlValue::Null), "NULL");
        assert_eq!(ch(&SqlValue::Int(-42)), "-42");
        assert_eq!(ch(&SqlValue::UInt(42)), "42");
        assert_eq!(ch(&SqlValue::Bool(true)), "1");
        assert_eq!(ch(&SqlValue::Double(1.5)), "1.5");
        // Numbers render identically on the source side
        assert_eq!(SqlValue::Int(-42).to_sql_literal(LiteralForm::Mysql), "-42");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(ch(&SqlValue::Text("it's".to_string())), r"'it\'s'");
        assert_eq!(ch(&SqlValue::Text("a\\b".to_string())), r"'a\\b'");
        assert_eq!(ch(&SqlValue::Text("line\nbreak".to_string())), r"'line\nbreak'");
    }

    #[test]
    fn test_temporal_literals() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(ch(&SqlValue::Date(d)), "'2024-03-01'");

        let dt = d.and_hms_opt(13, 5, 9).unwrap();
        assert_eq!(ch(&SqlValue::DateTime(dt)), "'2024-03-01 13:05:09'");
    }

    #[test]
    fn test_bytes_mysql_hex_literal() {
        // MySQL drops the backslash in '\xDE', so bytes go out as 0x<hex>
        assert_eq!(
            SqlValue::Bytes(vec![0xDE, 0xAD]).to_sql_literal(LiteralForm::Mysql),
            "0xDEAD"
        );
    }

    #[test]
    fn test_bytes_clickhouse_escaped_string() {
        assert_eq!(
            SqlValue::Bytes(vec![0xDE, 0xAD]).to_sql_literal(LiteralForm::ClickHouse),
            r"'\xDE\xAD'"
        );
    }

    #[test]
    fn test_empty_bytes() {
        assert_eq!(
            SqlValue::Bytes(Vec::new()).to_sql_literal(LiteralForm::Mysql),
            "''"
        );
        assert_eq!(
            SqlValue::Bytes(Vec::new()).to_sql_literal(LiteralForm::ClickHouse),
            "''"
        );
    }

    #[test]
    fn test_nonfinite_float_is_null() {
        assert_eq!(ch(&SqlValue::Double(f64::NAN)), "NULL");
        assert_eq!(ch(&SqlValue::Float(f32::INFINITY)), "NULL");
    }

    #[test]
    fn test_row_tuple() {
        let mut out = String::new();
        write_row_tuple(
            &mut out,
            &[SqlValue::Int(1), SqlValue::Text("a".to_string())],
            LiteralForm::ClickHouse,
        );
        assert_eq!(out, "(1, 'a')");
    }
}
