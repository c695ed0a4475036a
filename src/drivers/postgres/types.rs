//! PostgreSQL value conversion.
//!
//! Every cell leaves the driver as text. Tables written by this crate only
//! hold `VARCHAR` columns, but tables created by other tools may not, so the
//! common scalar types are rendered as well.

use rust_decimal::Decimal;
use sqlx::postgres::{PgRow, PgSslMode};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::traits::SslMode;

/// Converter for PostgreSQL values to text cells.
pub struct PgValueConverter;

impl PgValueConverter {
    /// Convert a PostgreSQL row to a result row. SQL NULL becomes `None`.
    pub fn convert_row(pg_row: &PgRow) -> Vec<Option<String>> {
        (0..pg_row.columns().len())
            .map(|idx| Self::extract_text(pg_row, idx))
            .collect()
    }

    fn extract_text(row: &PgRow, index: usize) -> Option<String> {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return None,
            Err(_) => return None,
            _ => {}
        }

        let type_name = row.columns()[index].type_info().name().to_string();
        Self::decode_by_type(row, index, &type_name)
    }

    /// Decode a value based on its PostgreSQL type name.
    fn decode_by_type(row: &PgRow, index: usize, type_name: &str) -> Option<String> {
        match type_name {
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row.try_get::<String, _>(index).ok(),

            "BOOL" => row.try_get::<bool, _>(index).ok().map(|v| v.to_string()),

            "INT2" => row.try_get::<i16, _>(index).ok().map(|v| v.to_string()),
            "INT4" => row.try_get::<i32, _>(index).ok().map(|v| v.to_string()),
            "INT8" => row.try_get::<i64, _>(index).ok().map(|v| v.to_string()),

            "FLOAT4" => row.try_get::<f32, _>(index).ok().map(|v| v.to_string()),
            "FLOAT8" => row.try_get::<f64, _>(index).ok().map(|v| v.to_string()),

            "NUMERIC" => row.try_get::<Decimal, _>(index).ok().map(|v| v.to_string()),

            _ => Self::decode_as_string_fallback(row, index),
        }
    }

    /// Unknown types: whatever decodes first, as text.
    fn decode_as_string_fallback(row: &PgRow, index: usize) -> Option<String> {
        if let Ok(s) = row.try_get_unchecked::<String, _>(index) {
            return Some(s);
        }
        if let Ok(v) = row.try_get::<i64, _>(index) {
            return Some(v.to_string());
        }
        row.try_get::<f64, _>(index).ok().map(|v| v.to_string())
    }

    /// Map the descriptor's SSL mode to the SQLx one.
    pub fn map_ssl_mode(mode: &SslMode) -> PgSslMode {
        match mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
            SslMode::VerifyCa => PgSslMode::VerifyCa,
            SslMode::VerifyFull => PgSslMode::VerifyFull,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_mapping() {
        assert!(matches!(
            PgValueConverter::map_ssl_mode(&SslMode::Disable),
            PgSslMode::Disable
        ));
        assert!(matches!(
            PgValueConverter::map_ssl_mode(&SslMode::Prefer),
            PgSslMode::Prefer
        ));
        assert!(matches!(
            PgValueConverter::map_ssl_mode(&SslMode::Require),
            PgSslMode::Require
        ));
        assert!(matches!(
            PgValueConverter::map_ssl_mode(&SslMode::VerifyCa),
            PgSslMode::VerifyCa
        ));
        assert!(matches!(
            PgValueConverter::map_ssl_mode(&SslMode::VerifyFull),
            PgSslMode::VerifyFull
        ));
    }
}
