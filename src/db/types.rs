//! Value conversions between the drivers and JSON.
//!
//! # Architecture
//!
//! MySQL conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. A decoder per category extracts the value from the row
//!
//! MongoDB documents go through relaxed Extended JSON in both directions.

use crate::error::{DbError, DbResult};
use ::mongodb::bson::{Bson, Document};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Binary,
    Json,
    DateTime,
    Timestamp,
    Date,
    Time,
    Text,
}

/// Classify a MySQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_uppercase();

    // Decimal first, "DECIMAL" must not fall into the float branch
    if upper.contains("DECIMAL") || upper.contains("NUMERIC") {
        return TypeCategory::Decimal;
    }

    match upper.as_str() {
        "BOOLEAN" | "BOOL" => TypeCategory::Boolean,
        "JSON" => TypeCategory::Json,
        "DATETIME" => TypeCategory::DateTime,
        "TIMESTAMP" => TypeCategory::Timestamp,
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "YEAR" => TypeCategory::Integer,
        _ if upper.contains("INT") => TypeCategory::Integer,
        _ if upper.contains("FLOAT") || upper.contains("DOUBLE") || upper == "REAL" => {
            TypeCategory::Float
        }
        _ if upper.contains("BLOB") || upper.contains("BINARY") || upper == "BIT" => {
            TypeCategory::Binary
        }
        _ => TypeCategory::Text,
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_uppercase();
        name.contains("DECIMAL") || name.contains("NUMERIC")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Encode binary data as UTF-8 text when possible, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

// =============================================================================
// Row to JSON
// =============================================================================

/// Convert a MySQL row into a JSON object keyed by column name.
pub fn row_to_json(row: &MySqlRow) -> serde_json::Map<String, JsonValue> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let category = categorize_type(col.type_info().name());
            (col.name().to_string(), decode_column(row, idx, category))
        })
        .collect()
}

fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
    match category {
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Boolean => decode_boolean(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Binary => decode_binary_col(row, idx),
        TypeCategory::Json => decode_json(row, idx),
        TypeCategory::DateTime => decode_display::<chrono::NaiveDateTime>(row, idx),
        TypeCategory::Timestamp => decode_display::<chrono::DateTime<chrono::Utc>>(row, idx),
        TypeCategory::Date => decode_display::<chrono::NaiveDate>(row, idx),
        TypeCategory::Time => decode_display::<chrono::NaiveTime>(row, idx),
        TypeCategory::Text => decode_text(row, idx),
    }
}

fn decode_decimal(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<RawDecimal>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(v.0),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::error!("Failed to decode DECIMAL: {:?}", e);
            JsonValue::Null
        }
    }
}

fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
    }
    // BIGINT UNSIGNED does not fit in i64
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
    }
    // YEAR
    if let Ok(v) = row.try_get::<Option<u16>, _>(idx) {
        return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
    }
    JsonValue::Null
}

fn decode_boolean(row: &MySqlRow, idx: usize) -> JsonValue {
    row.try_get::<Option<bool>, _>(idx)
        .ok()
        .flatten()
        .map(JsonValue::Bool)
        .unwrap_or(JsonValue::Null)
}

fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
    let value = row
        .try_get::<Option<f64>, _>(idx)
        .ok()
        .flatten()
        .or_else(|| {
            row.try_get::<Option<f32>, _>(idx)
                .ok()
                .flatten()
                .map(f64::from)
        });
    match value {
        Some(v) => serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string())),
        None => JsonValue::Null,
    }
}

fn decode_binary_col(row: &MySqlRow, idx: usize) -> JsonValue {
    row.try_get::<Option<Vec<u8>>, _>(idx)
        .ok()
        .flatten()
        .map(|v| decode_binary_value(&v))
        .unwrap_or(JsonValue::Null)
}

fn decode_json(row: &MySqlRow, idx: usize) -> JsonValue {
    row.try_get::<Option<JsonValue>, _>(idx)
        .ok()
        .flatten()
        .unwrap_or(JsonValue::Null)
}

fn decode_display<'r, T>(row: &'r MySqlRow, idx: usize) -> JsonValue
where
    T: Decode<'r, sqlx::MySql> + Type<sqlx::MySql> + std::fmt::Display,
{
    match row.try_get::<Option<T>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(v.to_string()),
        Ok(None) => JsonValue::Null,
        // Zero dates and similar values chrono cannot represent
        Err(_) => decode_text(row, idx),
    }
}

fn decode_text(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
    }
    if let Ok(Some(bytes)) = row.try_get_unchecked::<Option<Vec<u8>>, _>(idx) {
        return decode_binary_value(&bytes);
    }
    JsonValue::Null
}

// =============================================================================
// BSON <-> JSON
// =============================================================================

/// Convert a JSON object into a BSON document.
///
/// Extended JSON markers such as `{"$oid": "..."}` are honored.
pub fn json_to_document(value: JsonValue, what: &str) -> DbResult<Document> {
    if !value.is_object() {
        return Err(DbError::invalid_input(format!(
            "{} must be a JSON object",
            what
        )));
    }
    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(_) => Err(DbError::invalid_input(format!(
            "{} must be a JSON object",
            what
        ))),
        Err(e) => Err(DbError::invalid_input(format!("Invalid {}: {}", what, e))),
    }
}

/// Convert a BSON document into relaxed Extended JSON.
pub fn document_to_json(doc: Document) -> JsonValue {
    Bson::Document(doc).into_relaxed_extjson()
}

/// Convert any BSON value into relaxed Extended JSON.
pub fn bson_to_json(value: Bson) -> JsonValue {
    value.into_relaxed_extjson()
}
