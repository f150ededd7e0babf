//! Dynamic row conversion for the SELECT passthrough.
//!
//! The statement is caller-supplied, so nothing is known about the
//! result shape ahead of time. Each row becomes a JSON object keyed by
//! column name, decoded per the column's MySQL type; `preserve_order`
//! on serde_json keeps the SELECT column order in the output.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// One result row, keyed by column name in SELECT order.
pub type RowObject = serde_json::Map<String, Value>;

pub(super) fn row_to_object(row: &MySqlRow) -> Result<RowObject, sqlx::Error> {
    let mut object = RowObject::new();
    for (index, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), decode_column(row, index)?);
    }
    Ok(object)
}

fn decode_column(row: &MySqlRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOLEAN" => Value::from(row.try_get::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from(row.try_get::<i64, _>(index)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" | "YEAR" | "BIT" => Value::from(row.try_get::<u64, _>(index)?),
        "FLOAT" => Value::from(f64::from(row.try_get::<f32, _>(index)?)),
        "DOUBLE" => Value::from(row.try_get::<f64, _>(index)?),
        // Decimals stay exact as strings, matching what MySQL text
        // clients report.
        "DECIMAL" => Value::from(row.try_get::<Decimal, _>(index)?.to_string()),
        "DATE" => Value::from(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::from(row.try_get::<NaiveTime, _>(index)?.to_string()),
        "DATETIME" => Value::from(row.try_get::<NaiveDateTime, _>(index)?.to_string()),
        "TIMESTAMP" => Value::from(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
        "JSON" => row.try_get::<Value, _>(index)?,
        "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY"
        | "GEOMETRY" => Value::from(BASE64.encode(row.try_get::<Vec<u8>, _>(index)?)),
        // CHAR, VARCHAR, TEXT, ENUM, SET, and anything new.
        _ => Value::from(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}
