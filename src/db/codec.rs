//! Conversions between `serde_json` values and SQLite cells.

use crate::error::DaoError;
use crate::model::Record;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde_json::{Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

/// Bind one parameter. Arrays and objects are stored as JSON text.
pub fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    }
}

pub fn bind_all<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params.iter().fold(query, |q, v| bind_value(q, v))
}

/// Decode a row into a record keyed by column name, by each cell's dynamic type.
pub fn row_to_record(row: &SqliteRow) -> Result<Record, DaoError> {
    let mut record = Record::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => Value::from(row.try_get::<i64, _>(idx)?),
                "REAL" => Number::from_f64(row.try_get::<f64, _>(idx)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => Value::String(BASE64.encode(row.try_get::<Vec<u8>, _>(idx)?)),
                _ => Value::String(row.try_get::<String, _>(idx)?),
            }
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}
