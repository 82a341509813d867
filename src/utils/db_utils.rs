use crate::error::AttendanceError;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::SqliteExecutor;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Column value kinds
/// ===============================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// NOT NULL text; blank strings are rejected.
    Text,
    /// Text or null.
    NullableText,
    /// NOT NULL `YYYY-MM-DD`.
    Date,
    Bool,
}

fn to_sql_value(column: &str, kind: ColumnKind, value: &Value) -> Result<SqlValue, AttendanceError> {
    let invalid = |expected: &str| {
        AttendanceError::InvalidInput(format!("Field `{column}` must be {expected}"))
    };

    match (kind, value) {
        (ColumnKind::Text, Value::String(s)) if !s.trim().is_empty() => {
            Ok(SqlValue::String(s.trim().to_string()))
        }
        (ColumnKind::Text, _) => Err(invalid("a non-empty string")),
        (ColumnKind::NullableText, Value::String(s)) => Ok(SqlValue::String(s.clone())),
        (ColumnKind::NullableText, Value::Null) => Ok(SqlValue::Null),
        (ColumnKind::NullableText, _) => Err(invalid("a string or null")),
        (ColumnKind::Date, Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(SqlValue::Date)
            .map_err(|_| invalid("a date (YYYY-MM-DD)")),
        (ColumnKind::Date, _) => Err(invalid("a date (YYYY-MM-DD)")),
        (ColumnKind::Bool, Value::Bool(b)) => Ok(SqlValue::Bool(*b)),
        (ColumnKind::Bool, _) => Err(invalid("a boolean")),
    }
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `columns` may appear in the payload, and each value must
/// match its column's kind. Column names are interpolated, values are always bound.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    columns: &[(&str, ColumnKind)],
    id_column: &str,
    id_value: &str,
) -> Result<SqlUpdate, AttendanceError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AttendanceError::InvalidInput("Payload must be a JSON object".into()))?;

    if obj.is_empty() {
        return Err(AttendanceError::InvalidInput(
            "No fields provided for update".into(),
        ));
    }

    let mut assignments = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let Some((column, kind)) = columns.iter().find(|(name, _)| *name == key.as_str()) else {
            return Err(AttendanceError::InvalidInput(format!(
                "Field `{key}` cannot be updated"
            )));
        };

        values.push(to_sql_value(column, *kind, value)?);
        assignments.push(format!("{column} = ?"));
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        assignments.join(", "),
        id_column
    );

    // WHERE id = ?
    values.push(SqlValue::String(id_value.to_string()));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update<'e, E>(executor: E, update: SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}
