//! Conversion of driver rows into string-valued [`Row`]s.

use rdfweaver_core::Row;
use sqlx::any::AnyRow;
use sqlx::{Column, Row as _};

/// Render every column of `row` as text, in result-set order.
///
/// `NULL` becomes `None`. Binary values are decoded as lossy UTF-8.
pub fn convert_row(row: &AnyRow) -> Row {
    let columns = row.columns();
    let mut converted = Row::with_capacity(columns.len());
    for column in columns {
        converted.push(column.name(), column_value(row, column.ordinal()));
    }
    converted
}

fn column_value(row: &AnyRow, i: usize) -> Option<String> {
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v;
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map(|v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
        return v.map(|v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(i) {
        return v.map(|v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map(|v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(i) {
        return v.map(|v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return v.map(|v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(i) {
        return v.map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
    }
    None
}
