//! Partial updates.
//!
//! A PATCH body is an arbitrary JSON object. Each entity declares which columns may be
//! changed through it and under which spellings; [`FieldSet::build`] keeps the qualifying
//! keys and turns them into a single `UPDATE` naming only those columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use schemars::JsonSchema;
use sea_query::{Expr, Iden, Query, SimpleExpr, SqliteQueryBuilder, Value as SqlValue};
use sea_query_rusqlite::RusqliteBinder;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A JSON object body whose keys are interpreted field by field.
///
/// Accepts both the camelCase and the legacy snake_case spelling of a field. When both
/// are sent, the first spelling listed for the field wins.
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// First spelling carrying a non-null value.
    fn resolve(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|key| self.0.get(*key).filter(|value| !value.is_null()))
    }

    pub fn text(&self, keys: &[&str]) -> Option<String> {
        self.resolve(keys).and_then(Value::as_str).map(str::to_owned)
    }

    /// Same as [`Payload::text`], but blank strings count as absent.
    pub fn required_text(&self, keys: &[&str]) -> Option<String> {
        self.text(keys).filter(|text| !text.trim().is_empty())
    }

    pub fn flag(&self, keys: &[&str]) -> Option<bool> {
        self.resolve(keys).and_then(Value::as_bool)
    }

    /// Integer identifiers, also accepted as numeric strings.
    pub fn id(&self, keys: &[&str]) -> Option<i64> {
        match self.resolve(keys)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// The first truthy spelling, parsed as a timestamp.
    ///
    /// Falsy values (`null`, `""`, `0`, `false`) mean "not sent", so a date can never be
    /// cleared through a partial update.
    pub fn date(&self, keys: &[&str]) -> Result<Option<DateTime<Utc>>> {
        let Some((key, value)) = keys
            .iter()
            .find_map(|key| self.0.get(*key).filter(|value| is_truthy(value)).map(|value| (*key, value)))
        else {
            return Ok(None);
        };

        parse_date(value)
            .map(Some)
            .ok_or_else(|| Error::bad_request(format!("Invalid date for {key}")))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// RFC 3339, a bare `YYYY-MM-DD` (midnight UTC), a `datetime-local` value, or epoch millis.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            DateTime::parse_from_rfc3339(text)
                .map(|date| date.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M")
                        .ok()
                        .map(|date| date.and_utc())
                })
                .or_else(|| {
                    NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                        .map(|date| date.and_utc())
                })
        }
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Included when the value is a string, empty strings included.
    Text,
    /// Included when the resolved value is a JSON boolean.
    Flag,
    /// Included when a spelling is truthy; must then parse as a date.
    Date,
}

/// One updatable column and the body keys that address it.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec<C> {
    pub column: C,
    pub keys: &'static [&'static str],
    pub kind: FieldKind,
}

impl<C> FieldSpec<C> {
    pub const fn text(column: C, keys: &'static [&'static str]) -> Self {
        Self {
            column,
            keys,
            kind: FieldKind::Text,
        }
    }

    pub const fn flag(column: C, keys: &'static [&'static str]) -> Self {
        Self {
            column,
            keys,
            kind: FieldKind::Flag,
        }
    }

    pub const fn date(column: C, keys: &'static [&'static str]) -> Self {
        Self {
            column,
            keys,
            kind: FieldKind::Date,
        }
    }
}

/// The qualifying assignments of a partial update, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet<C> {
    pub id: i64,
    pub assignments: Vec<(C, SqlValue)>,
}

impl<C> FieldSet<C>
where
    C: Iden + Copy + 'static,
{
    /// Fails with a client error, before touching the store, when nothing qualifies.
    pub fn build(id: i64, payload: &Payload, specs: &[FieldSpec<C>]) -> Result<Self> {
        let mut assignments = Vec::with_capacity(specs.len());

        for spec in specs {
            let value = match spec.kind {
                FieldKind::Text => payload.text(spec.keys).map(SqlValue::from),
                FieldKind::Flag => payload.flag(spec.keys).map(SqlValue::from),
                FieldKind::Date => payload.date(spec.keys)?.map(SqlValue::from),
            };

            if let Some(value) = value {
                assignments.push((spec.column, value));
            }
        }

        if assignments.is_empty() {
            return Err(Error::bad_request("No valid fields to update"));
        }

        Ok(Self { id, assignments })
    }

    pub fn columns(&self) -> Vec<String> {
        self.assignments.iter().map(|(column, _)| column.to_string()).collect()
    }

    /// Assignment values followed by the row id.
    pub fn params(&self) -> Vec<SqlValue> {
        self.assignments
            .iter()
            .map(|(_, value)| value.clone())
            .chain(std::iter::once(SqlValue::from(self.id)))
            .collect()
    }

    /// Runs the `UPDATE`; returns the number of rows it touched.
    pub fn execute(&self, conn: &rusqlite::Connection, table: C, id_column: C) -> rusqlite::Result<usize> {
        let (sql, values) = Query::update()
            .table(table)
            .values(
                self.assignments
                    .iter()
                    .map(|(column, value)| (*column, SimpleExpr::from(value.clone()))),
            )
            .and_where(Expr::col(id_column).eq(self.id))
            .build_rusqlite(SqliteQueryBuilder);

        tracing::debug!(%sql, "partial update");

        conn.execute(&sql, &*values.as_params())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Iden, Clone, Copy, Debug, PartialEq)]
    enum Items {
        Table,
        Id,
        Title,
        Done,
        DueDate,
    }

    const FIELDS: &[FieldSpec<Items>] = &[
        FieldSpec::text(Items::Title, &["title"]),
        FieldSpec::flag(Items::Done, &["isDone", "is_done"]),
        FieldSpec::date(Items::DueDate, &["dueDate", "due_date"]),
    ];

    fn payload(value: Value) -> Payload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn keeps_only_qualifying_fields() {
        let set = FieldSet::build(3, &payload(json!({ "title": "", "unknown": 1 })), FIELDS).unwrap();

        assert_eq!(set.columns(), vec!["title"]);
        assert_eq!(set.params(), vec![SqlValue::from(""), SqlValue::from(3i64)]);
    }

    #[test]
    fn nothing_qualifies() {
        let body = payload(json!({ "title": 5, "isDone": "yes", "dueDate": "" }));
        let error = FieldSet::build(1, &body, FIELDS).unwrap_err();

        assert!(matches!(error, Error::BadRequest(message) if message == "No valid fields to update"));
    }

    #[test]
    fn camel_case_flag_wins() {
        let set = FieldSet::build(1, &payload(json!({ "isDone": false, "is_done": true })), FIELDS).unwrap();
        assert_eq!(set.assignments, vec![(Items::Done, SqlValue::from(false))]);

        let set = FieldSet::build(1, &payload(json!({ "isDone": null, "is_done": true })), FIELDS).unwrap();
        assert_eq!(set.assignments, vec![(Items::Done, SqlValue::from(true))]);
    }

    #[test]
    fn non_boolean_camel_case_flag_shadows_snake_case() {
        let body = payload(json!({ "isDone": "true", "is_done": true }));
        assert!(FieldSet::build(1, &body, FIELDS).is_err());
    }

    #[test]
    fn first_truthy_date_spelling_is_used() {
        let set = FieldSet::build(1, &payload(json!({ "dueDate": "", "due_date": "2024-05-01" })), FIELDS).unwrap();

        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(set.assignments, vec![(Items::DueDate, SqlValue::from(expected))]);
    }

    #[test]
    fn unparseable_date_is_a_client_error() {
        let error = FieldSet::build(1, &payload(json!({ "dueDate": "tomorrow" })), FIELDS).unwrap_err();
        assert!(matches!(error, Error::BadRequest(message) if message == "Invalid date for dueDate"));
    }

    #[test]
    fn assignments_follow_schema_order() {
        let body = payload(json!({ "dueDate": 1_700_000_000_000i64, "isDone": true, "title": "x" }));
        let set = FieldSet::build(9, &body, FIELDS).unwrap();

        assert_eq!(set.columns(), vec!["title", "done", "due_date"]);
        assert_eq!(set.params().last(), Some(&SqlValue::from(9i64)));
    }

    #[test]
    fn dates_in_accepted_shapes() {
        assert!(parse_date(&json!("2024-05-01T10:00:00Z")).is_some());
        assert!(parse_date(&json!("2024-05-01T10:00:00.123+02:00")).is_some());
        assert!(parse_date(&json!("2024-05-01T10:00")).is_some());
        assert!(parse_date(&json!(1_714_557_600_000i64)).is_some());
        assert!(parse_date(&json!("05/01/2024")).is_none());
        assert!(parse_date(&json!(true)).is_none());
    }

    #[test]
    fn updates_only_named_columns() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE items (id INTEGER PRIMARY KEY, title TEXT NOT NULL, done BOOLEAN NOT NULL, due_date DATETIME);
            INSERT INTO items (id, title, done) VALUES (1, 'first', FALSE);
            "#,
        )
        .unwrap();

        let set = FieldSet::build(1, &payload(json!({ "is_done": true })), FIELDS).unwrap();
        assert_eq!(set.execute(&conn, Items::Table, Items::Id).unwrap(), 1);

        let (title, done): (String, bool) = conn
            .query_row("SELECT title, done FROM items WHERE id = 1", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(title, "first");
        assert!(done);

        let missing = FieldSet::build(2, &payload(json!({ "title": "x" })), FIELDS).unwrap();
        assert_eq!(missing.execute(&conn, Items::Table, Items::Id).unwrap(), 0);
    }
}
