use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub type RowId = i64;
pub type UserId = i64;

pub const DEFAULT_PRIORITY: &str = "Medium";
pub const DEFAULT_CATEGORY: &str = "Personal";

const PINNED: &[&str] = &["isPinned", "is_pinned", "pinned"];
const CREATED: &[&str] = &["creationDate", "creation_date", "createdAt"];
const DUE: &[&str] = &["dueDate", "due_date"];
const OWNER: &[&str] = &["userId", "user_id"];

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: RowId,
    pub title: String,
    pub content: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub is_pinned: bool,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: RowId,
    pub title: String,
    pub description: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub is_pinned: bool,
    pub priority: String,
    pub category: String,
    pub user_id: Option<UserId>,
}

impl Note {
    /// Builds a cache row from any accepted wire shape.
    ///
    /// Returns `None` when the shape has no integer `id`; such rows never enter the cache.
    pub fn normalize(raw: &Value) -> Option<Self> {
        let raw = raw.as_object()?;
        Some(Self {
            id: id(raw, &["id"])?,
            title: text(raw, &["title"]).unwrap_or_default(),
            content: text(raw, &["content"]).unwrap_or_default(),
            creation_date: date(raw, CREATED),
            is_pinned: flag(raw, PINNED),
            user_id: id(raw, OWNER),
        })
    }
}

impl Task {
    /// Same contract as [`Note::normalize`], plus the priority and category defaults.
    pub fn normalize(raw: &Value) -> Option<Self> {
        let raw = raw.as_object()?;
        let task = Self {
            id: id(raw, &["id"])?,
            title: text(raw, &["title"]).unwrap_or_default(),
            description: text(raw, &["description"]).unwrap_or_default(),
            creation_date: date(raw, CREATED),
            due_date: date(raw, DUE),
            completed: flag(raw, &["completed"]),
            is_pinned: flag(raw, PINNED),
            priority: text(raw, &["priority"]).unwrap_or_default(),
            category: text(raw, &["category"]).unwrap_or_default(),
            user_id: id(raw, OWNER),
        };
        Some(task.with_defaults())
    }

    pub(crate) fn with_defaults(mut self) -> Self {
        if self.priority.trim().is_empty() {
            self.priority = DEFAULT_PRIORITY.into();
        }
        if self.category.trim().is_empty() {
            self.category = DEFAULT_CATEGORY.into();
        }
        self
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now)
    }
}

/// Normalizes a list response, dropping rows that cannot be identified.
pub fn normalize_all<T>(raw: Vec<Value>, normalize: fn(&Value) -> Option<T>) -> Vec<T> {
    let total = raw.len();
    let rows: Vec<T> = raw.iter().filter_map(normalize).collect();
    if rows.len() != total {
        tracing::warn!(dropped = total - rows.len(), "rows without an id were ignored");
    }
    rows
}

fn pick<'a>(raw: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|key| raw.get(*key)).find(|value| !value.is_null())
}

fn text(raw: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    pick(raw, keys)?.as_str().map(str::to_owned)
}

fn flag(raw: &Map<String, Value>, keys: &[&str]) -> bool {
    pick(raw, keys).and_then(Value::as_bool).unwrap_or(false)
}

fn id(raw: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    match pick(raw, keys)? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Only four-digit years survive a round trip through RFC 3339.
fn date(raw: &Map<String, Value>, keys: &[&str]) -> Option<DateTime<Utc>> {
    let date = match pick(raw, keys)? {
        Value::String(text) => parse_date(text),
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }?;
    (1..=9999).contains(&date.year()).then_some(date)
}

pub(crate) fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M") {
        return Some(date.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}

impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            id: RowId,
            title: &'a str,
            content: &'a str,
            creation_date: Option<DateTime<Utc>>,
            is_pinned: bool,
            user_id: Option<UserId>,
            #[serde(rename = "creation_date")]
            creation_date_alias: Option<DateTime<Utc>>,
            #[serde(rename = "is_pinned")]
            is_pinned_alias: bool,
            pinned: bool,
            #[serde(rename = "user_id")]
            user_id_alias: Option<UserId>,
        }

        Wire {
            id: self.id,
            title: &self.title,
            content: &self.content,
            creation_date: self.creation_date,
            is_pinned: self.is_pinned,
            user_id: self.user_id,
            creation_date_alias: self.creation_date,
            is_pinned_alias: self.is_pinned,
            pinned: self.is_pinned,
            user_id_alias: self.user_id,
        }
        .serialize(serializer)
    }
}

impl Serialize for Task {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            id: RowId,
            title: &'a str,
            description: &'a str,
            creation_date: Option<DateTime<Utc>>,
            due_date: Option<DateTime<Utc>>,
            completed: bool,
            is_pinned: bool,
            priority: &'a str,
            category: &'a str,
            user_id: Option<UserId>,
            #[serde(rename = "creation_date")]
            creation_date_alias: Option<DateTime<Utc>>,
            #[serde(rename = "due_date")]
            due_date_alias: Option<DateTime<Utc>>,
            #[serde(rename = "is_pinned")]
            is_pinned_alias: bool,
            pinned: bool,
            #[serde(rename = "user_id")]
            user_id_alias: Option<UserId>,
        }

        Wire {
            id: self.id,
            title: &self.title,
            description: &self.description,
            creation_date: self.creation_date,
            due_date: self.due_date,
            completed: self.completed,
            is_pinned: self.is_pinned,
            priority: &self.priority,
            category: &self.category,
            user_id: self.user_id,
            creation_date_alias: self.creation_date,
            due_date_alias: self.due_date,
            is_pinned_alias: self.is_pinned,
            pinned: self.is_pinned,
            user_id_alias: self.user_id,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Note {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Note::normalize(&raw).ok_or_else(|| D::Error::custom("note without an integer id"))
    }
}

impl<'de> Deserialize<'de> for Task {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Task::normalize(&raw).ok_or_else(|| D::Error::custom("task without an integer id"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(alias = "full_name")]
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub completed: u32,
    pub pending: u32,
    pub overdue: u32,
}

impl Summary {
    /// Counts the way `GET /users/summary/{id}` does, for rows that only live in the cache.
    pub fn from_tasks(tasks: &[Task], now: DateTime<Utc>) -> Self {
        tasks.iter().fold(Self::default(), |mut summary, task| {
            if task.completed {
                summary.completed += 1;
            } else if task.is_overdue(now) {
                summary.overdue += 1;
            } else {
                summary.pending += 1;
            }
            summary
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub title: String,
    pub content: String,
}

impl NewNote {
    pub(crate) fn into_note(self, id: RowId, user_id: Option<UserId>, now: DateTime<Utc>) -> Note {
        Note {
            id,
            title: self.title,
            content: self.content,
            creation_date: Some(now),
            is_pinned: false,
            user_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<String>,
    pub category: Option<String>,
}

impl NewTask {
    pub(crate) fn into_task(self, id: RowId, user_id: Option<UserId>, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            creation_date: Some(now),
            due_date: self.due_date,
            completed: false,
            is_pinned: false,
            priority: self.priority.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            user_id,
        }
        .with_defaults()
    }
}

/// Fields a note PATCH may carry. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
}

impl NoteChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.is_pinned.is_none()
    }

    pub fn apply(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title.clone_from(title);
        }
        if let Some(content) = &self.content {
            note.content.clone_from(content);
        }
        if let Some(is_pinned) = self.is_pinned {
            note.is_pinned = is_pinned;
        }
    }
}

/// Fields a task PATCH may carry. A due date can be moved but not cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.due_date.is_none()
            && self.is_pinned.is_none()
            && self.priority.is_none()
            && self.category.is_none()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(is_pinned) = self.is_pinned {
            task.is_pinned = is_pinned;
        }
        if let Some(priority) = &self.priority {
            task.priority.clone_from(priority);
        }
        if let Some(category) = &self.category {
            task.category.clone_from(category);
        }
        let normalized = std::mem::take(task).with_defaults();
        *task = normalized;
    }
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: 0,
            title: String::new(),
            description: String::new(),
            creation_date: None,
            due_date: None,
            completed: false,
            is_pinned: false,
            priority: DEFAULT_PRIORITY.into(),
            category: DEFAULT_CATEGORY.into(),
            user_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case::camel(json!({ "id": 1, "isPinned": true }), true)]
    #[case::snake(json!({ "id": 1, "is_pinned": true }), true)]
    #[case::legacy(json!({ "id": 1, "pinned": true }), true)]
    #[case::camel_wins(json!({ "id": 1, "isPinned": false, "is_pinned": true }), false)]
    #[case::null_skipped(json!({ "id": 1, "isPinned": null, "is_pinned": true }), true)]
    #[case::not_a_bool(json!({ "id": 1, "isPinned": "yes" }), false)]
    #[case::missing(json!({ "id": 1 }), false)]
    fn pinned_spellings(#[case] raw: Value, #[case] expected: bool) {
        assert_eq!(Note::normalize(&raw).unwrap().is_pinned, expected);
    }

    #[rstest]
    #[case::number(json!({ "id": 42 }), Some(42))]
    #[case::numeric_string(json!({ "id": "42" }), Some(42))]
    #[case::float(json!({ "id": 4.2 }), None)]
    #[case::missing(json!({ "title": "x" }), None)]
    #[case::not_an_object(json!([1, 2]), None)]
    fn row_ids(#[case] raw: Value, #[case] expected: Option<RowId>) {
        assert_eq!(Task::normalize(&raw).map(|task| task.id), expected);
    }

    #[rstest]
    #[case::rfc3339("2024-06-30T10:00:00Z", Some(Utc.with_ymd_and_hms(2024, 6, 30, 10, 0, 0).unwrap()))]
    #[case::offset("2024-06-30T12:00:00+02:00", Some(Utc.with_ymd_and_hms(2024, 6, 30, 10, 0, 0).unwrap()))]
    #[case::sqlite("2024-06-30 10:00:00+00:00", Some(Utc.with_ymd_and_hms(2024, 6, 30, 10, 0, 0).unwrap()))]
    #[case::local_input("2024-06-30T10:00", Some(Utc.with_ymd_and_hms(2024, 6, 30, 10, 0, 0).unwrap()))]
    #[case::date_only("2024-06-30", Some(Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap()))]
    #[case::garbage("next tuesday", None)]
    #[case::empty("", None)]
    fn date_formats(#[case] text: &str, #[case] expected: Option<DateTime<Utc>>) {
        assert_eq!(parse_date(text), expected);
    }

    #[test]
    fn task_defaults() {
        let task = Task::normalize(&json!({ "id": 3, "title": "Walk", "priority": "", "due_date": 0 })).unwrap();

        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert_eq!(task.category, DEFAULT_CATEGORY);
        assert_eq!(task.description, "");
        assert!(!task.completed);
        assert_eq!(task.due_date, DateTime::from_timestamp_millis(0));
        assert_eq!(task.user_id, None);
    }

    #[test]
    fn serialized_rows_carry_both_spellings() {
        let task = Task {
            id: 5,
            is_pinned: true,
            due_date: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
            user_id: Some(7),
            ..Task::default()
        };
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["isPinned"], json!(true));
        assert_eq!(value["is_pinned"], json!(true));
        assert_eq!(value["pinned"], json!(true));
        assert_eq!(value["dueDate"], value["due_date"]);
        assert_eq!(value["userId"], json!(7));
        assert_eq!(value["user_id"], json!(7));
    }

    #[test]
    fn list_drops_unidentified_rows() {
        let notes = normalize_all(
            vec![json!({ "id": 1 }), json!({ "title": "lost" }), json!({ "id": "2" })],
            Note::normalize,
        );
        assert_eq!(notes.iter().map(|note| note.id).collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn summary_counts() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let yesterday = Some(now - chrono::Duration::days(1));
        let tasks = [
            Task { completed: true, due_date: yesterday, ..Task::default() },
            Task { due_date: yesterday, ..Task::default() },
            Task { due_date: Some(now), ..Task::default() },
            Task::default(),
        ];

        assert_eq!(
            Summary::from_tasks(&tasks, now),
            Summary { completed: 1, pending: 2, overdue: 1 }
        );
    }

    #[test]
    fn changes_keep_due_date() {
        let due = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let mut task = Task { due_date: Some(due), ..Task::default() };

        TaskChanges { completed: Some(true), priority: Some(" ".into()), ..Default::default() }.apply(&mut task);

        assert!(task.completed);
        assert_eq!(task.due_date, Some(due));
        assert_eq!(task.priority, DEFAULT_PRIORITY);
    }

    fn field_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            (-1.0e6f64..1.0e6).prop_map(Value::from),
            "[a-zA-Z ]{0,12}".prop_map(Value::from),
            "[0-9]{1,6}".prop_map(Value::from),
            Just(Value::from("2024-06-30")),
            Just(Value::from("2024-06-30T10:15:00.123Z")),
        ]
    }

    fn raw_row() -> impl Strategy<Value = Value> {
        let keys = prop::sample::select(vec![
            "id",
            "title",
            "content",
            "description",
            "completed",
            "isPinned",
            "is_pinned",
            "pinned",
            "creationDate",
            "creation_date",
            "createdAt",
            "dueDate",
            "due_date",
            "priority",
            "category",
            "userId",
            "user_id",
        ]);
        (any::<i64>(), prop::collection::vec((keys, field_value()), 0..12)).prop_map(|(id, fields)| {
            let mut row: Map<String, Value> = fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
            row.entry("id").or_insert(Value::from(id));
            Value::Object(row)
        })
    }

    proptest! {
        #[test]
        fn task_normalization_is_idempotent(raw in raw_row()) {
            if let Some(once) = Task::normalize(&raw) {
                let twice = Task::normalize(&serde_json::to_value(&once).unwrap());
                prop_assert_eq!(Some(once), twice);
            }
        }

        #[test]
        fn note_normalization_is_idempotent(raw in raw_row()) {
            if let Some(once) = Note::normalize(&raw) {
                let twice = Note::normalize(&serde_json::to_value(&once).unwrap());
                prop_assert_eq!(Some(once), twice);
            }
        }
    }
}
