//! Entity records and the field metadata that drives generic forms, tables and storage.
//!
//! Tasks, projects and objectives are closed records. Code that needs to treat them
//! uniformly goes through the [`Entity`] trait and its descriptor table ([`FieldSpec`])
//! instead of poking at arbitrary keys.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::fields::{EntityKind, FieldError, Priority, Status};

/// Editable fields across all entity types. Identity and timestamps are not fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Description,
    Status,
    Priority,
    Progress,
    DueDate,
    StartOn,
    Started,
}

impl Field {
    /// Key used in JSON bodies.
    pub fn wire_name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Status => "status",
            Field::Priority => "priority",
            Field::Progress => "progress",
            Field::DueDate => "dueDate",
            Field::StartOn => "startOn",
            Field::Started => "started",
        }
    }

    /// SQL column name.
    pub fn column(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Status => "status",
            Field::Priority => "priority",
            Field::Progress => "progress",
            Field::DueDate => "due_date",
            Field::StartOn => "start_on",
            Field::Started => "started",
        }
    }

    pub fn is_date(self) -> bool {
        matches!(self, Field::DueDate | Field::StartOn | Field::Started)
    }
}

/// Which widget edits a field and how its value is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Text,
    Status,
    Priority,
    Progress,
    Date,
}

/// One row of an entity's field metadata table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub label: &'static str,
    pub control: Control,
    /// Must be present on create. Everything else has a server-side default.
    pub required: bool,
}

impl FieldSpec {
    const fn new(field: Field, label: &'static str, control: Control, required: bool) -> Self {
        FieldSpec { field, label, control, required }
    }

    /// Value a fresh "add new" form starts from.
    pub fn default_value(&self) -> FieldValue {
        match self.control {
            Control::Text => FieldValue::Text(String::new()),
            Control::Status => FieldValue::Status(Status::default()),
            Control::Priority => FieldValue::Priority(Priority::default()),
            Control::Progress => FieldValue::Progress(0),
            Control::Date => FieldValue::Date(None),
        }
    }
}

const TITLE: FieldSpec = FieldSpec::new(Field::Title, "Title", Control::Text, true);
const DESCRIPTION: FieldSpec = FieldSpec::new(Field::Description, "Description", Control::Text, true);
const STATUS: FieldSpec = FieldSpec::new(Field::Status, "Status", Control::Status, false);
const PRIORITY: FieldSpec = FieldSpec::new(Field::Priority, "Priority", Control::Priority, false);
const PROGRESS: FieldSpec = FieldSpec::new(Field::Progress, "Progress", Control::Progress, false);
const DUE_DATE: FieldSpec = FieldSpec::new(Field::DueDate, "Due Date", Control::Date, false);
const START_ON: FieldSpec = FieldSpec::new(Field::StartOn, "Start On", Control::Date, false);
const STARTED: FieldSpec = FieldSpec::new(Field::Started, "Started", Control::Date, false);

const TASK_FIELDS: &[FieldSpec] = &[TITLE, DESCRIPTION, STATUS];
const PROJECT_FIELDS: &[FieldSpec] = &[TITLE, DESCRIPTION, STATUS, PRIORITY, PROGRESS, DUE_DATE];
const OBJECTIVE_FIELDS: &[FieldSpec] = &[
    TITLE, DESCRIPTION, STATUS, PRIORITY, PROGRESS, START_ON, STARTED, DUE_DATE,
];

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Status(Status),
    Priority(Priority),
    Progress(u8),
    Date(Option<NaiveDate>),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Status(s) => Value::String(s.as_str().to_string()),
            FieldValue::Priority(p) => Value::String(p.as_str().to_string()),
            FieldValue::Progress(p) => Value::from(*p),
            FieldValue::Date(Some(d)) => Value::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::Date(None) => Value::Null,
        }
    }

    /// Decode a JSON value for a field with the given control.
    pub fn from_json(spec: &FieldSpec, value: &Value) -> Result<FieldValue, ValueError> {
        let invalid = |reason: &str| ValueError::Invalid {
            field: spec.field.wire_name(),
            reason: reason.to_string(),
        };
        match spec.control {
            Control::Text => match value {
                Value::String(s) => Ok(FieldValue::Text(s.clone())),
                _ => Err(invalid("expected a string")),
            },
            Control::Status => match value {
                Value::String(s) => Ok(FieldValue::Status(s.parse()?)),
                _ => Err(invalid("expected a status string")),
            },
            Control::Priority => match value {
                Value::String(s) => Ok(FieldValue::Priority(s.parse()?)),
                _ => Err(invalid("expected a priority string")),
            },
            Control::Progress => match value.as_i64() {
                Some(n) => Ok(FieldValue::Progress(clamp_progress(n))),
                None => Err(invalid("expected an integer")),
            },
            Control::Date => match value {
                Value::Null => Ok(FieldValue::Date(None)),
                Value::String(s) => parse_wire_date(s)
                    .map(|d| FieldValue::Date(Some(d)))
                    .ok_or_else(|| invalid("expected YYYY-MM-DD or an RFC 3339 timestamp")),
                _ => Err(invalid("expected a date string or null")),
            },
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Status(s) => f.write_str(s.as_str()),
            FieldValue::Priority(p) => f.write_str(p.as_str()),
            FieldValue::Progress(p) => write!(f, "{p}"),
            FieldValue::Date(Some(d)) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Date(None) => Ok(()),
        }
    }
}

/// Clamp an arbitrary integer into the 0..=100 progress range.
pub fn clamp_progress(n: i64) -> u8 {
    n.clamp(0, 100) as u8
}

fn parse_wire_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// Errors decoding a field map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("missing required field '{0}'")]
    Missing(&'static str),
    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// An ordered, partial map of field values. Used for create bodies, patches and
/// pending form state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues(BTreeMap<Field, FieldValue>);

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: FieldValue) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: Field, value: FieldValue) {
        self.0.insert(field, value);
    }

    pub fn remove(&mut self, field: Field) -> Option<FieldValue> {
        self.0.remove(&field)
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.0.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.0.iter().map(|(f, v)| (*f, v))
    }

    /// Overwrite with every entry from `other`.
    pub fn merge(&mut self, other: &FieldValues) {
        for (f, v) in other.iter() {
            self.0.insert(f, v.clone());
        }
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match self.get(field) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<Status> {
        match self.get(Field::Status) {
            Some(FieldValue::Status(s)) => Some(*s),
            _ => None,
        }
    }

    pub fn priority(&self) -> Option<Priority> {
        match self.get(Field::Priority) {
            Some(FieldValue::Priority(p)) => Some(*p),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<u8> {
        match self.get(Field::Progress) {
            Some(FieldValue::Progress(p)) => Some(*p),
            _ => None,
        }
    }

    /// `None` when the key is absent, `Some(None)` when it is explicitly null.
    pub fn date(&self, field: Field) -> Option<Option<NaiveDate>> {
        match self.get(field) {
            Some(FieldValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        self.iter()
            .map(|(f, v)| (f.wire_name().to_string(), v.to_json()))
            .collect()
    }

    /// Decode a JSON object against a descriptor table. Keys the table does not
    /// declare (including `id`, `createdAt`, `updatedAt`) are ignored.
    pub fn from_json(specs: &[FieldSpec], value: &Value) -> Result<FieldValues, ValueError> {
        let obj = value.as_object().ok_or(ValueError::NotAnObject)?;
        let mut out = FieldValues::new();
        for spec in specs {
            if let Some(v) = obj.get(spec.field.wire_name()) {
                out.insert(spec.field, FieldValue::from_json(spec, v)?);
            }
        }
        Ok(out)
    }
}

impl FromIterator<(Field, FieldValue)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (Field, FieldValue)>>(iter: I) -> Self {
        FieldValues(iter.into_iter().collect())
    }
}

impl Serialize for FieldValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Server-assigned identity and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMeta {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Common contract for tasks, projects and objectives.
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;

    /// Editable fields in display order.
    fn fields() -> &'static [FieldSpec];

    fn meta(&self) -> EntityMeta;

    fn id(&self) -> &str;

    fn title(&self) -> &str;

    fn status(&self) -> Status;

    fn value(&self, field: Field) -> Option<FieldValue>;

    /// Overwrite one field. Values whose type does not match the field are ignored.
    fn set_value(&mut self, field: Field, value: FieldValue);

    /// Build a record from its identity and a value map, defaulting whatever is absent.
    fn from_parts(meta: EntityMeta, values: &FieldValues) -> Self;

    fn set_updated_at(&mut self, at: DateTime<Utc>);

    fn priority(&self) -> Option<Priority> {
        None
    }

    fn progress(&self) -> Option<u8> {
        None
    }

    fn due_date(&self) -> Option<NaiveDate> {
        None
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.meta().updated_at
    }

    fn set_status(&mut self, status: Status) {
        self.set_value(Field::Status, FieldValue::Status(status));
    }

    fn spec(field: Field) -> Option<&'static FieldSpec> {
        Self::fields().iter().find(|s| s.field == field)
    }

    /// Every editable field's current value.
    fn values(&self) -> FieldValues {
        Self::fields()
            .iter()
            .filter_map(|s| self.value(s.field).map(|v| (s.field, v)))
            .collect()
    }

    /// Overwrite the fields present in a partial map.
    fn apply(&mut self, patch: &FieldValues) {
        for (field, value) in patch.iter() {
            if Self::spec(field).is_some() {
                self.set_value(field, value.clone());
            }
        }
    }

    /// Template for an "add new" form.
    fn default_values() -> FieldValues {
        Self::fields()
            .iter()
            .map(|s| (s.field, s.default_value()))
            .collect()
    }
}

fn text_or_default(values: &FieldValues, field: Field) -> String {
    values.text(field).unwrap_or_default().to_string()
}

/// A single unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn fields() -> &'static [FieldSpec] {
        TASK_FIELDS
    }

    fn meta(&self) -> EntityMeta {
        EntityMeta {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> Status {
        self.status
    }

    fn value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Title => Some(FieldValue::Text(self.title.clone())),
            Field::Description => Some(FieldValue::Text(self.description.clone())),
            Field::Status => Some(FieldValue::Status(self.status)),
            _ => None,
        }
    }

    fn set_value(&mut self, field: Field, value: FieldValue) {
        match (field, value) {
            (Field::Title, FieldValue::Text(s)) => self.title = s,
            (Field::Description, FieldValue::Text(s)) => self.description = s,
            (Field::Status, FieldValue::Status(s)) => self.status = s,
            _ => {}
        }
    }

    fn from_parts(meta: EntityMeta, values: &FieldValues) -> Self {
        Task {
            id: meta.id,
            title: text_or_default(values, Field::Title),
            description: text_or_default(values, Field::Description),
            status: values.status().unwrap_or_default(),
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        }
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// A prioritised body of work with progress and an optional due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub progress: u8,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn fields() -> &'static [FieldSpec] {
        PROJECT_FIELDS
    }

    fn meta(&self) -> EntityMeta {
        EntityMeta {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> Status {
        self.status
    }

    fn value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Title => Some(FieldValue::Text(self.title.clone())),
            Field::Description => Some(FieldValue::Text(self.description.clone())),
            Field::Status => Some(FieldValue::Status(self.status)),
            Field::Priority => Some(FieldValue::Priority(self.priority)),
            Field::Progress => Some(FieldValue::Progress(self.progress)),
            Field::DueDate => Some(FieldValue::Date(self.due_date)),
            Field::StartOn | Field::Started => None,
        }
    }

    fn set_value(&mut self, field: Field, value: FieldValue) {
        match (field, value) {
            (Field::Title, FieldValue::Text(s)) => self.title = s,
            (Field::Description, FieldValue::Text(s)) => self.description = s,
            (Field::Status, FieldValue::Status(s)) => self.status = s,
            (Field::Priority, FieldValue::Priority(p)) => self.priority = p,
            (Field::Progress, FieldValue::Progress(p)) => self.progress = p.min(100),
            (Field::DueDate, FieldValue::Date(d)) => self.due_date = d,
            _ => {}
        }
    }

    fn from_parts(meta: EntityMeta, values: &FieldValues) -> Self {
        Project {
            id: meta.id,
            title: text_or_default(values, Field::Title),
            description: text_or_default(values, Field::Description),
            status: values.status().unwrap_or_default(),
            priority: values.priority().unwrap_or_default(),
            progress: values.progress().unwrap_or(0),
            due_date: values.date(Field::DueDate).flatten(),
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        }
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.priority)
    }

    fn progress(&self) -> Option<u8> {
        Some(self.progress)
    }

    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }
}

/// A goal tracked like a project, with optional start dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub progress: u8,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_on: Option<NaiveDate>,
    #[serde(default)]
    pub started: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Objective {
    const KIND: EntityKind = EntityKind::Objective;

    fn fields() -> &'static [FieldSpec] {
        OBJECTIVE_FIELDS
    }

    fn meta(&self) -> EntityMeta {
        EntityMeta {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> Status {
        self.status
    }

    fn value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Title => Some(FieldValue::Text(self.title.clone())),
            Field::Description => Some(FieldValue::Text(self.description.clone())),
            Field::Status => Some(FieldValue::Status(self.status)),
            Field::Priority => Some(FieldValue::Priority(self.priority)),
            Field::Progress => Some(FieldValue::Progress(self.progress)),
            Field::DueDate => Some(FieldValue::Date(self.due_date)),
            Field::StartOn => Some(FieldValue::Date(self.start_on)),
            Field::Started => Some(FieldValue::Date(self.started)),
        }
    }

    fn set_value(&mut self, field: Field, value: FieldValue) {
        match (field, value) {
            (Field::Title, FieldValue::Text(s)) => self.title = s,
            (Field::Description, FieldValue::Text(s)) => self.description = s,
            (Field::Status, FieldValue::Status(s)) => self.status = s,
            (Field::Priority, FieldValue::Priority(p)) => self.priority = p,
            (Field::Progress, FieldValue::Progress(p)) => self.progress = p.min(100),
            (Field::DueDate, FieldValue::Date(d)) => self.due_date = d,
            (Field::StartOn, FieldValue::Date(d)) => self.start_on = d,
            (Field::Started, FieldValue::Date(d)) => self.started = d,
            _ => {}
        }
    }

    fn from_parts(meta: EntityMeta, values: &FieldValues) -> Self {
        Objective {
            id: meta.id,
            title: text_or_default(values, Field::Title),
            description: text_or_default(values, Field::Description),
            status: values.status().unwrap_or_default(),
            priority: values.priority().unwrap_or_default(),
            progress: values.progress().unwrap_or(0),
            due_date: values.date(Field::DueDate).flatten(),
            start_on: values.date(Field::StartOn).flatten(),
            started: values.date(Field::Started).flatten(),
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        }
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.priority)
    }

    fn progress(&self) -> Option<u8> {
        Some(self.progress)
    }

    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta() -> EntityMeta {
        let at = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        EntityMeta {
            id: "p-1".into(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn project_serialises_with_camel_case_keys() {
        let p = Project::from_parts(
            meta(),
            &FieldValues::new()
                .with(Field::Title, FieldValue::Text("Launch".into()))
                .with(Field::DueDate, FieldValue::Date(NaiveDate::from_ymd_opt(2025, 4, 1))),
        );
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["dueDate"], "2025-04-01");
        assert_eq!(v["priority"], "medium");
        assert_eq!(v["progress"], 0);
        assert_eq!(v["status"], "todo");
        assert!(v.get("createdAt").is_some());
    }

    #[test]
    fn decode_ignores_identity_and_unknown_keys() {
        let body = json!({
            "id": "forged",
            "createdAt": "2020-01-01T00:00:00Z",
            "title": "Write spec",
            "colour": "red"
        });
        let values = FieldValues::from_json(Task::fields(), &body).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values.text(Field::Title), Some("Write spec"));
    }

    #[test]
    fn decode_rejects_values_outside_closed_enums() {
        let err = FieldValues::from_json(Project::fields(), &json!({"status": "blocked"}))
            .unwrap_err();
        assert_eq!(err, ValueError::Field(FieldError::UnknownStatus("blocked".into())));

        let err = FieldValues::from_json(Project::fields(), &json!({"priority": "urgent"}))
            .unwrap_err();
        assert!(matches!(err, ValueError::Field(FieldError::UnknownPriority(_))));
    }

    #[test]
    fn decode_dates_accepts_null_iso_and_timestamps() {
        let v = FieldValues::from_json(
            Objective::fields(),
            &json!({"dueDate": null, "startOn": "2025-05-02", "started": "2025-05-03T08:30:00.000Z"}),
        )
        .unwrap();
        assert_eq!(v.date(Field::DueDate), Some(None));
        assert_eq!(v.date(Field::StartOn), Some(NaiveDate::from_ymd_opt(2025, 5, 2)));
        assert_eq!(v.date(Field::Started), Some(NaiveDate::from_ymd_opt(2025, 5, 3)));
        assert!(FieldValues::from_json(Objective::fields(), &json!({"dueDate": "soon"})).is_err());
    }

    #[test]
    fn decode_clamps_progress() {
        let v = FieldValues::from_json(Project::fields(), &json!({"progress": 140})).unwrap();
        assert_eq!(v.progress(), Some(100));
        assert!(FieldValues::from_json(Project::fields(), &json!({"progress": "ten"})).is_err());
    }

    #[test]
    fn apply_overwrites_only_patched_fields() {
        let mut p = Project::from_parts(
            meta(),
            &FieldValues::new()
                .with(Field::Title, FieldValue::Text("Old".into()))
                .with(Field::Description, FieldValue::Text("keep".into())),
        );
        p.apply(&FieldValues::new().with(Field::Title, FieldValue::Text("New".into())));
        assert_eq!(p.title, "New");
        assert_eq!(p.description, "keep");
        assert_eq!(p.id, "p-1");
    }

    #[test]
    fn task_ignores_fields_it_does_not_declare() {
        let mut t = Task::from_parts(meta(), &FieldValues::new());
        t.apply(&FieldValues::new().with(Field::Priority, FieldValue::Priority(Priority::High)));
        assert_eq!(t.values().len(), 3);
        assert_eq!(t.priority(), None);
    }

    #[test]
    fn default_values_follow_descriptor_table() {
        let d = Objective::default_values();
        assert_eq!(d.status(), Some(Status::Todo));
        assert_eq!(d.priority(), Some(Priority::Medium));
        assert_eq!(d.progress(), Some(0));
        assert_eq!(d.date(Field::StartOn), Some(None));
        assert_eq!(Task::default_values().len(), 3);
    }

    #[test]
    fn field_values_serialise_as_wire_map() {
        let v = FieldValues::new()
            .with(Field::Status, FieldValue::Status(Status::InProgress))
            .with(Field::DueDate, FieldValue::Date(None));
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!({"status": "in_progress", "dueDate": null})
        );
    }
}
