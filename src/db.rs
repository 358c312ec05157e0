//! SQLite persistence for the three entity collections.
//!
//! One table per kind, named after the collection (`tasks`, `projects`, `objectives`).
//! Columns come from each entity's descriptor table, so adding a field to an entity
//! is enough to get it stored.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tracing::debug;

use crate::entity::{Control, Entity, EntityMeta, FieldSpec, FieldValue, FieldValues, Objective, Project, Task};
use crate::error::ServiceError;

/// Thread-safe handle to the database file.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database file and make sure every table exists.
    pub fn open(path: &Path) -> Result<Self, ServiceError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, ServiceError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, ServiceError> {
        create_table::<Task>(&conn)?;
        create_table::<Project>(&conn)?;
        create_table::<Objective>(&conn)?;
        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ServiceError> {
        self.conn
            .lock()
            .map_err(|e| ServiceError::Internal(format!("database lock poisoned: {e}")))
    }

    /// All rows, newest first. Rows created in the same microsecond come back in
    /// reverse insertion order.
    pub fn list<E: Entity>(&self) -> Result<Vec<E>, ServiceError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, seq DESC",
            select_columns::<E>(),
            E::KIND.collection()
        );
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map([], read_raw_row::<E>)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(decode_row::<E>).collect()
    }

    pub fn get<E: Entity>(&self, id: &str) -> Result<E, ServiceError> {
        let conn = self.lock()?;
        fetch_one::<E>(&conn, id)?.ok_or_else(|| ServiceError::not_found(E::KIND.noun(), id))
    }

    /// Create a row from a (possibly partial) field map. Title and description are
    /// required; everything else falls back to its default.
    pub fn insert<E: Entity>(&self, values: &FieldValues) -> Result<E, ServiceError> {
        if let Some(missing) = E::fields()
            .iter()
            .find(|s| s.required && !values.contains(s.field))
        {
            return Err(ServiceError::Validation(format!(
                "missing required field '{}'",
                missing.field.wire_name()
            )));
        }

        let mut merged = E::default_values();
        merged.merge(values);
        let now = now_micros();
        let entity = E::from_parts(
            EntityMeta {
                id: uuid::Uuid::new_v4().to_string(),
                created_at: now,
                updated_at: now,
            },
            &merged,
        );

        let conn = self.lock()?;
        let names: Vec<&str> = E::fields().iter().map(|s| s.field.column()).collect();
        let sql = format!(
            "INSERT INTO {} (id, created_at, updated_at, {}) VALUES ({})",
            E::KIND.collection(),
            names.join(", "),
            placeholders(names.len() + 3)
        );
        let mut params = vec![
            SqlValue::Text(entity.id().to_string()),
            SqlValue::Text(encode_timestamp(now)),
            SqlValue::Text(encode_timestamp(now)),
        ];
        params.extend(column_values(&entity));
        conn.execute(&sql, params_from_iter(params))?;
        debug!(kind = E::KIND.noun(), id = entity.id(), "inserted");
        Ok(entity)
    }

    /// Merge a partial field map into a stored row. `updatedAt` always moves forward,
    /// by at least one microsecond.
    pub fn update<E: Entity>(&self, id: &str, patch: &FieldValues) -> Result<E, ServiceError> {
        let conn = self.lock()?;
        let mut entity = fetch_one::<E>(&conn, id)?
            .ok_or_else(|| ServiceError::not_found(E::KIND.noun(), id))?;

        entity.apply(patch);
        let previous = entity.updated_at();
        let bumped = now_micros().max(previous + Duration::microseconds(1));
        entity.set_updated_at(bumped);

        let assignments: Vec<String> = E::fields()
            .iter()
            .map(|s| format!("{} = ?", s.field.column()))
            .collect();
        let sql = format!(
            "UPDATE {} SET updated_at = ?, {} WHERE id = ?",
            E::KIND.collection(),
            assignments.join(", ")
        );
        let mut params = vec![SqlValue::Text(encode_timestamp(bumped))];
        params.extend(column_values(&entity));
        params.push(SqlValue::Text(id.to_string()));
        conn.execute(&sql, params_from_iter(params))?;
        debug!(kind = E::KIND.noun(), id, "updated");
        Ok(entity)
    }

    /// Hard delete. Returns whether a row existed.
    pub fn delete<E: Entity>(&self, id: &str) -> Result<bool, ServiceError> {
        let conn = self.lock()?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", E::KIND.collection());
        let affected = conn.execute(&sql, [id])?;
        debug!(kind = E::KIND.noun(), id, affected, "deleted");
        Ok(affected > 0)
    }
}

fn create_table<E: Entity>(conn: &Connection) -> Result<(), ServiceError> {
    let columns: Vec<String> = E::fields()
        .iter()
        .map(|s| format!("{} {}", s.field.column(), column_type(s)))
        .collect();
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            {}
        )",
        E::KIND.collection(),
        columns.join(",\n            ")
    );
    conn.execute_batch(&sql)?;
    Ok(())
}

fn column_type(spec: &FieldSpec) -> &'static str {
    match spec.control {
        Control::Text | Control::Status | Control::Priority => "TEXT NOT NULL",
        Control::Progress => "INTEGER NOT NULL DEFAULT 0",
        Control::Date => "TEXT",
    }
}

fn select_columns<E: Entity>() -> String {
    let mut names = vec!["id", "created_at", "updated_at"];
    names.extend(E::fields().iter().map(|s| s.field.column()));
    names.join(", ")
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn fetch_one<E: Entity>(conn: &Connection, id: &str) -> Result<Option<E>, ServiceError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        select_columns::<E>(),
        E::KIND.collection()
    );
    let raw = conn.query_row(&sql, [id], read_raw_row::<E>).optional()?;
    raw.map(decode_row::<E>).transpose()
}

struct RawRow {
    id: String,
    created_at: String,
    updated_at: String,
    values: Vec<SqlValue>,
}

fn read_raw_row<E: Entity>(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    let values = (0..E::fields().len())
        .map(|i| row.get::<_, SqlValue>(i + 3))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(RawRow {
        id: row.get(0)?,
        created_at: row.get(1)?,
        updated_at: row.get(2)?,
        values,
    })
}

fn decode_row<E: Entity>(raw: RawRow) -> Result<E, ServiceError> {
    let mut values = FieldValues::new();
    for (spec, sql) in E::fields().iter().zip(raw.values) {
        values.insert(spec.field, decode_value(spec, sql)?);
    }
    let meta = EntityMeta {
        id: raw.id,
        created_at: decode_timestamp(&raw.created_at)?,
        updated_at: decode_timestamp(&raw.updated_at)?,
    };
    Ok(E::from_parts(meta, &values))
}

fn decode_value(spec: &FieldSpec, sql: SqlValue) -> Result<FieldValue, ServiceError> {
    let corrupt = || {
        ServiceError::Storage(format!(
            "unexpected value in column '{}'",
            spec.field.column()
        ))
    };
    let value = match (spec.control, sql) {
        (Control::Text, SqlValue::Text(s)) => FieldValue::Text(s),
        (Control::Status, SqlValue::Text(s)) => {
            FieldValue::Status(s.parse().map_err(|_| corrupt())?)
        }
        (Control::Priority, SqlValue::Text(s)) => {
            FieldValue::Priority(s.parse().map_err(|_| corrupt())?)
        }
        (Control::Progress, SqlValue::Integer(n)) => {
            FieldValue::Progress(crate::entity::clamp_progress(n))
        }
        (Control::Date, SqlValue::Null) => FieldValue::Date(None),
        (Control::Date, SqlValue::Text(s)) => FieldValue::Date(Some(
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| corrupt())?,
        )),
        _ => return Err(corrupt()),
    };
    Ok(value)
}

fn column_values<E: Entity>(entity: &E) -> Vec<SqlValue> {
    E::fields()
        .iter()
        .map(|s| match entity.value(s.field) {
            Some(FieldValue::Text(t)) => SqlValue::Text(t),
            Some(FieldValue::Status(st)) => SqlValue::Text(st.as_str().into()),
            Some(FieldValue::Priority(p)) => SqlValue::Text(p.as_str().into()),
            Some(FieldValue::Progress(p)) => SqlValue::Integer(p as i64),
            Some(FieldValue::Date(Some(d))) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
            Some(FieldValue::Date(None)) | None => SqlValue::Null,
        })
        .collect()
}

/// Stored timestamps are truncated to microseconds so a round trip through the
/// database returns exactly what the caller was given.
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// Fixed-width so that text ordering matches time ordering.
fn encode_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(s: &str) -> Result<DateTime<Utc>, ServiceError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ServiceError::Storage(format!("bad timestamp '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Field;
    use crate::fields::{Priority, Status};

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.into())
    }

    fn titled(title: &str) -> FieldValues {
        FieldValues::new()
            .with(Field::Title, text(title))
            .with(Field::Description, text(""))
    }

    #[test]
    fn insert_applies_defaults() {
        let db = Database::open_in_memory().unwrap();
        let p: Project = db.insert(&titled("Launch")).unwrap();
        assert_eq!(p.status, Status::Todo);
        assert_eq!(p.priority, Priority::Medium);
        assert_eq!(p.progress, 0);
        assert_eq!(p.due_date, None);
        assert_eq!(p.created_at, p.updated_at);
        assert!(!p.id.is_empty());
        assert_eq!(db.get::<Project>(&p.id).unwrap(), p);
    }

    #[test]
    fn insert_requires_title_and_description() {
        let db = Database::open_in_memory().unwrap();
        let only_title = FieldValues::new().with(Field::Title, text("x"));
        let err = db.insert::<Task>(&only_title).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("description")));
        assert!(db.list::<Task>().unwrap().is_empty());
    }

    #[test]
    fn list_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let a: Task = db.insert(&titled("a")).unwrap();
        let b: Task = db.insert(&titled("b")).unwrap();
        let c: Task = db.insert(&titled("c")).unwrap();
        let ids: Vec<String> = db.list::<Task>().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[test]
    fn update_merges_and_bumps_timestamp() {
        let db = Database::open_in_memory().unwrap();
        let o: Objective = db.insert(&titled("Grow")).unwrap();
        let patch = FieldValues::new()
            .with(Field::Progress, FieldValue::Progress(40))
            .with(Field::StartOn, FieldValue::Date(NaiveDate::from_ymd_opt(2025, 2, 1)));
        let updated: Objective = db.update(&o.id, &patch).unwrap();

        assert_eq!(updated.id, o.id);
        assert_eq!(updated.title, "Grow");
        assert_eq!(updated.progress, 40);
        assert_eq!(updated.start_on, NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!(updated.created_at, o.created_at);
        assert!(updated.updated_at > o.updated_at);
        assert_eq!(db.get::<Objective>(&o.id).unwrap(), updated);

        let again: Objective = db.update(&o.id, &FieldValues::new()).unwrap();
        assert!(again.updated_at > updated.updated_at);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.update::<Task>("missing", &FieldValues::new()).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn delete_reports_whether_row_existed() {
        let db = Database::open_in_memory().unwrap();
        let t: Task = db.insert(&titled("gone")).unwrap();
        assert!(db.delete::<Task>(&t.id).unwrap());
        assert!(!db.delete::<Task>(&t.id).unwrap());
        assert!(db.list::<Task>().unwrap().is_empty());
    }

    #[test]
    fn tables_are_independent() {
        let db = Database::open_in_memory().unwrap();
        let _: Task = db.insert(&titled("t")).unwrap();
        assert!(db.list::<Project>().unwrap().is_empty());
        assert_eq!(db.list::<Task>().unwrap().len(), 1);
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.db");
        let id = {
            let db = Database::open(&path).unwrap();
            db.insert::<Project>(&titled("persist")).unwrap().id
        };
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get::<Project>(&id).unwrap().title, "persist");
    }
}
