//! Command implementations for the CLI interface.
//!
//! `serve` runs the collection server, `ui` the dashboard. The item commands go
//! through the same HTTP stores the dashboard uses, so they need a running server.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use clap_complete::{generate, Shell};
use tokio::runtime::Handle;
use tracing::info;

use crate::client::{build_http_client, CollectionApi, HttpCollection};
use crate::config::{ClientConfig, ServerConfig};
use crate::dates::{format_date, parse_date_input, today, truncate};
use crate::db::Database;
use crate::entity::{clamp_progress, Entity, Field, FieldSpec, FieldValue, FieldValues, Objective, Project, Task};
use crate::fields::{DeletePolicy, EntityKind, Priority, Status};
use crate::server::{serve, AppState};
use crate::store::EntityStore;
use crate::tui::run::run_dashboard;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the collection server.
    Serve {
        /// Address to listen on, e.g. 127.0.0.1:7878.
        #[arg(long)]
        listen: Option<String>,
        /// What DELETE of an unknown id does: idempotent (204) or strict (404).
        #[arg(long, value_enum)]
        delete_policy: Option<DeletePolicy>,
    },

    /// Launch the interactive dashboard.
    Ui,

    /// List the items of one kind, newest first.
    List {
        #[arg(value_enum)]
        kind: EntityKind,
        /// Only show items with this status (todo, "in progress", completed).
        #[arg(long, value_parser = Status::parse_lenient)]
        status: Option<Status>,
    },

    /// Add a new item.
    Add {
        #[arg(value_enum)]
        kind: EntityKind,
        /// Short title for the item.
        title: String,
        #[command(flatten)]
        fields: ItemFields,
    },

    /// Change fields of an item. Only the fields given are sent.
    Update {
        #[arg(value_enum)]
        kind: EntityKind,
        /// Item id, unique id prefix, or exact title.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: ItemFields,
        /// Clear the due date.
        #[arg(long)]
        clear_due: bool,
        /// Clear the planned start date.
        #[arg(long)]
        clear_start_on: bool,
        /// Clear the actual start date.
        #[arg(long)]
        clear_started: bool,
    },

    /// Mark an item as completed.
    Complete {
        #[arg(value_enum)]
        kind: EntityKind,
        /// Item id, unique id prefix, or exact title.
        id: String,
    },

    /// Delete an item.
    Delete {
        #[arg(value_enum)]
        kind: EntityKind,
        /// Item id, unique id prefix, or exact title.
        id: String,
    },

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Optional field values shared by `add` and `update`.
#[derive(Args, Debug, Default, Clone)]
pub struct ItemFields {
    /// Longer description.
    #[arg(long)]
    pub desc: Option<String>,
    /// todo, in_progress or completed. "In Progress" and "in-progress" also work.
    #[arg(long, value_parser = Status::parse_lenient)]
    pub status: Option<Status>,
    /// Projects and objectives only.
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,
    /// Percent complete, clamped to 0-100. Projects and objectives only.
    #[arg(long)]
    pub progress: Option<i64>,
    /// Due date: YYYY-MM-DD, "today", "tomorrow", "in 3d", "next fri", "eom".
    #[arg(long)]
    pub due: Option<String>,
    /// Planned start date. Objectives only.
    #[arg(long)]
    pub start_on: Option<String>,
    /// Actual start date. Objectives only.
    #[arg(long)]
    pub started: Option<String>,
}

fn kind_fields(kind: EntityKind) -> &'static [FieldSpec] {
    match kind {
        EntityKind::Task => Task::fields(),
        EntityKind::Project => Project::fields(),
        EntityKind::Objective => Objective::fields(),
    }
}

fn parse_date_arg(s: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    parse_date_input(s, today).ok_or_else(|| anyhow!("could not understand date '{s}'"))
}

/// Turn command-line values into a field map, rejecting fields `kind` does not have.
pub fn build_values(
    kind: EntityKind,
    title: Option<String>,
    fields: &ItemFields,
    clear: &[Field],
    today: NaiveDate,
) -> anyhow::Result<FieldValues> {
    let specs = kind_fields(kind);
    let mut values = FieldValues::new();
    let mut put = |field: Field, value: FieldValue| -> anyhow::Result<()> {
        if !specs.iter().any(|s| s.field == field) {
            bail!("{} have no {} field", kind.collection(), field.wire_name());
        }
        values.insert(field, value);
        Ok(())
    };

    if let Some(t) = title {
        put(Field::Title, FieldValue::Text(t))?;
    }
    if let Some(d) = &fields.desc {
        put(Field::Description, FieldValue::Text(d.clone()))?;
    }
    if let Some(s) = fields.status {
        put(Field::Status, FieldValue::Status(s))?;
    }
    if let Some(p) = fields.priority {
        put(Field::Priority, FieldValue::Priority(p))?;
    }
    if let Some(n) = fields.progress {
        put(Field::Progress, FieldValue::Progress(clamp_progress(n)))?;
    }
    for (field, arg) in [
        (Field::DueDate, &fields.due),
        (Field::StartOn, &fields.start_on),
        (Field::Started, &fields.started),
    ] {
        if let Some(s) = arg {
            put(field, FieldValue::Date(Some(parse_date_arg(s, today)?)))?;
        }
    }
    for field in clear {
        put(*field, FieldValue::Date(None))?;
    }
    Ok(values)
}

/// Find an item by id, unique id prefix, or case-insensitive title.
pub fn resolve_identifier<E: Entity>(items: &[E], identifier: &str) -> Result<String, String> {
    if let Some(item) = items.iter().find(|e| e.id() == identifier) {
        return Ok(item.id().to_string());
    }

    let by_prefix: Vec<&E> = items.iter().filter(|e| e.id().starts_with(identifier)).collect();
    if by_prefix.len() == 1 {
        return Ok(by_prefix[0].id().to_string());
    }

    let matches: Vec<&E> = items
        .iter()
        .filter(|e| e.title().to_lowercase() == identifier.to_lowercase())
        .collect();
    match matches.len() {
        0 if by_prefix.len() > 1 => Err(format!(
            "Id prefix '{identifier}' matches {} {}; use more characters",
            by_prefix.len(),
            E::KIND.collection()
        )),
        0 => Err(format!("No {} found with id or title '{identifier}'", E::KIND.noun())),
        1 => Ok(matches[0].id().to_string()),
        _ => {
            let mut error_msg = format!("Multiple {} found with title '{identifier}':\n", E::KIND.collection());
            for item in matches {
                error_msg.push_str(&format!("  {}  {}\n", short_id(item.id()), item.title()));
            }
            error_msg.push_str("Please use the id instead.");
            Err(error_msg)
        }
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn print_table<E: Entity>(items: &[&E]) {
    if items.is_empty() {
        println!("No {}.", E::KIND.collection());
        return;
    }
    println!(
        "{:<8}  {:<11}  {:<8}  {:>4}  {:<10}  {}",
        "ID", "Status", "Priority", "Prog", "Due", "Title"
    );
    for item in items {
        let priority = item.priority().map(|p| p.label()).unwrap_or("-");
        let progress = item.progress().map(|p| format!("{p}%")).unwrap_or_else(|| "-".into());
        println!(
            "{:<8}  {:<11}  {:<8}  {:>4}  {:<10}  {}",
            short_id(item.id()),
            item.status().label(),
            priority,
            progress,
            format_date(item.due_date()),
            truncate(item.title(), 60)
        );
    }
}

/// HTTP access to the collection server, one store per call.
pub struct Remote {
    http: reqwest::Client,
    base_url: String,
}

impl Remote {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        Ok(Remote {
            http: build_http_client(config).context("building HTTP client")?,
            base_url: config.base_url.clone(),
        })
    }

    pub fn api<E: Entity>(&self) -> Arc<dyn CollectionApi<E>> {
        Arc::new(HttpCollection::<E>::new(self.http.clone(), &self.base_url))
    }

    pub fn store<E: Entity>(&self) -> EntityStore<E> {
        EntityStore::new(self.api())
    }
}

/// Stores swallow failures into `error`; the CLI turns that into an exit code.
fn ensure_ok<E: Entity>(store: &EntityStore<E>) -> anyhow::Result<()> {
    match store.error() {
        Some(message) => bail!("{message}"),
        None => Ok(()),
    }
}

async fn fetch_and_resolve<E: Entity>(
    remote: &Remote,
    identifier: &str,
) -> anyhow::Result<(EntityStore<E>, String)> {
    let mut store = remote.store::<E>();
    store.fetch_all().await;
    ensure_ok(&store)?;
    let id = resolve_identifier(store.items(), identifier).map_err(|e| anyhow!(e))?;
    Ok((store, id))
}

async fn list_items<E: Entity>(remote: &Remote, status: Option<Status>) -> anyhow::Result<()> {
    let mut store = remote.store::<E>();
    store.fetch_all().await;
    ensure_ok(&store)?;
    let items: Vec<&E> = store
        .items()
        .iter()
        .filter(|e| status.map_or(true, |s| e.status() == s))
        .collect();
    print_table(&items);
    Ok(())
}

async fn add_item<E: Entity>(remote: &Remote, values: FieldValues) -> anyhow::Result<()> {
    let mut store = remote.store::<E>();
    store.add(values).await;
    ensure_ok(&store)?;
    let item = store
        .items()
        .first()
        .ok_or_else(|| anyhow!("server returned no {}", E::KIND.noun()))?;
    println!("Added {} {}: {}", E::KIND.noun(), short_id(item.id()), item.title());
    Ok(())
}

async fn update_item<E: Entity>(remote: &Remote, identifier: &str, patch: FieldValues) -> anyhow::Result<()> {
    if patch.is_empty() {
        bail!("nothing to update; pass at least one field");
    }
    let (mut store, id) = fetch_and_resolve::<E>(remote, identifier).await?;
    store.update(&id, patch).await;
    ensure_ok(&store)?;
    if let Some(item) = store.get(&id) {
        println!(
            "Updated {} {}: {} [{}]",
            E::KIND.noun(),
            short_id(item.id()),
            item.title(),
            item.status().label()
        );
    }
    Ok(())
}

async fn delete_item<E: Entity>(remote: &Remote, identifier: &str) -> anyhow::Result<()> {
    let (mut store, id) = fetch_and_resolve::<E>(remote, identifier).await?;
    let title = store.get(&id).map(|e| e.title().to_string()).unwrap_or_default();
    store.delete(&id).await;
    ensure_ok(&store)?;
    println!("Deleted {} {}: {}", E::KIND.noun(), short_id(&id), title);
    Ok(())
}

/// Run the collection server until it fails.
pub async fn cmd_serve(config: &ServerConfig) -> anyhow::Result<()> {
    let db = Database::open(&config.database)
        .with_context(|| format!("opening database {}", config.database.display()))?;
    info!(database = %config.database.display(), "database ready");
    let state = AppState {
        db,
        delete_policy: config.delete_policy,
    };
    serve(&config.listen, state)
        .await
        .with_context(|| format!("serving on {}", config.listen))
}

/// Launch the dashboard. Blocks the calling thread; store calls run on `runtime`.
pub fn cmd_ui(config: &ClientConfig, runtime: Handle) -> anyhow::Result<()> {
    let remote = Remote::new(config)?;
    run_dashboard(
        runtime,
        remote.api::<Task>(),
        remote.api::<Project>(),
        remote.api::<Objective>(),
    )
    .context("dashboard terminal error")
}

pub async fn cmd_list(remote: &Remote, kind: EntityKind, status: Option<Status>) -> anyhow::Result<()> {
    match kind {
        EntityKind::Task => list_items::<Task>(remote, status).await,
        EntityKind::Project => list_items::<Project>(remote, status).await,
        EntityKind::Objective => list_items::<Objective>(remote, status).await,
    }
}

pub async fn cmd_add(remote: &Remote, kind: EntityKind, title: String, fields: &ItemFields) -> anyhow::Result<()> {
    let values = build_values(kind, Some(title), fields, &[], today())?;
    match kind {
        EntityKind::Task => add_item::<Task>(remote, values).await,
        EntityKind::Project => add_item::<Project>(remote, values).await,
        EntityKind::Objective => add_item::<Objective>(remote, values).await,
    }
}

pub async fn cmd_update(
    remote: &Remote,
    kind: EntityKind,
    id: &str,
    patch: FieldValues,
) -> anyhow::Result<()> {
    match kind {
        EntityKind::Task => update_item::<Task>(remote, id, patch).await,
        EntityKind::Project => update_item::<Project>(remote, id, patch).await,
        EntityKind::Objective => update_item::<Objective>(remote, id, patch).await,
    }
}

pub async fn cmd_complete(remote: &Remote, kind: EntityKind, id: &str) -> anyhow::Result<()> {
    let patch = FieldValues::new().with(Field::Status, FieldValue::Status(Status::Completed));
    cmd_update(remote, kind, id, patch).await
}

pub async fn cmd_delete(remote: &Remote, kind: EntityKind, id: &str) -> anyhow::Result<()> {
    match kind {
        EntityKind::Task => delete_item::<Task>(remote, id).await,
        EntityKind::Project => delete_item::<Project>(remote, id).await,
        EntityKind::Objective => delete_item::<Objective>(remote, id).await,
    }
}

/// Generate shell completions.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityMeta;
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn task(id: &str, title: &str) -> Task {
        let now = Utc::now();
        Task::from_parts(
            EntityMeta { id: id.into(), created_at: now, updated_at: now },
            &FieldValues::new().with(Field::Title, FieldValue::Text(title.into())),
        )
    }

    #[test]
    fn values_only_carry_given_fields() {
        let fields = ItemFields {
            priority: Some(Priority::High),
            progress: Some(140),
            due: Some("tomorrow".into()),
            ..Default::default()
        };
        let values = build_values(EntityKind::Project, None, &fields, &[], today()).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values.priority(), Some(Priority::High));
        assert_eq!(values.progress(), Some(100));
        assert_eq!(values.date(Field::DueDate), Some(NaiveDate::from_ymd_opt(2025, 1, 16)));
    }

    #[test]
    fn fields_the_kind_lacks_are_rejected() {
        let fields = ItemFields {
            priority: Some(Priority::Low),
            ..Default::default()
        };
        let err = build_values(EntityKind::Task, Some("x".into()), &fields, &[], today()).unwrap_err();
        assert!(err.to_string().contains("tasks have no priority"));

        let err = build_values(EntityKind::Project, None, &ItemFields::default(), &[Field::StartOn], today())
            .unwrap_err();
        assert!(err.to_string().contains("startOn"));
    }

    #[test]
    fn clear_flags_send_null_dates() {
        let values =
            build_values(EntityKind::Objective, None, &ItemFields::default(), &[Field::DueDate], today()).unwrap();
        assert_eq!(values.date(Field::DueDate), Some(None));
    }

    #[test]
    fn bad_dates_are_reported() {
        let fields = ItemFields {
            due: Some("someday".into()),
            ..Default::default()
        };
        let err = build_values(EntityKind::Project, None, &fields, &[], today()).unwrap_err();
        assert!(err.to_string().contains("someday"));
    }

    #[test]
    fn identifiers_resolve_by_id_prefix_or_title() {
        let items = vec![
            task("a1b2c3d4-0000", "Write spec"),
            task("a1ffffff-0000", "Review"),
            task("99999999-0000", "review"),
        ];
        assert_eq!(resolve_identifier(&items, "a1b2c3d4-0000").unwrap(), "a1b2c3d4-0000");
        assert_eq!(resolve_identifier(&items, "a1b").unwrap(), "a1b2c3d4-0000");
        assert_eq!(resolve_identifier(&items, "WRITE SPEC").unwrap(), "a1b2c3d4-0000");
        assert!(resolve_identifier(&items, "a1").unwrap_err().contains("matches 2"));
        assert!(resolve_identifier(&items, "review").unwrap_err().contains("Multiple"));
        assert!(resolve_identifier(&items, "nope").unwrap_err().contains("No task"));
    }
}
