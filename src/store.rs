//! Client-side cache of one entity collection.
//!
//! Every operation is split in two halves. [`EntityStore::begin`] runs when the call
//! is issued and [`EntityStore::finish`] runs when its result arrives. The dashboard
//! issues calls on a tokio task and feeds completions back in arrival order; the CLI
//! just awaits [`EntityStore::execute`], which does both halves.
//!
//! After a successful mutation the store applies the entity the server returned and
//! does not re-fetch. Failures set a generic message, leave the list untouched and
//! are logged; they are never retried or propagated.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::{ClientError, CollectionApi};
use crate::entity::{Entity, FieldValues};
use crate::fields::EntityKind;

/// A call against the remote collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchAll,
    Add(FieldValues),
    Update { id: String, patch: FieldValues },
    Delete { id: String },
}

/// Generic message shown when an operation fails. The cause only goes to the log.
fn failure_message(verb: &str, kind: EntityKind) -> String {
    if verb == "fetch" {
        format!("Failed to fetch {}", kind.collection())
    } else {
        format!("Failed to {verb} {}", kind.noun())
    }
}

/// The result of a [`Command`], ready to be applied to a store.
#[derive(Debug)]
pub enum Completion<E> {
    Fetched(Result<Vec<E>, ClientError>),
    Added(Result<E, ClientError>),
    Updated(Result<E, ClientError>),
    Deleted { id: String, result: Result<(), ClientError> },
}

/// Perform a command without touching any store. Safe to run on another task.
pub async fn run_command<E: Entity>(api: Arc<dyn CollectionApi<E>>, cmd: Command) -> Completion<E> {
    match cmd {
        Command::FetchAll => Completion::Fetched(api.list().await),
        Command::Add(values) => Completion::Added(api.create(&values).await),
        Command::Update { id, patch } => Completion::Updated(api.update(&id, &patch).await),
        Command::Delete { id } => {
            let result = api.delete(&id).await;
            Completion::Deleted { id, result }
        }
    }
}

pub struct EntityStore<E: Entity> {
    api: Arc<dyn CollectionApi<E>>,
    items: Vec<E>,
    in_flight: usize,
    error: Option<String>,
}

impl<E: Entity> EntityStore<E> {
    pub fn new(api: Arc<dyn CollectionApi<E>>) -> Self {
        EntityStore {
            api,
            items: Vec::new(),
            in_flight: 0,
            error: None,
        }
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.items.iter().find(|e| e.id() == id)
    }

    /// True while any issued command has not finished.
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn api(&self) -> Arc<dyn CollectionApi<E>> {
        Arc::clone(&self.api)
    }

    /// First half of an operation: clear the previous error and mark a call in flight.
    pub fn begin(&mut self, cmd: &Command) {
        debug!(kind = E::KIND.noun(), ?cmd, "store call issued");
        self.error = None;
        self.in_flight += 1;
    }

    /// Second half: apply a result. Called once per `begin`, in arrival order.
    pub fn finish(&mut self, completion: Completion<E>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion {
            Completion::Fetched(Ok(items)) => {
                debug!(kind = E::KIND.noun(), count = items.len(), "fetched");
                self.items = items;
            }
            Completion::Added(Ok(entity)) => {
                self.items.insert(0, entity);
            }
            Completion::Updated(Ok(entity)) => {
                if let Some(slot) = self.items.iter_mut().find(|e| e.id() == entity.id()) {
                    *slot = entity;
                }
            }
            Completion::Deleted { id, result: Ok(()) } => {
                self.items.retain(|e| e.id() != id);
            }
            Completion::Fetched(Err(e)) => self.fail("fetch", e),
            Completion::Added(Err(e)) => self.fail("add", e),
            Completion::Updated(Err(e)) => self.fail("update", e),
            Completion::Deleted { result: Err(e), .. } => self.fail("delete", e),
        }
    }

    fn fail(&mut self, verb: &str, cause: ClientError) {
        let message = failure_message(verb, E::KIND);
        warn!(kind = E::KIND.noun(), error = %cause, "{message}");
        self.error = Some(message);
    }

    /// Run a command to completion against this store.
    pub async fn execute(&mut self, cmd: Command) {
        self.begin(&cmd);
        let completion = run_command(self.api(), cmd).await;
        self.finish(completion);
    }

    pub async fn fetch_all(&mut self) {
        self.execute(Command::FetchAll).await;
    }

    pub async fn add(&mut self, values: FieldValues) {
        self.execute(Command::Add(values)).await;
    }

    pub async fn update(&mut self, id: &str, patch: FieldValues) {
        self.execute(Command::Update {
            id: id.to_string(),
            patch,
        })
        .await;
    }

    pub async fn delete(&mut self, id: &str) {
        self.execute(Command::Delete { id: id.to_string() }).await;
    }
}
