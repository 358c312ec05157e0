//! Modal layers shared by the table and card views: the action popover for one
//! item and the "add new" form.

use chrono::NaiveDate;
use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::entity::{Entity, FieldValues};
use crate::tui::form::{EntityForm, FormOutcome};
use crate::tui::popover::{ActionConfig, ActionPopover, Mutation};

/// What a view wants its owner to do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    /// Not a key the view cares about.
    Ignored,
    Handled,
    Mutate(Mutation),
    Create(FieldValues),
}

pub struct Overlay<E> {
    pub popover: ActionPopover<E>,
    /// Id of the item the popover was opened on.
    target: Option<String>,
    /// Default-new-item template. Without one there is no "add new".
    pub template: Option<FieldValues>,
    pub add_form: Option<EntityForm>,
}

impl<E: Entity> Overlay<E> {
    pub fn new(actions: Vec<ActionConfig<E>>) -> Self {
        Overlay {
            popover: ActionPopover::new(actions),
            target: None,
            template: None,
            add_form: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.popover.is_open() || self.add_form.is_some()
    }

    pub fn open_popover(&mut self, item: &E) {
        self.target = Some(item.id().to_string());
        self.popover.open();
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Open the add form from the template. Returns false when there is no template.
    pub fn open_add(&mut self) -> bool {
        match &self.template {
            Some(t) => {
                self.add_form = Some(EntityForm::add::<E>(t));
                true
            }
            None => false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, items: &[E], today: NaiveDate) -> ViewOutcome {
        if let Some(form) = self.add_form.as_mut() {
            return match form.handle_key(key, today) {
                FormOutcome::Continue => ViewOutcome::Handled,
                FormOutcome::Cancel => {
                    self.add_form = None;
                    ViewOutcome::Handled
                }
                FormOutcome::Submit => match form.values(today) {
                    Ok(values) => {
                        self.add_form = None;
                        ViewOutcome::Create(values)
                    }
                    Err(e) => {
                        form.error = Some(e);
                        ViewOutcome::Handled
                    }
                },
            };
        }

        if self.popover.is_open() {
            let item = self
                .target
                .as_deref()
                .and_then(|id| items.iter().find(|e| e.id() == id));
            let mutation = self.popover.handle_key(key, item, today);
            if !self.popover.is_open() {
                self.target = None;
            }
            return match mutation {
                Mutation::None => ViewOutcome::Handled,
                m => ViewOutcome::Mutate(m),
            };
        }

        ViewOutcome::Ignored
    }

    pub fn render(&self, f: &mut Frame, area: Rect, today: NaiveDate) {
        self.popover.render(f, area, today);
        if let Some(form) = &self.add_form {
            form.render(f, area, today);
        }
    }
}
