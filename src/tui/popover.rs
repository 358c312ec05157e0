//! Per-item action menu and its modify dialog.
//!
//! ```text
//! Closed ──open──▶ MenuOpen ──simple action──▶ Closed
//!                     │
//!                   Modify
//!                     ▼
//!                  Editing ──save / cancel──▶ Closed
//! ```
//!
//! Selecting an action never touches a store. It yields a [`Mutation`] that the
//! owner schedules.

use std::sync::Arc;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::entity::{Entity, Field, FieldValue, FieldValues};
use crate::fields::Status;
use crate::store::Command;
use crate::tui::colors::{DARK_RED, GOLD};
use crate::tui::form::{EntityForm, FormOutcome};
use crate::tui::utils::centered_rect_rows;

/// Visual treatment of an action button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Variant {
    #[default]
    Default,
    Destructive,
    Outline,
    Secondary,
    Ghost,
    Link,
}

impl Variant {
    fn style(self) -> Style {
        match self {
            Variant::Default => Style::default().fg(Color::White),
            Variant::Destructive => Style::default().fg(Color::LightRed),
            Variant::Outline => Style::default().fg(Color::Gray),
            Variant::Secondary => Style::default().fg(Color::Cyan),
            Variant::Ghost => Style::default().fg(Color::DarkGray),
            Variant::Link => Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
        }
    }
}

/// How the popover prepares the item before invoking an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// The item as displayed.
    Raw,
    /// A copy of the item with `status` replaced.
    StatusPatch(Status),
    /// Opens the modify dialog; the action receives the edited draft on save.
    Modify,
}

/// A store command produced by an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Update { id: String, patch: FieldValues },
    Delete { id: String },
    None,
}

impl Mutation {
    pub fn into_command(self) -> Option<Command> {
        match self {
            Mutation::Update { id, patch } => Some(Command::Update { id, patch }),
            Mutation::Delete { id } => Some(Command::Delete { id }),
            Mutation::None => None,
        }
    }
}

pub type ActionFn<E> = Arc<dyn Fn(&E) -> Mutation + Send + Sync>;

pub struct ActionConfig<E> {
    pub label: String,
    pub kind: ActionKind,
    pub variant: Variant,
    pub disabled: bool,
    /// Hint shown while the action is under the cursor.
    pub tooltip: Option<String>,
    pub action: ActionFn<E>,
}

impl<E> Clone for ActionConfig<E> {
    fn clone(&self) -> Self {
        ActionConfig {
            label: self.label.clone(),
            kind: self.kind,
            variant: self.variant,
            disabled: self.disabled,
            tooltip: self.tooltip.clone(),
            action: Arc::clone(&self.action),
        }
    }
}

impl<E> ActionConfig<E> {
    pub fn new(
        label: impl Into<String>,
        kind: ActionKind,
        action: impl Fn(&E) -> Mutation + Send + Sync + 'static,
    ) -> Self {
        ActionConfig {
            label: label.into(),
            kind,
            variant: Variant::Default,
            disabled: false,
            tooltip: None,
            action: Arc::new(action),
        }
    }

    pub fn variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

fn status_patch<E: Entity>(item: &E) -> Mutation {
    Mutation::Update {
        id: item.id().to_string(),
        patch: FieldValues::new().with(Field::Status, FieldValue::Status(item.status())),
    }
}

/// Modify, Mark In Progress, Mark Complete, then Update Progress when the entity
/// tracks progress, and Delete last.
pub fn standard_actions<E: Entity>() -> Vec<ActionConfig<E>> {
    let mut actions = vec![
        ActionConfig::new("Modify", ActionKind::Modify, |item: &E| Mutation::Update {
            id: item.id().to_string(),
            patch: item.values(),
        })
        .variant(Variant::Outline)
        .tooltip("Edit every field in a dialog"),
        ActionConfig::new(
            "Mark In Progress",
            ActionKind::StatusPatch(Status::InProgress),
            status_patch::<E>,
        )
        .variant(Variant::Secondary)
        .tooltip("Set status to In Progress"),
        ActionConfig::new(
            "Mark Complete",
            ActionKind::StatusPatch(Status::Completed),
            status_patch::<E>,
        )
        .tooltip("Set status to Completed"),
    ];
    if E::spec(Field::Progress).is_some() {
        actions.push(
            ActionConfig::new("Update Progress", ActionKind::Raw, |item: &E| {
                let next = item.progress().unwrap_or(0).saturating_add(10).min(100);
                Mutation::Update {
                    id: item.id().to_string(),
                    patch: FieldValues::new().with(Field::Progress, FieldValue::Progress(next)),
                }
            })
            .variant(Variant::Secondary)
            .tooltip("Add 10% progress, up to 100%"),
        );
    }
    actions.push(
        ActionConfig::new("Delete", ActionKind::Raw, |item: &E| Mutation::Delete {
            id: item.id().to_string(),
        })
        .variant(Variant::Destructive)
        .tooltip("Delete permanently"),
    );
    actions
}

pub enum PopoverState<E> {
    Closed,
    MenuOpen { cursor: usize },
    /// `original` is the item as it was when the dialog opened.
    Editing { original: E, form: EntityForm },
}

pub struct ActionPopover<E> {
    pub actions: Vec<ActionConfig<E>>,
    pub state: PopoverState<E>,
}

impl<E: Entity> ActionPopover<E> {
    pub fn new(actions: Vec<ActionConfig<E>>) -> Self {
        ActionPopover {
            actions,
            state: PopoverState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, PopoverState::Closed)
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, PopoverState::Editing { .. })
    }

    pub fn open(&mut self) {
        let cursor = self.actions.iter().position(|a| !a.disabled).unwrap_or(0);
        self.state = PopoverState::MenuOpen { cursor };
    }

    pub fn close(&mut self) {
        self.state = PopoverState::Closed;
    }

    /// Move the menu cursor, skipping disabled actions.
    pub fn move_cursor(&mut self, down: bool) {
        let PopoverState::MenuOpen { cursor } = &mut self.state else {
            return;
        };
        let len = self.actions.len();
        let mut next = *cursor;
        for _ in 0..len {
            next = if down { (next + 1) % len } else { (next + len - 1) % len };
            if !self.actions[next].disabled {
                *cursor = next;
                return;
            }
        }
    }

    /// Run the action under the cursor against `item`.
    pub fn select(&mut self, item: &E) -> Mutation {
        let PopoverState::MenuOpen { cursor } = self.state else {
            return Mutation::None;
        };
        let Some(action) = self.actions.get(cursor).cloned() else {
            return Mutation::None;
        };
        if action.disabled {
            return Mutation::None;
        }
        match action.kind {
            ActionKind::Raw => {
                self.close();
                (action.action)(item)
            }
            ActionKind::StatusPatch(status) => {
                let mut draft = item.clone();
                draft.set_status(status);
                self.close();
                (action.action)(&draft)
            }
            ActionKind::Modify => {
                self.state = PopoverState::Editing {
                    original: item.clone(),
                    form: EntityForm::modify(item),
                };
                Mutation::None
            }
        }
    }

    /// Dispatch the Modify action with the edited draft. An unparseable field keeps
    /// the dialog open with an error.
    pub fn save(&mut self, today: NaiveDate) -> Mutation {
        let PopoverState::Editing { original, form } = &mut self.state else {
            return Mutation::None;
        };
        let values = match form.values(today) {
            Ok(v) => v,
            Err(e) => {
                form.error = Some(e);
                return Mutation::None;
            }
        };
        let mut draft = original.clone();
        draft.apply(&values);
        let modify = self.actions.iter().find(|a| a.kind == ActionKind::Modify).cloned();
        self.close();
        match modify {
            Some(action) => (action.action)(&draft),
            None => Mutation::None,
        }
    }

    /// Drop the draft. Never produces a mutation.
    pub fn cancel(&mut self) {
        self.close();
    }

    /// Route a key while open. `item` is the row the popover belongs to; the menu
    /// closes if that row is gone, while an open dialog keeps working on its snapshot.
    pub fn handle_key(&mut self, key: KeyEvent, item: Option<&E>, today: NaiveDate) -> Mutation {
        match &mut self.state {
            PopoverState::Closed => Mutation::None,
            PopoverState::MenuOpen { .. } => {
                let Some(item) = item else {
                    self.close();
                    return Mutation::None;
                };
                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => self.close(),
                    KeyCode::Up | KeyCode::Char('k') => self.move_cursor(false),
                    KeyCode::Down | KeyCode::Char('j') => self.move_cursor(true),
                    KeyCode::Enter | KeyCode::Char(' ') => return self.select(item),
                    _ => {}
                }
                Mutation::None
            }
            PopoverState::Editing { form, .. } => match form.handle_key(key, today) {
                FormOutcome::Continue => Mutation::None,
                FormOutcome::Submit => self.save(today),
                FormOutcome::Cancel => {
                    self.cancel();
                    Mutation::None
                }
            },
        }
    }

    /// Tooltip of the action under the menu cursor.
    pub fn hovered_tooltip(&self) -> Option<&str> {
        match self.state {
            PopoverState::MenuOpen { cursor } => self.actions.get(cursor)?.tooltip.as_deref(),
            _ => None,
        }
    }

    /// Inline marker for the trailing actions cell.
    pub fn trigger_label(&self, selected: bool) -> &'static str {
        if selected && self.is_open() {
            "▾"
        } else {
            "⋯"
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect, today: NaiveDate) {
        match &self.state {
            PopoverState::Closed => {}
            PopoverState::MenuOpen { cursor } => {
                let lines: Vec<Line> = self
                    .actions
                    .iter()
                    .enumerate()
                    .map(|(i, a)| {
                        let mut style = a.variant.style();
                        if a.disabled {
                            style = style.fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
                        }
                        if i == *cursor {
                            style = style.bg(if a.variant == Variant::Destructive { DARK_RED } else { Color::Gray });
                            if a.variant != Variant::Destructive {
                                style = style.fg(Color::Black);
                            }
                        }
                        let marker = if i == *cursor { "› " } else { "  " };
                        Line::from(Span::styled(format!("{marker}{}", a.label), style))
                    })
                    .collect();
                let area = centered_rect_rows(30, self.actions.len() as u16 + 2, area);
                f.render_widget(Clear, area);
                let menu = Paragraph::new(lines).block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Actions")
                        .border_style(Style::default().fg(GOLD)),
                );
                f.render_widget(menu, area);
            }
            PopoverState::Editing { form, .. } => form.render(f, area, today),
        }
    }
}
