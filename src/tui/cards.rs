//! Card grid: the table's contract laid out as one card per entity.

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::dates::truncate;
use crate::entity::{Entity, FieldValues};
use crate::tui::colors::GOLD;
use crate::tui::overlay::{Overlay, ViewOutcome};
use crate::tui::popover::ActionConfig;

/// Body lines for one card.
pub type CardRenderer<E> = fn(&E) -> Vec<Line<'static>>;

/// Cards per row for a given width.
pub fn columns_for_width(width: u16) -> usize {
    match width {
        0..=59 => 1,
        60..=119 => 2,
        _ => 3,
    }
}

const MAX_CARD_HEIGHT: u16 = 9;

pub struct CardGrid<E> {
    pub renderer: CardRenderer<E>,
    pub overlay: Overlay<E>,
    pub selected: Option<usize>,
    /// Column count from the last render, used for vertical moves.
    last_columns: usize,
}

impl<E: Entity> CardGrid<E> {
    pub fn new(renderer: CardRenderer<E>, actions: Vec<ActionConfig<E>>) -> Self {
        CardGrid {
            renderer,
            overlay: Overlay::new(actions),
            selected: None,
            last_columns: 1,
        }
    }

    pub fn with_template(mut self, template: FieldValues) -> Self {
        self.overlay.template = Some(template);
        self
    }

    pub fn selected_item<'a>(&self, items: &'a [E]) -> Option<&'a E> {
        self.selected.and_then(|i| items.get(i))
    }

    pub fn clamp(&mut self, len: usize) {
        self.selected = match (self.selected, len) {
            (_, 0) => None,
            (None, _) => Some(0),
            (Some(i), len) => Some(i.min(len - 1)),
        };
    }

    /// Move by `delta` cards, stopping at either end.
    fn shift(&mut self, delta: isize, len: usize) {
        if len == 0 {
            return;
        }
        let current = self.selected.unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1);
        self.selected = Some(next as usize);
    }

    pub fn handle_key(&mut self, key: KeyEvent, items: &[E], today: NaiveDate) -> ViewOutcome {
        if self.overlay.is_active() {
            return self.overlay.handle_key(key, items, today);
        }
        self.clamp(items.len());
        let row = self.last_columns.max(1) as isize;
        match key.code {
            KeyCode::Left => {
                self.shift(-1, items.len());
                ViewOutcome::Handled
            }
            KeyCode::Right => {
                self.shift(1, items.len());
                ViewOutcome::Handled
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.shift(-row, items.len());
                ViewOutcome::Handled
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.shift(row, items.len());
                ViewOutcome::Handled
            }
            KeyCode::Enter | KeyCode::Char(' ') => match self.selected_item(items) {
                Some(item) => {
                    self.overlay.open_popover(item);
                    ViewOutcome::Handled
                }
                None => ViewOutcome::Ignored,
            },
            KeyCode::Char('a') if self.overlay.open_add() => ViewOutcome::Handled,
            _ => ViewOutcome::Ignored,
        }
    }

    pub fn render(
        &mut self,
        f: &mut Frame,
        area: Rect,
        items: &[E],
        focused: bool,
        today: NaiveDate,
    ) {
        self.clamp(items.len());
        let border = if focused { GOLD } else { Color::DarkGray };
        let outer = Block::default()
            .borders(Borders::ALL)
            .title(format!("{} ({})", E::KIND.title(), items.len()))
            .border_style(Style::default().fg(border));
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        if items.is_empty() {
            let hint = if self.overlay.template.is_some() {
                format!("No {}s yet. Press 'a' to add one.", E::KIND.noun())
            } else {
                format!("No {}s yet.", E::KIND.noun())
            };
            f.render_widget(Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)), inner);
            self.overlay.render(f, f.area(), today);
            return;
        }

        let columns = columns_for_width(inner.width);
        self.last_columns = columns;

        let bodies: Vec<Vec<Line<'static>>> = items.iter().map(|item| (self.renderer)(item)).collect();
        let card_height = bodies
            .iter()
            .map(|b| b.len() as u16 + 2)
            .max()
            .unwrap_or(3)
            .min(MAX_CARD_HEIGHT);

        let visible_rows = (inner.height / card_height).max(1) as usize;
        let selected_row = self.selected.unwrap_or(0) / columns;
        let first_row = selected_row.saturating_sub(visible_rows - 1);

        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Length(card_height); visible_rows])
            .split(inner);

        for (slot, row_area) in row_areas.iter().enumerate() {
            let row = first_row + slot;
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
                .split(*row_area);
            for (col, cell) in cells.iter().enumerate() {
                let idx = row * columns + col;
                let (Some(item), Some(body)) = (items.get(idx), bodies.get(idx)) else {
                    continue;
                };
                let is_selected = self.selected == Some(idx);
                let border_style = if is_selected && focused {
                    Style::default().fg(GOLD).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                let trigger = self
                    .overlay
                    .popover
                    .trigger_label(self.overlay.target() == Some(item.id()));
                let title_width = (cell.width as usize).saturating_sub(6);
                let card = Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(truncate(item.title(), title_width))
                    .title(Line::from(trigger).right_aligned());
                f.render_widget(
                    Paragraph::new(body.clone()).block(card).wrap(Wrap { trim: true }),
                    *cell,
                );
            }
        }

        self.overlay.render(f, f.area(), today);
    }
}
