//! Generic entity table with a trailing actions column.

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::dates::format_date;
use crate::entity::{Control, Entity, Field, FieldValue, FieldValues};
use crate::tui::colors::{status_style, GOLD};
use crate::tui::overlay::{Overlay, ViewOutcome};
use crate::tui::popover::ActionConfig;

pub struct Column<E> {
    pub key: Field,
    pub header: &'static str,
    /// Custom cell renderer. Takes precedence over the value formatter.
    pub cell: Option<fn(&E) -> String>,
    pub width: Constraint,
}

impl<E> Clone for Column<E> {
    fn clone(&self) -> Self {
        Column {
            key: self.key,
            header: self.header,
            cell: self.cell,
            width: self.width,
        }
    }
}

impl<E: Entity> Column<E> {
    pub fn new(key: Field, header: &'static str, width: Constraint) -> Self {
        Column { key, header, cell: None, width }
    }

    pub fn with_cell(mut self, cell: fn(&E) -> String) -> Self {
        self.cell = Some(cell);
        self
    }

    pub fn text(&self, item: &E) -> String {
        match self.cell {
            Some(render) => render(item),
            None => item.value(self.key).map(|v| format_value(&v)).unwrap_or_default(),
        }
    }
}

/// Type-aware cell text: dates as `dd/mm/yyyy`, enums by label, the rest as-is.
pub fn format_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Date(d) => format_date(*d),
        FieldValue::Status(s) => s.label().to_string(),
        FieldValue::Priority(p) => p.label().to_string(),
        FieldValue::Progress(n) => n.to_string(),
        FieldValue::Text(s) => s.clone(),
    }
}

/// One column per declared field, minus the long description.
pub fn default_columns<E: Entity>() -> Vec<Column<E>> {
    E::fields()
        .iter()
        .filter(|s| s.field != Field::Description)
        .map(|s| {
            let width = match s.control {
                Control::Text => Constraint::Min(20),
                Control::Status => Constraint::Length(12),
                Control::Priority => Constraint::Length(9),
                Control::Progress => Constraint::Length(9),
                Control::Date => Constraint::Length(11),
            };
            Column::new(s.field, s.label, width)
        })
        .collect()
}

pub struct EntityTable<E> {
    pub columns: Vec<Column<E>>,
    pub overlay: Overlay<E>,
    pub state: TableState,
}

impl<E: Entity> EntityTable<E> {
    pub fn new(columns: Vec<Column<E>>, actions: Vec<ActionConfig<E>>) -> Self {
        EntityTable {
            columns,
            overlay: Overlay::new(actions),
            state: TableState::default(),
        }
    }

    /// Enable "add new" with the given default values.
    pub fn with_template(mut self, template: FieldValues) -> Self {
        self.overlay.template = Some(template);
        self
    }

    pub fn selected_item<'a>(&self, items: &'a [E]) -> Option<&'a E> {
        self.state.selected().and_then(|i| items.get(i))
    }

    /// Keep the selection inside `len` rows.
    pub fn clamp(&mut self, len: usize) {
        match (self.state.selected(), len) {
            (_, 0) => self.state.select(None),
            (None, _) => self.state.select(Some(0)),
            (Some(i), len) if i >= len => self.state.select(Some(len - 1)),
            _ => {}
        }
    }

    fn step(&mut self, down: bool, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if down => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn handle_key(&mut self, key: KeyEvent, items: &[E], today: NaiveDate) -> ViewOutcome {
        if self.overlay.is_active() {
            return self.overlay.handle_key(key, items, today);
        }
        self.clamp(items.len());
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.step(false, items.len());
                ViewOutcome::Handled
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.step(true, items.len());
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
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{} ({})", E::KIND.title(), items.len()))
            .border_style(Style::default().fg(border));

        if items.is_empty() {
            let hint = if self.overlay.template.is_some() {
                format!("No {}s yet. Press 'a' to add one.", E::KIND.noun())
            } else {
                format!("No {}s yet.", E::KIND.noun())
            };
            f.render_widget(
                Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)).block(block),
                area,
            );
            self.overlay.render(f, f.area(), today);
            return;
        }

        let header_cells = self
            .columns
            .iter()
            .map(|c| c.header)
            .chain(std::iter::once(""))
            .map(|h| Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD)));
        let header = Row::new(header_cells)
            .style(Style::default().bg(GOLD).fg(Color::Rgb(20, 20, 20)))
            .height(1);

        let rows: Vec<Row> = items
            .iter()
            .map(|item| {
                let mut cells: Vec<Cell> = self.columns.iter().map(|c| Cell::from(c.text(item))).collect();
                let trigger = self
                    .overlay
                    .popover
                    .trigger_label(self.overlay.target() == Some(item.id()));
                cells.push(Cell::from(trigger));
                Row::new(cells).style(status_style(item.status()))
            })
            .collect();

        let widths: Vec<Constraint> = self
            .columns
            .iter()
            .map(|c| c.width)
            .chain(std::iter::once(Constraint::Length(2)))
            .collect();

        let mut table = Table::new(rows, widths).header(header).block(block);
        if focused {
            table = table
                .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
                .highlight_symbol(">> ");
        }
        f.render_stateful_widget(table, area, &mut self.state);
        self.overlay.render(f, f.area(), today);
    }
}
