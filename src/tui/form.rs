//! Generic add/modify form built from an entity's field descriptors.
//!
//! Text and progress are typed; status and priority are closed selectors cycled
//! with ←/→. Modify forms edit dates as text. Add forms leave dates to the
//! embedded [`DateFieldSet`] instead.

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::dates::{read_date_input, DateInput};
use crate::entity::{clamp_progress, Control, Entity, FieldSpec, FieldValue, FieldValues};
use crate::fields::{Priority, Status};
use crate::tui::colors::{priority_color, DARK_RED, GOLD};
use crate::tui::date_fields::DateFieldSet;
use crate::tui::input::InputField;
use crate::tui::utils::centered_rect_rows;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormControl {
    Text(InputField),
    Status(usize),
    Priority(usize),
    Progress(InputField),
    Date(InputField),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRow {
    pub spec: FieldSpec,
    pub control: FormControl,
}

impl FormRow {
    fn new(spec: FieldSpec, value: &FieldValue) -> Self {
        let control = match (spec.control, value) {
            (Control::Status, FieldValue::Status(s)) => {
                FormControl::Status(Status::ALL.iter().position(|x| x == s).unwrap_or(0))
            }
            (Control::Priority, FieldValue::Priority(p)) => {
                FormControl::Priority(Priority::ALL.iter().position(|x| x == p).unwrap_or(1))
            }
            (Control::Progress, FieldValue::Progress(p)) => {
                FormControl::Progress(InputField::with_value(&p.to_string()))
            }
            (Control::Date, FieldValue::Date(d)) => FormControl::Date(InputField::with_value(
                &d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            )),
            (_, v) => FormControl::Text(InputField::with_value(&v.to_string())),
        };
        FormRow { spec, control }
    }

    fn input_mut(&mut self) -> Option<&mut InputField> {
        match &mut self.control {
            FormControl::Text(i) | FormControl::Progress(i) | FormControl::Date(i) => Some(i),
            FormControl::Status(_) | FormControl::Priority(_) => None,
        }
    }

    fn value(&self, today: NaiveDate) -> Result<FieldValue, String> {
        Ok(match &self.control {
            FormControl::Text(i) => FieldValue::Text(i.value.clone()),
            FormControl::Status(idx) => FieldValue::Status(Status::ALL[*idx]),
            FormControl::Priority(idx) => FieldValue::Priority(Priority::ALL[*idx]),
            FormControl::Progress(i) => FieldValue::Progress(parse_progress(&i.value)),
            FormControl::Date(i) => match read_date_input(&i.value, today) {
                DateInput::Clear => FieldValue::Date(None),
                DateInput::Date(d) => FieldValue::Date(Some(d)),
                DateInput::Invalid => {
                    return Err(format!("{}: '{}' is not a date", self.spec.label, i.value))
                }
            },
        })
    }

    fn display(&self) -> String {
        match &self.control {
            FormControl::Text(i) | FormControl::Date(i) => i.display_with_cursor(),
            FormControl::Progress(i) => format!("{}%", i.display_with_cursor()),
            FormControl::Status(idx) => format!("◀ {} ▶", Status::ALL[*idx].label()),
            FormControl::Priority(idx) => format!("◀ {} ▶", Priority::ALL[*idx].label()),
        }
    }
}

/// Empty progress counts as zero; anything else is clamped to 0..=100.
pub fn parse_progress(s: &str) -> u8 {
    s.trim().parse::<i64>().map(clamp_progress).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormOutcome {
    Continue,
    Submit,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityForm {
    pub title: String,
    pub rows: Vec<FormRow>,
    /// Only present on add forms for entities that declare dates.
    pub dates: Option<DateFieldSet>,
    /// Values written through by the date widget.
    pub pending: FieldValues,
    pub current: usize,
    pub error: Option<String>,
}

impl EntityForm {
    /// "Add new" form seeded from a template. Date fields go to the date widget.
    pub fn add<E: Entity>(template: &FieldValues) -> Self {
        let rows = E::fields()
            .iter()
            .filter(|s| s.control != Control::Date)
            .map(|s| {
                let value = template.get(s.field).cloned().unwrap_or_else(|| s.default_value());
                FormRow::new(*s, &value)
            })
            .collect();
        let dates = DateFieldSet::for_entity::<E>();
        let mut form = EntityForm {
            title: format!("Add New {}", capitalise(E::KIND.noun())),
            rows,
            dates: (!dates.is_empty()).then_some(dates),
            pending: FieldValues::new(),
            current: 0,
            error: None,
        };
        form.update_active_field();
        form
    }

    /// Modify dialog pre-filled from a snapshot of `item`.
    pub fn modify<E: Entity>(item: &E) -> Self {
        let values = item.values();
        let rows = E::fields()
            .iter()
            .filter_map(|s| values.get(s.field).map(|v| FormRow::new(*s, v)))
            .collect();
        let mut form = EntityForm {
            title: format!("Modify {}", capitalise(E::KIND.noun())),
            rows,
            dates: None,
            pending: FieldValues::new(),
            current: 0,
            error: None,
        };
        form.update_active_field();
        form
    }

    pub fn field_count(&self) -> usize {
        self.rows.len() + self.dates.as_ref().map_or(0, DateFieldSet::len)
    }

    /// Index into the date widget when focus is past the regular rows.
    fn date_focus(&self) -> Option<usize> {
        self.current.checked_sub(self.rows.len())
    }

    pub fn next_field(&mut self) {
        self.current = (self.current + 1) % self.field_count().max(1);
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        self.current = if self.current == 0 {
            self.field_count().saturating_sub(1)
        } else {
            self.current - 1
        };
        self.update_active_field();
    }

    fn update_active_field(&mut self) {
        let current = self.current;
        for (i, row) in self.rows.iter_mut().enumerate() {
            if let Some(input) = row.input_mut() {
                input.active = i == current;
            }
        }
        let focus = self.date_focus();
        if let Some(dates) = self.dates.as_mut() {
            dates.set_focus(focus);
        }
    }

    pub fn handle_char(&mut self, c: char, today: NaiveDate) {
        if let Some(idx) = self.date_focus() {
            if let Some(dates) = self.dates.as_mut() {
                dates.handle_char(idx, c, today, &mut self.pending);
            }
            return;
        }
        let Some(row) = self.rows.get_mut(self.current) else {
            return;
        };
        match &mut row.control {
            FormControl::Progress(i) if c.is_ascii_digit() => i.handle_char(c),
            FormControl::Text(i) | FormControl::Date(i) => i.handle_char(c),
            _ => {}
        }
    }

    pub fn handle_backspace(&mut self, today: NaiveDate) {
        if let Some(idx) = self.date_focus() {
            if let Some(dates) = self.dates.as_mut() {
                dates.handle_backspace(idx, today, &mut self.pending);
            }
            return;
        }
        if let Some(input) = self.rows.get_mut(self.current).and_then(FormRow::input_mut) {
            input.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if let Some(input) = self.rows.get_mut(self.current).and_then(FormRow::input_mut) {
            input.handle_delete();
        }
    }

    /// Move the cursor in text inputs, or cycle a selector.
    pub fn handle_left_right(&mut self, right: bool) {
        if let Some(idx) = self.date_focus() {
            if let Some(dates) = self.dates.as_mut() {
                dates.move_cursor(idx, right);
            }
            return;
        }
        let Some(row) = self.rows.get_mut(self.current) else {
            return;
        };
        match &mut row.control {
            FormControl::Status(idx) => *idx = cycle(*idx, Status::ALL.len(), right),
            FormControl::Priority(idx) => *idx = cycle(*idx, Priority::ALL.len(), right),
            FormControl::Text(i) | FormControl::Progress(i) | FormControl::Date(i) => {
                if right {
                    i.move_cursor_right()
                } else {
                    i.move_cursor_left()
                }
            }
        }
    }

    /// Toggle the focused date row, if focus is on one.
    pub fn toggle_date(&mut self) {
        if let (Some(idx), Some(dates)) = (self.date_focus(), self.dates.as_mut()) {
            dates.toggle(idx, &mut self.pending);
        }
    }

    /// Every field the form edits, merged with the date widget's pending values.
    pub fn values(&self, today: NaiveDate) -> Result<FieldValues, String> {
        let mut out = FieldValues::new();
        for row in &self.rows {
            out.insert(row.spec.field, row.value(today)?);
        }
        if let Some(dates) = &self.dates {
            dates.check(today)?;
        }
        out.merge(&self.pending);
        Ok(out)
    }

    pub fn handle_key(&mut self, key: KeyEvent, today: NaiveDate) -> FormOutcome {
        self.error = None;
        match key.code {
            KeyCode::Esc => return FormOutcome::Cancel,
            KeyCode::Enter => return FormOutcome::Submit,
            KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => self.toggle_date(),
            KeyCode::Tab | KeyCode::Down => self.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.prev_field(),
            KeyCode::Left => self.handle_left_right(false),
            KeyCode::Right => self.handle_left_right(true),
            KeyCode::Backspace => self.handle_backspace(today),
            KeyCode::Delete => self.handle_delete(),
            KeyCode::Char(c) => self.handle_char(c, today),
            _ => {}
        }
        FormOutcome::Continue
    }

    /// Draw as a centred modal over `area`.
    pub fn render(&self, f: &mut Frame, area: Rect, today: NaiveDate) {
        let date_rows = self.dates.as_ref().map_or(0, |d| d.len() as u16 + 2);
        let height = self.rows.len() as u16 * 3 + date_rows + 4;
        let area = centered_rect_rows(60, height, area);
        f.render_widget(Clear, area);

        let outer = Block::default().borders(Borders::ALL).title(self.title.as_str());
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        let mut constraints: Vec<Constraint> =
            self.rows.iter().map(|_| Constraint::Length(3)).collect();
        if date_rows > 0 {
            constraints.push(Constraint::Length(date_rows));
        }
        constraints.push(Constraint::Min(1));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        for (i, row) in self.rows.iter().enumerate() {
            let border = if i == self.current {
                Style::default().fg(GOLD)
            } else {
                Style::default()
            };
            let title = if row.spec.required {
                format!("{} *", row.spec.label)
            } else {
                row.spec.label.to_string()
            };
            let text_style = match &row.control {
                FormControl::Priority(idx) => Style::default().fg(priority_color(Priority::ALL[*idx])),
                _ => Style::default(),
            };
            let widget = Paragraph::new(row.display()).style(text_style).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(border),
            );
            f.render_widget(widget, chunks[i]);
        }

        if let Some(dates) = &self.dates {
            dates.render(f, chunks[self.rows.len()], &self.pending, today);
        }

        let footer = match &self.error {
            Some(e) => Paragraph::new(e.as_str()).style(Style::default().bg(DARK_RED).fg(Color::White)),
            None => Paragraph::new("Tab/↑↓ move  ←/→ change  Enter save  Esc cancel")
                .style(Style::default().fg(Color::DarkGray)),
        };
        if let Some(last) = chunks.last() {
            f.render_widget(footer, *last);
        }
    }
}

fn cycle(idx: usize, len: usize, forward: bool) -> usize {
    if forward {
        (idx + 1) % len
    } else if idx == 0 {
        len - 1
    } else {
        idx - 1
    }
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityMeta, Field, Objective, Project, Task};
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(form: &mut EntityForm, s: &str) {
        for c in s.chars() {
            form.handle_key(key(KeyCode::Char(c)), today());
        }
    }

    fn project() -> Project {
        let now = Utc::now();
        Project::from_parts(
            EntityMeta { id: "p".into(), created_at: now, updated_at: now },
            &FieldValues::new()
                .with(Field::Title, FieldValue::Text("Launch".into()))
                .with(Field::Progress, FieldValue::Progress(30))
                .with(Field::DueDate, FieldValue::Date(NaiveDate::from_ymd_opt(2025, 3, 1))),
        )
    }

    #[test]
    fn add_form_excludes_dates_from_rows() {
        let form = EntityForm::add::<Objective>(&Objective::default_values());
        assert!(form.rows.iter().all(|r| r.spec.control != Control::Date));
        assert_eq!(form.dates.as_ref().map(DateFieldSet::len), Some(3));
        assert!(EntityForm::add::<Task>(&Task::default_values()).dates.is_none());
        assert_eq!(form.field_count(), 5 + 3);
    }

    #[test]
    fn add_form_values_start_from_template() {
        let mut form = EntityForm::add::<Project>(&Project::default_values());
        type_str(&mut form, "Ship it");
        let values = form.values(today()).unwrap();
        assert_eq!(values.text(Field::Title), Some("Ship it"));
        assert_eq!(values.status(), Some(Status::Todo));
        assert_eq!(values.priority(), Some(Priority::Medium));
        assert_eq!(values.progress(), Some(0));
        assert!(!values.contains(Field::DueDate));
    }

    #[test]
    fn date_toggle_off_drops_key_from_values() {
        let mut form = EntityForm::add::<Project>(&Project::default_values());
        while form.date_focus().is_none() {
            form.next_field();
        }
        form.handle_key(KeyEvent::new(KeyCode::Char('t'), KeyModifiers::CONTROL), today());
        type_str(&mut form, "2025-02-01");
        assert_eq!(
            form.values(today()).unwrap().date(Field::DueDate),
            Some(NaiveDate::from_ymd_opt(2025, 2, 1))
        );
        form.handle_key(KeyEvent::new(KeyCode::Char('t'), KeyModifiers::CONTROL), today());
        assert!(!form.values(today()).unwrap().contains(Field::DueDate));
    }

    #[test]
    fn selectors_cycle_with_arrows() {
        let mut form = EntityForm::modify(&project());
        form.current = 2;
        form.handle_key(key(KeyCode::Right), today());
        form.handle_key(key(KeyCode::Right), today());
        form.handle_key(key(KeyCode::Right), today());
        assert_eq!(form.values(today()).unwrap().status(), Some(Status::Todo));
        form.current = 3;
        form.handle_key(key(KeyCode::Left), today());
        assert_eq!(form.values(today()).unwrap().priority(), Some(Priority::Low));
    }

    #[test]
    fn progress_accepts_digits_and_clamps() {
        let mut form = EntityForm::modify(&project());
        form.current = 4;
        type_str(&mut form, "x5");
        assert_eq!(form.values(today()).unwrap().progress(), Some(100));
        assert_eq!(parse_progress(""), 0);
        assert_eq!(parse_progress("42"), 42);
    }

    #[test]
    fn modify_dates_parse_or_error() {
        let mut form = EntityForm::modify(&project());
        form.current = 5;
        for _ in 0..10 {
            form.handle_backspace(today());
        }
        assert_eq!(form.values(today()).unwrap().date(Field::DueDate), Some(None));
        type_str(&mut form, "tomorrow");
        assert_eq!(
            form.values(today()).unwrap().date(Field::DueDate),
            Some(NaiveDate::from_ymd_opt(2025, 1, 16))
        );
        type_str(&mut form, "!");
        assert!(form.values(today()).is_err());
    }

    #[test]
    fn enter_and_escape_end_the_form() {
        let mut form = EntityForm::modify(&project());
        assert_eq!(form.handle_key(key(KeyCode::Enter), today()), FormOutcome::Submit);
        assert_eq!(form.handle_key(key(KeyCode::Esc), today()), FormOutcome::Cancel);
        assert_eq!(form.title, "Modify Project");
    }
}
