//! Toggleable optional dates embedded in "add new" forms.
//!
//! Each row writes straight through to the form's pending values:
//! - off: the key is absent
//! - on, no valid date yet: the key is present and null
//! - on with a date: the key holds the date

use chrono::NaiveDate;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::dates::{read_date_input, DateInput};
use crate::entity::{Entity, Field, FieldValue, FieldValues};
use crate::tui::colors::GOLD;
use crate::tui::input::InputField;

/// The optional dates, in the order they are offered.
pub const DATE_FIELDS: [Field; 3] = [Field::StartOn, Field::Started, Field::DueDate];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRow {
    pub field: Field,
    pub label: &'static str,
    pub enabled: bool,
    pub input: InputField,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateFieldSet {
    pub rows: Vec<DateRow>,
}

impl DateFieldSet {
    /// The subset of [`DATE_FIELDS`] that `E` declares, all switched off.
    pub fn for_entity<E: Entity>() -> Self {
        let rows = DATE_FIELDS
            .iter()
            .filter_map(|f| E::spec(*f))
            .map(|spec| DateRow {
                field: spec.field,
                label: spec.label,
                enabled: false,
                input: InputField::new(),
            })
            .collect();
        DateFieldSet { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flip row `idx` on or off.
    pub fn toggle(&mut self, idx: usize, pending: &mut FieldValues) {
        let Some(row) = self.rows.get_mut(idx) else {
            return;
        };
        row.enabled = !row.enabled;
        if row.enabled {
            pending.insert(row.field, FieldValue::Date(None));
        } else {
            row.input.clear();
            pending.remove(row.field);
        }
    }

    /// Set row `idx` to a concrete date. Ignored while the row is off.
    pub fn set_date(&mut self, idx: usize, date: Option<NaiveDate>, pending: &mut FieldValues) {
        let Some(row) = self.rows.get_mut(idx) else {
            return;
        };
        if !row.enabled {
            return;
        }
        match date {
            Some(d) => row.input.set(&d.format("%Y-%m-%d").to_string()),
            None => row.input.clear(),
        }
        pending.insert(row.field, FieldValue::Date(date));
    }

    pub fn handle_char(&mut self, idx: usize, c: char, today: NaiveDate, pending: &mut FieldValues) {
        self.edit(idx, today, pending, |input| input.handle_char(c));
    }

    pub fn handle_backspace(&mut self, idx: usize, today: NaiveDate, pending: &mut FieldValues) {
        self.edit(idx, today, pending, InputField::handle_backspace);
    }

    pub fn move_cursor(&mut self, idx: usize, right: bool) {
        if let Some(row) = self.rows.get_mut(idx) {
            if right {
                row.input.move_cursor_right();
            } else {
                row.input.move_cursor_left();
            }
        }
    }

    fn edit(
        &mut self,
        idx: usize,
        today: NaiveDate,
        pending: &mut FieldValues,
        apply: impl FnOnce(&mut InputField),
    ) {
        let Some(row) = self.rows.get_mut(idx) else {
            return;
        };
        if !row.enabled {
            return;
        }
        apply(&mut row.input);
        let date = match read_date_input(&row.input.value, today) {
            DateInput::Date(d) => Some(d),
            DateInput::Clear | DateInput::Invalid => None,
        };
        pending.insert(row.field, FieldValue::Date(date));
    }

    /// Fail on the first enabled row whose text is neither blank nor a date.
    pub fn check(&self, today: NaiveDate) -> Result<(), String> {
        for row in self.rows.iter().filter(|r| r.enabled) {
            if read_date_input(&row.input.value, today) == DateInput::Invalid {
                return Err(format!("{}: '{}' is not a date", row.label, row.input.value));
            }
        }
        Ok(())
    }

    /// Mark which row, if any, has focus.
    pub fn set_focus(&mut self, idx: Option<usize>) {
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.input.active = Some(i) == idx;
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect, pending: &FieldValues, today: NaiveDate) {
        let lines: Vec<Line> = self
            .rows
            .iter()
            .map(|row| {
                let check = if row.enabled { "[x]" } else { "[ ]" };
                let label_style = if row.input.active {
                    Style::default().fg(GOLD).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let mut spans = vec![
                    Span::styled(format!("{check} {:<10}", row.label), label_style),
                ];
                if row.enabled {
                    spans.push(Span::raw(row.input.display_with_cursor()));
                    let hint = match pending.date(row.field).flatten() {
                        Some(d) => format!("  → {}", d.format("%a %d %b %Y")),
                        None if matches!(read_date_input(&row.input.value, today), DateInput::Invalid) => {
                            "  (not a date)".to_string()
                        }
                        None => "  (no date)".to_string(),
                    };
                    spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
                }
                Line::from(spans)
            })
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Dates (Ctrl+T toggles)");
        f.render_widget(Paragraph::new(lines).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Objective, Project, Task};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn rows_follow_entity_fields() {
        assert!(DateFieldSet::for_entity::<Task>().is_empty());
        let project = DateFieldSet::for_entity::<Project>();
        assert_eq!(project.rows.iter().map(|r| r.field).collect::<Vec<_>>(), vec![Field::DueDate]);
        let objective = DateFieldSet::for_entity::<Objective>();
        assert_eq!(objective.len(), 3);
        assert_eq!(objective.rows[0].label, "Start On");
    }

    #[test]
    fn enabling_sets_null_and_disabling_removes_key() {
        let mut dates = DateFieldSet::for_entity::<Project>();
        let mut pending = FieldValues::new();

        dates.toggle(0, &mut pending);
        assert_eq!(pending.date(Field::DueDate), Some(None));

        dates.set_date(0, NaiveDate::from_ymd_opt(2025, 2, 1), &mut pending);
        assert_eq!(pending.date(Field::DueDate), Some(NaiveDate::from_ymd_opt(2025, 2, 1)));

        dates.toggle(0, &mut pending);
        assert!(!pending.contains(Field::DueDate));
        assert!(dates.rows[0].input.value.is_empty());
    }

    #[test]
    fn typing_writes_through_on_every_keystroke() {
        let mut dates = DateFieldSet::for_entity::<Objective>();
        let mut pending = FieldValues::new();

        dates.handle_char(2, 't', today(), &mut pending);
        assert!(pending.is_empty(), "disabled rows ignore input");

        dates.toggle(2, &mut pending);
        for c in "tomorro".chars() {
            dates.handle_char(2, c, today(), &mut pending);
        }
        assert_eq!(pending.date(Field::DueDate), Some(None));
        dates.handle_char(2, 'w', today(), &mut pending);
        assert_eq!(pending.date(Field::DueDate), NaiveDate::from_ymd_opt(2025, 1, 16).map(Some));
        dates.handle_backspace(2, today(), &mut pending);
        assert_eq!(pending.date(Field::DueDate), Some(None));
    }

    #[test]
    fn check_rejects_unparseable_text_on_enabled_rows() {
        let mut dates = DateFieldSet::for_entity::<Project>();
        let mut pending = FieldValues::new();
        for c in "junk".chars() {
            dates.handle_char(0, c, today(), &mut pending);
        }
        assert_eq!(dates.check(today()), Ok(()), "disabled rows are not checked");

        dates.toggle(0, &mut pending);
        assert_eq!(dates.check(today()), Ok(()), "blank means no date");
        for c in "2025-13-01".chars() {
            dates.handle_char(0, c, today(), &mut pending);
        }
        assert_eq!(
            dates.check(today()),
            Err("Due Date: '2025-13-01' is not a date".to_string())
        );
    }

    #[test]
    fn set_date_is_ignored_while_off() {
        let mut dates = DateFieldSet::for_entity::<Objective>();
        let mut pending = FieldValues::new();
        dates.set_date(0, Some(today()), &mut pending);
        assert!(pending.is_empty());
    }
}
