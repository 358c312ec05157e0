//! Single-line text input used by every form.

/// A text input with a character cursor and focus flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputField {
    pub value: String,
    /// Cursor position in characters, not bytes.
    pub cursor: usize,
    pub active: bool,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input pre-filled with `value`, cursor at the end.
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
            active: false,
        }
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn len_chars(&self) -> usize {
        self.value.chars().count()
    }

    pub fn handle_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    /// Delete the character under the cursor.
    pub fn handle_delete(&mut self) {
        if self.cursor < self.len_chars() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.len_chars() {
            self.cursor += 1;
        }
    }

    pub fn set(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = self.len_chars();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Text with a block cursor spliced in, for rendering the focused field.
    pub fn display_with_cursor(&self) -> String {
        if !self.active {
            return self.value.clone();
        }
        let at = self.byte_index(self.cursor);
        format!("{}▏{}", &self.value[..at], &self.value[at..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_respects_multibyte_characters() {
        let mut input = InputField::with_value("café");
        assert_eq!(input.cursor, 4);
        input.handle_backspace();
        assert_eq!(input.value, "caf");
        input.handle_char('é');
        input.move_cursor_left();
        input.move_cursor_left();
        input.handle_char('-');
        assert_eq!(input.value, "ca-fé");
        input.handle_delete();
        assert_eq!(input.value, "ca-é");
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut input = InputField::new();
        input.move_cursor_left();
        input.handle_backspace();
        input.handle_delete();
        assert_eq!(input.cursor, 0);
        input.set("ab");
        input.move_cursor_right();
        assert_eq!(input.cursor, 2);
        input.clear();
        assert!(input.value.is_empty());
    }

    #[test]
    fn cursor_marker_only_when_active() {
        let mut input = InputField::with_value("ab");
        assert_eq!(input.display_with_cursor(), "ab");
        input.active = true;
        input.move_cursor_left();
        assert_eq!(input.display_with_cursor(), "a▏b");
    }
}
