//! Enumerations for TUI state management.

/// Which screen the dashboard is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Dashboard,
    Help,
}

/// How a section lays out its entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Table,
    Cards,
}

impl ViewMode {
    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Table => ViewMode::Cards,
            ViewMode::Cards => ViewMode::Table,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Table => "table",
            ViewMode::Cards => "cards",
        }
    }
}
