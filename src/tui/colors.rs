//! Color constants for the dashboard.

use ratatui::style::{Color, Modifier, Style};

use crate::fields::{Priority, Status};

pub const GOLD: Color = Color::Rgb(255, 215, 0);
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);
pub const SLATE: Color = Color::Rgb(60, 70, 90);

pub fn status_style(status: Status) -> Style {
    match status {
        Status::Todo => Style::default().fg(Color::White),
        Status::InProgress => Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
        Status::Completed => Style::default().fg(Color::DarkGray),
    }
}

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Low => Color::Gray,
        Priority::Medium => Color::Cyan,
        Priority::High => Color::LightRed,
        Priority::Critical => Color::Red,
    }
}
