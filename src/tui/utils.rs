use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// A rectangle of `percent_x` by `percent_y` centred inside `r`.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// Like [`centered_rect`] but with a fixed height in rows, clamped to `r`.
pub fn centered_rect_rows(percent_x: u16, rows: u16, r: Rect) -> Rect {
    let horizontal = centered_rect(percent_x, 100, r);
    let height = rows.min(r.height);
    Rect {
        x: horizontal.x,
        y: r.y + (r.height - height) / 2,
        width: horizontal.width,
        height,
    }
}
