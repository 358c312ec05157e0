//! Date input parsing and display helpers shared by the CLI and the dashboard.

use chrono::{Datelike, Duration, Local, NaiveDate};

const WEEKDAYS: [(&str, &str, u32); 7] = [
    ("monday", "mon", 0),
    ("tuesday", "tue", 1),
    ("wednesday", "wed", 2),
    ("thursday", "thu", 3),
    ("friday", "fri", 4),
    ("saturday", "sat", 5),
    ("sunday", "sun", 6),
];

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Outcome of reading a date text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateInput {
    /// Blank input, meaning "no date".
    Clear,
    Date(NaiveDate),
    Invalid,
}

/// Read a date text box: blank clears, anything else goes through [`parse_date_input`].
pub fn read_date_input(s: &str, today: NaiveDate) -> DateInput {
    if s.trim().is_empty() {
        return DateInput::Clear;
    }
    match parse_date_input(s, today) {
        Some(d) => DateInput::Date(d),
        None => DateInput::Invalid,
    }
}

/// Parse a date typed by a person, relative to `today`.
///
/// Accepts:
/// - `today`, `tomorrow`, `yesterday`
/// - `end of week` / `eow`, `end of month` / `eom`, `weekend`
/// - `in 3d`, `in 2w`, `in 1m` (a month is 30 days)
/// - weekday names, optionally prefixed by `this` or `next`
/// - `YYYY-MM-DD`
pub fn parse_date_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => return Some(week_bounds(today).1),
        "end of month" | "eom" => return last_day_of_month(today),
        "this weekend" | "weekend" => {
            let ahead = (5 + 7 - today.weekday().num_days_from_monday()) % 7;
            return Some(today + Duration::days(ahead as i64));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        return parse_offset(rest.trim()).and_then(|d| today.checked_add_signed(d));
    }

    if let Some(date) = parse_weekday(&s, today) {
        return Some(date);
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

fn parse_offset(rest: &str) -> Option<Duration> {
    let (split, _) = rest.char_indices().last()?;
    let (n, unit) = rest.split_at(split);
    let n: i64 = n.trim().parse().ok()?;
    match unit {
        "d" => Duration::try_days(n),
        "w" => Duration::try_weeks(n),
        "m" => n.checked_mul(30).and_then(Duration::try_days),
        _ => None,
    }
}

fn parse_weekday(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let (next, name) = match s.strip_prefix("next ") {
        Some(name) => (true, name),
        None => (false, s.strip_prefix("this ").unwrap_or(s)),
    };
    let target = WEEKDAYS
        .iter()
        .find(|(long, short, _)| *long == name || *short == name)
        .map(|(_, _, n)| *n)?;
    let current = today.weekday().num_days_from_monday();
    let ahead = (target + 7 - current) % 7;
    let ahead = if next { ahead + 7 } else { ahead };
    Some(today + Duration::days(ahead as i64))
}

fn last_day_of_month(today: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).map(|first| first - Duration::days(1))
}

/// Monday and Sunday of the ISO week containing `day`.
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = day - Duration::days(day.weekday().num_days_from_monday() as i64);
    (start, start + Duration::days(6))
}

/// Table-style date: `31/01/2025`, or `-` when unset.
pub fn format_date(d: Option<NaiveDate>) -> String {
    match d {
        Some(d) => d.format("%d/%m/%Y").to_string(),
        None => "-".into(),
    }
}

/// Short relative form used on cards ("today", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    let Some(d) = due else {
        return "-".into();
    };
    match (d - today).num_days() {
        0 => "today".into(),
        1 => "tomorrow".into(),
        n if n > 1 => format!("in {n}d"),
        n => format!("{}d late", -n),
    }
}

/// Truncate to `width` characters, ending in an ellipsis when shortened.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // A Wednesday.
    fn wed() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn relative_words() {
        assert_eq!(parse_date_input("Today", wed()), Some(wed()));
        assert_eq!(parse_date_input("tomorrow", wed()), Some(ymd(2025, 1, 16)));
        assert_eq!(parse_date_input("eow", wed()), Some(ymd(2025, 1, 19)));
        assert_eq!(parse_date_input("end of month", wed()), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_date_input("weekend", wed()), Some(ymd(2025, 1, 18)));
        assert_eq!(parse_date_input("eom", ymd(2024, 12, 3)), Some(ymd(2024, 12, 31)));
    }

    #[test]
    fn offsets() {
        assert_eq!(parse_date_input("in 3d", wed()), Some(ymd(2025, 1, 18)));
        assert_eq!(parse_date_input("in 2w", wed()), Some(ymd(2025, 1, 29)));
        assert_eq!(parse_date_input("in 1m", wed()), Some(ymd(2025, 2, 14)));
        assert_eq!(parse_date_input("in xd", wed()), None);
        assert_eq!(parse_date_input("in ", wed()), None);
    }

    #[test]
    fn offsets_past_the_calendar_are_rejected() {
        assert_eq!(parse_date_input("in 99999999d", wed()), None);
        assert_eq!(parse_date_input("in 999999999999999d", wed()), None);
        assert_eq!(parse_date_input("in 9999999999999999w", wed()), None);
        assert_eq!(parse_date_input("in 9223372036854775807m", wed()), None);
        assert_eq!(read_date_input("in 99999999d", wed()), DateInput::Invalid);
    }

    #[test]
    fn weekdays() {
        assert_eq!(parse_date_input("friday", wed()), Some(ymd(2025, 1, 17)));
        assert_eq!(parse_date_input("this wed", wed()), Some(wed()));
        assert_eq!(parse_date_input("next mon", wed()), Some(ymd(2025, 1, 27)));
        assert_eq!(parse_date_input("mon", wed()), Some(ymd(2025, 1, 20)));
    }

    #[test]
    fn iso_and_garbage() {
        assert_eq!(parse_date_input("2025-03-09", wed()), Some(ymd(2025, 3, 9)));
        assert_eq!(parse_date_input("someday", wed()), None);
        assert_eq!(read_date_input("  ", wed()), DateInput::Clear);
        assert_eq!(read_date_input("nope", wed()), DateInput::Invalid);
    }

    #[test]
    fn formatting() {
        assert_eq!(format_date(Some(ymd(2025, 1, 5))), "05/01/2025");
        assert_eq!(format_date(None), "-");
        assert_eq!(format_due_relative(Some(ymd(2025, 1, 13)), wed()), "2d late");
        assert_eq!(format_due_relative(Some(ymd(2025, 1, 20)), wed()), "in 5d");
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
