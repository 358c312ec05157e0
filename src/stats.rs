//! Numbers for the dashboard header. Pure functions over the cached lists.

use chrono::{Duration, NaiveDate};

use crate::entity::{Entity, Objective, Project, Task};
use crate::fields::Status;

/// How far ahead "due soon" looks, in days.
pub const DUE_SOON_DAYS: i64 = 7;

/// Length of the completion history shown as sparklines.
pub const HISTORY_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

pub fn summarize<E: Entity>(items: &[E]) -> Summary {
    let completed = items.iter().filter(|e| e.status() == Status::Completed).count();
    Summary {
        total: items.len(),
        active: items.len() - completed,
        completed,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub tasks: Summary,
    pub projects: Summary,
    pub objectives: Summary,
    /// Projects at high or critical priority.
    pub high_priority_projects: usize,
    /// Mean objective progress, rounded. Zero with no objectives.
    pub objective_progress: u8,
    /// Projects and objectives due between tomorrow and a week out.
    pub due_soon: usize,
}

pub fn dashboard_stats(
    tasks: &[Task],
    projects: &[Project],
    objectives: &[Objective],
    today: NaiveDate,
) -> DashboardStats {
    DashboardStats {
        tasks: summarize(tasks),
        projects: summarize(projects),
        objectives: summarize(objectives),
        high_priority_projects: projects.iter().filter(|p| p.priority.is_high()).count(),
        objective_progress: mean_progress(objectives),
        due_soon: due_soon(projects, today) + due_soon(objectives, today),
    }
}

pub fn mean_progress<E: Entity>(items: &[E]) -> u8 {
    let progress: Vec<u32> = items.iter().filter_map(|e| e.progress()).map(u32::from).collect();
    if progress.is_empty() {
        return 0;
    }
    let sum: u32 = progress.iter().sum();
    (sum as f64 / progress.len() as f64).round() as u8
}

pub fn due_soon<E: Entity>(items: &[E], today: NaiveDate) -> usize {
    items
        .iter()
        .filter_map(|e| e.due_date())
        .filter(|d| (1..=DUE_SOON_DAYS).contains(&(*d - today).num_days()))
        .count()
}

/// Completed items per day for the last `HISTORY_DAYS` days, oldest first.
/// An item counts on the UTC day of its last update.
pub fn completion_series<E: Entity>(items: &[E], today: NaiveDate) -> Vec<u64> {
    (0..HISTORY_DAYS)
        .rev()
        .map(|back| {
            let day = today - Duration::days(back as i64);
            items
                .iter()
                .filter(|e| e.status() == Status::Completed && e.updated_at().date_naive() == day)
                .count() as u64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityMeta, Field, FieldValue, FieldValues};
    use crate::fields::Priority;
    use chrono::{TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn make<E: Entity>(id: &str, day: u32, values: FieldValues) -> E {
        let at = Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap();
        E::from_parts(
            EntityMeta {
                id: id.into(),
                created_at: at,
                updated_at: at,
            },
            &values,
        )
    }

    fn done() -> FieldValues {
        FieldValues::new().with(Field::Status, FieldValue::Status(Status::Completed))
    }

    fn due_in(days: i64) -> FieldValues {
        FieldValues::new().with(Field::DueDate, FieldValue::Date(Some(today() + Duration::days(days))))
    }

    #[test]
    fn summaries_split_active_and_completed() {
        let tasks: Vec<Task> = vec![make("a", 1, done()), make("b", 1, FieldValues::new())];
        let s = summarize(&tasks);
        assert_eq!(s, Summary { total: 2, active: 1, completed: 1 });
    }

    #[test]
    fn mean_progress_rounds_and_handles_empty() {
        let objectives: Vec<Objective> = [33u8, 34, 34]
            .iter()
            .enumerate()
            .map(|(i, p)| {
                make(&i.to_string(), 1, FieldValues::new().with(Field::Progress, FieldValue::Progress(*p)))
            })
            .collect();
        assert_eq!(mean_progress(&objectives), 34);
        assert_eq!(mean_progress::<Objective>(&[]), 0);
    }

    #[test]
    fn due_soon_excludes_today_and_past_week() {
        let projects: Vec<Project> = vec![
            make("today", 1, due_in(0)),
            make("tomorrow", 1, due_in(1)),
            make("week", 1, due_in(7)),
            make("later", 1, due_in(8)),
            make("late", 1, due_in(-2)),
            make("none", 1, FieldValues::new()),
        ];
        assert_eq!(due_soon(&projects, today()), 2);
    }

    #[test]
    fn dashboard_counts_high_priority() {
        let projects: Vec<Project> = vec![
            make("a", 1, FieldValues::new().with(Field::Priority, FieldValue::Priority(Priority::Critical))),
            make("b", 1, FieldValues::new().with(Field::Priority, FieldValue::Priority(Priority::High))),
            make("c", 1, FieldValues::new()),
        ];
        let stats = dashboard_stats(&[], &projects, &[], today());
        assert_eq!(stats.high_priority_projects, 2);
        assert_eq!(stats.projects.active, 3);
        assert_eq!(stats.objective_progress, 0);
    }

    #[test]
    fn completion_series_buckets_by_update_day() {
        let tasks: Vec<Task> = vec![
            make("a", 10, done()),
            make("b", 10, done()),
            make("c", 8, done()),
            make("d", 10, FieldValues::new()),
            make("e", 1, done()),
        ];
        assert_eq!(completion_series(&tasks, today()), vec![0, 0, 0, 0, 1, 0, 2]);
    }
}
