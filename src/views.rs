use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::model::{local_day, Task};

/// A date range predicate over task deadlines, evaluated in local time
/// relative to a reference day. Weeks run from Sunday to Saturday.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bucket {
    Today,
    Day(NaiveDate),
    Week,
    Weekend,
    Month,
}

impl Bucket {
    pub fn contains(&self, task: &Task, today: NaiveDate) -> bool {
        let day = local_day(&task.deadline);
        match self {
            Bucket::Today => day == today,
            Bucket::Day(selected) => day == *selected,
            Bucket::Week => in_week(day, today),
            Bucket::Weekend => {
                in_week(day, today) && matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
            }
            Bucket::Month => day.year() == today.year() && day.month() == today.month(),
        }
    }

    /// Keep the tasks of the bucket, in list order.
    pub fn filter<'a>(&self, tasks: &'a [Task], today: NaiveDate) -> Vec<&'a Task> {
        tasks
            .iter()
            .filter(|task| self.contains(task, today))
            .collect()
    }
}

/// First (Sunday) and last (Saturday) day of the week containing `day`.
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = day - Duration::days(i64::from(day.weekday().num_days_from_sunday()));
    (start, start + Duration::days(6))
}

fn in_week(day: NaiveDate, today: NaiveDate) -> bool {
    let (start, end) = week_bounds(today);
    start <= day && day <= end
}

/// The local days carrying at least one task.
pub fn task_days(tasks: &[Task]) -> BTreeSet<NaiveDate> {
    tasks.iter().map(|task| local_day(&task.deadline)).collect()
}
