use chrono::NaiveDate;
use rand::seq::IndexedRandom;

use crate::model::{Task, TaskExtra};
use crate::views::Bucket;

const QUOTES: [&str; 2] = [
    "Don't wish for it. Work for it.",
    "The earlier you start working on something, the earlier you will see results.",
];

/// Completion of a group of tasks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub percent: f64,
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// An empty group is at zero percent.
    pub fn of(tasks: &[&Task]) -> Self {
        let total = tasks.len();
        if total == 0 {
            return Progress {
                percent: 0.0,
                completed: 0,
                total: 0,
            };
        }
        let completed = tasks.iter().filter(|task| task.is_done()).count();
        Progress {
            percent: completed as f64 / total as f64 * 100.0,
            completed,
            total,
        }
    }
}

/// Daily, weekly and monthly progress of a plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub daily: Progress,
    pub weekly: Progress,
    pub monthly: Progress,
}

impl Report {
    pub fn compute(tasks: &[Task], today: NaiveDate) -> Self {
        Report {
            daily: Progress::of(&Bucket::Today.filter(tasks, today)),
            weekly: Progress::of(&Bucket::Week.filter(tasks, today)),
            monthly: Progress::of(&Bucket::Month.filter(tasks, today)),
        }
    }

    pub fn periods(&self) -> [(&'static str, Progress); 3] {
        [
            ("Daily", self.daily),
            ("Weekly", self.weekly),
            ("Monthly", self.monthly),
        ]
    }
}

/// A text progress bar, `width` cells wide.
pub fn bar(progress: &Progress, width: usize) -> String {
    let filled = ((progress.percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub fn random_quote() -> &'static str {
    QUOTES.choose(&mut rand::rng()).copied().unwrap_or(QUOTES[0])
}
