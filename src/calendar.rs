use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::TaskError;

const WEEKDAY_HEADER: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];
const CELL_WIDTH: usize = 5;

/// A calendar month, parsed from `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Month {
    first_day: NaiveDate,
}

impl Month {
    pub fn containing(day: NaiveDate) -> Self {
        Month {
            first_day: day - Duration::days(i64::from(day.day0())),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, TaskError> {
        let invalid = || TaskError::InvalidMonth(raw.to_string());
        let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        Ok(Month { first_day })
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let month = self.first_day.month();
        self.first_day
            .iter_days()
            .take_while(move |day| day.month() == month)
    }

    pub fn title(&self) -> String {
        self.first_day.format("%B %Y").to_string()
    }
}

/// Render a month as a Sunday-first grid. Days with tasks are followed by
/// `*`, the selected day is wrapped in brackets.
pub fn render_month(
    month: &Month,
    task_days: &BTreeSet<NaiveDate>,
    selected: Option<NaiveDate>,
) -> String {
    let grid_width = CELL_WIDTH * 7;
    let mut out = String::new();
    out.push_str(&format!("{:^width$}\n", month.title(), width = grid_width));
    for name in WEEKDAY_HEADER.iter() {
        out.push_str(&format!(" {:<width$}", name, width = CELL_WIDTH - 1));
    }
    out.push('\n');

    let leading = month.first_day().weekday().num_days_from_sunday() as usize;
    let mut line = " ".repeat(leading * CELL_WIDTH);
    let mut column = leading;
    for day in month.days() {
        line.push_str(&cell(day, task_days.contains(&day), selected == Some(day)));
        column += 1;
        if column == 7 {
            out.push_str(line.trim_end());
            out.push('\n');
            line.clear();
            column = 0;
        }
    }
    if column > 0 {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn cell(day: NaiveDate, has_tasks: bool, selected: bool) -> String {
    let (open, close) = if selected { ('[', ']') } else { (' ', ' ') };
    let mark = if has_tasks { '*' } else { ' ' };
    format!("{}{:>2}{}{}", open, day.day(), close, mark)
}
