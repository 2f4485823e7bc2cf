use std::path::PathBuf;
use std::time::Duration as STDDuration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use humantime::format_duration;
use log::info;
use prettytable::{Cell, Row, Table};
use rusqlite::Connection;

use crate::calendar::{self, Month};
use crate::config::AiConfig;
use crate::error::{ImportError, TaskError};
use crate::import::{handle_import, GeminiExtractor, ImportSource, PlanExtractor};
use crate::model::{
    local_day, start_of_local_day, NewTask, StartTime, Task, TaskEdit, TaskExtra, TaskList,
    TaskState,
};
use crate::progress::{self, Report};
use crate::scheduler;
use crate::store;
use crate::views::{task_days, Bucket};

const NAME_WIDTH: usize = 40;
const BAR_WIDTH: usize = 20;

/// Load the plan, apply `change` and save the whole plan back.
fn mutate<T>(
    db: &Connection,
    change: impl FnOnce(&mut TaskList) -> Result<T, TaskError>,
) -> Result<T> {
    let mut tasks = store::load_tasks(db)?;
    let outcome = change(&mut tasks)?;
    store::save_tasks(db, &tasks)?;
    Ok(outcome)
}

pub fn add_task(
    db: &Connection,
    name: String,
    on: Option<NaiveDate>,
    topic: Option<String>,
    duration: Option<u32>,
    start_time: Option<String>,
    link: Option<String>,
) -> Result<()> {
    let day = on.unwrap_or_else(|| Local::now().date_naive());
    let mut new_task = NewTask::new(name, start_of_local_day(day));
    new_task.topic = topic;
    new_task.duration = duration;
    new_task.start_time = start_time.map(|raw| raw.parse::<StartTime>()).transpose()?;
    new_task.link = link;

    let task = mutate(db, |tasks| tasks.add(new_task, Utc::now()))?;
    info!("event=task_added id={}", task.id);
    println!("{} {} (due {})", task.id, task.task_name, fmt_day(local_day(&task.deadline)));
    Ok(())
}

pub fn toggle(db: &Connection, id: &str) -> Result<()> {
    let completed = mutate(db, |tasks| tasks.toggle(id))?;
    info!("event=task_toggled id={} completed={}", id, completed);
    if completed {
        println!("{} done.", id);
    } else {
        println!("{} marked as not done.", id);
    }
    Ok(())
}

pub fn edit(db: &Connection, id: &str, edit: TaskEdit) -> Result<()> {
    if edit.is_empty() {
        return Err(anyhow!(
            "Nothing to change; pass at least one of --name, --topic, --duration, --at, --link."
        ));
    }
    let task = mutate(db, |tasks| tasks.update(id, &edit))?;
    info!("event=task_edited id={}", task.id);
    print_tasks(&format!("Edited {}", task.id), &[&task], Local::now(), "");
    Ok(())
}

pub fn remove(db: &Connection, id: &str) -> Result<()> {
    let task = mutate(db, |tasks| tasks.remove(id))?;
    info!("event=task_removed id={}", task.id);
    println!("Removed {} ({}).", task.id, task.task_name);
    Ok(())
}

pub fn list(db: &Connection) -> Result<()> {
    let tasks = store::load_tasks(db)?;
    let all: Vec<&Task> = tasks.tasks().iter().collect();
    print_tasks(
        "All Tasks",
        &all,
        Local::now(),
        "No tasks yet; use 'studyflow add' or 'studyflow import'.",
    );
    if let Some(saved) = store::last_saved(db)? {
        println!("Last saved {}.", saved.format("%F %T"));
    }
    Ok(())
}

/// Print the tasks of a date bucket.
pub fn bucket(db: &Connection, bucket: Bucket) -> Result<()> {
    let tasks = store::load_tasks(db)?;
    let now = Local::now();
    let selected = bucket.filter(tasks.tasks(), now.date_naive());
    let (title, empty) = match bucket {
        Bucket::Today => ("Today's Focus".to_string(), "Nothing due today."),
        Bucket::Day(day) => (format!("Tasks for {}", fmt_day(day)), "No tasks for this day."),
        Bucket::Week => ("This Week".to_string(), "Nothing due this week."),
        Bucket::Weekend => ("This Weekend's Grind".to_string(), "Nothing due this weekend."),
        Bucket::Month => ("All Monthly Tasks".to_string(), "Nothing due this month."),
    };
    print_tasks(&title, &selected, now, empty);
    Ok(())
}

pub fn forward_weekend(db: &Connection) -> Result<()> {
    let moved = mutate(db, |tasks| Ok(tasks.forward_weekend()))?;
    info!("event=weekend_forwarded moved={}", moved);
    println!("Forwarded {} task(s) to next weekend.", moved);
    Ok(())
}

pub fn calendar(db: &Connection, month: Option<&str>, select: Option<NaiveDate>) -> Result<()> {
    let tasks = store::load_tasks(db)?;
    let today = Local::now().date_naive();
    let month = match month {
        Some(raw) => Month::parse(raw)?,
        None => Month::containing(select.unwrap_or(today)),
    };
    let selected = select.unwrap_or(today);
    print!("{}", calendar::render_month(&month, &task_days(tasks.tasks()), Some(selected)));
    println!("[dd] selected day   * has tasks");
    Ok(())
}

pub fn progress(db: &Connection) -> Result<()> {
    let tasks = store::load_tasks(db)?;
    let report = Report::compute(tasks.tasks(), Local::now().date_naive());

    let mut table = Table::new();
    table.add_row(row!["period", "progress", "tasks", "%"]);
    for (period, data) in report.periods().iter() {
        table.add_row(row![
            period,
            progress::bar(data, BAR_WIDTH),
            format!("{} / {}", data.completed, data.total),
            format!("{:.0}", data.percent)
        ]);
    }
    table.printstd();
    println!("\"{}\"", progress::random_quote());
    Ok(())
}

pub fn schedule(db: &Connection, on: Option<NaiveDate>) -> Result<()> {
    let tasks = store::load_tasks(db)?;
    let day = on.unwrap_or_else(|| Local::now().date_naive());
    let of_day = Bucket::Day(day).filter(tasks.tasks(), day);
    println!("Schedule for {}", fmt_day(day));
    print!("{}", scheduler::render(&scheduler::layout(&of_day)));
    Ok(())
}

/// The import source named on the command line: a file wins over text.
pub fn import_source(file: Option<PathBuf>, text: Option<String>) -> Result<ImportSource> {
    match (file, text) {
        (Some(path), _) => ImportSource::from_path(&path)
            .with_context(|| format!("Import Failed: {}", path.display())),
        (None, Some(content)) => Ok(ImportSource::Text { content }),
        (None, None) => Err(ImportError::NoContent).context("Import Failed"),
    }
}

pub fn import(db: &Connection, config: &AiConfig, source: ImportSource) -> Result<()> {
    let extractor = GeminiExtractor::from_config(config)?;
    let added = import_with(db, &extractor, source, Local::now().year())?;
    println!("Success! Imported {} tasks.", added.len());
    Ok(())
}

/// Extract tasks with `extractor` and add them to the stored plan.
pub fn import_with(
    db: &Connection,
    extractor: &dyn PlanExtractor,
    source: ImportSource,
    current_year: i32,
) -> Result<Vec<Task>> {
    let new_tasks = handle_import(extractor, source, current_year).context("Import Failed")?;
    let added = mutate(db, |tasks| tasks.add_all(new_tasks, Utc::now()))?;
    info!("event=tasks_imported count={}", added.len());
    Ok(added)
}

fn fmt_day(day: NaiveDate) -> String {
    day.format("%B %-d, %Y").to_string()
}

fn fmt_time(task: &Task) -> String {
    let start = task.start_time.map(|time| time.to_string());
    let duration = task
        .duration
        .map(|minutes| format_duration(STDDuration::from_secs(u64::from(minutes) * 60)))
        .map(|duration| duration.to_string());
    match (start, duration) {
        (Some(start), Some(duration)) => format!("{} ({})", start, duration),
        (Some(start), None) => start,
        (None, Some(duration)) => duration,
        (None, None) => String::new(),
    }
}

fn task_row(task: &Task, now: DateTime<Local>) -> Row {
    let state = task.state(now);
    let deadline = Cell::new(&fmt_day(local_day(&task.deadline)));
    let deadline = match state {
        TaskState::Overdue => deadline.style_spec("Fr"),
        _ => deadline,
    };
    let done = match state {
        TaskState::Done => "x",
        _ => "",
    };
    let mut name = textwrap::fill(&task.task_name, NAME_WIDTH);
    if let Some(link) = &task.link {
        name.push('\n');
        name.push_str(link);
    }
    Row::new(vec![
        Cell::new(done),
        Cell::new(&task.id),
        Cell::new(&name),
        deadline,
        Cell::new(task.topic.as_deref().unwrap_or("")),
        Cell::new(&fmt_time(task)),
    ])
}

pub fn tasks_table(tasks: &[&Task], now: DateTime<Local>) -> Table {
    let mut table = Table::new();
    table.add_row(row!["done", "id", "task", "deadline", "topic", "time"]);
    for task in tasks {
        table.add_row(task_row(task, now));
    }
    table
}

fn print_tasks(title: &str, tasks: &[&Task], now: DateTime<Local>, empty: &str) {
    println!("{}", title);
    if tasks.is_empty() {
        println!("{}", empty);
        return;
    }
    tasks_table(tasks, now).printstd();
}
