use crate::model::{Task, TaskExtra};

const MINUTES_PER_HOUR: u32 = 60;
const MINUTES_PER_DAY: u32 = 24 * MINUTES_PER_HOUR;

/// A task placed on the day grid. `top` and `height` are in minutes from
/// midnight, one minute per unit.
#[derive(Debug, PartialEq)]
pub struct Slot<'a> {
    pub task: &'a Task,
    pub top: u32,
    pub height: u32,
}

impl<'a> Slot<'a> {
    /// End of the slot, clipped to midnight.
    pub fn end(&self) -> u32 {
        self.top.saturating_add(self.height).min(MINUTES_PER_DAY)
    }

    pub fn covers_hour(&self, hour: u32) -> bool {
        let start = hour * MINUTES_PER_HOUR;
        self.top < start + MINUTES_PER_HOUR && self.end() > start
    }

    pub fn starts_in_hour(&self, hour: u32) -> bool {
        self.top / MINUTES_PER_HOUR == hour
    }

    pub fn time_range(&self) -> String {
        format!("{}-{}", clock(self.top), clock(self.end()))
    }
}

/// Tasks of one day, split between the ones that can be drawn on the
/// hour grid and the rest.
#[derive(Debug, Default)]
pub struct DaySchedule<'a> {
    pub slots: Vec<Slot<'a>>,
    pub unscheduled: Vec<&'a Task>,
}

/// Position of a task on the grid: both a start time and a duration are
/// needed to place it.
pub fn position(task: &Task) -> Option<(u32, u32)> {
    match (task.start_time, task.duration) {
        (Some(start), Some(duration)) => Some((start.minutes_from_midnight(), duration)),
        _ => None,
    }
}

pub fn layout<'a>(tasks: &[&'a Task]) -> DaySchedule<'a> {
    let mut schedule = DaySchedule::default();
    for &task in tasks {
        match position(task) {
            Some((top, height)) => schedule.slots.push(Slot { task, top, height }),
            None => schedule.unscheduled.push(task),
        }
    }
    schedule.slots.sort_by_key(|slot| slot.top);
    schedule
}

/// `12 AM`, `1 AM`, ... `11 PM`.
pub fn hour_label(hour: u32) -> String {
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let twelve = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{} {}", twelve, suffix)
}

fn clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / MINUTES_PER_HOUR, minutes % MINUTES_PER_HOUR)
}

/// Render the 24 hour grid, one line per hour. Tasks spanning several hours
/// are continued with `|` on the following lines.
pub fn render(schedule: &DaySchedule) -> String {
    let mut out = String::new();
    for hour in 0..24 {
        let entries: Vec<String> = schedule
            .slots
            .iter()
            .filter(|slot| slot.covers_hour(hour))
            .map(|slot| {
                if slot.starts_in_hour(hour) {
                    let mark = if slot.task.is_done() { "x" } else { " " };
                    format!("[{}] {} ({})", mark, slot.task.task_name, slot.time_range())
                } else {
                    format!("| {}", slot.task.task_name)
                }
            })
            .collect();
        let line = format!("{:>5} | {}", hour_label(hour), entries.join("  "));
        out.push_str(line.trim_end());
        out.push('\n');
    }
    if !schedule.unscheduled.is_empty() {
        out.push_str("\nUnscheduled:\n");
        for task in &schedule.unscheduled {
            out.push_str(&format!("  {} ({})\n", task.task_name, task.id));
        }
    }
    out
}
