use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TaskError;

/// A single task, saved as an entry of the persisted task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub task_name: String,
    #[serde(with = "iso_deadline")]
    pub deadline: DateTime<Utc>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// In minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<StartTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A task as entered by the user or extracted from a study plan, before it
/// gets an id and a completion flag.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub task_name: String,
    pub deadline: DateTime<Utc>,
    pub topic: Option<String>,
    pub duration: Option<u32>,
    pub start_time: Option<StartTime>,
    pub link: Option<String>,
}

impl NewTask {
    pub fn new(task_name: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        NewTask {
            task_name: task_name.into(),
            deadline,
            topic: None,
            duration: None,
            start_time: None,
            link: None,
        }
    }
}

/// Time of day a task is scheduled at, written `HH:MM` (24h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StartTime {
    hour: u32,
    minute: u32,
}

impl StartTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(StartTime { hour, minute })
        } else {
            None
        }
    }

    /// Minutes elapsed since midnight.
    pub fn minutes_from_midnight(&self) -> u32 {
        self.hour * 60 + self.minute
    }
}

impl FromStr for StartTime {
    type Err = TaskError;

    /// Accepts exactly two digits, a colon and two digits, 00:00 to 23:59.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TaskError::InvalidStartTime(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }
        let hour = u32::from(bytes[0] - b'0') * 10 + u32::from(bytes[1] - b'0');
        let minute = u32::from(bytes[3] - b'0') * 10 + u32::from(bytes[4] - b'0');
        StartTime::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for StartTime {
    type Error = TaskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StartTime> for String {
    fn from(time: StartTime) -> Self {
        time.to_string()
    }
}

impl fmt::Display for StartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Deadlines are written the way browsers print dates:
/// `YYYY-MM-DDTHH:mm:ss.sssZ`. Any RFC 3339 offset is accepted on read.
mod iso_deadline {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(deadline: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&deadline.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|deadline| deadline.with_timezone(&Utc))
            .map_err(|err| de::Error::custom(format!("invalid deadline `{}`: {}", raw, err)))
    }
}

/// A partial update of a task. `None` keeps the current value; for the
/// optional text attributes an empty string clears them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskEdit {
    pub task_name: Option<String>,
    pub topic: Option<String>,
    pub duration: Option<u32>,
    pub start_time: Option<String>,
    pub link: Option<String>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        *self == TaskEdit::default()
    }

    /// Validate every field first, then apply them all, so a rejected edit
    /// leaves the task untouched.
    fn apply(&self, task: &mut Task) -> Result<(), TaskError> {
        let task_name = match &self.task_name {
            Some(name) => Some(validate_name(name)?),
            None => None,
        };
        if let Some(duration) = self.duration {
            validate_duration(duration)?;
        }
        let start_time = match self.start_time.as_deref() {
            Some("") => Some(None),
            Some(raw) => Some(Some(raw.parse::<StartTime>()?)),
            None => None,
        };
        let link = match self.link.as_deref() {
            Some("") => Some(None),
            Some(raw) => Some(Some(validate_link(raw)?)),
            None => None,
        };

        if let Some(name) = task_name {
            task.task_name = name;
        }
        if let Some(topic) = &self.topic {
            task.topic = non_empty(topic);
        }
        if let Some(duration) = self.duration {
            task.duration = Some(duration);
        }
        if let Some(start_time) = start_time {
            task.start_time = start_time;
        }
        if let Some(link) = link {
            task.link = link;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, TaskError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn validate_duration(duration: u32) -> Result<(), TaskError> {
    if duration == 0 {
        return Err(TaskError::InvalidDuration);
    }
    Ok(())
}

fn validate_link(link: &str) -> Result<String, TaskError> {
    Url::parse(link).map_err(|_| TaskError::InvalidLink(link.to_string()))?;
    Ok(link.to_string())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The state of a task, relative to the current time.
#[derive(Debug, PartialEq)]
pub enum TaskState {
    Done,
    Overdue,
    Pending,
}

/// Return the local calendar day a deadline falls on.
pub fn local_day(deadline: &DateTime<Utc>) -> NaiveDate {
    deadline.with_timezone(&Local).date_naive()
}

/// Local midnight of the given day, as a UTC deadline.
pub fn start_of_local_day(day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // midnight skipped by a DST change
        None => Utc.from_utc_datetime(&midnight),
    }
}

/// Traits
pub trait TaskExtra {
    fn is_done(&self) -> bool;
    fn is_on_weekend(&self) -> bool;
    fn is_overdue(&self, now: DateTime<Local>) -> bool;
    fn state(&self, now: DateTime<Local>) -> TaskState;
}

impl TaskExtra for Task {
    fn is_done(&self) -> bool {
        self.completed
    }

    fn is_on_weekend(&self) -> bool {
        matches!(local_day(&self.deadline).weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Past deadlines are overdue, except those falling today.
    fn is_overdue(&self, now: DateTime<Local>) -> bool {
        self.deadline < now.with_timezone(&Utc) && local_day(&self.deadline) != now.date_naive()
    }

    fn state(&self, now: DateTime<Local>) -> TaskState {
        if self.is_done() {
            TaskState::Done
        } else if self.is_overdue(now) {
            TaskState::Overdue
        } else {
            TaskState::Pending
        }
    }
}

/// The whole study plan. Every mutation is applied in memory and the caller
/// then persists the full list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Task, TaskError> {
        self.tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    /// Add a task, giving it an id derived from `now` and keeping the list
    /// ordered by deadline.
    pub fn add(&mut self, new_task: NewTask, now: DateTime<Utc>) -> Result<Task, TaskError> {
        let task = self.build_task(new_task, now)?;
        self.tasks.push(task.clone());
        self.sort_by_deadline();
        Ok(task)
    }

    /// Add several tasks at once. Nothing is added if any of them is invalid.
    pub fn add_all(
        &mut self,
        new_tasks: Vec<NewTask>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Task>, TaskError> {
        let mut staged = self.clone();
        let mut added = Vec::with_capacity(new_tasks.len());
        for new_task in new_tasks {
            let task = staged.build_task(new_task, now)?;
            staged.tasks.push(task.clone());
            added.push(task);
        }
        staged.sort_by_deadline();
        *self = staged;
        Ok(added)
    }

    fn build_task(&self, new_task: NewTask, now: DateTime<Utc>) -> Result<Task, TaskError> {
        let task_name = validate_name(&new_task.task_name)?;
        if let Some(duration) = new_task.duration {
            validate_duration(duration)?;
        }
        let link = match new_task.link.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(raw) => Some(validate_link(raw)?),
        };
        Ok(Task {
            id: self.next_id(now),
            task_name,
            deadline: new_task.deadline,
            completed: false,
            topic: new_task.topic.as_deref().and_then(non_empty),
            duration: new_task.duration,
            start_time: new_task.start_time,
            link,
        })
    }

    /// `task-<millis>`, bumped until it does not clash with an existing id.
    fn next_id(&self, now: DateTime<Utc>) -> String {
        let mut millis = now.timestamp_millis();
        loop {
            let id = format!("task-{}", millis);
            if self.get(&id).is_none() {
                return id;
            }
            millis += 1;
        }
    }

    fn sort_by_deadline(&mut self) {
        self.tasks.sort_by_key(|task| task.deadline);
    }

    /// Flip the completion flag of a task and return its new value.
    pub fn toggle(&mut self, id: &str) -> Result<bool, TaskError> {
        let task = self.get_mut(id)?;
        task.completed = !task.completed;
        Ok(task.completed)
    }

    pub fn update(&mut self, id: &str, edit: &TaskEdit) -> Result<Task, TaskError> {
        let task = self.get_mut(id)?;
        edit.apply(task)?;
        Ok(task.clone())
    }

    pub fn remove(&mut self, id: &str) -> Result<Task, TaskError> {
        let position = self
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        Ok(self.tasks.remove(position))
    }

    /// Push every unfinished task due on a Saturday or Sunday one week
    /// later, keeping its local time of day. Returns how many tasks moved.
    pub fn forward_weekend(&mut self) -> usize {
        let mut moved = 0;
        for task in self.tasks.iter_mut() {
            if task.is_done() || !task.is_on_weekend() {
                continue;
            }
            task.deadline = add_local_days(&task.deadline, 7);
            moved += 1;
        }
        moved
    }
}

/// Add calendar days in local time, so a DST change in between does not
/// shift the time of day.
fn add_local_days(deadline: &DateTime<Utc>, days: i64) -> DateTime<Utc> {
    let shifted = deadline.with_timezone(&Local).naive_local() + Duration::days(days);
    match Local.from_local_datetime(&shifted).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => *deadline + Duration::days(days),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn local_deadline(day: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
        let naive = day.and_hms_opt(hour, minute, 0).unwrap();
        Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn add_assigns_id_and_sorts_by_deadline() {
        let mut list = TaskList::default();
        let later = list
            .add(
                NewTask::new("Read chapter 3", local_deadline(date(2024, 7, 26), 12, 0)),
                at(1_000),
            )
            .unwrap();
        let sooner = list
            .add(NewTask::new("Flashcards", local_deadline(date(2024, 7, 20), 12, 0)), at(2_000))
            .unwrap();

        assert_eq!(later.id, "task-1000");
        assert!(!later.completed);
        let names: Vec<_> = list.tasks().iter().map(|t| t.task_name.as_str()).collect();
        assert_eq!(names, vec!["Flashcards", "Read chapter 3"]);
        assert_eq!(list.get(&sooner.id).unwrap().task_name, "Flashcards");
    }

    #[test]
    fn ids_stay_unique_within_the_same_millisecond() {
        let mut list = TaskList::default();
        let deadline = local_deadline(date(2024, 7, 26), 9, 0);
        let added = list
            .add_all(
                vec![NewTask::new("a", deadline), NewTask::new("b", deadline)],
                at(5),
            )
            .unwrap();
        assert_eq!(added[0].id, "task-5");
        assert_eq!(added[1].id, "task-6");
        assert_eq!(list.add(NewTask::new("c", deadline), at(5)).unwrap().id, "task-7");
    }

    #[test]
    fn add_rejects_blank_names_and_trims() {
        let mut list = TaskList::default();
        let deadline = local_deadline(date(2024, 7, 26), 9, 0);
        assert_eq!(
            list.add(NewTask::new("   ", deadline), at(1)),
            Err(TaskError::EmptyName)
        );
        let task = list.add(NewTask::new("  Essay  ", deadline), at(1)).unwrap();
        assert_eq!(task.task_name, "Essay");
    }

    #[test]
    fn add_all_is_all_or_nothing() {
        let mut list = TaskList::default();
        let deadline = local_deadline(date(2024, 7, 26), 9, 0);
        let batch = vec![NewTask::new("ok", deadline), NewTask::new("", deadline)];
        let result = list.add_all(batch, at(1));
        assert_eq!(result, Err(TaskError::EmptyName));
        assert!(list.is_empty());
    }

    #[test]
    fn toggle_flips_and_reports_missing_ids() {
        let mut list = TaskList::default();
        let task = list
            .add(NewTask::new("Quiz", local_deadline(date(2024, 7, 26), 9, 0)), at(1))
            .unwrap();
        assert_eq!(list.toggle(&task.id), Ok(true));
        assert_eq!(list.toggle(&task.id), Ok(false));
        assert_eq!(
            list.toggle("task-404"),
            Err(TaskError::NotFound("task-404".to_string()))
        );
    }

    #[test]
    fn update_merges_and_clears_attributes() {
        let mut list = TaskList::default();
        let task = list
            .add(NewTask::new("Lab report", local_deadline(date(2024, 7, 26), 9, 0)), at(1))
            .unwrap();

        let edit = TaskEdit {
            topic: Some("Chemistry".to_string()),
            duration: Some(90),
            start_time: Some("09:30".to_string()),
            link: Some("https://example.org/lab".to_string()),
            ..TaskEdit::default()
        };
        let updated = list.update(&task.id, &edit).unwrap();
        assert_eq!(updated.task_name, "Lab report");
        assert_eq!(updated.topic.as_deref(), Some("Chemistry"));
        assert_eq!(updated.duration, Some(90));
        assert_eq!(updated.start_time, StartTime::new(9, 30));
        assert_eq!(updated.link.as_deref(), Some("https://example.org/lab"));

        let clear = TaskEdit {
            topic: Some(String::new()),
            start_time: Some(String::new()),
            link: Some(String::new()),
            ..TaskEdit::default()
        };
        let cleared = list.update(&task.id, &clear).unwrap();
        assert_eq!(cleared.topic, None);
        assert_eq!(cleared.start_time, None);
        assert_eq!(cleared.link, None);
        assert_eq!(cleared.duration, Some(90));
    }

    #[test]
    fn rejected_update_leaves_task_untouched() {
        let mut list = TaskList::default();
        let task = list
            .add(NewTask::new("Lab report", local_deadline(date(2024, 7, 26), 9, 0)), at(1))
            .unwrap();
        let edit = TaskEdit {
            task_name: Some("Renamed".to_string()),
            start_time: Some("24:00".to_string()),
            ..TaskEdit::default()
        };
        assert_eq!(
            list.update(&task.id, &edit),
            Err(TaskError::InvalidStartTime("24:00".to_string()))
        );
        assert_eq!(list.get(&task.id).unwrap().task_name, "Lab report");

        let bad_link = TaskEdit {
            link: Some("not a url".to_string()),
            ..TaskEdit::default()
        };
        assert!(matches!(list.update(&task.id, &bad_link), Err(TaskError::InvalidLink(_))));

        let zero = TaskEdit {
            duration: Some(0),
            ..TaskEdit::default()
        };
        assert_eq!(list.update(&task.id, &zero), Err(TaskError::InvalidDuration));
    }

    #[test]
    fn start_time_parsing() {
        assert_eq!("00:00".parse(), Ok(StartTime::new(0, 0).unwrap()));
        assert_eq!("23:59".parse(), Ok(StartTime::new(23, 59).unwrap()));
        for bad in &["9:00", "24:00", "12:60", "12-30", "ab:cd", "12:300"] {
            assert!(bad.parse::<StartTime>().is_err(), "{} should be rejected", bad);
        }
        assert_eq!(StartTime::new(7, 5).unwrap().to_string(), "07:05");
    }

    #[test]
    fn remove_drops_only_the_target() {
        let mut list = TaskList::default();
        let deadline = local_deadline(date(2024, 7, 26), 9, 0);
        let first = list.add(NewTask::new("a", deadline), at(1)).unwrap();
        let second = list.add(NewTask::new("b", deadline), at(2)).unwrap();
        assert_eq!(list.remove(&first.id).unwrap().task_name, "a");
        assert_eq!(list.len(), 1);
        assert_eq!(list.tasks()[0].id, second.id);
        assert!(list.remove(&first.id).is_err());
    }

    #[test]
    fn forward_weekend_moves_unfinished_weekend_tasks_by_a_week() {
        let mut list = TaskList::default();
        // 2024-07-27 is a Saturday, 2024-07-28 a Sunday
        let saturday = list
            .add(NewTask::new("sat", local_deadline(date(2024, 7, 27), 10, 0)), at(1))
            .unwrap();
        let sunday_done = list
            .add(NewTask::new("sun", local_deadline(date(2024, 7, 28), 10, 0)), at(2))
            .unwrap();
        let friday = list
            .add(NewTask::new("fri", local_deadline(date(2024, 7, 26), 10, 0)), at(3))
            .unwrap();
        list.toggle(&sunday_done.id).unwrap();

        assert_eq!(list.forward_weekend(), 1);
        assert_eq!(
            list.get(&saturday.id).unwrap().deadline,
            local_deadline(date(2024, 8, 3), 10, 0)
        );
        assert_eq!(list.get(&sunday_done.id).unwrap().deadline, sunday_done.deadline);
        assert_eq!(list.get(&friday.id).unwrap().deadline, friday.deadline);
    }

    #[test]
    fn task_state_marks_past_days_overdue() {
        let now = Local
            .from_local_datetime(&date(2024, 7, 26).and_hms_opt(15, 0, 0).unwrap())
            .earliest()
            .unwrap();
        let mut list = TaskList::default();
        let yesterday = list
            .add(NewTask::new("old", local_deadline(date(2024, 7, 25), 9, 0)), at(1))
            .unwrap();
        let this_morning = list
            .add(NewTask::new("today", local_deadline(date(2024, 7, 26), 9, 0)), at(2))
            .unwrap();
        assert_eq!(yesterday.state(now), TaskState::Overdue);
        assert_eq!(this_morning.state(now), TaskState::Pending);
        list.toggle(&yesterday.id).unwrap();
        assert_eq!(list.get(&yesterday.id).unwrap().state(now), TaskState::Done);
    }

    #[test]
    fn serializes_with_browser_field_names() {
        let task = Task {
            id: "task-1".to_string(),
            task_name: "Essay".to_string(),
            deadline: Utc.with_ymd_and_hms(2024, 7, 26, 0, 0, 0).unwrap(),
            completed: false,
            topic: None,
            duration: Some(45),
            start_time: StartTime::new(9, 0),
            link: None,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "task-1",
                "taskName": "Essay",
                "deadline": "2024-07-26T00:00:00.000Z",
                "completed": false,
                "duration": 45,
                "startTime": "09:00"
            })
        );
        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, task);
    }
}
