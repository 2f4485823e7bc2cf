use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use humantime::parse_duration;
use structopt::StructOpt;

use crate::error::TaskError;

fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Add a task due on a given day (today by default).
    Add {
        /// The task name.
        #[structopt()]
        name: String,

        /// Due date, YYYY-MM-DD.
        #[structopt(long, parse(try_from_str = parse_date))]
        on: Option<NaiveDate>,

        #[structopt(long)]
        topic: Option<String>,

        /// Planned duration (parse_duration), e.g. 45m or 1h30m.
        #[structopt(long, parse(try_from_str = parse_duration))]
        duration: Option<Duration>,

        /// Start time, HH:MM.
        #[structopt(long = "at")]
        start_time: Option<String>,

        #[structopt(long)]
        link: Option<String>,
    },
    /// Mark a task as done, or as not done if it already is.
    Done {
        #[structopt()]
        id: String,
    },
    /// Change the attributes of a task. An empty value clears topic, start
    /// time and link.
    Edit {
        #[structopt()]
        id: String,

        #[structopt(long)]
        name: Option<String>,

        #[structopt(long)]
        topic: Option<String>,

        #[structopt(long, parse(try_from_str = parse_duration))]
        duration: Option<Duration>,

        #[structopt(long = "at")]
        start_time: Option<String>,

        #[structopt(long)]
        link: Option<String>,
    },
    /// Remove a task.
    Rm {
        #[structopt()]
        id: String,
    },
    /// List every task.
    List,
    /// Tasks due today.
    Today,
    /// Tasks due this week, Sunday to Saturday.
    Week,
    /// Tasks due this weekend.
    Weekend,
    /// Move every unfinished weekend task to the next weekend.
    ForwardWeekend,
    /// Tasks due on a given day.
    Day {
        #[structopt(parse(try_from_str = parse_date))]
        date: NaiveDate,
    },
    /// Tasks due this month.
    Month,
    /// Show a month, marking the days that have tasks.
    Calendar {
        /// Month to show, YYYY-MM (current month by default).
        #[structopt(long)]
        month: Option<String>,

        /// Day to highlight (today by default).
        #[structopt(long, parse(try_from_str = parse_date))]
        select: Option<NaiveDate>,
    },
    /// Daily, weekly and monthly completion.
    Progress,
    /// Hour by hour schedule of a day (today by default).
    Schedule {
        #[structopt(long, parse(try_from_str = parse_date))]
        on: Option<NaiveDate>,
    },
    /// Extract tasks and deadlines from a study plan with the AI model.
    Import {
        /// A PDF or TXT file.
        #[structopt(long, parse(from_os_str), conflicts_with = "text", required_unless = "text")]
        file: Option<PathBuf>,

        /// The plan, pasted as text.
        #[structopt(long)]
        text: Option<String>,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(name = "StudyFlow", about = "A study planner for the terminal.")]
pub struct CommandLineArgs {
    #[structopt(subcommand)]
    pub action: Command,

    /// Use a different task store.
    #[structopt(parse(from_os_str), short, long)]
    pub store_file: Option<PathBuf>,

    /// Use a different configuration file.
    #[structopt(parse(from_os_str), short, long)]
    pub config_file: Option<PathBuf>,

    /// Log at debug level.
    #[structopt(short, long)]
    pub verbose: bool,
}

/// Whole minutes of a duration given on the command line.
pub fn duration_minutes(duration: Duration) -> Result<u32, TaskError> {
    u32::try_from(duration.as_secs() / 60).map_err(|_| TaskError::InvalidDuration)
}
