#[macro_use] extern crate prettytable;

use anyhow::anyhow;
use log::error;
use structopt::StructOpt;

mod calendar;
mod cli;
mod config;
mod error;
mod import;
mod interface;
mod logging;
mod model;
mod progress;
mod scheduler;
mod store;
mod views;

use crate::config::Config;
use crate::model::TaskEdit;
use crate::views::Bucket;

use cli::{duration_minutes, Command::*, CommandLineArgs};

fn main() -> anyhow::Result<()> {
    // Get the command-line arguments.
    let CommandLineArgs {
        action,
        store_file,
        config_file,
        verbose,
    } = CommandLineArgs::from_args();

    // A file named on the command line must exist; the default one may not.
    let config = match config_file {
        Some(path) => Config::load_required(&path)?,
        None => match config::default_config_file() {
            Some(path) => Config::load(&path)?,
            None => Config::default(),
        },
    };

    let level = if verbose { "debug" } else { config.log_level.as_str() };
    let log_dir = config.log_dir.clone().or_else(config::default_log_dir);
    let _logger = logging::try_init_logging(level, log_dir.as_deref());

    // Unpack the store file.
    let store_file = store_file
        .or_else(|| config.store_path.clone())
        .or_else(config::default_store_file)
        .ok_or(anyhow!("Failed to find store file."))?;

    let database = store::open_store(&store_file)?;

    // Perform the action.
    let result = match action {
        Add {
            name,
            on,
            topic,
            duration,
            start_time,
            link,
        } => duration
            .map(duration_minutes)
            .transpose()
            .map_err(anyhow::Error::from)
            .and_then(|duration| {
                interface::add_task(&database, name, on, topic, duration, start_time, link)
            }),
        Done { id } => interface::toggle(&database, &id),
        Edit {
            id,
            name,
            topic,
            duration,
            start_time,
            link,
        } => duration
            .map(duration_minutes)
            .transpose()
            .map_err(anyhow::Error::from)
            .and_then(|duration| {
                let edit = TaskEdit {
                    task_name: name,
                    topic,
                    duration,
                    start_time,
                    link,
                };
                interface::edit(&database, &id, edit)
            }),
        Rm { id } => interface::remove(&database, &id),
        List => interface::list(&database),
        Today => interface::bucket(&database, Bucket::Today),
        Week => interface::bucket(&database, Bucket::Week),
        Weekend => interface::bucket(&database, Bucket::Weekend),
        ForwardWeekend => interface::forward_weekend(&database),
        Day { date } => interface::bucket(&database, Bucket::Day(date)),
        Month => interface::bucket(&database, Bucket::Month),
        Calendar { month, select } => interface::calendar(&database, month.as_deref(), select),
        Progress => interface::progress(&database),
        Schedule { on } => interface::schedule(&database, on),
        Import { file, text } => interface::import_source(file, text)
            .and_then(|source| interface::import(&database, &config.ai, source)),
    };

    if let Err(err) = &result {
        error!("event=command_failed error={:#}", err);
    }
    result
}
