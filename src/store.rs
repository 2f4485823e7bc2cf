use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use crate::model::TaskList;

/// Key the serialized task list is stored under.
pub const TASKS_KEY: &str = "studyFlowTasks";

/// Open the local store, creating the file, its directory and the storage
/// table if they do not exist.
pub fn open_store(store_path: &Path) -> Result<Connection> {
    if let Some(parent) = store_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create store directory {}.", parent.display())
            })?;
        }
    }
    let db = Connection::open(store_path)
        .with_context(|| format!("Failed to open store {}.", store_path.display()))?;
    init_store(&db)?;
    debug!("event=store_open path={}", store_path.display());
    Ok(db)
}

/// Initialize the storage table. Safe to call on an existing store.
pub fn init_store(db: &Connection) -> Result<()> {
    db.execute(
        "CREATE TABLE if not exists storage (
                  key             TEXT PRIMARY KEY,
                  value           TEXT NOT NULL,
                  updated_at      TEXT NOT NULL
                  )",
        [],
    )
    .context("Failed to create storage table.")?;
    Ok(())
}

/// Load the task list. A store that never saved one holds an empty plan.
pub fn load_tasks(db: &Connection) -> Result<TaskList> {
    let raw = db
        .query_row(
            "SELECT value FROM storage WHERE key = ?1",
            params![TASKS_KEY],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .context("Failed to read tasks from the store.")?;

    match raw {
        None => Ok(TaskList::default()),
        Some(raw) => {
            let tasks: TaskList = serde_json::from_str(&raw)
                .context("Failed to parse tasks from the store; the stored plan was left untouched.")?;
            debug!("event=tasks_loaded count={}", tasks.len());
            Ok(tasks)
        }
    }
}

/// Replace the stored task list with `tasks`.
pub fn save_tasks(db: &Connection, tasks: &TaskList) -> Result<()> {
    let raw = serde_json::to_string(tasks).context("Failed to serialize tasks.")?;
    db.execute(
        "INSERT INTO storage (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![TASKS_KEY, raw, Local::now()],
    )
    .context("Failed to save tasks to the store.")?;
    info!("event=tasks_saved count={}", tasks.len());
    Ok(())
}

/// When the task list was last saved, if ever.
pub fn last_saved(db: &Connection) -> Result<Option<DateTime<Local>>> {
    let updated_at = db
        .query_row(
            "SELECT updated_at FROM storage WHERE key = ?1",
            params![TASKS_KEY],
            |row| row.get::<_, DateTime<Local>>(0),
        )
        .optional()
        .context("Failed to read the last save time from the store.")?;
    Ok(updated_at)
}
