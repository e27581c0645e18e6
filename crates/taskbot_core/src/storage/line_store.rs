use crate::error::AppError;
use crate::model::{FIELD_DELIMITER, Task, TaskId, Timestamp};
use std::io::Write;
use std::path::Path;

const FIELD_COUNT: usize = 5;
const STATUS_DONE: &str = "done";
const STATUS_TODO: &str = "todo";

/// Reads the task file. A missing file is an empty list. Ids are assigned
/// from 1 in file order.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>, AppError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;

    let mut tasks = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let id = tasks.len() as TaskId + 1;
        match parse_record(id, line) {
            Some(task) => tasks.push(task),
            None => {
                log::debug!("skipping record on line {}: wrong field count", line_no + 1);
            }
        }
    }

    Ok(tasks)
}

/// Rewrites the whole task file. Positions are recomputed from slice order.
pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<(), AppError> {
    let mut content = String::new();
    for (index, task) in tasks.iter().enumerate() {
        content.push_str(&render_record(index + 1, task));
        content.push('\n');
    }
    atomic_write(path, content.as_bytes())
}

fn render_record(position: usize, task: &Task) -> String {
    let status = if task.is_done() {
        STATUS_DONE
    } else {
        STATUS_TODO
    };
    let date_done = task
        .date_done
        .as_ref()
        .map(Timestamp::to_string)
        .unwrap_or_default();
    [
        position.to_string(),
        task.text.clone(),
        status.to_string(),
        task.date_added.to_string(),
        date_done,
    ]
    .join(FIELD_DELIMITER.to_string().as_str())
}

/// `None` marks a record with the wrong number of fields. Every 5-field
/// record is kept: timestamps that do not parse stay raw, and a status that
/// disagrees with the done date is repaired in favour of the status token.
fn parse_record(id: TaskId, line: &str) -> Option<Task> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return None;
    }

    let done = fields[2] == STATUS_DONE;
    let date_added = Timestamp::parse(fields[3]);
    let recorded_done = if fields[4].trim().is_empty() {
        None
    } else {
        Some(Timestamp::parse(fields[4]))
    };

    if date_added.is_raw() || recorded_done.as_ref().is_some_and(Timestamp::is_raw) {
        log::warn!("task {id}: keeping unrecognised timestamp as written");
    }

    let date_done = match (done, recorded_done) {
        (true, Some(date)) => Some(date),
        (true, None) => {
            log::warn!("task {id}: marked done without a done date, using the added date");
            Some(date_added.clone())
        }
        (false, Some(_)) => {
            log::warn!("task {id}: not done but has a done date, dropping the date");
            None
        }
        (false, None) => None,
    };

    Some(Task {
        id,
        text: fields[1].to_string(),
        date_added,
        date_done,
    })
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|err| AppError::io(err.to_string()))?;

    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|err| AppError::io(err.to_string()))?;
    tmp.write_all(data)
        .map_err(|err| AppError::io(err.to_string()))?;
    tmp.flush().map_err(|err| AppError::io(err.to_string()))?;
    tmp.as_file_mut()
        .sync_all()
        .map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(tmp.path(), permissions)
            .map_err(|err| AppError::io(err.to_string()))?;
    }

    tmp.persist(path)
        .map_err(|err| AppError::io(format!("persist {}: {}", path.display(), err)))?;
    Ok(())
}
