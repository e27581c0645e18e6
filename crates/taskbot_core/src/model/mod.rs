mod task;

pub use task::{
    FIELD_DELIMITER, Task, TaskId, Timestamp, format_date, format_timestamp, local_offset,
    normalize_task_text, now_local, parse_timestamp,
};
