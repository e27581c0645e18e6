use crate::error::AppError;
use std::sync::OnceLock;
use time::format_description::FormatItem;
use time::macros::format_description;
use std::fmt;
use time::{OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Record delimiter of the task file; task text may never contain it.
pub const FIELD_DELIMITER: char = '|';

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// In-memory handle for a task. Not persisted; reassigned on every load.
pub type TaskId = u64;

/// A stored task time. Times this bot writes are always `Parsed`; `Raw` keeps
/// a field from the task file that does not match the timestamp layout, so it
/// is written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    Parsed(PrimitiveDateTime),
    Raw(String),
}

impl Timestamp {
    /// Never fails; see [`parse_timestamp`] for the strict form.
    pub fn parse(raw: &str) -> Self {
        match parse_timestamp(raw) {
            Ok(value) => Timestamp::Parsed(value),
            Err(_) => Timestamp::Raw(raw.to_string()),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Timestamp::Raw(_))
    }

    /// Day part for listings. A raw value shows its first word.
    pub fn date_text(&self) -> String {
        match self {
            Timestamp::Parsed(value) => format_date(*value),
            Timestamp::Raw(raw) => raw.split_whitespace().next().unwrap_or("").to_string(),
        }
    }
}

impl From<PrimitiveDateTime> for Timestamp {
    fn from(value: PrimitiveDateTime) -> Self {
        Timestamp::Parsed(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Parsed(value) => f.write_str(&format_timestamp(*value)),
            Timestamp::Raw(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub date_added: Timestamp,
    /// Present exactly when the task is done.
    pub date_done: Option<Timestamp>,
}

impl Task {
    pub fn new(id: TaskId, text: String, date_added: PrimitiveDateTime) -> Self {
        Self {
            id,
            text,
            date_added: date_added.into(),
            date_done: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.date_done.is_some()
    }

    pub fn mark_done(&mut self, at: PrimitiveDateTime) -> Result<(), AppError> {
        if self.is_done() {
            return Err(AppError::already_done());
        }
        self.date_done = Some(at.into());
        Ok(())
    }
}

/// Local UTC offset, resolved once. The first call should happen before any
/// thread is spawned; afterwards the platform may refuse the lookup.
pub fn local_offset() -> UtcOffset {
    static OFFSET: OnceLock<UtcOffset> = OnceLock::new();
    *OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

/// Current local time truncated to the minute, the precision tasks are stored at.
pub fn now_local() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc().to_offset(local_offset());
    let minute = Time::from_hms(now.hour(), now.minute(), 0).unwrap_or(Time::MIDNIGHT);
    PrimitiveDateTime::new(now.date(), minute)
}

pub fn format_timestamp(value: PrimitiveDateTime) -> String {
    value
        .format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

pub fn format_date(value: PrimitiveDateTime) -> String {
    value
        .date()
        .format(DATE_FORMAT)
        .unwrap_or_else(|_| value.date().to_string())
}

pub fn parse_timestamp(raw: &str) -> Result<PrimitiveDateTime, AppError> {
    PrimitiveDateTime::parse(raw.trim(), TIMESTAMP_FORMAT)
        .map_err(|err| AppError::invalid_data(format!("bad timestamp '{raw}': {err}")))
}

/// Collapses whitespace runs and rejects text that is empty or would break
/// the record layout.
pub fn normalize_task_text(raw: &str) -> Result<String, AppError> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Err(AppError::invalid_argument("Task text cannot be empty."));
    }
    if normalized.contains(FIELD_DELIMITER) {
        return Err(AppError::invalid_argument(format!(
            "Task text cannot contain '{FIELD_DELIMITER}'."
        )));
    }
    Ok(normalized)
}
