use crate::error::AppError;
use crate::message::{Command, Reply, UserId};
use crate::model::{TaskId, normalize_task_text};
use crate::task_store::TaskStore;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const CONFIRM_TOKEN: &str = "yes";

#[derive(Debug, Clone, Copy)]
struct PendingEntry {
    task: TaskId,
    recorded_at: Instant,
}

/// Per-user actions waiting for one follow-up message.
///
/// Entries point at tasks by id, not position, so a refresh between prompt
/// and answer still reaches the task the user was shown.
#[derive(Debug, Default)]
pub struct PendingRegistry {
    confirmations: HashMap<UserId, PendingEntry>,
    modifications: HashMap<UserId, PendingEntry>,
    ttl: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowupOutcome {
    Updated { position: usize },
    MarkedDone { position: usize },
    Cancelled,
    /// The referenced task was cleared before the answer arrived.
    TaskGone { command: Command },
    Ignored,
}

impl FollowupOutcome {
    /// Command the follow-up completed, for request logging.
    pub fn command(&self) -> Option<Command> {
        match self {
            FollowupOutcome::Updated { .. } => Some(Command::Modify),
            FollowupOutcome::MarkedDone { .. } | FollowupOutcome::Cancelled => Some(Command::Done),
            FollowupOutcome::TaskGone { command } => Some(*command),
            FollowupOutcome::Ignored => None,
        }
    }

    pub fn reply(&self) -> Option<Reply> {
        let text = match self {
            FollowupOutcome::Updated { position } => format!("Task {position} has been updated."),
            FollowupOutcome::MarkedDone { position } => {
                format!("Task {position} has been marked as done.")
            }
            FollowupOutcome::Cancelled => "Operation cancelled.".to_string(),
            FollowupOutcome::TaskGone { .. } => "That task no longer exists.".to_string(),
            FollowupOutcome::Ignored => return None,
        };
        Some(Reply::text(text))
    }
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries older than `ttl` are dropped instead of resolved.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    pub fn set_confirmation(&mut self, identity: UserId, task: TaskId) {
        self.confirmations.insert(identity, PendingEntry::now(task));
    }

    pub fn set_modification(&mut self, identity: UserId, task: TaskId) {
        self.modifications.insert(identity, PendingEntry::now(task));
    }

    pub fn clear_confirmation(&mut self, identity: UserId) {
        self.confirmations.remove(&identity);
    }

    pub fn clear_modification(&mut self, identity: UserId) {
        self.modifications.remove(&identity);
    }

    pub fn pending_confirmation(&self, identity: UserId) -> Option<TaskId> {
        self.confirmations.get(&identity).map(|entry| entry.task)
    }

    pub fn pending_modification(&self, identity: UserId) -> Option<TaskId> {
        self.modifications.get(&identity).map(|entry| entry.task)
    }

    /// Resolves the follow-up for `identity`. A pending modification always
    /// wins over a pending confirmation; the resolved entry is removed
    /// whatever the outcome.
    pub fn resolve_followup(
        &mut self,
        store: &mut TaskStore,
        identity: UserId,
        message_text: &str,
    ) -> Result<FollowupOutcome, AppError> {
        if let Some(task) = take_live(&mut self.modifications, identity, self.ttl) {
            let Some(index) = store.position_of(task) else {
                return Ok(FollowupOutcome::TaskGone {
                    command: Command::Modify,
                });
            };
            let text = normalize_task_text(message_text)?;
            store.modify(index, &text)?;
            return Ok(FollowupOutcome::Updated {
                position: index + 1,
            });
        }

        if let Some(task) = take_live(&mut self.confirmations, identity, self.ttl) {
            if !message_text.trim().eq_ignore_ascii_case(CONFIRM_TOKEN) {
                return Ok(FollowupOutcome::Cancelled);
            }
            let Some(index) = store.position_of(task) else {
                return Ok(FollowupOutcome::TaskGone {
                    command: Command::Done,
                });
            };
            store.mark_done(index)?;
            return Ok(FollowupOutcome::MarkedDone {
                position: index + 1,
            });
        }

        Ok(FollowupOutcome::Ignored)
    }
}

impl PendingEntry {
    fn now(task: TaskId) -> Self {
        Self {
            task,
            recorded_at: Instant::now(),
        }
    }
}

fn take_live(
    entries: &mut HashMap<UserId, PendingEntry>,
    identity: UserId,
    ttl: Option<Duration>,
) -> Option<TaskId> {
    let entry = entries.remove(&identity)?;
    match ttl {
        Some(ttl) if entry.recorded_at.elapsed() >= ttl => {
            log::debug!("dropping expired pending action for user {identity}");
            None
        }
        _ => Some(entry.task),
    }
}
