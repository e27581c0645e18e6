use crate::config::Config;
use crate::error::AppError;
use crate::handlers;
use crate::message::{Command, Inbound, Reply, Sender, UserId};
use crate::pending::PendingRegistry;
use crate::task_store::TaskStore;
use std::sync::{Mutex, MutexGuard, PoisonError};

const FAILURE_REPLY: &str = "Something went wrong. Please try again later.";

#[derive(Debug)]
pub struct BotState {
    pub store: TaskStore,
    pub pending: PendingRegistry,
}

/// Entry point for gateways. Store and pending actions share one lock, so
/// each inbound message runs to completion, persistence included, before the
/// next one starts.
#[derive(Debug)]
pub struct Bot {
    root: UserId,
    state: Mutex<BotState>,
}

impl Bot {
    pub fn new(root: UserId, store: TaskStore, pending: PendingRegistry) -> Self {
        Self {
            root,
            state: Mutex::new(BotState { store, pending }),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let root = config.root_user()?;
        let store = TaskStore::open(&config.tasks_path)?;
        let pending = match config.pending_ttl() {
            Some(ttl) => PendingRegistry::with_ttl(ttl),
            None => PendingRegistry::new(),
        };
        Ok(Self::new(root, store, pending))
    }

    pub fn root(&self) -> UserId {
        self.root
    }

    /// Read access to the current state, under the same lock as `handle`.
    pub fn with_state<R>(&self, f: impl FnOnce(&BotState) -> R) -> R {
        f(&self.lock())
    }

    /// Handles one inbound message. `None` means no reply is sent: unknown
    /// commands and free text with nothing pending.
    pub fn handle(&self, sender: &Sender, inbound: &Inbound) -> Option<Reply> {
        let mut guard = self.lock();
        let BotState { store, pending } = &mut *guard;

        let (command, result) = match inbound {
            Inbound::Command { name, args } => {
                let Ok(command) = name.parse::<Command>() else {
                    log::debug!("ignoring unknown command /{name} from user {}", sender.id);
                    return None;
                };
                let result = handlers::dispatch(command, store, pending, sender, self.root, args);
                (command, result)
            }
            Inbound::Text(text) => {
                let command = if pending.pending_modification(sender.id).is_some() {
                    Command::Modify
                } else {
                    Command::Done
                };
                match pending.resolve_followup(store, sender.id, text) {
                    Ok(outcome) => {
                        let reply = outcome.reply()?;
                        (outcome.command().unwrap_or(command), Ok(reply))
                    }
                    Err(err) => (command, Err(err)),
                }
            }
        };
        drop(guard);

        let reply = match result {
            Ok(reply) => reply,
            Err(err) if err.is_user_facing() => Reply::text(err.message()),
            Err(err) => {
                log::error!(
                    "Error occurred for user {} ({}): {}",
                    sender.id,
                    sender.display_name(),
                    err
                );
                Reply::text(FAILURE_REPLY)
            }
        };

        log::info!(
            "Request: /{} | UserID: {} | Username: {} | Response: {}",
            command.name(),
            sender.id,
            sender.display_name(),
            reply.text
        );
        Some(reply)
    }

    fn lock(&self) -> MutexGuard<'_, BotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
