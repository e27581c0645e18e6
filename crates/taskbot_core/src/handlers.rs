use crate::error::AppError;
use crate::message::{Command, Reply, Sender, UserId};
use crate::model::{Task, normalize_task_text};
use crate::pending::PendingRegistry;
use crate::task_store::TaskStore;

const GLYPH_DONE: &str = "✅";
const GLYPH_TODO: &str = "⭕";

const GREETING: &str = "Hello! I am your private task bot.";
const ADD_USAGE: &str = "Please provide a task to add. Usage: /add <task>";
const DONE_USAGE: &str = "Please provide a valid task number. Usage: /done <task_number>";
const MODIFY_USAGE: &str = "Usage: /modify <task_number> [new content]";

pub const CONFIRM_OPTIONS: [&str; 2] = ["Yes", "No"];

/// Runs one command. Authorization and argument checks happen before any
/// mutation, so an `Err` means nothing changed.
pub fn dispatch(
    command: Command,
    store: &mut TaskStore,
    pending: &mut PendingRegistry,
    sender: &Sender,
    root: UserId,
    args: &[String],
) -> Result<Reply, AppError> {
    match command {
        Command::Start => Ok(start()),
        Command::Add => add(store, args),
        Command::List => list(store),
        Command::Clear => clear(store, sender, root),
        Command::Help => Ok(help(is_root(sender, root))),
        Command::Done => done(store, pending, sender, args),
        Command::Refresh => refresh(store),
        Command::Unfinished => unfinished(store),
        Command::Modify => modify(store, pending, sender, root, args),
    }
}

pub fn is_root(sender: &Sender, root: UserId) -> bool {
    sender.id == root
}

pub fn start() -> Reply {
    Reply::text(GREETING)
}

pub fn add(store: &mut TaskStore, args: &[String]) -> Result<Reply, AppError> {
    if args.is_empty() {
        return Err(AppError::invalid_argument(ADD_USAGE));
    }
    let text = normalize_task_text(&args.join(" "))?;
    let task = store.add(&text)?;
    Ok(Reply::text(format!(
        "Added task: {} (added on {})",
        task.text, task.date_added
    )))
}

pub fn list(store: &TaskStore) -> Result<Reply, AppError> {
    if store.is_empty() {
        return Err(AppError::empty_collection("Your to-do list is empty."));
    }
    let mut lines = vec!["Your tasks:".to_string()];
    lines.extend(
        store
            .list()
            .into_iter()
            .map(|(position, task)| render_task_line(position, task)),
    );
    Ok(Reply::text(lines.join("\n")))
}

pub fn clear(store: &mut TaskStore, sender: &Sender, root: UserId) -> Result<Reply, AppError> {
    if !is_root(sender, root) {
        return Err(AppError::unauthorized(
            "Unauthorized. Only the root user can clear the list.",
        ));
    }
    store.clear()?;
    Ok(Reply::text("All tasks have been cleared."))
}

pub fn help(root: bool) -> Reply {
    let mut lines = vec![
        "Here are the commands you can use:",
        "/start - Start the bot",
        "/add <task> - Add a new task",
        "/list - Show all tasks",
        "/done <task_number> - Mark a task as done",
    ];
    if root {
        lines.push("/clear - Clear all tasks (root only)");
        lines.push("/modify <task_number> [new content] - Modify a specific task (root only)");
    }
    lines.extend([
        "/refresh - Move completed tasks to the end and show number of pending tasks",
        "/unfinished - Show only unfinished tasks",
        "/help - Show this help message",
    ]);
    Reply::text(lines.join("\n"))
}

pub fn done(
    store: &TaskStore,
    pending: &mut PendingRegistry,
    sender: &Sender,
    args: &[String],
) -> Result<Reply, AppError> {
    let index = parse_index(args.first(), DONE_USAGE)?;
    let task = store.get(index).ok_or_else(AppError::index_out_of_range)?;
    if task.is_done() {
        return Err(AppError::already_done());
    }

    pending.set_confirmation(sender.id, task.id);
    Ok(Reply::text(format!(
        "Are you sure you want to mark task {} as done?\n\n\"{}\"",
        index + 1,
        task.text
    ))
    .with_quick_replies(CONFIRM_OPTIONS))
}

pub fn refresh(store: &mut TaskStore) -> Result<Reply, AppError> {
    let unfinished = store.refresh()?;
    Ok(Reply::text(format!(
        "Refreshed task list. You have {unfinished} unfinished tasks."
    )))
}

pub fn unfinished(store: &TaskStore) -> Result<Reply, AppError> {
    let view = store.unfinished();
    if view.is_empty() {
        return Err(AppError::empty_collection("You have no unfinished tasks."));
    }
    let mut lines = vec!["Unfinished tasks:".to_string()];
    lines.extend(
        view.into_iter()
            .map(|(position, task)| render_task_line(position, task)),
    );
    Ok(Reply::text(lines.join("\n")))
}

pub fn modify(
    store: &mut TaskStore,
    pending: &mut PendingRegistry,
    sender: &Sender,
    root: UserId,
    args: &[String],
) -> Result<Reply, AppError> {
    if !is_root(sender, root) {
        return Err(AppError::unauthorized(
            "Unauthorized. Only the root user can modify tasks.",
        ));
    }
    let index = parse_index(args.first(), MODIFY_USAGE)?;
    let task_id = store
        .get(index)
        .map(|task| task.id)
        .ok_or_else(AppError::index_out_of_range)?;

    if args.len() == 1 {
        pending.set_modification(sender.id, task_id);
        return Ok(Reply::text(format!(
            "Please enter the new content for task {}.",
            index + 1
        )));
    }

    let text = normalize_task_text(&args[1..].join(" "))?;
    store.modify(index, &text)?;
    Ok(Reply::text(format!("Task {} has been updated.", index + 1)))
}

/// `"{pos}. {glyph} {text} (added on {date})"`, plus the done date when set.
pub fn render_task_line(position: usize, task: &Task) -> String {
    let glyph = if task.is_done() {
        GLYPH_DONE
    } else {
        GLYPH_TODO
    };
    let done = task
        .date_done
        .as_ref()
        .map(|date| format!(" (done on {})", date.date_text()))
        .unwrap_or_default();
    format!(
        "{position}. {glyph} {} (added on {}){done}",
        task.text,
        task.date_added.date_text()
    )
}

/// Turns a 1-based position argument into a list index. Anything that is not
/// plain digits is a usage error; zero and overflow are out of range.
fn parse_index(arg: Option<&String>, usage: &str) -> Result<usize, AppError> {
    let raw = match arg {
        Some(value) if !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit()) => value,
        _ => return Err(AppError::invalid_argument(usage)),
    };
    let position: usize = raw.parse().map_err(|_| AppError::index_out_of_range())?;
    position
        .checked_sub(1)
        .ok_or_else(AppError::index_out_of_range)
}
