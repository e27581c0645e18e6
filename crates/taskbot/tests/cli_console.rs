use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

const ROOT_ID: &str = "1000";

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskbot-{nanos}-{file_name}"))
}

fn run_console(store_path: &Path, args: &[&str], input: &str) -> Output {
    let exe = env!("CARGO_BIN_EXE_taskbot");
    let mut child = Command::new(exe)
        .args(args)
        .env("TASKBOT_CONFIG_PATH", temp_path("no-config.json"))
        .env("TASKBOT_TASKS_PATH", store_path)
        .env("ROOT_USER_ID", ROOT_ID)
        .env_remove("TASKBOT_LOG_FILE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn console session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    child
        .wait_with_output()
        .expect("failed to read console output")
}

#[test]
fn buy_milk_confirmation_flow() {
    let store_path = temp_path("console-flow.txt");
    let output = run_console(
        &store_path,
        &["console"],
        "/add buy milk\n/list\n/done 1\nYes\n/list\nexit\n",
    );
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added task: buy milk (added on "));
    assert!(stdout.contains("1. ⭕ buy milk (added on "));
    assert!(stdout.contains("Are you sure you want to mark task 1 as done?"));
    assert!(stdout.contains("[Yes] [No]"));
    assert!(stdout.contains("Task 1 has been marked as done."));

    let done_line = stdout
        .lines()
        .find(|line| line.starts_with("1. ✅ buy milk"))
        .expect("done listing");
    let dates: Vec<&str> = done_line
        .split(" on ")
        .skip(1)
        .map(|rest| rest.trim_end_matches(')').split(')').next().unwrap())
        .collect();
    assert_eq!(dates.len(), 2);
    assert_eq!(dates[0], dates[1]);
}

#[test]
fn default_session_runs_as_root() {
    let store_path = temp_path("console-root.txt");
    let output = run_console(&store_path, &[], "/help\n/add a\n/clear\n/list\n");
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("/clear - Clear all tasks (root only)"));
    assert!(stdout.contains("All tasks have been cleared."));
    assert!(stdout.contains("Your to-do list is empty."));
}

#[test]
fn guest_cannot_clear_or_modify() {
    let store_path = temp_path("console-guest.txt");
    let output = run_console(
        &store_path,
        &["console", "--user-id", "5", "--username", "guest"],
        "/add keep me\n/clear\n/modify 1 other\n/list\n",
    );
    let stored = std::fs::read_to_string(&store_path).unwrap();
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Unauthorized. Only the root user can clear the list."));
    assert!(stdout.contains("Unauthorized. Only the root user can modify tasks."));
    assert!(stdout.contains("1. ⭕ keep me"));
    assert!(stored.starts_with("1|keep me|todo|"));
}

#[test]
fn modify_prompt_takes_next_line() {
    let store_path = temp_path("console-modify.txt");
    let output = run_console(
        &store_path,
        &["console"],
        "/add old\n/modify 1\nnew   words\n/unfinished\n",
    );
    std::fs::remove_file(&store_path).ok();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Please enter the new content for task 1."));
    assert!(stdout.contains("Task 1 has been updated."));
    assert!(stdout.contains("Unfinished tasks:\n1. ⭕ new words (added on "));
}
