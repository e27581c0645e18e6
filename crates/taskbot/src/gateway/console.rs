use std::io::{BufRead, Write};
use taskbot_core::Bot;
use taskbot_core::error::AppError;
use taskbot_core::message::{Sender, parse_inbound};

/// Line-based chat session: every input line is one message from `sender`.
/// Ends on EOF, `exit` or `quit`.
pub fn run<R: BufRead, W: Write>(
    bot: &Bot,
    sender: &Sender,
    mut input: R,
    mut output: W,
) -> Result<(), AppError> {
    let mut line = String::new();

    loop {
        line.clear();
        let bytes = input.read_line(&mut line)?;
        if bytes == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }

        let Some(inbound) = parse_inbound(trimmed, None) else {
            continue;
        };

        if let Some(reply) = bot.handle(sender, &inbound) {
            writeln!(output, "{}", reply.text)?;
            if !reply.quick_replies.is_empty() {
                let options: Vec<String> = reply
                    .quick_replies
                    .iter()
                    .map(|option| format!("[{option}]"))
                    .collect();
                writeln!(output, "{}", options.join(" "))?;
            }
            output.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::run;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use taskbot_core::Bot;
    use taskbot_core::message::{Sender, UserId};
    use taskbot_core::pending::PendingRegistry;
    use taskbot_core::task_store::TaskStore;

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("taskbot-{nanos}-{file_name}"))
    }

    fn session(input: &str) -> String {
        let path = temp_path("console.txt");
        let bot = Bot::new(
            UserId(1),
            TaskStore::open(&path).unwrap(),
            PendingRegistry::new(),
        );
        let sender = Sender::new(UserId(1), None);
        let mut output = Vec::new();

        run(&bot, &sender, Cursor::new(input.to_string()), &mut output).unwrap();
        std::fs::remove_file(&path).ok();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn prints_replies_and_quick_replies() {
        let output = session("/add walk dog\n\n/done 1\nno\n");

        assert!(output.contains("Added task: walk dog"));
        assert!(output.contains("Are you sure you want to mark task 1 as done?"));
        assert!(output.contains("[Yes] [No]"));
        assert!(output.contains("Operation cancelled."));
    }

    #[test]
    fn stops_at_exit() {
        let output = session("/start\nexit\n/help\n");

        assert!(output.contains("Hello!"));
        assert!(!output.contains("Here are the commands"));
    }

    #[test]
    fn silent_lines_produce_no_output() {
        assert!(session("just chatting\n/nope\n").is_empty());
    }
}
