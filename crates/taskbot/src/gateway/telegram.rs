use serde::Deserialize;
use std::time::Duration;
use taskbot_core::Bot;
use taskbot_core::config::Config;
use taskbot_core::error::AppError;
use taskbot_core::message::{Inbound, Reply, Sender, UserId, parse_inbound};

const REQUEST_TIMEOUT_MARGIN_SECS: u64 = 10;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, Deserialize)]
struct TelegramApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: T,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct TelegramUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<TelegramMessage>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct TelegramMessage {
    chat: TelegramChat,
    #[serde(default)]
    from: Option<TelegramUser>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct TelegramChat {
    id: i64,
}

/// Long-polling client for the Telegram Bot API.
pub struct TelegramGateway {
    http: reqwest::blocking::Client,
    api_base: String,
    token: String,
    poll_timeout_secs: u64,
    bot_username: Option<String>,
}

impl TelegramGateway {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let token = config.bot_token()?.to_string();
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(
                config.poll_timeout_secs + REQUEST_TIMEOUT_MARGIN_SECS,
            ))
            .build()
            .map_err(|err| AppError::io(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            token,
            poll_timeout_secs: config.poll_timeout_secs,
            bot_username: None,
        })
    }

    /// Polls forever. Individual failures are logged and polling continues.
    pub fn run(&mut self, bot: &Bot) -> Result<(), AppError> {
        match self.get_me() {
            Ok(username) => {
                log::info!("telegram gateway started as @{username}");
                self.bot_username = Some(username);
            }
            Err(err) => log::warn!("telegram getMe failed, accepting any /cmd@bot suffix: {err}"),
        }

        let mut offset = 0i64;
        loop {
            match self.poll_updates(offset) {
                Ok(updates) => {
                    offset = next_offset(offset, &updates);
                    for update in updates {
                        self.handle_update(bot, update);
                    }
                }
                Err(err) => {
                    log::warn!("{err}");
                    std::thread::sleep(POLL_RETRY_DELAY);
                }
            }
        }
    }

    fn handle_update(&self, bot: &Bot, update: TelegramUpdate) {
        let Some((chat_id, sender, inbound)) = route_update(update, self.bot_username.as_deref())
        else {
            return;
        };

        let Some(reply) = bot.handle(&sender, &inbound) else {
            return;
        };

        if let Err(err) = self.send_message(chat_id, &reply) {
            log::error!(
                "Error occurred for user {} ({}): {}",
                sender.id,
                sender.display_name(),
                err
            );
        }
    }

    fn get_me(&self) -> Result<String, AppError> {
        let url = self.method_url("getMe");
        let parsed = self
            .http
            .get(url)
            .send()
            .map_err(|err| transport_error("telegram getMe request failed", err))?
            .json::<TelegramApiResponse<TelegramUser>>()
            .map_err(|err| transport_error("telegram getMe response parse failed", err))?;

        if !parsed.ok {
            return Err(AppError::io(
                parsed
                    .description
                    .unwrap_or_else(|| "telegram getMe failed".to_string()),
            ));
        }

        parsed
            .result
            .username
            .ok_or_else(|| AppError::invalid_data("telegram getMe returned no username"))
    }

    fn poll_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>, AppError> {
        let url = format!(
            "{}?timeout={}&offset={}",
            self.method_url("getUpdates"),
            self.poll_timeout_secs,
            offset
        );
        let parsed = self
            .http
            .get(url)
            .send()
            .map_err(|err| transport_error("telegram getUpdates failed", err))?
            .json::<TelegramApiResponse<Vec<TelegramUpdate>>>()
            .map_err(|err| transport_error("telegram getUpdates parse failed", err))?;

        if !parsed.ok {
            return Err(AppError::io(
                parsed
                    .description
                    .unwrap_or_else(|| "telegram getUpdates failed".to_string()),
            ));
        }

        Ok(parsed.result)
    }

    fn send_message(&self, chat_id: i64, reply: &Reply) -> Result<(), AppError> {
        let body = send_message_body(chat_id, reply);
        let parsed = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .map_err(|err| transport_error("telegram sendMessage failed", err))?
            .json::<TelegramApiResponse<serde_json::Value>>()
            .map_err(|err| transport_error("telegram sendMessage response parse failed", err))?;

        if !parsed.ok {
            return Err(AppError::io(
                parsed
                    .description
                    .unwrap_or_else(|| "telegram sendMessage failed".to_string()),
            ));
        }
        Ok(())
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }
}

/// Request URLs carry the bot token, so they never reach an error message.
fn transport_error(context: &str, err: reqwest::Error) -> AppError {
    AppError::io(format!("{context}: {}", err.without_url()))
}

fn next_offset(offset: i64, updates: &[TelegramUpdate]) -> i64 {
    updates
        .iter()
        .map(|update| update.update_id.saturating_add(1))
        .fold(offset, i64::max)
}

/// Chat, sender and parsed message of an update; `None` for anything that is
/// not a text message from a user.
fn route_update(
    update: TelegramUpdate,
    bot_username: Option<&str>,
) -> Option<(i64, Sender, Inbound)> {
    let message = update.message?;
    let from = message.from?;
    let inbound = parse_inbound(message.text.as_deref()?, bot_username)?;
    let sender = Sender::new(UserId(from.id), from.username);
    Some((message.chat.id, sender, inbound))
}

fn send_message_body(chat_id: i64, reply: &Reply) -> serde_json::Value {
    let mut body = serde_json::json!({
        "chat_id": chat_id,
        "text": reply.text,
        "disable_web_page_preview": true,
    });
    if !reply.quick_replies.is_empty() {
        body["reply_markup"] = one_time_keyboard(&reply.quick_replies);
    }
    body
}

fn one_time_keyboard(options: &[String]) -> serde_json::Value {
    serde_json::json!({
        "keyboard": [options],
        "one_time_keyboard": true,
        "resize_keyboard": true,
    })
}

#[cfg(test)]
mod tests {
    use super::{TelegramGateway, TelegramUpdate, next_offset, route_update, send_message_body};
    use taskbot_core::config::Config;
    use taskbot_core::message::{Inbound, Reply, UserId};

    fn update(value: serde_json::Value) -> TelegramUpdate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn route_update_extracts_sender_and_command() {
        let update = update(serde_json::json!({
            "update_id": 10,
            "message": {
                "chat": { "id": 555 },
                "from": { "id": 42, "username": "melody" },
                "text": "/done@taskbot 2"
            }
        }));

        let (chat_id, sender, inbound) = route_update(update, Some("taskbot")).unwrap();

        assert_eq!(chat_id, 555);
        assert_eq!(sender.id, UserId(42));
        assert_eq!(sender.username.as_deref(), Some("melody"));
        assert_eq!(
            inbound,
            Inbound::Command {
                name: "done".to_string(),
                args: vec!["2".to_string()],
            }
        );
    }

    #[test]
    fn route_update_skips_non_text_updates() {
        let no_text = update(serde_json::json!({
            "update_id": 11,
            "message": { "chat": { "id": 1 }, "from": { "id": 2 } }
        }));
        let no_message = update(serde_json::json!({ "update_id": 12 }));

        assert!(route_update(no_text, None).is_none());
        assert!(route_update(no_message, None).is_none());
    }

    #[test]
    fn next_offset_moves_past_highest_update() {
        let updates = vec![
            update(serde_json::json!({ "update_id": 7 })),
            update(serde_json::json!({ "update_id": 9 })),
        ];
        assert_eq!(next_offset(0, &updates), 10);
        assert_eq!(next_offset(20, &updates), 20);
        assert_eq!(next_offset(3, &[]), 3);
    }

    #[test]
    fn quick_replies_become_one_time_keyboard() {
        let reply = Reply::text("Sure?").with_quick_replies(["Yes", "No"]);
        let body = send_message_body(1, &reply);

        assert_eq!(body["text"], "Sure?");
        assert_eq!(
            body["reply_markup"]["keyboard"],
            serde_json::json!([["Yes", "No"]])
        );
        assert_eq!(body["reply_markup"]["one_time_keyboard"], true);

        let plain = send_message_body(1, &Reply::text("ok"));
        assert!(plain.get("reply_markup").is_none());
    }

    #[test]
    fn transport_errors_do_not_expose_the_token() {
        let config = Config {
            bot_token: Some("SECRET123:TOKEN".to_string()),
            api_base_url: "http://127.0.0.1:1".to_string(),
            poll_timeout_secs: 1,
            ..Config::default()
        };
        let gateway = TelegramGateway::new(&config).unwrap();

        let errors = [
            gateway.poll_updates(0).unwrap_err(),
            gateway.get_me().unwrap_err(),
            gateway.send_message(1, &Reply::text("hi")).unwrap_err(),
        ];

        for err in errors {
            let rendered = err.to_string();
            assert_eq!(err.code(), "io_error");
            assert!(!rendered.contains("SECRET123"), "{rendered}");
        }
    }
}
