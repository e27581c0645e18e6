use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(UserId)
    }
}

/// Who sent a message. Only `id` is used for authorization and pending state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub username: Option<String>,
}

impl Sender {
    pub fn new(id: UserId, username: Option<String>) -> Self {
        Self { id, username }
    }

    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Add,
    List,
    Clear,
    Help,
    Done,
    Refresh,
    Unfinished,
    Modify,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Add => "add",
            Command::List => "list",
            Command::Clear => "clear",
            Command::Help => "help",
            Command::Done => "done",
            Command::Refresh => "refresh",
            Command::Unfinished => "unfinished",
            Command::Modify => "modify",
        }
    }
}

impl FromStr for Command {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Command::Start),
            "add" => Ok(Command::Add),
            "list" => Ok(Command::List),
            "clear" => Ok(Command::Clear),
            "help" => Ok(Command::Help),
            "done" => Ok(Command::Done),
            "refresh" => Ok(Command::Refresh),
            "unfinished" => Ok(Command::Unfinished),
            "modify" => Ok(Command::Modify),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command { name: String, args: Vec<String> },
    Text(String),
}

/// Splits a raw chat message into a command or free text.
///
/// `/cmd@bot` suffixes are dropped when they name this bot, or always when the
/// bot's own name is unknown. Returns `None` for blank input and for commands
/// addressed to a different bot.
pub fn parse_inbound(text: &str, bot_username: Option<&str>) -> Option<Inbound> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Some(rest) = trimmed.strip_prefix('/') else {
        return Some(Inbound::Text(trimmed.to_string()));
    };

    let mut tokens = rest.split_whitespace();
    let head = tokens.next().unwrap_or_default();
    let name = match head.split_once('@') {
        Some((name, target)) => match bot_username {
            Some(bot) if !target.eq_ignore_ascii_case(bot) => return None,
            _ => name,
        },
        None => head,
    };

    Some(Inbound::Command {
        name: name.to_ascii_lowercase(),
        args: tokens.map(str::to_string).collect(),
    })
}

/// Text sent back for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub text: String,
    /// Single-use quick-reply options the gateway should offer, if any.
    pub quick_replies: Vec<String>,
}

impl Reply {
    pub fn text<T: Into<String>>(text: T) -> Self {
        Self {
            text: text.into(),
            quick_replies: Vec::new(),
        }
    }

    pub fn with_quick_replies<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quick_replies = options.into_iter().map(Into::into).collect();
        self
    }
}
