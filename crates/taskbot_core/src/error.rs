use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Unauthorized(String),
    InvalidArgument(String),
    IndexOutOfRange(String),
    AlreadyDone(String),
    EmptyCollection(String),
    InvalidData(String),
    Io(String),
}

impl AppError {
    pub fn unauthorized<M: Into<String>>(message: M) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn invalid_argument<M: Into<String>>(message: M) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn index_out_of_range() -> Self {
        Self::IndexOutOfRange("Invalid task number.".to_string())
    }

    pub fn already_done() -> Self {
        Self::AlreadyDone("This task is already marked as done.".to_string())
    }

    pub fn empty_collection<M: Into<String>>(message: M) -> Self {
        Self::EmptyCollection(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::IndexOutOfRange(_) => "index_out_of_range",
            Self::AlreadyDone(_) => "already_done",
            Self::EmptyCollection(_) => "empty_collection",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Unauthorized(message) => message,
            Self::InvalidArgument(message) => message,
            Self::IndexOutOfRange(message) => message,
            Self::AlreadyDone(message) => message,
            Self::EmptyCollection(message) => message,
            Self::InvalidData(message) => message,
            Self::Io(message) => message,
        }
    }

    /// Errors a user caused and can be told about verbatim. Everything else is
    /// an internal failure whose detail stays in the log.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::InvalidData(_) | Self::Io(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}
