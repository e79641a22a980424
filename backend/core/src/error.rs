use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of every failure the navigator runtime can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    NetworkFailure,
    HttpStatus,
    UnknownTool,
    ParseError,
    ToolInvocationFailed,
    MissingField,
    GenerationFailed,
    EmptyPlan,
    WriteFailure,
    IterationLimitExceeded,
    LimitReached,
    Cancelled,
    LlmFailure,
    Config,
}

impl ErrorKind {
    /// Transient kinds are retried locally up to `max_retries`.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkFailure
                | ErrorKind::ParseError
                | ErrorKind::ToolInvocationFailed
                | ErrorKind::GenerationFailed
        )
    }

    /// Fatal kinds end the run and are returned to the caller.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::WriteFailure
                | ErrorKind::IterationLimitExceeded
                | ErrorKind::Cancelled
                | ErrorKind::LlmFailure
                | ErrorKind::Config
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "InvalidURL",
            ErrorKind::NetworkFailure => "NetworkFailure",
            ErrorKind::HttpStatus => "HTTPStatus",
            ErrorKind::UnknownTool => "UnknownTool",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::ToolInvocationFailed => "ToolInvocationFailed",
            ErrorKind::MissingField => "MissingField",
            ErrorKind::GenerationFailed => "GenerationFailed",
            ErrorKind::EmptyPlan => "EmptyPlan",
            ErrorKind::WriteFailure => "WriteFailure",
            ErrorKind::IterationLimitExceeded => "IterationLimitExceeded",
            ErrorKind::LimitReached => "LimitReached",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::LlmFailure => "LLMFailure",
            ErrorKind::Config => "Config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for the navigator runtime.
#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("network failure fetching {url}: {message}")]
    NetworkFailure { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("could not parse model output: {0}")]
    ParseError(String),

    #[error("tool '{tool}' failed: {message}")]
    ToolInvocationFailed { tool: String, message: String },

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("test plan has no test cases")]
    EmptyPlan,

    #[error("failed to write {path}: {message}")]
    WriteFailure { path: String, message: String },

    #[error("no final answer after {0} iterations")]
    IterationLimitExceeded(usize),

    #[error("limit reached: {0}")]
    LimitReached(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("LLM provider error ({provider}): {message}")]
    LlmFailure { provider: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl NavigatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NavigatorError::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            NavigatorError::NetworkFailure { .. } => ErrorKind::NetworkFailure,
            NavigatorError::HttpStatus { .. } => ErrorKind::HttpStatus,
            NavigatorError::UnknownTool(_) => ErrorKind::UnknownTool,
            NavigatorError::ParseError(_) => ErrorKind::ParseError,
            NavigatorError::ToolInvocationFailed { .. } => ErrorKind::ToolInvocationFailed,
            NavigatorError::MissingField(_) => ErrorKind::MissingField,
            NavigatorError::GenerationFailed(_) => ErrorKind::GenerationFailed,
            NavigatorError::EmptyPlan => ErrorKind::EmptyPlan,
            NavigatorError::WriteFailure { .. } => ErrorKind::WriteFailure,
            NavigatorError::IterationLimitExceeded(_) => ErrorKind::IterationLimitExceeded,
            NavigatorError::LimitReached(_) => ErrorKind::LimitReached,
            NavigatorError::Cancelled => ErrorKind::Cancelled,
            NavigatorError::LlmFailure { .. } => ErrorKind::LlmFailure,
            NavigatorError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn write_failure(path: impl AsRef<std::path::Path>, err: impl std::fmt::Display) -> Self {
        NavigatorError::WriteFailure {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// The `{kind, message}` pair handed to callers and shown to the model.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Serializable error view used in observations and CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

pub type Result<T> = std::result::Result<T, NavigatorError>;
