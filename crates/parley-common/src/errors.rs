use std::path::PathBuf;

/// Bad user input. Rejected before any network or disk activity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("message too long ({len} characters, max {max})")]
    MessageTooLong { len: usize, max: usize },

    #[error("a response is already being generated")]
    TurnInProgress,
}

/// Failure talking to the generation service. Retried by the turn driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("rate limited")]
    RateLimited,

    #[error("stream parse error: {0}")]
    Parse(String),

    #[error("timeout")]
    Timeout,

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize session: {0}")]
    Serialize(String),

    #[error("corrupt session file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("invalid session id: {0:?}")]
    InvalidId(String),

    #[error("session has no turns to persist")]
    EmptyRecord,
}

impl PersistenceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),

    #[error("config write error: {0}")]
    WriteError(String),

    #[error("endpoint error: {0}")]
    Endpoint(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
