use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("ttl must be greater than zero")]
    ZeroTtl,

    #[error("ttl must not be longer than {max} secs")]
    TtlTooLarge { max: u64 },

    #[error("duplicated cache entry")]
    DuplicateKey,

    #[error("no such cluster: {0}")]
    NoSuchCluster(String),

    #[error("all agents down")]
    AllAgentsDown,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timeout after {0}ms")]
    Timeout(u64),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
