use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}
