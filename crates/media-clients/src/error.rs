use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API error: status {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("connection to {url} failed after {attempts} attempts: {last}")]
    ConnectFailed {
        url: String,
        attempts: u32,
        last: String,
    },

    #[error("unexpected {service} response: {reason}")]
    Unexpected {
        service: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;
