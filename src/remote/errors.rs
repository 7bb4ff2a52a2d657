use thiserror::Error;

/// Failures of the remote content API. Network errors, non-2xx responses and
/// bodies whose status field is not `"ok"` are all one uniform failure;
/// callers decide which operations are fatal.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("http error {0}")]
    Http(reqwest::StatusCode),

    #[error("remote api returned '{status}': {message}")]
    Api { status: String, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Http(status)
        } else {
            Self::Request(err.to_string())
        }
    }
}
