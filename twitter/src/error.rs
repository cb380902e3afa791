use thiserror::Error;

#[derive(Error, Debug)]
pub enum TwitterError {
    #[error("request failed for {target}: {source}")]
    Request {
        target: String,
        source: reqwest::Error,
    },

    #[error("api returned status {status} for {target}")]
    Api { target: String, status: u16 },

    #[error("unable to parse response for {target}: {msg}")]
    Parse { target: String, msg: String },
}

impl TwitterError {
    /// The HTTP status behind this error, or 0 when the failure never
    /// produced one (transport errors, unparseable payloads).
    pub fn code(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            Self::Request { source, .. } => source.status().map(|s| s.as_u16()).unwrap_or(0),
            Self::Parse { .. } => 0,
        }
    }
}
