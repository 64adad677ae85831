use crate::types::enums::Month;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced by the client. Variants split into two kinds: failures
/// caused on the client end (bad input, local limits, unreachable host,
/// unparseable handshake, out-of-band parser state) and failures reported by
/// the server (HTTP 5xx, in-band `error` lines).
/// [`ClimSimError::is_server_error`] tells the two apart.
#[derive(Debug, Error)]
pub enum ClimSimError {
    #[error("HTTP {status}: {body}")]
    HttpClient { status: StatusCode, body: String },

    #[error("HTTP {status}: {body}")]
    HttpServer { status: StatusCode, body: String },

    /// In-band error line found inside an otherwise successful reply.
    #[error("server error: {0}")]
    Server(String),

    #[error("unable to connect to the server")]
    Connection(#[source] reqwest::Error),

    #[error("malformed request URL '{0}'")]
    MalformedUrl(String),

    #[error("the server status could not be parsed: {0}")]
    Handshake(String),

    #[error("the server initialization is not completed")]
    ServerNotReady,

    #[error("this client is not supported by the server: {0}")]
    UnsupportedClient(String),

    #[error("the maximum number of locations for a single request is {max}, got {got}")]
    TooManyLocations { max: usize, got: usize },

    #[error("invalid coordinates: latitude {latitude} / longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The reply could not be mapped onto the request; carries the raw text.
    #[error("unexpected server reply: {0}")]
    UnexpectedReply(String),

    #[error("the field '{0}' is missing from the dataset")]
    MissingField(String),

    #[error("the month {0:?} is not in the monthly table")]
    MissingMonth(Month),

    #[error("the variable {0} is not in the monthly table")]
    MissingVariable(&'static str),

    #[error("row has {got} values but the dataset has {expected} fields")]
    RowWidth { expected: usize, got: usize },
}

impl ClimSimError {
    /// True for failures reported by the server itself, false for failures
    /// on the client end.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ClimSimError::HttpServer { .. } | ClimSimError::Server(_)
        )
    }
}
