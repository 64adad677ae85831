//! HTTP transport seam. The client only needs "execute a GET, give me the
//! reply as lines"; everything else (request construction, parsing) lives
//! above this trait, which also keeps the tests off the network.

use crate::error::ClimSimError;
use log::warn;

/// Executes a GET against a fully-built URL and returns the reply body as a
/// sequence of lines, or a structured error.
pub trait Transport: Send + Sync {
    fn get_lines(&self, url: &str) -> Result<Vec<String>, ClimSimError>;
}

/// Default transport over a blocking `reqwest` client. No timeout and no
/// retries: a stalled server call blocks the caller.
pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn get_lines(&self, url: &str) -> Result<Vec<String>, ClimSimError> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(ClimSimError::Connection)?;
        let status = response.status();
        let body = response.text().map_err(ClimSimError::Connection)?;
        if status.is_client_error() {
            warn!("HTTP {status} for {url}");
            return Err(ClimSimError::HttpClient { status, body });
        }
        if status.is_server_error() {
            warn!("HTTP {status} for {url}");
            return Err(ClimSimError::HttpServer { status, body });
        }
        Ok(body.lines().map(str::to_owned).collect())
    }
}
