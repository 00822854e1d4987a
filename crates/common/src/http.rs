//! Delivery to HTTP sinks that may answer a POST with one redirect hop
//!
//! Script-hosted web apps accept the POST, then redirect (302) to a URL
//! that serves the actual response. Redirects are handled by hand so the
//! follow-up is always a single GET.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Default timeout for a single sink request
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of a successful sink exchange
#[derive(Debug, Clone)]
pub struct SinkResponse {
    /// Whether the answer came from following a redirect
    pub redirected: bool,
    pub status: u16,
    pub body: String,
}

impl SinkResponse {
    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(Error::from)
    }
}

/// HTTP client for the spreadsheet and mail sinks
#[derive(Debug, Clone)]
pub struct SinkClient {
    client: reqwest::Client,
}

impl SinkClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// POST `payload` as a JSON document in a `text/plain` body.
    ///
    /// A 2xx answer is returned directly. A 3xx answer is followed once with
    /// a GET to its `location`, and that answer must be 2xx. Anything else
    /// is an error.
    pub async fn post_text<T: Serialize>(&self, url: &str, payload: &T) -> Result<SinkResponse> {
        let body = serde_json::to_string(payload)?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(SinkResponse {
                redirected: false,
                status: status.as_u16(),
                body: response.text().await?,
            });
        }

        if !status.is_redirection() {
            return Err(status_error(status));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(Error::RedirectWithoutTarget)?;
        let target = response
            .url()
            .join(location)
            .map_err(|e| Error::InvalidRedirect(format!("{}: {}", location, e)))?;

        debug!("Sink redirected ({}), following to {}", status, target);

        let follow = self.client.get(target).send().await?;
        let status = follow.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        Ok(SinkResponse {
            redirected: true,
            status: status.as_u16(),
            body: follow.text().await?,
        })
    }
}

fn status_error(status: reqwest::StatusCode) -> Error {
    Error::SinkStatus {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
    }
}
