//! HTTP boundary.
//!
//! Everything that touches the network goes through the `Fetch` trait,
//! so the scheduler, adapters and worker pool are all testable against
//! in-memory fakes.

use crate::error::{StreamError, StreamResult};
use std::time::Duration;

/// Raw response: status plus body bytes. Callers interpret status codes
/// per endpoint (503 means "backend busy" on the live lane, for
/// instance), so no status handling happens here.
#[derive(Clone, Debug)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking byte fetcher.
pub trait Fetch: Send + Sync {
    /// Perform a GET. `Err` means the transport failed (DNS, refused,
    /// timeout); an HTTP error status is an `Ok` response.
    fn get(&self, url: &str) -> StreamResult<FetchResponse>;
}

/// `reqwest`-backed fetcher shared by all worker threads.
pub struct HttpFetch {
    client: reqwest::blocking::Client,
}

const USER_AGENT: &str = "quadscope/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

impl HttpFetch {
    pub fn new() -> StreamResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StreamError::Fetch {
                url: String::new(),
                reason: format!("client build failed: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetch {
    fn get(&self, url: &str) -> StreamResult<FetchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| StreamError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| StreamError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?
            .to_vec();
        Ok(FetchResponse { status, body })
    }
}
