//! Contains the HTTP remote used to talk to the pet-store API.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, StatusCode};

use crate::task::Task;

/// The default base URL of the public pet-store demo API.
pub const DEFAULT_HOST: &str = "https://petstore.swagger.io/v2";

/// A raw response, before validation.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The full response body.
    pub body: Bytes,
}

/// A remote implementation using HTTP to interact with the pet-store API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    host: String,
    client: Client,
}

impl HttpRemote {
    /// Creates a new `HttpRemote` for the given base URL with a default client.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            client: Client::new(),
        }
    }

    /// Creates a new `HttpRemote` whose requests time out after `timeout`.
    pub fn with_timeout(host: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            host: host.into(),
            client,
        })
    }

    /// The base URL all request paths are appended to.
    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.host.trim_end_matches('/'))
    }

    /// Issues the request for `task` and reads the entire body.
    ///
    /// Non-success status codes are not treated as errors here. Only failures to send the request
    /// or to read the body are returned as `Err`.
    pub async fn execute(&self, task: Task) -> reqwest::Result<Response> {
        let response = self
            .client
            .get(self.url(&task.path()))
            .query(task.query())
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        Ok(Response { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths() {
        let remote = HttpRemote::new(DEFAULT_HOST);
        assert_eq!(
            remote.url("/pet/1"),
            "https://petstore.swagger.io/v2/pet/1"
        );

        let remote = HttpRemote::new("http://localhost:8080/");
        assert_eq!(remote.url("/"), "http://localhost:8080/");
        assert_eq!(remote.url("/pet/1"), "http://localhost:8080/pet/1");
    }
}
