//! HTTP client for the control protocol

use std::time::Duration;

use reqwest::StatusCode;

use crate::common::{Error, Result};
use crate::ipc::protocol::{RunRequest, RunResponse, StatusResponse};

/// Client for one testing server
pub struct ControlClient {
    http: reqwest::Client,
    base: String,
}

impl ControlClient {
    /// Create a client with a single connect/read timeout
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base: base_url(host, port),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `GET /ping`, returning the body
    pub async fn ping(&self) -> Result<String> {
        let response = self.http.get(self.url("/ping")).send().await?;
        let response = ensure_ok(response)?;
        Ok(response.text().await?)
    }

    /// `POST /run` and wait for the worker's exit status
    pub async fn run(&self, args: Vec<String>) -> Result<RunResponse> {
        let response = self
            .http
            .post(self.url("/run"))
            .json(&RunRequest { args })
            .send()
            .await?;
        let response = ensure_ok(response)?;
        Ok(response.json().await?)
    }

    /// `POST /restart`, with the server's default mode when `method` is `None`
    pub async fn restart(&self, method: Option<&str>) -> Result<()> {
        let mut request = self.http.post(self.url("/restart"));
        if let Some(method) = method {
            request = request.query(&[("method", method)]);
        }
        ensure_ok(request.send().await?)?;
        Ok(())
    }

    /// `POST /shutdown`
    pub async fn shutdown(&self) -> Result<()> {
        ensure_ok(self.http.post(self.url("/shutdown")).send().await?)?;
        Ok(())
    }

    /// `GET /status`
    pub async fn status(&self) -> Result<StatusResponse> {
        let response = ensure_ok(self.http.get(self.url("/status")).send().await?)?;
        Ok(response.json().await?)
    }
}

fn base_url(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{}]:{}", host, port)
    } else {
        format!("http://{}:{}", host, port)
    }
}

fn ensure_ok(response: reqwest::Response) -> Result<reqwest::Response> {
    match response.status() {
        StatusCode::OK => Ok(response),
        status => Err(Error::TransportFailure(format!(
            "response failed with status code {}",
            status.as_u16()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("127.0.0.1", 7070), "http://127.0.0.1:7070");
        assert_eq!(base_url("localhost", 80), "http://localhost:80");
        assert_eq!(base_url("::1", 7070), "http://[::1]:7070");
        assert_eq!(base_url("[::1]", 7070), "http://[::1]:7070");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_failure() {
        // Bind then drop to find a port nobody listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = ControlClient::new("127.0.0.1", port, Duration::from_secs(2)).unwrap();
        assert!(matches!(
            client.ping().await,
            Err(Error::TransportFailure(_))
        ));
    }
}
