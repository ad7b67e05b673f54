//! Blocking `reqwest` implementation of [`Transport`].

use std::time::Duration;

use log::{debug, trace};
use reqwest::blocking::Client;

use super::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use crate::config::HttpConfig;

/// Production transport backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create an HTTP client from the `http` config section.
    ///
    /// No timeout is set unless `timeout_secs` is configured, leaving the
    /// client's defaults in place.
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        debug!("{} {}", request.method, request.url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().map_err(|e| TransportError::Request {
            method: request.method,
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| TransportError::Body {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;
        trace!("{} {} -> {status} ({} bytes)", request.method, request.url, body.len());

        Ok(ApiResponse { status, body })
    }
}
