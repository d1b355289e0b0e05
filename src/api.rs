//! HTTP client for API-kind tests

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::{Error, Result};

/// Response captured from an API call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// JSON API client bound to one base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client for `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(Error::configuration("API base URL cannot be empty"));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request with an optional JSON body
    ///
    /// Supported methods are GET, POST, PUT, PATCH and DELETE.
    pub async fn send(&self, method: &str, endpoint: &str, body: Option<&Value>) -> Result<ApiResponse> {
        let method = parse_method(method)?;
        let url = self.url(endpoint);
        info!("Sending {} request to {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("Response {} from {} ({} bytes)", status, url, body.len());

        Ok(ApiResponse { status, body })
    }

    pub async fn get(&self, endpoint: &str) -> Result<ApiResponse> {
        self.send("GET", endpoint, None).await
    }

    pub async fn post(&self, endpoint: &str, body: &Value) -> Result<ApiResponse> {
        self.send("POST", endpoint, Some(body)).await
    }

    fn url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.trim_start_matches('/');
        if endpoint.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

fn parse_method(method: &str) -> Result<Method> {
    match method.trim().to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        other => Err(Error::configuration(format!("Unsupported HTTP method: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let api = client("https://api.example.com/v1/");
        assert_eq!(api.url("/users"), "https://api.example.com/v1/users");
        assert_eq!(api.url("users/2"), "https://api.example.com/v1/users/2");
        assert_eq!(api.url(""), "https://api.example.com/v1/");
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method(" Delete ").unwrap(), Method::DELETE);
        assert!(matches!(parse_method("TRACE"), Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_unsupported_method_fails_before_sending() {
        // Nothing listens on port 9; the error must come from method parsing
        let api = client("http://127.0.0.1:9");
        let err = api.send("CONNECT", "/", None).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_empty_base_url_is_rejected() {
        assert!(ApiClient::new("  ", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_response_helpers() {
        let response = ApiResponse {
            status: 201,
            body: r#"{"id": 5}"#.to_string(),
        };
        assert!(response.is_success());
        let value: Value = response.json().unwrap();
        assert_eq!(value["id"], 5);
    }
}
