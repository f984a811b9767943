use crate::config::Config;
use crate::errors::{NoCrmError, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;

/// Query-string filters passed through to list endpoints.
pub type Filters = BTreeMap<String, String>;

const DEFAULT_ERROR_MESSAGE: &str = "Unknown error";

/// Low-level request executor for the NoCRM REST API.
///
/// Holds only the immutable configuration. Every call builds its own
/// `reqwest::Client`, so nothing is pooled or shared between requests and
/// concurrent calls never contend on client state.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: Config,
}

impl ApiClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Performs one request against `{base_url}/{path}` and returns the decoded JSON body.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method.
    /// * `path` - Path relative to the base URL; a leading `/` is ignored.
    /// * `body` - Optional JSON request body.
    /// * `params` - Optional query-string parameters.
    ///
    /// # Errors
    ///
    /// * `NoCrmError::Authentication` on HTTP 401.
    /// * `NoCrmError::Api` with a status for any other non-2xx response.
    /// * `NoCrmError::Api` without a status when the connection fails or times out.
    /// * `NoCrmError::Decode` when a 2xx body is not valid JSON.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        params: Option<&Filters>,
    ) -> Result<Value> {
        let url = self.url_for(path);
        tracing::info!("{} {}", method, url);
        if let Some(params) = params {
            tracing::debug!("Query params: {:?}", params);
        }

        let client = reqwest::Client::builder()
            .timeout(self.config.timeout())
            .pool_max_idle_per_host(0)
            .build()?;

        let mut request = client
            .request(method.clone(), &url)
            .header("X-API-KEY", self.config.api_key())
            .header("Content-Type", "application/json");
        if let Some(params) = params {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("NoCRM rejected the API key for {} {}", method, url);
            return Err(NoCrmError::Authentication("Invalid API key".to_string()));
        }

        if !status.is_success() {
            let message = error_message(&text);
            tracing::warn!("NoCRM returned {} for {} {}: {}", status, method, url, message);
            return Err(NoCrmError::api(status.as_u16(), message));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            NoCrmError::Decode(format!("Failed to parse NoCRM response: {}", e))
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url(), path.trim_start_matches('/'))
    }
}

/// Pulls the server's `message` out of an error body, falling back to a generic one.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let config = Config::new("token", "acme")
            .unwrap()
            .with_base_url("http://localhost:3000/api/v2")
            .unwrap();
        ApiClient::new(config)
    }

    #[test]
    fn test_url_joins_relative_paths() {
        let client = client();
        assert_eq!(client.url_for("leads"), "http://localhost:3000/api/v2/leads");
        assert_eq!(
            client.url_for("/leads/5/assign"),
            "http://localhost:3000/api/v2/leads/5/assign"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"message":"Lead not found"}"#), "Lead not found");
        assert_eq!(error_message(r#"{"error":"nope"}"#), "Unknown error");
        assert_eq!(error_message(r#"{"message":42}"#), "Unknown error");
        assert_eq!(error_message("<html>Bad Gateway</html>"), "Unknown error");
        assert_eq!(error_message(""), "Unknown error");
    }
}
