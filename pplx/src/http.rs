use crate::config::ClientConfig;
use crate::provider::{CompletionProvider, PerplexityError, PerplexityResult};
use crate::response::RawResponse;
use crate::sse;
use crate::types::ChatRequest;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

/// Chat-completions over HTTPS with bearer-token auth.
pub struct HttpProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpProvider {
    pub fn new(config: &ClientConfig) -> PerplexityResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| PerplexityError::auth("API key contains invalid header characters"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PerplexityError::api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn handle_http_error(err: reqwest::Error) -> PerplexityError {
        if err.is_timeout() {
            warn!("Request timed out: {}", err);
        } else if err.is_connect() {
            warn!("Cannot connect to Perplexity API: {}", err);
        }

        PerplexityError::Api {
            message: format!("Request failed: {}", err),
            status: err.status().map(|s| s.as_u16()),
        }
    }

    /// Maps an error status onto the error taxonomy: 400 is a configuration
    /// problem, 401 an authentication problem and anything else an API error.
    fn handle_status_error(&self, status: StatusCode, body: &str) -> PerplexityError {
        let response = serde_json::from_str::<serde_json::Value>(body)
            .map(|json| json.to_string())
            .unwrap_or_else(|_| body.to_string());

        let message = format!(
            "Request failed: {} for url: {}\nStatus code: {}\nResponse: {}",
            status,
            self.endpoint,
            status.as_u16(),
            response
        );
        let status = Some(status.as_u16());

        match status {
            Some(400) => PerplexityError::Config { message, status },
            Some(401) => PerplexityError::Auth { message, status },
            _ => PerplexityError::Api { message, status },
        }
    }
}

#[async_trait]
impl CompletionProvider for HttpProvider {
    async fn complete(&self, request: &ChatRequest) -> PerplexityResult<RawResponse> {
        debug!(
            "Starting chat completion with model: {} ({} messages)",
            request.model,
            request.messages.len()
        );

        let payload = serde_json::to_vec(request)?;
        let response = self
            .client
            .post(&self.endpoint)
            .body(payload)
            .send()
            .await
            .map_err(Self::handle_http_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(Self::handle_http_error)?;

        if !status.is_success() {
            warn!("Perplexity API returned {}", status);
            return Err(self.handle_status_error(status, &body));
        }

        let body = if request.is_stream() {
            sse::assemble(&body).unwrap_or(body)
        } else {
            body
        };

        info!("Chat completion finished with status {}", status);
        Ok(RawResponse::new(status, headers, body))
    }

    fn provider_name(&self) -> &'static str {
        "perplexity"
    }
}
