use crate::response::RawResponse;
use crate::types::ChatRequest;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PerplexityError {
    #[error("{message}")]
    Auth {
        message: String,
        status: Option<u16>,
    },

    #[error("{message}")]
    Config {
        message: String,
        status: Option<u16>,
    },

    #[error("{message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    #[error("Invalid response_type: {0}. Valid options are: [\"raw\", \"text\", \"json\", \"llm_response\"]")]
    InvalidResponseType(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PerplexityError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
            status: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            status: None,
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            status: None,
        }
    }

    /// HTTP status of the failed response, if the request got that far.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Config { status, .. } | Self::Api { status, .. } => {
                *status
            }
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }
}

pub type PerplexityResult<T> = Result<T, PerplexityError>;

/// Sends one chat-completions payload and hands back the undecoded reply.
///
/// Implementations map transport and HTTP failures onto [`PerplexityError`];
/// a successful return always carries a 2xx response.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> PerplexityResult<RawResponse>;

    fn provider_name(&self) -> &'static str;
}
