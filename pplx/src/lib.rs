pub mod client;
pub mod config;
pub mod http;
pub mod provider;
pub mod response;
pub mod sse;
pub mod types;

pub use client::{AskOptions, Perplexity};
pub use config::{ClientConfig, RequestConfig};
pub use http::HttpProvider;
pub use provider::{CompletionProvider, PerplexityError, PerplexityResult};
pub use response::{Completion, FormattedResponse, RawResponse};
pub use types::{
    ChatCompletion, ChatMessage, ChatRequest, Choice, FinishReason, MessageRole, ResponseFormat,
    Usage,
};

pub mod prelude {
    pub use crate::client::*;
    pub use crate::config::*;
    pub use crate::provider::*;
    pub use crate::response::*;
    pub use crate::types::*;
}
