use crate::config::{validate_identity, ClientConfig, RequestConfig};
use crate::http::HttpProvider;
use crate::provider::{CompletionProvider, PerplexityResult};
use crate::response::{Completion, FormattedResponse};
use crate::types::{ChatMessage, ChatRequest, ResponseFormat};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, info};

/// Per-call settings for [`Perplexity::ask`].
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub model: Option<String>,
    pub system_role: Option<String>,
    pub append_history: bool,
    pub config: Map<String, Value>,
}

impl AskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_role(mut self, system_role: impl Into<String>) -> Self {
        self.system_role = Some(system_role.into());
        self
    }

    pub fn append_history(mut self) -> Self {
        self.append_history = true;
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// A conversation with the Perplexity API.
///
/// The session owns its history, which always starts with the system
/// message. `chat` sends and extends that history; `ask` sends a standalone
/// question and only records it when asked to.
pub struct Perplexity {
    provider: Box<dyn CompletionProvider>,
    model: String,
    system_role: String,
    chat_history: Vec<ChatMessage>,
    config: RequestConfig,
}

impl fmt::Debug for Perplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Perplexity")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.model)
            .field("system_role", &self.system_role)
            .field("chat_history", &self.chat_history)
            .field("config", &self.config)
            .finish()
    }
}

impl Perplexity {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        system_role: impl Into<String>,
    ) -> PerplexityResult<Self> {
        Self::from_config(ClientConfig::new(api_key, model, system_role))
    }

    pub fn from_config(config: ClientConfig) -> PerplexityResult<Self> {
        let provider = HttpProvider::new(&config)?;
        Self::with_provider(Box::new(provider), config.model, config.system_role)
    }

    pub fn from_env() -> PerplexityResult<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    pub fn with_provider(
        provider: Box<dyn CompletionProvider>,
        model: impl Into<String>,
        system_role: impl Into<String>,
    ) -> PerplexityResult<Self> {
        let model = model.into();
        let system_role = system_role.into();
        validate_identity(&model, &system_role)?;

        Ok(Self {
            provider,
            chat_history: vec![ChatMessage::system(system_role.clone())],
            model,
            system_role,
            config: RequestConfig::new(),
        })
    }

    /// Applies session config on construction. Fails on any invalid entry.
    pub fn with_request_config(mut self, config: &Map<String, Value>) -> PerplexityResult<Self> {
        self.config.merge(config)?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_role(&self) -> &str {
        &self.system_role
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    /// Drops everything but the system message.
    pub fn clear_history(&mut self) {
        self.chat_history.truncate(1);
    }

    /// Effective request options: defaults merged with session overrides.
    pub fn config(&self) -> Map<String, Value> {
        self.config.effective()
    }

    pub fn request_config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: &Map<String, Value>) -> PerplexityResult<()> {
        self.config.merge(config)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> PerplexityResult<()> {
        self.config.set(key, value)
    }

    /// Layers the overrides of another request config over this session's.
    pub fn update_config(&mut self, overrides: &RequestConfig) -> PerplexityResult<()> {
        self.config.merge(overrides.overrides())
    }

    /// Back to the defaults. Model, system role and history are kept.
    pub fn reset_config(&mut self) {
        self.config.reset();
    }

    pub async fn ask(&mut self, message: &str, options: AskOptions) -> PerplexityResult<Completion> {
        let model = options
            .model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.model.clone());
        let system_role = options
            .system_role
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.system_role.clone());
        validate_identity(&model, &system_role)?;

        let mut request_options = self.config.overrides().clone();
        request_options.extend(RequestConfig::non_default(&options.config)?);

        let request = ChatRequest::new(
            model,
            vec![ChatMessage::system(system_role), ChatMessage::user(message)],
        )
        .with_options(request_options);

        let completion = self.send(&request).await?;

        if options.append_history {
            if let Some(answer) = completion.llm_response.as_ref().filter(|a| !a.is_empty()) {
                self.chat_history.push(ChatMessage::user(message));
                self.chat_history.push(ChatMessage::assistant(answer.clone()));
            }
        }

        Ok(completion)
    }

    pub async fn ask_as(
        &mut self,
        message: &str,
        options: AskOptions,
        response_type: &str,
    ) -> PerplexityResult<FormattedResponse> {
        let format: ResponseFormat = response_type.parse()?;
        Ok(self.ask(message, options).await?.format(format))
    }

    /// Sends `message` with the whole conversation so far.
    ///
    /// The user message stays in the history even when the request fails.
    pub async fn chat(&mut self, message: &str) -> PerplexityResult<Completion> {
        self.chat_history.push(ChatMessage::user(message));

        let request = ChatRequest::new(self.model.clone(), self.chat_history.clone())
            .with_options(self.config.overrides().clone());

        let completion = self.send(&request).await?;

        if let Some(answer) = completion.llm_response.as_ref().filter(|a| !a.is_empty()) {
            self.chat_history.push(ChatMessage::assistant(answer.clone()));
        }

        Ok(completion)
    }

    pub async fn chat_as(
        &mut self,
        message: &str,
        response_type: &str,
    ) -> PerplexityResult<FormattedResponse> {
        let format: ResponseFormat = response_type.parse()?;
        Ok(self.chat(message).await?.format(format))
    }

    async fn send(&self, request: &ChatRequest) -> PerplexityResult<Completion> {
        debug!(
            "Sending {} messages to {} via {}",
            request.messages.len(),
            request.model,
            self.provider.provider_name()
        );

        let raw = self.provider.complete(request).await?;
        let completion = Completion::from_raw(raw);

        if completion.llm_response.is_none() {
            info!("Response carried no assistant message");
        }

        Ok(completion)
    }

    /// Ends the session and releases the HTTP connection pool.
    pub fn close(self) {
        debug!("Closing session with {} history messages", self.chat_history.len());
    }
}
