use crate::provider::{PerplexityError, PerplexityResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_MODEL: &str = "sonar";
pub const DEFAULT_SYSTEM_ROLE: &str = "You are a helpful assistant.";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const RECENCY_FILTERS: [&str; 4] = ["month", "week", "day", "hour"];
const MAX_DOMAIN_FILTERS: usize = 3;
const MAX_TOP_K: i64 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Integer,
    Number,
    Bool,
    Text,
    TextList,
}

impl ValueKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::Integer => value.is_i64() || value.is_u64(),
            ValueKind::Number => value.is_number(),
            ValueKind::Bool => value.is_boolean(),
            ValueKind::Text => value.is_string(),
            ValueKind::TextList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DefaultValue {
    Unset,
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(&'static str),
    EmptyList,
}

impl DefaultValue {
    fn to_value(self) -> Option<Value> {
        match self {
            DefaultValue::Unset => None,
            DefaultValue::Float(f) => Some(Value::from(f)),
            DefaultValue::Int(i) => Some(Value::from(i)),
            DefaultValue::Bool(b) => Some(Value::Bool(b)),
            DefaultValue::Text(s) => Some(Value::from(s)),
            DefaultValue::EmptyList => Some(Value::Array(Vec::new())),
        }
    }
}

struct KeySpec {
    name: &'static str,
    kind: ValueKind,
    default: DefaultValue,
}

impl KeySpec {
    const fn new(name: &'static str, kind: ValueKind, default: DefaultValue) -> Self {
        Self {
            name,
            kind,
            default,
        }
    }
}

/// Request options the chat-completions endpoint understands, with the
/// defaults the service applies when a key is omitted.
static KEYS: [KeySpec; 11] = [
    KeySpec::new("max_tokens", ValueKind::Integer, DefaultValue::Unset),
    KeySpec::new("temperature", ValueKind::Number, DefaultValue::Float(0.2)),
    KeySpec::new("top_p", ValueKind::Number, DefaultValue::Float(0.9)),
    KeySpec::new("search_domain_filter", ValueKind::TextList, DefaultValue::EmptyList),
    KeySpec::new("return_images", ValueKind::Bool, DefaultValue::Bool(false)),
    KeySpec::new("return_related_questions", ValueKind::Bool, DefaultValue::Bool(false)),
    KeySpec::new("search_recency_filter", ValueKind::Text, DefaultValue::Text("month")),
    KeySpec::new("top_k", ValueKind::Integer, DefaultValue::Int(0)),
    KeySpec::new("stream", ValueKind::Bool, DefaultValue::Bool(false)),
    KeySpec::new("presence_penalty", ValueKind::Number, DefaultValue::Int(0)),
    KeySpec::new("frequency_penalty", ValueKind::Number, DefaultValue::Int(1)),
];

fn key_spec(key: &str) -> Option<&'static KeySpec> {
    KEYS.iter().find(|spec| spec.name == key)
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Per-session request options layered over the service defaults.
///
/// Only values that differ from the default are stored, so the payload sent
/// to the service stays minimal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    overrides: Map<String, Value>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn known_keys() -> impl Iterator<Item = &'static str> {
        KEYS.iter().map(|spec| spec.name)
    }

    /// Default options with unset values (such as `max_tokens`) left out.
    pub fn defaults() -> Map<String, Value> {
        KEYS.iter()
            .filter_map(|spec| spec.default.to_value().map(|value| (spec.name.to_string(), value)))
            .collect()
    }

    pub fn default_value(key: &str) -> Option<Value> {
        key_spec(key).and_then(|spec| spec.default.to_value())
    }

    pub fn validate(config: &Map<String, Value>) -> PerplexityResult<()> {
        for (key, value) in config {
            Self::validate_entry(key, value)?;
        }
        Ok(())
    }

    pub fn is_valid(config: &Map<String, Value>) -> bool {
        Self::validate(config).is_ok()
    }

    fn validate_entry(key: &str, value: &Value) -> PerplexityResult<()> {
        let spec = key_spec(key).ok_or_else(|| {
            PerplexityError::config(format!("Invalid configuration key: {}", key))
        })?;

        // Keys without a default may be cleared.
        if value.is_null() && matches!(spec.default, DefaultValue::Unset) {
            return Ok(());
        }

        if !spec.kind.matches(value) {
            return Err(PerplexityError::config(format!(
                "Invalid configuration value for key: {}",
                key
            )));
        }

        Self::check_range(key, value)
    }

    fn check_range(key: &str, value: &Value) -> PerplexityResult<()> {
        let out_of_range = |rule: &str| -> PerplexityResult<()> {
            Err(PerplexityError::config(format!(
                "Invalid configuration value for key: {} ({})",
                key, rule
            )))
        };

        match key {
            "temperature" => match value.as_f64() {
                Some(t) if (0.0..2.0).contains(&t) => Ok(()),
                _ => out_of_range("must be >= 0 and < 2"),
            },
            "top_p" => match value.as_f64() {
                Some(p) if (0.0..=1.0).contains(&p) => Ok(()),
                _ => out_of_range("must be between 0 and 1"),
            },
            "top_k" => match value.as_i64() {
                Some(k) if (0..=MAX_TOP_K).contains(&k) => Ok(()),
                _ => out_of_range("must be between 0 and 2048"),
            },
            "presence_penalty" => match value.as_f64() {
                Some(p) if (-2.0..=2.0).contains(&p) => Ok(()),
                _ => out_of_range("must be between -2 and 2"),
            },
            "frequency_penalty" => match value.as_f64() {
                Some(p) if p > 0.0 => Ok(()),
                _ => out_of_range("must be greater than 0"),
            },
            "max_tokens" => match value.as_u64() {
                Some(n) if n > 0 => Ok(()),
                _ => out_of_range("must be greater than 0"),
            },
            "search_recency_filter" => match value.as_str() {
                Some(filter) if RECENCY_FILTERS.contains(&filter) => Ok(()),
                _ => out_of_range("must be one of month, week, day, hour"),
            },
            "search_domain_filter" => match value.as_array() {
                Some(domains) if domains.len() <= MAX_DOMAIN_FILTERS => Ok(()),
                _ => out_of_range("at most 3 domains"),
            },
            _ => Ok(()),
        }
    }

    /// Entries of `config` that differ from the defaults. Validates first.
    pub fn non_default(config: &Map<String, Value>) -> PerplexityResult<Map<String, Value>> {
        Self::validate(config)?;
        Ok(config
            .iter()
            .filter(|(key, value)| match Self::default_value(key) {
                Some(default) => !same_value(value, &default),
                None => !value.is_null(),
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    /// Validates `config` as a whole and applies it. Nothing is applied when
    /// any entry is invalid. A value equal to its default clears the override.
    pub fn merge(&mut self, config: &Map<String, Value>) -> PerplexityResult<()> {
        let changed = Self::non_default(config)?;
        for key in config.keys() {
            if !changed.contains_key(key) {
                self.overrides.remove(key);
            }
        }
        self.overrides.extend(changed);
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> PerplexityResult<()> {
        let mut entry = Map::new();
        entry.insert(key.to_string(), value.into());
        self.merge(&entry)
    }

    pub fn reset(&mut self) {
        self.overrides.clear();
    }

    pub fn overrides(&self) -> &Map<String, Value> {
        &self.overrides
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Defaults merged with overrides, unset values left out.
    pub fn effective(&self) -> Map<String, Value> {
        let mut config = Self::defaults();
        config.extend(
            self.overrides
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        config
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.overrides
            .get(key)
            .cloned()
            .or_else(|| Self::default_value(key))
    }
}

/// Connection settings and the identity of a chat session.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub model: String,
    pub system_role: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let api_key = if self.api_key.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("ClientConfig")
            .field("api_key", &api_key)
            .field("model", &self.model)
            .field("system_role", &self.system_role)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            system_role: DEFAULT_SYSTEM_ROLE.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        system_role: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            system_role: system_role.into(),
            ..Self::default()
        }
    }

    /// Reads settings from the environment after loading `.env` when present.
    ///
    /// `PPLX_API_KEY` is required. `PPLX_MODEL`, `PPLX_SYSTEM_ROLE`,
    /// `PPLX_BASE_URL` and `PPLX_TIMEOUT_SECS` fall back to the defaults.
    pub fn from_env() -> PerplexityResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_process_env()
    }

    /// Same as [`ClientConfig::from_env`] without touching `.env`.
    pub fn from_process_env() -> PerplexityResult<Self> {
        let api_key = env::var("PPLX_API_KEY")
            .map_err(|_| PerplexityError::auth("PPLX_API_KEY is not set"))?;

        let mut config = Self::new(
            api_key,
            env::var("PPLX_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            env::var("PPLX_SYSTEM_ROLE").unwrap_or_else(|_| DEFAULT_SYSTEM_ROLE.to_string()),
        );

        if let Ok(base_url) = env::var("PPLX_BASE_URL") {
            config.base_url = base_url;
        }

        if let Ok(secs) = env::var("PPLX_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|_| {
                PerplexityError::config(format!(
                    "PPLX_TIMEOUT_SECS must be a positive number, got: {}",
                    secs
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_role(mut self, system_role: impl Into<String>) -> Self {
        self.system_role = system_role.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> PerplexityResult<()> {
        validate_required(&self.api_key, &self.model, &self.system_role)?;

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(PerplexityError::config(
                "Base URL must start with http:// or https://",
            ));
        }

        if self.timeout.is_zero() {
            return Err(PerplexityError::config("Timeout must be greater than 0"));
        }

        Ok(())
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

pub(crate) fn validate_required(api_key: &str, model: &str, system_role: &str) -> PerplexityResult<()> {
    if api_key.is_empty() {
        return Err(PerplexityError::auth("API key is required"));
    }
    validate_identity(model, system_role)
}

pub(crate) fn validate_identity(model: &str, system_role: &str) -> PerplexityResult<()> {
    if model.is_empty() {
        return Err(PerplexityError::config("Model name is required"));
    }
    if system_role.is_empty() {
        return Err(PerplexityError::config("System role is required"));
    }
    Ok(())
}
