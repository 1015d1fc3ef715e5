use crate::types::{ChatCompletion, ResponseFormat};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;

/// A successful HTTP reply as received, before any decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

impl PartialEq for RawResponse {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status && self.body == other.body
    }
}

/// Every view of one completion: the raw reply, its text, its JSON and the
/// assistant answer extracted from `choices[0].message.content`.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub raw: RawResponse,
    pub text: String,
    pub json: Option<Value>,
    pub llm_response: Option<String>,
}

impl Completion {
    /// Body that is not JSON, or JSON without an answer, leaves the matching
    /// fields empty instead of failing.
    pub fn from_raw(raw: RawResponse) -> Self {
        let text = raw.body().to_string();
        let json = raw.json();
        let llm_response = json.as_ref().and_then(extract_answer);

        Self {
            raw,
            text,
            json,
            llm_response,
        }
    }

    pub fn parsed(&self) -> Option<ChatCompletion> {
        self.json
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn citations(&self) -> Vec<String> {
        self.json
            .as_ref()
            .and_then(|value| value.get("citations"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn format(self, format: ResponseFormat) -> FormattedResponse {
        match format {
            ResponseFormat::Raw => FormattedResponse::Raw(self.raw),
            ResponseFormat::Text => FormattedResponse::Text(self.text),
            ResponseFormat::Json => FormattedResponse::Json(self.json),
            ResponseFormat::LlmResponse => FormattedResponse::LlmResponse(self.llm_response),
        }
    }
}

fn extract_answer(value: &Value) -> Option<String> {
    value
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormattedResponse {
    Raw(RawResponse),
    Text(String),
    Json(Option<Value>),
    LlmResponse(Option<String>),
}

impl FormattedResponse {
    pub fn format(&self) -> ResponseFormat {
        match self {
            FormattedResponse::Raw(_) => ResponseFormat::Raw,
            FormattedResponse::Text(_) => ResponseFormat::Text,
            FormattedResponse::Json(_) => ResponseFormat::Json,
            FormattedResponse::LlmResponse(_) => ResponseFormat::LlmResponse,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormattedResponse::Text(text) => Some(text),
            FormattedResponse::LlmResponse(answer) => answer.as_deref(),
            _ => None,
        }
    }

    /// Printable form used by the CLI: raw and text print the body, json is
    /// pretty-printed and a missing value prints as `None`.
    pub fn render(&self) -> String {
        match self {
            FormattedResponse::Raw(raw) => format!("{} {}", raw.status(), raw.body()),
            FormattedResponse::Text(text) => text.clone(),
            FormattedResponse::Json(Some(value)) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            FormattedResponse::LlmResponse(Some(answer)) => answer.clone(),
            FormattedResponse::Json(None) | FormattedResponse::LlmResponse(None) => {
                "None".to_string()
            }
        }
    }
}
