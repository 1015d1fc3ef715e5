//! Folding a server-sent-events completion stream into a single body.
//!
//! With `stream: true` the service answers with `data: {chunk}` lines, each
//! chunk carrying a `choices[0].delta.content` fragment. Callers of this crate
//! always receive whole completions, so the fragments are joined and written
//! back into the shape of a non-streamed response.

use serde_json::{json, Value};

const DONE: &str = "[DONE]";

fn data_lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .take_while(|data| *data != DONE)
        .filter(|data| !data.is_empty())
}

fn fragment(chunk: &Value) -> Option<&str> {
    let choice = chunk.get("choices")?.get(0)?;
    choice
        .get("delta")
        .and_then(|delta| delta.get("content"))
        .or_else(|| choice.get("message").and_then(|m| m.get("content")))
        .and_then(Value::as_str)
}

/// Returns `None` when `body` holds no decodable event, leaving the caller
/// to treat it as an ordinary body.
pub fn assemble(body: &str) -> Option<String> {
    let mut content = String::new();
    let mut last: Option<Value> = None;
    let mut finish_reason = Value::Null;

    for data in data_lines(body) {
        let Ok(chunk) = serde_json::from_str::<Value>(data) else {
            continue;
        };
        if !chunk.is_object() {
            continue;
        }

        if let Some(text) = fragment(&chunk) {
            content.push_str(text);
        }
        if let Some(reason) = chunk
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("finish_reason"))
            .filter(|r| !r.is_null())
        {
            finish_reason = reason.clone();
        }
        last = Some(chunk);
    }

    let mut completion = last?;
    completion["choices"] = json!([{
        "index": 0,
        "finish_reason": finish_reason,
        "message": {"role": "assistant", "content": content},
    }]);
    if let Some(object) = completion.get_mut("object") {
        *object = Value::from("chat.completion");
    }

    serde_json::to_string(&completion).ok()
}
