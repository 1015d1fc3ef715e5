use serde_json::{Map, Value};

/// Parses a `key=value` pair given on the command line.
///
/// The value is read as JSON so numbers, booleans and lists keep their type;
/// anything that is not valid JSON is taken as a plain string.
pub fn parse_setting(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in `{}`", raw));
    }

    let value = value.trim();
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
    Ok((key.to_string(), value))
}

pub fn into_map(settings: Vec<(String, Value)>) -> Map<String, Value> {
    settings.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_typed_values() {
        assert_eq!(
            parse_setting("temperature=0.5").unwrap(),
            ("temperature".to_string(), json!(0.5))
        );
        assert_eq!(
            parse_setting("return_images=true").unwrap(),
            ("return_images".to_string(), json!(true))
        );
        assert_eq!(
            parse_setting(r#"search_domain_filter=["rust-lang.org"]"#).unwrap(),
            ("search_domain_filter".to_string(), json!(["rust-lang.org"]))
        );
    }

    #[test]
    fn test_parse_plain_string() {
        assert_eq!(
            parse_setting("search_recency_filter = week").unwrap(),
            ("search_recency_filter".to_string(), json!("week"))
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_setting("temperature").is_err());
        assert!(parse_setting("=0.5").is_err());
    }

    #[test]
    fn test_into_map_keeps_last_value() {
        let map = into_map(vec![
            ("top_p".to_string(), json!(0.5)),
            ("top_p".to_string(), json!(0.7)),
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map["top_p"], json!(0.7));
    }
}
