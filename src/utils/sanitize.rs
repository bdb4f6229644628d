use serde_json::Value;

/// Sanitizes sensitive fields in JSON payloads for logging
pub fn sanitize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, val) in map {
                let sanitized_val = if is_sensitive_field(key) {
                    mask_value(val)
                } else {
                    sanitize_json(val)
                };
                sanitized.insert(key.clone(), sanitized_val);
            }
            Value::Object(sanitized)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_json).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_field(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "cardnumber"
            | "card_number"
            | "cvv"
            | "cardlastfour"
            | "card_last_four"
            | "password"
            | "secret"
            | "token"
            | "api_key"
            | "authorization"
    )
}

fn mask_value(value: &Value) -> Value {
    match value {
        // Keep only the trailing four characters of long values, card style.
        // Counted in chars, not bytes, so multibyte input cannot split.
        Value::String(s) if s.chars().count() > 8 => {
            let tail: String = s.chars().skip(s.chars().count() - 4).collect();
            Value::String(format!("****{}", tail))
        }
        _ => Value::String("****".to_string()),
    }
}
