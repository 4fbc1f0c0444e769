//! Request DTOs for the status API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde_json::{Map, Value};

/// Longest settings key accepted from a client.
pub const MAX_SETTING_KEY_LEN: usize = 64;

/// Partial settings for POST /settings, merged into the current snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsUpdate {
    pub values: Map<String, Value>,
}

impl SettingsUpdate {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.values.is_empty() {
            return Some("Settings update cannot be empty".to_string());
        }
        for key in self.values.keys() {
            if key.is_empty() {
                return Some("Setting name cannot be empty".to_string());
            }
            if key.len() > MAX_SETTING_KEY_LEN {
                return Some(format!(
                    "Setting name exceeds maximum length of {} characters",
                    MAX_SETTING_KEY_LEN
                ));
            }
        }
        None
    }
}

impl TryFrom<Value> for SettingsUpdate {
    type Error = String;

    fn try_from(body: Value) -> Result<Self, Self::Error> {
        match body {
            Value::Object(values) => Ok(Self { values }),
            other => Err(format!(
                "Settings must be a JSON object, got {}",
                json_kind(&other)
            )),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_update_from_object() {
        let update = SettingsUpdate::try_from(json!({"days_back": 3})).unwrap();
        assert_eq!(update.values["days_back"], json!(3));
        assert!(update.validate().is_none());
    }

    #[test]
    fn test_settings_update_rejects_non_object() {
        let err = SettingsUpdate::try_from(json!([1, 2])).unwrap_err();
        assert!(err.contains("an array"));
    }

    #[test]
    fn test_validate_empty_update() {
        let update = SettingsUpdate::try_from(json!({})).unwrap();
        assert!(update.validate().is_some());
    }

    #[test]
    fn test_validate_key_length() {
        let long_key = "k".repeat(MAX_SETTING_KEY_LEN + 1);
        let update = SettingsUpdate::try_from(json!({ long_key: true })).unwrap();
        assert!(update.validate().is_some());

        let update = SettingsUpdate::try_from(json!({ "": true })).unwrap();
        assert!(update.validate().is_some());
    }
}
