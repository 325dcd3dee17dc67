use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body shapes produced by the backend: `{message}`, `{error}`, or a
/// FastAPI-style `{detail}` carrying either a string or `{message, details}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl BackendErrorBody {
    pub fn best_message(&self) -> Option<String> {
        non_empty(self.message.as_deref())
            .or_else(|| non_empty(self.error.as_deref()))
            .or_else(|| match &self.detail {
                Some(Value::String(detail)) => non_empty(Some(detail)),
                Some(Value::Object(detail)) => {
                    non_empty(detail.get("message").and_then(Value::as_str))
                }
                _ => None,
            })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
