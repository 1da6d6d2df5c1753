use serde::Serialize;
use serde_json::Value;

/// The stdout contract: `{ok, command, data}` or `{ok, command, error, details}`.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub ok: bool,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Envelope {
    pub fn ok(command: &str, data: Value) -> Self {
        Self {
            ok: true,
            command: command.to_string(),
            data: Some(data),
            error: None,
            details: None,
        }
    }

    pub fn fail(command: &str, code: &str, details: Value) -> Self {
        Self {
            ok: false,
            command: command.to_string(),
            data: None,
            error: Some(code.to_string()),
            details: Some(details),
        }
    }

    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"ok":false,"command":"internal","error":"envelope_serialization"}"#.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_has_no_error_fields() {
        let envelope = Envelope::ok("turn begin", serde_json::json!({"turn": {"turn_number": 1}}));
        let text = envelope.render();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["command"], "turn begin");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn failure_envelope_carries_code_and_details() {
        let envelope = Envelope::fail(
            "turn commit",
            "no_open_turn",
            serde_json::json!({"message": "no open turn for campaign camp_a"}),
        );
        let value: Value = serde_json::from_str(&envelope.render()).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"], "no_open_turn");
        assert!(value["details"]["message"].as_str().unwrap().contains("camp_a"));
    }
}
