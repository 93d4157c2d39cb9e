//! Interpretation of JSON chat responses.
//!
//! A response either carries a `patch` for the page schema, a `message` or
//! `text` to show, or nothing usable. The first match wins, in that order.

use json_patch::Patch;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::session::ChatSession;

/// Default reply after a patch has been applied.
pub const DEFAULT_PATCHED_REPLY: &str = "UI updated";

/// Default reply for a response with no recognizable content.
pub const DEFAULT_FALLBACK_REPLY: &str = "Sorry, something went wrong. Please try again later.";

/// Default reply when a turn is sent before the session has an identifier.
pub const DEFAULT_UNINITIALIZED_REPLY: &str = "Error: Session ID not initialized.";

/// Fixed reply strings shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReplyTexts {
    /// Confirmation after a schema update.
    pub patched: String,
    /// Reply for unrecognized responses.
    pub fallback: String,
    /// Reply when the session is not initialized.
    pub uninitialized: String,
}

impl Default for ReplyTexts {
    fn default() -> Self {
        Self {
            patched: DEFAULT_PATCHED_REPLY.to_string(),
            fallback: DEFAULT_FALLBACK_REPLY.to_string(),
            uninitialized: DEFAULT_UNINITIALIZED_REPLY.to_string(),
        }
    }
}

/// What a JSON response asks the client to do.
#[derive(Debug, Clone)]
pub enum Interpretation {
    /// Apply the patch to the page schema.
    Patch(Patch),
    /// Show this text.
    Message(String),
    /// Nothing usable in the response.
    Unrecognized,
}

/// Whether a response field counts as present.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl Interpretation {
    /// Classify a response body.
    ///
    /// Fields count only when truthy: `null`, `false`, `0` and `""` are
    /// treated as absent. A truthy `patch` that is not a valid JSON Patch is
    /// an error. A non-string `message` or `text` is shown as its JSON text.
    pub fn from_body(body: &Value) -> Result<Self> {
        let field = |key: &str| body.get(key).filter(|v| is_truthy(v));

        if let Some(patch) = field("patch") {
            return Ok(Self::Patch(Patch::deserialize(patch)?));
        }

        if let Some(value) = field("message").or_else(|| field("text")) {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Ok(Self::Message(text));
        }

        Ok(Self::Unrecognized)
    }

    /// Carry out the interpretation against a session and produce the reply.
    ///
    /// A failed patch leaves the schema as it was and returns the error.
    pub fn resolve(self, session: &mut ChatSession, replies: &ReplyTexts) -> Result<String> {
        match self {
            Self::Patch(patch) => {
                session.apply_patch(&patch)?;
                Ok(replies.patched.clone())
            }
            Self::Message(text) => Ok(text),
            Self::Unrecognized => Ok(replies.fallback.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::PageSchema;
    use serde_json::json;

    fn reply(body: Value) -> (Result<String>, ChatSession) {
        let mut session = ChatSession::started(PageSchema::default());
        let result = Interpretation::from_body(&body)
            .and_then(|i| i.resolve(&mut session, &ReplyTexts::default()));
        (result, session)
    }

    #[test]
    fn test_patch_updates_schema() {
        let (result, session) =
            reply(json!({ "patch": [{ "op": "replace", "path": "/title", "value": "X" }] }));
        assert_eq!(result.unwrap(), DEFAULT_PATCHED_REPLY);
        assert_eq!(session.schema().title(), "X");
    }

    #[test]
    fn test_patch_wins_over_message() {
        let (result, session) = reply(json!({
            "patch": [{ "op": "add", "path": "/components/-", "value": { "id": "c1" } }],
            "message": "ignored"
        }));
        assert_eq!(result.unwrap(), DEFAULT_PATCHED_REPLY);
        assert_eq!(session.schema().components().len(), 1);
    }

    #[test]
    fn test_empty_patch_still_confirms() {
        let (result, session) = reply(json!({ "patch": [] }));
        assert_eq!(result.unwrap(), DEFAULT_PATCHED_REPLY);
        assert_eq!(session.schema(), &PageSchema::default());
    }

    #[test]
    fn test_message_and_text() {
        assert_eq!(reply(json!({ "message": "Hi" })).0.unwrap(), "Hi");
        assert_eq!(reply(json!({ "text": "Hi" })).0.unwrap(), "Hi");
        assert_eq!(
            reply(json!({ "message": "first", "text": "second" })).0.unwrap(),
            "first"
        );
        assert_eq!(
            reply(json!({ "message": "", "text": "second" })).0.unwrap(),
            "second"
        );
    }

    #[test]
    fn test_fallback() {
        assert_eq!(reply(json!({})).0.unwrap(), DEFAULT_FALLBACK_REPLY);
        assert_eq!(reply(json!({ "patch": null })).0.unwrap(), DEFAULT_FALLBACK_REPLY);
        assert_eq!(reply(json!({ "message": 0, "text": "" })).0.unwrap(), DEFAULT_FALLBACK_REPLY);
        assert_eq!(reply(json!(["not", "an", "object"])).0.unwrap(), DEFAULT_FALLBACK_REPLY);
    }

    #[test]
    fn test_falsy_patch_is_absent() {
        for patch in [json!(false), json!(0), json!("")] {
            let (result, session) = reply(json!({ "patch": patch, "message": "plain" }));
            assert_eq!(result.unwrap(), "plain");
            assert_eq!(session.schema(), &PageSchema::default());
        }
    }

    #[test]
    fn test_non_string_message_is_shown() {
        assert_eq!(reply(json!({ "message": 42 })).0.unwrap(), "42");
        assert_eq!(reply(json!({ "message": false, "text": true })).0.unwrap(), "true");
        assert_eq!(
            reply(json!({ "message": { "a": 1 } })).0.unwrap(),
            r#"{"a":1}"#
        );
    }

    #[test]
    fn test_truthy_non_patch_value_is_an_error() {
        let (result, _) = reply(json!({ "patch": true }));
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_malformed_patch_is_an_error() {
        let (result, session) = reply(json!({ "patch": [{ "op": "explode", "path": "/" }] }));
        assert!(matches!(result, Err(Error::Json(_))));
        assert_eq!(session.schema(), &PageSchema::default());
    }

    #[test]
    fn test_failing_patch_keeps_schema() {
        let (result, session) = reply(json!({
            "patch": [
                { "op": "replace", "path": "/title", "value": "X" },
                { "op": "replace", "path": "/nope/deeper", "value": 1 }
            ]
        }));
        assert!(matches!(result, Err(Error::Patch(_))));
        assert_eq!(session.schema().title(), "首页");
    }

    #[test]
    fn test_custom_reply_texts() {
        let replies = ReplyTexts {
            patched: "好的，已为您更新界面。".into(),
            ..ReplyTexts::default()
        };
        let mut session = ChatSession::started(PageSchema::default());
        let text = Interpretation::from_body(&json!({ "patch": [] }))
            .unwrap()
            .resolve(&mut session, &replies)
            .unwrap();
        assert_eq!(text, "好的，已为您更新界面。");
    }
}
