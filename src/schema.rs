//! The page schema: the client-held UI document that backend patches update.
//!
//! A [`PageSchema`] is a JSON object with at least `pageId`, `title` and
//! `components`. The component descriptors themselves are opaque to the
//! client. Patches are applied atomically: either every operation succeeds
//! and the result is still a page schema, or the document is left untouched.
//!
//! # Example
//!
//! ```rust
//! use schema_chat::schema::PageSchema;
//!
//! let mut schema = PageSchema::default();
//! let patch = serde_json::from_value(serde_json::json!([
//!     { "op": "replace", "path": "/title", "value": "Dashboard" }
//! ]))
//! .unwrap();
//! schema.apply(&patch).unwrap();
//! assert_eq!(schema.title(), "Dashboard");
//! ```

use std::path::Path;

use json_patch::Patch;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};

/// Page identifier of the built-in starting schema.
pub const DEFAULT_PAGE_ID: &str = "page_001";

/// Title of the built-in starting schema.
pub const DEFAULT_TITLE: &str = "首页";

/// A validated page schema document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct PageSchema(Value);

impl Default for PageSchema {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_ID, DEFAULT_TITLE)
    }
}

impl PageSchema {
    /// Create an empty page with the given id and title.
    #[must_use]
    pub fn new(page_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self(json!({
            "pageId": page_id.into(),
            "title": title.into(),
            "components": [],
        }))
    }

    /// Wrap an existing document, checking that it has the page shape.
    pub fn from_value(value: Value) -> Result<Self> {
        validate(&value)?;
        Ok(Self(value))
    }

    /// Load a schema from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read(path.as_ref()).await?;
        let value: Value = serde_json::from_slice(&raw)?;
        Self::from_value(value)
    }

    /// The `pageId` field.
    #[must_use]
    pub fn page_id(&self) -> &str {
        self.0["pageId"].as_str().unwrap_or_default()
    }

    /// The `title` field.
    #[must_use]
    pub fn title(&self) -> &str {
        self.0["title"].as_str().unwrap_or_default()
    }

    /// The ordered component descriptors.
    #[must_use]
    pub fn components(&self) -> &[Value] {
        match &self.0["components"] {
            Value::Array(items) => items,
            _ => &[],
        }
    }

    /// Borrow the raw document.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Apply a JSON Patch (RFC 6902).
    ///
    /// The patch runs against a copy of the document. The copy replaces the
    /// current document only if every operation succeeds and the result
    /// still has the page shape.
    pub fn apply(&mut self, patch: &Patch) -> Result<()> {
        let mut next = self.0.clone();
        json_patch::patch(&mut next, &patch.0)?;
        validate(&next)?;
        self.0 = next;
        Ok(())
    }

    /// Pretty-printed JSON, as shown in the schema preview.
    #[must_use]
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}

impl TryFrom<Value> for PageSchema {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<PageSchema> for Value {
    fn from(schema: PageSchema) -> Self {
        schema.0
    }
}

fn validate(value: &Value) -> Result<()> {
    let Some(obj) = value.as_object() else {
        return Err(Error::InvalidSchema("document is not an object".into()));
    };
    if !obj.get("pageId").is_some_and(Value::is_string) {
        return Err(Error::InvalidSchema("`pageId` must be a string".into()));
    }
    if !obj.get("title").is_some_and(Value::is_string) {
        return Err(Error::InvalidSchema("`title` must be a string".into()));
    }
    if !obj.get("components").is_some_and(Value::is_array) {
        return Err(Error::InvalidSchema("`components` must be an array".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(ops: Value) -> Patch {
        serde_json::from_value(ops).unwrap()
    }

    #[test]
    fn test_default_schema() {
        let schema = PageSchema::default();
        assert_eq!(schema.page_id(), "page_001");
        assert_eq!(schema.title(), "首页");
        assert!(schema.components().is_empty());
    }

    #[test]
    fn test_replace_title() {
        let mut schema = PageSchema::default();
        schema
            .apply(&patch(json!([{ "op": "replace", "path": "/title", "value": "X" }])))
            .unwrap();
        assert_eq!(schema.title(), "X");
        assert_eq!(schema.page_id(), "page_001");
    }

    #[test]
    fn test_matches_reference_patch() {
        let ops = json!([
            { "op": "add", "path": "/components/-", "value": { "id": "btn_1", "type": "Button" } },
            { "op": "add", "path": "/components/0", "value": { "id": "hdr", "type": "Header" } },
            { "op": "copy", "from": "/components/1", "path": "/components/-" },
            { "op": "replace", "path": "/components/2/id", "value": "btn_2" },
            { "op": "move", "from": "/title", "path": "/subtitle" },
            { "op": "add", "path": "/title", "value": "Settings" },
            { "op": "test", "path": "/components/1/id", "value": "btn_1" },
            { "op": "remove", "path": "/components/0" }
        ]);

        let mut schema = PageSchema::default();
        schema.apply(&patch(ops.clone())).unwrap();

        let mut reference = PageSchema::default().as_value().clone();
        json_patch::patch(&mut reference, &patch(ops).0).unwrap();

        assert_eq!(schema.as_value(), &reference);
        assert_eq!(schema.components().len(), 2);
        assert_eq!(schema.as_value()["subtitle"], "首页");
    }

    #[test]
    fn test_failed_patch_leaves_schema_untouched() {
        let mut schema = PageSchema::default();
        let before = schema.clone();

        let err = schema
            .apply(&patch(json!([
                { "op": "replace", "path": "/title", "value": "changed" },
                { "op": "remove", "path": "/missing" }
            ])))
            .unwrap_err();

        assert!(matches!(err, Error::Patch(_)));
        assert_eq!(schema, before);
    }

    #[test]
    fn test_failed_test_op_leaves_schema_untouched() {
        let mut schema = PageSchema::default();
        let before = schema.clone();

        let result = schema.apply(&patch(json!([
            { "op": "add", "path": "/components/-", "value": 1 },
            { "op": "test", "path": "/title", "value": "nope" }
        ])));

        assert!(result.is_err());
        assert_eq!(schema, before);
    }

    #[test]
    fn test_rejects_patch_that_breaks_shape() {
        let mut schema = PageSchema::default();

        let err = schema
            .apply(&patch(json!([{ "op": "remove", "path": "/components" }])))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));

        let err = schema
            .apply(&patch(json!([{ "op": "replace", "path": "", "value": "flat" }])))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));

        assert_eq!(schema, PageSchema::default());
    }

    #[test]
    fn test_from_value_validation() {
        assert!(PageSchema::from_value(json!({ "title": "t", "components": [] })).is_err());
        assert!(
            PageSchema::from_value(json!({ "pageId": "p", "title": "t", "components": {} }))
                .is_err()
        );

        let schema = PageSchema::from_value(json!({
            "pageId": "p",
            "title": "t",
            "components": [{ "id": "a" }],
            "theme": "dark"
        }))
        .unwrap();
        assert_eq!(schema.components().len(), 1);
        assert_eq!(schema.as_value()["theme"], "dark");
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let bad: std::result::Result<PageSchema, _> = serde_json::from_str("[1, 2]");
        assert!(bad.is_err());

        let json = serde_json::to_string(&PageSchema::default()).unwrap();
        assert!(json.contains("\"pageId\":\"page_001\""));
    }
}
