//! Rendering context: the named values a template draws from

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A context value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    List(Vec<String>),
    Records(Vec<Context>),
}

/// Named values, serialized as a plain JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<K: Into<String>>(&mut self, key: K, value: Value) -> &mut Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn set_text<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        self.set(key, Value::Text(value.into()))
    }

    pub fn set_list<K: Into<String>, I, S>(&mut self, key: K, items: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(key, Value::List(items.into_iter().map(Into::into).collect()))
    }

    pub fn set_records<K: Into<String>>(&mut self, key: K, records: Vec<Context>) -> &mut Self {
        self.set(key, Value::Records(records))
    }

    /// Builder-style [`Context::set_text`]
    pub fn with_text<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set_text(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.values.get(key) {
            Some(Value::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn records(&self, key: &str) -> Option<&[Context]> {
        match self.values.get(key) {
            Some(Value::Records(records)) => Some(records),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_shape() {
        let mut ctx = Context::new();
        ctx.set_text("client_name", "IEEE")
            .set_list("scope_items", ["Provide Developer services as outlined in this SOW"])
            .set_records(
                "misc",
                vec![Context::new()
                    .with_text("provision", "Travel")
                    .with_text("narrative", "Billed at cost")],
            );

        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "client_name": "IEEE",
                "misc": [{"narrative": "Billed at cost", "provision": "Travel"}],
                "scope_items": ["Provide Developer services as outlined in this SOW"]
            })
        );

        let back: Context = serde_json::from_value(json).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn test_typed_accessors() {
        let ctx = Context::new().with_text("a", "1");
        assert_eq!(ctx.text("a"), Some("1"));
        assert_eq!(ctx.list("a"), None);
        assert_eq!(ctx.records("missing"), None);
        assert!(ctx.contains("a"));
    }
}
