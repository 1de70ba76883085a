use crate::types::{Element, Value};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashMap;

/// How objects of a class are projected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassRule {
    /// Drop the class name, the object becomes a plain map
    #[default]
    Anonymous,
    /// Keep the class name under [`ProjectionOptions::class_key`]
    Tagged,
}

/// Settings for [`to_json`]
#[derive(Debug, Clone)]
pub struct ProjectionOptions {
    /// Rules for specific class names
    pub rules: HashMap<String, ClassRule>,
    /// Rule for named classes without an entry in `rules`
    pub default_rule: ClassRule,
    /// Map key the class name is stored under for tagged classes
    pub class_key: String,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            rules: HashMap::new(),
            default_rule: ClassRule::Anonymous,
            class_key: "$class".to_string(),
        }
    }
}

impl ProjectionOptions {
    /// Options that tag every named class
    pub fn tag_all() -> Self {
        Self {
            default_rule: ClassRule::Tagged,
            ..Self::default()
        }
    }

    /// Set the rule for one class
    pub fn with_rule(mut self, class: impl Into<String>, rule: ClassRule) -> Self {
        self.rules.insert(class.into(), rule);
        self
    }

    fn rule_for(&self, class: &str) -> ClassRule {
        self.rules.get(class).copied().unwrap_or(self.default_rule)
    }
}

fn number(n: f64) -> JsonValue {
    Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}

fn members_to_json(members: &[Element], options: &ProjectionOptions) -> Map<String, JsonValue> {
    members
        .iter()
        .map(|e| (e.name.clone(), to_json(&e.value, options)))
        .collect()
}

fn sequence_to_json(items: &[Value], options: &ProjectionOptions) -> JsonValue {
    JsonValue::Array(items.iter().map(|v| to_json(v, options)).collect())
}

/// Project a value into plain JSON, keeping member order
pub fn to_json(value: &Value, options: &ProjectionOptions) -> JsonValue {
    match value {
        Value::Number(n) => number(*n),
        Value::Integer(i) => JsonValue::from(*i),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::XML(s, _) => JsonValue::String(s.clone()),
        Value::Null | Value::Undefined => JsonValue::Null,
        Value::Date(millis, _) => number(*millis),
        Value::AMF3(inner) => to_json(inner, options),
        Value::Object(members, class_def) => {
            let mut map = Map::new();
            if let Some(def) = class_def.as_ref().filter(|d| !d.is_anonymous()) {
                if options.rule_for(&def.name) == ClassRule::Tagged {
                    map.insert(
                        options.class_key.clone(),
                        JsonValue::String(def.name.clone()),
                    );
                }
            }
            map.extend(members_to_json(members, options));
            JsonValue::Object(map)
        }
        Value::ECMAArray(dense, assoc, _) => {
            if assoc.is_empty() {
                sequence_to_json(dense, options)
            } else if dense.is_empty() {
                JsonValue::Object(members_to_json(assoc, options))
            } else {
                let mut map = Map::new();
                map.insert("dense".to_string(), sequence_to_json(dense, options));
                map.insert(
                    "associative".to_string(),
                    JsonValue::Object(members_to_json(assoc, options)),
                );
                JsonValue::Object(map)
            }
        }
        Value::StrictArray(items) | Value::VectorObject(items, _, _) => {
            sequence_to_json(items, options)
        }
        Value::ByteArray(bytes) => bytes.iter().copied().map(JsonValue::from).collect(),
        Value::VectorInt(items, _) => items.iter().copied().map(JsonValue::from).collect(),
        Value::VectorUInt(items, _) => items.iter().copied().map(JsonValue::from).collect(),
        Value::VectorDouble(items, _) => items.iter().copied().map(number).collect(),
        Value::Dictionary(pairs, _) => pairs
            .iter()
            .map(|(k, v)| JsonValue::Array(vec![to_json(k, options), to_json(v, options)]))
            .collect(),
        Value::Unsupported(raw) => {
            let mut map = Map::new();
            map.insert(
                "$unsupported".to_string(),
                raw.iter().copied().map(JsonValue::from).collect(),
            );
            JsonValue::Object(map)
        }
    }
}
