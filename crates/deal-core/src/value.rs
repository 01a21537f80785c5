//! Runtime value representation shared by contracts, receivers and arguments.
//!
//! [`Value`] is the dynamic counterpart of whatever the host program passes
//! through an intercepted call: receivers are [`Object`]s with ordered fields,
//! arguments and results are arbitrary values. Values convert to and from
//! `serde_json::Value` so manifests, recorded invocations and any
//! `Serialize` type can be brought into the contract world.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// JSON key naming the class of an object in the JSON rendering.
pub const CLASS_KEY: &str = "@class";

/// Class given to JSON objects that carry no [`CLASS_KEY`].
pub const ANONYMOUS_CLASS: &str = "stdClass";

/// A runtime value bound into a contract evaluation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(Object),
}

/// An instance of a class: its class name and its fields in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub class: String,
    pub fields: IndexMap<String, Value>,
}

impl Object {
    pub fn new(class: impl Into<String>) -> Self {
        Object {
            class: class.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets a field, returning the previous value if there was one.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }
}

impl Value {
    /// Returns a human-readable description of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Converts a JSON document into a value.
    ///
    /// Integers that fit in `i64` become [`Value::Int`], every other number
    /// becomes [`Value::Float`]. Objects take their class from the
    /// [`CLASS_KEY`] member when it is a string, otherwise [`ANONYMOUS_CLASS`].
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(members) => {
                let class = members
                    .get(CLASS_KEY)
                    .and_then(|c| c.as_str())
                    .unwrap_or(ANONYMOUS_CLASS);
                let mut obj = Object::new(class);
                for (key, member) in members {
                    if key != CLASS_KEY {
                        obj.fields.insert(key.clone(), Value::from_json(member));
                    }
                }
                Value::Object(obj)
            }
        }
    }

    /// Renders the value as JSON. Non-finite floats render as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(obj) => {
                let mut members = serde_json::Map::new();
                members.insert(
                    CLASS_KEY.to_string(),
                    serde_json::Value::String(obj.class.clone()),
                );
                for (key, field) in &obj.fields {
                    members.insert(key.clone(), field.to_json());
                }
                serde_json::Value::Object(members)
            }
        }
    }
}

/// Converts any serializable Rust value into a [`Value`], tagging objects
/// at the top level with `class`.
///
/// This is how host types become receivers: a `#[derive(Serialize)]`
/// struct turns into an [`Object`] whose fields contracts can read.
pub fn to_value<T: Serialize>(class: &str, value: &T) -> Result<Value, serde_json::Error> {
    let json = serde_json::to_value(value)?;
    Ok(match Value::from_json(&json) {
        Value::Object(mut obj) => {
            obj.class = class.to_string();
            Value::Object(obj)
        }
        other => other,
    })
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_split_into_int_and_float() {
        assert_eq!(Value::from_json(&json!(3)), Value::Int(3));
        assert_eq!(Value::from_json(&json!(2.5)), Value::Float(2.5));
        assert_eq!(Value::from_json(&json!(u64::MAX)), Value::Float(u64::MAX as f64));
    }

    #[test]
    fn json_objects_take_class_from_marker() {
        let v = Value::from_json(&json!({"@class": "Account", "balance": 10}));
        let obj = v.as_object().unwrap();
        assert_eq!(obj.class, "Account");
        assert_eq!(obj.field("balance"), Some(&Value::Int(10)));
        assert!(obj.field(CLASS_KEY).is_none());

        let anon = Value::from_json(&json!({"x": null}));
        assert_eq!(anon.as_object().unwrap().class, ANONYMOUS_CLASS);
    }

    #[test]
    fn to_json_keeps_field_order_and_class() {
        let v = Value::Object(
            Object::new("Point")
                .with_field("y", 2)
                .with_field("x", 1),
        );
        assert_eq!(
            serde_json::to_string(&v.to_json()).unwrap(),
            r#"{"@class":"Point","y":2,"x":1}"#
        );
    }

    #[test]
    fn nan_renders_as_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn to_value_tags_serializable_structs() {
        #[derive(Serialize)]
        struct Account {
            owner: String,
            balance: i64,
        }

        let v = to_value(
            "Account",
            &Account {
                owner: "ada".into(),
                balance: 5,
            },
        )
        .unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.class, "Account");
        assert_eq!(obj.field("owner"), Some(&Value::Str("ada".into())));
        assert_eq!(obj.field("balance"), Some(&Value::Int(5)));
    }
}
