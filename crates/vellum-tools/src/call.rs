use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Decoded value of a `name := value` call argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Null => f.write_str("None"),
            ArgValue::Bool(true) => f.write_str("True"),
            ArgValue::Bool(false) => f.write_str("False"),
            ArgValue::Number(n) => write!(f, "{n}"),
            ArgValue::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::String(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::String(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Number(value)
    }
}

pub type Arguments = BTreeMap<String, ArgValue>;

/// A tool call extracted from a parse tree.
///
/// Only descriptors with both `api_name` and `function_name` count as calls;
/// the interpreter never hands out anything else.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallDescriptor {
    pub api_name: Option<String>,
    pub function_name: Option<String>,
    pub arguments: Arguments,
    pub print_call: bool,
}

impl CallDescriptor {
    pub fn new(api_name: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            api_name: Some(api_name.into()),
            function_name: Some(function_name.into()),
            arguments: Arguments::new(),
            print_call: false,
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn is_valid(&self) -> bool {
        self.api_name.is_some() && self.function_name.is_some()
    }

    pub fn argument(&self, name: &str) -> Option<&ArgValue> {
        self.arguments.get(name)
    }

    pub fn arguments_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.arguments).unwrap_or(serde_json::Value::Null)
    }

    /// Renders the call back in the grammar the model writes it in.
    pub fn to_source(&self) -> String {
        let args = self
            .arguments
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        let call = format!(
            "{}.{}({args})",
            self.api_name.as_deref().unwrap_or_default(),
            self.function_name.as_deref().unwrap_or_default()
        );
        if self.print_call {
            format!("print({call})")
        } else {
            call
        }
    }
}
