//! Steering parameters handed to processors at initialisation.
//!
//! Parameters are a flat map from parameter name to a loosely typed value, the way a steering file
//! lists them. Processors read them through the typed accessors below, which fall back to a default
//! when a parameter is absent and fail when it is present with the wrong type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while reading or validating processor parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("parameter `{name}` should be {expected}")]
    WrongType { name: String, expected: &'static str },
    #[error("parameter `{name}` is out of range: {reason}")]
    OutOfRange { name: String, reason: String },
    #[error("`{outputs}` has {found} entries but `{inputs}` needs {needed}")]
    MissingOutputNames {
        inputs: &'static str,
        outputs: &'static str,
        needed: usize,
        found: usize,
    },
}

/// A single steering parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Float(f64),
    String(String),
    StringList(Vec<String>),
}

/// Named steering parameters of one processor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessorParameters(BTreeMap<String, ParameterValue>);

impl ProcessorParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly useful for hosts assembling parameters in code.
    pub fn with(mut self, name: &str, value: impl Into<ParameterValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParameterValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn float_or(&self, name: &str, default: f64) -> Result<f64, ConfigError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParameterValue::Float(value)) => Ok(*value),
            Some(ParameterValue::String(text)) => {
                text.trim().parse().map_err(|_| wrong_type(name, "a number"))
            }
            Some(_) => Err(wrong_type(name, "a number")),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, ConfigError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParameterValue::Bool(value)) => Ok(*value),
            Some(ParameterValue::String(text)) => match text.trim() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(wrong_type(name, "a boolean")),
            },
            Some(_) => Err(wrong_type(name, "a boolean")),
        }
    }

    pub fn string_opt(&self, name: &str) -> Result<Option<String>, ConfigError> {
        match self.0.get(name) {
            None => Ok(None),
            Some(ParameterValue::String(text)) if text.trim().is_empty() => Ok(None),
            Some(ParameterValue::String(text)) => Ok(Some(text.trim().to_string())),
            Some(_) => Err(wrong_type(name, "a string")),
        }
    }

    /// Reads a list of names. A single string is split on whitespace.
    pub fn string_list(&self, name: &str) -> Result<Vec<String>, ConfigError> {
        match self.0.get(name) {
            None => Ok(Vec::new()),
            Some(ParameterValue::StringList(list)) => Ok(list
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()),
            Some(ParameterValue::String(text)) => {
                Ok(text.split_whitespace().map(str::to_string).collect())
            }
            Some(_) => Err(wrong_type(name, "a list of strings")),
        }
    }
}

fn wrong_type(name: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongType {
        name: name.to_string(),
        expected,
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::String(value)
    }
}

impl From<Vec<&str>> for ParameterValue {
    fn from(value: Vec<&str>) -> Self {
        ParameterValue::StringList(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(value: Vec<String>) -> Self {
        ParameterValue::StringList(value)
    }
}
