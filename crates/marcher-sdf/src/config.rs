//! Program configuration
//!
//! Each entry becomes a `#define NAME value` line ahead of the function block.
//! The ray marcher in the default template reads the keys below; any other key
//! is passed through untouched.
//!
//! | Key             | Default                   |
//! |-----------------|---------------------------|
//! | `MAX_STEPS`     | `100`                     |
//! | `MAX_DISTANCE`  | `100.0`                   |
//! | `MIN_DISTANCE`  | `0.001`                   |
//! | `ANTIALIAS`     | `1`                       |
//! | `BACKGROUND`    | `vec3(0.5, 0.5, 0.5)`     |
//! | `MATERIAL`      | `vec3(0.8, 0.8, 0.8)`     |
//! | `CAMERA_ORIGIN` | `vec3(1.0, 1.0, 1.0)`     |
//! | `CAMERA_TARGET` | `vec3(0.0, 0.0, 0.0)`     |
//! | `LIGHT_POS`     | `vec3(1.0, 4.0, 1.0)`     |

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::types::{fmt_float, is_identifier};
use crate::{Error, Result};

/// A configuration value
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Float(f32),
    Vector(Vec<f32>),
    /// Shader text used verbatim
    Raw(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Int(value) => write!(f, "{}", value),
            ConfigValue::Float(value) => f.write_str(&fmt_float(*value)),
            ConfigValue::Vector(components) => {
                write!(f, "vec{}(", components.len())?;
                for (i, component) in components.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&fmt_float(*component))?;
                }
                f.write_str(")")
            }
            ConfigValue::Raw(text) => f.write_str(text),
        }
    }
}

/// Parses command-line values: `100`, `0.5`, `1,2,3`, anything else is raw
impl FromStr for ConfigValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Config("empty value".to_string()));
        }
        if let Ok(value) = s.parse::<i64>() {
            return Ok(ConfigValue::Int(value));
        }
        if let Ok(value) = s.parse::<f32>() {
            return Ok(ConfigValue::Float(value));
        }
        if s.contains(',') {
            let components: std::result::Result<Vec<f32>, _> =
                s.split(',').map(|c| c.trim().parse::<f32>()).collect();
            if let Ok(components) = components {
                return Ok(ConfigValue::Vector(components));
            }
        }
        Ok(ConfigValue::Raw(s.to_string()))
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        ConfigValue::Int(value.into())
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value as f32)
    }
}

impl From<f32> for ConfigValue {
    fn from(value: f32) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<[f32; 3]> for ConfigValue {
    fn from(value: [f32; 3]) -> Self {
        ConfigValue::Vector(value.to_vec())
    }
}

/// Ordered macro definitions for a compiled program
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderConfig {
    entries: Vec<(String, ConfigValue)>,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::empty()
            .with("MAX_STEPS", 100)
            .with("MAX_DISTANCE", 100.0)
            .with("MIN_DISTANCE", 0.001)
            .with("ANTIALIAS", 1)
            .with("BACKGROUND", [0.5_f32, 0.5, 0.5])
            .with("MATERIAL", [0.8_f32, 0.8, 0.8])
            .with("CAMERA_ORIGIN", [1.0_f32, 1.0, 1.0])
            .with("CAMERA_TARGET", [0.0_f32, 0.0, 0.0])
            .with("LIGHT_POS", [1.0_f32, 4.0, 1.0])
    }
}

impl ShaderConfig {
    /// A configuration with no entries at all
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set `key`, keeping its position if it already exists
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlay the keys of a JSON object
    pub fn merge_json_str(&mut self, json: &str) -> Result<()> {
        let overrides: BTreeMap<String, ConfigValue> = serde_json::from_str(json)?;
        for (key, value) in overrides {
            self.set(key, value);
        }
        Ok(())
    }

    /// Defaults overlaid with a JSON object such as `{"MAX_STEPS": 200}`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config = Self::default();
        config.merge_json_str(json)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// `#define` lines for every entry, in order
    pub fn macros(&self) -> Result<String> {
        let mut out = String::new();
        for (key, value) in &self.entries {
            if !is_identifier(key) {
                return Err(Error::Config(format!("`{}` is not a valid macro name", key)));
            }
            out.push_str(&format!("#define {} {}\n", key, value));
        }
        Ok(out)
    }
}
