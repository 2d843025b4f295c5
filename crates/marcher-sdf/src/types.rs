//! Shader value types and parameter lists

use std::fmt;

use crate::{Error, Result};

/// Semantic type of a parameter or return value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderType {
    Scalar,
    Vec2,
    Vec3,
}

impl ShaderType {
    /// The GLSL spelling of this type
    pub fn glsl(self) -> &'static str {
        match self {
            ShaderType::Scalar => "float",
            ShaderType::Vec2 => "vec2",
            ShaderType::Vec3 => "vec3",
        }
    }
}

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl())
    }
}

/// A named, typed function parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: ShaderType,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: ShaderType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.name)
    }
}

/// Format a float the way shader source expects it
///
/// Uses the shortest representation that round-trips and always keeps a
/// decimal point or exponent, so `2` renders as `2.0` and `1e20` stays `1e20`.
pub fn fmt_float(value: f32) -> String {
    format!("{:?}", value)
}

/// Check that `name` is usable as a shader identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn check_identifier(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}
