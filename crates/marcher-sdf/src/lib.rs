//! Marcher SDF - signed distance scenes compiled to GLSL
//!
//! Scenes are described with symbolic calls against a registry of shader
//! functions and compiled into a single ray-marching fragment shader. Only the
//! functions a scene actually reaches are emitted, dependencies first.
//!
//! ## Key Types
//!
//! - [`Registry`] - Named primitives, combinators, operators, helpers and objects
//! - [`Call`] / [`Expr`] - Symbolic call trees with pending point transforms
//! - [`ObjectBuilder`] - Accumulates the statements of an object body
//! - [`GlslEmitter`] - Turns a root object into a complete program
//! - [`ShaderConfig`] - `#define` values read by the ray marcher
//!
//! ## Example
//!
//! ```rust
//! use marcher_sdf::{FunctionDef, Registry, ShaderConfig, compile_to_text, stdlib};
//!
//! let mut registry = Registry::new();
//! let lib = stdlib::register(&mut registry)?;
//! let scene = registry.register(FunctionDef::object("Scene", move |obj, _| {
//!     obj.accumulate_result(&lib.union, [lib.sphere.call([2.0.into()]).into()])
//! }))?;
//!
//! let program = compile_to_text(&registry, &scene, &ShaderConfig::default())?;
//! assert!(program.contains("res = Union(res, Sphere(p, 2.0));"));
//! # Ok::<(), marcher_sdf::Error>(())
//! ```

mod config;
mod error;
pub mod expr;
mod glsl_gen;
pub mod object;
pub mod registry;
pub mod stdlib;
mod toposort;
mod types;

pub use config::{ConfigValue, ShaderConfig};
pub use error::{Error, Result};
pub use expr::{Call, Expr, TRANSLATE_OPERATOR, var, vec2, vec3};
pub use glsl_gen::{
    FUNCTIONS_MARKER, GlslEmitter, MACROS_MARKER, Template, compile_to_file, compile_to_text,
    get_base_template,
};
pub use object::{ObjectBuilder, ObjectDef, Statement, Target};
pub use registry::{Category, FnRef, FunctionDef, Registry, global};
pub use stdlib::Stdlib;
pub use toposort::toposort;
pub use types::{Param, ShaderType, fmt_float, is_identifier};
