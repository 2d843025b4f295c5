//! Error types for Marcher

use crate::registry::Category;
use thiserror::Error;

/// Result type alias using Marcher's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while registering functions or compiling a scene
///
/// Every failure aborts the compile; nothing is retried or skipped.
#[derive(Error, Debug)]
pub enum Error {
    /// A function with this name is already registered
    #[error("Name `{0}` has already been used")]
    DuplicateName(String),

    /// A function has no declared return type and its category has no default
    #[error("`{0}` has no return type specified and no default type")]
    MissingReturnType(String),

    /// A dependency or root name is not in the registry
    #[error("Unknown function `{0}`")]
    UnknownName(String),

    /// The dependency graph contains a cycle reachable from the root
    #[error(
        "Recursive or mutually recursive definitions are unsupported: {}",
        .cycle.join(" -> ")
    )]
    Cycle {
        /// The names on the cycle, first and last being the same name
        cycle: Vec<String>,
    },

    /// A call was rendered before it was applied to a point
    #[error("Compiling a partial: `{name}` {reason}")]
    PartialCompilation { name: String, reason: String },

    /// A function or parameter name is not a valid shader identifier
    #[error("Invalid identifier `{0}`")]
    InvalidName(String),

    /// Two parameters of one signature share a name, implicit ones included
    #[error("`{name}` declares parameter `{param}` more than once")]
    DuplicateParam { name: String, param: String },

    /// A function body failed registration checks
    #[error("Invalid body for `{name}`: {reason}")]
    InvalidBody { name: String, reason: String },

    /// A handle or call of one category was used where another is required
    #[error("`{name}` is a {found}, expected a {expected}")]
    WrongCategory {
        name: String,
        expected: Category,
        found: Category,
    },

    /// The compile root is not an object
    #[error("`{0}` is not an object and cannot be compiled as a scene root")]
    NotAnObject(String),

    /// Registration was attempted after the registry was sealed
    #[error("Registry is sealed, cannot register `{0}`")]
    RegistrySealed(String),

    /// Program template is missing a marker or has a duplicate one
    #[error("Invalid program template: {0}")]
    Template(String),

    /// Configuration key or value is unusable
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Text formatting failed
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
