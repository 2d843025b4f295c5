//! Function registry
//!
//! Every primitive, combinator, operator, helper function and object lives in
//! one namespace keyed by name. Registration hands back an [`FnRef`] used to
//! build calls; lookups by name only happen when a program is sorted and
//! emitted.
//!
//! The registry has two phases: open for registration, then sealed and
//! read-only for compilation.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::expr::{Call, Expr, POSITION_VAR, RESULT_VAR};
use crate::object::{ObjectBuilder, ObjectDef};
use crate::types::{Param, ShaderType, check_identifier};
use crate::{Error, Result};

/// Kind of a registered function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Distance function of a point
    Primitive,
    /// Combines distances
    Combinator,
    /// Maps a point to a new point
    Operator,
    /// Scene fragment built from accumulated statements
    Object,
    /// Plain helper function
    Function,
}

impl Category {
    /// Return type used when a definition doesn't declare one
    pub fn default_return(self) -> Option<ShaderType> {
        match self {
            Category::Primitive | Category::Combinator | Category::Object => {
                Some(ShaderType::Scalar)
            }
            Category::Operator => Some(ShaderType::Vec3),
            Category::Function => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Primitive => "primitive",
            Category::Combinator => "combinator",
            Category::Operator => "operator",
            Category::Object => "object",
            Category::Function => "function",
        })
    }
}

/// Handle to a registered function, used to build calls against it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnRef {
    name: Arc<str>,
    category: Category,
}

impl FnRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Build a symbolic call; nothing is resolved until emission
    pub fn call(&self, args: impl IntoIterator<Item = Expr>) -> Call {
        Call::new(self.name.clone(), self.category, args.into_iter().collect())
    }

    pub(crate) fn expect_category(&self, expected: Category) -> Result<()> {
        if self.category == expected {
            Ok(())
        } else {
            Err(Error::WrongCategory {
                name: self.name.to_string(),
                expected,
                found: self.category,
            })
        }
    }
}

/// Where a function's body text comes from
#[derive(Debug, Clone)]
pub enum Body {
    /// Opaque shader text, embedded verbatim
    Template(String),
    /// Produced by running an object builder
    Object(Arc<ObjectDef>),
}

/// A named function definition
///
/// Built with the category constructors and chained setters:
///
/// ```ignore
/// let sphere = FunctionDef::primitive("Sphere")
///     .param("p", ShaderType::Vec3)
///     .param("r", ShaderType::Scalar)
///     .body("return length(p) - r;");
/// ```
#[derive(Debug, Clone)]
pub struct FunctionDef {
    name: String,
    category: Category,
    params: Vec<Param>,
    return_type: Option<ShaderType>,
    body: Body,
    dependencies: BTreeSet<String>,
}

impl FunctionDef {
    fn with_category(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            params: Vec::new(),
            return_type: None,
            body: Body::Template(String::new()),
            dependencies: BTreeSet::new(),
        }
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        Self::with_category(name, Category::Primitive)
    }

    pub fn combinator(name: impl Into<String>) -> Self {
        Self::with_category(name, Category::Combinator)
    }

    pub fn operator(name: impl Into<String>) -> Self {
        Self::with_category(name, Category::Operator)
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self::with_category(name, Category::Function)
    }

    /// An object whose body is produced by `build`
    ///
    /// The position and result parameters are implicit; declare only the
    /// extra ones with [`FunctionDef::param`].
    pub fn object(
        name: impl Into<String>,
        build: impl Fn(&mut ObjectBuilder, &[Expr]) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let object = ObjectDef::new(name.clone(), build);
        Self {
            body: Body::Object(Arc::new(object)),
            ..Self::with_category(name, Category::Object)
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: ShaderType) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    pub fn returns(mut self, ty: ShaderType) -> Self {
        self.return_type = Some(ty);
        self
    }

    /// Body text, embedded verbatim into the emitted definition
    pub fn body(mut self, text: impl Into<String>) -> Self {
        self.body = Body::Template(text.into());
        self
    }

    /// Declare a function the body calls
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.insert(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Declared parameters, excluding an object's implicit ones
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Parameters as they appear in the emitted signature
    pub fn signature_params(&self) -> Vec<Param> {
        let mut params = Vec::with_capacity(self.params.len() + 2);
        if self.category == Category::Object {
            params.push(Param::new(POSITION_VAR, ShaderType::Vec3));
            params.push(Param::new(RESULT_VAR, ShaderType::Scalar));
        }
        params.extend(self.params.iter().cloned());
        params
    }

    /// Declared return type, falling back to the category default
    pub fn return_type(&self) -> Option<ShaderType> {
        self.return_type.or_else(|| self.category.default_return())
    }

    pub fn object_def(&self) -> Option<&ObjectDef> {
        match &self.body {
            Body::Object(object) => Some(object),
            Body::Template(_) => None,
        }
    }

    /// Names this definition needs emitted before it
    ///
    /// For objects this runs the builder on first use.
    pub fn dependencies(&self) -> Result<BTreeSet<String>> {
        match &self.body {
            Body::Template(_) => Ok(self.dependencies.clone()),
            Body::Object(object) => {
                let mut names = object.dependencies(&self.params)?;
                names.extend(self.dependencies.iter().cloned());
                Ok(names)
            }
        }
    }

    /// Body text without the surrounding signature
    pub fn body_text(&self) -> Result<String> {
        match &self.body {
            Body::Template(text) => Ok(dedent(text)),
            Body::Object(object) => object.body(&self.params),
        }
    }

    /// The full definition: `returnType name(params)` and a braced body
    pub fn render(&self) -> Result<String> {
        let return_type = self
            .return_type()
            .ok_or_else(|| Error::MissingReturnType(self.name.clone()))?;
        let params = self
            .signature_params()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        let mut code = format!("{} {}({})\n{{\n", return_type, self.name, params);
        for line in self.body_text()?.lines() {
            if line.is_empty() {
                code.push('\n');
            } else {
                code.push_str("    ");
                code.push_str(line);
                code.push('\n');
            }
        }
        code.push('}');
        Ok(code)
    }

    fn validate(&self) -> Result<()> {
        check_identifier(&self.name)?;
        let mut seen = HashSet::new();
        for param in self.signature_params() {
            check_identifier(&param.name)?;
            if !seen.insert(param.name.clone()) {
                return Err(Error::DuplicateParam {
                    name: self.name.clone(),
                    param: param.name,
                });
            }
        }
        for dependency in &self.dependencies {
            check_identifier(dependency)?;
        }
        if self.return_type().is_none() {
            return Err(Error::MissingReturnType(self.name.clone()));
        }

        let invalid = |reason: &str| Error::InvalidBody {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        match (&self.body, self.category) {
            (Body::Object(_), Category::Object) => Ok(()),
            (Body::Object(_), _) => Err(invalid("only objects can have a builder")),
            (Body::Template(_), Category::Object) => {
                Err(invalid("objects take their body from a builder"))
            }
            (Body::Template(text), _) => {
                if text.trim().is_empty() {
                    return Err(invalid("body is empty"));
                }
                let mut depth = 0usize;
                for c in text.chars() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth = depth
                                .checked_sub(1)
                                .ok_or_else(|| invalid("unbalanced braces"))?;
                        }
                        _ => {}
                    }
                }
                if depth == 0 {
                    Ok(())
                } else {
                    Err(invalid("unbalanced braces"))
                }
            }
        }
    }
}

/// Strip surrounding blank lines and common leading indentation
fn dedent(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    while lines.first().is_some_and(|line| line.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| line.get(indent..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Holds every registered function by name
#[derive(Debug, Default)]
pub struct Registry {
    defs: HashMap<String, FunctionDef>,
    sealed: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition and return a handle to it
    pub fn register(&mut self, def: FunctionDef) -> Result<FnRef> {
        if self.sealed {
            return Err(Error::RegistrySealed(def.name));
        }
        if self.contains(&def.name) {
            return Err(Error::DuplicateName(def.name));
        }
        def.validate()?;

        debug!(name = %def.name, category = %def.category, "registered function");
        let handle = FnRef {
            name: Arc::from(def.name.as_str()),
            category: def.category,
        };
        self.defs.insert(def.name.clone(), def);
        Ok(handle)
    }

    pub fn lookup(&self, name: &str) -> Result<&FunctionDef> {
        self.defs
            .get(name)
            .ok_or_else(|| Error::UnknownName(name.to_string()))
    }

    /// A handle to an already registered function
    pub fn handle(&self, name: &str) -> Result<FnRef> {
        let def = self.lookup(name)?;
        Ok(FnRef {
            name: Arc::from(def.name.as_str()),
            category: def.category,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.defs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Close registration; the registry is read-only afterwards
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Run every object builder now instead of on first use
    pub fn evaluate_objects(&self) -> Result<()> {
        for name in self.names() {
            let def = self.lookup(name)?;
            if let Some(object) = def.object_def() {
                object.evaluate(def.params())?;
            }
        }
        Ok(())
    }
}

static GLOBAL: LazyLock<RwLock<Registry>> = LazyLock::new(|| RwLock::new(Registry::new()));

/// The process-wide registry
///
/// Register under the write lock during start-up, seal it, then compile under
/// read locks.
pub fn global() -> &'static RwLock<Registry> {
    &GLOBAL
}
