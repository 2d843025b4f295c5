//! Expression and call trees
//!
//! Calls are built symbolically: nothing here touches the registry. A call to a
//! primitive or operator stays *partial* until it is applied to a point with
//! [`Call::with_transform`]; only then can it be emitted as shader text.
//!
//! Transform composition is prepend-before-existing: the transform passed to
//! `with_transform` ends up closest to the raw point, and whatever transform
//! the call already carried is evaluated after it.

use std::collections::BTreeSet;
use std::fmt::Write;
use std::ops::Mul;
use std::sync::Arc;

use crate::registry::Category;
use crate::types::fmt_float;
use crate::{Error, Result};

/// Name of the operator used to realise a pending [`Call::at`] offset
pub const TRANSLATE_OPERATOR: &str = "Translate";

/// Name of the position variable inside object bodies
pub const POSITION_VAR: &str = "p";

/// Name of the running result variable inside object bodies
pub const RESULT_VAR: &str = "res";

/// An argument expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A float literal
    Float(f32),
    /// A `vecN(...)` constructor, one component per entry
    Vector(Vec<Expr>),
    /// A variable name or raw expression text, emitted verbatim
    Var(String),
    /// A nested call
    Call(Call),
}

/// Build a `vec2` expression
pub fn vec2(x: impl Into<Expr>, y: impl Into<Expr>) -> Expr {
    Expr::Vector(vec![x.into(), y.into()])
}

/// Build a `vec3` expression
pub fn vec3(x: impl Into<Expr>, y: impl Into<Expr>, z: impl Into<Expr>) -> Expr {
    Expr::Vector(vec![x.into(), y.into(), z.into()])
}

/// A variable or raw expression inserted verbatim
pub fn var(text: impl Into<String>) -> Expr {
    Expr::Var(text.into())
}

impl Expr {
    /// Apply this expression to a point, composing with any pending transform
    ///
    /// Variables and literals are already resolved and come back unchanged.
    pub fn with_transform(&self, transform: &Expr) -> Expr {
        match self {
            Expr::Call(call) => Expr::Call(call.with_transform(transform.clone())),
            other => other.clone(),
        }
    }

    fn at(&self, location: &Expr) -> Expr {
        match self {
            Expr::Call(call) => Expr::Call(call.at(location.clone())),
            other => other.clone(),
        }
    }

    /// Names of every function this expression calls
    pub fn usage(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_usage(&mut names);
        names
    }

    fn collect_usage(&self, names: &mut BTreeSet<String>) {
        match self {
            Expr::Call(call) => call.collect_usage(names),
            Expr::Vector(components) => {
                for component in components {
                    component.collect_usage(names);
                }
            }
            Expr::Float(_) | Expr::Var(_) => {}
        }
    }

    /// Render as shader text
    pub fn emit(&self) -> Result<String> {
        let mut out = String::new();
        self.emit_into(&mut out)?;
        Ok(out)
    }

    fn emit_into(&self, out: &mut String) -> Result<()> {
        match self {
            Expr::Float(value) => out.push_str(&fmt_float(*value)),
            Expr::Vector(components) => {
                write!(out, "vec{}(", components.len())?;
                for (i, component) in components.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    component.emit_into(out)?;
                }
                out.push(')');
            }
            Expr::Var(text) => out.push_str(text),
            Expr::Call(call) => call.emit_into(out)?,
        }
        Ok(())
    }
}

impl From<f32> for Expr {
    fn from(value: f32) -> Self {
        Expr::Float(value)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Float(value as f32)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::Float(value as f32)
    }
}

impl From<&str> for Expr {
    fn from(text: &str) -> Self {
        Expr::Var(text.to_string())
    }
}

impl From<Call> for Expr {
    fn from(call: Call) -> Self {
        Expr::Call(call)
    }
}

/// Whether a leaf call targets a primitive or an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Primitive,
    Object,
}

/// An invocation of a registered function
///
/// Calls are immutable values; every combinator returns a new call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// A generic invocation with no point semantics of its own
    Plain { name: Arc<str>, args: Vec<Expr> },
    /// A distance function of a point: a primitive or an object
    Primitive {
        name: Arc<str>,
        kind: LeafKind,
        args: Vec<Expr>,
        offset: Option<Arc<Expr>>,
        transform: Option<Arc<Expr>>,
    },
    /// Combines distances; point handling distributes into its arguments
    Combinator { name: Arc<str>, args: Vec<Expr> },
    /// Maps a point to a new point
    Operator {
        name: Arc<str>,
        args: Vec<Expr>,
        transform: Option<Arc<Expr>>,
    },
}

impl Call {
    pub(crate) fn new(name: Arc<str>, category: Category, args: Vec<Expr>) -> Self {
        match category {
            Category::Function => Call::Plain { name, args },
            Category::Primitive | Category::Object => Call::Primitive {
                name,
                kind: if category == Category::Object {
                    LeafKind::Object
                } else {
                    LeafKind::Primitive
                },
                args,
                offset: None,
                transform: None,
            },
            Category::Combinator => Call::Combinator { name, args },
            Category::Operator => Call::Operator {
                name,
                args,
                transform: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Call::Plain { name, .. }
            | Call::Primitive { name, .. }
            | Call::Combinator { name, .. }
            | Call::Operator { name, .. } => name,
        }
    }

    /// Explicit arguments, excluding the point and result arguments
    pub fn args(&self) -> &[Expr] {
        match self {
            Call::Plain { args, .. }
            | Call::Primitive { args, .. }
            | Call::Combinator { args, .. }
            | Call::Operator { args, .. } => args,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Call::Plain { .. } => Category::Function,
            Call::Primitive {
                kind: LeafKind::Primitive,
                ..
            } => Category::Primitive,
            Call::Primitive {
                kind: LeafKind::Object,
                ..
            } => Category::Object,
            Call::Combinator { .. } => Category::Combinator,
            Call::Operator { .. } => Category::Operator,
        }
    }

    /// Place this call at `location`
    ///
    /// Replaces any previous offset; combinators push the offset into every
    /// argument. Operators and plain calls have no position and are returned
    /// unchanged.
    pub fn at(&self, location: impl Into<Expr>) -> Call {
        let location = location.into();
        match self {
            Call::Primitive {
                name,
                kind,
                args,
                transform,
                ..
            } => Call::Primitive {
                name: name.clone(),
                kind: *kind,
                args: args.clone(),
                offset: Some(Arc::new(location)),
                transform: transform.clone(),
            },
            Call::Combinator { name, args } => Call::Combinator {
                name: name.clone(),
                args: args.iter().map(|arg| arg.at(&location)).collect(),
            },
            Call::Plain { .. } | Call::Operator { .. } => self.clone(),
        }
    }

    /// Apply `transform` before any transform this call already carries
    ///
    /// With no pending transform, `transform` becomes it. A transform that is
    /// a point variable resolves the call.
    pub fn with_transform(&self, transform: impl Into<Expr>) -> Call {
        let transform = transform.into();
        let compose = |existing: &Option<Arc<Expr>>| {
            Some(Arc::new(match existing.as_deref() {
                None => transform.clone(),
                Some(existing) => existing.with_transform(&transform),
            }))
        };
        match self {
            Call::Primitive {
                name,
                kind,
                args,
                offset,
                transform: existing,
            } => Call::Primitive {
                name: name.clone(),
                kind: *kind,
                args: args.clone(),
                offset: offset.clone(),
                transform: compose(existing),
            },
            Call::Operator {
                name,
                args,
                transform: existing,
            } => Call::Operator {
                name: name.clone(),
                args: args.clone(),
                transform: compose(existing),
            },
            Call::Combinator { name, args } => Call::Combinator {
                name: name.clone(),
                args: args.iter().map(|arg| arg.with_transform(&transform)).collect(),
            },
            Call::Plain { .. } => self.clone(),
        }
    }

    /// Resolve against `point` and render as shader text
    pub fn render(&self, point: impl Into<Expr>) -> Result<String> {
        self.with_transform(point).emit()
    }

    /// Every function name this call references, including its own
    pub fn usage(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_usage(&mut names);
        names
    }

    fn collect_usage(&self, names: &mut BTreeSet<String>) {
        names.insert(self.name().to_string());
        for arg in self.args() {
            arg.collect_usage(names);
        }
        match self {
            Call::Primitive {
                offset, transform, ..
            } => {
                if let Some(offset) = offset {
                    names.insert(TRANSLATE_OPERATOR.to_string());
                    offset.collect_usage(names);
                }
                if let Some(transform) = transform {
                    transform.collect_usage(names);
                }
            }
            Call::Operator {
                transform: Some(transform),
                ..
            } => transform.collect_usage(names),
            _ => {}
        }
    }

    /// Render as shader text, failing if any part is still partial
    pub fn emit(&self) -> Result<String> {
        let mut out = String::new();
        self.emit_into(&mut out)?;
        Ok(out)
    }

    fn emit_into(&self, out: &mut String) -> Result<()> {
        let mut leading = Vec::new();
        match self {
            Call::Plain { .. } | Call::Combinator { .. } => {}
            Call::Operator { transform, .. } => {
                leading.push(self.resolved_point(transform)?);
            }
            Call::Primitive {
                kind,
                offset,
                transform,
                ..
            } => {
                let point = self.resolved_point(transform)?;
                let point = match offset {
                    Some(location) => translate_innermost(&point, location)?,
                    None => point,
                };
                leading.push(point);
                if *kind == LeafKind::Object {
                    leading.push(Expr::Var(RESULT_VAR.to_string()));
                }
            }
        }

        out.push_str(self.name());
        out.push('(');
        for (i, arg) in leading.iter().chain(self.args()).enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            arg.emit_into(out)?;
        }
        out.push(')');
        Ok(())
    }

    /// The point this call is evaluated at; only operators may produce one
    fn resolved_point(&self, transform: &Option<Arc<Expr>>) -> Result<Expr> {
        let point = transform
            .as_deref()
            .cloned()
            .ok_or_else(|| Error::PartialCompilation {
                name: self.name().to_string(),
                reason: "has no point to evaluate at".to_string(),
            })?;
        if let Expr::Call(call) = &point {
            call.expect_operator()?;
        }
        Ok(point)
    }

    fn expect_operator(&self) -> Result<()> {
        match self {
            Call::Operator { .. } => Ok(()),
            _ => Err(Error::WrongCategory {
                name: self.name().to_string(),
                expected: Category::Operator,
                found: self.category(),
            }),
        }
    }
}

/// Wrap the raw point at the bottom of an operator chain in a translation
fn translate_innermost(point: &Expr, location: &Expr) -> Result<Expr> {
    match point {
        Expr::Call(Call::Operator {
            name,
            args,
            transform,
        }) => {
            let inner = transform.as_deref().ok_or_else(|| Error::PartialCompilation {
                name: name.to_string(),
                reason: "has no point to evaluate at".to_string(),
            })?;
            Ok(Expr::Call(Call::Operator {
                name: name.clone(),
                args: args.clone(),
                transform: Some(Arc::new(translate_innermost(inner, location)?)),
            }))
        }
        raw => Ok(Expr::Call(Call::Operator {
            name: Arc::from(TRANSLATE_OPERATOR),
            args: vec![location.clone()],
            transform: Some(Arc::new(raw.clone())),
        })),
    }
}

/// `a * b` is `b` with `a` as its innermost transform, rendering as `b(a(p))`
///
/// `a` must be an operator call. Anything else is a value rather than a
/// point, and emitting the result fails with [`Error::WrongCategory`].
impl Mul for Call {
    type Output = Call;

    fn mul(self, rhs: Call) -> Call {
        rhs.with_transform(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn primitive(name: &str, args: Vec<Expr>) -> Call {
        Call::new(Arc::from(name), Category::Primitive, args)
    }

    fn operator(name: &str, args: Vec<Expr>) -> Call {
        Call::new(Arc::from(name), Category::Operator, args)
    }

    fn combinator(name: &str, args: Vec<Expr>) -> Call {
        Call::new(Arc::from(name), Category::Combinator, args)
    }

    #[test]
    fn test_primitive_render() {
        let sphere = primitive("Sphere", vec![2.0.into()]);
        assert_eq!(sphere.render(var("p")).unwrap(), "Sphere(p, 2.0)");
    }

    #[test]
    fn test_partial_primitive_fails() {
        let sphere = primitive("Sphere", vec![2.0.into()]);
        assert!(matches!(
            sphere.emit(),
            Err(Error::PartialCompilation { name, .. }) if name == "Sphere"
        ));
    }

    #[test]
    fn test_at_wraps_once_in_translate() {
        let sphere = primitive("Sphere", vec![0.5.into()]).at(vec3(1, 2, 3));
        assert_eq!(
            sphere.render(var("p")).unwrap(),
            "Sphere(Translate(p, vec3(1.0, 2.0, 3.0)), 0.5)"
        );
    }

    #[test]
    fn test_at_last_writer_wins() {
        let sphere = primitive("Sphere", vec![0.5.into()])
            .at(vec3(1, 1, 1))
            .at(vec3(2, 2, 2));
        let text = sphere.render(var("p")).unwrap();
        assert_eq!(text, "Sphere(Translate(p, vec3(2.0, 2.0, 2.0)), 0.5)");
        assert_eq!(text.matches("Translate").count(), 1);
    }

    #[test]
    fn test_offset_is_innermost() {
        let sphere = primitive("Sphere", vec![0.5.into()])
            .with_transform(operator("Mirror", vec![]))
            .at(vec3(1, 0, 0));
        assert_eq!(
            sphere.render(var("p")).unwrap(),
            "Sphere(Mirror(Translate(p, vec3(1.0, 0.0, 0.0))), 0.5)"
        );
    }

    #[test]
    fn test_composition_order() {
        let a = operator("Translate", vec![var("a")]);
        let b = operator("Translate", vec![var("b")]);
        let c = operator("Translate", vec![var("c")]);
        let chained = a * b * c;
        assert_eq!(
            chained.render(var("p")).unwrap(),
            "Translate(Translate(Translate(p, a), b), c)"
        );
    }

    #[test]
    fn test_only_operators_transform() {
        let sphere = primitive("Sphere", vec![1.0.into()]);
        let mirrored = sphere * operator("Mirror", vec![]);
        assert!(matches!(
            mirrored.render(var("p")),
            Err(Error::WrongCategory { name, expected: Category::Operator, .. }) if name == "Sphere"
        ));

        let placed = operator("Mirror", vec![]).with_transform(primitive("Box", vec![var("b")]));
        let shape = primitive("Sphere", vec![1.0.into()]).with_transform(placed);
        assert!(matches!(
            shape.render(var("p")),
            Err(Error::WrongCategory { name, .. }) if name == "Box"
        ));
    }

    #[test]
    fn test_new_transform_applies_before_existing() {
        let sphere = primitive("Sphere", vec![1.0.into()])
            .with_transform(operator("Repeat", vec![var("c")]))
            .with_transform(operator("Mirror", vec![]));
        assert_eq!(
            sphere.render(var("p")).unwrap(),
            "Sphere(Repeat(Mirror(p), c), 1.0)"
        );
    }

    #[test]
    fn test_combinator_distributes() {
        let union = combinator(
            "Union",
            vec![
                primitive("Sphere", vec![1.0.into()]).into(),
                primitive("Sphere", vec![3.0.into()]).into(),
            ],
        )
        .at(vec3(1, 2, 3));
        assert_eq!(
            union.render(var("p")).unwrap(),
            "Union(Sphere(Translate(p, vec3(1.0, 2.0, 3.0)), 1.0), \
             Sphere(Translate(p, vec3(1.0, 2.0, 3.0)), 3.0))"
        );
    }

    #[test]
    fn test_object_call_passes_result() {
        let object = Call::new(Arc::from("MyObject"), Category::Object, vec![0.5.into()]);
        assert_eq!(object.render(var("p")).unwrap(), "MyObject(p, res, 0.5)");
    }

    #[test]
    fn test_plain_call_keeps_partial_args() {
        let plain = Call::new(
            Arc::from("helper"),
            Category::Function,
            vec![primitive("Sphere", vec![1.0.into()]).into()],
        );
        assert!(matches!(
            plain.render(var("p")),
            Err(Error::PartialCompilation { .. })
        ));
    }

    #[test]
    fn test_usage_without_call_args() {
        let sphere = primitive("Sphere", vec![2.0.into()]);
        assert_eq!(sphere.usage(), BTreeSet::from(["Sphere".to_string()]));
    }

    #[test]
    fn test_usage_unions_args() {
        let inner = combinator(
            "Intersect",
            vec![
                primitive("Sphere", vec![1.0.into()]).into(),
                primitive("Box", vec![vec3(1, 1, 1)]).into(),
            ],
        );
        let outer = combinator("Union", vec![var("res"), inner.clone().into()]);
        let mut expected = inner.usage();
        expected.insert("Union".to_string());
        assert_eq!(outer.usage(), expected);
        assert_eq!(expected.len(), 4);
    }

    #[test]
    fn test_usage_includes_offset_translate() {
        let sphere = primitive("Sphere", vec![2.0.into()]).at(vec3(0, 1, 0));
        assert!(sphere.usage().contains(TRANSLATE_OPERATOR));
    }
}
