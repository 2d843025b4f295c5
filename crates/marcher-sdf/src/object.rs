//! Scene objects
//!
//! An object is a function whose body is produced by running a builder
//! routine. The routine appends statements that update two running
//! variables, the position `p` and the result `res`, and records every
//! function those statements use. It runs at most once per object; the first
//! request for the body or the dependency set triggers it.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;

use parking_lot::ReentrantMutex;
use tracing::debug;

use crate::expr::{Call, Expr, POSITION_VAR, RESULT_VAR};
use crate::registry::{Category, FnRef};
use crate::types::Param;
use crate::{Error, Result};

/// Signature of an object builder routine
///
/// The slice holds one placeholder expression per declared parameter.
pub type BuildFn = dyn Fn(&mut ObjectBuilder, &[Expr]) -> Result<()> + Send + Sync;

/// Which running variable a statement assigns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Position,
    Result,
}

impl Target {
    pub fn var_name(self) -> &'static str {
        match self {
            Target::Position => POSITION_VAR,
            Target::Result => RESULT_VAR,
        }
    }
}

/// One `target = value;` line of an object body
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub target: Target,
    pub value: Call,
}

impl Statement {
    pub fn emit(&self) -> Result<String> {
        Ok(format!("{} = {};", self.target.var_name(), self.value.emit()?))
    }
}

/// Accumulates statements while an object's builder runs
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    statements: Vec<Statement>,
    used_names: BTreeSet<String>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The position variable as an expression
    pub fn position() -> Expr {
        Expr::Var(POSITION_VAR.to_string())
    }

    /// The running result variable as an expression
    pub fn result() -> Expr {
        Expr::Var(RESULT_VAR.to_string())
    }

    /// Append `res = combinator(res, args...)` evaluated at the current position
    ///
    /// ```ignore
    /// obj.accumulate_result(&lib.union, [lib.sphere.call([2.0.into()]).into()])?;
    /// // res = Union(res, Sphere(p, 2.0));
    /// ```
    pub fn accumulate_result(
        &mut self,
        combinator: &FnRef,
        args: impl IntoIterator<Item = Expr>,
    ) -> Result<()> {
        combinator.expect_category(Category::Combinator)?;
        let call = combinator
            .call(std::iter::once(Self::result()).chain(args))
            .with_transform(Self::position());
        self.push(Target::Result, call);
        Ok(())
    }

    /// Append `p = operator(p, args...)`
    pub fn accumulate_transform(
        &mut self,
        operator: &FnRef,
        args: impl IntoIterator<Item = Expr>,
    ) -> Result<()> {
        operator.expect_category(Category::Operator)?;
        let call = operator.call(args).with_transform(Self::position());
        self.push(Target::Position, call);
        Ok(())
    }

    /// Append `p = call(p)` for an already constructed operator call
    pub fn accumulate_transform_call(&mut self, call: &Call) -> Result<()> {
        if call.category() != Category::Operator {
            return Err(Error::WrongCategory {
                name: call.name().to_string(),
                expected: Category::Operator,
                found: call.category(),
            });
        }
        self.push(Target::Position, call.with_transform(Self::position()));
        Ok(())
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn used_names(&self) -> &BTreeSet<String> {
        &self.used_names
    }

    fn push(&mut self, target: Target, value: Call) {
        self.used_names.extend(value.usage());
        self.statements.push(Statement { target, value });
    }
}

#[derive(Default)]
struct ObjectState {
    evaluated: bool,
    /// Set while the builder runs
    building: bool,
    statements: Vec<Statement>,
    used_names: BTreeSet<String>,
}

/// The deferred body of a registered object
pub struct ObjectDef {
    name: String,
    build: Box<BuildFn>,
    // Other threads wait for the first run; the running thread may re-enter
    state: ReentrantMutex<RefCell<ObjectState>>,
}

impl ObjectDef {
    pub fn new(
        name: impl Into<String>,
        build: impl Fn(&mut ObjectBuilder, &[Expr]) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            build: Box::new(build),
            state: ReentrantMutex::new(RefCell::new(ObjectState::default())),
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.state.lock().borrow().evaluated
    }

    /// Run the builder if it has not run yet
    ///
    /// `params` are the object's declared parameters; each is passed to the
    /// builder as a variable of the same name. A failed run leaves the object
    /// unevaluated. A builder that needs its own object's body fails with
    /// [`Error::Cycle`].
    pub fn evaluate(&self, params: &[Param]) -> Result<()> {
        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            if state.evaluated {
                return Ok(());
            }
            if state.building {
                return Err(Error::Cycle {
                    cycle: vec![self.name.clone(), self.name.clone()],
                });
            }
            state.building = true;
        }

        let placeholders: Vec<Expr> = params
            .iter()
            .map(|param| Expr::Var(param.name.clone()))
            .collect();
        let mut builder = ObjectBuilder::new();
        let outcome = (self.build)(&mut builder, &placeholders);

        let mut state = guard.borrow_mut();
        state.building = false;
        outcome?;

        debug!(
            object = %self.name,
            statements = builder.statements.len(),
            "evaluated object builder"
        );

        state.statements = builder.statements;
        state.used_names = builder.used_names;
        state.evaluated = true;
        Ok(())
    }

    /// Body text: one line per statement, then `return res;`
    pub fn body(&self, params: &[Param]) -> Result<String> {
        let mut lines = self
            .statements(params)?
            .iter()
            .map(Statement::emit)
            .collect::<Result<Vec<_>>>()?;
        lines.push(format!("return {};", RESULT_VAR));
        Ok(lines.join("\n"))
    }

    /// Every function name used by the body
    pub fn dependencies(&self, params: &[Param]) -> Result<BTreeSet<String>> {
        self.evaluate(params)?;
        Ok(self.state.lock().borrow().used_names.clone())
    }

    pub fn statements(&self, params: &[Param]) -> Result<Vec<Statement>> {
        self.evaluate(params)?;
        Ok(self.state.lock().borrow().statements.clone())
    }
}

impl fmt::Debug for ObjectDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDef")
            .field("name", &self.name)
            .field("evaluated", &self.is_evaluated())
            .finish_non_exhaustive()
    }
}
