//! Dependency ordering
//!
//! Depth-first walk from a root name over declared dependencies (and, for
//! objects, the names their statements use). The resulting order lists every
//! name after all the names it depends on, so definitions can be emitted in
//! that order.

use std::collections::HashSet;

use tracing::trace;

use crate::registry::Registry;
use crate::{Error, Result};

/// Order the names reachable from `root`, dependencies first
///
/// Fails with [`Error::Cycle`] if a cycle is reachable and with
/// [`Error::UnknownName`] if any reachable name isn't registered.
pub fn toposort(registry: &Registry, root: &str) -> Result<Vec<String>> {
    let mut sorter = Sorter {
        registry,
        visited: HashSet::new(),
        path: Vec::new(),
        order: Vec::new(),
    };
    sorter.visit(root)?;
    Ok(sorter.order)
}

struct Sorter<'a> {
    registry: &'a Registry,
    visited: HashSet<String>,
    /// Names currently being visited, outermost first
    path: Vec<String>,
    order: Vec<String>,
}

impl Sorter<'_> {
    fn visit(&mut self, name: &str) -> Result<()> {
        let def = self.registry.lookup(name)?;
        trace!(name, depth = self.path.len(), "visiting");

        self.visited.insert(name.to_string());
        self.path.push(name.to_string());

        for dependency in def.dependencies()? {
            if let Some(start) = self.path.iter().position(|n| *n == dependency) {
                let mut cycle = self.path[start..].to_vec();
                cycle.push(dependency);
                return Err(Error::Cycle { cycle });
            }
            if !self.visited.contains(&dependency) {
                self.visit(&dependency)?;
            }
        }

        self.path.pop();
        self.order.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::FunctionDef;
    use crate::types::ShaderType;

    fn helper(name: &str, deps: &[&str]) -> FunctionDef {
        deps.iter().fold(
            FunctionDef::function(name)
                .returns(ShaderType::Scalar)
                .body("return 0.0;"),
            |def, dep| def.depends_on(*dep),
        )
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_dependencies_come_first() {
        let mut registry = Registry::new();
        registry.register(helper("a", &["b", "c"])).unwrap();
        registry.register(helper("b", &["d"])).unwrap();
        registry.register(helper("c", &["d"])).unwrap();
        registry.register(helper("d", &[])).unwrap();
        registry.register(helper("unrelated", &[])).unwrap();

        let order = toposort(&registry, "a").unwrap();
        assert_eq!(order.len(), 4);
        assert_eq!(order.last().map(String::as_str), Some("a"));
        assert!(position(&order, "d") < position(&order, "b"));
        assert!(position(&order, "d") < position(&order, "c"));
        assert!(position(&order, "b") < position(&order, "a"));
        assert!(!order.contains(&"unrelated".to_string()));
    }

    #[test]
    fn test_each_name_once() {
        let mut registry = Registry::new();
        registry.register(helper("top", &["left", "right"])).unwrap();
        registry.register(helper("left", &["shared"])).unwrap();
        registry.register(helper("right", &["shared"])).unwrap();
        registry.register(helper("shared", &[])).unwrap();

        let order = toposort(&registry, "top").unwrap();
        assert_eq!(order.iter().filter(|n| *n == "shared").count(), 1);
    }

    #[test]
    fn test_cycle_detected() {
        let mut registry = Registry::new();
        registry.register(helper("a", &["b"])).unwrap();
        registry.register(helper("b", &["c"])).unwrap();
        registry.register(helper("c", &["a"])).unwrap();

        match toposort(&registry, "a") {
            Err(Error::Cycle { cycle }) => assert_eq!(cycle, ["a", "b", "c", "a"]),
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let mut registry = Registry::new();
        registry.register(helper("loop", &["loop"])).unwrap();
        assert!(matches!(
            toposort(&registry, "loop"),
            Err(Error::Cycle { .. })
        ));
    }

    #[test]
    fn test_unknown_dependency() {
        let mut registry = Registry::new();
        registry.register(helper("a", &["ghost"])).unwrap();
        assert!(matches!(
            toposort(&registry, "a"),
            Err(Error::UnknownName(name)) if name == "ghost"
        ));
        assert!(matches!(
            toposort(&registry, "nowhere"),
            Err(Error::UnknownName(_))
        ));
    }
}
