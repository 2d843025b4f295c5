//! Scene to GLSL program emitter
//!
//! Sorts every function reachable from a root object, renders the definitions
//! dependencies-first and splices them, along with the configuration macros,
//! into a program template.

use std::path::Path;

use tracing::{debug, info};

use crate::config::ShaderConfig;
use crate::registry::{Category, FnRef, Registry};
use crate::toposort::toposort;
use crate::types::fmt_float;
use crate::{Error, Result};

/// Marker replaced by the `#define` block
pub const MACROS_MARKER: &str = "// [macros]";

/// Marker replaced by the function definitions
pub const FUNCTIONS_MARKER: &str = "// [functions]";

/// Name of the distance-evaluation macro bound to the root object
pub const ROOT_MACRO: &str = "DE";

/// Result value the root starts from, meaning nothing has been hit
pub const NO_HIT: f32 = 1e20;

/// Get the built-in ray-marching template
pub fn get_base_template() -> &'static str {
    include_str!("shaders/raymarch.glsl")
}

/// Program text with one macro marker and one function marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    /// Use custom program text; both markers must appear exactly once
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        for marker in [MACROS_MARKER, FUNCTIONS_MARKER] {
            match source.matches(marker).count() {
                1 => {}
                0 => return Err(Error::Template(format!("missing marker `{}`", marker))),
                n => {
                    return Err(Error::Template(format!(
                        "marker `{}` appears {} times",
                        marker, n
                    )));
                }
            }
        }
        Ok(Self { source })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::new(std::fs::read_to_string(path)?)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute both markers
    ///
    /// Marker positions come from the template alone, so marker text inside
    /// `macros` or `functions` is copied through untouched.
    pub fn render(&self, macros: &str, functions: &str) -> String {
        let mut sections: Vec<(usize, &str, &str)> = [
            (MACROS_MARKER, macros.trim_end()),
            (FUNCTIONS_MARKER, functions.trim_end()),
        ]
        .into_iter()
        .filter_map(|(marker, text)| self.source.find(marker).map(|at| (at, marker, text)))
        .collect();
        sections.sort_by_key(|(at, ..)| *at);

        let mut out = String::with_capacity(self.source.len() + macros.len() + functions.len());
        let mut rest = 0;
        for (at, marker, text) in sections {
            out.push_str(&self.source[rest..at]);
            out.push_str(text);
            rest = at + marker.len();
        }
        out.push_str(&self.source[rest..]);
        out
    }
}

impl Default for Template {
    fn default() -> Self {
        Self {
            source: get_base_template().to_string(),
        }
    }
}

/// Generates complete programs from a registry and a root object
#[derive(Debug, Clone, Default)]
pub struct GlslEmitter {
    template: Template,
}

impl GlslEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(template: Template) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// `#define DE(p) Root(p, 1e20)`
    pub fn root_macro(&self, registry: &Registry, root: &FnRef) -> Result<String> {
        let def = registry.lookup(root.name())?;
        if def.category() != Category::Object {
            return Err(Error::NotAnObject(def.name().to_string()));
        }
        if !def.params().is_empty() {
            return Err(Error::PartialCompilation {
                name: def.name().to_string(),
                reason: "has parameters that the scene root cannot supply".to_string(),
            });
        }
        Ok(format!(
            "#define {}(p) {}(p, {})\n",
            ROOT_MACRO,
            def.name(),
            fmt_float(NO_HIT)
        ))
    }

    /// Every definition reachable from `root`, dependencies first
    pub fn functions(&self, registry: &Registry, root: &FnRef) -> Result<String> {
        let order = toposort(registry, root.name())?;
        let mut definitions = Vec::with_capacity(order.len());
        for name in &order {
            let def = registry.lookup(name)?;
            debug!(name = %name, category = %def.category(), "emitting function");
            definitions.push(def.render()?);
        }
        Ok(definitions.join("\n\n"))
    }

    /// Generate the complete program for `root`
    pub fn emit(&self, registry: &Registry, root: &FnRef, config: &ShaderConfig) -> Result<String> {
        let mut macros = config.macros()?;
        macros.push_str(&self.root_macro(registry, root)?);
        let functions = self.functions(registry, root)?;
        Ok(self.template.render(&macros, &functions))
    }
}

/// Compile `root` with the built-in template
pub fn compile_to_text(registry: &Registry, root: &FnRef, config: &ShaderConfig) -> Result<String> {
    GlslEmitter::new().emit(registry, root, config)
}

/// Compile `root` with the built-in template and write the program to `path`
pub fn compile_to_file(
    registry: &Registry,
    root: &FnRef,
    config: &ShaderConfig,
    path: &Path,
) -> Result<()> {
    let program = compile_to_text(registry, root, config)?;
    std::fs::write(path, &program)?;
    info!(path = %path.display(), bytes = program.len(), "wrote program");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ConfigValue;
    use crate::registry::FunctionDef;
    use crate::stdlib;
    use crate::types::ShaderType;

    #[test]
    fn test_base_template_markers() {
        let template = Template::new(get_base_template()).unwrap();
        assert_eq!(template, Template::default());
        assert!(template.source().contains("DE("));
    }

    #[test]
    fn test_template_validation() {
        assert!(matches!(
            Template::new("// [macros]\nvoid main() {}"),
            Err(Error::Template(_))
        ));
        assert!(matches!(
            Template::new("// [macros]\n// [functions]\n// [functions]"),
            Err(Error::Template(_))
        ));
    }

    #[test]
    fn test_render_ignores_markers_in_content() {
        let template = Template::new("// [macros]\nA\n// [functions]\n").unwrap();
        assert_eq!(
            template.render("#define X 1 // [functions]\n", "float F();"),
            "#define X 1 // [functions]\nA\nfloat F();\n"
        );

        // Markers may come in either order
        let template = Template::new("// [functions]\n// [macros]\n").unwrap();
        assert_eq!(
            template.render("#define Y // [macros]", "float G();"),
            "float G();\n#define Y // [macros]\n"
        );
    }

    #[test]
    fn test_raw_value_with_marker_text() {
        let mut registry = Registry::new();
        let root = registry
            .register(FunctionDef::object("Nothing", |_, _| Ok(())))
            .unwrap();
        let config =
            ShaderConfig::empty().with("NOTE", ConfigValue::Raw("0 // [functions]".into()));

        let emitter = GlslEmitter::with_template(Template::new("// [macros]\n--\n// [functions]\n").unwrap());
        let program = emitter.emit(&registry, &root, &config).unwrap();
        assert_eq!(
            program,
            "#define NOTE 0 // [functions]\n#define DE(p) Nothing(p, 1e20)\n--\n\
             float Nothing(vec3 p, float res)\n{\n    return res;\n}\n"
        );
    }

    #[test]
    fn test_custom_template() {
        let mut registry = Registry::new();
        let lib = stdlib::register(&mut registry).unwrap();
        let root = registry
            .register(FunctionDef::object("Scene", move |obj, _| {
                obj.accumulate_result(&lib.union, [lib.plane.call([]).into()])
            }))
            .unwrap();

        let emitter = GlslEmitter::with_template(Template::new("// [macros]\n--\n// [functions]\n").unwrap());
        let program = emitter
            .emit(&registry, &root, &ShaderConfig::empty().with("MAX_STEPS", 8))
            .unwrap();
        assert_eq!(
            program,
            "#define MAX_STEPS 8\n#define DE(p) Scene(p, 1e20)\n--\n\
             float Plane(vec3 p)\n{\n    return p.y;\n}\n\n\
             float Union(float d1, float d2)\n{\n    return min(d1, d2);\n}\n\n\
             float Scene(vec3 p, float res)\n{\n    res = Union(res, Plane(p));\n    return res;\n}\n"
        );
    }

    #[test]
    fn test_root_must_be_object() {
        let mut registry = Registry::new();
        let lib = stdlib::register(&mut registry).unwrap();
        assert!(matches!(
            compile_to_text(&registry, &lib.sphere, &ShaderConfig::default()),
            Err(Error::NotAnObject(_))
        ));
    }

    #[test]
    fn test_root_with_params_is_partial() {
        let mut registry = Registry::new();
        let root = registry
            .register(FunctionDef::object("Sized", |_, _| Ok(())).param("r", ShaderType::Scalar))
            .unwrap();
        assert!(matches!(
            compile_to_text(&registry, &root, &ShaderConfig::default()),
            Err(Error::PartialCompilation { .. })
        ));
    }
}
