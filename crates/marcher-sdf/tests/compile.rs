//! Integration tests for registry to program compilation

// Tests are allowed to use expect/unwrap for cleaner error messages
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use marcher_sdf::{
    Error, FunctionDef, GlslEmitter, Registry, ShaderConfig, ShaderType, Template,
    compile_to_file, compile_to_text, global, stdlib, vec2, vec3,
};

/// Template holding nothing but the two markers
fn bare_emitter() -> GlslEmitter {
    GlslEmitter::with_template(Template::new("// [macros]\n// [functions]\n").unwrap())
}

#[test]
fn sphere_scene_round_trip() {
    let mut registry = Registry::new();
    let lib = stdlib::register(&mut registry).unwrap();
    let scene = registry
        .register(FunctionDef::object("Scene", move |obj, _| {
            obj.accumulate_result(&lib.union, [lib.sphere.call([2.0.into()]).into()])
        }))
        .unwrap();

    let program = bare_emitter()
        .emit(&registry, &scene, &ShaderConfig::empty())
        .expect("Scene should compile");

    assert_eq!(
        program,
        "#define DE(p) Scene(p, 1e20)\n\
         float Sphere(vec3 p, float r)\n{\n    return length(p) - r;\n}\n\n\
         float Union(float d1, float d2)\n{\n    return min(d1, d2);\n}\n\n\
         float Scene(vec3 p, float res)\n{\n    res = Union(res, Sphere(p, 2.0));\n    return res;\n}\n"
    );
}

#[test]
fn default_template_program() {
    let mut registry = Registry::new();
    let lib = stdlib::register(&mut registry).unwrap();
    let scene = registry
        .register(FunctionDef::object("Scene", move |obj, _| {
            obj.accumulate_result(&lib.union, [lib.box_.call([vec3(1, 1, 1)]).into()])?;
            obj.accumulate_result(
                &lib.subtract,
                [lib.cylinder_y.call([vec2(0.5, 2)]).into()],
            )
        }))
        .unwrap();

    let program = compile_to_text(&registry, &scene, &ShaderConfig::default()).unwrap();

    assert!(program.starts_with("#version 330 core"));
    assert!(program.contains("#define MAX_STEPS 100\n"));
    assert!(program.contains("#define DE(p) Scene(p, 1e20)"));
    assert!(!program.contains("// [macros]"));
    assert!(!program.contains("// [functions]"));

    let at = |needle: &str| program.find(needle).expect(needle);
    assert!(at("float CappedCylinder(") < at("float CylinderY("));
    assert!(at("float CylinderY(") < at("float Scene("));
    assert!(at("float Box(") < at("float Scene("));
    assert!(at("float Scene(") < at("float march("));
    // Unused library functions stay out
    assert!(!program.contains("float Torus("));
    assert!(!program.contains("vec3 Mirror("));
}

#[test]
fn compile_is_idempotent() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();

    let mut registry = Registry::new();
    let lib = stdlib::register(&mut registry).unwrap();
    let scene = registry
        .register(FunctionDef::object("Scene", move |obj, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            obj.accumulate_transform(&lib.mirror, [])?;
            obj.accumulate_result(&lib.union, [lib.sphere.call([1.0.into()]).into()])
        }))
        .unwrap();

    let config = ShaderConfig::default();
    let first = compile_to_text(&registry, &scene, &config).unwrap();
    let second = compile_to_text(&registry, &scene, &config).unwrap();

    assert_eq!(first, second);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_object_returns_result() {
    let mut registry = Registry::new();
    let scene = registry
        .register(FunctionDef::object("Nothing", |_, _| Ok(())))
        .unwrap();

    let program = bare_emitter()
        .emit(&registry, &scene, &ShaderConfig::empty())
        .unwrap();
    assert!(program.contains("float Nothing(vec3 p, float res)\n{\n    return res;\n}"));
}

#[test]
fn nested_objects_share_result() {
    let mut registry = Registry::new();
    let lib = stdlib::register(&mut registry).unwrap();

    let inner_lib = lib.clone();
    let inner = registry
        .register(FunctionDef::object("Inner", move |obj, _| {
            obj.accumulate_result(&inner_lib.union, [inner_lib.sphere.call([0.5.into()]).into()])
        }))
        .unwrap();
    let outer = registry
        .register(FunctionDef::object("Outer", move |obj, _| {
            obj.accumulate_result(&lib.union, [inner.call([]).at(vec3(1, 0, 0)).into()])
        }))
        .unwrap();

    let program = bare_emitter()
        .emit(&registry, &outer, &ShaderConfig::empty())
        .unwrap();

    assert!(program.contains("res = Union(res, Inner(Translate(p, vec3(1.0, 0.0, 0.0)), res));"));
    let at = |needle: &str| program.find(needle).expect(needle);
    assert!(at("float Inner(") < at("float Outer("));
    assert!(at("vec3 Translate(") < at("float Outer("));
    assert!(at("float Sphere(") < at("float Inner("));
}

#[test]
fn parameterised_object_is_called_with_arguments() {
    let mut registry = Registry::new();
    let lib = stdlib::register(&mut registry).unwrap();

    let ball_lib = lib.clone();
    let ball = registry
        .register(
            FunctionDef::object("Ball", move |obj, params| {
                obj.accumulate_result(&ball_lib.union, [ball_lib.sphere.call([params[0].clone()]).into()])
            })
            .param("radius", ShaderType::Scalar),
        )
        .unwrap();
    let scene = registry
        .register(FunctionDef::object("Scene", move |obj, _| {
            obj.accumulate_result(&lib.union, [ball.call([1.5.into()]).into()])
        }))
        .unwrap();

    let program = bare_emitter()
        .emit(&registry, &scene, &ShaderConfig::empty())
        .unwrap();
    assert!(program.contains("float Ball(vec3 p, float res, float radius)"));
    assert!(program.contains("res = Union(res, Sphere(p, radius));"));
    assert!(program.contains("res = Union(res, Ball(p, res, 1.5));"));
}

#[test]
fn composed_operators_apply_in_order() {
    let mut registry = Registry::new();
    let lib = stdlib::register(&mut registry).unwrap();
    let scene = registry
        .register(FunctionDef::object("Scene", move |obj, _| {
            let shape = lib.mirror.call([]) * lib.sphere.call([1.0.into()]).at(vec3(1, 0, 0));
            obj.accumulate_result(&lib.union, [shape.into()])
        }))
        .unwrap();

    let program = bare_emitter()
        .emit(&registry, &scene, &ShaderConfig::empty())
        .unwrap();
    assert!(program.contains(
        "res = Union(res, Sphere(Mirror(Translate(p, vec3(1.0, 0.0, 0.0))), 1.0));"
    ));
}

#[test]
fn cycle_between_objects() {
    // `A` can't hold a handle to `B` before `B` exists, so it declares it
    let mut registry = Registry::new();
    let lib = stdlib::register(&mut registry).unwrap();
    registry
        .register(FunctionDef::object("A", |_, _| Ok(())).depends_on("B"))
        .unwrap();
    let a = registry.handle("A").unwrap();
    registry
        .register(FunctionDef::object("B", move |obj, _| {
            obj.accumulate_result(&lib.union, [a.call([]).into()])
        }))
        .unwrap();
    let root = registry.handle("A").unwrap();

    match compile_to_text(&registry, &root, &ShaderConfig::default()) {
        Err(Error::Cycle { cycle }) => assert_eq!(cycle, ["A", "B", "A"]),
        other => panic!("expected a cycle, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn unknown_name_fails() {
    // Handles from another registry resolve to nothing here
    let mut other = Registry::new();
    let lib = stdlib::register(&mut other).unwrap();

    let mut registry = Registry::new();
    let scene = registry
        .register(FunctionDef::object("Scene", move |obj, _| {
            obj.accumulate_result(&lib.union, [lib.sphere.call([1.0.into()]).into()])
        }))
        .unwrap();

    assert!(matches!(
        compile_to_text(&registry, &scene, &ShaderConfig::default()),
        Err(Error::UnknownName(name)) if name == "Sphere"
    ));
}

#[test]
fn unresolved_call_inside_helper_is_partial() {
    let mut registry = Registry::new();
    let lib = stdlib::register(&mut registry).unwrap();
    let scene = registry
        .register(FunctionDef::object("Scene", move |obj, _| {
            let helper = lib
                .capped_cylinder
                .call([lib.sphere.call([1.0.into()]).into(), vec2(1, 1)]);
            obj.accumulate_result(&lib.union, [helper.into()])
        }))
        .unwrap();

    assert!(matches!(
        compile_to_text(&registry, &scene, &ShaderConfig::default()),
        Err(Error::PartialCompilation { name, .. }) if name == "Sphere"
    ));
}

#[test]
fn compile_writes_file() {
    let mut registry = Registry::new();
    let lib = stdlib::register(&mut registry).unwrap();
    let scene = registry
        .register(FunctionDef::object("Scene", move |obj, _| {
            obj.accumulate_result(&lib.union, [lib.plane.call([]).into()])
        }))
        .unwrap();

    let path = std::env::temp_dir().join("marcher_test_compile.glsl");
    compile_to_file(&registry, &scene, &ShaderConfig::default(), &path)
        .expect("Program should be written");

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        written,
        compile_to_text(&registry, &scene, &ShaderConfig::default()).unwrap()
    );

    // Clean up
    std::fs::remove_file(&path).ok();
}

#[test]
fn global_registry_lifecycle() {
    let scene = {
        let mut registry = global().write();
        let lib = stdlib::register(&mut registry).unwrap();
        let scene = registry
            .register(FunctionDef::object("GlobalScene", move |obj, _| {
                obj.accumulate_result(&lib.union, [lib.torus.call([vec2(2, 0.75)]).into()])
            }))
            .unwrap();
        registry.seal();
        scene
    };

    {
        let mut registry = global().write();
        assert!(matches!(
            registry.register(FunctionDef::object("Late", |_, _| Ok(()))),
            Err(Error::RegistrySealed(_))
        ));
    }

    let registry = global().read();
    registry.evaluate_objects().unwrap();
    let program = compile_to_text(&registry, &scene, &ShaderConfig::default()).unwrap();
    assert!(program.contains("res = Union(res, Torus(p, vec2(2.0, 0.75)));"));
}
