//! Built-in demo scenes
//!
//! Each scene registers its objects into a registry that already holds the
//! standard library and returns the root object to compile.

use marcher_sdf::{Call, Expr, FnRef, FunctionDef, Registry, Result, Stdlib, var, vec2, vec3};

/// A named scene the CLI can compile
pub struct Scene {
    pub name: &'static str,
    pub description: &'static str,
    pub build: fn(&mut Registry, &Stdlib) -> Result<FnRef>,
}

pub const SCENES: &[Scene] = &[
    Scene {
        name: "basic",
        description: "A single sphere",
        build: basic,
    },
    Scene {
        name: "torus",
        description: "A torus in the xy plane",
        build: torus,
    },
    Scene {
        name: "object",
        description: "A grid of drilled rounded boxes built from one object",
        build: object,
    },
    Scene {
        name: "smooth",
        description: "Smooth union, subtraction and intersection side by side",
        build: smooth,
    },
    Scene {
        name: "mirror",
        description: "Spheres reflected into every octant",
        build: mirror,
    },
    Scene {
        name: "infinite",
        description: "A drilled box repeated through all of space",
        build: infinite,
    },
    Scene {
        name: "combinator",
        description: "One combinator tree placed at several positions",
        build: combinator,
    },
    Scene {
        name: "animated",
        description: "A breathing drilled box with orbiting spheres (uses iTime)",
        build: animated,
    },
];

pub fn find(name: &str) -> Option<&'static Scene> {
    SCENES.iter().find(|scene| scene.name == name)
}

fn basic(registry: &mut Registry, lib: &Stdlib) -> Result<FnRef> {
    let lib = lib.clone();
    registry.register(FunctionDef::object("Basic", move |obj, _| {
        obj.accumulate_result(&lib.union, [lib.sphere.call([2.0.into()]).into()])
    }))
}

fn torus(registry: &mut Registry, lib: &Stdlib) -> Result<FnRef> {
    let lib = lib.clone();
    registry.register(FunctionDef::object("Scene", move |obj, _| {
        obj.accumulate_result(&lib.union, [lib.torus.call([vec2(2, 0.75)]).into()])
    }))
}

/// Rounded box with a hole drilled along each axis
fn drilled_box(registry: &mut Registry, lib: &Stdlib, name: &str) -> Result<FnRef> {
    let lib = lib.clone();
    registry.register(FunctionDef::object(name, move |obj, _| {
        obj.accumulate_result(&lib.union, [lib.box_.call([vec3(1, 1, 1)]).into()])?;
        obj.accumulate_result(&lib.intersect, [lib.sphere.call([1.3.into()]).into()])?;
        let hole = vec2(0.5, 2);
        for cylinder in [&lib.cylinder_x, &lib.cylinder_y, &lib.cylinder_z] {
            obj.accumulate_result(&lib.subtract, [cylinder.call([hole.clone()]).into()])?;
        }
        Ok(())
    }))
}

fn object(registry: &mut Registry, lib: &Stdlib) -> Result<FnRef> {
    let piece = drilled_box(registry, lib, "MyObject")?;
    let lib = lib.clone();
    registry.register(FunctionDef::object("MyScene", move |obj, _| {
        for i in -1..=1 {
            for j in -1..=1 {
                let placed = piece.call([]).at(vec3(2 * i, 2 * j, 0));
                obj.accumulate_result(&lib.union, [placed.into()])?;
            }
        }
        Ok(())
    }))
}

fn smooth(registry: &mut Registry, lib: &Stdlib) -> Result<FnRef> {
    let lib = lib.clone();
    registry.register(FunctionDef::object("MyScene", move |obj, _| {
        let k = 0.5;
        let slab = lib.box_.call([vec3(1.4, 0.6, 1.4)]);
        let ball = lib.sphere.call([1.0.into()]).at(vec3(0, 0.7, 0));
        let pair = || -> [Expr; 3] { [slab.clone().into(), ball.clone().into(), k.into()] };

        let step = vec3(3, 0, 0);
        obj.accumulate_transform(&lib.translate, [vec3(-3, 0, 0)])?;
        obj.accumulate_result(&lib.union, [lib.smooth_union.call(pair()).into()])?;
        obj.accumulate_transform(&lib.translate, [step.clone()])?;
        obj.accumulate_result(&lib.union, [lib.smooth_subtract.call(pair()).into()])?;
        obj.accumulate_transform(&lib.translate, [step])?;
        obj.accumulate_result(&lib.union, [lib.smooth_intersect.call(pair()).into()])
    }))
}

fn mirror(registry: &mut Registry, lib: &Stdlib) -> Result<FnRef> {
    let lib = lib.clone();
    registry.register(FunctionDef::object("MyObject", move |obj, _| {
        obj.accumulate_transform(&lib.mirror, [])?;
        for location in [vec3(0.5, 1, 0.5), vec3(1.1, 0, 0.5)] {
            let ball = lib.sphere.call([1.0.into()]).at(location);
            obj.accumulate_result(&lib.union, [ball.into()])?;
        }
        Ok(())
    }))
}

fn infinite(registry: &mut Registry, lib: &Stdlib) -> Result<FnRef> {
    let piece = drilled_box(registry, lib, "MyObject")?;
    let lib = lib.clone();
    registry.register(FunctionDef::object("Infinite", move |obj, _| {
        obj.accumulate_transform(&lib.repeat, [vec3(4.5, 4.5, 4.5)])?;
        obj.accumulate_result(&lib.union, [piece.call([]).into()])
    }))
}

/// A rounded box minus an axis-aligned cross, as one combinator tree
fn cross_cut(lib: &Stdlib) -> Call {
    let shape = vec2(0.5, 2);
    let cross = lib.union.call([
        lib.cylinder_x.call([shape.clone()]).into(),
        lib.union
            .call([
                lib.cylinder_y.call([shape.clone()]).into(),
                lib.cylinder_z.call([shape]).into(),
            ])
            .into(),
    ]);
    let rounded_box = lib.intersect.call([
        lib.box_.call([vec3(1, 1, 1)]).into(),
        lib.sphere.call([1.3.into()]).into(),
    ]);
    lib.subtract.call([rounded_box.into(), cross.into()])
}

fn combinator(registry: &mut Registry, lib: &Stdlib) -> Result<FnRef> {
    let lib = lib.clone();
    registry.register(FunctionDef::object("MyScene", move |obj, _| {
        let shape = cross_cut(&lib);
        for location in [vec3(1, 1, 1), vec3(1, 2, 1.5), vec3(2, 1.5, 1)] {
            obj.accumulate_result(&lib.union, [shape.at(location).into()])?;
        }
        Ok(())
    }))
}

fn animated(registry: &mut Registry, lib: &Stdlib) -> Result<FnRef> {
    let body_lib = lib.clone();
    let body = registry.register(FunctionDef::object("MyObject", move |obj, _| {
        let lib = &body_lib;
        obj.accumulate_result(&lib.union, [lib.box_.call([vec3(1.8, 1.8, 1.8)]).into()])?;
        obj.accumulate_result(&lib.intersect, [lib.sphere.call([2.4.into()]).into()])?;
        let hole = vec2(var("(1.8 - 0.5) * (0.5 + 0.5 * sin(1.7 * iTime)) + 0.6"), 2);
        for cylinder in [&lib.cylinder_x, &lib.cylinder_y, &lib.cylinder_z] {
            obj.accumulate_result(&lib.subtract, [cylinder.call([hole.clone()]).into()])?;
        }
        Ok(())
    }))?;

    let balls_lib = lib.clone();
    let balls = registry.register(FunctionDef::object("Balls", move |obj, _| {
        let lib = &balls_lib;
        let offset = || var("0.4 + 1.0 + sin(1.7 * iTime)");
        obj.accumulate_transform(&lib.mirror, [])?;
        for location in [
            vec3(offset(), 0, 0),
            vec3(0, offset(), 0),
            vec3(0, 0, offset()),
        ] {
            let ball = lib.sphere.call([0.5.into()]).at(location);
            obj.accumulate_result(&lib.union, [ball.into()])?;
        }
        Ok(())
    }))?;

    let lib = lib.clone();
    registry.register(FunctionDef::object("Scene", move |obj, _| {
        obj.accumulate_result(&lib.union, [body.call([]).into()])?;
        obj.accumulate_result(&lib.union, [balls.call([]).into()])
    }))
}
