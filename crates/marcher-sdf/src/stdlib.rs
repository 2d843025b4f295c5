//! Standard library of distance functions
//!
//! GLSL bodies for the common primitives, boolean combinators (hard and
//! smooth) and point operators. [`register`] adds all of them to a registry
//! and returns their handles.

use crate::Result;
use crate::expr::TRANSLATE_OPERATOR;
use crate::registry::{FnRef, FunctionDef, Registry};
use crate::types::ShaderType::{Scalar, Vec2, Vec3};

const CAPPED_CYLINDER: &str = "CappedCylinder";

/// Handles to every standard-library function
#[derive(Debug, Clone)]
pub struct Stdlib {
    // Primitives
    pub plane: FnRef,
    pub sphere: FnRef,
    pub box_: FnRef,
    pub torus: FnRef,
    pub cylinder_x: FnRef,
    pub cylinder_y: FnRef,
    pub cylinder_z: FnRef,

    // Helpers
    pub capped_cylinder: FnRef,

    // Combinators
    pub union: FnRef,
    pub intersect: FnRef,
    pub subtract: FnRef,
    pub smooth_union: FnRef,
    pub smooth_intersect: FnRef,
    pub smooth_subtract: FnRef,

    // Operators
    pub translate: FnRef,
    pub repeat: FnRef,
    pub mirror: FnRef,
}

/// Register the standard library into `registry`
pub fn register(registry: &mut Registry) -> Result<Stdlib> {
    let capped_cylinder = registry.register(
        FunctionDef::function(CAPPED_CYLINDER)
            .param("p", Vec3)
            .param("h", Vec2)
            .returns(Scalar)
            .body(
                "
                vec2 d = abs(vec2(length(p.xz), p.y)) - h;
                return min(max(d.x, d.y), 0.0) + length(max(d, 0.0));
                ",
            ),
    )?;

    let cylinder = |name: &str, swizzle: &str| {
        FunctionDef::primitive(name)
            .param("p", Vec3)
            .param("h", Vec2)
            .body(format!("return {}(p.{}, h);", CAPPED_CYLINDER, swizzle))
            .depends_on(CAPPED_CYLINDER)
    };

    Ok(Stdlib {
        plane: registry.register(
            FunctionDef::primitive("Plane")
                .param("p", Vec3)
                .body("return p.y;"),
        )?,
        sphere: registry.register(
            FunctionDef::primitive("Sphere")
                .param("p", Vec3)
                .param("r", Scalar)
                .body("return length(p) - r;"),
        )?,
        box_: registry.register(
            FunctionDef::primitive("Box")
                .param("p", Vec3)
                .param("b", Vec3)
                .body(
                    "
                    vec3 d = abs(p) - b;
                    return min(max(d.x, max(d.y, d.z)), 0.0) + length(max(d, 0.0));
                    ",
                ),
        )?,
        // Lies in the xy plane: t.x is the ring radius, t.y the tube radius
        torus: registry.register(
            FunctionDef::primitive("Torus")
                .param("p", Vec3)
                .param("t", Vec2)
                .body(
                    "
                    vec2 q = vec2(length(p.xy) - t.x, p.z);
                    return length(q) - t.y;
                    ",
                ),
        )?,
        // h.x is the radius, h.y the half length along the named axis
        cylinder_x: registry.register(cylinder("CylinderX", "yxz"))?,
        cylinder_y: registry.register(cylinder("CylinderY", "xyz"))?,
        cylinder_z: registry.register(cylinder("CylinderZ", "xzy"))?,
        capped_cylinder,

        union: registry.register(
            FunctionDef::combinator("Union")
                .param("d1", Scalar)
                .param("d2", Scalar)
                .body("return min(d1, d2);"),
        )?,
        intersect: registry.register(
            FunctionDef::combinator("Intersect")
                .param("d1", Scalar)
                .param("d2", Scalar)
                .body("return max(d1, d2);"),
        )?,
        subtract: registry.register(
            FunctionDef::combinator("Subtract")
                .param("d1", Scalar)
                .param("d2", Scalar)
                .body("return max(d1, -d2);"),
        )?,
        smooth_union: registry.register(
            FunctionDef::combinator("SmoothUnion")
                .param("d1", Scalar)
                .param("d2", Scalar)
                .param("k", Scalar)
                .body(
                    "
                    float h = clamp(0.5 + 0.5 * (d2 - d1) / k, 0.0, 1.0);
                    return mix(d2, d1, h) - k * h * (1.0 - h);
                    ",
                ),
        )?,
        smooth_intersect: registry.register(
            FunctionDef::combinator("SmoothIntersect")
                .param("d1", Scalar)
                .param("d2", Scalar)
                .param("k", Scalar)
                .body(
                    "
                    float h = clamp(0.5 - 0.5 * (d2 - d1) / k, 0.0, 1.0);
                    return mix(d2, d1, h) + k * h * (1.0 - h);
                    ",
                ),
        )?,
        // Removes d2 from d1
        smooth_subtract: registry.register(
            FunctionDef::combinator("SmoothSubtract")
                .param("d1", Scalar)
                .param("d2", Scalar)
                .param("k", Scalar)
                .body(
                    "
                    float h = clamp(0.5 - 0.5 * (d1 + d2) / k, 0.0, 1.0);
                    return mix(d1, -d2, h) + k * h * (1.0 - h);
                    ",
                ),
        )?,

        translate: registry.register(
            FunctionDef::operator(TRANSLATE_OPERATOR)
                .param("p", Vec3)
                .param("t", Vec3)
                .body("return p - t;"),
        )?,
        // Tiles space into cells of size c centred on the origin
        repeat: registry.register(
            FunctionDef::operator("Repeat")
                .param("p", Vec3)
                .param("c", Vec3)
                .body("return mod(p + 0.5 * c, c) - 0.5 * c;"),
        )?,
        mirror: registry.register(
            FunctionDef::operator("Mirror")
                .param("p", Vec3)
                .body("return abs(p);"),
        )?,
    })
}
