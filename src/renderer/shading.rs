//! CPU reference of the lighting equations. The WGSL programs in
//! `src/shader/lighting.wgsl` evaluate the same expressions; the software
//! backend and the tests use these functions directly.

use glam::{Mat3, Mat4, Vec3, Vec4};

use super::lights::PackedLights;
use super::material::ShadingModel;
use crate::scene::transform::safe_normalize;
use crate::scene::LightKind;

/// Material parameters consumed by the lighting equations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadingParams {
    pub model: ShadingModel,
    pub shininess: f32,
    pub specular_strength: f32,
}

/// Accumulated light before the base color is applied:
/// `final = base * diffuse + specular`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LightTerms {
    /// Ambient sum plus every light's `color * max(0, N·L)`.
    pub diffuse: Vec3,
    pub specular: Vec3,
}

pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

/// Evaluates ambient, diffuse and (for Phong) specular contributions at one
/// point. `shadow_visibility` scales only the casting light's direct terms.
pub fn light_terms(
    params: &ShadingParams,
    lights: &PackedLights,
    position: Vec3,
    normal: Vec3,
    camera_position: Vec3,
    shadow_visibility: f32,
) -> LightTerms {
    let n = safe_normalize(normal, Vec3::Y);
    let view = safe_normalize(camera_position - position, Vec3::Z);
    let mut terms = LightTerms {
        diffuse: lights.ambient,
        specular: Vec3::ZERO,
    };

    let directional = lights
        .directional
        .iter()
        .enumerate()
        .map(|(i, s)| (LightKind::Directional, i, safe_normalize(-s.vector, Vec3::Z), s.color));
    let point = lights
        .point
        .iter()
        .enumerate()
        .map(|(i, s)| (LightKind::Point, i, safe_normalize(s.vector - position, Vec3::Z), s.color));

    for (kind, index, to_light, color) in directional.chain(point) {
        let visibility = if lights.caster == Some((kind, index)) {
            shadow_visibility
        } else {
            1.0
        };

        let n_dot_l = n.dot(to_light);
        if n_dot_l <= 0.0 {
            continue;
        }
        terms.diffuse += color * n_dot_l * visibility;

        if params.model == ShadingModel::Phong {
            let r = reflect(-to_light, n);
            let spec = r.dot(view).max(0.0).powf(params.shininess);
            terms.specular += color * params.specular_strength * spec * visibility;
        }
    }

    terms
}

pub fn combine(base: Vec3, terms: &LightTerms) -> Vec3 {
    base * terms.diffuse + terms.specular
}

/// Perturbs `normal` with a tangent-space normal read from a bump texture
/// (`sample` in 0..1 per channel). `strength` blends between the geometric
/// normal (0) and the fully mapped normal (1).
pub fn perturb_normal(normal: Vec3, tangent: Vec4, sample: Vec3, strength: f32) -> Vec3 {
    let n = safe_normalize(normal, Vec3::Y);
    let t = safe_normalize(tangent.truncate() - n * n.dot(tangent.truncate()), n.any_orthonormal_vector());
    let handedness = if tangent.w < 0.0 { -1.0 } else { 1.0 };
    let b = n.cross(t) * handedness;
    let tbn = Mat3::from_cols(t, b, n);
    let mapped = tbn * (sample * 2.0 - Vec3::ONE);
    safe_normalize(n + strength * (mapped - n), n)
}

/// Projects a world position into shadow-map space: `xy` texture
/// coordinates (v pointing down) and `z` light-space depth in 0..1.
/// `None` outside the light frustum.
pub fn project_to_shadow_space(light_view_projection: Mat4, world_position: Vec3) -> Option<Vec3> {
    let clip = light_view_projection * world_position.extend(1.0);
    if clip.w <= 1e-6 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 || ndc.z < 0.0 || ndc.z > 1.0 {
        return None;
    }
    Some(Vec3::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5, ndc.z))
}

/// Visibility of the casting light: `1 - strength` when the stored depth is
/// closer than the fragment by more than `bias`, otherwise 1. `stored_depth`
/// reads the shadow map at texture coordinates.
pub fn shadow_visibility(
    light_view_projection: Mat4,
    world_position: Vec3,
    bias: f32,
    strength: f32,
    stored_depth: impl Fn(f32, f32) -> f32,
) -> f32 {
    match project_to_shadow_space(light_view_projection, world_position) {
        Some(p) if p.z > stored_depth(p.x, p.y) + bias => 1.0 - strength,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::lights::LightSlot;

    fn params(model: ShadingModel) -> ShadingParams {
        ShadingParams {
            model,
            shininess: 32.0,
            specular_strength: 1.0,
        }
    }

    fn packed(ambient: Vec3, directional: Vec<LightSlot>, capacity: usize) -> PackedLights {
        let mut directional = directional;
        directional.resize(capacity, LightSlot::default());
        PackedLights {
            ambient,
            directional,
            point: vec![LightSlot::default(); capacity],
            caster: None,
        }
    }

    #[test]
    fn ambient_only_is_ambient_times_base() {
        let base = Vec3::new(0.2, 0.5, 0.5);
        let ambient = Vec3::splat(0.1);
        let lights = packed(ambient, vec![], 3);

        for model in [ShadingModel::Flat, ShadingModel::Lambert, ShadingModel::Phong] {
            let terms = light_terms(&params(model), &lights, Vec3::ONE, Vec3::Y, Vec3::new(0.0, 0.0, 5.0), 1.0);
            assert!(combine(base, &terms).abs_diff_eq(ambient * base, 1e-6));
        }
    }

    #[test]
    fn perpendicular_light_contributes_nothing() {
        let lights = packed(
            Vec3::ZERO,
            vec![LightSlot {
                vector: Vec3::NEG_X,
                color: Vec3::ONE,
            }],
            1,
        );
        let terms = light_terms(
            &params(ShadingModel::Phong),
            &lights,
            Vec3::ZERO,
            Vec3::Y,
            Vec3::new(0.0, 5.0, 5.0),
            1.0,
        );
        assert_eq!(terms, LightTerms::default());
    }

    #[test]
    fn phong_highlight_peaks_on_mirror_direction() {
        let lights = packed(
            Vec3::ZERO,
            vec![LightSlot {
                vector: Vec3::new(1.0, -1.0, 0.0).normalize(),
                color: Vec3::ONE,
            }],
            1,
        );
        let on_mirror = light_terms(
            &params(ShadingModel::Phong),
            &lights,
            Vec3::ZERO,
            Vec3::Y,
            Vec3::new(1.0, 1.0, 0.0),
            1.0,
        );
        assert!(on_mirror.specular.abs_diff_eq(Vec3::ONE, 1e-4));
        assert!((on_mirror.diffuse.x - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);

        let lambert = light_terms(
            &params(ShadingModel::Lambert),
            &lights,
            Vec3::ZERO,
            Vec3::Y,
            Vec3::new(1.0, 1.0, 0.0),
            1.0,
        );
        assert_eq!(lambert.specular, Vec3::ZERO);
    }

    #[test]
    fn point_light_has_no_falloff() {
        let mut lights = packed(Vec3::ZERO, vec![], 1);
        lights.point[0] = LightSlot {
            vector: Vec3::new(0.0, 100.0, 0.0),
            color: Vec3::new(0.9, 0.0, 0.0),
        };
        let terms = light_terms(&params(ShadingModel::Lambert), &lights, Vec3::ZERO, Vec3::Y, Vec3::Z, 1.0);
        assert!(terms.diffuse.abs_diff_eq(Vec3::new(0.9, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn shadow_visibility_scales_only_the_caster() {
        let mut lights = packed(
            Vec3::splat(0.1),
            vec![
                LightSlot { vector: Vec3::NEG_Y, color: Vec3::splat(0.5) },
                LightSlot { vector: Vec3::NEG_Y, color: Vec3::splat(0.3) },
            ],
            2,
        );
        lights.caster = Some((LightKind::Directional, 0));

        let terms = light_terms(&params(ShadingModel::Lambert), &lights, Vec3::ZERO, Vec3::Y, Vec3::Y, 0.0);
        assert!(terms.diffuse.abs_diff_eq(Vec3::splat(0.4), 1e-6));
    }

    #[test]
    fn shadow_compare_uses_bias() {
        let vp = Mat4::orthographic_rh(-5.0, 5.0, -5.0, 5.0, 0.0, 20.0)
            * Mat4::look_at_rh(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, Vec3::Z);
        let p = Vec3::new(1.0, 0.0, 1.0);
        let depth = project_to_shadow_space(vp, p).unwrap().z;
        assert!((depth - 0.5).abs() < 1e-5);

        assert_eq!(shadow_visibility(vp, p, 0.01, 1.0, |_, _| depth), 1.0);
        assert_eq!(shadow_visibility(vp, p, 0.01, 1.0, |_, _| depth - 0.005), 1.0);
        assert_eq!(shadow_visibility(vp, p, 0.01, 1.0, |_, _| depth - 0.1), 0.0);
        assert!((shadow_visibility(vp, p, 0.01, 0.6, |_, _| 0.0) - 0.4).abs() < 1e-6);
        // outside the frustum is lit
        assert_eq!(shadow_visibility(vp, Vec3::new(50.0, 0.0, 0.0), 0.01, 1.0, |_, _| 0.0), 1.0);
    }

    #[test]
    fn shadow_texture_space_flips_v() {
        let vp = Mat4::orthographic_rh(-1.0, 1.0, -1.0, 1.0, 0.0, 2.0);
        let top_left = project_to_shadow_space(vp, Vec3::new(-0.5, 0.5, -1.0)).unwrap();
        assert!(top_left.abs_diff_eq(Vec3::new(0.25, 0.25, 0.5), 1e-6));
    }

    #[test]
    fn flat_bump_sample_keeps_normal() {
        let n = perturb_normal(Vec3::Z, Vec4::new(1.0, 0.0, 0.0, 1.0), Vec3::new(0.5, 0.5, 1.0), 1.0);
        assert!(n.abs_diff_eq(Vec3::Z, 1e-5));

        let tilted = perturb_normal(Vec3::Z, Vec4::new(1.0, 0.0, 0.0, 1.0), Vec3::new(1.0, 0.5, 0.5), 1.0);
        assert!(tilted.abs_diff_eq(Vec3::X, 1e-5));

        let half = perturb_normal(Vec3::Z, Vec4::new(1.0, 0.0, 0.0, 1.0), Vec3::new(1.0, 0.5, 0.5), 0.5);
        assert!(half.abs_diff_eq(Vec3::new(1.0, 0.0, 1.0).normalize(), 1e-5));

        let none = perturb_normal(Vec3::Z, Vec4::new(1.0, 0.0, 0.0, 1.0), Vec3::new(1.0, 0.5, 0.5), 0.0);
        assert!(none.abs_diff_eq(Vec3::Z, 1e-5));
    }
}
