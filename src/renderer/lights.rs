use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use hecs::Entity;

use crate::error::RenderError;
use crate::scene::LightKind;

/// A light as seen at collection time: color plus world-space pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollectedLight {
    pub entity: Entity,
    pub color: Vec3,
    pub position: Vec3,
    /// Normalized -Z axis of the light's global rotation.
    pub direction: Vec3,
}

/// Active lights of one frame, in depth-first scene order per kind.
#[derive(Clone, Debug, Default)]
pub struct LightSet {
    ambient: Vec<CollectedLight>,
    directional: Vec<CollectedLight>,
    point: Vec<CollectedLight>,
}

impl LightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: LightKind, light: CollectedLight) {
        match kind {
            LightKind::Ambient => self.ambient.push(light),
            LightKind::Directional => self.directional.push(light),
            LightKind::Point => self.point.push(light),
        }
    }

    pub fn ambient(&self) -> &[CollectedLight] {
        &self.ambient
    }

    pub fn directional(&self) -> &[CollectedLight] {
        &self.directional
    }

    pub fn point(&self) -> &[CollectedLight] {
        &self.point
    }

    pub fn len(&self) -> usize {
        self.ambient.len() + self.directional.len() + self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of `entity` in the list for `kind`.
    pub fn slot_of(&self, kind: LightKind, entity: Entity) -> Option<usize> {
        let list = match kind {
            LightKind::Ambient => &self.ambient,
            LightKind::Directional => &self.directional,
            LightKind::Point => &self.point,
        };
        list.iter().position(|l| l.entity == entity)
    }

    /// Lays the lights out for a material with `capacity` slots per kind.
    /// Unused slots are zero, so they contribute nothing.
    pub fn pack(
        &self,
        capacity: usize,
        material: &str,
        caster: Option<Entity>,
    ) -> Result<PackedLights, RenderError> {
        for (kind, list) in [
            (LightKind::Ambient, &self.ambient),
            (LightKind::Directional, &self.directional),
            (LightKind::Point, &self.point),
        ] {
            if list.len() > capacity {
                return Err(RenderError::LightCapacityExceeded {
                    material: material.to_string(),
                    kind,
                    active: list.len(),
                    capacity,
                });
            }
        }

        let mut directional = vec![LightSlot::default(); capacity];
        for (slot, light) in directional.iter_mut().zip(&self.directional) {
            *slot = LightSlot {
                vector: light.direction,
                color: light.color,
            };
        }

        let mut point = vec![LightSlot::default(); capacity];
        for (slot, light) in point.iter_mut().zip(&self.point) {
            *slot = LightSlot {
                vector: light.position,
                color: light.color,
            };
        }

        let caster = caster.and_then(|entity| {
            [LightKind::Directional, LightKind::Point]
                .into_iter()
                .find_map(|kind| self.slot_of(kind, entity).map(|i| (kind, i)))
        });

        Ok(PackedLights {
            ambient: self.ambient.iter().map(|l| l.color).sum(),
            directional,
            point,
            caster,
        })
    }
}

/// Direction (directional lights) or position (point lights) plus color.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LightSlot {
    pub vector: Vec3,
    pub color: Vec3,
}

/// Fixed-size light arrays for one draw.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedLights {
    pub ambient: Vec3,
    pub directional: Vec<LightSlot>,
    pub point: Vec<LightSlot>,
    /// Slot holding the shadow-casting light, if it is active.
    pub caster: Option<(LightKind, usize)>,
}

impl PackedLights {
    pub fn capacity(&self) -> usize {
        self.directional.len()
    }

    /// GPU layout: ambient, caster info, then `capacity` directional and
    /// `capacity` point slots of two vec4 each.
    pub fn to_uniform(&self) -> Vec<LightsRaw> {
        let caster = match self.caster {
            Some((LightKind::Directional, i)) => [1.0, i as f32, 0.0, 0.0],
            Some((LightKind::Point, i)) => [2.0, i as f32, 0.0, 0.0],
            _ => [0.0; 4],
        };

        let mut raw = Vec::with_capacity(2 + 2 * (self.directional.len() + self.point.len()));
        raw.push(LightsRaw(self.ambient.extend(0.0).to_array()));
        raw.push(LightsRaw(caster));
        for slot in self.directional.iter().chain(&self.point) {
            raw.push(LightsRaw(slot.vector.extend(0.0).to_array()));
            raw.push(LightsRaw(slot.color.extend(0.0).to_array()));
        }
        raw
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq)]
pub struct LightsRaw(pub [f32; 4]);

#[cfg(test)]
mod tests {
    use super::*;

    fn light(world: &mut hecs::World, color: f32) -> CollectedLight {
        CollectedLight {
            entity: world.spawn(()),
            color: Vec3::splat(color),
            position: Vec3::new(color, 0.0, 0.0),
            direction: Vec3::NEG_Y,
        }
    }

    #[test]
    fn pack_pads_with_zero_slots() {
        let mut world = hecs::World::new();
        let mut set = LightSet::new();
        set.push(LightKind::Ambient, light(&mut world, 0.1));
        set.push(LightKind::Ambient, light(&mut world, 0.2));
        set.push(LightKind::Point, light(&mut world, 0.9));

        let packed = set.pack(3, "m", None).unwrap();
        assert!(packed.ambient.abs_diff_eq(Vec3::splat(0.3), 1e-6));
        assert!(packed.directional.iter().all(|s| *s == LightSlot::default()));
        assert_eq!(packed.point[0].color, Vec3::splat(0.9));
        assert_eq!(packed.point[1], LightSlot::default());
        assert_eq!(packed.to_uniform().len(), 2 + 2 * 6);
    }

    #[test]
    fn pack_rejects_too_many_lights() {
        let mut world = hecs::World::new();
        let mut set = LightSet::new();
        for _ in 0..3 {
            set.push(LightKind::Directional, light(&mut world, 1.0));
        }
        let err = set.pack(2, "spheres", None).unwrap_err();
        assert!(matches!(
            err,
            RenderError::LightCapacityExceeded { kind: LightKind::Directional, active: 3, capacity: 2, .. }
        ));
    }

    #[test]
    fn pack_records_caster_slot() {
        let mut world = hecs::World::new();
        let mut set = LightSet::new();
        set.push(LightKind::Directional, light(&mut world, 0.5));
        let caster = light(&mut world, 0.8);
        set.push(LightKind::Directional, caster);

        let packed = set.pack(2, "m", Some(caster.entity)).unwrap();
        assert_eq!(packed.caster, Some((LightKind::Directional, 1)));
        assert_eq!(packed.to_uniform()[1].0, [1.0, 1.0, 0.0, 0.0]);
    }
}
