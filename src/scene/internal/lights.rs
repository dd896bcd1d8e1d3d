use crate::renderer::lights::{CollectedLight, LightSet};
use crate::scene::components::GlobalTransform;
use crate::scene::internal::hierarchy;
use crate::scene::light::Light;
use hecs::{Entity, World};

/// Collects every light below `root` in depth-first pre-order, partitioned
/// by kind. Global transforms must be current.
pub(crate) fn collect_lights(world: &World, root: Entity) -> LightSet {
    let mut lights = LightSet::default();

    for entity in hierarchy::depth_first(world, root) {
        let Ok(light) = world.get::<&Light>(entity) else {
            continue;
        };
        let transform = world
            .get::<&GlobalTransform>(entity)
            .map(|g| g.0)
            .unwrap_or_default();

        lights.push(
            light.kind,
            CollectedLight {
                entity,
                color: light.color,
                position: transform.position(),
                direction: transform.direction(),
            },
        );
    }

    log::trace!(
        "Collected lights: {} ambient, {} directional, {} point",
        lights.ambient().len(),
        lights.directional().len(),
        lights.point().len()
    );

    lights
}

pub(crate) fn is_light(world: &World, entity: Entity) -> Option<Light> {
    world.get::<&Light>(entity).ok().map(|l| *l)
}
