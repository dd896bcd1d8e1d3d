use crate::scene::components::{Children, GlobalTransform, LocalTransform};
use crate::scene::transform::Transform;
use glam::Mat4;
use hecs::{Entity, World};

/// Recomputes global transforms top-down from `root`. The root's global
/// transform is its local transform, even if it has a parent.
pub(crate) fn propagate_transforms(world: &mut World, root: Entity) {
    let mut stack: Vec<(Entity, Option<Mat4>)> = vec![(root, None)];
    let mut visited = 0usize;

    while let Some((entity, parent_world)) = stack.pop() {
        let local = match world.get::<&LocalTransform>(entity) {
            Ok(t) => t.0.matrix(),
            Err(_) => {
                log::trace!("Entity {:?} has no LocalTransform, skipping", entity);
                continue;
            }
        };

        let global = match parent_world {
            Some(parent) => parent * local,
            None => local,
        };
        visited += 1;

        let mut has_global = false;
        if let Ok(mut gt) = world.get::<&mut GlobalTransform>(entity) {
            gt.0 = Transform(global);
            has_global = true;
        }

        if !has_global {
            if let Err(e) = world.insert_one(entity, GlobalTransform(Transform(global))) {
                log::error!(
                    "Failed to insert GlobalTransform for entity {:?}: {:?}",
                    entity,
                    e
                );
                continue;
            }
        }

        if let Ok(children) = world.get::<&Children>(entity) {
            for &child in children.0.iter().rev() {
                stack.push((child, Some(global)));
            }
        }
    }

    log::trace!("Propagated transforms through {} nodes", visited);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::components::{Name, Parent};
    use glam::{Quat, Vec3};

    fn spawn(world: &mut World, name: &str, transform: Transform) -> Entity {
        world.spawn((Name::new(name), LocalTransform(transform), Children::default()))
    }

    fn link(world: &mut World, parent: Entity, child: Entity) {
        world.get::<&mut Children>(parent).unwrap().0.push(child);
        world.insert_one(child, Parent(parent)).unwrap();
    }

    fn global(world: &World, entity: Entity) -> Mat4 {
        world.get::<&GlobalTransform>(entity).unwrap().0.matrix()
    }

    #[test]
    fn test_transform_propagation_simple() {
        let mut world = World::new();
        let parent = spawn(&mut world, "Parent", Transform::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        let child = spawn(&mut world, "Child", Transform::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        link(&mut world, parent, child);

        propagate_transforms(&mut world, parent);

        assert_eq!(global(&world, parent).w_axis.truncate(), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(global(&world, child).w_axis.truncate(), Vec3::new(7.0, 0.0, 0.0));
    }

    #[test]
    fn test_transform_propagation_rotation() {
        let mut world = World::new();
        let parent = spawn(
            &mut world,
            "Parent",
            Transform::from_trs(
                Vec3::ZERO,
                Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
                Vec3::ONE,
            ),
        );
        let child = spawn(&mut world, "Child", Transform::from_translation(Vec3::X));
        link(&mut world, parent, child);

        propagate_transforms(&mut world, parent);

        assert!(global(&world, child)
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn test_root_with_parent_uses_local_only() {
        let mut world = World::new();
        let outer = spawn(&mut world, "Outer", Transform::from_translation(Vec3::splat(10.0)));
        let inner = spawn(&mut world, "Inner", Transform::from_translation(Vec3::X));
        link(&mut world, outer, inner);

        propagate_transforms(&mut world, inner);

        assert_eq!(global(&world, inner).w_axis.truncate(), Vec3::X);
        assert!(world.get::<&GlobalTransform>(outer).is_err());
    }

    #[test]
    fn test_transform_propagation_updates_existing_global() {
        let mut world = World::new();
        let parent = spawn(&mut world, "Parent", Transform::IDENTITY);
        let child = spawn(&mut world, "Child", Transform::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        link(&mut world, parent, child);

        propagate_transforms(&mut world, parent);
        world
            .get::<&mut LocalTransform>(parent)
            .unwrap()
            .0
            .set_position(Vec3::X);
        propagate_transforms(&mut world, parent);

        assert_eq!(global(&world, child).w_axis.truncate(), Vec3::new(3.0, 0.0, 0.0));
    }
}
