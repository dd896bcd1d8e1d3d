use crate::scene::components::{Children, LocalTransform, Parent};
use glam::Mat4;
use hecs::{Entity, World};

pub(crate) fn parent_of(world: &World, entity: Entity) -> Option<Entity> {
    world.get::<&Parent>(entity).ok().map(|p| p.0)
}

pub(crate) fn children_of(world: &World, entity: Entity) -> Vec<Entity> {
    world
        .get::<&Children>(entity)
        .map(|c| c.0.clone())
        .unwrap_or_default()
}

/// True if `ancestor` is `node` or lies on its parent chain.
pub(crate) fn is_ancestor_or_self(world: &World, ancestor: Entity, node: Entity) -> bool {
    let mut current = Some(node);
    while let Some(entity) = current {
        if entity == ancestor {
            return true;
        }
        current = parent_of(world, entity);
    }
    false
}

/// Unlinks `child` from its parent, if it has one.
pub(crate) fn detach(world: &mut World, child: Entity) {
    let Ok(parent) = world.remove_one::<Parent>(child) else {
        return;
    };
    if let Ok(mut children) = world.get::<&mut Children>(parent.0) {
        children.0.retain(|&c| c != child);
    }
}

pub(crate) fn attach(world: &mut World, parent: Entity, child: Entity) {
    detach(world, child);

    let has_children = match world.get::<&mut Children>(parent) {
        Ok(mut children) => {
            children.0.push(child);
            true
        }
        Err(_) => false,
    };
    if !has_children {
        if let Err(e) = world.insert_one(parent, Children(vec![child])) {
            log::error!("Failed to insert Children for {:?}: {:?}", parent, e);
            return;
        }
    }

    if let Err(e) = world.insert_one(child, Parent(parent)) {
        log::error!("Failed to insert Parent for {:?}: {:?}", child, e);
    }
}

/// Depth-first pre-order walk starting at (and including) `root`.
/// Siblings are visited in insertion order.
pub(crate) fn depth_first(world: &World, root: Entity) -> Vec<Entity> {
    let mut order = Vec::new();
    let mut stack = vec![root];

    while let Some(entity) = stack.pop() {
        order.push(entity);
        if let Ok(children) = world.get::<&Children>(entity) {
            stack.extend(children.0.iter().rev().copied());
        }
    }

    order
}

/// World matrix obtained by composing local transforms up the parent chain.
pub(crate) fn world_matrix(world: &World, entity: Entity) -> Option<Mat4> {
    let mut matrix = world.get::<&LocalTransform>(entity).ok()?.0.matrix();
    let mut current = parent_of(world, entity);

    while let Some(parent) = current {
        if let Ok(local) = world.get::<&LocalTransform>(parent) {
            matrix = local.0.matrix() * matrix;
        }
        current = parent_of(world, parent);
    }

    Some(matrix)
}
