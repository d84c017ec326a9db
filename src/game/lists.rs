//! Ordered registries of entity ids. The bodies themselves live in the
//! [`World`](super::world::World) store, a list only decides order and membership.

use std::collections::HashMap;

use super::{
    body::PhysicsBody,
    world::{EntityId, WorldError}
};

#[derive(Debug, Clone)]
pub struct EntityList {
    label: &'static str,
    ids: Vec<EntityId>,
}

pub const DISPLAY_LIST: &str = "DisplayList";
pub const PHYSICS_LIST: &str = "PhysicsList";

impl EntityList {
    pub fn new(label: &'static str) -> Self {
        Self { label, ids: vec![] }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn add(&mut self, id: EntityId) {
        self.ids.push(id);
    }

    pub fn remove(&mut self, id: EntityId) -> Result<(), WorldError> {
        let position = self.ids.iter()
            .position(|e| *e == id)
            .ok_or(WorldError::NotInList { list: self.label, id })?;
        self.ids.remove(position);
        Ok(())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ids.iter().copied()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Ids ordered by ascending z-index. The sort is stable so equal depths
    /// keep insertion order. The list itself is left untouched.
    pub fn depth_sort(&self, bodies: &HashMap<EntityId, PhysicsBody>) -> Vec<EntityId> {
        let mut sorted: Vec<(i32, EntityId)> = self.ids.iter()
            .filter_map(|id| bodies.get(id).map(|b| (b.z_index, *id)))
            .collect();
        sorted.sort_by_key(|(z_index, _)| *z_index);
        sorted.into_iter().map(|(_, id)| id).collect()
    }

    pub fn visibility_filter(&self, bodies: &HashMap<EntityId, PhysicsBody>) -> Vec<EntityId> {
        self.filter_by(bodies, |b| b.visible)
    }

    pub fn enabled_filter(&self, bodies: &HashMap<EntityId, PhysicsBody>) -> Vec<EntityId> {
        self.filter_by(bodies, |b| b.enabled)
    }

    pub fn filter_by<F>(&self, bodies: &HashMap<EntityId, PhysicsBody>, predicate: F) -> Vec<EntityId>
    where
        F: Fn(&PhysicsBody) -> bool
    {
        self.ids.iter()
            .filter(|id| bodies.get(*id).is_some_and(&predicate))
            .copied()
            .collect()
    }
}

#[cfg(test)]
fn bodies_with_depths(depths: &[(EntityId, i32)]) -> HashMap<EntityId, PhysicsBody> {
    depths.iter()
        .map(|(id, z)| {
            let mut body = PhysicsBody::rect(0.0, 0.0, 1.0, 1.0).with_z_index(*z);
            body.id = *id;
            (*id, body)
        })
        .collect()
}

#[test]
fn test_depth_sort_is_stable() {
    let bodies = bodies_with_depths(&[(10, 0), (11, 0), (12, 0), (13, -1), (14, 5), (15, 0)]);
    let mut list = EntityList::new(DISPLAY_LIST);
    for id in [10, 11, 12, 13, 14, 15] {
        list.add(id);
    }

    let sorted = list.depth_sort(&bodies);
    assert_eq!(sorted, vec![13, 10, 11, 12, 15, 14]);
    // Original order untouched.
    assert_eq!(list.iter().collect::<Vec<_>>(), vec![10, 11, 12, 13, 14, 15]);
}

#[test]
fn test_remove_missing_is_reported() {
    let mut list = EntityList::new(PHYSICS_LIST);
    list.add(1);
    assert!(list.remove(1).is_ok());
    assert!(matches!(list.remove(1), Err(WorldError::NotInList { list: PHYSICS_LIST, id: 1 })));
    assert!(list.is_empty());
}

#[test]
fn test_filters() {
    let mut bodies = bodies_with_depths(&[(1, 0), (2, 0), (3, 0)]);
    bodies.get_mut(&2).unwrap().visible = false;
    bodies.get_mut(&3).unwrap().enabled = false;
    let mut list = EntityList::new(DISPLAY_LIST);
    list.add(1);
    list.add(2);
    list.add(3);
    assert_eq!(list.visibility_filter(&bodies), vec![1, 3]);
    assert_eq!(list.enabled_filter(&bodies), vec![1, 2]);
}
