use std::collections::HashMap;

use super::{
    body::PhysicsBody,
    group::Group,
    lists::{EntityList, DISPLAY_LIST, PHYSICS_LIST},
    timers::{TaskOwner, Timers}
};

pub type EntityId = u32;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("Entity {0} does not exist")]
    EntityNotExist(EntityId),
    #[error("Cannot remove non-existent entity {id} from {list}")]
    NotInList { list: &'static str, id: EntityId },
    #[error("Group '{0}' does not exist")]
    GroupNotExist(String),
}

/// Entity store of a scene. Bodies live here exactly once, the display and
/// physics lists only hold ids. Every removal goes through [`World::destroy`]
/// so the store, both lists, the groups and the owned timers stay in step.
#[derive(Debug)]
pub struct World {
    new_entity_id: EntityId,
    entities: HashMap<EntityId, PhysicsBody>,
    display_list: EntityList,
    physics_list: EntityList,
    groups: HashMap<String, Group<EntityId>>,
    pub timers: Timers,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        log::debug!("World created");
        Self {
            new_entity_id: 0,
            entities: HashMap::new(),
            display_list: EntityList::new(DISPLAY_LIST),
            physics_list: EntityList::new(PHYSICS_LIST),
            groups: HashMap::new(),
            timers: Timers::new(),
        }
    }

    /// Stores the body and registers it for drawing and physics.
    pub fn create_entity(&mut self, mut body: PhysicsBody) -> EntityId {
        let new_id = self.new_entity_id;
        self.new_entity_id += 1;
        body.id = new_id;

        log::trace!("Entity {new_id} '{}' created at {}", body.name, body.position);
        self.entities.insert(new_id, body);
        self.display_list.add(new_id);
        self.physics_list.add(new_id);
        new_id
    }

    /// Removes the entity from every structure that knows about it and cancels
    /// its timers. Destroying twice reports the second call.
    pub fn destroy(&mut self, entity_id: EntityId) -> Result<PhysicsBody, WorldError> {
        let body = self.entities.remove(&entity_id).ok_or(WorldError::EntityNotExist(entity_id))?;

        for list in [&mut self.display_list, &mut self.physics_list] {
            if let Err(e) = list.remove(entity_id) {
                log::warn!("{e}");
            }
        }
        for group in self.groups.values_mut() {
            group.remove(&entity_id);
        }
        self.timers.cancel_owner(TaskOwner::Body(entity_id));

        log::trace!("Entity {entity_id} destroyed");
        Ok(body)
    }

    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.entities.contains_key(&entity_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get_entity_by_id(&self, entity_id: EntityId) -> Option<&PhysicsBody> {
        self.entities.get(&entity_id)
    }

    pub fn get_entity_by_id_mut(&mut self, entity_id: EntityId) -> Option<&mut PhysicsBody> {
        self.entities.get_mut(&entity_id)
    }

    /// Bodies in display order of insertion.
    pub fn iter_entities(&self) -> impl Iterator<Item = &PhysicsBody> {
        self.display_list.iter().filter_map(|id| self.entities.get(&id))
    }

    pub fn bodies(&self) -> &HashMap<EntityId, PhysicsBody> {
        &self.entities
    }

    pub fn display_list(&self) -> &EntityList {
        &self.display_list
    }

    pub fn physics_list(&self) -> &EntityList {
        &self.physics_list
    }

    /// Creates the group on first use.
    pub fn add_to_group<S: AsRef<str>>(&mut self, group: S, entity_id: EntityId) -> Result<(), WorldError> {
        if !self.contains(entity_id) {
            return Err(WorldError::EntityNotExist(entity_id));
        }
        self.groups.entry(group.as_ref().to_string())
            .or_insert_with(|| Group::new(group.as_ref()))
            .insert(entity_id);
        Ok(())
    }

    pub fn remove_from_group<S: AsRef<str>>(&mut self, group: S, entity_id: EntityId) -> Result<bool, WorldError> {
        let group = self.groups.get_mut(group.as_ref())
            .ok_or_else(|| WorldError::GroupNotExist(group.as_ref().to_string()))?;
        Ok(group.remove(&entity_id))
    }

    pub fn group<S: AsRef<str>>(&self, group: S) -> Option<&Group<EntityId>> {
        self.groups.get(group.as_ref())
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.display_list.clear();
        self.physics_list.clear();
        self.groups.clear();
        self.timers.clear();
    }
}

#[cfg(test)]
use super::timers::TimerAction;

#[test]
fn test_world_creation() {
    let world = World::new();
    assert_eq!(world.new_entity_id, 0);
    assert!(world.is_empty());
}

#[test]
fn test_world_entity_creation_registers_everywhere() {
    let mut world = World::new();
    let id = world.create_entity(PhysicsBody::rect(1.0, 2.0, 3.0, 4.0).with_name("Bob"));
    assert_eq!(id, 0);
    assert_eq!(world.new_entity_id, 1);

    let entity = world.get_entity_by_id(id).unwrap();
    assert_eq!(entity.id, id);
    assert_eq!(entity.name, "Bob");
    assert!(world.display_list().contains(id));
    assert!(world.physics_list().contains(id));
}

#[test]
fn test_world_destroy_is_centralized() {
    let mut world = World::new();
    let keep = world.create_entity(PhysicsBody::rect(0.0, 0.0, 1.0, 1.0));
    let gone = world.create_entity(PhysicsBody::rect(0.0, 0.0, 1.0, 1.0));
    world.add_to_group("solid", keep).unwrap();
    world.add_to_group("solid", gone).unwrap();
    world.timers.schedule_once(TaskOwner::Body(gone), 100.0, TimerAction::DestroyBody(gone));

    let body = world.destroy(gone).unwrap();
    assert_eq!(body.id, gone);
    assert!(!world.contains(gone));
    assert!(!world.display_list().contains(gone));
    assert!(!world.physics_list().contains(gone));
    assert_eq!(world.group("solid").unwrap().to_vec(), vec![keep]);
    assert!(world.timers.is_empty());

    assert_eq!(world.destroy(gone).unwrap_err(), WorldError::EntityNotExist(gone));
}

#[test]
fn test_world_entity_translate() {
    let initial = crate::game::math::Vector2F::new(1.0, 2.0);
    let translation = crate::game::math::Vector2F::new(100.0, 500.0);

    let mut world = World::new();
    let id = world.create_entity(PhysicsBody::rect(initial.x, initial.y, 1.0, 1.0));
    world.get_entity_by_id_mut(id).unwrap().position += translation;
    assert_eq!(world.get_entity_by_id(id).unwrap().position, initial + translation);
}

#[test]
fn test_group_requires_existing_entity() {
    let mut world = World::new();
    assert_eq!(world.add_to_group("solid", 9), Err(WorldError::EntityNotExist(9)));
    assert!(matches!(world.remove_from_group("missing", 0), Err(WorldError::GroupNotExist(_))));
}
