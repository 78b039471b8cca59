//! The entity/system container.
//!
//! Binding is computed when an entity or system is added and discarded when
//! the entity is removed. Capability sets are fixed once an entity is added;
//! only the values inside them change.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::capability::{Capability, CapabilitySet};
use crate::entity::{Entity, EntityAllocator};
use crate::system::{Hook, Invocation, System};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerError {
    #[error("entity not found: {0}")]
    EntityNotFound(Entity),
}

/// Index of a system in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(usize);

#[derive(Debug)]
struct Slot {
    system: System,
    /// Bound entities in bind order.
    bound: Vec<Entity>,
}

#[derive(Debug, Default)]
pub struct Container {
    allocator: EntityAllocator,
    entities: BTreeMap<Entity, CapabilitySet>,
    systems: Vec<Slot>,
}

impl Container {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, binding it to every system whose matchers accept it.
    /// Systems hooked on [`Hook::Add`] run as each bind happens.
    pub fn add_entity(&mut self, capabilities: CapabilitySet) -> Entity {
        let entity = self.allocator.allocate();
        let Self {
            entities, systems, ..
        } = self;
        let capabilities = entities.entry(entity).or_insert(capabilities);

        for slot in systems.iter_mut() {
            if slot.system.matches(capabilities) {
                slot.bound.push(entity);
                debug!(%entity, system = slot.system.name(), "bound entity");
                if slot.system.subscribes(Hook::Add) {
                    slot.system.run(
                        Invocation {
                            entity,
                            hook: Hook::Add,
                        },
                        capabilities,
                    );
                }
            }
        }
        entity
    }

    /// Unbind `entity` from every system holding it, running
    /// [`Hook::Remove`] systems first, and hand back its capabilities.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<CapabilitySet, ContainerError> {
        let mut capabilities = self
            .entities
            .remove(&entity)
            .ok_or(ContainerError::EntityNotFound(entity))?;

        for slot in &mut self.systems {
            let Some(index) = slot.bound.iter().position(|&e| e == entity) else {
                continue;
            };
            slot.bound.remove(index);
            debug!(%entity, system = slot.system.name(), "unbound entity");
            if slot.system.subscribes(Hook::Remove) {
                slot.system.run(
                    Invocation {
                        entity,
                        hook: Hook::Remove,
                    },
                    &mut capabilities,
                );
            }
        }
        Ok(capabilities)
    }

    /// Register a system and bind the entities already present that it
    /// matches, in entity order.
    pub fn add_system(&mut self, system: System) -> SystemId {
        let mut slot = Slot {
            system,
            bound: Vec::new(),
        };
        for (&entity, capabilities) in &mut self.entities {
            if slot.system.matches(capabilities) {
                slot.bound.push(entity);
                if slot.system.subscribes(Hook::Add) {
                    slot.system.run(
                        Invocation {
                            entity,
                            hook: Hook::Add,
                        },
                        capabilities,
                    );
                }
            }
        }

        debug!(
            system = slot.system.name(),
            bound = slot.bound.len(),
            "added system"
        );
        self.systems.push(slot);
        SystemId(self.systems.len() - 1)
    }

    /// Run every [`Hook::Tick`] system once per bound entity, systems in
    /// registration order.
    pub fn tick(&mut self) {
        let Self {
            entities, systems, ..
        } = self;
        for slot in systems.iter_mut() {
            if !slot.system.subscribes(Hook::Tick) {
                continue;
            }
            for &entity in &slot.bound {
                if let Some(capabilities) = entities.get_mut(&entity) {
                    slot.system.run(
                        Invocation {
                            entity,
                            hook: Hook::Tick,
                        },
                        capabilities,
                    );
                }
            }
        }
    }

    // -- Introspection --

    /// Entities bound to `system`, in bind order.
    #[must_use]
    pub fn bound_entities(&self, system: SystemId) -> &[Entity] {
        self.systems
            .get(system.0)
            .map(|slot| slot.bound.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn system(&self, system: SystemId) -> Option<&System> {
        self.systems.get(system.0).map(|slot| &slot.system)
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Live entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &CapabilitySet)> {
        self.entities.iter().map(|(&entity, caps)| (entity, caps))
    }

    #[must_use]
    pub fn capabilities(&self, entity: Entity) -> Option<&CapabilitySet> {
        self.entities.get(&entity)
    }

    #[must_use]
    pub fn get<C: Capability>(&self, entity: Entity) -> Option<&C> {
        self.entities.get(&entity)?.get::<C>()
    }

    pub fn get_mut<C: Capability>(&mut self, entity: Entity) -> Option<&mut C> {
        self.entities.get_mut(&entity)?.get_mut::<C>()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::matcher::Matcher;

    struct Nameable(&'static str);
    impl Capability for Nameable {
        fn capability_name() -> &'static str {
            "Nameable"
        }
    }

    struct Countable(u32);
    impl Capability for Countable {
        fn capability_name() -> &'static str {
            "Countable"
        }
    }

    type Calls = Rc<RefCell<Vec<(Entity, Hook)>>>;

    fn recorder(calls: &Calls) -> impl FnMut(Invocation) + 'static {
        let calls = Rc::clone(calls);
        move |inv: Invocation| calls.borrow_mut().push((inv.entity, inv.hook))
    }

    fn named(name: &'static str) -> CapabilitySet {
        CapabilitySet::new().with(Nameable(name))
    }

    #[test]
    fn test_two_systems_tick_matching_entities() {
        let mut container = Container::new();
        let named_calls: Calls = Rc::default();
        let counted_calls: Calls = Rc::default();

        let named_sys = container.add_system(
            System::builder("names")
                .matching(Matcher::has::<Nameable>())
                .run(recorder(&named_calls)),
        );
        let counted_sys = container.add_system(
            System::builder("counts")
                .matching(Matcher::has::<Countable>())
                .run(recorder(&counted_calls)),
        );

        let a = container.add_entity(named("a"));
        let b = container.add_entity(named("b").with(Countable(0)));
        let c = container.add_entity(named("c"));

        container.tick();

        assert_eq!(named_calls.borrow().len(), 3);
        assert_eq!(*counted_calls.borrow(), vec![(b, Hook::Tick)]);
        assert_eq!(container.bound_entities(named_sys), &[a, b, c]);
        assert_eq!(container.bound_entities(counted_sys), &[b]);
    }

    #[test]
    fn test_only_entities_with_capability_are_ticked() {
        let mut container = Container::new();
        container.add_system(
            System::builder("count").run(|_: Invocation, c: &mut Countable| c.0 += 1),
        );
        let plain = container.add_entity(named("plain"));
        let counted = container.add_entity(CapabilitySet::new().with(Countable(10)));

        container.tick();
        container.tick();

        assert_eq!(container.get::<Countable>(counted).unwrap().0, 12);
        assert!(container.get::<Countable>(plain).is_none());
    }

    #[test]
    fn test_negated_matcher_skips_entities() {
        let mut container = Container::new();
        let calls: Calls = Rc::default();
        container.add_system(
            System::builder("uncounted")
                .matching(Matcher::lacks::<Countable>())
                .run(recorder(&calls)),
        );
        let a = container.add_entity(named("a"));
        container.add_entity(CapabilitySet::new().with(Countable(0)));
        let c = container.add_entity(CapabilitySet::new());

        container.tick();
        assert_eq!(*calls.borrow(), vec![(a, Hook::Tick), (c, Hook::Tick)]);
    }

    #[test]
    fn test_add_and_remove_hooks_fire_once() {
        let mut container = Container::new();
        let calls: Calls = Rc::default();
        container.add_system(
            System::builder("lifecycle")
                .on(Hook::Add)
                .on(Hook::Remove)
                .matching(Matcher::has::<Nameable>())
                .run(recorder(&calls)),
        );

        let e = container.add_entity(named("zombie"));
        container.tick();
        let caps = container.remove_entity(e).unwrap();

        assert_eq!(*calls.borrow(), vec![(e, Hook::Add), (e, Hook::Remove)]);
        assert_eq!(caps.get::<Nameable>().unwrap().0, "zombie");
        assert_eq!(container.entity_count(), 0);
        assert!(!container.contains(e));
        assert_eq!(
            container.remove_entity(e).unwrap_err(),
            ContainerError::EntityNotFound(e)
        );
    }

    #[test]
    fn test_remove_hook_sees_capabilities() {
        let mut container = Container::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        container.add_system(
            System::builder("farewell")
                .on(Hook::Remove)
                .run(move |_: Invocation, n: &mut Nameable| log.borrow_mut().push(n.0)),
        );
        let e = container.add_entity(named("pig"));
        container.tick();
        assert!(seen.borrow().is_empty());

        container.remove_entity(e).unwrap();
        assert_eq!(*seen.borrow(), vec!["pig"]);
    }

    #[test]
    fn test_add_system_binds_existing_entities() {
        let mut container = Container::new();
        let a = container.add_entity(named("a"));
        container.add_entity(CapabilitySet::new());
        let c = container.add_entity(named("c"));

        let calls: Calls = Rc::default();
        let id = container.add_system(
            System::builder("late")
                .on(Hook::Add)
                .on(Hook::Tick)
                .matching(Matcher::has::<Nameable>())
                .run(recorder(&calls)),
        );

        assert_eq!(container.bound_entities(id), &[a, c]);
        assert_eq!(*calls.borrow(), vec![(a, Hook::Add), (c, Hook::Add)]);
        assert_eq!(container.system(id).unwrap().name(), "late");
    }

    #[test]
    fn test_removed_entities_are_not_ticked() {
        let mut container = Container::new();
        let calls: Calls = Rc::default();
        let id = container.add_system(System::builder("all").run(recorder(&calls)));
        let a = container.add_entity(CapabilitySet::new());
        let b = container.add_entity(CapabilitySet::new());
        container.remove_entity(a).unwrap();

        container.tick();
        assert_eq!(*calls.borrow(), vec![(b, Hook::Tick)]);
        assert_eq!(container.bound_entities(id), &[b]);
        assert_eq!(container.capabilities(b).map(CapabilitySet::len), Some(0));
        assert_eq!(
            container.iter().map(|(e, _)| e).collect::<Vec<_>>(),
            vec![b]
        );

        let c = container.add_entity(CapabilitySet::new());
        assert_eq!(c.id(), 3);
        assert!(!container.contains(a));
    }
}
