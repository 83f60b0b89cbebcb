//! # Simulated Host
//!
//! A slot-array entity registry standing in for the game engine. It owns
//! every entity's state (name, active flag, parent, recycle handle) and
//! implements the collaborator traits the pool manager calls.

use std::collections::HashMap;

use recycle_core::{CategoryKey, Instantiator, RecycleHandle, RecycleSlot, SceneGraph};

use crate::config::{SimConfig, TemplateConfig};
use crate::entity::{EntityId, NodeId};
use crate::error::{SimError, SimResult};

/// State of one live entity.
#[derive(Clone, Debug)]
pub struct SimObject {
    /// Instance name, "<template> <serial>".
    pub name: String,
    /// Category the entity was built from.
    pub category: CategoryKey,
    /// Whether the entity takes part in the simulation.
    pub active: bool,
    /// Holding area the entity is parented under, if any.
    pub parent: Option<NodeId>,
    /// Recycle handle storage.
    pub recycle: RecycleSlot,
}

/// One entry of the slot array.
#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    object: Option<SimObject>,
}

/// Lifetime counters of the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostCounters {
    /// Entities built.
    pub instantiated: u64,
    /// Entities destroyed.
    pub destroyed: u64,
    /// Destroy calls naming an entity that was already gone.
    pub stale_destroys: u64,
}

/// In-memory engine used by the frame loop, the soak binary and the tests.
#[derive(Debug)]
pub struct SimHost {
    /// Entity storage indexed by `EntityId::index`.
    slots: Vec<Slot>,
    /// Indices of empty slots.
    free_slots: Vec<u32>,
    /// Number of live entities.
    live: usize,
    /// Maximum number of live entities.
    max_entities: usize,
    /// Templates by category.
    templates: HashMap<CategoryKey, TemplateConfig>,
    /// Live holding areas and their names.
    holding_areas: HashMap<NodeId, String>,
    /// Next holding-area number.
    next_node: u32,
    /// Lifetime counters.
    counters: HostCounters,
}

impl SimHost {
    /// Creates an empty host with room for `max_entities` live entities.
    #[must_use]
    pub fn new(max_entities: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            live: 0,
            max_entities,
            templates: HashMap::new(),
            holding_areas: HashMap::new(),
            next_node: 0,
            counters: HostCounters::default(),
        }
    }

    /// Creates a host with the configured capacity and templates.
    ///
    /// # Errors
    ///
    /// [`SimError::DuplicateTemplate`] if two templates share a category.
    pub fn from_config(config: &SimConfig) -> SimResult<Self> {
        let mut host = Self::new(config.max_entities);
        for template in &config.templates {
            host.register_template(template.clone())?;
        }
        Ok(host)
    }

    /// Registers the template for a category.
    ///
    /// # Errors
    ///
    /// [`SimError::DuplicateTemplate`] if the category already has one.
    pub fn register_template(&mut self, template: TemplateConfig) -> SimResult<()> {
        if self.templates.contains_key(&template.category) {
            return Err(SimError::DuplicateTemplate(template.category));
        }
        self.templates.insert(template.category.clone(), template);
        Ok(())
    }

    /// Returns the template of `category`.
    #[must_use]
    pub fn template(&self, category: &CategoryKey) -> Option<&TemplateConfig> {
        self.templates.get(category)
    }

    /// Builds an active entity outside any pool. It carries no recycle handle.
    ///
    /// # Errors
    ///
    /// [`SimError::WorldFull`] when every slot is in use.
    pub fn spawn_untracked(&mut self, name: &str, category: CategoryKey) -> SimResult<EntityId> {
        self.allocate(SimObject {
            name: name.to_owned(),
            category,
            active: true,
            parent: None,
            recycle: RecycleSlot::new(),
        })
    }

    /// Returns the entity's state if it is alive.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&SimObject> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.object.as_ref()
    }

    /// Returns true if the entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Returns true if the entity is alive and active.
    #[inline]
    #[must_use]
    pub fn is_active(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(|object| object.active)
    }

    /// Returns the number of live entities.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live
    }

    /// Returns the number of live entities that are active.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|slot| slot.object.as_ref())
            .filter(|object| object.active)
            .count()
    }

    /// Returns the number of live holding areas.
    #[inline]
    #[must_use]
    pub fn holding_area_count(&self) -> usize {
        self.holding_areas.len()
    }

    /// Returns the name of a live holding area.
    #[must_use]
    pub fn holding_area_name(&self, node: NodeId) -> Option<&str> {
        self.holding_areas.get(&node).map(String::as_str)
    }

    /// Returns the lifetime counters.
    #[inline]
    #[must_use]
    pub const fn counters(&self) -> HostCounters {
        self.counters
    }

    fn get_mut(&mut self, id: EntityId) -> Option<&mut SimObject> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.object.as_mut()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn allocate(&mut self, object: SimObject) -> SimResult<EntityId> {
        if self.live >= self.max_entities {
            return Err(SimError::WorldFull {
                capacity: self.max_entities,
            });
        }

        let index = match self.free_slots.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.object = Some(object);
        self.live += 1;
        self.counters.instantiated += 1;
        Ok(EntityId::new(index, slot.generation))
    }
}

impl Instantiator for SimHost {
    type Instance = EntityId;
    type Error = SimError;

    fn instantiate(&mut self, category: &CategoryKey, serial: usize) -> SimResult<EntityId> {
        let Some(template) = self.templates.get(category) else {
            return Err(SimError::UnknownTemplate(category.clone()));
        };
        let name = format!("{} {serial}", template.name);

        self.allocate(SimObject {
            name,
            category: category.clone(),
            active: true,
            parent: None,
            recycle: RecycleSlot::new(),
        })
    }

    fn destroy(&mut self, instance: EntityId) {
        let Some(slot) = self.slots.get_mut(instance.index() as usize) else {
            self.counters.stale_destroys += 1;
            return;
        };
        if slot.generation != instance.generation() || slot.object.is_none() {
            self.counters.stale_destroys += 1;
            tracing::debug!(?instance, "destroy of stale entity ignored");
            return;
        }

        slot.object = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(instance.index());
        self.live -= 1;
        self.counters.destroyed += 1;
    }

    fn set_active(&mut self, instance: &EntityId, active: bool) {
        if let Some(object) = self.get_mut(*instance) {
            object.active = active;
        }
    }

    fn attach_handle(&mut self, instance: &EntityId, handle: RecycleHandle) {
        if let Some(object) = self.get_mut(*instance) {
            if let Err(err) = object.recycle.bind(handle) {
                tracing::warn!(?instance, "{}", err);
            }
        }
    }

    fn handle(&self, instance: &EntityId) -> Option<RecycleHandle> {
        self.get(*instance)?.recycle.get().cloned()
    }
}

impl SceneGraph<EntityId> for SimHost {
    type Node = NodeId;

    fn create_holding_area(&mut self, category: &CategoryKey) -> NodeId {
        let node = NodeId(self.next_node);
        self.next_node += 1;
        self.holding_areas.insert(node, format!("{category}Pool"));
        node
    }

    fn destroy_holding_area(&mut self, node: NodeId) {
        self.holding_areas.remove(&node);
    }

    fn set_parent(&mut self, instance: &EntityId, parent: Option<&NodeId>) {
        if let Some(object) = self.get_mut(*instance) {
            object.parent = parent.copied();
        }
    }
}
