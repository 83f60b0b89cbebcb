//! In-memory host used by the unit tests.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::handle::{RecycleHandle, RecycleSlot};
use crate::host::{Instantiator, SceneGraph};
use crate::key::CategoryKey;

#[derive(Error, Debug)]
#[error("factory refused to build {0}")]
pub struct TestError(String);

#[derive(Default)]
struct TestObject {
    active: bool,
    parent: Option<u32>,
    slot: RecycleSlot,
}

#[derive(Default)]
pub struct TestHost {
    next_id: u32,
    next_node: u32,
    created: usize,
    fail_after: Option<usize>,
    objects: HashMap<u32, TestObject>,
    holding_areas: HashSet<u32>,
    destroyed: Vec<u32>,
}

impl TestHost {
    /// Makes `instantiate` fail once `count` objects have been built.
    pub fn fail_after(&mut self, count: usize) {
        self.fail_after = Some(count);
    }

    /// Builds an active object with no recycle handle.
    pub fn spawn_untracked(&mut self) -> u32 {
        let id = self.allocate();
        self.objects.insert(
            id,
            TestObject {
                active: true,
                ..TestObject::default()
            },
        );
        id
    }

    pub fn created(&self) -> usize {
        self.created
    }

    pub fn handle_of(&self, id: u32) -> Option<RecycleHandle> {
        self.objects.get(&id)?.slot.get().cloned()
    }

    pub fn is_active(&self, id: u32) -> bool {
        self.objects.get(&id).is_some_and(|object| object.active)
    }

    pub fn parent_of(&self, id: u32) -> Option<u32> {
        self.objects.get(&id)?.parent
    }

    pub fn was_destroyed(&self, id: u32) -> bool {
        self.destroyed.contains(&id)
    }

    pub fn destroyed_count(&self) -> usize {
        self.destroyed.len()
    }

    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn live_holding_areas(&self) -> usize {
        self.holding_areas.len()
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Instantiator for TestHost {
    type Instance = u32;
    type Error = TestError;

    fn instantiate(&mut self, category: &CategoryKey, _serial: usize) -> Result<u32, TestError> {
        if self.fail_after.is_some_and(|limit| self.created >= limit) {
            return Err(TestError(category.to_string()));
        }
        self.created += 1;
        let id = self.allocate();
        self.objects.insert(id, TestObject::default());
        Ok(id)
    }

    fn destroy(&mut self, instance: u32) {
        self.objects.remove(&instance);
        self.destroyed.push(instance);
    }

    fn set_active(&mut self, instance: &u32, active: bool) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.active = active;
        }
    }

    fn attach_handle(&mut self, instance: &u32, handle: RecycleHandle) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.slot.bind(handle).unwrap();
        }
    }

    fn handle(&self, instance: &u32) -> Option<RecycleHandle> {
        self.handle_of(*instance)
    }
}

impl SceneGraph<u32> for TestHost {
    type Node = u32;

    fn create_holding_area(&mut self, _category: &CategoryKey) -> u32 {
        let node = self.next_node;
        self.next_node += 1;
        self.holding_areas.insert(node);
        node
    }

    fn destroy_holding_area(&mut self, node: u32) {
        self.holding_areas.remove(&node);
    }

    fn set_parent(&mut self, instance: &u32, parent: Option<&u32>) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.parent = parent.copied();
        }
    }
}
