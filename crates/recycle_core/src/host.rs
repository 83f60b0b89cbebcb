//! # Host Collaborators
//!
//! The recycling layer never creates, parents or destroys engine objects
//! itself. The host engine supplies those primitives through two traits:
//!
//! - [`Instantiator`]: builds and destroys instances, toggles them active,
//!   and stores the per-instance [`RecycleHandle`].
//! - [`SceneGraph`]: holding areas that idle instances are parked under.
//!
//! Per-frame scheduling is not a trait. Timed auto-return takes the frame's
//! delta time as an argument.

use std::fmt::Debug;
use std::hash::Hash;

use crate::handle::RecycleHandle;
use crate::key::CategoryKey;

/// Creates and destroys pooled instances.
pub trait Instantiator {
    /// Reference to a live engine object. Cheap to clone, compared by identity.
    type Instance: Clone + Eq + Hash + Debug;

    /// Factory failure. Propagated unchanged out of acquire paths.
    type Error: std::error::Error;

    /// Builds a new, fully initialized instance of `category`.
    ///
    /// `serial` counts the instances this pool has created so far; hosts may
    /// use it for naming.
    ///
    /// # Errors
    ///
    /// Any host-specific failure to build the object.
    fn instantiate(
        &mut self,
        category: &CategoryKey,
        serial: usize,
    ) -> Result<Self::Instance, Self::Error>;

    /// Destroys an instance. It must not be used afterwards.
    fn destroy(&mut self, instance: Self::Instance);

    /// Enables or disables an instance in the simulation.
    fn set_active(&mut self, instance: &Self::Instance, active: bool);

    /// Stores the recycle handle on the instance.
    fn attach_handle(&mut self, instance: &Self::Instance, handle: RecycleHandle);

    /// Reads back the instance's recycle handle, if any.
    fn handle(&self, instance: &Self::Instance) -> Option<RecycleHandle>;
}

/// Parenting primitives used for housekeeping only.
pub trait SceneGraph<I> {
    /// A node that idle instances are parented under.
    type Node;

    /// Creates the holding area for a category's idle instances.
    fn create_holding_area(&mut self, category: &CategoryKey) -> Self::Node;

    /// Tears down a holding area.
    fn destroy_holding_area(&mut self, node: Self::Node);

    /// Parents `instance` under `parent`, or detaches it when `None`.
    fn set_parent(&mut self, instance: &I, parent: Option<&Self::Node>);
}

/// Everything a [`PoolManager`](crate::PoolManager) needs from the engine.
pub trait Host: Instantiator + SceneGraph<<Self as Instantiator>::Instance> {}

impl<T> Host for T where T: Instantiator + SceneGraph<<T as Instantiator>::Instance> {}
