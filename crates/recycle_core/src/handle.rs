//! # Recycle Handles
//!
//! Every instance a manager creates carries a [`RecycleHandle`] naming its
//! category and owning manager. Whoever holds the instance can send it home
//! without knowing which pool it came from.

use crate::error::HandleError;
use crate::host::Host;
use crate::key::{CategoryKey, ManagerId};
use crate::manager::{PoolManager, ReturnOutcome};

/// Binding between an instance and the pool it belongs to.
///
/// Handles are immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecycleHandle {
    manager: ManagerId,
    category: CategoryKey,
}

impl RecycleHandle {
    /// Creates a handle for `category` owned by `manager`.
    #[must_use]
    pub const fn new(manager: ManagerId, category: CategoryKey) -> Self {
        Self { manager, category }
    }

    /// Returns the owning manager.
    #[inline]
    #[must_use]
    pub const fn manager(&self) -> ManagerId {
        self.manager
    }

    /// Returns the category.
    #[inline]
    #[must_use]
    pub const fn category(&self) -> &CategoryKey {
        &self.category
    }

    /// Returns `instance` to its pool.
    ///
    /// If `manager` is not the manager that minted this handle the instance
    /// is destroyed and the mismatch is reported.
    pub fn return_to_pool<H: Host>(
        &self,
        manager: &mut PoolManager<H>,
        instance: H::Instance,
    ) -> ReturnOutcome {
        manager.return_with_handle(self, instance)
    }
}

/// Per-object storage for a handle, bound at most once.
///
/// Hosts embed one of these in each engine object they hand to the pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecycleSlot(Option<RecycleHandle>);

impl RecycleSlot {
    /// Creates an unbound slot.
    #[must_use]
    pub const fn new() -> Self {
        Self(None)
    }

    /// Binds the slot.
    ///
    /// # Errors
    ///
    /// [`HandleError::AlreadyBound`] if the slot already holds a handle. The
    /// existing binding is kept.
    pub fn bind(&mut self, handle: RecycleHandle) -> Result<(), HandleError> {
        match &self.0 {
            Some(existing) => Err(HandleError::AlreadyBound {
                category: existing.category.clone(),
            }),
            None => {
                self.0 = Some(handle);
                Ok(())
            }
        }
    }

    /// Returns the bound handle.
    #[inline]
    #[must_use]
    pub const fn get(&self) -> Option<&RecycleHandle> {
        self.0.as_ref()
    }

    /// Returns true if a handle is bound.
    #[inline]
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.0.is_some()
    }
}
