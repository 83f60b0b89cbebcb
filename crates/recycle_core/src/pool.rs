//! # Category Pool
//!
//! A single category's free-list plus active-set.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::config::PoolPolicy;
use crate::key::CategoryKey;

/// Callbacks a [`Pool`] invokes around its bookkeeping.
///
/// The manager supplies a fresh implementation for each call, so the pool
/// itself never stores closures that borrow the host.
pub trait PoolHooks<I> {
    /// Factory failure.
    type Error;

    /// Builds a new instance. `serial` is the 1-based creation count.
    ///
    /// # Errors
    ///
    /// Whatever the factory reports. The pool passes it through unchanged.
    fn create(&mut self, serial: usize) -> Result<I, Self::Error>;

    /// Runs after an instance leaves the free-list, before it is handed out.
    fn on_acquire(&mut self, instance: &I);

    /// Runs before an instance is parked in the free-list.
    fn on_release(&mut self, instance: &I);

    /// Destroys an instance the pool is discarding.
    fn on_destroy(&mut self, instance: I);
}

/// What `release` did with an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// Parked in the free-list.
    Pooled,
    /// The free-list was full; the instance was destroyed.
    Evicted,
    /// The instance was already idle; nothing changed.
    AlreadyIdle,
}

/// Snapshot of a pool's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances warmed at creation.
    pub initial_size: usize,
    /// Free-list bound.
    pub max_size: usize,
    /// Instances currently idle in the free-list.
    pub idle: usize,
    /// Instances currently checked out.
    pub active: usize,
    /// Instances ever built by the factory.
    pub created: usize,
    /// Instances destroyed because the free-list was full.
    pub evicted: usize,
    /// Successful acquires.
    pub acquired: u64,
}

/// A capacity-bounded free-list with a parallel active-set.
///
/// Every live instance is in exactly one of the two. The free-list is a
/// stack: the most recently released instance is the next one acquired.
/// Only the free-list is bounded; any number of instances may be active.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. It is owned and mutated by one manager.
#[derive(Debug)]
pub struct Pool<I> {
    /// Category this pool serves.
    category: CategoryKey,
    /// Instances warmed at creation.
    initial_size: usize,
    /// Free-list bound.
    max_size: usize,
    /// Idle instances, top of stack last.
    free_list: Vec<I>,
    /// Membership index for `free_list`.
    idle: HashSet<I>,
    /// Checked-out instances mapped to their acquire ticket.
    active: HashMap<I, u64>,
    /// Next acquire ticket. Orders the active-set for snapshots.
    next_ticket: u64,
    /// Instances ever built.
    created: usize,
    /// Instances evicted on release.
    evicted: usize,
}

impl<I: Clone + Eq + Hash> Pool<I> {
    /// Creates a pool and warms `policy.initial_size` instances straight
    /// into the free-list.
    ///
    /// If `initial_size > max_size` the max is raised to `initial_size` so
    /// that no warmed instance is lost.
    ///
    /// # Errors
    ///
    /// Propagates the first factory failure. Instances already built during
    /// warm-up are destroyed first.
    pub fn new<P>(category: CategoryKey, policy: PoolPolicy, hooks: &mut P) -> Result<Self, P::Error>
    where
        P: PoolHooks<I>,
    {
        let mut pool = Self {
            category,
            initial_size: policy.initial_size,
            max_size: policy.max_size.max(policy.initial_size),
            free_list: Vec::with_capacity(policy.initial_size),
            idle: HashSet::with_capacity(policy.initial_size),
            active: HashMap::new(),
            next_ticket: 0,
            created: 0,
            evicted: 0,
        };

        for _ in 0..policy.initial_size {
            match pool.build(hooks) {
                Ok(instance) => pool.park(instance),
                Err(err) => {
                    pool.clear(hooks);
                    return Err(err);
                }
            }
        }

        Ok(pool)
    }

    /// Returns the category.
    #[inline]
    #[must_use]
    pub const fn category(&self) -> &CategoryKey {
        &self.category
    }

    /// Returns the free-list bound.
    #[inline]
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the number of idle instances.
    #[inline]
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.free_list.len()
    }

    /// Returns the number of checked-out instances.
    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Returns true if `instance` is checked out of this pool.
    #[inline]
    #[must_use]
    pub fn is_active(&self, instance: &I) -> bool {
        self.active.contains_key(instance)
    }

    /// Returns the acquire ticket of a checked-out instance.
    ///
    /// Tickets are never reused, so a changed ticket means the instance was
    /// released and handed out again.
    #[inline]
    #[must_use]
    pub fn ticket(&self, instance: &I) -> Option<u64> {
        self.active.get(instance).copied()
    }

    /// Returns true if `instance` is idle in this pool.
    #[inline]
    #[must_use]
    pub fn is_idle(&self, instance: &I) -> bool {
        self.idle.contains(instance)
    }

    /// Returns the pool's counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            initial_size: self.initial_size,
            max_size: self.max_size,
            idle: self.free_list.len(),
            active: self.active.len(),
            created: self.created,
            evicted: self.evicted,
            acquired: self.next_ticket,
        }
    }

    /// Hands out an instance.
    ///
    /// Pops the free-list, or builds a new instance when it is empty, then
    /// runs `on_acquire` and records the instance as active.
    ///
    /// # Errors
    ///
    /// Propagates a factory failure unchanged. The pool is left untouched.
    pub fn acquire<P>(&mut self, hooks: &mut P) -> Result<I, P::Error>
    where
        P: PoolHooks<I>,
    {
        let instance = match self.free_list.pop() {
            Some(instance) => {
                self.idle.remove(&instance);
                instance
            }
            None => self.build(hooks)?,
        };

        hooks.on_acquire(&instance);
        self.active.insert(instance.clone(), self.next_ticket);
        self.next_ticket += 1;

        Ok(instance)
    }

    /// Takes an instance back.
    ///
    /// If the free-list is already at `max_size` the instance is destroyed.
    /// Otherwise `on_release` runs and the instance is pushed onto the
    /// free-list. An instance that is already idle is left alone.
    pub fn release<P>(&mut self, instance: I, hooks: &mut P) -> Release
    where
        P: PoolHooks<I>,
    {
        if self.idle.contains(&instance) {
            return Release::AlreadyIdle;
        }

        self.active.remove(&instance);

        if self.free_list.len() >= self.max_size {
            self.evicted += 1;
            hooks.on_destroy(instance);
            return Release::Evicted;
        }

        hooks.on_release(&instance);
        self.park(instance);
        Release::Pooled
    }

    /// Returns the active-set in acquire order.
    ///
    /// Bulk returns iterate this copy, since each release mutates the set.
    #[must_use]
    pub fn active_snapshot(&self) -> Vec<I> {
        let mut entries: Vec<(&I, u64)> = self.active.iter().map(|(i, t)| (i, *t)).collect();
        entries.sort_unstable_by_key(|(_, ticket)| *ticket);
        entries.into_iter().map(|(i, _)| i.clone()).collect()
    }

    /// Stops tracking a checked-out instance without touching it.
    ///
    /// Returns true if it was checked out.
    pub fn disown(&mut self, instance: &I) -> bool {
        self.active.remove(instance).is_some()
    }

    /// Destroys every idle instance and stops tracking active ones.
    ///
    /// Active instances are not touched. Their fate is the caller's.
    pub fn clear<P>(&mut self, hooks: &mut P)
    where
        P: PoolHooks<I>,
    {
        self.idle.clear();
        for instance in self.free_list.drain(..) {
            hooks.on_destroy(instance);
        }
        self.active.clear();
    }

    /// Drops all bookkeeping without calling back into the host.
    pub fn forget(&mut self) {
        self.free_list.clear();
        self.idle.clear();
        self.active.clear();
    }

    fn build<P>(&mut self, hooks: &mut P) -> Result<I, P::Error>
    where
        P: PoolHooks<I>,
    {
        let instance = hooks.create(self.created + 1)?;
        self.created += 1;
        Ok(instance)
    }

    fn park(&mut self, instance: I) {
        self.idle.insert(instance.clone());
        self.free_list.push(instance);
    }
}
