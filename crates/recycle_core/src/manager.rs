//! # Pool Manager
//!
//! Owns one [`Pool`] per category and exposes the public acquire/return API.
//!
//! ```text
//!   get_pooled_object(key) ──> registry ──> Pool::acquire ──> detach
//!                                 │  (missing: auto-create with default policy)
//!   return_pooled_object(key, i) ─┴──> Pool::release ──> park | evict
//!   return_by_handle(i) ──> host.handle(i) ──> return_pooled_object
//! ```
//!
//! Misuse never fails the caller. Every absorbed problem becomes an
//! [`Anomaly`] that is logged and kept in a bounded log. Only factory
//! failures propagate.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use crate::config::{PoolManagerConfig, PoolPolicy};
use crate::error::Anomaly;
use crate::handle::RecycleHandle;
use crate::host::{Host, Instantiator, SceneGraph};
use crate::key::{CategoryKey, ManagerId};
use crate::pool::{Pool, PoolHooks, PoolStats, Release};

/// Holding-area node type of a host.
type NodeOf<H> = <H as SceneGraph<<H as Instantiator>::Instance>>::Node;

/// What happened to a returned instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnOutcome {
    /// Parked in its pool's free-list.
    Pooled,
    /// Destroyed because the free-list was full.
    Evicted,
    /// Already idle; nothing changed.
    AlreadyIdle,
    /// Destroyed because it could not be pooled (see the anomaly log).
    Destroyed,
}

impl From<Release> for ReturnOutcome {
    fn from(release: Release) -> Self {
        match release {
            Release::Pooled => Self::Pooled,
            Release::Evicted => Self::Evicted,
            Release::AlreadyIdle => Self::AlreadyIdle,
        }
    }
}

/// Registration parameters of a pool. Fixed for the pool's lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolDescriptor {
    /// Category the pool serves.
    pub category: CategoryKey,
    /// Instances warmed at registration.
    pub initial_size: usize,
    /// Free-list bound.
    pub max_size: usize,
}

/// A registered pool and the holding area its idle instances live under.
struct PoolEntry<H: Host> {
    descriptor: PoolDescriptor,
    holding: NodeOf<H>,
    pool: Pool<H::Instance>,
}

/// Routes pool callbacks to the host for one category.
struct Hooks<'a, H: Host> {
    host: &'a mut H,
    manager: ManagerId,
    category: &'a CategoryKey,
    holding: &'a NodeOf<H>,
}

impl<H: Host> PoolHooks<H::Instance> for Hooks<'_, H> {
    type Error = H::Error;

    fn create(&mut self, serial: usize) -> Result<H::Instance, H::Error> {
        let instance = self.host.instantiate(self.category, serial)?;
        self.host.set_parent(&instance, Some(self.holding));
        self.host
            .attach_handle(&instance, RecycleHandle::new(self.manager, self.category.clone()));
        self.host.set_active(&instance, false);
        Ok(instance)
    }

    fn on_acquire(&mut self, instance: &H::Instance) {
        self.host.set_active(instance, true);
    }

    fn on_release(&mut self, instance: &H::Instance) {
        self.host.set_active(instance, false);
        self.host.set_parent(instance, Some(self.holding));
    }

    fn on_destroy(&mut self, instance: H::Instance) {
        self.host.destroy(instance);
    }
}

/// Registry of category pools bound to one host.
///
/// # Thread Safety
///
/// NOT thread-safe. All calls happen on the simulation thread.
///
/// # Example
///
/// ```rust,ignore
/// let mut pools = PoolManager::new(host, PoolManagerConfig::default());
/// pools.create_pool("Bullet", 5, 10)?;
///
/// let bullet = pools.get_pooled_object(&"Bullet".into())?;
/// // ... simulate ...
/// pools.return_by_handle(bullet);
/// ```
pub struct PoolManager<H: Host> {
    /// Identity recorded in every handle this manager mints.
    id: ManagerId,
    /// The engine collaborator.
    host: H,
    /// Default policy, presets, anomaly log size.
    config: PoolManagerConfig,
    /// Category registry.
    pools: HashMap<CategoryKey, PoolEntry<H>>,
    /// Most recent anomalies, oldest first.
    anomalies: VecDeque<Anomaly>,
    /// Set once `initialize` has registered every preset.
    initialized: bool,
    /// Set by `begin_shutdown`.
    shutting_down: bool,
}

impl<H: Host> PoolManager<H> {
    /// Creates an empty manager. Call [`initialize`](Self::initialize) to
    /// register the configured presets.
    #[must_use]
    pub fn new(host: H, config: PoolManagerConfig) -> Self {
        Self {
            id: ManagerId::next(),
            host,
            anomalies: VecDeque::new(),
            config,
            pools: HashMap::new(),
            initialized: false,
            shutting_down: false,
        }
    }

    /// Registers and warms every preset pool. Runs once; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Propagates the first factory failure. Presets registered before the
    /// failure stay registered and are skipped when `initialize` is retried.
    pub fn initialize(&mut self) -> Result<(), H::Error> {
        if self.initialized {
            return Ok(());
        }

        let presets = self.config.presets.clone();
        for preset in presets {
            if !self.pools.contains_key(&preset.category) {
                self.create_pool(preset.category, preset.initial_size, preset.max_size)?;
            }
        }

        self.initialized = true;
        tracing::debug!(manager = %self.id, pools = self.pools.len(), "pool manager initialized");
        Ok(())
    }

    /// Returns true once [`initialize`](Self::initialize) has succeeded.
    #[inline]
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns this manager's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ManagerId {
        self.id
    }

    /// Returns the host.
    #[inline]
    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Returns the host mutably.
    #[inline]
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &PoolManagerConfig {
        &self.config
    }

    // =========================================================================
    // Acquire / return
    // =========================================================================

    /// Hands out an instance of `category`.
    ///
    /// An unregistered category gets a pool with the configured default
    /// policy first. The instance comes back active and detached from its
    /// holding area.
    ///
    /// # Errors
    ///
    /// Propagates the host's factory failure unchanged.
    pub fn get_pooled_object(&mut self, category: &CategoryKey) -> Result<H::Instance, H::Error> {
        let policy = self.config.default_policy;
        if !policy.is_valid() && !self.pools.contains_key(category) {
            self.report(Anomaly::InvalidCapacity {
                category: category.clone(),
                initial_size: policy.initial_size,
                max_size: policy.max_size,
            });
        }

        let manager = self.id;
        let entry = match self.pools.entry(category.clone()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                tracing::debug!(
                    %category,
                    initial_size = policy.initial_size,
                    max_size = policy.max_size,
                    "auto-creating pool"
                );
                slot.insert(Self::open_pool(&mut self.host, manager, category, policy)?)
            }
        };

        let instance = entry.pool.acquire(&mut Hooks {
            host: &mut self.host,
            manager,
            category: &entry.descriptor.category,
            holding: &entry.holding,
        })?;
        self.host.set_parent(&instance, None);

        Ok(instance)
    }

    /// Returns `instance` to the pool of `category`.
    ///
    /// With no pool registered for `category` the instance is destroyed. An
    /// instance whose handle names another category leaves that pool's
    /// active-set and is reported.
    pub fn return_pooled_object(
        &mut self,
        category: &CategoryKey,
        instance: H::Instance,
    ) -> ReturnOutcome {
        let manager = self.id;
        let expected = self
            .host
            .handle(&instance)
            .filter(|handle| handle.manager() == manager && handle.category() != category);
        if let Some(owner) = expected
            .as_ref()
            .and_then(|handle| self.pools.get_mut(handle.category()))
        {
            owner.pool.disown(&instance);
        }

        let Some(entry) = self.pools.get_mut(category) else {
            self.report(Anomaly::UnknownCategory {
                category: category.clone(),
                operation: "return_pooled_object",
            });
            self.host.destroy(instance);
            return ReturnOutcome::Destroyed;
        };

        let anomaly = if entry.pool.is_idle(&instance) {
            Some(Anomaly::DoubleRelease {
                instance: format!("{instance:?}"),
                category: category.clone(),
            })
        } else if let Some(handle) = expected {
            Some(Anomaly::CategoryMismatch {
                instance: format!("{instance:?}"),
                expected: handle.category().clone(),
                category: category.clone(),
            })
        } else if entry.pool.is_active(&instance) {
            None
        } else {
            Some(Anomaly::UntrackedRelease {
                instance: format!("{instance:?}"),
                category: category.clone(),
            })
        };

        let release = entry.pool.release(
            instance,
            &mut Hooks {
                host: &mut self.host,
                manager,
                category: &entry.descriptor.category,
                holding: &entry.holding,
            },
        );

        if let Some(anomaly) = anomaly {
            self.report(anomaly);
        }
        release.into()
    }

    /// Returns `instance` to the pool recorded in its recycle handle.
    ///
    /// An instance without a handle cannot be pooled and is destroyed.
    pub fn return_by_handle(&mut self, instance: H::Instance) -> ReturnOutcome {
        match self.host.handle(&instance) {
            Some(handle) => self.return_with_handle(&handle, instance),
            None => {
                self.report(Anomaly::MissingTrackingInfo {
                    instance: format!("{instance:?}"),
                });
                self.host.destroy(instance);
                ReturnOutcome::Destroyed
            }
        }
    }

    /// Returns `instance` using an already-read handle.
    pub(crate) fn return_with_handle(
        &mut self,
        handle: &RecycleHandle,
        instance: H::Instance,
    ) -> ReturnOutcome {
        if handle.manager() != self.id {
            self.report(Anomaly::ForeignInstance {
                instance: format!("{instance:?}"),
                category: handle.category().clone(),
                owner: handle.manager(),
            });
            self.host.destroy(instance);
            return ReturnOutcome::Destroyed;
        }
        self.return_pooled_object(handle.category(), instance)
    }

    /// Returns every checked-out instance of every category.
    ///
    /// Each category's active-set is snapshotted before it is drained.
    /// Returns the number of instances handed back.
    pub fn return_all_pooled_objects(&mut self) -> usize {
        let snapshots: Vec<(CategoryKey, Vec<H::Instance>)> = self
            .pools
            .iter()
            .map(|(category, entry)| (category.clone(), entry.pool.active_snapshot()))
            .collect();

        let mut returned = 0;
        for (category, instances) in snapshots {
            for instance in instances {
                self.return_pooled_object(&category, instance);
                returned += 1;
            }
        }

        tracing::info!(manager = %self.id, returned, "returned all pooled objects");
        returned
    }

    // =========================================================================
    // Pool lifecycle
    // =========================================================================

    /// Registers a pool and warms `initial_size` instances.
    ///
    /// A second registration of the same category is ignored; the first
    /// registration's sizes stand. `initial_size > max_size` raises the max.
    ///
    /// # Errors
    ///
    /// Propagates a factory failure during warm-up. Nothing is registered.
    pub fn create_pool(
        &mut self,
        category: impl Into<CategoryKey>,
        initial_size: usize,
        max_size: usize,
    ) -> Result<(), H::Error> {
        let category = category.into();
        if self.pools.contains_key(&category) {
            self.report(Anomaly::DuplicateRegistration { category });
            return Ok(());
        }

        let policy = PoolPolicy::new(initial_size, max_size);
        if !policy.is_valid() {
            self.report(Anomaly::InvalidCapacity {
                category: category.clone(),
                initial_size,
                max_size,
            });
        }

        let entry = Self::open_pool(&mut self.host, self.id, &category, policy)?;
        tracing::debug!(%category, initial_size, max_size = entry.pool.max_size(), "pool created");
        self.pools.insert(category, entry);
        Ok(())
    }

    /// Returns every active instance of `category`, then destroys the pool's
    /// idle instances and holding area and unregisters it.
    ///
    /// No-op once shutdown has begun.
    pub fn destroy_pool(&mut self, category: &CategoryKey) {
        if self.shutting_down {
            self.report(Anomaly::ShutdownInProgress {
                operation: "destroy_pool",
            });
            return;
        }

        let Some(entry) = self.pools.get(category) else {
            self.report(Anomaly::UnknownCategory {
                category: category.clone(),
                operation: "destroy_pool",
            });
            return;
        };

        for instance in entry.pool.active_snapshot() {
            self.return_pooled_object(category, instance);
        }

        if let Some(entry) = self.pools.remove(category) {
            self.teardown(entry);
        }
        tracing::debug!(%category, "pool destroyed");
    }

    /// Tears down every pool without returning active instances first.
    ///
    /// Idle instances and holding areas are destroyed. Instances still
    /// checked out are orphaned; returning one later destroys it. During
    /// shutdown only the bookkeeping is dropped and the host is not called.
    pub fn cleanup_pools(&mut self) {
        let count = self.pools.len();

        if self.shutting_down {
            for entry in self.pools.values_mut() {
                entry.pool.forget();
            }
            self.pools.clear();
            tracing::info!(manager = %self.id, pools = count, "pools forgotten during shutdown");
            return;
        }

        let entries: Vec<PoolEntry<H>> = self.pools.drain().map(|(_, entry)| entry).collect();
        for entry in entries {
            self.teardown(entry);
        }
        tracing::info!(manager = %self.id, pools = count, "pools cleaned up");
    }

    /// Marks the start of process shutdown. Teardown operations stop
    /// touching the host from here on.
    pub fn begin_shutdown(&mut self) {
        if !self.shutting_down {
            tracing::info!(manager = %self.id, "pool manager shutting down");
        }
        self.shutting_down = true;
    }

    /// Returns true once [`begin_shutdown`](Self::begin_shutdown) was called.
    #[inline]
    #[must_use]
    pub const fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Returns true if `category` has a registered pool.
    #[inline]
    #[must_use]
    pub fn contains_pool(&self, category: &CategoryKey) -> bool {
        self.pools.contains_key(category)
    }

    /// Iterates the registered categories in no particular order.
    pub fn categories(&self) -> impl Iterator<Item = &CategoryKey> {
        self.pools.keys()
    }

    /// Returns the registration parameters of `category`.
    #[must_use]
    pub fn descriptor(&self, category: &CategoryKey) -> Option<&PoolDescriptor> {
        self.pools.get(category).map(|entry| &entry.descriptor)
    }

    /// Returns the counters of `category`.
    #[must_use]
    pub fn stats(&self, category: &CategoryKey) -> Option<PoolStats> {
        self.pools.get(category).map(|entry| entry.pool.stats())
    }

    /// Returns the number of idle instances of `category`.
    #[must_use]
    pub fn idle_count(&self, category: &CategoryKey) -> Option<usize> {
        self.pools.get(category).map(|entry| entry.pool.idle_count())
    }

    /// Returns the number of checked-out instances of `category`.
    #[must_use]
    pub fn active_count(&self, category: &CategoryKey) -> Option<usize> {
        self.pools.get(category).map(|entry| entry.pool.active_count())
    }

    /// Returns true if `instance` is checked out of the pool of `category`.
    #[must_use]
    pub fn is_checked_out(&self, category: &CategoryKey, instance: &H::Instance) -> bool {
        self.pools
            .get(category)
            .is_some_and(|entry| entry.pool.is_active(instance))
    }

    /// Returns the acquire ticket of `instance` if it is checked out of the
    /// pool named by its recycle handle.
    ///
    /// Identifies one active period: the ticket changes every time the
    /// instance is handed out.
    #[must_use]
    pub fn checkout_ticket(&self, instance: &H::Instance) -> Option<u64> {
        let handle = self.host.handle(instance)?;
        if handle.manager() != self.id {
            return None;
        }
        self.pools.get(handle.category())?.pool.ticket(instance)
    }

    /// Returns true if `instance` is idle in the pool of `category`.
    #[must_use]
    pub fn is_idle(&self, category: &CategoryKey, instance: &H::Instance) -> bool {
        self.pools
            .get(category)
            .is_some_and(|entry| entry.pool.is_idle(instance))
    }

    /// Iterates the retained anomalies, oldest first.
    pub fn anomalies(&self) -> impl DoubleEndedIterator<Item = &Anomaly> + ExactSizeIterator {
        self.anomalies.iter()
    }

    /// Removes and returns the retained anomalies, oldest first.
    pub fn take_anomalies(&mut self) -> Vec<Anomaly> {
        self.anomalies.drain(..).collect()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Creates a holding area and a warmed pool for `category`.
    fn open_pool(
        host: &mut H,
        manager: ManagerId,
        category: &CategoryKey,
        policy: PoolPolicy,
    ) -> Result<PoolEntry<H>, H::Error> {
        let holding = host.create_holding_area(category);
        let created = Pool::new(
            category.clone(),
            policy,
            &mut Hooks {
                host: &mut *host,
                manager,
                category,
                holding: &holding,
            },
        );

        match created {
            Ok(pool) => Ok(PoolEntry {
                descriptor: PoolDescriptor {
                    category: category.clone(),
                    initial_size: policy.initial_size,
                    max_size: pool.max_size(),
                },
                holding,
                pool,
            }),
            Err(err) => {
                host.destroy_holding_area(holding);
                Err(err)
            }
        }
    }

    fn teardown(&mut self, entry: PoolEntry<H>) {
        let PoolEntry {
            descriptor,
            holding,
            mut pool,
        } = entry;
        pool.clear(&mut Hooks {
            host: &mut self.host,
            manager: self.id,
            category: &descriptor.category,
            holding: &holding,
        });
        self.host.destroy_holding_area(holding);
    }

    fn report(&mut self, anomaly: Anomaly) {
        tracing::warn!(manager = %self.id, "{}", anomaly);

        let capacity = self.config.anomaly_log_capacity;
        if capacity == 0 {
            return;
        }
        while self.anomalies.len() >= capacity {
            self.anomalies.pop_front();
        }
        self.anomalies.push_back(anomaly);
    }
}
