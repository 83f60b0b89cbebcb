//! # Timed Auto-Return
//!
//! Countdowns that send an instance back to its pool after a delay.
//! Driven by per-frame ticks, never by a preemptive timer: a paused loop
//! simply delays the return.

use std::collections::HashMap;

use crate::host::Host;
use crate::manager::{PoolManager, ReturnOutcome};

/// Per-instance countdown.
///
/// Fires exactly once per active period. The host must call
/// [`on_activate`](Self::on_activate) each time the instance is handed out
/// again, which clears both the timer and the fired flag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutoReturn {
    /// Seconds until the return.
    delay: f32,
    /// Seconds accumulated this active period.
    elapsed: f32,
    /// Set once the countdown has fired.
    triggered: bool,
}

impl AutoReturn {
    /// Creates a countdown of `delay` seconds, already reset.
    #[must_use]
    pub const fn new(delay: f32) -> Self {
        Self {
            delay,
            elapsed: 0.0,
            triggered: false,
        }
    }

    /// Returns the configured delay in seconds.
    #[inline]
    #[must_use]
    pub const fn delay(&self) -> f32 {
        self.delay
    }

    /// Returns the seconds accumulated this active period.
    #[inline]
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Returns true once the countdown has fired this active period.
    #[inline]
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Resets the countdown for a new active period.
    pub fn on_activate(&mut self) {
        self.elapsed = 0.0;
        self.triggered = false;
    }

    /// Advances the countdown by `delta_time` seconds.
    ///
    /// Returns true on the tick where the accumulated time first reaches the
    /// delay, and false on every other tick.
    pub fn tick(&mut self, delta_time: f32) -> bool {
        if self.triggered {
            return false;
        }

        self.elapsed += delta_time;
        if self.elapsed < self.delay {
            return false;
        }

        self.triggered = true;
        true
    }

    /// Advances the countdown and, if it fires, returns `instance` through
    /// its recycle handle.
    pub fn tick_and_return<H: Host>(
        &mut self,
        delta_time: f32,
        manager: &mut PoolManager<H>,
        instance: &H::Instance,
    ) -> Option<ReturnOutcome> {
        if self.tick(delta_time) {
            Some(manager.return_by_handle(instance.clone()))
        } else {
            None
        }
    }
}

/// A countdown bound to one active period of an instance.
#[derive(Clone, Copy, Debug)]
struct Armed {
    /// Arming order.
    seq: u64,
    /// Acquire ticket at arming time. `None` if the instance was not
    /// checked out of a pool.
    ticket: Option<u64>,
    timer: AutoReturn,
}

/// Countdowns for many instances, ticked together once per frame.
///
/// A countdown only lives as long as the active period it was armed in.
/// Once the instance goes back to its pool by any path, the countdown is
/// dropped on the next tick and never touches a later holder.
#[derive(Debug)]
pub struct AutoReturnSet<I> {
    /// Armed instances by instance.
    timers: HashMap<I, Armed>,
    /// Next arming sequence number.
    next_seq: u64,
}

impl<I> Default for AutoReturnSet<I> {
    fn default() -> Self {
        Self {
            timers: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<I: Clone + Eq + std::hash::Hash> AutoReturnSet<I> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of armed countdowns.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns true if nothing is armed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Returns true if `instance` has an armed countdown.
    #[inline]
    #[must_use]
    pub fn is_armed(&self, instance: &I) -> bool {
        self.timers.contains_key(instance)
    }

    /// Arms (or re-arms) a countdown of `delay` seconds for `instance`'s
    /// current active period.
    pub fn arm<H>(&mut self, manager: &PoolManager<H>, instance: I, delay: f32)
    where
        H: Host<Instance = I>,
    {
        let armed = Armed {
            seq: self.next_seq,
            ticket: manager.checkout_ticket(&instance),
            timer: AutoReturn::new(delay),
        };
        self.next_seq += 1;
        self.timers.insert(instance, armed);
    }

    /// Cancels the countdown of `instance`. Returns true if one was armed.
    pub fn cancel(&mut self, instance: &I) -> bool {
        self.timers.remove(instance).is_some()
    }

    /// Drops every countdown.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Advances every countdown by `delta_time` seconds.
    ///
    /// Countdowns whose active period has ended are dropped first. Instances
    /// whose countdown fires are disarmed and returned through their recycle
    /// handles, in arming order. Returns what happened to each.
    pub fn tick<H>(&mut self, delta_time: f32, manager: &mut PoolManager<H>) -> Vec<(I, ReturnOutcome)>
    where
        H: Host<Instance = I>,
    {
        let before = self.timers.len();
        self.timers
            .retain(|instance, armed| manager.checkout_ticket(instance) == armed.ticket);
        let stale = before - self.timers.len();
        if stale > 0 {
            tracing::debug!(stale, "dropped countdowns of instances returned early");
        }

        let mut fired: Vec<(u64, I)> = self
            .timers
            .iter_mut()
            .filter_map(|(instance, armed)| {
                armed
                    .timer
                    .tick(delta_time)
                    .then(|| (armed.seq, instance.clone()))
            })
            .collect();
        fired.sort_unstable_by_key(|(seq, _)| *seq);

        fired
            .into_iter()
            .map(|(_, instance)| {
                self.timers.remove(&instance);
                let outcome = manager.return_by_handle(instance.clone());
                (instance, outcome)
            })
            .collect()
    }
}
