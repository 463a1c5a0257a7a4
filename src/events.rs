//! Typed publish/subscribe hub for monitor events
//!
//! Listeners are registered per [`EventKind`] and called in registration
//! order. Dispatch works on a snapshot of the registry, so listeners may
//! subscribe or unsubscribe (themselves included) while an event is being
//! delivered. A listener that returns an error or panics is logged and
//! skipped; the remaining listeners still run.

use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::analysis::{OptimizationAction, PerformanceLevel};
use crate::config::OptimizationConfig;
use crate::metrics::PerformanceMetrics;

/// Event channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Once per tick
    PerformanceUpdate,
    /// Once per attempted optimization action
    OptimizationApplied,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PerformanceUpdate => "performance_update",
            EventKind::OptimizationApplied => "optimization_applied",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of `performance_update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceUpdate {
    pub metrics: PerformanceMetrics,
    pub level: PerformanceLevel,
    pub suggestions: Vec<OptimizationAction>,
}

/// Payload of `optimization_applied`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationApplied {
    pub action: OptimizationAction,
    pub success: bool,
    /// Failure reason when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Config after the action (unchanged on failure)
    pub config: OptimizationConfig,
}

/// Everything the hub can deliver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    PerformanceUpdate(PerformanceUpdate),
    OptimizationApplied(OptimizationApplied),
}

impl MonitorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MonitorEvent::PerformanceUpdate(_) => EventKind::PerformanceUpdate,
            MonitorEvent::OptimizationApplied(_) => EventKind::OptimizationApplied,
        }
    }
}

/// Listener callback
pub type Listener = Arc<dyn Fn(&MonitorEvent) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by [`EventHub::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Outcome of one emit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchResult {
    pub delivered: usize,
    pub failed: usize,
}

struct Registration {
    id: ListenerId,
    listener: Listener,
}

/// Listener registry keyed by event kind
#[derive(Default)]
pub struct EventHub {
    listeners: Mutex<HashMap<EventKind, Vec<Registration>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `kind`.
    ///
    /// Registering the same `Arc` again for the same kind returns the existing id.
    pub fn on(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let mut listeners = self.listeners.lock();
        let registrations = listeners.entry(kind).or_default();

        if let Some(existing) = registrations
            .iter()
            .find(|r| same_listener(&r.listener, &listener))
        {
            return existing.id;
        }

        let id = ListenerId::new();
        registrations.push(Registration { id, listener });
        debug!("Listener {:?} subscribed to {}", id, kind);
        id
    }

    /// Registers a closure for `kind`
    pub fn on_fn<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&MonitorEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(kind, Arc::new(listener))
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(registrations) = listeners.get_mut(&kind) else {
            return false;
        };

        match registrations.iter().position(|r| r.id == id) {
            Some(pos) => {
                registrations.remove(pos);
                debug!("Listener {:?} unsubscribed from {}", id, kind);
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Drops every registration
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    /// Delivers `event` to a snapshot of the listeners registered for its kind
    pub fn emit(&self, event: &MonitorEvent) -> DispatchResult {
        let kind = event.kind();
        let snapshot: Vec<(ListenerId, Listener)> = self
            .listeners
            .lock()
            .get(&kind)
            .map(|regs| {
                regs.iter()
                    .map(|r| (r.id, Arc::clone(&r.listener)))
                    .collect()
            })
            .unwrap_or_default();

        let mut result = DispatchResult::default();

        for (id, listener) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => result.delivered += 1,
                Ok(Err(e)) => {
                    result.failed += 1;
                    warn!("⚠️ Listener {:?} failed on {}: {:#}", id, kind, e);
                }
                Err(_) => {
                    result.failed += 1;
                    warn!("⚠️ Listener {:?} panicked on {}", id, kind);
                }
            }
        }

        result
    }
}

/// Compares the data pointers, ignoring vtables
fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
