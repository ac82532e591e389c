//! Document-level runtime.
//!
//! Owns the parsed host tree, the listener broker, the behavior registry and
//! every host instance placed in the document. All lifecycle transitions and
//! event dispatch happen on the caller's thread, run-to-completion: a host's
//! subscriptions are fully established before any event can be dispatched to
//! them, and unsubscription completes before the instance becomes eligible
//! for a subsequent attach. Independent hosts have no ordering guarantee
//! between each other; their scope roots are the only isolation.
//!
//! Insert/remove signals may arrive redundantly or interleaved — the runtime
//! forwards them and lets each instance's lifecycle guard absorb the noise.

use markup5ever_rcdom::{Handle, RcDom};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::broker::{Event, EventKind, HostId, ListenerBroker};
use crate::dom;
use crate::host::{Enhancer, HostInstance, HostStatus};
use crate::locate::{locate, NodeReference};
use crate::parse::{self, MarkupError};

// ═══════════════════════════════════════════════════════════════════════════════
// BEHAVIOR REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

type EnhancerFactory = Box<dyn Fn() -> Box<dyn Enhancer>>;

/// Name → factory registry for discovered behaviors.
#[derive(Default)]
pub struct EnhancerRegistry {
    factories: HashMap<String, EnhancerFactory>,
}

impl EnhancerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Enhancer> + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn Enhancer>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUNTIME
// ═══════════════════════════════════════════════════════════════════════════════

/// The enhancer runtime for one document.
pub struct Runtime {
    dom: RcDom,
    broker: ListenerBroker,
    registry: EnhancerRegistry,
    hosts: Vec<HostInstance>,
    next_host: u32,
}

impl Runtime {
    /// Parse externally authored markup and wrap it in a runtime with an
    /// empty registry.
    pub fn from_markup(html: &str) -> Result<Self, MarkupError> {
        Ok(Runtime {
            dom: parse::parse_markup(html)?,
            broker: ListenerBroker::new(),
            registry: EnhancerRegistry::new(),
            hosts: Vec::new(),
            next_host: 0,
        })
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Enhancer> + 'static,
    {
        self.registry.register(name, factory);
    }

    /// Root of the host document.
    pub fn document(&self) -> Handle {
        self.dom.document.clone()
    }

    /// Resolve a reference against the whole document. Convenience for
    /// callers synthesizing events against known markup.
    pub fn find(&self, reference: &NodeReference) -> Option<Handle> {
        locate(&self.dom.document, reference).and_then(|target| target.upgrade())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Host management
    // ───────────────────────────────────────────────────────────────────────────

    fn allocate_id(&mut self) -> HostId {
        let id = HostId(self.next_host);
        self.next_host += 1;
        id
    }

    /// Scan the document for `data-enhancer` hosts, instantiate registered
    /// behaviors and attach them. Unknown behavior names are skipped with a
    /// warning — that markup simply stays unenhanced. Returns the number of
    /// hosts mounted.
    pub fn mount_discovered(&mut self) -> usize {
        let discovered = parse::discover_hosts(&self.dom.document);
        let mut mounted = 0;
        for found in discovered {
            let Some(behavior) = self.registry.create(&found.name) else {
                warn!(name = %found.name, "no enhancer registered for discovered host");
                continue;
            };
            let id = self.allocate_id();
            let mut instance = HostInstance::new(id, found.element, behavior);
            instance.attach(&mut self.broker);
            self.hosts.push(instance);
            mounted += 1;
        }
        mounted
    }

    /// Place a behavior on a host element without attaching it. The caller
    /// delivers the insert signal when the element enters the live tree.
    pub fn add_host(&mut self, element: Handle, behavior: Box<dyn Enhancer>) -> HostId {
        let id = self.allocate_id();
        self.hosts.push(HostInstance::new(id, element, behavior));
        id
    }

    fn host_mut(&mut self, id: HostId) -> Option<&mut HostInstance> {
        self.hosts.iter_mut().find(|host| host.id() == id)
    }

    fn host(&self, id: HostId) -> Option<&HostInstance> {
        self.hosts.iter().find(|host| host.id() == id)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // External signals
    // ───────────────────────────────────────────────────────────────────────────

    /// "Attached to a live scope" notification. Redundant delivery is
    /// absorbed by the instance's lifecycle guard.
    pub fn signal_inserted(&mut self, id: HostId) {
        let broker = &mut self.broker;
        match self.hosts.iter_mut().find(|host| host.id() == id) {
            Some(host) => host.attach(broker),
            None => debug!(%id, "insert signal for unknown host"),
        }
    }

    /// "Detached from a live scope" notification. Redundant delivery is
    /// absorbed likewise.
    pub fn signal_removed(&mut self, id: HostId) {
        let broker = &mut self.broker;
        match self.hosts.iter_mut().find(|host| host.id() == id) {
            Some(host) => host.detach(broker),
            None => debug!(%id, "remove signal for unknown host"),
        }
    }

    /// Explicit re-check of one host's target locations (see
    /// [`HostInstance::recheck_targets`]).
    pub fn recheck(&mut self, id: HostId) -> usize {
        let broker = &mut self.broker;
        self.hosts
            .iter_mut()
            .find(|host| host.id() == id)
            .map(|host| host.recheck_targets(broker))
            .unwrap_or(0)
    }

    /// Change an attribute's text on an element and notify the owning host
    /// so live configuration fields re-bind.
    pub fn update_attribute(&mut self, element: &Handle, name: &str, value: &str) {
        dom::set_attribute(element, name, value);
        self.notify_attribute_changed(element, name);
    }

    /// Attribute-change notification for hosts whose element matches. Only
    /// live fields react; everything else waits for the next attach cycle.
    pub fn notify_attribute_changed(&mut self, element: &Handle, name: &str) {
        let key = dom::node_key(element);
        for host in self.hosts.iter_mut().filter(|h| h.element_key() == key) {
            host.attribute_changed(name);
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Event dispatch
    // ───────────────────────────────────────────────────────────────────────────

    /// Dispatch one event to every entry point subscribed for its
    /// (target, kind), in subscription order. Handlers run to completion
    /// before this returns; an event with no subscribers is a no-op.
    pub fn dispatch(&mut self, event: Event) {
        let subscribers = self.broker.subscribers(event.target_key(), event.kind);
        if subscribers.is_empty() {
            debug!(kind = %event.kind, "event had no subscribers");
            return;
        }
        for id in subscribers {
            if let Some(host) = self.host_mut(id) {
                host.route_event(&event);
            }
        }
    }

    /// Synthesize a click on a node.
    pub fn click(&mut self, node: &Handle) {
        self.dispatch(Event::new(EventKind::Click, node.clone()));
    }

    /// Synthesize an input event on a node.
    pub fn input(&mut self, node: &Handle) {
        self.dispatch(Event::new(EventKind::Input, node.clone()));
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Inspection
    // ───────────────────────────────────────────────────────────────────────────

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Total active subscription triples across all hosts.
    pub fn active_subscriptions(&self) -> usize {
        self.broker.subscription_count()
    }

    pub fn host_status(&self, id: HostId) -> Option<HostStatus> {
        self.host(id).map(|host| host.status(&self.broker))
    }

    pub fn statuses(&self) -> Vec<HostStatus> {
        self.hosts
            .iter()
            .map(|host| host.status(&self.broker))
            .collect()
    }

    /// All host statuses as JSON, for external tooling.
    pub fn status_json(&self) -> serde_json::Value {
        serde_json::to_value(self.statuses()).unwrap_or(serde_json::Value::Null)
    }
}
