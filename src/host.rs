//! Host instances and the enhancer behavior seam.
//!
//! A [`HostInstance`] owns everything one enhancer placed in the tree needs:
//! its scope root (the host element), its lifecycle state, its bound
//! configuration, and its resolved targets with their subscriptions. None of
//! that is ever shared with another instance.
//!
//! The instance — not a per-handler closure — is the broker entry point. An
//! incoming event is routed by its kind to the behavior's named handler
//! method (`on_click`, `on_input`, ...), which is what makes detach-time
//! unsubscription trivially symmetric with attach-time subscription.
//!
//! Attach order: guard, bind config, resolve bindings inside
//! the host scope, subscribe, then Attached — so subscriptions are fully
//! established before any event can reach the instance. Detach reverses it:
//! guard, unsubscribe every recorded triple, invalidate every target ref,
//! then Unattached.

use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::broker::{Event, EventKind, HostId, ListenerBroker};
use crate::config::{self, BoundConfig, FieldDecl};
use crate::dom::{self, NodeKey};
use crate::lifecycle::{AttachmentLifecycle, LifecycleState};
use crate::locate::{locate, NodeReference, TargetNodeRef};

// ═══════════════════════════════════════════════════════════════════════════════
// BEHAVIOR SEAM
// ═══════════════════════════════════════════════════════════════════════════════

/// One target a behavior wants resolved at attach time, with the event kinds
/// to subscribe on it. An empty kind list means locate-only: the behavior
/// keeps a handle to the node but receives no events from it.
#[derive(Debug, Clone)]
pub struct TargetBinding {
    pub name: String,
    pub reference: NodeReference,
    pub kinds: Vec<EventKind>,
}

impl TargetBinding {
    pub fn new(name: impl Into<String>, reference: NodeReference, kinds: Vec<EventKind>) -> Self {
        TargetBinding {
            name: name.into(),
            reference,
            kinds,
        }
    }

    pub fn locate_only(name: impl Into<String>, reference: NodeReference) -> Self {
        Self::new(name, reference, Vec::new())
    }
}

/// What a routed handler sees: the host scope, the bound configuration, the
/// triggering event (absent for lifecycle hooks), and the targets resolved at
/// attach time.
pub struct EnhancerContext<'a> {
    pub host: &'a Handle,
    pub config: &'a BoundConfig,
    pub event: Option<&'a Event>,
    resolved: &'a [ResolvedTarget],
}

impl EnhancerContext<'_> {
    /// The target resolved for a named binding, if it was found.
    pub fn target(&self, name: &str) -> Option<&TargetNodeRef> {
        self.resolved
            .iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.target.as_ref())
    }

    /// Whether the triggering event came from the named binding's node.
    pub fn event_is_from(&self, name: &str) -> bool {
        match (self.event, self.target(name)) {
            (Some(event), Some(target)) => event.target_key() == target.key(),
            _ => false,
        }
    }
}

/// A behavioral unit attached to pre-existing markup.
///
/// Implementations declare configuration fields and target bindings, then
/// receive events through the named per-kind methods. All methods default to
/// no-ops; a behavior overrides only what it routes.
pub trait Enhancer {
    /// Registered behavior name (what `data-enhancer` values refer to).
    fn name(&self) -> &'static str;

    /// Configuration fields read from the host element at attach time.
    fn declared_fields(&self) -> Vec<FieldDecl>;

    /// Targets to resolve inside the host scope, derived from bound config.
    fn bindings(&self, config: &BoundConfig) -> Vec<TargetBinding>;

    /// Runs once per attach cycle, after subscriptions are established.
    fn after_attach(&mut self, _ctx: &mut EnhancerContext<'_>) {}

    fn on_click(&mut self, _ctx: &mut EnhancerContext<'_>) {}
    fn on_change(&mut self, _ctx: &mut EnhancerContext<'_>) {}
    fn on_input(&mut self, _ctx: &mut EnhancerContext<'_>) {}
    fn on_keydown(&mut self, _ctx: &mut EnhancerContext<'_>) {}
    fn on_focus(&mut self, _ctx: &mut EnhancerContext<'_>) {}
    fn on_blur(&mut self, _ctx: &mut EnhancerContext<'_>) {}

    /// A live configuration field was re-bound while attached. Dependent
    /// behavior must be re-derived here without touching subscriptions.
    fn on_config_changed(&mut self, _changed: &[String], _ctx: &mut EnhancerContext<'_>) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVED TARGETS
// ═══════════════════════════════════════════════════════════════════════════════

/// A binding after attach-time resolution. `target` is `None` when the
/// reference found nothing — a missing optional target is not fatal.
struct ResolvedTarget {
    name: String,
    reference: NodeReference,
    kinds: Vec<EventKind>,
    target: Option<TargetNodeRef>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATUS SNAPSHOT
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializable per-host report for external inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStatus {
    pub id: HostId,
    pub enhancer: String,
    pub state: LifecycleState,
    pub active_subscriptions: usize,
    pub cached_targets: usize,
    pub absorbed_signals: u32,
    pub config_errors: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST INSTANCE
// ═══════════════════════════════════════════════════════════════════════════════

/// One enhancer placed in the tree.
pub struct HostInstance {
    id: HostId,
    element: Handle,
    behavior: Box<dyn Enhancer>,
    fields: Vec<FieldDecl>,
    lifecycle: AttachmentLifecycle,
    config: BoundConfig,
    resolved: Vec<ResolvedTarget>,
    absorbed_signals: u32,
}

impl HostInstance {
    pub fn new(id: HostId, element: Handle, behavior: Box<dyn Enhancer>) -> Self {
        let fields = behavior.declared_fields();
        HostInstance {
            id,
            element,
            behavior,
            fields,
            lifecycle: AttachmentLifecycle::new(),
            config: BoundConfig::default(),
            resolved: Vec::new(),
            absorbed_signals: 0,
        }
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    pub fn element(&self) -> &Handle {
        &self.element
    }

    pub fn element_key(&self) -> NodeKey {
        dom::node_key(&self.element)
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn is_attached(&self) -> bool {
        self.lifecycle.is_attached()
    }

    pub fn config(&self) -> &BoundConfig {
        &self.config
    }

    /// Drive the attach cycle: bind config, resolve bindings, subscribe.
    ///
    /// A redundant insert signal is absorbed (logged, counted) without
    /// touching any state. NotFound bindings still let the instance reach
    /// Attached, just with fewer (possibly zero) subscriptions.
    pub fn attach(&mut self, broker: &mut ListenerBroker) {
        if let Err(violation) = self.lifecycle.begin_attach() {
            debug!(host = %self.id, "{} absorbed", violation);
            self.absorbed_signals += 1;
            return;
        }

        self.config = config::bind(&self.element, &self.fields);

        let bindings = self.behavior.bindings(&self.config);
        let mut resolved = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let target = locate(&self.element, &binding.reference);
            match &target {
                Some(target) => {
                    for kind in &binding.kinds {
                        broker.subscribe(target.key(), *kind, self.id);
                    }
                }
                None => {
                    debug!(
                        host = %self.id,
                        binding = %binding.name,
                        reference = %binding.reference,
                        "target not found; attaching without it"
                    );
                }
            }
            resolved.push(ResolvedTarget {
                name: binding.name,
                reference: binding.reference,
                kinds: binding.kinds,
                target,
            });
        }
        self.resolved = resolved;

        self.lifecycle.finish_attach();

        let mut ctx = EnhancerContext {
            host: &self.element,
            config: &self.config,
            event: None,
            resolved: &self.resolved,
        };
        self.behavior.after_attach(&mut ctx);
    }

    /// Drive the detach cycle: unsubscribe every recorded triple, invalidate
    /// and discard every target ref. Legal from Attaching too, so a removal
    /// arriving mid-attach unwinds instead of dangling. Redundant remove
    /// signals are absorbed.
    pub fn detach(&mut self, broker: &mut ListenerBroker) {
        if let Err(violation) = self.lifecycle.begin_detach() {
            debug!(host = %self.id, "{} absorbed", violation);
            self.absorbed_signals += 1;
            return;
        }

        let id = self.id;
        for entry in &mut self.resolved {
            if let Some(target) = entry.target.as_mut() {
                for kind in &entry.kinds {
                    broker.unsubscribe(target.key(), *kind, id);
                }
                target.invalidate();
            }
        }
        self.resolved.clear();

        self.lifecycle.finish_detach();
    }

    /// Route a dispatched event to the behavior's named handler for its kind.
    /// Events reaching a non-attached instance are dropped quietly.
    pub fn route_event(&mut self, event: &Event) {
        if !self.lifecycle.is_attached() {
            debug!(host = %self.id, kind = %event.kind, "event dropped: not attached");
            return;
        }
        let mut ctx = EnhancerContext {
            host: &self.element,
            config: &self.config,
            event: Some(event),
            resolved: &self.resolved,
        };
        match event.kind {
            EventKind::Click => self.behavior.on_click(&mut ctx),
            EventKind::Change => self.behavior.on_change(&mut ctx),
            EventKind::Input => self.behavior.on_input(&mut ctx),
            EventKind::Keydown => self.behavior.on_keydown(&mut ctx),
            EventKind::Focus => self.behavior.on_focus(&mut ctx),
            EventKind::Blur => self.behavior.on_blur(&mut ctx),
        }
    }

    /// The `(target, kind)` pairs this instance's current resolution implies.
    /// Two bindings resolving to the same node collapse into one pair, which
    /// matches what the broker actually stores.
    fn desired_subscriptions(&self) -> HashSet<(NodeKey, EventKind)> {
        self.resolved
            .iter()
            .filter_map(|entry| entry.target.as_ref().map(|t| (t.key(), &entry.kinds)))
            .flat_map(|(key, kinds)| kinds.iter().map(move |kind| (key, *kind)))
            .collect()
    }

    /// Explicit re-check of target location while attached (the instance
    /// never polls). Bindings whose node moved or appeared are re-resolved;
    /// the active subscription set is then diffed against the new desired
    /// set, so a triple shared by two bindings survives one of them moving
    /// away. Returns the number of bindings that changed.
    pub fn recheck_targets(&mut self, broker: &mut ListenerBroker) -> usize {
        if !self.lifecycle.is_attached() {
            return 0;
        }
        let id = self.id;
        let before = self.desired_subscriptions();
        let mut changed = 0;
        for entry in &mut self.resolved {
            let fresh = locate(&self.element, &entry.reference);
            let fresh_key = fresh.as_ref().map(TargetNodeRef::key);
            let current_key = entry.target.as_ref().map(TargetNodeRef::key);
            if fresh_key != current_key {
                entry.target = fresh;
                changed += 1;
            }
        }
        let after = self.desired_subscriptions();
        for (key, kind) in before.difference(&after) {
            broker.unsubscribe(*key, *kind, id);
        }
        for (key, kind) in after.difference(&before) {
            broker.subscribe(*key, *kind, id);
        }
        changed
    }

    /// An external attribute changed while attached. Re-reads live fields
    /// only; if any value moved, the behavior re-derives without any
    /// resubscription.
    pub fn attribute_changed(&mut self, attr_name: &str) {
        if !self.lifecycle.is_attached() {
            return;
        }
        if !self
            .fields
            .iter()
            .any(|field| field.live && field.name == attr_name)
        {
            debug!(host = %self.id, attr = attr_name, "attribute change ignored: not a live field");
            return;
        }
        let changed = config::refresh(&self.element, &self.fields, &mut self.config);
        if changed.is_empty() {
            return;
        }
        let mut ctx = EnhancerContext {
            host: &self.element,
            config: &self.config,
            event: None,
            resolved: &self.resolved,
        };
        self.behavior.on_config_changed(&changed, &mut ctx);
    }

    /// Snapshot for external inspection.
    pub fn status(&self, broker: &ListenerBroker) -> HostStatus {
        HostStatus {
            id: self.id,
            enhancer: self.behavior.name().to_string(),
            state: self.lifecycle.state(),
            active_subscriptions: broker.count_for_host(self.id),
            cached_targets: self
                .resolved
                .iter()
                .filter(|entry| entry.target.is_some())
                .count(),
            absorbed_signals: self.absorbed_signals,
            config_errors: self.config.errors.len(),
        }
    }
}
