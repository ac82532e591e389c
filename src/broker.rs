//! Event subscription broker.
//!
//! One dispatch entry point per host instance: a host subscribes its own
//! [`HostId`] for every event kind it cares about, and routes internally by
//! kind to named handler methods. Removing that single entry point removes
//! all routed behavior, which keeps add/remove exactly symmetric and rules
//! out the classic leak of anonymous per-call handlers that can never be
//! removed individually.
//!
//! Subscription identity is the `(target, kind, host)` triple. For any host,
//! the active set after a sequence of attach/detach cycles equals exactly the
//! set implied by the current attached state — duplicates are rejected at
//! insert, removals demand an exact match.

use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::dom::{self, NodeKey};

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Closed enumeration of routable event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Click,
    Change,
    Input,
    Keydown,
    Focus,
    Blur,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::Change => "change",
            EventKind::Input => "input",
            EventKind::Keydown => "keydown",
            EventKind::Focus => "focus",
            EventKind::Blur => "blur",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event as delivered to subscribed entry points. Handlers run to
/// completion synchronously once invoked.
#[derive(Clone)]
pub struct Event {
    pub kind: EventKind,
    pub target: Handle,
}

impl Event {
    pub fn new(kind: EventKind, target: Handle) -> Self {
        Event { kind, target }
    }

    pub fn target_key(&self) -> NodeKey {
        dom::node_key(&self.target)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT IDENTITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity of a host instance acting as a dispatch entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostId(pub u32);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BROKER
// ═══════════════════════════════════════════════════════════════════════════════

/// Registry of `(target, kind) -> entry points`.
#[derive(Default)]
pub struct ListenerBroker {
    entries: HashMap<(NodeKey, EventKind), Vec<HostId>>,
}

impl ListenerBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry point for (target, kind).
    ///
    /// A duplicate subscribe without an intervening unsubscribe is absorbed
    /// and reported `false`; the active set is left untouched.
    pub fn subscribe(&mut self, target: NodeKey, kind: EventKind, host: HostId) -> bool {
        let slot = self.entries.entry((target, kind)).or_default();
        if slot.contains(&host) {
            debug!(%host, %kind, "duplicate subscribe absorbed");
            return false;
        }
        slot.push(host);
        true
    }

    /// Remove one `(target, kind, host)` triple. `false` if no such
    /// subscription was active.
    pub fn unsubscribe(&mut self, target: NodeKey, kind: EventKind, host: HostId) -> bool {
        let Some(slot) = self.entries.get_mut(&(target, kind)) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|entry| *entry != host);
        let removed = slot.len() != before;
        if slot.is_empty() {
            self.entries.remove(&(target, kind));
        }
        removed
    }

    /// Remove every subscription owned by one entry point. Returns how many
    /// triples were dropped.
    pub fn unsubscribe_host(&mut self, host: HostId) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, slot| {
            let before = slot.len();
            slot.retain(|entry| *entry != host);
            removed += before - slot.len();
            !slot.is_empty()
        });
        removed
    }

    /// Entry points subscribed for an event's (target, kind), in subscription
    /// order.
    pub fn subscribers(&self, target: NodeKey, kind: EventKind) -> Vec<HostId> {
        self.entries
            .get(&(target, kind))
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of active subscription triples.
    pub fn subscription_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Active triples owned by one entry point.
    pub fn count_for_host(&self, host: HostId) -> usize {
        self.entries
            .values()
            .map(|slot| slot.iter().filter(|entry| **entry == host).count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_markup;

    fn two_nodes() -> (markup5ever_rcdom::RcDom, NodeKey, NodeKey) {
        let dom = parse_markup("<button id=\"a\"></button><button id=\"b\"></button>").unwrap();
        let nodes = crate::dom::descendants(&dom.document);
        let a = nodes
            .iter()
            .find(|n| crate::dom::get_attribute(n, "id").as_deref() == Some("a"))
            .unwrap();
        let b = nodes
            .iter()
            .find(|n| crate::dom::get_attribute(n, "id").as_deref() == Some("b"))
            .unwrap();
        let (ka, kb) = (crate::dom::node_key(a), crate::dom::node_key(b));
        (dom, ka, kb)
    }

    #[test]
    fn test_subscribe_unsubscribe_symmetry() {
        let (_dom, a, _b) = two_nodes();
        let mut broker = ListenerBroker::new();

        assert!(broker.subscribe(a, EventKind::Click, HostId(1)));
        assert_eq!(broker.subscription_count(), 1);

        assert!(broker.unsubscribe(a, EventKind::Click, HostId(1)));
        assert_eq!(broker.subscription_count(), 0);

        // Removing again finds nothing.
        assert!(!broker.unsubscribe(a, EventKind::Click, HostId(1)));
    }

    #[test]
    fn test_duplicate_subscribe_is_absorbed() {
        let (_dom, a, _b) = two_nodes();
        let mut broker = ListenerBroker::new();

        assert!(broker.subscribe(a, EventKind::Click, HostId(1)));
        assert!(!broker.subscribe(a, EventKind::Click, HostId(1)));
        assert_eq!(broker.subscription_count(), 1);

        // One unsubscribe clears it completely.
        broker.unsubscribe(a, EventKind::Click, HostId(1));
        assert_eq!(broker.subscription_count(), 0);
    }

    #[test]
    fn test_entry_point_identity_separates_hosts() {
        let (_dom, a, b) = two_nodes();
        let mut broker = ListenerBroker::new();

        broker.subscribe(a, EventKind::Click, HostId(1));
        broker.subscribe(a, EventKind::Click, HostId(2));
        broker.subscribe(b, EventKind::Input, HostId(2));

        assert_eq!(
            broker.subscribers(a, EventKind::Click),
            vec![HostId(1), HostId(2)]
        );
        assert_eq!(broker.count_for_host(HostId(2)), 2);

        assert_eq!(broker.unsubscribe_host(HostId(2)), 2);
        assert_eq!(broker.subscribers(a, EventKind::Click), vec![HostId(1)]);
        assert_eq!(broker.count_for_host(HostId(2)), 0);
    }

    #[test]
    fn test_subscribers_keyed_by_kind_and_target() {
        let (_dom, a, b) = two_nodes();
        let mut broker = ListenerBroker::new();

        broker.subscribe(a, EventKind::Click, HostId(1));

        assert!(broker.subscribers(a, EventKind::Input).is_empty());
        assert!(broker.subscribers(b, EventKind::Click).is_empty());
        assert_eq!(broker.subscribers(a, EventKind::Click), vec![HostId(1)]);
    }
}
