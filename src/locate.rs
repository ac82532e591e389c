//! Node location within a host scope.
//!
//! Resolves a logical reference — a plain identifier or a structural selector —
//! to at most one concrete node inside the subtree owned by a host element.
//! Resolution never leaves the scope root, which is the only isolation
//! mechanism between host instances sharing a document.
//!
//! Lookups re-resolve against the current tree by default. Caching exists only
//! where a caller opts in explicitly ([`LocatorMemo`]), because a cached hit
//! can go stale the moment the tree is rearranged.

use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, Node};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dom::{self, NodeKey};

/// Attribute an identifier reference is matched against.
pub const IDENTITY_ATTR: &str = "id";

lazy_static! {
    /// Structural selector syntax: optional tag, optional single attribute
    /// predicate with an optional (possibly quoted) value.
    /// Examples: `input`, `[data-target]`, `input[type=password]`.
    static ref SELECTOR_RE: Regex = Regex::new(
        r#"^([a-zA-Z][a-zA-Z0-9-]*)?(?:\[([a-zA-Z_][a-zA-Z0-9_-]*)(?:=(?:"([^"]*)"|'([^']*)'|([^\]]*)))?\])?$"#
    )
    .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// REFERENCES
// ═══════════════════════════════════════════════════════════════════════════════

/// A structural predicate: "first descendant with this tag and/or attribute".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    pub tag: Option<String>,
    pub attr: Option<String>,
    pub value: Option<String>,
}

impl Selector {
    /// Whether an element node satisfies this predicate.
    fn matches(&self, node: &Handle) -> bool {
        if let Some(tag) = &self.tag {
            if dom::tag_name(node).as_deref() != Some(tag.as_str()) {
                return false;
            }
        }
        if let Some(attr) = &self.attr {
            match &self.value {
                Some(value) => {
                    if dom::get_attribute(node, attr).as_deref() != Some(value.as_str()) {
                        return false;
                    }
                }
                None => {
                    if !dom::has_attribute(node, attr) {
                        return false;
                    }
                }
            }
        }
        self.tag.is_some() || self.attr.is_some()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            write!(f, "{}", tag)?;
        }
        if let Some(attr) = &self.attr {
            match &self.value {
                Some(value) => write!(f, "[{}={}]", attr, value)?,
                None => write!(f, "[{}]", attr)?,
            }
        }
        Ok(())
    }
}

/// Logical reference to a node inside a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeReference {
    /// Matched against the [`IDENTITY_ATTR`] of descendants.
    Identifier(String),
    /// First descendant satisfying the structural predicate.
    Structural(Selector),
}

impl NodeReference {
    pub fn id(name: impl Into<String>) -> Self {
        NodeReference::Identifier(name.into())
    }

    /// Parse a textual reference.
    ///
    /// `#name` and bare tokens are identifiers; anything carrying an attribute
    /// predicate (`[attr]` / `tag[attr=value]`) is structural. Tag-only
    /// selectors must be built with [`NodeReference::structural`] because a
    /// bare token always reads as an identifier.
    pub fn parse(input: &str) -> Option<NodeReference> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(name) = trimmed.strip_prefix('#') {
            return (!name.is_empty()).then(|| NodeReference::Identifier(name.to_string()));
        }
        if trimmed.contains('[') {
            return Self::structural(trimmed);
        }
        Some(NodeReference::Identifier(trimmed.to_string()))
    }

    /// Parse a structural selector, tag-only forms included.
    pub fn structural(input: &str) -> Option<NodeReference> {
        let caps = SELECTOR_RE.captures(input.trim())?;
        let selector = Selector {
            tag: caps.get(1).map(|m| m.as_str().to_lowercase()),
            attr: caps.get(2).map(|m| m.as_str().to_string()),
            value: caps
                .get(3)
                .or_else(|| caps.get(4))
                .or_else(|| caps.get(5))
                .map(|m| m.as_str().to_string()),
        };
        if selector.tag.is_none() && selector.attr.is_none() {
            return None;
        }
        Some(NodeReference::Structural(selector))
    }
}

impl fmt::Display for NodeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeReference::Identifier(name) => write!(f, "#{}", name),
            NodeReference::Structural(selector) => write!(f, "{}", selector),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TARGET REFERENCES
// ═══════════════════════════════════════════════════════════════════════════════

/// Non-owning handle to a located node.
///
/// Holds a `Weak` so a target never keeps tree nodes alive past the document.
/// A detaching host must [`invalidate`](TargetNodeRef::invalidate) or discard
/// every ref it handed out; an invalidated ref upgrades to `None` forever.
#[derive(Clone)]
pub struct TargetNodeRef {
    weak: Weak<Node>,
    key: NodeKey,
}

impl TargetNodeRef {
    pub fn new(node: &Handle) -> Self {
        TargetNodeRef {
            weak: Rc::downgrade(node),
            key: dom::node_key(node),
        }
    }

    /// Identity key recorded at resolution time. Stays comparable after
    /// invalidation, which keeps unsubscription symmetric with subscription.
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// The live node, if this ref is still valid.
    pub fn upgrade(&self) -> Option<Handle> {
        self.weak.upgrade()
    }

    pub fn is_valid(&self) -> bool {
        self.weak.strong_count() > 0
    }

    /// Sever the link to the node. Upgrades return `None` from here on.
    pub fn invalidate(&mut self) {
        self.weak = Weak::new();
    }
}

// Node carries no Debug impl, so print identity and validity only.
impl fmt::Debug for TargetNodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetNodeRef")
            .field("key", &self.key)
            .field("valid", &self.is_valid())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolve a reference to the first matching descendant of `scope_root`.
///
/// Absence is an expected, recoverable outcome — `None`, never an error. Each
/// call walks the current tree, so mutations between calls are always
/// reflected.
pub fn locate(scope_root: &Handle, reference: &NodeReference) -> Option<TargetNodeRef> {
    for node in dom::descendants(scope_root) {
        let hit = match reference {
            NodeReference::Identifier(name) => {
                dom::get_attribute(&node, IDENTITY_ATTR).as_deref() == Some(name.as_str())
            }
            NodeReference::Structural(selector) => selector.matches(&node),
        };
        if hit {
            return Some(TargetNodeRef::new(&node));
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPT-IN MEMOIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Explicit memo keyed by (scope identity, reference).
///
/// Only callers that document a caching policy should hold one of these; the
/// plain [`locate`] path never caches. Dead entries (invalidated or dropped
/// nodes) are re-resolved transparently.
#[derive(Default)]
pub struct LocatorMemo {
    entries: HashMap<(NodeKey, NodeReference), TargetNodeRef>,
}

impl LocatorMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve through the memo, filling it on miss.
    pub fn locate(&mut self, scope_root: &Handle, reference: &NodeReference) -> Option<TargetNodeRef> {
        let memo_key = (dom::node_key(scope_root), reference.clone());
        if let Some(cached) = self.entries.get(&memo_key) {
            if cached.is_valid() {
                return Some(cached.clone());
            }
            self.entries.remove(&memo_key);
        }
        let resolved = locate(scope_root, reference)?;
        self.entries.insert(memo_key, resolved.clone());
        Some(resolved)
    }

    /// Drop every entry resolved under one scope root.
    pub fn invalidate_scope(&mut self, scope: NodeKey) {
        self.entries.retain(|(root, _), _| *root != scope);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
