//! Host-tree helpers over rcdom.
//!
//! The runtime never synthesizes markup. Everything in this module reads or
//! mutates nodes of an externally parsed tree. Node identity is the `Rc`
//! allocation address, stable for as long as the document owns the node.

use html5ever::{namespace_url, ns, Attribute, LocalName, QualName};
use markup5ever_rcdom::{Handle, NodeData};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tendril::StrTendril;

// ═══════════════════════════════════════════════════════════════════════════════
// NODE IDENTITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Stable identity for a node within one document.
///
/// Derived from the node's allocation address, so it is only meaningful while
/// the document keeps the node alive. Never dereferenced — used purely as a
/// map key for subscriptions and memo entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey(usize);

/// Identity key for a node handle.
pub fn node_key(node: &Handle) -> NodeKey {
    NodeKey(Rc::as_ptr(node) as usize)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENT ACCESSORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Check whether a node is an element.
pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// Lowercased tag name of an element node, `None` for non-elements.
pub fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_lowercase()),
        _ => None,
    }
}

/// Read an attribute value. `None` for non-elements or absent attributes.
pub fn get_attribute(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Check attribute presence without reading the value.
pub fn has_attribute(node: &Handle, attr_name: &str) -> bool {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .any(|attr| &*attr.name.local == attr_name),
        _ => false,
    }
}

/// Set an attribute, replacing any existing value. No-op on non-elements.
pub fn set_attribute(node: &Handle, attr_name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        for attr in attrs.iter_mut() {
            if &*attr.name.local == attr_name {
                attr.value = StrTendril::from(value);
                return;
            }
        }
        attrs.push(Attribute {
            name: QualName::new(None, ns!(), LocalName::from(attr_name)),
            value: StrTendril::from(value),
        });
    }
}

/// Remove an attribute if present. No-op on non-elements.
pub fn remove_attribute(node: &Handle, attr_name: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        attrs
            .borrow_mut()
            .retain(|attr| &*attr.name.local != attr_name);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRAVERSAL
// ═══════════════════════════════════════════════════════════════════════════════

/// All element descendants of `root` in document order, excluding `root`
/// itself. The snapshot is taken eagerly so callers may mutate attributes
/// while iterating.
pub fn descendants(root: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    let mut stack: Vec<Handle> = root.children.borrow().iter().rev().cloned().collect();
    while let Some(node) = stack.pop() {
        for child in node.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
        if is_element(&node) {
            out.push(node);
        }
    }
    out
}
