//! Markup ingestion.
//!
//! Parses externally authored documents with html5ever and scans the parsed
//! tree for enhancer host elements. Parsing is the only place markup enters
//! the system; from here on the runtime only observes and mutates the tree.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, RcDom};
use std::fmt;

use crate::dom;

/// Attribute that marks an element as an enhancer host.
///
/// The value names the registered behavior, e.g.
/// `<div data-enhancer="password-reveal">`.
pub const ENHANCER_ATTR: &str = "data-enhancer";

// ═══════════════════════════════════════════════════════════════════════════════
// PARSE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure to read a document at all. Everything downstream of a successful
/// parse degrades gracefully instead of erroring.
#[derive(Debug, Clone)]
pub struct MarkupError {
    pub message: String,
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to parse markup: {}", self.message)
    }
}

impl std::error::Error for MarkupError {}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a markup string into an rcdom tree.
///
/// html5ever recovers from malformed input the way browsers do, so this only
/// fails on I/O-level problems with the input itself.
pub fn parse_markup(html: &str) -> Result<RcDom, MarkupError> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| MarkupError {
            message: e.to_string(),
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// A host element found in the tree, paired with the behavior name it declares.
#[derive(Debug, Clone)]
pub struct DiscoveredHost {
    pub name: String,
    pub element: Handle,
}

/// Scan a parsed document for elements carrying [`ENHANCER_ATTR`].
///
/// Document order is preserved. Elements with an empty behavior name are
/// skipped; the markup still renders per its native semantics either way.
pub fn discover_hosts(document: &Handle) -> Vec<DiscoveredHost> {
    dom::descendants(document)
        .into_iter()
        .filter_map(|element| {
            let name = dom::get_attribute(&element, ENHANCER_ATTR)?;
            if name.trim().is_empty() {
                return None;
            }
            Some(DiscoveredHost {
                name: name.trim().to_string(),
                element,
            })
        })
        .collect()
}
