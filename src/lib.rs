//! # markup-enhancer
//!
//! A runtime for attaching typed behavior to externally authored, pre-existing
//! markup. Nothing here renders: documents are parsed as delivered
//! (html5ever → rcdom) and enhancers only observe and mutate the tree they
//! were handed.
//!
//! ## Lifecycle Invariants
//!
//! 1. **Single entry point**: a host instance registers itself — never
//!    per-call closures — as the dispatch entry point for every event kind it
//!    subscribes, and routes internally by kind to named handler methods.
//! 2. **Subscription symmetry**: every `(target, kind, host)` subscribe issued
//!    during an attach cycle is matched by an identical unsubscribe during the
//!    corresponding detach cycle. After any signal sequence, the active set
//!    equals exactly what the current attached state implies.
//! 3. **Guarded transitions**: redundant insert/remove signals are absorbed as
//!    logged no-ops. The signal source is never handed an error, because its
//!    delivery is not guaranteed to be well-formed.
//! 4. **Scope isolation**: target resolution never leaves the host element's
//!    subtree. Instances sharing a document must not share target nodes.
//! 5. **Graceful degradation**: a missing target, a malformed configuration
//!    value, or an unregistered behavior leaves the original markup rendering
//!    per its native semantics. The worst observable failure is an
//!    unenhanced target.
//! 6. **Reference lifetime**: a resolved target ref is invalidated at detach
//!    and must be discarded, never reused. Re-resolution is the default;
//!    caching is opt-in and documented per field.
//!
//! ## Modules
//!
//! - [`dom`] - rcdom node identity, attributes, traversal
//! - [`parse`] - markup ingestion and host discovery
//! - [`locate`] - scope-bounded node resolution
//! - [`config`] - attribute-to-typed-field binding
//! - [`lifecycle`] - the attach/detach state machine
//! - [`broker`] - event kinds and the subscription broker
//! - [`toggle`] - idempotent two-state transitions on targets
//! - [`host`] - host instances and the `Enhancer` seam
//! - [`runtime`] - the document-level orchestrator
//! - [`enhancers`] - built-in behaviors

pub mod broker;
pub mod config;
pub mod dom;
pub mod enhancers;
pub mod host;
pub mod lifecycle;
pub mod locate;
pub mod parse;
pub mod runtime;
pub mod toggle;

#[cfg(test)]
mod scenario_tests;

pub use broker::{Event, EventKind, HostId, ListenerBroker};
pub use config::{BoundConfig, ConfigError, FieldDecl, FieldType, FieldValue};
pub use dom::NodeKey;
pub use host::{Enhancer, EnhancerContext, HostInstance, HostStatus, TargetBinding};
pub use lifecycle::{AttachmentLifecycle, LifecycleState, LifecycleViolation};
pub use locate::{locate, LocatorMemo, NodeReference, Selector, TargetNodeRef};
pub use parse::{discover_hosts, parse_markup, DiscoveredHost, MarkupError, ENHANCER_ATTR};
pub use runtime::{EnhancerRegistry, Runtime};
pub use toggle::{toggle, ToggleMode};
