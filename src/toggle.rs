//! State toggling on discovered targets.
//!
//! Applies an idempotent two-state transition to a resolved target node by
//! rewriting its `type` attribute between `password` and `text`. One external
//! trigger flips exactly one step; repeated triggers alternate, never
//! accumulate. An absent or invalidated target is a debug-logged no-op,
//! never a fault — the original markup keeps its native semantics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom;
use crate::locate::TargetNodeRef;

/// Attribute the mode is projected onto.
pub const MODE_ATTR: &str = "type";

/// Two mutually exclusive visibility states of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToggleMode {
    /// Obscured entry (`type="password"`). The baseline state.
    Masked,
    /// Visible text (`type="text"`).
    Revealed,
}

impl ToggleMode {
    pub fn as_type_attr(&self) -> &'static str {
        match self {
            ToggleMode::Masked => "password",
            ToggleMode::Revealed => "text",
        }
    }

    /// Anything that is not explicitly revealed reads as masked.
    pub fn from_type_attr(value: &str) -> ToggleMode {
        if value == "text" {
            ToggleMode::Revealed
        } else {
            ToggleMode::Masked
        }
    }

    pub fn flipped(&self) -> ToggleMode {
        match self {
            ToggleMode::Masked => ToggleMode::Revealed,
            ToggleMode::Revealed => ToggleMode::Masked,
        }
    }
}

/// Current mode of a target, `None` if the ref no longer resolves.
pub fn current_mode(target: &TargetNodeRef) -> Option<ToggleMode> {
    let node = target.upgrade()?;
    let value = dom::get_attribute(&node, MODE_ATTR).unwrap_or_default();
    Some(ToggleMode::from_type_attr(&value))
}

/// Force a specific mode onto the target. Returns the applied mode, or `None`
/// (logged at debug) when the target is gone.
pub fn apply(target: &TargetNodeRef, mode: ToggleMode) -> Option<ToggleMode> {
    let Some(node) = target.upgrade() else {
        debug!(key = ?target.key(), "toggle skipped: target not resolved");
        return None;
    };
    dom::set_attribute(&node, MODE_ATTR, mode.as_type_attr());
    Some(mode)
}

/// Flip the target one step and return the new mode.
pub fn toggle(target: &TargetNodeRef) -> Option<ToggleMode> {
    let current = current_mode(target)?;
    apply(target, current.flipped())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::{locate, NodeReference};
    use crate::parse::parse_markup;

    fn password_target() -> (markup5ever_rcdom::RcDom, TargetNodeRef) {
        let dom = parse_markup("<form><input type=\"password\" id=\"pw\"></form>").unwrap();
        let root = dom.document.clone();
        let target = locate(&root, &NodeReference::id("pw")).unwrap();
        (dom, target)
    }

    #[test]
    fn test_toggle_flips_one_step() {
        let (_dom, target) = password_target();
        assert_eq!(current_mode(&target), Some(ToggleMode::Masked));
        assert_eq!(toggle(&target), Some(ToggleMode::Revealed));
        assert_eq!(
            dom::get_attribute(&target.upgrade().unwrap(), MODE_ATTR).as_deref(),
            Some("text")
        );
        assert_eq!(toggle(&target), Some(ToggleMode::Masked));
    }

    #[test]
    fn test_toggle_parity_over_many_applications() {
        let (_dom, target) = password_target();
        for k in 1..=9 {
            let mode = toggle(&target).unwrap();
            let expected = if k % 2 == 1 {
                ToggleMode::Revealed
            } else {
                ToggleMode::Masked
            };
            assert_eq!(mode, expected, "after {} triggers", k);
        }
    }

    #[test]
    fn test_invalidated_target_is_a_noop() {
        let (_dom, mut target) = password_target();
        target.invalidate();
        assert_eq!(toggle(&target), None);
        assert_eq!(apply(&target, ToggleMode::Revealed), None);
        assert_eq!(current_mode(&target), None);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let (_dom, target) = password_target();
        assert_eq!(apply(&target, ToggleMode::Revealed), Some(ToggleMode::Revealed));
        assert_eq!(apply(&target, ToggleMode::Revealed), Some(ToggleMode::Revealed));
        assert_eq!(current_mode(&target), Some(ToggleMode::Revealed));
    }
}
