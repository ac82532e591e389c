//! Built-in enhancer behaviors.
//!
//! Each behavior attaches to markup an author already wrote; if its targets
//! are missing the markup keeps working per its native semantics, just
//! unenhanced.

use tracing::debug;

use crate::broker::EventKind;
use crate::config::{BoundConfig, FieldDecl};
use crate::dom;
use crate::host::{Enhancer, EnhancerContext, TargetBinding};
use crate::locate::NodeReference;
use crate::runtime::Runtime;
use crate::toggle::{self, ToggleMode};

pub const PASSWORD_REVEAL: &str = "password-reveal";
pub const INPUT_LIMIT: &str = "input-limit";

/// Register every built-in behavior on a runtime.
pub fn register_builtins(runtime: &mut Runtime) {
    runtime.register(PASSWORD_REVEAL, || Box::new(PasswordReveal));
    runtime.register(INPUT_LIMIT, || Box::new(InputLimit));
}

// ═══════════════════════════════════════════════════════════════════════════════
// PASSWORD REVEAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Show/hide toggling for a password field.
///
/// Configuration:
/// - `toggle-id` (text, default `pwdToggle`): reference to the control whose
///   clicks flip the field.
/// - `field` (text, default `input[type=password]`): reference to the field
///   itself. Resolved once per attach cycle and kept for the attached
///   lifetime — deliberate caching, because the default selector stops
///   matching the moment the first flip rewrites `type`.
/// - `start-visible` (flag, default absent, live): reveal immediately on
///   attach; flipping the attribute while attached re-applies the mode
///   without touching subscriptions.
pub struct PasswordReveal;

impl PasswordReveal {
    fn apply_visibility(&self, ctx: &EnhancerContext<'_>) {
        let revealed = ctx.config.flag("start-visible").unwrap_or(false);
        let mode = if revealed {
            ToggleMode::Revealed
        } else {
            ToggleMode::Masked
        };
        match ctx.target("field") {
            Some(field) => {
                toggle::apply(field, mode);
            }
            None => debug!(enhancer = PASSWORD_REVEAL, "no field to apply visibility to"),
        }
    }
}

impl Enhancer for PasswordReveal {
    fn name(&self) -> &'static str {
        PASSWORD_REVEAL
    }

    fn declared_fields(&self) -> Vec<FieldDecl> {
        vec![
            FieldDecl::text("toggle-id", "pwdToggle"),
            FieldDecl::text("field", "input[type=password]"),
            FieldDecl::flag("start-visible", false).live(),
        ]
    }

    fn bindings(&self, config: &BoundConfig) -> Vec<TargetBinding> {
        let mut bindings = Vec::new();
        if let Some(reference) = config.text("toggle-id").and_then(NodeReference::parse) {
            bindings.push(TargetBinding::new(
                "toggle",
                reference,
                vec![EventKind::Click],
            ));
        }
        if let Some(reference) = config.text("field").and_then(NodeReference::parse) {
            bindings.push(TargetBinding::locate_only("field", reference));
        }
        bindings
    }

    fn after_attach(&mut self, ctx: &mut EnhancerContext<'_>) {
        if ctx.config.flag("start-visible") == Some(true) {
            self.apply_visibility(ctx);
        }
    }

    fn on_click(&mut self, ctx: &mut EnhancerContext<'_>) {
        if !ctx.event_is_from("toggle") {
            return;
        }
        let Some(field) = ctx.target("field") else {
            debug!(enhancer = PASSWORD_REVEAL, "click ignored: field never resolved");
            return;
        };
        if let Some(mode) = toggle::toggle(field) {
            if let Some(control) = ctx.target("toggle").and_then(|t| t.upgrade()) {
                let pressed = mode == ToggleMode::Revealed;
                dom::set_attribute(&control, "aria-pressed", if pressed { "true" } else { "false" });
            }
        }
    }

    fn on_config_changed(&mut self, changed: &[String], ctx: &mut EnhancerContext<'_>) {
        if changed.iter().any(|name| name == "start-visible") {
            self.apply_visibility(ctx);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INPUT LIMIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Flags an input whose `value` text exceeds a configured length.
///
/// Configuration:
/// - `max-length` (number, default 100, live): the threshold. Changing the
///   attribute while attached re-evaluates the flag with the new threshold,
///   without resubscribing.
/// - `field` (text, default `[data-limited]`): reference to the input.
///
/// The verdict is projected onto a `data-over-limit` attribute so styling
/// stays the markup author's concern.
pub struct InputLimit;

impl InputLimit {
    fn evaluate(&self, ctx: &EnhancerContext<'_>) {
        let max = ctx.config.number("max-length").unwrap_or(100.0);
        let Some(node) = ctx.target("field").and_then(|t| t.upgrade()) else {
            debug!(enhancer = INPUT_LIMIT, "no field to evaluate");
            return;
        };
        let length = dom::get_attribute(&node, "value")
            .map(|value| value.chars().count())
            .unwrap_or(0);
        if (length as f64) > max {
            dom::set_attribute(&node, "data-over-limit", "true");
        } else {
            dom::remove_attribute(&node, "data-over-limit");
        }
    }
}

impl Enhancer for InputLimit {
    fn name(&self) -> &'static str {
        INPUT_LIMIT
    }

    fn declared_fields(&self) -> Vec<FieldDecl> {
        vec![
            FieldDecl::number("max-length", 100.0).live(),
            FieldDecl::text("field", "[data-limited]"),
        ]
    }

    fn bindings(&self, config: &BoundConfig) -> Vec<TargetBinding> {
        match config.text("field").and_then(NodeReference::parse) {
            Some(reference) => vec![TargetBinding::new(
                "field",
                reference,
                vec![EventKind::Input],
            )],
            None => Vec::new(),
        }
    }

    fn on_input(&mut self, ctx: &mut EnhancerContext<'_>) {
        if ctx.event_is_from("field") {
            self.evaluate(ctx);
        }
    }

    fn on_config_changed(&mut self, changed: &[String], ctx: &mut EnhancerContext<'_>) {
        if changed.iter().any(|name| name == "max-length") {
            self.evaluate(ctx);
        }
    }
}
