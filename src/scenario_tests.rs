//! End-to-end scenario suite over the public runtime surface.
//!
//! Covers the behavioral contracts of the enhancer lifecycle: signal
//! idempotence, resource baselines across repeated cycles, toggle parity,
//! scope isolation between host instances, and config-error recovery.

use crate::dom;
use crate::enhancers::{register_builtins, PASSWORD_REVEAL};
use crate::lifecycle::LifecycleState;
use crate::locate::NodeReference;
use crate::runtime::Runtime;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn runtime_with(html: &str) -> Runtime {
    init_logging();
    let mut runtime = Runtime::from_markup(html).unwrap();
    register_builtins(&mut runtime);
    runtime.mount_discovered();
    runtime
}

const SINGLE_HOST: &str = "<div data-enhancer=\"password-reveal\" toggle-id=\"pwdToggle\">\
     <label>Password <input type=\"password\" id=\"pw\"></label>\
     <button id=\"pwdToggle\">show</button></div>";

#[test]
fn test_redundant_signals_final_state_authoritative() {
    let mut runtime = runtime_with(SINGLE_HOST);
    let id = runtime.statuses()[0].id;
    let baseline = runtime.active_subscriptions();
    assert!(baseline > 0);

    // Noisy delivery: attach-then-detach-then-attach plus duplicates in one
    // turn. Only the final signal decides the outcome.
    runtime.signal_inserted(id);
    runtime.signal_removed(id);
    runtime.signal_removed(id);
    runtime.signal_inserted(id);
    runtime.signal_inserted(id);

    let status = runtime.host_status(id).unwrap();
    assert_eq!(status.state, LifecycleState::Attached);
    assert_eq!(runtime.active_subscriptions(), baseline);

    runtime.signal_removed(id);
    let status = runtime.host_status(id).unwrap();
    assert_eq!(status.state, LifecycleState::Unattached);
    assert_eq!(runtime.active_subscriptions(), 0);
}

#[test]
fn test_repeated_cycles_never_grow_resources() {
    let mut runtime = runtime_with(SINGLE_HOST);
    let id = runtime.statuses()[0].id;
    runtime.signal_removed(id);

    for _ in 0..100 {
        runtime.signal_inserted(id);
        let attached = runtime.host_status(id).unwrap();
        assert_eq!(attached.active_subscriptions, 1);
        assert_eq!(attached.cached_targets, 2); // toggle + field

        runtime.signal_removed(id);
        let detached = runtime.host_status(id).unwrap();
        assert_eq!(detached.active_subscriptions, 0);
        assert_eq!(detached.cached_targets, 0);
    }
    assert_eq!(runtime.active_subscriptions(), 0);
}

#[test]
fn test_enhancement_survives_reattachment() {
    let mut runtime = runtime_with(SINGLE_HOST);
    let id = runtime.statuses()[0].id;
    let button = runtime.find(&NodeReference::id("pwdToggle")).unwrap();
    let field = runtime.find(&NodeReference::id("pw")).unwrap();

    // Reparenting cycle: detach, reattach, behavior identical.
    runtime.signal_removed(id);
    runtime.click(&button); // nobody listening
    assert_eq!(
        dom::get_attribute(&field, "type").as_deref(),
        Some("password")
    );

    runtime.signal_inserted(id);
    runtime.click(&button);
    assert_eq!(dom::get_attribute(&field, "type").as_deref(), Some("text"));
}

#[test]
fn test_toggle_parity_over_k_clicks() {
    let mut runtime = runtime_with(SINGLE_HOST);
    let button = runtime.find(&NodeReference::id("pwdToggle")).unwrap();
    let field = runtime.find(&NodeReference::id("pw")).unwrap();

    for k in 1..=10 {
        runtime.click(&button);
        let expected = if k % 2 == 1 { "text" } else { "password" };
        assert_eq!(
            dom::get_attribute(&field, "type").as_deref(),
            Some(expected),
            "after {} clicks",
            k
        );
    }
}

#[test]
fn test_password_reveal_scenario() {
    // toggle-id names the control, the descendant password
    // field flips to visible text on the first click and back on the second.
    let mut runtime = runtime_with(SINGLE_HOST);
    let button = runtime.find(&NodeReference::id("pwdToggle")).unwrap();
    let field = runtime.find(&NodeReference::id("pw")).unwrap();

    assert_eq!(
        dom::get_attribute(&field, "type").as_deref(),
        Some("password")
    );

    runtime.click(&button);
    assert_eq!(dom::get_attribute(&field, "type").as_deref(), Some("text"));

    runtime.click(&button);
    assert_eq!(
        dom::get_attribute(&field, "type").as_deref(),
        Some("password")
    );
}

#[test]
fn test_two_hosts_are_isolated() {
    let mut runtime = runtime_with(
        "<form id=\"a\" data-enhancer=\"password-reveal\" toggle-id=\"toggleA\">\
           <input type=\"password\" id=\"pwA\"><button id=\"toggleA\"></button></form>\
         <form id=\"b\" data-enhancer=\"password-reveal\" toggle-id=\"toggleB\">\
           <input type=\"password\" id=\"pwB\"><button id=\"toggleB\"></button></form>",
    );
    assert_eq!(runtime.host_count(), 2);

    let toggle_a = runtime.find(&NodeReference::id("toggleA")).unwrap();
    let pw_a = runtime.find(&NodeReference::id("pwA")).unwrap();
    let pw_b = runtime.find(&NodeReference::id("pwB")).unwrap();

    runtime.click(&toggle_a);
    assert_eq!(dom::get_attribute(&pw_a, "type").as_deref(), Some("text"));
    // Instance B's target is untouched.
    assert_eq!(
        dom::get_attribute(&pw_b, "type").as_deref(),
        Some("password")
    );
}

#[test]
fn test_malformed_number_config_recovers_with_report() {
    let runtime = runtime_with(
        "<div data-enhancer=\"input-limit\" max-length=\"abc\">\
         <input data-limited id=\"msg\" value=\"hi\"></div>",
    );
    let status = &runtime.statuses()[0];
    assert_eq!(status.state, LifecycleState::Attached);
    assert_eq!(status.config_errors, 1);
}

#[test]
fn test_repeated_notifications_keep_errors_bounded() {
    // An untrusted notification source may redeliver the same change
    // indefinitely; the per-host error report must not grow with it.
    let mut runtime = runtime_with(
        "<div id=\"host\" data-enhancer=\"input-limit\" max-length=\"abc\">\
         <input data-limited id=\"msg\" value=\"hi\"></div>",
    );
    let host = runtime.find(&NodeReference::id("host")).unwrap();
    let id = runtime.statuses()[0].id;
    assert_eq!(runtime.host_status(id).unwrap().config_errors, 1);

    for _ in 0..10 {
        runtime.notify_attribute_changed(&host, "max-length");
    }
    assert_eq!(runtime.host_status(id).unwrap().config_errors, 1);

    // Recovery drops the report entirely.
    runtime.update_attribute(&host, "max-length", "5");
    assert_eq!(runtime.host_status(id).unwrap().config_errors, 0);
}

#[test]
fn test_missing_target_degrades_gracefully() {
    // No password field anywhere: the host attaches, clicks go nowhere, the
    // original markup keeps its native semantics.
    let mut runtime = runtime_with(
        "<div data-enhancer=\"password-reveal\">\
         <button id=\"pwdToggle\">show</button></div>",
    );
    let status = &runtime.statuses()[0];
    assert_eq!(status.state, LifecycleState::Attached);
    assert_eq!(status.active_subscriptions, 1);
    assert_eq!(status.cached_targets, 1); // toggle resolved, field missing

    let button = runtime.find(&NodeReference::id("pwdToggle")).unwrap();
    runtime.click(&button); // routed, then no-ops at debug level
}

#[test]
fn test_unregistered_host_left_unenhanced() {
    init_logging();
    let mut runtime = Runtime::from_markup(
        "<div data-enhancer=\"password-reveal\">\
         <input type=\"password\" id=\"pw\"><button id=\"pwdToggle\"></button></div>",
    )
    .unwrap();
    // Nothing registered: discovery finds the host but mounts nothing.
    assert_eq!(runtime.mount_discovered(), 0);
    assert_eq!(runtime.host_count(), 0);

    let field = runtime.find(&NodeReference::id("pw")).unwrap();
    assert_eq!(
        dom::get_attribute(&field, "type").as_deref(),
        Some("password")
    );
}

#[test]
fn test_status_json_reports_enhancer_name() {
    let runtime = runtime_with(SINGLE_HOST);
    let json = runtime.status_json();
    assert_eq!(json[0]["enhancer"], PASSWORD_REVEAL);
    assert_eq!(json[0]["configErrors"], 0);
}
