//! Attachment lifecycle.
//!
//! A defensive state machine driving when discovery/binding happens (attach)
//! and when teardown happens (detach). The hosting runtime's delivery of
//! insert/remove signals is not guaranteed to be well-formed, so every
//! transition is guarded: a redundant signal produces a
//! [`LifecycleViolation`] for the caller to absorb and log, never an error
//! thrown back at the signal source.
//!
//! States and transitions:
//!
//! ```text
//! Unattached --insert--> Attaching --bind/locate/subscribe--> Attached
//! Attached   --remove--> Detaching --unsubscribe complete---> Unattached
//! Attaching  --remove--> Detaching            (mid-attach cancellation)
//! ```
//!
//! There is no terminal state; the machine cycles indefinitely and must
//! behave identically on every cycle.

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// VIOLATION CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const LIFE_REDUNDANT_ATTACH: &str = "ENH-LIFE-001";
pub const LIFE_REDUNDANT_DETACH: &str = "ENH-LIFE-002";

// ═══════════════════════════════════════════════════════════════════════════════
// STATES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    Unattached,
    Attaching,
    Attached,
    Detaching,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Unattached => "unattached",
            LifecycleState::Attaching => "attaching",
            LifecycleState::Attached => "attached",
            LifecycleState::Detaching => "detaching",
        };
        write!(f, "{}", name)
    }
}

/// A signal that arrived while the machine was in a state that already
/// implies it. Absorbed as a no-op by every caller in this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleViolation {
    pub code: String,
    pub state: LifecycleState,
    pub signal: String,
}

impl LifecycleViolation {
    fn new(code: &str, state: LifecycleState, signal: &str) -> Self {
        LifecycleViolation {
            code: code.to_string(),
            state,
            signal: signal.to_string(),
        }
    }
}

impl fmt::Display for LifecycleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] '{}' signal while {}",
            self.code, self.signal, self.state
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-host lifecycle driver. Starts `Unattached`; cycles forever.
#[derive(Debug)]
pub struct AttachmentLifecycle {
    state: LifecycleState,
}

impl Default for AttachmentLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl AttachmentLifecycle {
    pub fn new() -> Self {
        AttachmentLifecycle {
            state: LifecycleState::Unattached,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.state == LifecycleState::Attached
    }

    /// Accept an insert signal. Only `Unattached` may enter `Attaching`;
    /// anything else is a redundant signal reported back for absorption.
    pub fn begin_attach(&mut self) -> Result<(), LifecycleViolation> {
        match self.state {
            LifecycleState::Unattached => {
                self.state = LifecycleState::Attaching;
                Ok(())
            }
            state => Err(LifecycleViolation::new(
                LIFE_REDUNDANT_ATTACH,
                state,
                "insert",
            )),
        }
    }

    /// Discovery and subscription completed. A missing optional target is not
    /// fatal, so this is reached even with zero subscriptions.
    pub fn finish_attach(&mut self) {
        if self.state == LifecycleState::Attaching {
            self.state = LifecycleState::Attached;
        }
    }

    /// Accept a remove signal. `Attaching` is also a legal source so that a
    /// removal arriving mid-attach unwinds instead of dangling.
    pub fn begin_detach(&mut self) -> Result<(), LifecycleViolation> {
        match self.state {
            LifecycleState::Attached | LifecycleState::Attaching => {
                self.state = LifecycleState::Detaching;
                Ok(())
            }
            state => Err(LifecycleViolation::new(
                LIFE_REDUNDANT_DETACH,
                state,
                "remove",
            )),
        }
    }

    /// Unsubscription completed; eligible for a subsequent attach.
    pub fn finish_detach(&mut self) {
        if self.state == LifecycleState::Detaching {
            self.state = LifecycleState::Unattached;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut machine = AttachmentLifecycle::new();
        assert_eq!(machine.state(), LifecycleState::Unattached);

        machine.begin_attach().unwrap();
        assert_eq!(machine.state(), LifecycleState::Attaching);
        machine.finish_attach();
        assert!(machine.is_attached());

        machine.begin_detach().unwrap();
        assert_eq!(machine.state(), LifecycleState::Detaching);
        machine.finish_detach();
        assert_eq!(machine.state(), LifecycleState::Unattached);
    }

    #[test]
    fn test_redundant_attach_is_a_violation_not_a_transition() {
        let mut machine = AttachmentLifecycle::new();
        machine.begin_attach().unwrap();
        machine.finish_attach();

        let violation = machine.begin_attach().unwrap_err();
        assert_eq!(violation.code, LIFE_REDUNDANT_ATTACH);
        assert_eq!(violation.state, LifecycleState::Attached);
        // The machine did not move.
        assert!(machine.is_attached());
    }

    #[test]
    fn test_redundant_detach_is_a_violation_not_a_transition() {
        let mut machine = AttachmentLifecycle::new();
        let violation = machine.begin_detach().unwrap_err();
        assert_eq!(violation.code, LIFE_REDUNDANT_DETACH);
        assert_eq!(machine.state(), LifecycleState::Unattached);
    }

    #[test]
    fn test_mid_attach_cancellation_unwinds() {
        let mut machine = AttachmentLifecycle::new();
        machine.begin_attach().unwrap();

        // Removal lands while still Attaching.
        machine.begin_detach().unwrap();
        machine.finish_detach();
        assert_eq!(machine.state(), LifecycleState::Unattached);

        // And the machine is immediately reusable.
        machine.begin_attach().unwrap();
        machine.finish_attach();
        assert!(machine.is_attached());
    }

    #[test]
    fn test_cycles_repeat_identically() {
        let mut machine = AttachmentLifecycle::new();
        for _ in 0..50 {
            machine.begin_attach().unwrap();
            machine.finish_attach();
            machine.begin_detach().unwrap();
            machine.finish_detach();
        }
        assert_eq!(machine.state(), LifecycleState::Unattached);
    }
}
