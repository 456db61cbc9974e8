//! Sign-in lifecycle phase, tracked with rust-fsm.
//!
//! The phase is an observable view of what the coordinator is doing. It never
//! gates an operation; `AuthState::is_signed_in` does that.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐  SessionRestored / HandshakeSucceeded
//! │    SignedOut    │ ─────────────────────────────────────┐
//! └────────┬────────┘ (initial)                            │
//!          │ SignInAttempt                                 │
//!          ▼                                               │
//! ┌─────────────────┐  HandshakeFailed ──► SignedOut       │
//! │    SigningIn    │                                      │
//! └────────┬────────┘                                      │
//!          │ HandshakeSucceeded                            │
//!          ▼                                               │
//! ┌─────────────────┐ ◄────────────────────────────────────┘
//! │    SignedIn     │
//! └──┬───────────┬──┘
//!    │           │ SignInAttempt / SessionStale
//!    │           ▼
//!    │   ┌─────────────────┐
//!    │   │   Refreshing    │ ── HandshakeSucceeded / HandshakeFailed ──► SignedIn
//!    │   └────────┬────────┘
//!    │ SignOutRequested
//!    ▼            ▼
//! ┌─────────────────┐
//! │   SigningOut    │ ── SignOutComplete ──► SignedOut
//! └─────────────────┘ ── SignOutFailed ──► SignedIn
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub phase_machine(SignedOut)

    SignedOut => {
        SessionRestored => SignedIn,
        SignInAttempt => SigningIn,
        // A handshake committed after a concurrent sign-out
        HandshakeSucceeded => SignedIn,
        HandshakeFailed => SignedOut
    },
    SigningIn => {
        HandshakeSucceeded => SignedIn,
        HandshakeFailed => SignedOut
    },
    SignedIn => {
        SignInAttempt => Refreshing,
        SessionStale => Refreshing,
        SignOutRequested => SigningOut
    },
    Refreshing => {
        HandshakeSucceeded => SignedIn,
        // Previous session is left in place
        HandshakeFailed => SignedIn,
        SignOutRequested => SigningOut
    },
    SigningOut => {
        SignOutComplete => SignedOut,
        // Persisting the signed-out record failed
        SignOutFailed => SignedIn
    }
}

pub use phase_machine::Input as PhaseInput;
pub use phase_machine::State as PhaseMachineState;
pub use phase_machine::StateMachine as PhaseMachine;

/// Lifecycle phase for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// No session.
    SignedOut,
    /// First handshake in flight.
    SigningIn,
    /// Session held.
    SignedIn,
    /// Handshake in flight while a session is held.
    Refreshing,
    /// Sign-out being committed.
    SigningOut,
}

impl AuthPhase {
    /// Returns true if a session is held and no handshake is running.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthPhase::SignedIn)
    }

    /// Returns true for in-progress phases.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthPhase::SigningIn | AuthPhase::Refreshing | AuthPhase::SigningOut
        )
    }
}

impl From<&PhaseMachineState> for AuthPhase {
    fn from(state: &PhaseMachineState) -> Self {
        match state {
            PhaseMachineState::SignedOut => AuthPhase::SignedOut,
            PhaseMachineState::SigningIn => AuthPhase::SigningIn,
            PhaseMachineState::SignedIn => AuthPhase::SignedIn,
            PhaseMachineState::Refreshing => AuthPhase::Refreshing,
            PhaseMachineState::SigningOut => AuthPhase::SigningOut,
        }
    }
}

/// Payload for phase change notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStateChangedPayload {
    /// New phase.
    pub phase: AuthPhase,
    /// Whether the stored state holds a session.
    pub is_signed_in: bool,
    /// Profile id of the held session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
}

/// Callback type for phase change notifications.
pub type AuthStateCallback = Box<dyn Fn(AuthStateChangedPayload) + Send + Sync>;
