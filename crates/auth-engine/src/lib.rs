//! Signer-backed sign-in for the authorization service.
//!
//! This crate provides:
//! - A REST client for the nonce, login, and token-exchange endpoints
//! - The `SigningGateway` boundary to the external signer
//! - `AuthenticationCoordinator`, which caches the session and re-runs the
//!   handshake when it goes stale
//! - An FSM-tracked lifecycle phase with change notifications

mod auth_fsm;
mod auth_service_client;
mod coordinator;
mod error;
mod freshness;
mod login_message;
mod signing_gateway;

pub use auth_fsm::phase_machine;
pub use auth_fsm::{
    AuthPhase, AuthStateCallback, AuthStateChangedPayload, PhaseInput, PhaseMachine,
    PhaseMachineState,
};
pub use auth_service_client::{
    AuthServiceClient, LoginProfile, LoginResponse, JWT_BEARER_GRANT_TYPE, LOGIN_PATH,
    NONCE_PATH, TOKEN_PATH,
};
pub use coordinator::AuthenticationCoordinator;
pub use error::{AuthError, AuthResult, HandshakeError, SIGN_IN_ERROR_PREFIX};
pub use freshness::{
    expires_in_for, is_session_fresh, parse_expires_in, session_window, SESSION_WINDOW_MINUTES,
};
pub use login_message::{create_login_raw_message, LoginRawMessage, LOGIN_MESSAGE_PREFIX};
pub use signing_gateway::{
    CapabilityDispatcher, CapabilityRequest, HttpCapabilityDispatcher, JsonRpcRequest,
    SigningGateway, SnapSigningGateway, SIGNING_HANDLER, SIGNING_ORIGIN, SIGNING_SNAP_ID,
};
