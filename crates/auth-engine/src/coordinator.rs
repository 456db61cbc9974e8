//! Sign-in coordinator.
//!
//! `AuthenticationCoordinator` decides when a cached session can be reused and
//! otherwise runs the nonce, login, and token-exchange handshake. The
//! persisted `AuthState` is written only after all three steps succeed, so a
//! failed handshake leaves it exactly as it was.
//!
//! At most one handshake runs per coordinator. Callers that need one while
//! another is in flight await the same execution and see the same outcome.

use crate::auth_fsm::{
    AuthPhase, AuthStateCallback, AuthStateChangedPayload, PhaseInput, PhaseMachine,
};
use crate::auth_service_client::AuthServiceClient;
use crate::freshness::{expires_in_for, is_session_fresh};
use crate::login_message::create_login_raw_message;
use crate::signing_gateway::SigningGateway;
use crate::{AuthError, AuthResult, HandshakeError};
use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared, WeakShared};
use parking_lot::Mutex;
use session_storage::{AuthState, SessionData, SessionProfile, SessionStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type HandshakeTask = BoxFuture<'static, Result<SessionData, HandshakeError>>;

/// The running handshake. Only callers hold it strongly, so a handshake
/// every caller has abandoned is dropped with its last caller.
struct InFlight {
    id: u64,
    handshake: WeakShared<HandshakeTask>,
}

/// Coordinates sign-in, cached-token reuse, and sign-out.
///
/// Cheap to clone; clones share the same store and in-flight handshake.
#[derive(Clone)]
pub struct AuthenticationCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    client: AuthServiceClient,
    signer: Arc<dyn SigningGateway>,
    store: SessionStore,
    /// Observable lifecycle phase. Never consulted for gating.
    fsm: Mutex<PhaseMachine>,
    state_callback: Mutex<Option<AuthStateCallback>>,
    in_flight: Mutex<Option<InFlight>>,
    next_handshake_id: AtomicU64,
}

impl AuthenticationCoordinator {
    /// Create a coordinator over `store`. A store that already holds a
    /// signed-in record starts in the `SignedIn` phase.
    pub fn new(
        client: AuthServiceClient,
        signer: Arc<dyn SigningGateway>,
        store: SessionStore,
    ) -> Self {
        let mut fsm = PhaseMachine::new();
        if store.snapshot().is_signed_in() && fsm.consume(&PhaseInput::SessionRestored).is_err() {
            debug!("Ignoring restored session phase input");
        }

        Self {
            inner: Arc::new(Inner {
                client,
                signer,
                store,
                fsm: Mutex::new(fsm),
                state_callback: Mutex::new(None),
                in_flight: Mutex::new(None),
                next_handshake_id: AtomicU64::new(0),
            }),
        }
    }

    /// Set a callback to be notified of phase changes.
    pub fn set_state_callback(&self, callback: AuthStateCallback) {
        *self.inner.state_callback.lock() = Some(callback);
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> AuthPhase {
        AuthPhase::from(self.inner.fsm.lock().state())
    }

    /// Snapshot of the persisted auth state.
    pub fn auth_state(&self) -> Arc<AuthState> {
        self.inner.store.snapshot()
    }

    pub fn is_signed_in(&self) -> bool {
        self.inner.store.snapshot().is_signed_in()
    }

    /// Run the full handshake regardless of any cached session and return
    /// the new access token.
    pub async fn perform_sign_in(&self) -> AuthResult<String> {
        let session = self.handshake(PhaseInput::SignInAttempt).await?;
        Ok(session.access_token)
    }

    /// Access token for the current session.
    ///
    /// Returns the cached token while the session is fresh. A stale session
    /// triggers a full handshake.
    pub async fn get_bearer_token(&self) -> AuthResult<String> {
        match self.fresh_session()? {
            Some(session) => Ok(session.access_token),
            None => {
                let session = self.handshake(PhaseInput::SessionStale).await?;
                Ok(session.access_token)
            }
        }
    }

    /// Profile for the current session. Profile and token are only ever
    /// obtained together, so a stale session triggers a full handshake.
    pub async fn get_session_profile(&self) -> AuthResult<SessionProfile> {
        match self.fresh_session()? {
            Some(session) => Ok(session.profile),
            None => {
                let session = self.handshake(PhaseInput::SessionStale).await?;
                Ok(session.profile)
            }
        }
    }

    /// Clear the session. No network call.
    pub fn perform_sign_out(&self) -> AuthResult<()> {
        if !self.is_signed_in() {
            return Err(AuthError::NotAuthenticated);
        }

        self.inner.transition(PhaseInput::SignOutRequested);
        match self.inner.store.replace(AuthState::signed_out()) {
            Ok(_) => {
                self.inner.transition(PhaseInput::SignOutComplete);
                info!("Signed out");
                Ok(())
            }
            Err(e) => {
                self.inner.transition(PhaseInput::SignOutFailed);
                Err(e.into())
            }
        }
    }

    /// The cached session if signed in and fresh, `None` if signed in but
    /// stale. Fails when signed out, whatever session data is present.
    fn fresh_session(&self) -> AuthResult<Option<SessionData>> {
        let state = self.inner.store.snapshot();
        if !state.is_signed_in() {
            return Err(AuthError::NotAuthenticated);
        }

        let fresh = state
            .session()
            .filter(|session| is_session_fresh(session, Utc::now()))
            .cloned();
        if fresh.is_none() {
            debug!("Cached session is stale");
        }
        Ok(fresh)
    }

    /// Start a handshake, or join the one already running.
    async fn handshake(&self, trigger: PhaseInput) -> AuthResult<SessionData> {
        let running = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref().and_then(|in_flight| in_flight.handshake.upgrade()) {
                Some(running) => {
                    debug!("Joining in-flight handshake");
                    running
                }
                None => {
                    let id = self.inner.next_handshake_id.fetch_add(1, Ordering::Relaxed);
                    let mut guard = HandshakeGuard {
                        inner: Arc::clone(&self.inner),
                        id,
                        finished: false,
                    };
                    let running: Shared<HandshakeTask> = async move {
                        let result = guard.inner.run_handshake().await;
                        guard.finished = true;
                        result
                    }
                    .boxed()
                    .shared();

                    // Recorded under the slot lock so joiners cannot finish first
                    self.inner.transition(trigger);
                    *slot = running
                        .downgrade()
                        .map(|handshake| InFlight { id, handshake });
                    running
                }
            }
        };

        running.await.map_err(AuthError::from)
    }
}

/// Owned by a handshake future. Releases the in-flight slot when the
/// handshake completes or is dropped unfinished.
struct HandshakeGuard {
    inner: Arc<Inner>,
    id: u64,
    finished: bool,
}

impl Drop for HandshakeGuard {
    fn drop(&mut self) {
        let mut slot = self.inner.in_flight.lock();
        if slot.as_ref().map(|in_flight| in_flight.id) != Some(self.id) {
            return;
        }
        slot.take();

        if !self.finished {
            warn!("Sign-in handshake abandoned by every caller");
            self.inner.transition(PhaseInput::HandshakeFailed);
        }
    }
}

impl Inner {
    /// Run the handshake once and fold every failure into a `HandshakeError`.
    async fn run_handshake(&self) -> Result<SessionData, HandshakeError> {
        match self.try_handshake().await {
            Ok(session) => {
                info!(
                    profile_id = %session.profile.profile_id,
                    "Sign-in handshake completed"
                );
                self.transition(PhaseInput::HandshakeSucceeded);
                Ok(session)
            }
            Err(e) => {
                let err = match e {
                    AuthError::SignIn(err) => err,
                    other => HandshakeError::Unexpected(other.to_string()),
                };
                warn!(error = %err, "Sign-in handshake failed");
                self.transition(PhaseInput::HandshakeFailed);
                Err(err)
            }
        }
    }

    async fn try_handshake(&self) -> AuthResult<SessionData> {
        // Identify
        let public_key = self.signer.get_public_key().await?;
        let nonce = self
            .client
            .get_nonce(&public_key)
            .await?
            .filter(|nonce| !nonce.is_empty())
            .ok_or(HandshakeError::NonceUnavailable)?;

        // Authenticate
        let raw_message = create_login_raw_message(&nonce, &public_key);
        let signature = self.signer.sign_message(&raw_message).await?;
        let login = self
            .client
            .login(&raw_message, &signature)
            .await?
            .ok_or(HandshakeError::LoginRejected)?;
        let login_token = login
            .token
            .filter(|token| !token.is_empty())
            .ok_or(HandshakeError::LoginRejected)?;

        // Authorize
        let access_token = self
            .client
            .get_access_token(&login_token)
            .await?
            .filter(|token| !token.is_empty())
            .ok_or(HandshakeError::AccessTokenUnavailable)?;

        let session = SessionData {
            profile: login.profile.into(),
            access_token,
            expires_in: expires_in_for(Utc::now()),
        };
        self.store.replace(AuthState::signed_in(session.clone()))?;
        Ok(session)
    }

    /// Feed `input` to the phase machine and notify on change. Inputs the
    /// current phase does not accept are ignored.
    fn transition(&self, input: PhaseInput) {
        let mut fsm = self.fsm.lock();
        let old_phase = AuthPhase::from(fsm.state());

        if fsm.consume(&input).is_err() {
            debug!(input = ?input, phase = ?old_phase, "Ignoring phase input");
            return;
        }

        let new_phase = AuthPhase::from(fsm.state());
        drop(fsm);

        if old_phase != new_phase {
            debug!(
                old_phase = ?old_phase,
                new_phase = ?new_phase,
                "Auth phase transition"
            );
            self.notify_state_change(new_phase);
        }
    }

    fn notify_state_change(&self, phase: AuthPhase) {
        let callback = self.state_callback.lock();
        if let Some(callback) = callback.as_ref() {
            let state = self.store.snapshot();
            callback(AuthStateChangedPayload {
                phase,
                is_signed_in: state.is_signed_in(),
                profile_id: state.session().map(|s| s.profile.profile_id.clone()),
            });
        }
    }
}
