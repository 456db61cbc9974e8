//! Subcommand handlers. Each returns the JSON document printed on stdout.

use std::sync::Arc;

use auth_config_and_utils::{Config, Paths};
use auth_engine::{
    is_session_fresh, AuthResult, AuthServiceClient, AuthenticationCoordinator,
    HttpCapabilityDispatcher, SigningGateway, SnapSigningGateway,
};
use chrono::Utc;
use serde_json::{json, Value};
use session_storage::{FileStorage, SessionStore};

fn open_store(paths: &Paths) -> AuthResult<SessionStore> {
    let storage = FileStorage::new(paths.session_file())?;
    Ok(SessionStore::load(Box::new(storage))?)
}

fn build_coordinator(config: &Config, paths: &Paths) -> AuthResult<AuthenticationCoordinator> {
    let client = AuthServiceClient::from_config(config)?;
    let dispatcher = HttpCapabilityDispatcher::from_config(config)?;
    let signer: Arc<dyn SigningGateway> = Arc::new(SnapSigningGateway::new(dispatcher));

    let coordinator = AuthenticationCoordinator::new(client, signer, open_store(paths)?);
    coordinator.set_state_callback(Box::new(|payload| {
        tracing::debug!(phase = ?payload.phase, is_signed_in = payload.is_signed_in, "Auth phase changed");
    }));
    Ok(coordinator)
}

pub async fn sign_in(config: &Config, paths: &Paths) -> AuthResult<Value> {
    let coordinator = build_coordinator(config, paths)?;
    coordinator.perform_sign_in().await?;

    let state = coordinator.auth_state();
    Ok(json!({
        "signedIn": state.is_signed_in(),
        "profile": state.session().map(|s| &s.profile),
        "expiresIn": state.session().map(|s| s.expires_in.as_str()),
    }))
}

pub fn sign_out(config: &Config, paths: &Paths) -> AuthResult<Value> {
    let coordinator = build_coordinator(config, paths)?;
    coordinator.perform_sign_out()?;
    Ok(json!({ "signedIn": false }))
}

pub async fn token(config: &Config, paths: &Paths) -> AuthResult<Value> {
    let coordinator = build_coordinator(config, paths)?;
    let access_token = coordinator.get_bearer_token().await?;
    Ok(json!({ "accessToken": access_token }))
}

pub async fn profile(config: &Config, paths: &Paths) -> AuthResult<Value> {
    let coordinator = build_coordinator(config, paths)?;
    let profile = coordinator.get_session_profile().await?;
    Ok(serde_json::to_value(profile)?)
}

pub fn status(paths: &Paths) -> AuthResult<Value> {
    let state = open_store(paths)?.snapshot();
    let session = state.session();

    Ok(json!({
        "signedIn": state.is_signed_in(),
        "fresh": session.map(|s| is_session_fresh(s, Utc::now())).unwrap_or(false),
        "profileId": session.map(|s| s.profile.profile_id.as_str()),
        "expiresIn": session.map(|s| s.expires_in.as_str()),
        "sessionFile": paths.session_file().display().to_string(),
    }))
}
