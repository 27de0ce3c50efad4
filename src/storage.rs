//! Persisted login state using the OS credential store.
//!
//! On Windows this uses DPAPI (via the `keyring` crate), on macOS Keychain,
//! and on Linux the Secret Service API. Only this module reads persisted
//! state; everything else receives a [`SessionContext`].

use keyring::Entry;
use tracing::{info, warn};

use crate::context::SessionContext;
use crate::error::CajaError;

const SERVICE_NAME: &str = "caja-client";

// Credential keys
pub const KEY_AUTH_TOKEN: &str = "auth_token";
pub const KEY_CURRENT_USER: &str = "current_user";
pub const KEY_API_BASE_URL: &str = "api_base_url";

/// Keys cleared on logout. The backend URL survives.
const LOGIN_KEYS: &[&str] = &[KEY_AUTH_TOKEN, KEY_CURRENT_USER];

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

/// Retrieve a single credential. Returns `None` when the entry does not
/// exist (or the platform store cannot be reached).
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

pub fn set_credential(key: &str, value: &str) -> Result<(), CajaError> {
    let entry = Entry::new(SERVICE_NAME, key)?;
    entry.set_password(value)?;
    Ok(())
}

/// Delete a credential. Silently succeeds if the entry does not exist.
pub fn delete_credential(key: &str) -> Result<(), CajaError> {
    let entry = Entry::new(SERVICE_NAME, key)?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// High-level API
// ---------------------------------------------------------------------------

/// Persist the token and serialized user object of a successful login.
pub fn store_login(token: &str, user_json: &str) -> Result<(), CajaError> {
    if serde_json::from_str::<serde_json::Value>(user_json).is_err() {
        return Err(CajaError::validation("User must be a JSON object"));
    }
    set_credential(KEY_AUTH_TOKEN, token.trim())?;
    set_credential(KEY_CURRENT_USER, user_json)?;
    info!("login state stored");
    Ok(())
}

pub fn clear_login() -> Result<(), CajaError> {
    info!("clearing stored login state");
    for key in LOGIN_KEYS {
        delete_credential(key)?;
    }
    Ok(())
}

/// Read the persisted token and cached user into an explicit context.
pub fn load_session_context() -> SessionContext {
    let token = get_credential(KEY_AUTH_TOKEN);
    let user = get_credential(KEY_CURRENT_USER);
    let ctx = SessionContext::from_persisted(token, user.as_deref());
    if ctx.token.is_none() {
        warn!("no stored auth token, requests will be sent without credentials");
    }
    ctx
}
