//! Explicit per-call session context.

use serde_json::Value;

use crate::fields::FieldMap;

/// Credentials every backend operation needs, passed in explicitly rather
/// than read from persisted state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub token: Option<String>,
    pub current_user_id: Option<String>,
}

const CACHED_USER_FIELDS: FieldMap =
    FieldMap::new(&[("id", &["id", "Id", "usuarioId", "UsuarioId", "userId"])]);

impl SessionContext {
    pub fn new(token: Option<String>, current_user_id: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
            current_user_id: current_user_id.filter(|id| !id.trim().is_empty()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build a context from the raw persisted token and serialized user
    /// object. A user blob that does not parse, or has no id, leaves
    /// `current_user_id` empty.
    pub fn from_persisted(token: Option<String>, user_json: Option<&str>) -> Self {
        let current_user_id = user_json
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .and_then(|user| CACHED_USER_FIELDS.text(&user, "id"));
        Self::new(token, current_user_id)
    }
}
