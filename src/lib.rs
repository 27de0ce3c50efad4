//! Caja - cash register session client
//!
//! API-calling core behind the point-of-sale admin screens: which cash
//! register session is open, opening and closing it, the closing
//! reconciliation, and the product/user catalog calls. The backend owns all
//! state; every operation here takes an [`ApiClient`] and an explicit
//! [`SessionContext`].

pub mod api;
pub mod config;
pub mod context;
pub mod employees;
pub mod error;
pub mod fields;
pub mod logging;
pub mod products;
pub mod reconciliation;
pub mod sessions;
pub mod storage;
pub mod users;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, ApiOutcome, ApiTransport, HttpTransport};
pub use config::ClientConfig;
pub use context::SessionContext;
pub use error::CajaError;
pub use reconciliation::{
    compute_reconciliation, format_currency, ClosingSummary, Reconciliation, Verdict,
};
pub use sessions::{
    close_session, open_session, resolve, resolve_open_session, CloseOutcome,
    OpenSessionRequest, Resolution, Session, SessionState,
};
