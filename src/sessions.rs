//! Cash register session ("caja") lifecycle.
//!
//! Open and close go straight to the backend; this module only validates
//! input, resolves the operator and decides which of the backend's answers
//! describe the current state. Callers re-run [`resolve`] after every
//! successful open or close.
//!
//! The backend exposes two ways to find the open session and they do not
//! always agree: the history list (each record carries `estado`, `1` = open)
//! and the dedicated `abierta` endpoint (404 = none). The list is preferred.

use chrono::{NaiveDate, NaiveTime, SecondsFormat};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::context::SessionContext;
use crate::employees;
use crate::error::CajaError;
use crate::fields::FieldMap;
use crate::reconciliation::{ClosingSummary, Reconciliation, SUMMARY_FIELDS};

/// Short "current session" window for a calendar date.
pub const SHORT_WINDOW_MINUTES: u32 = 5;
/// Whole-day window.
pub const FULL_DAY_WINDOW_MINUTES: u32 = 1440;

const PATH_SESSIONS: &str = "/api/Caja";
const PATH_CURRENT: &str = "/api/Caja/abierta";
const PATH_OPEN: &str = "/api/Caja/abrir";

const SESSION_FIELDS: FieldMap = FieldMap::new(&[
    ("id", &["id", "Id", "cajaId", "CajaId"]),
    ("openedAt", &["fechaApertura", "FechaApertura", "fecha", "Fecha", "openedAt"]),
    ("opening", &["saldoInicial", "SaldoInicial", "openingBalance", "OpeningBalance"]),
    ("closing", &["saldoFinal", "SaldoFinal", "closingBalance", "ClosingBalance"]),
    ("state", &["estado", "Estado", "state", "State"]),
    ("operatorId", &["empleadoId", "EmpleadoId", "operatorId"]),
    ("operatorName", &["empleadoNombre", "EmpleadoNombre"]),
]);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Open,
    Closed,
}

impl SessionState {
    fn from_value(v: &Value) -> Self {
        let open = match v {
            Value::Number(n) => n.as_f64() == Some(1.0),
            Value::Bool(b) => *b,
            Value::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "open" | "abierta" | "abierto"
            ),
            _ => false,
        };
        if open {
            Self::Open
        } else {
            Self::Closed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub opened_at: Option<String>,
    pub opening_balance: f64,
    pub state: SessionState,
    pub closing_balance: Option<f64>,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
}

impl Session {
    /// Parse a session record. `default_state` applies when the record has
    /// no state field. Records without an id are not sessions.
    pub fn from_value(v: &Value, default_state: SessionState) -> Option<Self> {
        let id = SESSION_FIELDS.text(v, "id")?;
        Some(Self {
            id,
            opened_at: SESSION_FIELDS.text(v, "openedAt"),
            opening_balance: SESSION_FIELDS.amount(v, "opening"),
            state: SESSION_FIELDS
                .get(v, "state")
                .map(SessionState::from_value)
                .unwrap_or(default_state),
            closing_balance: SESSION_FIELDS.number(v, "closing"),
            operator_id: SESSION_FIELDS.text(v, "operatorId"),
            operator_name: SESSION_FIELDS.text(v, "operatorName"),
        })
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }
}

/// Where the resolver's answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolvedFrom {
    History,
    CurrentEndpoint,
    /// Both queries failed; "no open session" is a safe default.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub session: Option<Session>,
    /// Open sessions seen in the history list. Above one means the backend
    /// broke its single-open-session rule; `session` is then the first.
    pub open_count: Option<usize>,
    pub source: ResolvedFrom,
}

impl Resolution {
    pub fn has_duplicate_open_sessions(&self) -> bool {
        self.open_count.is_some_and(|n| n > 1)
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Session history in backend order. An empty or unreadable body is an
/// empty history.
pub async fn list_sessions(
    api: &ApiClient,
    ctx: &SessionContext,
) -> Result<Vec<Session>, CajaError> {
    let body = api
        .get(PATH_SESSIONS, ctx)
        .await
        .into_read_result("Failed to load the cash register history")?;
    Ok(parse_session_list(body.as_ref()))
}

fn parse_session_list(body: Option<&Value>) -> Vec<Session> {
    let Some(records) = body.and_then(Value::as_array) else {
        return Vec::new();
    };
    records
        .iter()
        .filter_map(|record| {
            let session = Session::from_value(record, SessionState::Closed);
            if session.is_none() {
                warn!("skipping cash register record without id");
            }
            session
        })
        .collect()
}

/// The dedicated "current open session" query. 404 and empty bodies both
/// mean no open session.
pub async fn current_open_session(
    api: &ApiClient,
    ctx: &SessionContext,
) -> Result<Option<Session>, CajaError> {
    let outcome = api.get(PATH_CURRENT, ctx).await;
    if outcome.is_not_found() {
        return Ok(None);
    }
    let body = outcome.into_read_result("Failed to load the open cash register")?;
    // The endpoint only ever returns the open session, whatever its state
    // field says.
    Ok(body
        .as_ref()
        .and_then(|v| Session::from_value(v, SessionState::Open))
        .map(|session| Session {
            state: SessionState::Open,
            ..session
        }))
}

/// Decide which session, if any, is currently open. Never fails: when both
/// queries fail the error is logged and the answer is "none".
pub async fn resolve(api: &ApiClient, ctx: &SessionContext) -> Resolution {
    let history_err = match list_sessions(api, ctx).await {
        Ok(history) => {
            let mut open = history.into_iter().filter(Session::is_open);
            let first = open.next();
            let open_count = usize::from(first.is_some()) + open.count();
            if open_count > 1 {
                warn!(
                    open_count,
                    chosen = first.as_ref().map(|s| s.id.as_str()).unwrap_or_default(),
                    "backend reports more than one open cash register, using the first"
                );
            }
            return Resolution {
                session: first,
                open_count: Some(open_count),
                source: ResolvedFrom::History,
            };
        }
        Err(e) => e,
    };

    warn!(error = %history_err, "history query failed, falling back to the current session query");

    match current_open_session(api, ctx).await {
        Ok(session) => Resolution {
            session,
            open_count: None,
            source: ResolvedFrom::CurrentEndpoint,
        },
        Err(current_err) => {
            error!(
                history_error = %history_err,
                current_error = %current_err,
                "could not determine the open cash register"
            );
            Resolution {
                session: None,
                open_count: None,
                source: ResolvedFrom::Unavailable,
            }
        }
    }
}

pub async fn resolve_open_session(api: &ApiClient, ctx: &SessionContext) -> Option<Session> {
    resolve(api, ctx).await.session
}

// ---------------------------------------------------------------------------
// Open
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct OpenSessionRequest {
    /// Operator input, validated before anything is sent.
    pub opening_balance: String,
    pub operator_id: Option<String>,
    pub opened_on: Option<NaiveDate>,
    /// Passed through to the backend untouched; `0` is treated as unset.
    pub window_minutes: Option<u32>,
}

/// Parse an operator-entered amount. Accepts a decimal comma when no dot is
/// present (`"100,50"`).
pub fn parse_amount(raw: &str, label: &str) -> Result<f64, CajaError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CajaError::validation(format!("Enter the {label}.")));
    }
    let normalized = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_string()
    };
    let amount = normalized
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| CajaError::validation(format!("The {label} must be a number.")))?;
    if amount < 0.0 {
        return Err(CajaError::validation(format!(
            "The {label} cannot be negative."
        )));
    }
    Ok(amount)
}

/// Explicit operator first, then the employee linked to the logged-in user.
/// A failed lookup is logged and treated as "unknown".
async fn resolve_operator(
    api: &ApiClient,
    ctx: &SessionContext,
    explicit: Option<&str>,
) -> Option<String> {
    if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }
    let user_id = ctx.current_user_id.as_deref()?;
    match employees::find_by_user_id(api, ctx, user_id).await {
        Ok(Some(employee)) => Some(employee.id),
        Ok(None) => {
            warn!(user_id, "no employee linked to the logged-in user");
            None
        }
        Err(e) => {
            warn!(user_id, error = %e, "employee lookup failed");
            None
        }
    }
}

fn opening_date_iso(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Open a new session. Returns the backend's created record, or `{}` when
/// it answered with an empty body.
pub async fn open_session(
    api: &ApiClient,
    ctx: &SessionContext,
    req: &OpenSessionRequest,
) -> Result<Value, CajaError> {
    let opening_balance = parse_amount(&req.opening_balance, "opening balance")?;

    let operator_id = resolve_operator(api, ctx, req.operator_id.as_deref())
        .await
        .ok_or_else(|| {
            CajaError::validation(
                "Could not determine the employee id. Log in or enter the id manually.",
            )
        })?;

    let mut body = serde_json::json!({
        "saldoInicial": opening_balance,
        "empleadoId": operator_id,
    });
    if let Some(date) = req.opened_on {
        body["fecha"] = Value::String(opening_date_iso(date));
    }
    if let Some(minutes) = req.window_minutes.filter(|m| *m > 0) {
        body["windowMinutes"] = Value::from(minutes);
    }

    let created = api
        .post(PATH_OPEN, ctx, body)
        .await
        .into_write_result("Failed to open the cash register")?;

    info!(
        operator_id = %operator_id,
        opening_balance,
        session_id = %SESSION_FIELDS.text(&created, "id").unwrap_or_default(),
        "cash register opened"
    );
    Ok(created)
}

// ---------------------------------------------------------------------------
// Close
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummarySource {
    /// The dedicated summary endpoint.
    Summary,
    /// The summary endpoint was unavailable; built from the close response.
    CloseResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseOutcome {
    pub summary: ClosingSummary,
    pub source: SummarySource,
    pub close_response: Value,
}

impl CloseOutcome {
    pub fn reconciliation(&self) -> Reconciliation {
        self.summary.reconciliation()
    }
}

/// Closing report for a session. `Ok(None)` when the backend has nothing.
pub async fn get_summary(
    api: &ApiClient,
    ctx: &SessionContext,
    session_id: &str,
) -> Result<Option<ClosingSummary>, CajaError> {
    let body = api
        .get(&format!("{PATH_SESSIONS}/{session_id}/resumen"), ctx)
        .await
        .into_read_result("Failed to load the cash register summary")?;
    Ok(body.as_ref().map(ClosingSummary::from_value))
}

/// Close a session and gather its summary. Once the close call succeeds,
/// nothing after it can turn the result into an error.
pub async fn close_session(
    api: &ApiClient,
    ctx: &SessionContext,
    session_id: &str,
    closing_balance: &str,
) -> Result<CloseOutcome, CajaError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(CajaError::validation("There is no open cash register to close."));
    }
    let closing_balance = parse_amount(closing_balance, "closing balance")?;

    let close_response = api
        .post(
            &format!("{PATH_SESSIONS}/{session_id}/cerrar"),
            ctx,
            serde_json::json!({ "saldoFinal": closing_balance }),
        )
        .await
        .into_write_result("Failed to close the cash register")?;

    info!(session_id, closing_balance, "cash register closed");

    let (mut summary, source) = match get_summary(api, ctx, session_id).await {
        Ok(Some(summary)) => (summary, SummarySource::Summary),
        Ok(None) => {
            warn!(session_id, "summary endpoint returned no data, using the close response");
            (
                ClosingSummary::from_value(&close_response),
                SummarySource::CloseResponse,
            )
        }
        Err(e) => {
            warn!(session_id, error = %e, "summary fetch failed, using the close response");
            (
                ClosingSummary::from_value(&close_response),
                SummarySource::CloseResponse,
            )
        }
    };
    if summary.session_id.is_none() {
        summary.session_id = Some(session_id.to_string());
    }
    if source == SummarySource::CloseResponse
        && SUMMARY_FIELDS.number(&close_response, "closing").is_none()
    {
        summary.closing_balance = closing_balance;
    }

    Ok(CloseOutcome {
        summary,
        source,
        close_response,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
