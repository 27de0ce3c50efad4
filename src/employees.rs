//! Employee lookup used to find who is operating the register.

use serde::Serialize;
use serde_json::Value;

use crate::api::ApiClient;
use crate::context::SessionContext;
use crate::error::CajaError;
use crate::fields::FieldMap;

const EMPLOYEE_FIELDS: FieldMap = FieldMap::new(&[
    ("id", &["id", "Id", "empleadoId", "EmpleadoId"]),
    ("name", &["nombre", "Nombre", "nombreCompleto", "NombreCompleto"]),
    ("userId", &["usuarioId", "UsuarioId"]),
]);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: Option<String>,
    pub user_id: Option<String>,
}

impl Employee {
    pub fn from_value(v: &Value) -> Option<Self> {
        Some(Self {
            id: EMPLOYEE_FIELDS.text(v, "id")?,
            name: EMPLOYEE_FIELDS.text(v, "name"),
            user_id: EMPLOYEE_FIELDS.text(v, "userId"),
        })
    }
}

/// Employee record linked to a user account. `Ok(None)` when the backend
/// has no employee for that user (404 or empty body).
pub async fn find_by_user_id(
    api: &ApiClient,
    ctx: &SessionContext,
    user_id: &str,
) -> Result<Option<Employee>, CajaError> {
    let outcome = api
        .get(&format!("/api/Empleados/usuario/{user_id}"), ctx)
        .await;
    if outcome.is_not_found() {
        return Ok(None);
    }
    let body = outcome.into_read_result("Failed to look up the employee")?;
    Ok(body.as_ref().and_then(Employee::from_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;

    #[tokio::test]
    async fn finds_employee_linked_to_user() {
        let transport = ScriptedTransport::new().reply(
            "GET",
            "/api/Empleados/usuario/12",
            200,
            r#"{"Id":5,"Nombre":"Lucia","UsuarioId":12}"#,
        );
        let employee = find_by_user_id(&transport.client(), &SessionContext::anonymous(), "12")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(employee.id, "5");
        assert_eq!(employee.name.as_deref(), Some("Lucia"));
        assert_eq!(employee.user_id.as_deref(), Some("12"));
    }

    #[tokio::test]
    async fn missing_employee_is_none() {
        let transport =
            ScriptedTransport::new().reply("GET", "/api/Empleados/usuario/3", 404, "");
        let found = find_by_user_id(&transport.client(), &SessionContext::anonymous(), "3")
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn server_error_is_transport_error() {
        let transport =
            ScriptedTransport::new().reply("GET", "/api/Empleados/usuario/3", 500, "boom");
        let err = find_by_user_id(&transport.client(), &SessionContext::anonymous(), "3")
            .await
            .unwrap_err();
        assert_eq!(err, CajaError::Transport("boom".into()));
    }
}
