//! User accounts and roles.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::api::ApiClient;
use crate::context::SessionContext;
use crate::error::CajaError;
use crate::fields::FieldMap;

const PATH_USERS: &str = "/api/Clientes";
const PATH_REGISTER: &str = "/api/v1/auth/register";
const PATH_CHANGE_ROLE: &str = "/api/v1/auth/cambiar-rol";

const USER_FIELDS: FieldMap = FieldMap::new(&[
    ("id", &["id", "Id", "usuarioId", "UsuarioId"]),
    ("userName", &["nombreUsuario", "NombreUsuario", "nombre", "Nombre"]),
    ("email", &["email", "Email"]),
    ("phone", &["telefonoContacto", "TelefonoContacto", "telefono", "Telefono"]),
    ("role", &["rol", "Rol", "role", "Role"]),
]);

/// Account role. The backend stores the number and accepts the Spanish
/// display name when changing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Administrator = 0,
    Courier = 1,
    Employee = 2,
    Client = 3,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Administrator,
        Role::Courier,
        Role::Employee,
        Role::Client,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|r| *r as i64 == code)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Administrator => "Administrador",
            Role::Courier => "Repartidor",
            Role::Employee => "Empleado",
            Role::Client => "Cliente",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.display_name().eq_ignore_ascii_case(name.trim()))
    }

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => n.as_i64().and_then(Self::from_code),
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(code) => Self::from_code(code),
                Err(_) => Self::from_display_name(s),
            },
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Operator input: Spanish display names, English aliases or numeric
/// codes. Anything else is rejected rather than mapped to a role.
impl FromStr for Role {
    type Err = CajaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let alias = match name.to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Some(Role::Administrator),
            "courier" | "driver" => Some(Role::Courier),
            "employee" => Some(Role::Employee),
            "client" => Some(Role::Client),
            _ => None,
        };
        alias
            .or_else(|| Role::from_display_name(name))
            .or_else(|| name.parse().ok().and_then(Role::from_code))
            .ok_or_else(|| {
                CajaError::validation(format!(
                    "Unknown role \"{name}\". Use Administrador, Repartidor, Empleado or Cliente."
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

impl UserAccount {
    pub fn from_value(v: &Value) -> Option<Self> {
        Some(Self {
            id: USER_FIELDS.text(v, "id")?,
            user_name: USER_FIELDS.text(v, "userName"),
            email: USER_FIELDS.text(v, "email"),
            phone: USER_FIELDS.text(v, "phone"),
            role: USER_FIELDS.get(v, "role").and_then(Role::from_value),
        })
    }

    pub fn role_name(&self) -> &'static str {
        self.role.map(Role::display_name).unwrap_or("Desconocido")
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

impl NewUser {
    fn to_body(&self) -> Result<Value, CajaError> {
        let user_name = self.user_name.trim();
        let email = self.email.trim();
        if user_name.is_empty() {
            return Err(CajaError::validation("Enter the user name."));
        }
        if !email.contains('@') {
            return Err(CajaError::validation("Enter a valid email address."));
        }
        if self.password.is_empty() {
            return Err(CajaError::validation("Enter a password."));
        }
        Ok(json!({
            "nombreUsuario": user_name,
            "email": email,
            "password": self.password,
            "telefonoContacto": self.phone.trim(),
        }))
    }
}

pub async fn list_users(
    api: &ApiClient,
    ctx: &SessionContext,
) -> Result<Vec<UserAccount>, CajaError> {
    let body = api
        .get(PATH_USERS, ctx)
        .await
        .into_read_result("Failed to load users")?;
    Ok(body
        .as_ref()
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(UserAccount::from_value).collect())
        .unwrap_or_default())
}

/// Public registration; no credentials are sent.
pub async fn register_user(api: &ApiClient, user: &NewUser) -> Result<Value, CajaError> {
    let body = user.to_body()?;
    let created = api
        .post(PATH_REGISTER, &SessionContext::anonymous(), body)
        .await
        .into_write_result("Failed to register user")?;
    info!(email = %user.email.trim(), "user registered");
    Ok(created)
}

pub async fn change_role(
    api: &ApiClient,
    ctx: &SessionContext,
    user_id: &str,
    role: Role,
) -> Result<Value, CajaError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(CajaError::validation("Missing user id."));
    }
    // Numeric ids go out as numbers.
    let id_value = user_id
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(user_id));
    let updated = api
        .put(
            PATH_CHANGE_ROLE,
            ctx,
            json!({ "usuarioId": id_value, "nuevoRol": role.display_name() }),
        )
        .await
        .into_write_result("Failed to change the role")?;
    info!(user_id, role = %role, "user role changed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;

    #[test]
    fn role_codes_and_names() {
        assert_eq!(Role::from_code(1), Some(Role::Courier));
        assert_eq!(Role::from_code(9), None);
        assert_eq!(Role::from_display_name("empleado"), Some(Role::Employee));
        assert_eq!(Role::from_display_name("Jefe"), None);
        assert_eq!("driver".parse::<Role>().unwrap(), Role::Courier);
    }

    #[test]
    fn role_input_is_strict() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Administrator);
        assert_eq!("Administrator".parse::<Role>().unwrap(), Role::Administrator);
        assert_eq!(" CLIENTE ".parse::<Role>().unwrap(), Role::Client);
        assert_eq!("2".parse::<Role>().unwrap(), Role::Employee);
        assert!("Adminstrador".parse::<Role>().unwrap_err().is_validation());
        assert!("Jefe".parse::<Role>().unwrap_err().is_validation());
        assert!("9".parse::<Role>().is_err());
    }

    #[tokio::test]
    async fn lists_users_with_numeric_or_named_roles() {
        let transport = ScriptedTransport::new().reply_json(
            "GET",
            "/api/Clientes",
            200,
            json!([
                { "id": 1, "nombreUsuario": "ana", "email": "ana@x.es", "rol": 0 },
                { "Id": 2, "NombreUsuario": "beto", "Rol": "Repartidor" },
                { "id": 3, "rol": 42 },
                { "id": 4, "rol": "Jefe" }
            ]),
        );
        let users = list_users(&transport.client(), &SessionContext::anonymous())
            .await
            .unwrap();
        assert_eq!(users[0].role, Some(Role::Administrator));
        assert_eq!(users[1].role, Some(Role::Courier));
        assert_eq!(users[2].role_name(), "Desconocido");
        assert_eq!(users[3].role, None);
    }

    #[tokio::test]
    async fn register_is_sent_without_token() {
        let transport = ScriptedTransport::new().reply("POST", "/api/v1/auth/register", 200, "");
        let user = NewUser {
            user_name: "carla".into(),
            email: "carla@x.es".into(),
            password: "secreto".into(),
            phone: "600000000".into(),
        };
        register_user(&transport.client(), &user).await.unwrap();
        let sent = &transport.requests()[0];
        assert_eq!(sent.token, None);
        assert_eq!(sent.body.as_ref().unwrap()["nombreUsuario"], "carla");
    }

    #[tokio::test]
    async fn register_validates_email() {
        let transport = ScriptedTransport::new();
        let user = NewUser {
            user_name: "carla".into(),
            email: "carla".into(),
            password: "x".into(),
            ..Default::default()
        };
        assert!(register_user(&transport.client(), &user)
            .await
            .unwrap_err()
            .is_validation());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn change_role_sends_display_name() {
        let transport =
            ScriptedTransport::new().reply("PUT", "/api/v1/auth/cambiar-rol", 200, "");
        let ctx = SessionContext::new(Some("t".into()), None);
        change_role(&transport.client(), &ctx, "14", Role::Employee)
            .await
            .unwrap();
        assert_eq!(
            transport.requests()[0].body,
            Some(json!({ "usuarioId": 14, "nuevoRol": "Empleado" }))
        );
    }

    #[tokio::test]
    async fn change_role_failure_uses_fallback_message() {
        let transport =
            ScriptedTransport::new().reply("PUT", "/api/v1/auth/cambiar-rol", 403, "");
        let err = change_role(
            &transport.client(),
            &SessionContext::anonymous(),
            "14",
            Role::Administrator,
        )
        .await
        .unwrap_err();
        assert_eq!(err, CajaError::Transport("Failed to change the role".into()));
    }
}
