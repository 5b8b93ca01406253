//! HTTP request handlers.

pub mod auth_handler;
pub mod organization_handler;
pub mod role_handler;
pub mod system_variable_handler;
pub mod user_handler;

use serde::{Deserialize, Deserializer};
use utoipa::IntoParams;
use uuid::Uuid;

pub use auth_handler::{auth_routes, me_routes};
pub use organization_handler::organization_routes;
pub use role_handler::{permission_routes, role_routes};
pub use system_variable_handler::system_variable_routes;
pub use user_handler::user_routes;

/// Organization filter of tenant-scoped list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScopeQuery {
    /// Organization to act on; defaults to the caller's. Only SYSTEM members may name another.
    pub organization_id: Option<Uuid>,
}

/// Tells an explicit JSON `null` apart from an absent field.
///
/// Absent stays `None` through `#[serde(default)]`, `null` becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
