use axum::{extract::FromRequestParts, http::header};
use uuid::Uuid;

use crate::{entity::Role, error::AppError, state::AppState};

/// The authenticated principal carried by the session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub restaurant_id: Option<Uuid>,
}

impl AuthUser {
    /// The restaurant a manager acts for.
    pub fn managed_restaurant(&self) -> Result<Uuid, AppError> {
        ensure_role(self, Role::RestaurantManager)?;
        self.restaurant_id
            .ok_or_else(|| AppError::BadRequest("Restaurant ID not found".into()))
    }
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden(format!(
            "This action requires the {} role",
            role.as_str()
        )));
    }
    Ok(())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?
            .trim();

        state.tokens.verify(token)
    }
}
