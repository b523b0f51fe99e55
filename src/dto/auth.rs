use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entity::Role,
    models::{Restaurant, User},
};

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Defaults to `customer`.
    pub role: Option<Role>,
    pub restaurant_name: Option<String>,
    pub restaurant_description: Option<String>,
    pub restaurant_address: Option<String>,
    pub restaurant_phone: Option<String>,
}

impl RegisterRequest {
    /// Trim the identity fields so length rules apply to what gets stored.
    pub fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_string();
        self.name = self.name.trim().to_string();
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisteredAccount {
    pub user: User,
    pub restaurant: Option<Restaurant>,
}

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub restaurant_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct VerifyRoleRequest {
    pub email: String,
    pub expected_role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyRoleResponse {
    pub role: Role,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub restaurant_id: Option<Uuid>,
    pub iat: usize,
    pub exp: usize,
}
