use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::auth::{
        LoginRequest, LoginResponse, RegisterRequest, RegisteredAccount, VerifyRoleRequest,
        VerifyRoleResponse,
    },
    error::AppResult,
    extract::AppJson,
    response::{ApiResponse, ErrorResponse},
    services::auth_service::{login_user, register_user, verify_role},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-role", post(verify))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user (and restaurant for managers)", body = ApiResponse<RegisteredAccount>),
        (status = 400, description = "Invalid payload, duplicate email or restaurant name", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<RegisteredAccount>>)> {
    let resp = register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = login_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-role",
    request_body = VerifyRoleRequest,
    responses(
        (status = 200, description = "Account has the expected role", body = ApiResponse<VerifyRoleResponse>),
        (status = 403, description = "Account has another role", body = ErrorResponse),
        (status = 404, description = "No active account", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn verify(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyRoleRequest>,
) -> AppResult<Json<ApiResponse<VerifyRoleResponse>>> {
    let resp = verify_role(&state, payload).await?;
    Ok(Json(resp))
}
