use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::menu_items::{CreateMenuItemRequest, MenuItemList, UpdateMenuItemRequest},
    error::AppResult,
    extract::{AppJson, AppPath},
    middleware::auth::AuthUser,
    models::MenuItem,
    response::{ApiResponse, ErrorResponse},
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_menu_items).post(create_menu_item))
        .route("/{id}", put(update_menu_item).delete(delete_menu_item))
}

#[utoipa::path(
    get,
    path = "/api/menu-items",
    responses(
        (status = 200, description = "The manager's own menu", body = ApiResponse<MenuItemList>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Not a restaurant manager", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Menu"
)]
pub async fn list_menu_items(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MenuItemList>>> {
    let resp = catalog_service::list_own_menu(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/menu-items",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item created", body = ApiResponse<MenuItem>),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 403, description = "Not a restaurant manager", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Menu"
)]
pub async fn create_menu_item(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateMenuItemRequest>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = catalog_service::create_menu_item(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/menu-items/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item updated", body = ApiResponse<MenuItem>),
        (status = 404, description = "Not one of the manager's items", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Menu"
)]
pub async fn update_menu_item(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateMenuItemRequest>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = catalog_service::update_menu_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/menu-items/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item deleted"),
        (status = 404, description = "Not one of the manager's items", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Menu"
)]
pub async fn delete_menu_item(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_menu_item(&state, &user, id).await?;
    Ok(Json(resp))
}
