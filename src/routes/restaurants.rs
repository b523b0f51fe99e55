use axum::{Json, Router, extract::State, routing::get};
use uuid::Uuid;

use crate::{
    dto::restaurants::{RestaurantList, RestaurantMenu},
    error::AppResult,
    extract::AppPath,
    models::Restaurant,
    response::{ApiResponse, ErrorResponse},
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_restaurants))
        .route("/{id}", get(get_restaurant))
        .route("/{id}/menu", get(restaurant_menu))
}

#[utoipa::path(
    get,
    path = "/api/restaurants",
    responses(
        (status = 200, description = "Active restaurants", body = ApiResponse<RestaurantList>)
    ),
    tag = "Restaurants"
)]
pub async fn list_restaurants(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<RestaurantList>>> {
    let resp = catalog_service::list_restaurants(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/restaurants/{id}",
    params(("id" = Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Restaurant", body = ApiResponse<Restaurant>),
        (status = 404, description = "Restaurant not found", body = ErrorResponse)
    ),
    tag = "Restaurants"
)]
pub async fn get_restaurant(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Restaurant>>> {
    let resp = catalog_service::get_restaurant(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/restaurants/{id}/menu",
    params(("id" = Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Available menu items", body = ApiResponse<RestaurantMenu>),
        (status = 404, description = "Restaurant not found", body = ErrorResponse)
    ),
    tag = "Restaurants"
)]
pub async fn restaurant_menu(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<RestaurantMenu>>> {
    let resp = catalog_service::restaurant_menu(&state, id).await?;
    Ok(Json(resp))
}
