use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::{
        menu_items::{CreateMenuItemRequest, MenuItemList, UpdateMenuItemRequest},
        restaurants::{RestaurantList, RestaurantMenu},
    },
    entity::{
        MenuItems, Restaurants,
        menu_items::{ActiveModel as MenuItemActive, Column as MenuCol},
        restaurants::{Column as RestaurantCol, Model as RestaurantModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{MenuItem, Restaurant},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_own_menu(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<MenuItemList>> {
    let restaurant_id = user.managed_restaurant()?;

    let items = MenuItems::find()
        .filter(MenuCol::RestaurantId.eq(restaurant_id))
        .order_by_asc(MenuCol::Category)
        .order_by_asc(MenuCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(MenuItem::from)
        .collect();

    Ok(ApiResponse::success(
        "Menu items",
        MenuItemList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_menu_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    let restaurant_id = user.managed_restaurant()?;
    let payload = payload.normalized();
    payload.validate()?;

    let now = Utc::now();
    let item = MenuItemActive {
        id: Set(Uuid::new_v4()),
        restaurant_id: Set(restaurant_id),
        name: Set(payload.name),
        description: Set(payload.description.unwrap_or_default()),
        price: Set(payload.price),
        category: Set(payload.category),
        is_available: Set(payload.is_available.unwrap_or(true)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "menu_item_create",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id, "restaurant_id": restaurant_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Menu item added successfully",
        item.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_menu_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    let restaurant_id = user.managed_restaurant()?;
    let payload = payload.normalized();
    payload.validate()?;

    let existing = MenuItems::find()
        .filter(owned_item(id, restaurant_id))
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(item) => item,
        None => return Err(AppError::NotFound),
    };

    let mut active: MenuItemActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(is_available) = payload.is_available {
        active.is_available = Set(is_available);
    }
    active.updated_at = Set(Utc::now().into());

    let item = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "menu_item_update",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Menu item updated successfully",
        item.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_menu_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let restaurant_id = user.managed_restaurant()?;

    let result = MenuItems::delete_many()
        .filter(owned_item(id, restaurant_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.orm,
        Some(user.user_id),
        "menu_item_delete",
        "menu_items",
        serde_json::json!({ "menu_item_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Menu item deleted successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_restaurants(state: &AppState) -> AppResult<ApiResponse<RestaurantList>> {
    let items = Restaurants::find()
        .filter(RestaurantCol::IsActive.eq(true))
        .order_by_asc(RestaurantCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Restaurant::from)
        .collect();

    Ok(ApiResponse::success(
        "Restaurants",
        RestaurantList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_restaurant(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Restaurant>> {
    let restaurant = find_active_restaurant(state, id).await?;
    Ok(ApiResponse::success(
        "Restaurant",
        restaurant.into(),
        Some(Meta::empty()),
    ))
}

/// Public menu: available items of an active restaurant.
pub async fn restaurant_menu(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<RestaurantMenu>> {
    let restaurant = find_active_restaurant(state, id).await?;

    let items = MenuItems::find()
        .filter(MenuCol::RestaurantId.eq(restaurant.id))
        .filter(MenuCol::IsAvailable.eq(true))
        .order_by_asc(MenuCol::Category)
        .order_by_asc(MenuCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(MenuItem::from)
        .collect();

    Ok(ApiResponse::success(
        "Menu",
        RestaurantMenu {
            restaurant: restaurant.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

async fn find_active_restaurant(state: &AppState, id: Uuid) -> AppResult<RestaurantModel> {
    Restaurants::find_by_id(id)
        .filter(RestaurantCol::IsActive.eq(true))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

fn owned_item(id: Uuid, restaurant_id: Uuid) -> Condition {
    Condition::all()
        .add(MenuCol::Id.eq(id))
        .add(MenuCol::RestaurantId.eq(restaurant_id))
}
