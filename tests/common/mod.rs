#![allow(dead_code)]

use chrono::Duration;
use food_delivery_api::{
    dto::{
        auth::RegisterRequest,
        menu_items::CreateMenuItemRequest,
        orders::{CartLine, CreateOrderRequest, OrderWithItems, UpdateOrderStatusRequest},
    },
    entity::{AuditLogs, MenuItems, OrderItems, OrderStatus, Orders, Restaurants, Role, Users},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{MenuItem, Order},
    services::{auth_service, catalog_service, order_service},
    session::TokenKeys,
    state::AppState,
};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, Schema};
use uuid::Uuid;

pub const PASSWORD: &str = "secret123";

/// Fresh in-memory database with every table created from the entities.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);
    let orm = Database::connect(opts).await?;

    let backend = orm.get_database_backend();
    let schema = Schema::new(backend);
    let tables = [
        schema.create_table_from_entity(Restaurants),
        schema.create_table_from_entity(Users),
        schema.create_table_from_entity(MenuItems),
        schema.create_table_from_entity(Orders),
        schema.create_table_from_entity(OrderItems),
        schema.create_table_from_entity(AuditLogs),
    ];
    for table in &tables {
        orm.execute(backend.build(table)).await?;
    }

    let tokens = TokenKeys::new(b"test-secret", Duration::hours(1));
    Ok(AppState::new(orm, tokens))
}

pub fn register_request(email: &str, name: &str, role: Role) -> RegisterRequest {
    RegisterRequest {
        email: email.into(),
        password: PASSWORD.into(),
        name: name.into(),
        phone: None,
        address: None,
        role: Some(role),
        restaurant_name: None,
        restaurant_description: None,
        restaurant_address: None,
        restaurant_phone: None,
    }
}

pub fn manager_request(email: &str, restaurant_name: &str) -> RegisterRequest {
    RegisterRequest {
        restaurant_name: Some(restaurant_name.into()),
        restaurant_description: Some("Family kitchen".into()),
        restaurant_address: Some("1 Market Street".into()),
        restaurant_phone: Some("555-0100".into()),
        ..register_request(email, "Manager", Role::RestaurantManager)
    }
}

pub async fn customer(state: &AppState, email: &str) -> anyhow::Result<AuthUser> {
    auth_service::register_user(state, register_request(email, "Casey", Role::Customer)).await?;
    Ok(auth_service::authenticate(state, email, PASSWORD).await?)
}

pub async fn manager(
    state: &AppState,
    email: &str,
    restaurant_name: &str,
) -> anyhow::Result<AuthUser> {
    auth_service::register_user(state, manager_request(email, restaurant_name)).await?;
    Ok(auth_service::authenticate(state, email, PASSWORD).await?)
}

pub async fn courier(state: &AppState, email: &str) -> anyhow::Result<AuthUser> {
    let request = RegisterRequest {
        phone: Some("555-0199".into()),
        ..register_request(email, "Dana", Role::DeliveryMan)
    };
    auth_service::register_user(state, request).await?;
    Ok(auth_service::authenticate(state, email, PASSWORD).await?)
}

pub async fn add_item(
    state: &AppState,
    manager: &AuthUser,
    name: &str,
    price: i64,
) -> anyhow::Result<MenuItem> {
    let resp = catalog_service::create_menu_item(
        state,
        manager,
        CreateMenuItemRequest {
            name: name.into(),
            description: None,
            price,
            category: "mains".into(),
            is_available: None,
        },
    )
    .await?;
    Ok(resp.data.expect("menu item"))
}

pub fn order_request(restaurant_id: Uuid, lines: &[(&MenuItem, i32)]) -> CreateOrderRequest {
    let items: Vec<CartLine> = lines
        .iter()
        .map(|(item, quantity)| CartLine {
            menu_item_id: item.id,
            quantity: *quantity,
            price: item.price,
        })
        .collect();
    let total_amount = lines
        .iter()
        .map(|(item, quantity)| item.price * i64::from(*quantity))
        .sum();

    CreateOrderRequest {
        restaurant_id,
        items,
        total_amount,
        delivery_address: "42 Elm Street".into(),
        delivery_phone: Some("555-0142".into()),
        notes: None,
    }
}

pub async fn place_order(
    state: &AppState,
    customer: &AuthUser,
    restaurant_id: Uuid,
    lines: &[(&MenuItem, i32)],
) -> anyhow::Result<OrderWithItems> {
    let resp =
        order_service::create_order(state, customer, order_request(restaurant_id, lines)).await?;
    Ok(resp.data.expect("order"))
}

pub async fn set_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    status: OrderStatus,
) -> AppResult<Order> {
    let resp = order_service::update_order_status(
        state,
        user,
        order_id,
        UpdateOrderStatusRequest {
            status,
            delivery_man_id: None,
        },
    )
    .await?;
    Ok(resp.data.expect("order"))
}

/// A restaurant with one manager, one dish, one customer and one courier.
pub struct Kitchen {
    pub manager: AuthUser,
    pub customer: AuthUser,
    pub courier: AuthUser,
    pub restaurant_id: Uuid,
    pub dish: MenuItem,
}

pub async fn kitchen(state: &AppState) -> anyhow::Result<Kitchen> {
    let manager = manager(state, "owner@example.com", "Green Bowl").await?;
    let restaurant_id = manager.restaurant_id.expect("manager restaurant");
    let dish = add_item(state, &manager, "Falafel Wrap", 999).await?;
    let customer = customer(state, "casey@example.com").await?;
    let courier = courier(state, "dana@example.com").await?;
    Ok(Kitchen {
        manager,
        customer,
        courier,
        restaurant_id,
        dish,
    })
}
