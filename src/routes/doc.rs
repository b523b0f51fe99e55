use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{
            LoginRequest, LoginResponse, RegisterRequest, RegisteredAccount, SessionUser,
            VerifyRoleRequest, VerifyRoleResponse,
        },
        menu_items::{CreateMenuItemRequest, MenuItemList, UpdateMenuItemRequest},
        orders::{CartLine, CreateOrderRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
        restaurants::{RestaurantList, RestaurantMenu},
    },
    entity::{OrderStatus, Role},
    models::{MenuItem, Order, OrderItem, OrderSummary, Restaurant, User},
    response::{ErrorResponse, Meta},
    routes::{auth, health, menu_items, orders, params, restaurants},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::verify,
        menu_items::list_menu_items,
        menu_items::create_menu_item,
        menu_items::update_menu_item,
        menu_items::delete_menu_item,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_order_status,
        restaurants::list_restaurants,
        restaurants::get_restaurant,
        restaurants::restaurant_menu
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            User,
            Restaurant,
            MenuItem,
            Order,
            OrderSummary,
            OrderItem,
            RegisterRequest,
            RegisteredAccount,
            LoginRequest,
            LoginResponse,
            SessionUser,
            VerifyRoleRequest,
            VerifyRoleResponse,
            CreateMenuItemRequest,
            UpdateMenuItemRequest,
            MenuItemList,
            CartLine,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            OrderWithItems,
            OrderList,
            RestaurantList,
            RestaurantMenu,
            params::Pagination,
            params::SortOrder,
            Meta,
            ErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and role checks"),
        (name = "Menu", description = "Restaurant manager menu management"),
        (name = "Orders", description = "Order placement, listing and status changes"),
        (name = "Restaurants", description = "Public restaurant and menu browsing"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
