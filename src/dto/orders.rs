use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entity::OrderStatus,
    models::{Order, OrderItem, OrderSummary},
};

/// One cart line as submitted by the client. `price` is the per-unit price
/// the customer saw; it must still match the menu.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CartLine {
    #[serde(alias = "id")]
    pub menu_item_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub restaurant_id: Uuid,
    #[serde(alias = "cart_items")]
    #[validate(length(min = 1, message = "Cart is empty"))]
    #[validate(nested)]
    pub items: Vec<CartLine>,
    #[validate(range(min = 1, message = "Total must be positive"))]
    pub total_amount: i64,
    #[serde(default)]
    #[validate(length(min = 5, message = "Delivery address is too short"))]
    pub delivery_address: String,
    pub delivery_phone: Option<String>,
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    pub fn normalized(mut self) -> Self {
        self.delivery_address = self.delivery_address.trim().to_string();
        self
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub delivery_man_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderSummary>,
}
