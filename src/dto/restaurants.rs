use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{MenuItem, Restaurant};

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantList {
    pub items: Vec<Restaurant>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantMenu {
    pub restaurant: Restaurant,
    pub items: Vec<MenuItem>,
}
