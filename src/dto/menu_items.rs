use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::MenuItem;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMenuItemRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    /// Minor units.
    #[serde(default)]
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: i64,
    #[serde(default)]
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuItemRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: Option<i64>,
    #[validate(length(min = 1, message = "Category must not be empty"))]
    pub category: Option<String>,
    pub is_available: Option<bool>,
}

impl CreateMenuItemRequest {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.category = self.category.trim().to_string();
        self
    }
}

impl UpdateMenuItemRequest {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.map(|v| v.trim().to_string());
        self.category = self.category.map(|v| v.trim().to_string());
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuItemList {
    pub items: Vec<MenuItem>,
}
