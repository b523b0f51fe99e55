use std::collections::HashMap;

use uuid::Uuid;

use crate::{dto::orders::CartLine, entity::menu_items, error::AppError};

/// Price a cart against the authoritative menu.
///
/// Every line must reference an available item of the restaurant, quote the
/// item's current price, and the lines must add up to `claimed_total`.
/// Returns the verified total in minor units.
pub fn verify_cart(
    lines: &[CartLine],
    menu: &HashMap<Uuid, menu_items::Model>,
    claimed_total: i64,
) -> Result<i64, AppError> {
    let mut total: i64 = 0;

    for line in lines {
        let item = menu.get(&line.menu_item_id).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Menu item {} is not on this restaurant's menu",
                line.menu_item_id
            ))
        })?;

        if !item.is_available {
            return Err(AppError::BadRequest(format!(
                "{} is currently unavailable",
                item.name
            )));
        }

        if item.price != line.price {
            return Err(AppError::BadRequest(format!(
                "The price of {} has changed",
                item.name
            )));
        }

        total = i64::from(line.quantity)
            .checked_mul(line.price)
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;
    }

    if total != claimed_total {
        return Err(AppError::BadRequest(
            "Order total does not match cart contents".into(),
        ));
    }

    Ok(total)
}
