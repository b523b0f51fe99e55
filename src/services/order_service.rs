use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
    entity::{
        MenuItems, OrderItems, OrderStatus, Orders, Restaurants, Role,
        menu_items::Column as MenuCol,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Relation as OrderRel},
        restaurants::Column as RestaurantCol,
        users::Column as UserCol,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role},
    models::{Order, OrderItem, OrderSummary},
    policy::{self, Denial, OrderSnapshot, Transition},
    pricing::verify_cart,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Place an order for the authenticated customer. The order and its lines
/// are written in one transaction.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_role(user, Role::Customer)?;
    let payload = payload.normalized();
    payload.validate()?;

    let txn = state.orm.begin().await?;

    let restaurant = Restaurants::find_by_id(payload.restaurant_id)
        .filter(RestaurantCol::IsActive.eq(true))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let menu_ids: Vec<Uuid> = payload.items.iter().map(|line| line.menu_item_id).collect();
    let menu: HashMap<Uuid, _> = MenuItems::find()
        .filter(MenuCol::RestaurantId.eq(restaurant.id))
        .filter(MenuCol::Id.is_in(menu_ids))
        .all(&txn)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let total_amount = verify_cart(&payload.items, &menu, payload.total_amount)?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        restaurant_id: Set(restaurant.id),
        total_amount: Set(total_amount),
        delivery_address: Set(payload.delivery_address),
        delivery_phone: Set(payload.delivery_phone),
        notes: Set(payload.notes),
        status: Set(OrderStatus::Pending),
        delivery_man_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        delivered_at: Set(None),
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            menu_item_id: Set(line.menu_item_id),
            quantity: Set(line.quantity),
            price: Set(line.price),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;
        items.push(item.into());
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        restaurant_id = %order.restaurant_id,
        total_amount = order.total_amount,
        lines = items.len(),
        "order placed"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed successfully",
        OrderWithItems {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Orders the caller may see: their own as a customer, their restaurant's as
/// a manager, open pickups plus their own deliveries as a courier.
pub fn visible_orders(user: &AuthUser) -> AppResult<Condition> {
    let condition = match user.role {
        Role::Customer => Condition::all().add(OrderCol::UserId.eq(user.user_id)),
        Role::RestaurantManager => {
            Condition::all().add(OrderCol::RestaurantId.eq(user.managed_restaurant()?))
        }
        Role::DeliveryMan => Condition::any()
            .add(
                Condition::all()
                    .add(
                        OrderCol::Status
                            .is_in([OrderStatus::ReadyForPickup, OrderStatus::OutForDelivery]),
                    )
                    .add(OrderCol::DeliveryManId.is_null()),
            )
            .add(OrderCol::DeliveryManId.eq(user.user_id)),
    };
    Ok(condition)
}

#[derive(Debug, FromQueryResult)]
struct OrderSummaryRow {
    id: Uuid,
    user_id: Uuid,
    restaurant_id: Uuid,
    total_amount: i64,
    delivery_address: String,
    delivery_phone: Option<String>,
    notes: Option<String>,
    status: OrderStatus,
    delivery_man_id: Option<Uuid>,
    created_at: DateTimeWithTimeZone,
    updated_at: DateTimeWithTimeZone,
    delivered_at: Option<DateTimeWithTimeZone>,
    restaurant_name: String,
    customer_name: String,
    customer_phone: Option<String>,
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(visible_orders(user)?);
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let total = Orders::find()
        .filter(condition.clone())
        .count(&state.orm)
        .await? as i64;

    let mut finder = Orders::find()
        .column_as(RestaurantCol::Name, "restaurant_name")
        .column_as(UserCol::Name, "customer_name")
        .column_as(UserCol::Phone, "customer_phone")
        .join(JoinType::InnerJoin, OrderRel::Restaurants.def())
        .join(JoinType::InnerJoin, OrderRel::Customer.def())
        .filter(condition);

    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .into_model::<OrderSummaryRow>()
        .all(&state.orm)
        .await?
        .into_iter()
        .map(summary_from_row)
        .collect();

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .filter(visible_orders(user)?)
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Move an order to a new status on behalf of `user`.
///
/// The gates in [`policy::authorize_transition`] decide on a snapshot; the
/// write then re-asserts that snapshot (status and courier) in its `WHERE`
/// clause, so two racing requests cannot both succeed.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let target = payload.status;
    if !user.role.can_set(target) {
        tracing::debug!(order_id = %id, role = user.role.as_str(), %target, "status not allowed for role");
        return Err(Denial::RoleNotPermitted.into());
    }

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let transition = policy::authorize_transition(
        user,
        &OrderSnapshot::from(&order),
        target,
        payload.delivery_man_id,
    )
    .map_err(|denial| {
        tracing::debug!(order_id = %id, user_id = %user.user_id, ?denial, "transition denied");
        AppError::from(denial)
    })?;

    apply_transition(state, id, &transition).await?;

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(
        order_id = %id,
        user_id = %user.user_id,
        from = %transition.from,
        to = %transition.to,
        "order status updated"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({
            "order_id": id,
            "from": transition.from,
            "to": transition.to,
            "delivery_man_id": order.delivery_man_id,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order status updated successfully",
        order.into(),
        Some(Meta::empty()),
    ))
}

/// Compare-and-swap on the observed status and courier.
async fn apply_transition(state: &AppState, id: Uuid, transition: &Transition) -> AppResult<()> {
    let now: DateTimeWithTimeZone = Utc::now().into();

    let mut update = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(transition.to))
        .col_expr(OrderCol::UpdatedAt, Expr::value(now))
        .filter(OrderCol::Id.eq(id))
        .filter(OrderCol::Status.eq(transition.from));

    update = match transition.expected_courier {
        Some(courier) => update.filter(OrderCol::DeliveryManId.eq(courier)),
        None => update.filter(OrderCol::DeliveryManId.is_null()),
    };

    if let Some(courier) = transition.claim_for {
        update = update.col_expr(OrderCol::DeliveryManId, Expr::value(Some(courier)));
    }
    if transition.stamp_delivered {
        update = update.col_expr(OrderCol::DeliveredAt, Expr::value(Some(now)));
    }

    let result = update.exec(&state.orm).await?;
    if result.rows_affected == 0 {
        tracing::debug!(order_id = %id, "status update lost a race");
        return Err(AppError::Conflict(
            "Order was changed by another request".into(),
        ));
    }

    Ok(())
}

fn summary_from_row(row: OrderSummaryRow) -> OrderSummary {
    OrderSummary {
        id: row.id,
        user_id: row.user_id,
        restaurant_id: row.restaurant_id,
        restaurant_name: row.restaurant_name,
        customer_name: row.customer_name,
        customer_phone: row.customer_phone,
        total_amount: row.total_amount,
        delivery_address: row.delivery_address,
        delivery_phone: row.delivery_phone,
        notes: row.notes,
        status: row.status,
        delivery_man_id: row.delivery_man_id,
        created_at: row.created_at.with_timezone(&Utc),
        updated_at: row.updated_at.with_timezone(&Utc),
        delivered_at: row.delivered_at.map(|dt| dt.with_timezone(&Utc)),
    }
}
