mod common;

use common::{add_item, courier, kitchen, manager, order_request, place_order, set_status, setup_state};
use food_delivery_api::{
    dto::{
        menu_items::UpdateMenuItemRequest,
        orders::{CreateOrderRequest, UpdateOrderStatusRequest},
    },
    entity::{OrderItems, OrderStatus, Orders, order_items::Column as OrderItemCol},
    error::AppError,
    services::{catalog_service, order_service},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn order_records_verified_total_and_lines() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;
    let side = add_item(&state, &k.manager, "Hummus", 450).await?;

    let placed = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 2), (&side, 1)]).await?;
    assert_eq!(placed.order.total_amount, 2448);
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.user_id, k.customer.user_id);
    assert!(placed.order.delivery_man_id.is_none());
    assert_eq!(placed.items.len(), 2);

    let stored = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(placed.order.id))
        .count(&state.orm)
        .await?;
    assert_eq!(stored, 2);
    Ok(())
}

#[tokio::test]
async fn recorded_prices_survive_menu_changes() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;
    let placed = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 1)]).await?;

    catalog_service::update_menu_item(
        &state,
        &k.manager,
        k.dish.id,
        UpdateMenuItemRequest {
            name: None,
            description: None,
            price: Some(1299),
            category: None,
            is_available: None,
        },
    )
    .await?;

    let fetched = order_service::get_order(&state, &k.customer, placed.order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(fetched.items[0].price, 999);
    assert_eq!(fetched.order.total_amount, 999);
    Ok(())
}

#[tokio::test]
async fn stale_price_or_wrong_total_is_rejected() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;

    let mut stale = order_request(k.restaurant_id, &[(&k.dish, 1)]);
    stale.items[0].price = 899;
    stale.total_amount = 899;
    let err = order_service::create_order(&state, &k.customer, stale)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let wrong_total = CreateOrderRequest {
        total_amount: 1,
        ..order_request(k.restaurant_id, &[(&k.dish, 1)])
    };
    let err = order_service::create_order(&state, &k.customer, wrong_total)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(OrderItems::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn blank_delivery_address_is_rejected() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;

    let blank = CreateOrderRequest {
        delivery_address: "       ".into(),
        ..order_request(k.restaurant_id, &[(&k.dish, 1)])
    };
    let err = order_service::create_order(&state, &k.customer, blank)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let padded = CreateOrderRequest {
        delivery_address: "  42 Elm Street  ".into(),
        ..order_request(k.restaurant_id, &[(&k.dish, 1)])
    };
    let placed = order_service::create_order(&state, &k.customer, padded)
        .await?
        .data
        .expect("order");
    assert_eq!(placed.order.delivery_address, "42 Elm Street");
    Ok(())
}

#[tokio::test]
async fn items_from_another_restaurant_are_rejected() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;
    let rival = manager(&state, "rival@example.com", "Red Pot").await?;
    let foreign = add_item(&state, &rival, "Chili", 700).await?;

    let err = order_service::create_order(
        &state,
        &k.customer,
        order_request(k.restaurant_id, &[(&foreign, 1)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn only_customers_place_orders() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;

    let err = order_service::create_order(
        &state,
        &k.manager,
        order_request(k.restaurant_id, &[(&k.dish, 1)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn order_moves_through_every_stage_to_delivered() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;
    let id = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 1)])
        .await?
        .order
        .id;

    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::ReadyForPickup,
    ] {
        let order = set_status(&state, &k.manager, id, status).await?;
        assert_eq!(order.status, status);
    }

    let claimed = set_status(&state, &k.courier, id, OrderStatus::OutForDelivery).await?;
    assert_eq!(claimed.delivery_man_id, Some(k.courier.user_id));
    assert!(claimed.delivered_at.is_none());

    let delivered = set_status(&state, &k.courier, id, OrderStatus::Delivered).await?;
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.delivered_at.is_some());

    let err = set_status(&state, &k.manager, id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn skipping_a_stage_is_a_conflict() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;
    let id = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 1)])
        .await?
        .order
        .id;

    let err = set_status(&state, &k.manager, id, OrderStatus::ReadyForPickup)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn courier_cannot_touch_orders_before_pickup() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;
    let id = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 1)])
        .await?
        .order
        .id;

    let err = set_status(&state, &k.courier, id, OrderStatus::OutForDelivery)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    set_status(&state, &k.manager, id, OrderStatus::Confirmed).await?;
    let err = set_status(&state, &k.courier, id, OrderStatus::OutForDelivery)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let stored = Orders::find_by_id(id).one(&state.orm).await?.expect("order");
    assert_eq!(stored.status, OrderStatus::Confirmed);
    assert!(stored.delivery_man_id.is_none());
    Ok(())
}

#[tokio::test]
async fn role_cannot_set_foreign_status() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;
    let id = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 1)])
        .await?
        .order
        .id;

    let err = set_status(&state, &k.customer, id, OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = set_status(&state, &k.manager, id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn foreign_manager_sees_not_found_and_nothing_changes() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;
    let rival = manager(&state, "rival@example.com", "Red Pot").await?;
    let id = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 1)])
        .await?
        .order
        .id;

    let err = set_status(&state, &rival, id, OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let stored = Orders::find_by_id(id).one(&state.orm).await?.expect("order");
    assert_eq!(stored.status, OrderStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn missing_order_is_not_found() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;

    let err = set_status(&state, &k.manager, uuid::Uuid::new_v4(), OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn customer_cancels_only_while_pending() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;

    let first = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 1)]).await?;
    let cancelled = set_status(&state, &k.customer, first.order.id, OrderStatus::Cancelled).await?;
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let second = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 1)]).await?;
    set_status(&state, &k.manager, second.order.id, OrderStatus::Confirmed).await?;
    let err = set_status(&state, &k.customer, second.order.id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let other = common::customer(&state, "other@example.com").await?;
    let third = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 1)]).await?;
    let err = set_status(&state, &other, third.order.id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn courier_cannot_claim_for_someone_else() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;
    let other = courier(&state, "other-courier@example.com").await?;
    let id = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 1)])
        .await?
        .order
        .id;
    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::ReadyForPickup,
    ] {
        set_status(&state, &k.manager, id, status).await?;
    }

    let err = order_service::update_order_status(
        &state,
        &k.courier,
        id,
        UpdateOrderStatusRequest {
            status: OrderStatus::OutForDelivery,
            delivery_man_id: Some(other.user_id),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let claimed = set_status(&state, &k.courier, id, OrderStatus::OutForDelivery).await?;
    assert_eq!(claimed.delivery_man_id, Some(k.courier.user_id));

    let err = set_status(&state, &other, id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn concurrent_claims_have_one_winner() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let k = kitchen(&state).await?;
    let rival = courier(&state, "rival-courier@example.com").await?;
    let id = place_order(&state, &k.customer, k.restaurant_id, &[(&k.dish, 1)])
        .await?
        .order
        .id;
    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::ReadyForPickup,
    ] {
        set_status(&state, &k.manager, id, status).await?;
    }

    let (first, second) = tokio::join!(
        set_status(&state, &k.courier, id, OrderStatus::OutForDelivery),
        set_status(&state, &rival, id, OrderStatus::OutForDelivery),
    );
    assert_eq!(
        [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );

    let winner = if first.is_ok() { &k.courier } else { &rival };
    let stored = Orders::find_by_id(id).one(&state.orm).await?.expect("order");
    assert_eq!(stored.status, OrderStatus::OutForDelivery);
    assert_eq!(stored.delivery_man_id, Some(winner.user_id));
    Ok(())
}
