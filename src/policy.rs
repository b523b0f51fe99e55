//! Order transition policy.
//!
//! A status change passes three gates, in order:
//!
//! 1. the caller's role may set the target status at all,
//! 2. the order is inside the caller's ownership scope,
//! 3. the order's current status is a legal predecessor of the target.
//!
//! Everything here is pure; [`crate::services::order_service`] loads the
//! order, asks for a [`Transition`] and applies it as one conditional update.

use uuid::Uuid;

use crate::{
    entity::{OrderStatus, Role, orders},
    error::AppError,
    middleware::auth::AuthUser,
};

impl Role {
    /// Statuses this role may ever set, regardless of the order's state.
    pub fn allowed_targets(self) -> &'static [OrderStatus] {
        match self {
            Role::RestaurantManager => &[
                OrderStatus::Confirmed,
                OrderStatus::Preparing,
                OrderStatus::ReadyForPickup,
                OrderStatus::Cancelled,
            ],
            Role::DeliveryMan => &[OrderStatus::OutForDelivery, OrderStatus::Delivered],
            Role::Customer => &[OrderStatus::Cancelled],
        }
    }

    pub fn can_set(self, target: OrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }
}

impl OrderStatus {
    pub fn successors(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Preparing],
            OrderStatus::Preparing => &[OrderStatus::ReadyForPickup],
            OrderStatus::ReadyForPickup => &[OrderStatus::OutForDelivery],
            OrderStatus::OutForDelivery => &[OrderStatus::Delivered],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    pub fn can_advance_to(self, target: OrderStatus) -> bool {
        self.successors().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }
}

/// The fields of an order the gates look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSnapshot {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub status: OrderStatus,
    pub delivery_man_id: Option<Uuid>,
}

impl From<&orders::Model> for OrderSnapshot {
    fn from(order: &orders::Model) -> Self {
        Self {
            user_id: order.user_id,
            restaurant_id: order.restaurant_id,
            status: order.status,
            delivery_man_id: order.delivery_man_id,
        }
    }
}

/// An authorized status change, including its side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Courier assignment observed when the transition was planned.
    pub expected_courier: Option<Uuid>,
    /// Set when this transition claims an unassigned order.
    pub claim_for: Option<Uuid>,
    pub stamp_delivered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Gate 1: the role never sets this status.
    RoleNotPermitted,
    /// Gate 2: not the caller's order. Reported as not found.
    OutOfScope,
    /// Gate 3: not reachable from the current status.
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    /// A courier tried to assign the order to somebody else.
    ForeignCourier,
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::RoleNotPermitted => AppError::Forbidden("Invalid status for your role".into()),
            Denial::OutOfScope => AppError::NotFound,
            Denial::IllegalTransition { from, to } => {
                AppError::Conflict(format!("Cannot move an order from {from} to {to}"))
            }
            Denial::ForeignCourier => {
                AppError::Forbidden("Orders can only be claimed for yourself".into())
            }
        }
    }
}

/// Gate 2 on its own: may `user` act on this order at all?
pub fn in_scope(user: &AuthUser, order: &OrderSnapshot) -> bool {
    match user.role {
        Role::Customer => order.user_id == user.user_id && order.status == OrderStatus::Pending,
        Role::RestaurantManager => user.restaurant_id == Some(order.restaurant_id),
        Role::DeliveryMan => match order.delivery_man_id {
            None => matches!(
                order.status,
                OrderStatus::ReadyForPickup | OrderStatus::OutForDelivery
            ),
            Some(courier) => courier == user.user_id,
        },
    }
}

/// Run all three gates and describe the resulting update.
pub fn authorize_transition(
    user: &AuthUser,
    order: &OrderSnapshot,
    target: OrderStatus,
    requested_courier: Option<Uuid>,
) -> Result<Transition, Denial> {
    if !user.role.can_set(target) {
        return Err(Denial::RoleNotPermitted);
    }

    if !in_scope(user, order) {
        return Err(Denial::OutOfScope);
    }

    if !order.status.can_advance_to(target) {
        return Err(Denial::IllegalTransition {
            from: order.status,
            to: target,
        });
    }

    let mut claim_for = None;
    if user.role == Role::DeliveryMan {
        match target {
            OrderStatus::OutForDelivery => {
                if requested_courier.is_some_and(|id| id != user.user_id) {
                    return Err(Denial::ForeignCourier);
                }
                if order.delivery_man_id.is_none() {
                    claim_for = Some(user.user_id);
                }
            }
            OrderStatus::Delivered => {
                if order.delivery_man_id != Some(user.user_id) {
                    return Err(Denial::OutOfScope);
                }
            }
            _ => {}
        }
    }

    Ok(Transition {
        from: order.status,
        to: target,
        expected_courier: order.delivery_man_id,
        claim_for,
        stamp_delivered: target == OrderStatus::Delivered,
    })
}
