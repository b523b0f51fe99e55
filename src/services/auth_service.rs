use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::auth::{
        LoginRequest, LoginResponse, RegisterRequest, RegisteredAccount, SessionUser,
        VerifyRoleRequest, VerifyRoleResponse,
    },
    entity::{
        Restaurants, Role, Users,
        restaurants::{ActiveModel as RestaurantActive, Column as RestaurantCol},
        users::{ActiveModel as UserActive, Column as UserCol},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Verified against when no account matches, so both paths cost one hash.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("not-a-real-password").ok());

struct RestaurantDetails {
    name: String,
    description: String,
    address: String,
    phone: String,
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<RegisteredAccount>> {
    let payload = payload.normalized();
    payload.validate()?;

    let role = payload.role.unwrap_or(Role::Customer);
    let email = payload.email;
    let phone = non_blank(payload.phone);

    let restaurant = match role {
        Role::RestaurantManager => Some(restaurant_details(
            payload.restaurant_name,
            payload.restaurant_description,
            payload.restaurant_address,
            payload.restaurant_phone,
        )?),
        Role::DeliveryMan if phone.is_none() => {
            return Err(AppError::BadRequest(
                "Phone number is required for delivery personnel".into(),
            ));
        }
        _ => None,
    };

    let password_hash = hash_password(&payload.password)?;

    let txn = state.orm.begin().await?;

    let existing = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("User already exists".into()));
    }

    let restaurant = match restaurant {
        Some(details) => Some(insert_restaurant(&txn, details).await?),
        None => None,
    };

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        name: Set(payload.name),
        role: Set(role),
        phone: Set(phone),
        address: Set(non_blank(payload.address)),
        restaurant_id: Set(restaurant.as_ref().map(|r| r.id)),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await
    .map_err(|err| unique_violation(err, "User already exists"))?;

    txn.commit().await?;

    tracing::info!(user_id = %user.id, role = role.as_str(), "user registered");
    audit::record(
        &state.orm,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({
            "user_id": user.id,
            "restaurant_id": user.restaurant_id,
        }),
    )
    .await;

    let message = match role {
        Role::RestaurantManager => "User and restaurant created successfully",
        _ => "User created successfully",
    };

    Ok(ApiResponse::success(
        message,
        RegisteredAccount {
            user: user.into(),
            restaurant: restaurant.map(Into::into),
        },
        Some(Meta::empty()),
    ))
}

/// Check credentials against an active account. Every failure looks the same
/// to the caller, and unknown accounts still pay for one hash verification.
pub async fn authenticate(state: &AppState, email: &str, password: &str) -> AppResult<AuthUser> {
    let user = Users::find()
        .filter(UserCol::Email.eq(email.trim()))
        .filter(UserCol::IsActive.eq(true))
        .one(&state.orm)
        .await?;

    let stored_hash = match &user {
        Some(u) => Some(u.password_hash.as_str()),
        None => DUMMY_HASH.as_deref(),
    };
    let password_ok = match stored_hash {
        Some(hash) => verify_password(password, hash)?,
        None => false,
    };

    let user = match user {
        Some(u) if password_ok => u,
        Some(u) => {
            tracing::debug!(user_id = %u.id, "login rejected: password mismatch");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        None => {
            tracing::debug!("login rejected: no active account");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    Ok(AuthUser {
        user_id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
        restaurant_id: user.restaurant_id,
    })
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    payload.validate()?;

    let principal = authenticate(state, &payload.email, &payload.password).await?;
    let token = state.tokens.issue(&principal)?;

    audit::record(
        &state.orm,
        Some(principal.user_id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": principal.user_id }),
    )
    .await;

    let resp = LoginResponse {
        token: format!("Bearer {}", token),
        user: SessionUser {
            id: principal.user_id,
            email: principal.email,
            name: principal.name,
            role: principal.role,
            restaurant_id: principal.restaurant_id,
        },
    };

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

pub async fn verify_role(
    state: &AppState,
    payload: VerifyRoleRequest,
) -> AppResult<ApiResponse<VerifyRoleResponse>> {
    let user = Users::find()
        .filter(UserCol::Email.eq(payload.email.trim()))
        .filter(UserCol::IsActive.eq(true))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if user.role != payload.expected_role {
        return Err(AppError::Forbidden("Invalid role".into()));
    }

    Ok(ApiResponse::success(
        "Role verified",
        VerifyRoleResponse { role: user.role },
        Some(Meta::empty()),
    ))
}

fn restaurant_details(
    name: Option<String>,
    description: Option<String>,
    address: Option<String>,
    phone: Option<String>,
) -> AppResult<RestaurantDetails> {
    match (non_blank(name), non_blank(address), non_blank(phone)) {
        (Some(name), Some(address), Some(phone)) => Ok(RestaurantDetails {
            name,
            description: description.unwrap_or_default(),
            address,
            phone,
        }),
        _ => Err(AppError::BadRequest(
            "Restaurant name, address, and phone are required for managers".into(),
        )),
    }
}

async fn insert_restaurant<C: ConnectionTrait>(
    conn: &C,
    details: RestaurantDetails,
) -> AppResult<crate::entity::restaurants::Model> {
    let taken = Restaurants::find()
        .filter(RestaurantCol::Name.eq(details.name.as_str()))
        .one(conn)
        .await?;
    if taken.is_some() {
        return Err(AppError::BadRequest(
            "Restaurant with this name already exists".into(),
        ));
    }

    let restaurant = RestaurantActive {
        id: Set(Uuid::new_v4()),
        name: Set(details.name),
        description: Set(details.description),
        address: Set(details.address),
        phone: Set(details.phone),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await
    .map_err(|err| unique_violation(err, "Restaurant with this name already exists"))?;

    Ok(restaurant)
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

/// A concurrent registration can slip past the existence checks; the unique
/// index then has the final word.
fn unique_violation(err: DbErr, message: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::BadRequest(message.into()),
        _ => err.into(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
