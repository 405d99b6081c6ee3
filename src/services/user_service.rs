use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::{
    dto::users::{UpdateUserRequest, UserList, UserOrders},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    models::User,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{auth_service::normalize_email, order_service},
    state::AppState,
};

pub async fn list_users(state: &AppState, query: Pagination) -> AppResult<ApiResponse<UserList>> {
    let (page, limit, offset) = query.normalize();

    let finder = Users::find()
        .filter(UserCol::DeletedAt.is_null())
        .order_by_asc(UserCol::Id);
    let total = finder.clone().count(&state.orm).await?;

    let items = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_user(state: &AppState, id: i32) -> AppResult<ApiResponse<User>> {
    let user = find_live(state, id).await?;
    Ok(ApiResponse::success("User", user.into(), None))
}

pub async fn update_user(
    state: &AppState,
    id: i32,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    let existing = find_live(state, id).await?;

    let mut active: UserActive = existing.into();
    if let Some(name) = payload.name.filter(|n| !n.trim().is_empty()) {
        active.name = Set(name.trim().to_string());
    }
    if let Some(email) = payload.email {
        let email = normalize_email(&email)?;
        let taken = Users::find()
            .filter(UserCol::Email.eq(email.as_str()))
            .filter(UserCol::Id.ne(id))
            .one(&state.orm)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict("Email is already taken".into()));
        }
        active.email = Set(email);
    }
    active.updated_at = Set(Utc::now().into());

    let user = active.update(&state.orm).await?;
    tracing::info!(user_id = user.id, "user updated");

    Ok(ApiResponse::success("Updated", user.into(), Some(Meta::empty())))
}

/// Soft delete; the user's orders are left untouched.
pub async fn delete_user(state: &AppState, id: i32) -> AppResult<ApiResponse<serde_json::Value>> {
    let user = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if user.deleted_at.is_some() {
        return Ok(ApiResponse::success(
            "User is already deleted",
            serde_json::json!({ "user_id": id }),
            Some(Meta::empty()),
        ));
    }

    let now = Utc::now();
    let mut active: UserActive = user.into();
    active.deleted_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    active.update(&state.orm).await?;

    tracing::info!(user_id = id, "user deleted");

    Ok(ApiResponse::success(
        "User deleted successfully",
        serde_json::json!({ "user_id": id }),
        Some(Meta::empty()),
    ))
}

pub async fn get_user_orders(state: &AppState, id: i32) -> AppResult<ApiResponse<UserOrders>> {
    let user = find_live(state, id).await?;
    let orders = order_service::orders_for_user(&state.orm, user.id).await?;

    let total = orders.len() as u64;
    Ok(ApiResponse::success(
        "User orders",
        UserOrders {
            user: user.into(),
            orders,
        },
        Some(Meta {
            total: Some(total),
            ..Meta::default()
        }),
    ))
}

async fn find_live(state: &AppState, id: i32) -> AppResult<UserModel> {
    Users::find_by_id(id)
        .filter(UserCol::DeletedAt.is_null())
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}
