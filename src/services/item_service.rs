use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::{
    dto::items::{CreateItemRequest, ItemList, UpdateItemRequest},
    entity::items::{ActiveModel, Column, Entity as Items, Model as ItemModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Item,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_items(state: &AppState, query: Pagination) -> AppResult<ApiResponse<ItemList>> {
    let (page, limit, offset) = query.normalize();

    let finder = Items::find()
        .filter(Column::DeletedAt.is_null())
        .order_by_asc(Column::Id);

    let total = finder.clone().count(&state.orm).await?;

    let items = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Item::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Items", ItemList { items }, Some(meta)))
}

pub async fn get_item(state: &AppState, id: i32) -> AppResult<ApiResponse<Item>> {
    let item = find_live(state, id).await?;
    Ok(ApiResponse::success("Item", item.into(), None))
}

pub async fn create_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateItemRequest,
) -> AppResult<ApiResponse<Item>> {
    let CreateItemRequest {
        name,
        description,
        price,
    } = payload;
    if name.trim().is_empty() || description.trim().is_empty() {
        return Err(AppError::Validation(
            "name and description must not be empty".into(),
        ));
    }
    ensure_positive_price(price)?;

    let now = Utc::now();
    let item = ActiveModel {
        id: NotSet,
        name: Set(name),
        description: Set(description),
        price: Set(price),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(item_id = item.id, user_id = user.user_id, price = item.price, "item created");

    Ok(ApiResponse::success(
        "Item created",
        item.into(),
        Some(Meta::empty()),
    ))
}

/// Partial update. Existing order lines keep the price they captured.
pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateItemRequest,
) -> AppResult<ApiResponse<Item>> {
    let existing = find_live(state, id).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name.filter(|n| !n.trim().is_empty()) {
        active.name = Set(name);
    }
    if let Some(description) = payload.description.filter(|d| !d.trim().is_empty()) {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        ensure_positive_price(price)?;
        active.price = Set(price);
    }
    active.updated_at = Set(Utc::now().into());

    let item = active.update(&state.orm).await?;

    tracing::info!(item_id = item.id, user_id = user.user_id, "item updated");

    Ok(ApiResponse::success("Updated", item.into(), Some(Meta::empty())))
}

/// Soft delete. Repeating it is an informational no-op.
pub async fn delete_item(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let item = Items::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if item.deleted_at.is_some() {
        return Ok(ApiResponse::success(
            "Item is already deleted",
            serde_json::json!({ "item_id": id }),
            Some(Meta::empty()),
        ));
    }

    let now = Utc::now();
    let mut active: ActiveModel = item.into();
    active.deleted_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    active.update(&state.orm).await?;

    tracing::info!(item_id = id, user_id = user.user_id, "item deleted");

    Ok(ApiResponse::success(
        "Item deleted successfully",
        serde_json::json!({ "item_id": id }),
        Some(Meta::empty()),
    ))
}

async fn find_live(state: &AppState, id: i32) -> AppResult<ItemModel> {
    Items::find_by_id(id)
        .filter(Column::DeletedAt.is_null())
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

fn ensure_positive_price(price: i32) -> AppResult<()> {
    if price <= 0 {
        return Err(AppError::Validation("price must be positive".into()));
    }
    Ok(())
}
