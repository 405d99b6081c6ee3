use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::items::{CreateItemRequest, ItemList, UpdateItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Item,
    response::ApiResponse,
    routes::params::Pagination,
    services::item_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/{id}", get(get_item).put(update_item).delete(delete_item))
}

#[utoipa::path(
    get,
    path = "/api/items",
    params(
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<u64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "List live items", body = ApiResponse<ItemList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ItemList>>> {
    let resp = item_service::list_items(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Get item", body = ApiResponse<Item>),
        (status = 404, description = "Item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Item>>> {
    let resp = item_service::get_item(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Create item", body = ApiResponse<Item>),
        (status = 400, description = "Missing fields or non-positive price"),
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Item>>)> {
    let resp = item_service::create_item(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/items/{id}",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated item", body = ApiResponse<Item>),
        (status = 404, description = "Item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateItemRequest>,
) -> AppResult<Json<ApiResponse<Item>>> {
    let resp = item_service::update_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Deleted item, or already deleted"),
        (status = 404, description = "Item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = item_service::delete_item(&state, &user, id).await?;
    Ok(Json(resp))
}
