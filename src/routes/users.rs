use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::users::{UpdateUserRequest, UserList, UserOrders},
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    routes::params::Pagination,
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/{id}/orders", get(get_user_orders))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<u64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "List live users", body = ApiResponse<UserList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<Pagination>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = user_service::list_users(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Get user", body = ApiResponse<User>),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::get_user(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<User>),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already taken"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::update_user(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted user, or already deleted"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = user_service::delete_user(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/orders",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User with their live orders", body = ApiResponse<UserOrders>),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user_orders(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<UserOrders>>> {
    let resp = user_service::get_user_orders(&state, id).await?;
    Ok(Json(resp))
}
