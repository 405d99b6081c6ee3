use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::orders::{
        CreateOrderRequest, OrderDetails, OrderList, QuoteResponse, StatusResponse,
        UpdateOrderRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service::{self, Transition},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/quote", post(quote_order))
        .route(
            "/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/{id}/confirm", post(confirm_order))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<u64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status: Pending, Confirmed, Cancelled"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Live orders with lines merged per item", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let (orders, meta) = order_service::list_orders(&state, query).await?;
    Ok(Json(ApiResponse::success("Ok", orders, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created and priced", body = ApiResponse<OrderDetails>),
        (status = 400, description = "Empty order or non-positive quantity"),
        (status = 404, description = "Unknown user"),
        (status = 422, description = "A line references an unknown item"),
        (status = 500, description = "Transaction failed; nothing was written"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderDetails>>)> {
    let details = order_service::create_order(&state, user.user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Order created",
            details,
            Some(Meta::empty()),
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/api/orders/quote",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Price breakdown without placing the order", body = ApiResponse<QuoteResponse>),
        (status = 422, description = "A line references an unknown item"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn quote_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<QuoteResponse>>> {
    let quote = order_service::quote_order(&state, user.user_id, payload).await?;
    Ok(Json(ApiResponse::success("Quote", quote, None)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with its persisted lines", body = ApiResponse<OrderDetails>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<OrderDetails>>> {
    let details = order_service::get_order(&state, id).await?;
    Ok(Json(ApiResponse::success("OK", details, Some(Meta::empty()))))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Lines replaced and total recalculated", body = ApiResponse<OrderDetails>),
        (status = 404, description = "Order not found"),
        (status = 422, description = "A line references an unknown item"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderDetails>>> {
    let details = order_service::update_order(&state, id, payload).await?;
    Ok(Json(ApiResponse::success(
        "Order updated",
        details,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/confirm",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Confirmed, or left in its current status", body = ApiResponse<StatusResponse>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn confirm_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<StatusResponse>>> {
    let transition = order_service::confirm_order(&state, id).await?;
    let resp = status_response(
        id,
        transition,
        "Order has been confirmed and placed successfully",
        "Order status is not 'Pending'",
    )?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Soft-deleted and cancelled, or already deleted", body = ApiResponse<StatusResponse>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<StatusResponse>>> {
    let transition = order_service::delete_order(&state, id).await?;
    let resp = status_response(
        id,
        transition,
        "Order deleted and status set to 'Cancelled' successfully",
        "Order already deleted",
    )?;
    Ok(Json(resp))
}

fn status_response(
    order_id: i32,
    transition: Transition,
    applied: &str,
    unchanged: &str,
) -> AppResult<ApiResponse<StatusResponse>> {
    let (status, changed) = match transition {
        Transition::Applied(status) => (status, true),
        Transition::AlreadyInState(status) => (status, false),
        Transition::NotFound => return Err(AppError::NotFound),
    };
    let text = if changed {
        applied.to_string()
    } else {
        format!("{unchanged} (current status: {status})")
    };
    Ok(ApiResponse::success(
        text,
        StatusResponse {
            order_id,
            status,
            changed,
        },
        Some(Meta::empty()),
    ))
}
