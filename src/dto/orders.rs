use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{Order, OrderItem, OrderLine, OrderStatus},
    pricing::{Discounts, PriceSummary},
};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
pub struct OrderLineRequest {
    pub item_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub items: Vec<OrderLineRequest>,
    /// Only honoured while the order is still `Pending`.
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Present on creation; updates and reads do not re-run discounts.
    pub pricing: Option<PriceSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithLines {
    pub order: Order,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithLines>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteResponse {
    pub items: Vec<OrderLine>,
    pub discounts: Discounts,
    pub pricing: PriceSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub order_id: i32,
    pub status: OrderStatus,
    pub changed: bool,
}
