use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::{
        items::Model as ItemModel, order_items::Model as OrderItemModel,
        orders::Model as OrderModel, users::Model as UserModel,
    },
    pricing::PricedLine,
};

pub use crate::entity::orders::OrderStatus;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub description: String,
    /// Minor currency units.
    pub price: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub total_price: f64,
    pub final_price: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    pub item_id: i32,
    pub quantity: i32,
    /// Unit price snapshot taken when the line was written.
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

/// A line as shown to clients, possibly merged from several persisted rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub item_id: i32,
    pub quantity: i32,
    pub price: f64,
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<ItemModel> for Item {
    fn from(model: ItemModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            total_price: model.total_price,
            final_price: model.final_price,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<OrderItemModel> for OrderItem {
    fn from(model: OrderItemModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            item_id: model.item_id,
            quantity: model.quantity,
            price: model.price,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<PricedLine> for OrderLine {
    fn from(line: PricedLine) -> Self {
        Self {
            item_id: line.item_id,
            quantity: line.quantity,
            price: line.unit_price,
        }
    }
}
