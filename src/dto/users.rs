use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{dto::orders::OrderDetails, models::User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserOrders {
    pub user: User,
    pub orders: Vec<OrderDetails>,
}
