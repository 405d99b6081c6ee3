use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        items::{CreateItemRequest, ItemList, UpdateItemRequest},
        orders::{
            CreateOrderRequest, OrderDetails, OrderLineRequest, OrderList, OrderWithLines,
            QuoteResponse, StatusResponse, UpdateOrderRequest,
        },
        users::{UpdateUserRequest, UserList, UserOrders},
    },
    models::{Item, Order, OrderItem, OrderLine, OrderStatus, User},
    pricing::{Discounts, PriceSummary},
    response::{ApiResponse, Meta},
    routes::{auth, health, items, orders, params, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        items::list_items,
        items::create_item,
        items::get_item,
        items::update_item,
        items::delete_item,
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::get_user_orders,
        orders::list_orders,
        orders::create_order,
        orders::quote_order,
        orders::get_order,
        orders::update_order,
        orders::confirm_order,
        orders::delete_order
    ),
    components(
        schemas(
            User,
            Item,
            Order,
            OrderItem,
            OrderLine,
            OrderStatus,
            Discounts,
            PriceSummary,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateItemRequest,
            UpdateItemRequest,
            ItemList,
            UpdateUserRequest,
            UserList,
            UserOrders,
            OrderLineRequest,
            CreateOrderRequest,
            UpdateOrderRequest,
            OrderDetails,
            OrderWithLines,
            OrderList,
            QuoteResponse,
            StatusResponse,
            params::Pagination,
            params::OrderListQuery,
            params::SortOrder,
            Meta,
            ApiResponse<Item>,
            ApiResponse<ItemList>,
            ApiResponse<OrderDetails>,
            ApiResponse<OrderList>,
            ApiResponse<StatusResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Items", description = "Item catalogue endpoints"),
        (name = "Users", description = "User endpoints"),
        (name = "Orders", description = "Order pricing and lifecycle endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
