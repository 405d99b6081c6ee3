pub mod items;
pub mod order_items;
pub mod orders;
pub mod user_orders;
pub mod users;

pub use items::Entity as Items;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use user_orders::Entity as UserOrders;
pub use users::Entity as Users;
