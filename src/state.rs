use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::pricing::DiscountPolicy;

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub policy: Arc<DiscountPolicy>,
    pub auth: Arc<AuthSettings>,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub ttl_hours: i64,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, policy: DiscountPolicy, auth: AuthSettings) -> Self {
        Self {
            orm,
            policy: Arc::new(policy),
            auth: Arc::new(auth),
        }
    }
}
