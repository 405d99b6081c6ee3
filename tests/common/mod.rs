#![allow(dead_code)]

use chrono::Utc;
use order_pricing_api::{
    db::create_schema,
    entity::{items::ActiveModel as ItemActive, users::ActiveModel as UserActive},
    pricing::DiscountPolicy,
    state::{AppState, AuthSettings},
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};

/// Fresh in-memory database with the full schema. A single pooled connection
/// keeps every query on the same in-memory database.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let orm = Database::connect(opts).await?;
    create_schema(&orm).await?;

    Ok(AppState::new(
        orm,
        DiscountPolicy::default(),
        AuthSettings {
            jwt_secret: "test-secret".into(),
            ttl_hours: 1,
        },
    ))
}

pub async fn create_user(state: &AppState, name: &str, email: &str) -> anyhow::Result<i32> {
    let now = Utc::now();
    let user = UserActive {
        id: NotSet,
        name: Set(name.into()),
        email: Set(email.into()),
        password_hash: Set("not-a-real-hash".into()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(&state.orm)
    .await?;
    Ok(user.id)
}

pub async fn create_item(state: &AppState, name: &str, price: i32) -> anyhow::Result<i32> {
    let now = Utc::now();
    let item = ItemActive {
        id: NotSet,
        name: Set(name.into()),
        description: Set(format!("{name} for testing")),
        price: Set(price),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(&state.orm)
    .await?;
    Ok(item.id)
}
